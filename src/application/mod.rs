//! Application layer containing the 3DS protocol orchestration.
//!
//! `ProtocolOrchestrator` is the entry point. It sequences remote calls
//! through `ApiClient`, consumes frame messages, and reports progress to an
//! `AuthListener`.

pub mod client;
pub mod config;
pub mod listener;
pub mod orchestrator;
