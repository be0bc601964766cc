//! Domain model of a 3-D Secure authentication attempt.
//!
//! Pure types and the ports the application layer drives. Nothing in here
//! performs I/O.

pub mod attempt;
pub mod event;
pub mod frame;
pub mod ports;
pub mod protocol;
pub mod state;
pub mod status;
