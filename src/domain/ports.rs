use super::attempt::PaymentAttempt;
use super::frame::{FramePurpose, FrameRef};
use super::protocol::RemoteRequest;
use crate::error::AuthError;
use async_trait::async_trait;
use serde_json::Value;

/// Request/response transport to the 3DS Server.
///
/// A transport failure, a non-success status or a timeout surfaces as
/// `AuthError::RemoteError`. The raw response body is returned undecoded.
#[async_trait]
pub trait RemoteCallGateway: Send + Sync {
    async fn call(&self, request: RemoteRequest) -> Result<Value, AuthError>;
}

/// Owner of isolated execution contexts (frames).
#[async_trait]
pub trait FrameHost: Send + Sync {
    async fn open(&self, purpose: FramePurpose, url: &str) -> Result<FrameRef, AuthError>;
    /// Closing an unknown or already-closed frame is a no-op.
    async fn close(&self, frame: FrameRef);
    async fn close_all(&self);
    async fn frame_count(&self) -> usize;
}

/// Pass/fail check of caller input before anything reaches the server.
pub trait CardValidator: Send + Sync {
    fn validate(&self, attempt: &PaymentAttempt) -> Result<(), AuthError>;
}

/// Produces a browser-info payload when the server never delivers one.
pub trait FingerprintCollector: Send + Sync {
    fn collect(&self) -> String;
}

pub type GatewayBox = Box<dyn RemoteCallGateway>;
pub type FrameHostBox = Box<dyn FrameHost>;
pub type CardValidatorBox = Box<dyn CardValidator>;
pub type FingerprintCollectorBox = Box<dyn FingerprintCollector>;
