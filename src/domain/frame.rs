use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Identifier of a frame owned by a `FrameHost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameRef(pub u64);

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

/// What a frame is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FramePurpose {
    /// Hidden 3DS method monitoring page.
    Monitor,
    /// Hidden 3DS Server callback page that reports method completion.
    Callback,
    /// Hidden page polling for the authentication result.
    ResultMonitor,
    /// Visible issuer challenge page.
    Challenge,
}

impl fmt::Display for FramePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FramePurpose::Monitor => "monitor",
            FramePurpose::Callback => "callback",
            FramePurpose::ResultMonitor => "result-monitor",
            FramePurpose::Challenge => "challenge",
        };
        f.write_str(name)
    }
}

/// A raw message posted by some frame. The payload is untrusted and unconstrained.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMessage {
    pub origin: Option<FrameRef>,
    pub payload: Value,
}

impl FrameMessage {
    pub fn new(origin: Option<FrameRef>, payload: impl Into<Value>) -> Self {
        Self {
            origin,
            payload: payload.into(),
        }
    }
}
