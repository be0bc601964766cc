//! Normalization of untrusted cross-frame traffic into protocol events.
//!
//! Frames may post an object carrying an `event` field, a typed
//! `3ds-notification` object, or a bare string token. Everything else on the
//! channel is unrelated traffic and maps to [`InboundEvent::Unrecognized`].

use serde_json::{Map, Value};

const NOTIFICATION_TYPE: &str = "3ds-notification";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The 3DS Server handed over the browser-info payload.
    FingerprintDelivered(String),
    /// The 3DS method step finished or was skipped.
    FingerprintPhaseComplete,
    /// The 3DS Server gave up waiting on the method step.
    FingerprintPhaseTimedOut,
    /// The issuer challenge finished and a result is ready.
    ChallengePhaseComplete,
    Unrecognized,
}

/// The wire shape a message arrived in. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    EventObject,
    Notification,
    Token,
    Unknown,
}

impl WireShape {
    pub fn of(payload: &Value) -> Self {
        match payload {
            Value::Object(object) if is_notification(object) => WireShape::Notification,
            Value::Object(object) if object.get("event").is_some_and(Value::is_string) => {
                WireShape::EventObject
            }
            Value::String(_) => WireShape::Token,
            _ => WireShape::Unknown,
        }
    }
}

fn is_notification(object: &Map<String, Value>) -> bool {
    object.get("type").and_then(Value::as_str) == Some(NOTIFICATION_TYPE)
}

fn classify_token(token: &str) -> Option<InboundEvent> {
    match token.trim() {
        "3DSMethodSkipped" | "3DSMethodFinished" => Some(InboundEvent::FingerprintPhaseComplete),
        "InitAuthTimedOut" => Some(InboundEvent::FingerprintPhaseTimedOut),
        "Challenge:Completed" | "AuthResultReady" => Some(InboundEvent::ChallengePhaseComplete),
        _ => None,
    }
}

/// Maps one raw payload to the events it carries, in processing order.
///
/// A payload delivered alongside an event is always reported first so the
/// phase event observes it. Never returns an empty list.
pub fn normalize(payload: &Value) -> Vec<InboundEvent> {
    let events = match payload {
        Value::Object(object) => normalize_object(object),
        Value::String(token) => classify_token(token).into_iter().collect(),
        _ => Vec::new(),
    };
    if events.is_empty() {
        vec![InboundEvent::Unrecognized]
    } else {
        events
    }
}

fn normalize_object(object: &Map<String, Value>) -> Vec<InboundEvent> {
    let Some(token) = object.get("event").and_then(Value::as_str) else {
        return Vec::new();
    };

    let mut events = Vec::with_capacity(2);
    if let Some(payload) = object.get("param").and_then(opaque_payload) {
        events.push(InboundEvent::FingerprintDelivered(payload));
    }
    events.extend(classify_token(token));
    events
}

/// The fingerprint payload carried by `param`, kept opaque.
///
/// Strings pass through as-is; other truthy values keep their JSON text.
/// `null`, `false` and `""` carry nothing.
fn opaque_payload(param: &Value) -> Option<String> {
    match param {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
