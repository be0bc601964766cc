use super::attempt::{Amount, PaymentAttempt, format_expiry};
use super::frame::FrameRef;
use crate::error::AuthError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Initializing,
    AwaitingFingerprint,
    Authenticating,
    InChallenge,
    AwaitingChallengeResult,
    Terminal,
}

impl Phase {
    fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Initializing)
                | (Initializing, AwaitingFingerprint)
                | (AwaitingFingerprint, Authenticating)
                | (Authenticating, InChallenge)
                | (Authenticating, Terminal)
                | (InChallenge, AwaitingChallengeResult)
                | (AwaitingChallengeResult, Terminal)
        )
    }

    /// Whether a new attempt may start from this phase.
    pub fn is_settled(self) -> bool {
        matches!(self, Phase::Idle | Phase::Terminal)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Mutable record of one authentication attempt.
///
/// Owned and mutated only by the orchestrator. Guards are check-then-set so a
/// duplicate event or a late timer can never repeat a protocol step.
#[derive(Debug, Default)]
pub struct TransactionState {
    phase: Phase,
    server_transaction_id: Option<String>,
    requestor_transaction_id: Option<String>,

    callback_url: Option<String>,
    monitor_url: Option<String>,
    auth_url: Option<String>,
    result_monitor_url: Option<String>,

    monitor_frame: Option<FrameRef>,
    callback_frame: Option<FrameRef>,
    result_monitor_frame: Option<FrameRef>,
    challenge_frame: Option<FrameRef>,

    fingerprint_payload: Option<String>,
    fingerprint_event_received: bool,
    challenge_acknowledged: bool,

    card_number: Option<String>,
    expiry_date: Option<String>,
    amount: Option<Amount>,
    extra_fields: Map<String, Value>,
}

impl TransactionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Moves to the next lifecycle phase, rejecting edges the protocol does not have.
    pub fn advance(&mut self, next: Phase) -> Result<(), AuthError> {
        if self.phase.can_advance_to(next) {
            self.phase = next;
            Ok(())
        } else {
            Err(AuthError::ProtocolError(format!(
                "illegal transition from {} to {}",
                self.phase, next
            )))
        }
    }

    /// Ends the attempt from any phase.
    pub fn terminate(&mut self) {
        self.phase = Phase::Terminal;
    }

    /// Starts a fresh attempt, retaining the caller payload for later phases.
    pub fn begin(
        &mut self,
        attempt: &PaymentAttempt,
        requestor_transaction_id: String,
    ) -> Result<(), AuthError> {
        if !self.phase.is_settled() {
            return Err(AuthError::ProtocolError(
                "an authentication attempt is already in progress".to_string(),
            ));
        }
        let amount = Amount::new(attempt.amount)?;
        self.reset();
        self.advance(Phase::Initializing)?;
        self.requestor_transaction_id = Some(requestor_transaction_id);
        self.card_number = Some(attempt.normalized_card_number());
        self.expiry_date = attempt.expiry_date.clone();
        self.amount = Some(amount);
        self.extra_fields = attempt.extra_fields.clone();
        Ok(())
    }

    pub fn server_transaction_id(&self) -> Option<&str> {
        self.server_transaction_id.as_deref()
    }

    /// Records the server-assigned id. It can be set once per attempt.
    pub fn assign_server_transaction_id(&mut self, id: String) -> Result<(), AuthError> {
        if self.server_transaction_id.is_some() {
            return Err(AuthError::ProtocolError(
                "server transaction id is already assigned".to_string(),
            ));
        }
        self.server_transaction_id = Some(id);
        Ok(())
    }

    pub fn requestor_transaction_id(&self) -> Option<&str> {
        self.requestor_transaction_id.as_deref()
    }

    pub fn adopt_requestor_transaction_id(&mut self, id: String) {
        self.requestor_transaction_id = Some(id);
    }

    pub fn set_urls(
        &mut self,
        callback_url: String,
        monitor_url: Option<String>,
        auth_url: Option<String>,
    ) {
        self.callback_url = Some(callback_url);
        self.monitor_url = monitor_url;
        self.auth_url = auth_url;
    }

    pub fn take_monitor_url(&mut self) -> Option<String> {
        self.monitor_url.take()
    }

    pub fn take_callback_url(&mut self) -> Option<String> {
        self.callback_url.take()
    }

    pub fn take_auth_url(&mut self) -> Option<String> {
        self.auth_url.take()
    }

    pub fn set_result_monitor_url(&mut self, url: String) {
        self.result_monitor_url = Some(url);
    }

    pub fn take_result_monitor_url(&mut self) -> Option<String> {
        self.result_monitor_url.take()
    }

    pub fn set_monitor_frame(&mut self, frame: FrameRef) {
        self.monitor_frame = Some(frame);
    }

    pub fn set_callback_frame(&mut self, frame: FrameRef) {
        self.callback_frame = Some(frame);
    }

    pub fn set_result_monitor_frame(&mut self, frame: FrameRef) {
        self.result_monitor_frame = Some(frame);
    }

    pub fn set_challenge_frame(&mut self, frame: FrameRef) {
        self.challenge_frame = Some(frame);
    }

    pub fn challenge_visible(&self) -> bool {
        self.challenge_frame.is_some()
    }

    /// Hands back every frame reference, leaving none behind.
    pub fn take_frames(&mut self) -> Vec<FrameRef> {
        [
            self.challenge_frame.take(),
            self.result_monitor_frame.take(),
            self.callback_frame.take(),
            self.monitor_frame.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn fingerprint_payload(&self) -> Option<&str> {
        self.fingerprint_payload.as_deref()
    }

    /// Stores the fingerprint payload. The first payload wins; returns whether this one was kept.
    pub fn store_fingerprint(&mut self, payload: String) -> bool {
        if self.fingerprint_payload.is_some() {
            return false;
        }
        self.fingerprint_payload = Some(payload);
        true
    }

    pub fn fingerprint_event_received(&self) -> bool {
        self.fingerprint_event_received
    }

    /// Claims the fingerprint phase. Returns `true` only for the first caller.
    pub fn acknowledge_fingerprint(&mut self) -> bool {
        !std::mem::replace(&mut self.fingerprint_event_received, true)
    }

    pub fn challenge_acknowledged(&self) -> bool {
        self.challenge_acknowledged
    }

    /// Claims the challenge result sequence. Returns `true` only for the first caller.
    pub fn acknowledge_challenge(&mut self) -> bool {
        !std::mem::replace(&mut self.challenge_acknowledged, true)
    }

    pub fn card_number(&self) -> Option<&str> {
        self.card_number.as_deref()
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    /// Expiry in the `YYMM` form used by `auth`.
    pub fn formatted_expiry(&self) -> Option<String> {
        self.expiry_date.as_deref().and_then(format_expiry)
    }

    pub fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra_fields
    }

    /// Drops the caller payload and unconsumed URLs once the attempt is over.
    ///
    /// Identifiers and guards survive so late events stay no-ops.
    pub fn clear_transient(&mut self) {
        self.callback_url = None;
        self.monitor_url = None;
        self.auth_url = None;
        self.result_monitor_url = None;
        self.fingerprint_payload = None;
        self.card_number = None;
        self.expiry_date = None;
        self.amount = None;
        self.extra_fields.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_frames(&self) -> bool {
        self.monitor_frame.is_some()
            || self.callback_frame.is_some()
            || self.result_monitor_frame.is_some()
            || self.challenge_frame.is_some()
    }
}

/// Read-only diagnostic view of an orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub phase: Phase,
    pub server_transaction_id: Option<String>,
    pub requestor_transaction_id: Option<String>,
    pub fingerprint_event_received: bool,
    pub challenge_acknowledged: bool,
    pub has_fingerprint: bool,
    pub frame_count: usize,
    pub challenge_visible: bool,
    pub request_id: String,
}
