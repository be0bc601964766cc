use crate::domain::status::{ChallengeInfo, Outcome};
use crate::error::AuthError;
use tokio::sync::mpsc;

/// Caller-side callbacks for one authentication attempt.
///
/// Invoked after the orchestrator has released its internal lock, so a
/// listener may call back into the orchestrator (e.g. `teardown`).
pub trait AuthListener: Send + Sync {
    fn on_outcome(&self, outcome: Outcome);
    fn on_failure(&self, error: AuthError);
    fn on_challenge_started(&self, info: ChallengeInfo);
}

/// A notification queued for delivery to a listener.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    Outcome(Outcome),
    Failure(AuthError),
    ChallengeStarted(ChallengeInfo),
}

impl AuthEvent {
    pub fn deliver(self, listener: &dyn AuthListener) {
        match self {
            AuthEvent::Outcome(outcome) => listener.on_outcome(outcome),
            AuthEvent::Failure(error) => listener.on_failure(error),
            AuthEvent::ChallengeStarted(info) => listener.on_challenge_started(info),
        }
    }
}

/// Forwards every callback into a channel. A closed receiver is ignored.
impl AuthListener for mpsc::UnboundedSender<AuthEvent> {
    fn on_outcome(&self, outcome: Outcome) {
        let _ = self.send(AuthEvent::Outcome(outcome));
    }

    fn on_failure(&self, error: AuthError) {
        let _ = self.send(AuthEvent::Failure(error));
    }

    fn on_challenge_started(&self, info: ChallengeInfo) {
        let _ = self.send(AuthEvent::ChallengeStarted(info));
    }
}
