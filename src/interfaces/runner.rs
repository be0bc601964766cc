//! Drives single attempts end to end against the simulated 3DS Server.

use super::csv::attempt_reader::{AttemptRecord, MethodBehaviour};
use super::csv::outcome_writer::OutcomeRecord;
use crate::application::config::OrchestratorConfig;
use crate::application::listener::AuthEvent;
use crate::application::orchestrator::ProtocolOrchestrator;
use crate::domain::attempt::mask_card_number;
use crate::domain::frame::FramePurpose;
use crate::domain::ports::FingerprintCollector;
use crate::domain::status::Outcome;
use crate::error::{AuthError, Result};
use crate::infrastructure::browser_collector::BrowserInfoCollector;
use crate::infrastructure::card_validator::LuhnCardValidator;
use crate::infrastructure::in_memory::InMemoryFrameHost;
use crate::infrastructure::simulated::SimulatedThreeDsServer;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Time allowed on top of the fallback timeout for the rest of an attempt.
const SETTLE_GRACE: Duration = Duration::from_secs(5);

/// Which statuses the simulated server answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub auth_status: String,
    pub challenge_status: String,
}

impl Scenario {
    /// Parses `<auth status>[:<challenge result status>]`. Empty means `Y`.
    pub fn parse(raw: &str) -> std::result::Result<Self, AuthError> {
        let raw = raw.trim();
        let (auth, challenge) = raw.split_once(':').unwrap_or((raw, "Y"));
        let (auth, challenge) = (auth.trim(), challenge.trim());
        if challenge.is_empty() || challenge.contains(':') {
            return Err(AuthError::ValidationError(format!(
                "unrecognised scenario `{raw}`"
            )));
        }
        Ok(Self {
            auth_status: if auth.is_empty() { "Y" } else { auth }.to_string(),
            challenge_status: challenge.to_string(),
        })
    }
}

/// Runs each attempt through a fresh orchestrator wired to in-memory frames
/// and a simulated server, acting as the frames would.
pub struct ScenarioRunner {
    config: OrchestratorConfig,
}

impl ScenarioRunner {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, record: &AttemptRecord) -> Result<OutcomeRecord> {
        let scenario = Scenario::parse(record.scenario.as_deref().unwrap_or_default())?;
        let server =
            SimulatedThreeDsServer::scripted(&scenario.auth_status, &scenario.challenge_status);
        let collector = BrowserInfoCollector::default();
        let browser_info = collector.collect();

        let (frames, inbound) = InMemoryFrameHost::new();
        let orchestrator = ProtocolOrchestrator::new(
            Box::new(server),
            Box::new(frames.clone()),
            Box::new(LuhnCardValidator::new()),
            Box::new(collector),
            self.config.clone(),
        );
        let pump = orchestrator.listen(inbound);

        let (listener, mut events) = mpsc::unbounded_channel();
        let result = async {
            orchestrator
                .authenticate(record.attempt(), Arc::new(listener))
                .await?;

            let callback = frames.find(FramePurpose::Callback).await.map(|f| f.frame);
            match record.method() {
                MethodBehaviour::Finished => {
                    let message = json!({"event": "3DSMethodFinished", "param": browser_info});
                    frames.post(callback, message);
                }
                MethodBehaviour::Skipped => {
                    let message = json!({"event": "3DSMethodSkipped", "param": browser_info});
                    frames.post(callback, message);
                }
                MethodBehaviour::TimedOut => {
                    let monitor = frames.find(FramePurpose::Monitor).await.map(|f| f.frame);
                    frames.post(monitor, json!("InitAuthTimedOut"));
                }
                MethodBehaviour::Silent => debug!("leaving the method step to the fallback timer"),
            }

            let deadline = self.config.fallback_timeout + SETTLE_GRACE;
            tokio::time::timeout(deadline, settle(&frames, &mut events))
                .await
                .map_err(|_| {
                    AuthError::ProtocolError("attempt did not settle in time".to_string())
                })?
        }
        .await;

        orchestrator.teardown().await;
        pump.abort();

        let outcome = result?;
        Ok(OutcomeRecord {
            card: mask_card_number(&record.card_number),
            trans_status: outcome.trans_status,
            status: outcome.status,
            success: outcome.success,
            message: outcome.message,
        })
    }
}

/// Waits for the terminal event, completing any challenge on the way.
async fn settle(
    frames: &InMemoryFrameHost,
    events: &mut mpsc::UnboundedReceiver<AuthEvent>,
) -> std::result::Result<Outcome, AuthError> {
    while let Some(event) = events.recv().await {
        match event {
            AuthEvent::ChallengeStarted(info) => {
                debug!(url = %info.challenge_url, "completing challenge");
                let challenge = frames.find(FramePurpose::Challenge).await.map(|f| f.frame);
                frames.post(challenge, json!("Challenge:Completed"));
            }
            AuthEvent::Outcome(outcome) => return Ok(outcome),
            AuthEvent::Failure(error) => return Err(error),
        }
    }
    Err(AuthError::ProtocolError(
        "listener channel closed before the attempt settled".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_parse() {
        assert_eq!(
            Scenario::parse("").unwrap(),
            Scenario {
                auth_status: "Y".into(),
                challenge_status: "Y".into()
            }
        );
        assert_eq!(Scenario::parse("C:N").unwrap().challenge_status, "N");
        assert_eq!(Scenario::parse(" R ").unwrap().auth_status, "R");
        assert!(Scenario::parse("C:").is_err());
        assert!(Scenario::parse("C:N:Y").is_err());
    }
}
