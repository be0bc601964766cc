#![allow(dead_code)]

use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use threeds_client::application::config::OrchestratorConfig;
use threeds_client::application::listener::{AuthEvent, AuthListener};
use threeds_client::application::orchestrator::ProtocolOrchestrator;
use threeds_client::domain::attempt::PaymentAttempt;
use threeds_client::domain::frame::FrameMessage;
use threeds_client::domain::ports::FingerprintCollector;
use threeds_client::infrastructure::card_validator::LuhnCardValidator;
use threeds_client::infrastructure::in_memory::InMemoryFrameHost;
use threeds_client::infrastructure::simulated::SimulatedThreeDsServer;
use tokio::sync::mpsc;

pub const SYNTHETIC_FINGERPRINT: &str = "synthetic-browser-info";

pub struct FixedCollector;

impl FingerprintCollector for FixedCollector {
    fn collect(&self) -> String {
        SYNTHETIC_FINGERPRINT.to_string()
    }
}

pub struct Harness {
    pub orchestrator: ProtocolOrchestrator,
    pub server: SimulatedThreeDsServer,
    pub frames: InMemoryFrameHost,
    pub inbound: Option<mpsc::UnboundedReceiver<FrameMessage>>,
    pub events: mpsc::UnboundedReceiver<AuthEvent>,
    pub listener: Arc<dyn AuthListener>,
}

pub fn harness(server: SimulatedThreeDsServer) -> Harness {
    harness_with(server, OrchestratorConfig::default())
}

pub fn harness_with(server: SimulatedThreeDsServer, config: OrchestratorConfig) -> Harness {
    let (frames, inbound) = InMemoryFrameHost::new();
    let orchestrator = ProtocolOrchestrator::new(
        Box::new(server.clone()),
        Box::new(frames.clone()),
        Box::new(LuhnCardValidator::new()),
        Box::new(FixedCollector),
        config,
    );
    let (tx, events) = mpsc::unbounded_channel();
    Harness {
        orchestrator,
        server,
        frames,
        inbound: Some(inbound),
        events,
        listener: Arc::new(tx),
    }
}

pub fn attempt() -> PaymentAttempt {
    PaymentAttempt::new("4111 1111 1111 1111", dec!(10.00)).with_expiry("12/99")
}

pub fn method_finished(param: &str) -> Value {
    json!({"event": "3DSMethodFinished", "param": param})
}

impl Harness {
    pub async fn start(&self) {
        self.orchestrator
            .authenticate(attempt(), self.listener.clone())
            .await
            .expect("authenticate should succeed");
    }

    pub async fn send(&self, payload: Value) {
        self.orchestrator
            .on_frame_message(FrameMessage::new(None, payload))
            .await;
    }

    /// Every listener notification delivered so far.
    pub fn drain(&mut self) -> Vec<AuthEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
