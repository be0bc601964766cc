use super::client::{ApiClient, generate_request_id};
use super::config::OrchestratorConfig;
use super::listener::{AuthEvent, AuthListener};
use crate::domain::attempt::{PaymentAttempt, mask_card_number};
use crate::domain::event::{InboundEvent, WireShape, normalize};
use crate::domain::frame::{FrameMessage, FramePurpose, FrameRef};
use crate::domain::ports::{CardValidatorBox, FingerprintCollectorBox, FrameHostBox, GatewayBox};
use crate::domain::protocol::{AuthRequest, AuthResponse, InitRequest};
use crate::domain::state::{Phase, TransactionSnapshot, TransactionState};
use crate::domain::status::{ChallengeInfo, Outcome, OutcomeKind, TransStatus};
use crate::error::AuthError;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Notification = (Arc<dyn AuthListener>, AuthEvent);

/// Everything mutated while processing one event step.
#[derive(Default)]
struct Session {
    state: TransactionState,
    /// Bumped per attempt and on teardown so stale timers recognise themselves.
    generation: u64,
    fallback: Option<JoinHandle<()>>,
    listener: Option<Arc<dyn AuthListener>>,
    outbox: Vec<Notification>,
}

impl Session {
    fn notify(&mut self, event: AuthEvent) {
        if let Some(listener) = &self.listener {
            self.outbox.push((Arc::clone(listener), event));
        }
    }

    fn cancel_fallback(&mut self) {
        if let Some(handle) = self.fallback.take() {
            handle.abort();
        }
    }

    fn take_outbox(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }
}

fn deliver(outbox: Vec<Notification>) {
    for (listener, event) in outbox {
        event.deliver(listener.as_ref());
    }
}

/// Drives one 3-D Secure authentication attempt at a time.
///
/// All transitions run while holding a single session lock, so RPC
/// completions, frame messages and the fallback timer are applied one step
/// at a time. Each "first wins" transition is a check-then-set on a
/// `TransactionState` guard inside that step. Cloning yields another handle
/// to the same orchestrator.
#[derive(Clone)]
pub struct ProtocolOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    client: ApiClient,
    frames: FrameHostBox,
    validator: CardValidatorBox,
    collector: FingerprintCollectorBox,
    config: OrchestratorConfig,
    session: Mutex<Session>,
}

impl ProtocolOrchestrator {
    pub fn new(
        gateway: GatewayBox,
        frames: FrameHostBox,
        validator: CardValidatorBox,
        collector: FingerprintCollectorBox,
        config: OrchestratorConfig,
    ) -> Self {
        let client = ApiClient::new(gateway, generate_request_id(), config.sdk_version.clone());
        info!(
            request_id = %client.request_id(),
            version = %config.sdk_version,
            "3DS orchestrator created"
        );
        Self {
            inner: Arc::new(Inner {
                client,
                frames,
                validator,
                collector,
                config,
                session: Mutex::new(Session::default()),
            }),
        }
    }

    /// The identifier stamped on every remote call made by this instance.
    pub fn request_id(&self) -> &str {
        self.inner.client.request_id()
    }

    /// Validates the attempt and runs the `init` phase.
    ///
    /// Returns once the fallback timer is armed; the rest of the protocol is
    /// driven by frame messages and the timer, and reported to `listener`.
    /// Errors are returned and also reported to `listener`.
    pub async fn authenticate(
        &self,
        attempt: PaymentAttempt,
        listener: Arc<dyn AuthListener>,
    ) -> Result<(), AuthError> {
        let mut session = self.inner.session.lock().await;
        let result = self.inner.begin(&mut session, attempt, listener).await;
        let outbox = session.take_outbox();
        drop(session);
        deliver(outbox);
        result
    }

    /// Single entry point for inbound frame traffic.
    pub async fn on_frame_message(&self, message: FrameMessage) {
        let shape = WireShape::of(&message.payload);
        let events = normalize(&message.payload);

        let mut session = self.inner.session.lock().await;
        for event in events {
            debug!(origin = ?message.origin, ?shape, ?event, "frame message received");
            self.inner.handle_event(&mut session, event).await;
        }
        let outbox = session.take_outbox();
        drop(session);
        deliver(outbox);
    }

    /// Feeds every message from `inbound` into `on_frame_message` until the channel closes.
    pub fn listen(&self, mut inbound: mpsc::UnboundedReceiver<FrameMessage>) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                orchestrator.on_frame_message(message).await;
            }
            debug!("frame message stream closed");
        })
    }

    /// Releases every frame, cancels the fallback timer and resets the state.
    ///
    /// Safe from any phase and any number of times.
    pub async fn teardown(&self) {
        let mut session = self.inner.session.lock().await;
        self.inner.teardown(&mut session).await;
    }

    pub async fn snapshot(&self) -> TransactionSnapshot {
        let session = self.inner.session.lock().await;
        let state = &session.state;
        TransactionSnapshot {
            phase: state.phase(),
            server_transaction_id: state.server_transaction_id().map(str::to_string),
            requestor_transaction_id: state.requestor_transaction_id().map(str::to_string),
            fingerprint_event_received: state.fingerprint_event_received(),
            challenge_acknowledged: state.challenge_acknowledged(),
            has_fingerprint: state.fingerprint_payload().is_some(),
            frame_count: self.inner.frames.frame_count().await,
            challenge_visible: state.challenge_visible(),
            request_id: self.request_id().to_string(),
        }
    }
}

impl Inner {
    async fn begin(
        self: &Arc<Self>,
        session: &mut Session,
        attempt: PaymentAttempt,
        listener: Arc<dyn AuthListener>,
    ) -> Result<(), AuthError> {
        if !session.state.phase().is_settled() {
            let error = AuthError::ProtocolError(
                "an authentication attempt is already in progress".to_string(),
            );
            warn!(phase = %session.state.phase(), "rejecting overlapping attempt");
            session.outbox.push((listener, AuthEvent::Failure(error.clone())));
            return Err(error);
        }

        session.state.reset();
        session.generation += 1;
        session.listener = Some(listener);

        info!(
            card = %mask_card_number(&attempt.card_number),
            amount = %attempt.amount,
            "starting 3DS authentication"
        );

        if let Err(error) = self.validator.validate(&attempt) {
            warn!(%error, "attempt rejected before contacting the server");
            session.notify(AuthEvent::Failure(error.clone()));
            return Err(error);
        }

        if let Err(error) = self.initialize(session, &attempt).await {
            self.fail(session, error.clone()).await;
            return Err(error);
        }
        Ok(())
    }

    async fn initialize(
        self: &Arc<Self>,
        session: &mut Session,
        attempt: &PaymentAttempt,
    ) -> Result<(), AuthError> {
        let state = &mut session.state;
        state.begin(attempt, Uuid::new_v4().to_string())?;

        let response = self
            .client
            .init(InitRequest {
                extra_fields: attempt.extra_fields.clone(),
                card_number: attempt.normalized_card_number(),
                expiry_date: attempt.expiry_date.clone(),
            })
            .await?;

        state.assign_server_transaction_id(response.server_transaction_id)?;
        if let Some(id) = response.requestor_transaction_id {
            state.adopt_requestor_transaction_id(id);
        }
        state.set_urls(response.callback_url, response.monitor_url, response.auth_url);
        info!(
            server_transaction_id = state.server_transaction_id().unwrap_or_default(),
            "init accepted"
        );

        if let Some(url) = state.take_monitor_url()
            && let Some(frame) = self.open_frame(FramePurpose::Monitor, &url).await
        {
            state.set_monitor_frame(frame);
        }
        if let Some(url) = state.take_callback_url()
            && let Some(frame) = self.open_frame(FramePurpose::Callback, &url).await
        {
            state.set_callback_frame(frame);
        }

        state.advance(Phase::AwaitingFingerprint)?;
        self.arm_fallback(session);
        Ok(())
    }

    /// Opens a hidden frame. Failures are logged and the protocol carries on.
    async fn open_frame(&self, purpose: FramePurpose, url: &str) -> Option<FrameRef> {
        match self.frames.open(purpose, url).await {
            Ok(frame) => {
                debug!(%purpose, %frame, url, "frame opened");
                Some(frame)
            }
            Err(error) => {
                warn!(%purpose, %error, "failed to open frame");
                None
            }
        }
    }

    fn arm_fallback(self: &Arc<Self>, session: &mut Session) {
        session.cancel_fallback();
        let generation = session.generation;
        let delay = self.config.fallback_timeout;
        let inner = Arc::clone(self);
        session.fallback = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fallback_elapsed(generation).await;
        }));
        debug!(?delay, "fallback timer armed");
    }

    async fn fallback_elapsed(&self, generation: u64) {
        let mut session = self.session.lock().await;
        if session.generation != generation {
            debug!("stale fallback timer ignored");
            return;
        }
        // Detach instead of aborting: this task is the timer itself.
        session.fallback.take();
        self.proceed_without_method_event(&mut session, "fallback timer elapsed")
            .await;
        let outbox = session.take_outbox();
        drop(session);
        deliver(outbox);
    }

    /// Continues to `auth` with whatever fingerprint is available, synthesizing one if needed.
    async fn proceed_without_method_event(&self, session: &mut Session, reason: &str) {
        if session.state.phase() != Phase::AwaitingFingerprint
            || !session.state.acknowledge_fingerprint()
        {
            debug!(reason, "fingerprint phase already handled");
            return;
        }
        session.cancel_fallback();
        info!(reason, "proceeding without 3DS method completion");

        if session.state.fingerprint_payload().is_none() {
            let payload = self.collector.collect();
            session.state.store_fingerprint(payload);
        }
        self.run_auth_phase(session).await;
    }

    async fn handle_event(&self, session: &mut Session, event: InboundEvent) {
        match event {
            InboundEvent::FingerprintDelivered(payload) => {
                if session.state.phase() != Phase::AwaitingFingerprint {
                    debug!(phase = %session.state.phase(), "fingerprint payload outside fingerprint phase ignored");
                } else if session.state.store_fingerprint(payload) {
                    debug!("fingerprint payload stored");
                } else {
                    debug!("fingerprint payload already stored");
                }
            }
            InboundEvent::FingerprintPhaseComplete => {
                if session.state.phase() != Phase::AwaitingFingerprint
                    || !session.state.acknowledge_fingerprint()
                {
                    debug!("duplicate fingerprint completion ignored");
                    return;
                }
                session.cancel_fallback();
                if session.state.fingerprint_payload().is_some() {
                    self.run_auth_phase(session).await;
                } else {
                    let error = AuthError::ProtocolError(
                        "fingerprint phase completed without data".to_string(),
                    );
                    self.fail(session, error).await;
                }
            }
            InboundEvent::FingerprintPhaseTimedOut => {
                self.proceed_without_method_event(session, "3DS Server reported method timeout")
                    .await;
            }
            InboundEvent::ChallengePhaseComplete => {
                if session.state.phase() != Phase::InChallenge
                    || !session.state.acknowledge_challenge()
                {
                    debug!("duplicate challenge completion ignored");
                    return;
                }
                self.resolve_challenge(session).await;
            }
            InboundEvent::Unrecognized => debug!("unrecognized frame message ignored"),
        }
    }

    async fn run_auth_phase(&self, session: &mut Session) {
        if let Err(error) = self.authenticate_with_server(session).await {
            self.fail(session, error).await;
        }
    }

    async fn authenticate_with_server(&self, session: &mut Session) -> Result<(), AuthError> {
        session.state.advance(Phase::Authenticating)?;
        let request = auth_request(&mut session.state)?;
        info!(purchase_amount = %request.purchase_amount, "sending auth request");
        let response = self.client.auth(request).await?;

        if let Some(url) = response.result_monitor_url.clone() {
            session.state.set_result_monitor_url(url);
        }
        if let Some(url) = session.state.take_result_monitor_url()
            && let Some(frame) = self.open_frame(FramePurpose::ResultMonitor, &url).await
        {
            session.state.set_result_monitor_frame(frame);
        }

        let status = response.trans_status.as_ref();
        info!(
            trans_status = status.map(TransStatus::code).unwrap_or("<none>"),
            "auth response received"
        );
        match OutcomeKind::for_status(status) {
            Some(kind) => {
                let outcome =
                    Outcome::from_kind(kind, status, response.details, self.client.request_id());
                self.finish(session, outcome).await;
                Ok(())
            }
            None => self.start_challenge(session, response).await,
        }
    }

    async fn start_challenge(
        &self,
        session: &mut Session,
        response: AuthResponse,
    ) -> Result<(), AuthError> {
        let Some(challenge_url) = response.challenge_url else {
            return Err(AuthError::ProtocolError(
                "challenge requested without a challenge URL".to_string(),
            ));
        };
        let frame = self
            .frames
            .open(FramePurpose::Challenge, &challenge_url)
            .await
            .map_err(|e| {
                AuthError::ProtocolError(format!("challenge frame could not be opened: {e}"))
            })?;
        session.state.set_challenge_frame(frame);
        session.state.advance(Phase::InChallenge)?;
        info!(%frame, "challenge started");

        let info = ChallengeInfo {
            challenge_url,
            server_transaction_id: session
                .state
                .server_transaction_id()
                .unwrap_or_default()
                .to_string(),
            details: response.details,
        };
        session.notify(AuthEvent::ChallengeStarted(info));
        Ok(())
    }

    async fn resolve_challenge(&self, session: &mut Session) {
        if let Err(error) = self.fetch_challenge_result(session).await {
            self.fail(session, error).await;
        }
    }

    async fn fetch_challenge_result(&self, session: &mut Session) -> Result<(), AuthError> {
        session.state.advance(Phase::AwaitingChallengeResult)?;
        let server_transaction_id = session
            .state
            .server_transaction_id()
            .map(str::to_string)
            .ok_or_else(|| AuthError::ProtocolError("missing server transaction id".to_string()))?;

        info!(%server_transaction_id, "challenge completed, fetching result");
        self.client
            .update_challenge_status(&server_transaction_id)
            .await?;
        let result = self.client.get_auth_result(&server_transaction_id).await?;

        let outcome = result.into_outcome(self.client.request_id());
        self.finish(session, outcome).await;
        Ok(())
    }

    async fn finish(&self, session: &mut Session, outcome: Outcome) {
        info!(
            status = %outcome.status,
            trans_status = %outcome.trans_status,
            success = outcome.success,
            "authentication finished"
        );
        session.state.terminate();
        self.release(session).await;
        session.notify(AuthEvent::Outcome(outcome));
    }

    async fn fail(&self, session: &mut Session, error: AuthError) {
        warn!(%error, phase = %session.state.phase(), "authentication attempt failed");
        session.state.terminate();
        self.release(session).await;
        session.notify(AuthEvent::Failure(error));
    }

    /// Frees the attempt's resources while keeping its identifiers and guards.
    async fn release(&self, session: &mut Session) {
        session.cancel_fallback();
        for frame in session.state.take_frames() {
            self.frames.close(frame).await;
        }
        session.state.clear_transient();
    }

    async fn teardown(&self, session: &mut Session) {
        session.generation += 1;
        self.release(session).await;
        self.frames.close_all().await;
        session.state.reset();
        session.listener = None;
        session.outbox.clear();
        debug!("orchestrator torn down");
    }
}

fn auth_request(state: &mut TransactionState) -> Result<AuthRequest, AuthError> {
    let missing =
        |what: &str| AuthError::ProtocolError(format!("auth phase started without {what}"));

    let card_number = state
        .card_number()
        .ok_or_else(|| missing("a card number"))?
        .to_string();
    let purchase_amount = state
        .amount()
        .ok_or_else(|| missing("an amount"))?
        .minor_units()?;
    let browser_info = state
        .fingerprint_payload()
        .ok_or_else(|| missing("a fingerprint payload"))?
        .to_string();
    let server_transaction_id = state
        .server_transaction_id()
        .ok_or_else(|| missing("a server transaction id"))?
        .to_string();
    let requestor_transaction_id = state
        .requestor_transaction_id()
        .ok_or_else(|| missing("a requestor transaction id"))?
        .to_string();

    Ok(AuthRequest {
        extra_fields: state.extra_fields().clone(),
        acct_number: card_number.clone(),
        card_number,
        browser_info,
        card_expiry_date: state.formatted_expiry(),
        purchase_amount,
        server_transaction_id,
        requestor_transaction_id,
        auth_url: state.take_auth_url(),
    })
}
