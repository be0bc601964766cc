use crate::domain::ports::GatewayBox;
use crate::domain::protocol::{
    AuthRequest, AuthResponse, AuthResult, CHALLENGE_COMPLETED_CODE, ChallengeStatusUpdate,
    Envelope, InitRequest, InitResponse, Operation, RemoteRequest, ResultQuery,
};
use crate::error::AuthError;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a request id of the form `req_<unix millis>_<9 base36 chars>`.
pub fn generate_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("req_{millis}_{suffix}")
}

/// Typed access to the 3DS Server on top of a raw `RemoteCallGateway`.
///
/// Every call carries the same request id and version tag. Envelopes are
/// opened and validated here so callers only deal with typed responses.
pub struct ApiClient {
    gateway: GatewayBox,
    request_id: String,
    version: String,
}

impl ApiClient {
    pub fn new(gateway: GatewayBox, request_id: String, version: String) -> Self {
        Self {
            gateway,
            request_id,
            version,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub async fn init(&self, request: InitRequest) -> Result<InitResponse, AuthError> {
        let envelope = self.call(Operation::Init, request).await?;
        InitResponse::decode(envelope)
    }

    pub async fn auth(&self, request: AuthRequest) -> Result<AuthResponse, AuthError> {
        let envelope = self.call(Operation::Auth, request).await?;
        AuthResponse::decode(envelope)
    }

    pub async fn update_challenge_status(
        &self,
        server_transaction_id: &str,
    ) -> Result<(), AuthError> {
        let update = ChallengeStatusUpdate {
            server_transaction_id: server_transaction_id.to_string(),
            status: CHALLENGE_COMPLETED_CODE.to_string(),
        };
        self.call(Operation::UpdateChallengeStatus, update).await?;
        Ok(())
    }

    pub async fn get_auth_result(&self, server_transaction_id: &str) -> Result<AuthResult, AuthError> {
        let query = ResultQuery {
            server_transaction_id: server_transaction_id.to_string(),
        };
        let envelope = self.call(Operation::GetAuthResult, query).await?;
        Ok(AuthResult::decode(envelope))
    }

    async fn call<B: Serialize>(&self, operation: Operation, body: B) -> Result<Envelope, AuthError> {
        let mut payload = match serde_json::to_value(body) {
            Ok(Value::Object(payload)) => payload,
            Ok(other) => {
                return Err(AuthError::ProtocolError(format!(
                    "{operation} body must be an object, got {other}"
                )));
            }
            Err(e) => {
                return Err(AuthError::ProtocolError(format!(
                    "failed to encode {operation} body: {e}"
                )));
            }
        };
        payload.insert("operation".into(), operation.as_str().into());
        payload.insert("requestId".into(), self.request_id.clone().into());

        debug!(%operation, request_id = %self.request_id, "issuing remote call");
        let raw = self
            .gateway
            .call(RemoteRequest {
                operation,
                request_id: self.request_id.clone(),
                version: self.version.clone(),
                payload,
            })
            .await?;
        Envelope::open(raw)
    }
}
