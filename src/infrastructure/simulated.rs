use crate::domain::ports::RemoteCallGateway;
use crate::domain::protocol::{Operation, RemoteRequest};
use crate::error::AuthError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const SERVER_TRANSACTION_ID: &str = "srv-0001";
pub const CALLBACK_URL: &str = "https://3ds.example/method/callback";
pub const MONITOR_URL: &str = "https://3ds.example/method/monitor";
pub const AUTH_URL: &str = "https://3ds.example/auth";
pub const RESULT_MONITOR_URL: &str = "https://3ds.example/result/monitor";
pub const CHALLENGE_URL: &str = "https://acs.example/challenge";

#[derive(Debug, Clone)]
enum Reply {
    Respond(Value),
    Fail(String),
}

#[derive(Debug, Default)]
struct ServerState {
    replies: HashMap<Operation, Reply>,
    calls: Vec<RemoteRequest>,
}

/// A scripted 3DS Server.
///
/// Each operation answers with a canned response body that can be replaced
/// per operation. Every request is recorded for later inspection. Clones share
/// the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct SimulatedThreeDsServer {
    state: Arc<RwLock<ServerState>>,
}

impl SimulatedThreeDsServer {
    /// A server whose `auth` answers with `auth_status` and whose challenge
    /// result, if one is fetched, is `Y`.
    pub fn approving(auth_status: &str) -> Self {
        Self::scripted(auth_status, "Y")
    }

    /// A server answering `auth` with `auth_status` and `getAuthResult` with `challenge_status`.
    ///
    /// A `C` status comes with a challenge URL and every `auth` response
    /// carries a result-monitor URL.
    pub fn scripted(auth_status: &str, challenge_status: &str) -> Self {
        let mut auth = json!({"transStatus": auth_status});
        if auth_status == "C" {
            auth["challengeUrl"] = json!(CHALLENGE_URL);
        }

        let replies = HashMap::from([
            (
                Operation::Init,
                Reply::Respond(json!({"data": {
                    "threeDSServerTransID": SERVER_TRANSACTION_ID,
                    "iframeUrls": {"callback": CALLBACK_URL, "monitor": MONITOR_URL},
                    "authUrl": AUTH_URL,
                }})),
            ),
            (
                Operation::Auth,
                Reply::Respond(json!({"data": auth, "resultMonUrl": RESULT_MONITOR_URL})),
            ),
            (
                Operation::UpdateChallengeStatus,
                Reply::Respond(json!({"data": {"status": "ok"}})),
            ),
            (
                Operation::GetAuthResult,
                Reply::Respond(json!({"data": {
                    "transStatus": challenge_status,
                    "status": "completed",
                    "message": "Authentication Completed",
                }})),
            ),
        ]);

        Self {
            state: Arc::new(RwLock::new(ServerState {
                replies,
                calls: Vec::new(),
            })),
        }
    }

    /// Replaces the response body for `operation`.
    pub async fn respond(&self, operation: Operation, body: Value) {
        self.state
            .write()
            .await
            .replies
            .insert(operation, Reply::Respond(body));
    }

    /// Makes `operation` fail at the transport level.
    pub async fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.state
            .write()
            .await
            .replies
            .insert(operation, Reply::Fail(message.into()));
    }

    pub async fn calls(&self) -> Vec<RemoteRequest> {
        self.state.read().await.calls.clone()
    }

    pub async fn calls_for(&self, operation: Operation) -> Vec<RemoteRequest> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    pub async fn call_count(&self, operation: Operation) -> usize {
        self.calls_for(operation).await.len()
    }
}

#[async_trait]
impl RemoteCallGateway for SimulatedThreeDsServer {
    async fn call(&self, request: RemoteRequest) -> Result<Value, AuthError> {
        let mut state = self.state.write().await;
        let operation = request.operation;
        state.calls.push(request);
        match state.replies.get(&operation) {
            Some(Reply::Respond(body)) => Ok(body.clone()),
            Some(Reply::Fail(message)) => Err(AuthError::RemoteError(message.clone())),
            None => Err(AuthError::RemoteError(format!(
                "{operation} is not scripted"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn request(operation: Operation) -> RemoteRequest {
        RemoteRequest {
            operation,
            request_id: "req_1_test".to_string(),
            version: "1.0.0".to_string(),
            payload: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_challenge_script_carries_challenge_url() {
        let server = SimulatedThreeDsServer::scripted("C", "N");
        let auth = server.call(request(Operation::Auth)).await.unwrap();
        assert_eq!(auth["data"]["challengeUrl"], CHALLENGE_URL);
        assert_eq!(auth["resultMonUrl"], RESULT_MONITOR_URL);

        let result = server.call(request(Operation::GetAuthResult)).await.unwrap();
        assert_eq!(result["data"]["transStatus"], "N");
    }

    #[tokio::test]
    async fn test_calls_are_recorded_even_when_failing() {
        let server = SimulatedThreeDsServer::approving("Y");
        server.fail(Operation::Init, "connection refused").await;

        let err = server.call(request(Operation::Init)).await.unwrap_err();
        assert_eq!(err, AuthError::RemoteError("connection refused".into()));
        assert_eq!(server.call_count(Operation::Init).await, 1);
        assert_eq!(server.call_count(Operation::Auth).await, 0);
    }

    #[tokio::test]
    async fn test_unscripted_operation_fails() {
        let server = SimulatedThreeDsServer::default();
        assert!(server.call(request(Operation::Auth)).await.is_err());
    }
}
