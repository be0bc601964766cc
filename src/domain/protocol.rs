//! Typed contract for the 3DS Server RPC operations.
//!
//! Responses are decoded and validated once here; the orchestrator only sees
//! the typed forms with their optional fields made explicit.

use super::status::{Outcome, TransStatus};
use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Status code sent with `updateChallengeStatus` once the challenge finishes.
pub const CHALLENGE_COMPLETED_CODE: &str = "01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Init,
    Auth,
    UpdateChallengeStatus,
    GetAuthResult,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Auth => "auth",
            Operation::UpdateChallengeStatus => "updateChallengeStatus",
            Operation::GetAuthResult => "getAuthResult",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call handed to a `RemoteCallGateway`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub operation: Operation,
    /// Stable for the lifetime of the orchestrator instance.
    pub request_id: String,
    pub version: String,
    /// JSON body; already carries `operation` and `requestId`.
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
    pub card_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
    pub acct_number: String,
    pub card_number: String,
    pub browser_info: String,
    pub card_expiry_date: Option<String>,
    pub purchase_amount: String,
    #[serde(rename = "threeDSServerTransID")]
    pub server_transaction_id: String,
    #[serde(rename = "threeDSRequestorTransID")]
    pub requestor_transaction_id: String,
    pub auth_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeStatusUpdate {
    #[serde(rename = "threeDSServerTransID")]
    pub server_transaction_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultQuery {
    #[serde(rename = "threeDSServerTransID")]
    pub server_transaction_id: String,
}

/// The response envelope every operation shares: `{ data?, error?, resultMonUrl? }`.
///
/// Servers that omit `data` put the body at the top level instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub data: Value,
    pub result_monitor_url: Option<String>,
}

impl Envelope {
    pub fn open(raw: Value) -> Result<Self, AuthError> {
        let mut object = match raw {
            Value::Object(object) => object,
            other => {
                return Err(AuthError::RemoteError(format!(
                    "unexpected response shape: {other}"
                )));
            }
        };

        if let Some(error) = object.get("error").filter(|e| is_truthy(e)) {
            let message = match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            return Err(AuthError::RemoteError(message));
        }

        let result_monitor_url = non_empty(object.get("resultMonUrl"));
        let data = if matches!(object.get("data"), Some(Value::Object(_))) {
            object.remove("data").unwrap_or_default()
        } else {
            Value::Object(object)
        };

        Ok(Self {
            data,
            result_monitor_url,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
struct IframeUrls {
    callback: Option<String>,
    monitor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitData {
    #[serde(rename = "threeDSServerTransID")]
    server_transaction_id: Option<String>,
    #[serde(rename = "threeDSRequestorTransID")]
    requestor_transaction_id: Option<String>,
    #[serde(rename = "iframeUrls", default)]
    iframe_urls: Option<IframeUrls>,
    #[serde(rename = "authUrl")]
    auth_url: Option<String>,
}

/// Validated `init` response.
#[derive(Debug, Clone, PartialEq)]
pub struct InitResponse {
    pub server_transaction_id: String,
    pub requestor_transaction_id: Option<String>,
    pub callback_url: String,
    pub monitor_url: Option<String>,
    pub auth_url: Option<String>,
}

impl InitResponse {
    pub fn decode(envelope: Envelope) -> Result<Self, AuthError> {
        let data: InitData = serde_json::from_value(envelope.data)
            .map_err(|e| AuthError::RemoteError(format!("malformed init response: {e}")))?;
        let urls = data.iframe_urls.unwrap_or_default();

        let server_transaction_id = data
            .server_transaction_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AuthError::RemoteError("malformed init response: missing threeDSServerTransID".into())
            })?;
        let callback_url = urls.callback.filter(|url| !url.is_empty()).ok_or_else(|| {
            AuthError::RemoteError("malformed init response: missing callback URL".into())
        })?;

        Ok(Self {
            server_transaction_id,
            requestor_transaction_id: data.requestor_transaction_id.filter(|id| !id.is_empty()),
            callback_url,
            monitor_url: urls.monitor.filter(|url| !url.is_empty()),
            auth_url: data.auth_url.filter(|url| !url.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthData {
    trans_status: Option<Value>,
    challenge_url: Option<String>,
}

/// Any non-null `transStatus` is kept; non-strings become `Other` with their JSON text.
fn status_of(value: Value) -> Option<TransStatus> {
    match value {
        Value::Null => None,
        Value::String(code) => Some(TransStatus::from(code)),
        other => Some(TransStatus::Other(other.to_string())),
    }
}

/// Validated `auth` response.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResponse {
    pub trans_status: Option<TransStatus>,
    pub challenge_url: Option<String>,
    pub result_monitor_url: Option<String>,
    /// The full response body, forwarded to listeners.
    pub details: Value,
}

impl AuthResponse {
    pub fn decode(envelope: Envelope) -> Result<Self, AuthError> {
        let data: AuthData = serde_json::from_value(envelope.data.clone())
            .map_err(|e| AuthError::RemoteError(format!("malformed auth response: {e}")))?;
        Ok(Self {
            trans_status: data.trans_status.and_then(status_of),
            challenge_url: data.challenge_url.filter(|url| !url.is_empty()),
            result_monitor_url: envelope.result_monitor_url,
            details: envelope.data,
        })
    }
}

/// Validated `getAuthResult` response, with defaults applied for absent fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthResult {
    pub trans_status: TransStatus,
    pub status: String,
    pub message: String,
    pub details: Value,
}

impl AuthResult {
    pub const UNKNOWN_STATUS: &'static str = "Unknown";

    pub fn decode(envelope: Envelope) -> Self {
        let field = |name: &str| non_empty(envelope.data.get(name));
        let trans_status = field("transStatus")
            .map(TransStatus::from)
            .unwrap_or_else(|| TransStatus::Other(Self::UNKNOWN_STATUS.to_string()));
        let status = field("status").unwrap_or_else(|| "completed".to_string());
        let message = field("message").unwrap_or_else(|| "Authentication Completed".to_string());

        Self {
            trans_status,
            status,
            message,
            details: envelope.data,
        }
    }

    /// The terminal outcome of a challenged attempt.
    ///
    /// Only `N`, `R` and `U` count as failures; an absent status is not one.
    pub fn into_outcome(self, request_id: &str) -> Outcome {
        Outcome {
            success: !self.trans_status.is_failure(),
            status: self.status,
            message: self.message,
            trans_status: self.trans_status.code().to_string(),
            details: self.details,
            request_id: request_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open(raw: Value) -> Envelope {
        Envelope::open(raw).expect("envelope should open")
    }

    #[test]
    fn test_envelope_error_field_is_remote_error() {
        let err = Envelope::open(json!({"error": "card not enrolled"})).unwrap_err();
        assert_eq!(err, AuthError::RemoteError("card not enrolled".to_string()));

        // Falsy error fields are ignored.
        assert!(Envelope::open(json!({"error": "", "data": {}})).is_ok());
        assert!(Envelope::open(json!({"error": null, "data": {}})).is_ok());
    }

    #[test]
    fn test_envelope_without_data_uses_top_level() {
        let envelope = open(json!({"transStatus": "Y"}));
        assert_eq!(envelope.data["transStatus"], "Y");
    }

    #[test]
    fn test_init_response_requires_transaction_id_and_callback() {
        let ok = InitResponse::decode(open(json!({"data": {
            "threeDSServerTransID": "srv-1",
            "iframeUrls": {"callback": "https://3ds/cb"}
        }})))
        .unwrap();
        assert_eq!(ok.server_transaction_id, "srv-1");
        assert_eq!(ok.callback_url, "https://3ds/cb");
        assert_eq!(ok.monitor_url, None);

        let missing_id = InitResponse::decode(open(json!({"data": {
            "iframeUrls": {"callback": "https://3ds/cb"}
        }})));
        assert!(matches!(missing_id, Err(AuthError::RemoteError(m)) if m.contains("malformed init response")));

        let missing_callback = InitResponse::decode(open(json!({"data": {
            "threeDSServerTransID": "srv-1",
            "iframeUrls": {"monitor": "https://3ds/mon"}
        }})));
        assert!(matches!(missing_callback, Err(AuthError::RemoteError(m)) if m.contains("malformed init response")));
    }

    #[test]
    fn test_auth_response_reads_result_monitor_from_envelope() {
        let response = AuthResponse::decode(open(json!({
            "resultMonUrl": "https://3ds/result",
            "data": {"transStatus": "C", "challengeUrl": ""}
        })))
        .unwrap();
        assert_eq!(response.trans_status, Some(TransStatus::Challenge));
        assert_eq!(response.challenge_url, None);
        assert_eq!(response.result_monitor_url.as_deref(), Some("https://3ds/result"));
    }

    #[test]
    fn test_non_string_auth_status_is_kept_as_other() {
        let response = AuthResponse::decode(open(json!({"data": {"transStatus": 1}}))).unwrap();
        assert_eq!(response.trans_status, Some(TransStatus::Other("1".to_string())));

        let response = AuthResponse::decode(open(json!({"data": {"transStatus": null}}))).unwrap();
        assert_eq!(response.trans_status, None);
    }

    #[test]
    fn test_auth_result_defaults() {
        let result = AuthResult::decode(open(json!({"data": {"eci": "05"}})));
        assert_eq!(result.trans_status.code(), "Unknown");
        assert_eq!(result.status, "completed");
        assert_eq!(result.message, "Authentication Completed");
    }

    #[test]
    fn test_auth_request_protocol_fields_win_over_extras() {
        let mut extra_fields = Map::new();
        extra_fields.insert("purchaseAmount".into(), json!("1"));
        extra_fields.insert("merchantRef".into(), json!("order-7"));
        let request = AuthRequest {
            extra_fields,
            acct_number: "4111111111111111".into(),
            card_number: "4111111111111111".into(),
            browser_info: "blob".into(),
            card_expiry_date: Some("2912".into()),
            purchase_amount: "1000".into(),
            server_transaction_id: "srv-1".into(),
            requestor_transaction_id: "req-1".into(),
            auth_url: None,
        };
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["purchaseAmount"], "1000");
        assert_eq!(body["merchantRef"], "order-7");
        assert_eq!(body["threeDSServerTransID"], "srv-1");
    }
}
