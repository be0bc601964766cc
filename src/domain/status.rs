use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The single-character transaction status returned by the 3DS Server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransStatus {
    /// `Y`
    Authenticated,
    /// `N`
    NotAuthenticated,
    /// `A`
    Attempted,
    /// `R`
    Rejected,
    /// `U`
    Unavailable,
    /// `D`
    Decoupled,
    /// `C`
    Challenge,
    Other(String),
}

impl TransStatus {
    pub fn parse(code: &str) -> Self {
        match code {
            "Y" => TransStatus::Authenticated,
            "N" => TransStatus::NotAuthenticated,
            "A" => TransStatus::Attempted,
            "R" => TransStatus::Rejected,
            "U" => TransStatus::Unavailable,
            "D" => TransStatus::Decoupled,
            "C" => TransStatus::Challenge,
            other => TransStatus::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            TransStatus::Authenticated => "Y",
            TransStatus::NotAuthenticated => "N",
            TransStatus::Attempted => "A",
            TransStatus::Rejected => "R",
            TransStatus::Unavailable => "U",
            TransStatus::Decoupled => "D",
            TransStatus::Challenge => "C",
            TransStatus::Other(code) => code,
        }
    }

    /// Statuses that end the attempt unsuccessfully.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TransStatus::NotAuthenticated | TransStatus::Rejected | TransStatus::Unavailable
        )
    }
}

impl From<String> for TransStatus {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<TransStatus> for String {
    fn from(status: TransStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for TransStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal qualifier attached to an outcome produced by the `auth` branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Failed,
    Partial,
    Rejected,
    Error,
    Decoupled,
    Complete,
}

impl OutcomeKind {
    /// Classifies a terminal `auth` status. `None` for a challenge, which is not terminal.
    pub fn for_status(status: Option<&TransStatus>) -> Option<Self> {
        let kind = match status {
            Some(TransStatus::Authenticated) => OutcomeKind::Success,
            Some(TransStatus::NotAuthenticated) => OutcomeKind::Failed,
            Some(TransStatus::Attempted) => OutcomeKind::Partial,
            Some(TransStatus::Rejected) => OutcomeKind::Rejected,
            Some(TransStatus::Unavailable) => OutcomeKind::Error,
            Some(TransStatus::Decoupled) => OutcomeKind::Decoupled,
            Some(TransStatus::Challenge) => return None,
            Some(TransStatus::Other(_)) | None => OutcomeKind::Complete,
        };
        Some(kind)
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Failed => "failed",
            OutcomeKind::Partial => "partial",
            OutcomeKind::Rejected => "rejected",
            OutcomeKind::Error => "error",
            OutcomeKind::Decoupled => "decoupled",
            OutcomeKind::Complete => "complete",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "Payment Authenticated Successfully",
            OutcomeKind::Failed => "Authentication Failed - Not Authenticated",
            OutcomeKind::Partial => "Authentication Attempted but Not Verified",
            OutcomeKind::Rejected => "Authentication Rejected by Issuer",
            OutcomeKind::Error => "Authentication Error - Technical Issue",
            OutcomeKind::Decoupled => {
                "Decoupled Authentication Required - Please verify on your device"
            }
            OutcomeKind::Complete => "Authentication Completed",
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(
            self,
            OutcomeKind::Failed | OutcomeKind::Rejected | OutcomeKind::Error
        )
    }
}

/// The terminal result of an attempt, reported through `AuthListener::on_outcome`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub success: bool,
    pub status: String,
    pub message: String,
    pub trans_status: String,
    pub details: Value,
    pub request_id: String,
}

impl Outcome {
    pub fn from_kind(
        kind: OutcomeKind,
        trans_status: Option<&TransStatus>,
        details: Value,
        request_id: &str,
    ) -> Self {
        Self {
            success: kind.is_success(),
            status: kind.label().to_string(),
            message: kind.message().to_string(),
            trans_status: trans_status.map(|s| s.code().to_string()).unwrap_or_default(),
            details,
            request_id: request_id.to_string(),
        }
    }
}

/// Reported through `AuthListener::on_challenge_started` once the challenge frame is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeInfo {
    pub challenge_url: String,
    pub server_transaction_id: String,
    pub details: Value,
}
