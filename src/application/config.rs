use std::time::Duration;

pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_millis(6000);
pub const SDK_VERSION: &str = "1.0.0";

/// Tunables for a `ProtocolOrchestrator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// How long to wait for the 3DS method step before synthesizing a fingerprint.
    pub fallback_timeout: Duration,
    /// Version tag sent with every remote call.
    pub sdk_version: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fallback_timeout: DEFAULT_FALLBACK_TIMEOUT,
            sdk_version: SDK_VERSION.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_fallback_timeout(mut self, fallback_timeout: Duration) -> Self {
        self.fallback_timeout = fallback_timeout;
        self
    }
}
