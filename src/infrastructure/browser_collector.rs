use crate::domain::ports::FingerprintCollector;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::warn;

const DEFAULT_ACCEPT_HEADER: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// The cardholder environment reported to the 3DS Server for risk scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserInfo {
    pub browser_user_agent: String,
    pub browser_language: String,
    pub browser_screen_width: String,
    pub browser_screen_height: String,
    pub browser_color_depth: String,
    #[serde(rename = "browserTZ")]
    pub browser_tz: String,
    pub browser_accept_header: String,
    pub browser_java_enabled: bool,
    pub browser_javascript_enabled: bool,
    #[serde(rename = "browserIP")]
    pub browser_ip: String,
}

impl Default for BrowserInfo {
    fn default() -> Self {
        Self {
            browser_user_agent: String::new(),
            browser_language: String::new(),
            browser_screen_width: "0".to_string(),
            browser_screen_height: "0".to_string(),
            browser_color_depth: "24".to_string(),
            browser_tz: "0".to_string(),
            browser_accept_header: DEFAULT_ACCEPT_HEADER.to_string(),
            browser_java_enabled: false,
            browser_javascript_enabled: true,
            browser_ip: String::new(),
        }
    }
}

/// Fallback fingerprint source: base64 of the JSON-encoded `BrowserInfo`.
#[derive(Debug, Clone, Default)]
pub struct BrowserInfoCollector {
    info: BrowserInfo,
}

impl BrowserInfoCollector {
    pub fn new(info: BrowserInfo) -> Self {
        Self { info }
    }
}

impl FingerprintCollector for BrowserInfoCollector {
    fn collect(&self) -> String {
        let json = match serde_json::to_vec(&self.info) {
            Ok(json) => json,
            Err(error) => {
                warn!(%error, "failed to encode browser info, sending an empty record");
                b"{}".to_vec()
            }
        };
        STANDARD.encode(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_collect_is_base64_json() {
        let collector = BrowserInfoCollector::new(BrowserInfo {
            browser_user_agent: "Mozilla/5.0".to_string(),
            browser_language: "en-GB".to_string(),
            browser_tz: "-60".to_string(),
            ..BrowserInfo::default()
        });

        let encoded = collector.collect();
        assert!(!encoded.is_empty());

        let decoded = STANDARD.decode(encoded).unwrap();
        let json: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(json["browserUserAgent"], "Mozilla/5.0");
        assert_eq!(json["browserTZ"], "-60");
        assert_eq!(json["browserIP"], "");
        assert_eq!(json["browserColorDepth"], "24");
        assert_eq!(json["browserJavascriptEnabled"], true);
    }
}
