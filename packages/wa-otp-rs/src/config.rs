//! Sender configuration.
//!
//! Resolved once at construction and never mutated afterwards. Every field
//! has a default so a partial config file deserializes cleanly.

use serde::{Deserialize, Serialize};

use crate::error::SendError;

fn default_send_concurrency() -> usize {
    4
}

fn default_ready_timeout_ms() -> u64 {
    30_000
}

fn default_message_template() -> String {
    "Your verification code is: {otp}".to_string()
}

fn default_allowed_otp_length() -> usize {
    4
}

/// Immutable configuration for an [`crate::OtpSender`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Maximum number of sends in flight against the channel at once.
    #[serde(default = "default_send_concurrency")]
    pub send_concurrency: usize,

    /// How long a caller waits for the channel to become ready (ms).
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    /// Message template; every `{otp}` occurrence is replaced with the code.
    #[serde(default = "default_message_template")]
    pub message_template: String,

    /// Exact number of ASCII digits an OTP must contain.
    #[serde(default = "default_allowed_otp_length")]
    pub allowed_otp_length: usize,

    /// Opaque pass-through for the channel backend (session id, auth data
    /// path, browser flags, ...). The core never interprets it.
    #[serde(default)]
    pub channel: serde_json::Value,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            send_concurrency: default_send_concurrency(),
            ready_timeout_ms: default_ready_timeout_ms(),
            message_template: default_message_template(),
            allowed_otp_length: default_allowed_otp_length(),
            channel: serde_json::Value::Null,
        }
    }
}

impl SenderConfig {
    /// Reject configurations that would wedge the sender.
    pub(crate) fn validate(&self) -> Result<(), SendError> {
        if self.send_concurrency == 0 {
            return Err(SendError::InvalidConfig {
                reason: "send_concurrency must be at least 1".to_string(),
            });
        }
        if self.ready_timeout_ms == 0 {
            return Err(SendError::InvalidConfig {
                reason: "ready_timeout_ms must be at least 1".to_string(),
            });
        }
        if self.allowed_otp_length == 0 {
            return Err(SendError::InvalidConfig {
                reason: "allowed_otp_length must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SenderConfig::default();
        assert_eq!(config.send_concurrency, 4);
        assert_eq!(config.ready_timeout_ms, 30_000);
        assert_eq!(config.message_template, "Your verification code is: {otp}");
        assert_eq!(config.allowed_otp_length, 4);
        assert!(config.channel.is_null());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: SenderConfig =
            serde_json::from_str(r#"{ "send_concurrency": 2 }"#).expect("valid config json");
        assert_eq!(config.send_concurrency, 2);
        assert_eq!(config.ready_timeout_ms, 30_000);
        assert_eq!(config.allowed_otp_length, 4);
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = SenderConfig::default();
        config.send_concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(SendError::InvalidConfig { .. })
        ));

        let mut config = SenderConfig::default();
        config.ready_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = SenderConfig::default();
        config.allowed_otp_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn channel_passthrough_survives_roundtrip() {
        let config: SenderConfig = serde_json::from_str(
            r#"{ "channel": { "client_id": "otp-1", "auth_data_path": "/var/lib/wa" } }"#,
        )
        .expect("valid config json");
        assert_eq!(config.channel["client_id"], "otp-1");
    }
}
