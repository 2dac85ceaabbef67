//! Configuration management for the engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Longest accepted campus offset from UTC, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of range or inconsistent with another one
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid {
        /// Offending setting
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Approval workflow settings
    pub approval: ApprovalConfig,
    /// Certificate settings
    pub certificates: CertificateConfig,
    /// Campus wall-clock offset from UTC, in minutes
    pub utc_offset_minutes: i32,
    /// Notification topics
    pub topics: TopicConfig,
}

/// Approval workflow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Minimum length of a rejection or revocation reason (trimmed, in chars)
    pub min_reason_len: usize,
    /// Exact length of a verification code
    pub verification_code_len: usize,
    /// Whether credit approval must carry a verification code
    pub require_verification_code: bool,
}

/// Certificate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Fixed salt mixed into every digest
    pub salt: String,
    /// Prefix of certificate numbers
    pub number_prefix: String,
}

/// Notification topics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Topic for booking notifications
    pub bookings: String,
    /// Topic for event lifecycle notifications
    pub events: String,
    /// Topic for credit notifications
    pub credits: String,
    /// Topic for certificate notifications
    pub certificates: String,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults; call
    /// [`EngineConfig::validate`] to reject inconsistent values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            approval: ApprovalConfig {
                min_reason_len: env::var("CERTIFYTRACK_MIN_REASON_LEN")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                verification_code_len: env::var("CERTIFYTRACK_VERIFICATION_CODE_LEN")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8),
                require_verification_code: env::var("CERTIFYTRACK_REQUIRE_VERIFICATION_CODE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
            certificates: CertificateConfig {
                salt: env::var("CERTIFYTRACK_CERTIFICATE_SALT")
                    .unwrap_or_else(|_| "certifytrack-v1".to_string()),
                number_prefix: env::var("CERTIFYTRACK_CERTIFICATE_PREFIX")
                    .unwrap_or_else(|_| "CT".to_string()),
            },
            utc_offset_minutes: env::var("CERTIFYTRACK_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            topics: TopicConfig {
                bookings: env::var("CERTIFYTRACK_BOOKING_TOPIC")
                    .unwrap_or_else(|_| "certifytrack-bookings".to_string()),
                events: env::var("CERTIFYTRACK_EVENT_TOPIC")
                    .unwrap_or_else(|_| "certifytrack-events".to_string()),
                credits: env::var("CERTIFYTRACK_CREDIT_TOPIC")
                    .unwrap_or_else(|_| "certifytrack-credits".to_string()),
                certificates: env::var("CERTIFYTRACK_CERTIFICATE_TOPIC")
                    .unwrap_or_else(|_| "certifytrack-certificates".to_string()),
            },
        }
    }

    /// Check the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero reason or code length, an
    /// empty salt or prefix, an out-of-range UTC offset or an empty topic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approval.min_reason_len == 0 {
            return Err(ConfigError::Invalid {
                field: "min_reason_len",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.approval.verification_code_len == 0 {
            return Err(ConfigError::Invalid {
                field: "verification_code_len",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.certificates.salt.is_empty() {
            return Err(ConfigError::Invalid {
                field: "certificate_salt",
                reason: "cannot be empty".to_string(),
            });
        }
        if self.certificates.number_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "certificate_prefix",
                reason: "cannot be empty".to_string(),
            });
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::Invalid {
                field: "utc_offset_minutes",
                reason: format!(
                    "{} is outside +/-{MAX_UTC_OFFSET_MINUTES}",
                    self.utc_offset_minutes
                ),
            });
        }
        let topics = [
            &self.topics.bookings,
            &self.topics.events,
            &self.topics.credits,
            &self.topics.certificates,
        ];
        if topics.iter().any(|topic| topic.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "topics",
                reason: "topic names cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Campus wall-clock offset. Out-of-range values fall back to UTC.
    #[must_use]
    pub fn campus_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approval: ApprovalConfig {
                min_reason_len: 10,
                verification_code_len: 8,
                require_verification_code: false,
            },
            certificates: CertificateConfig {
                salt: "certifytrack-v1".to_string(),
                number_prefix: "CT".to_string(),
            },
            utc_offset_minutes: 0,
            topics: TopicConfig {
                bookings: "certifytrack-bookings".to_string(),
                events: "certifytrack-events".to_string(),
                credits: "certifytrack-credits".to_string(),
                certificates: "certifytrack-certificates".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.approval.min_reason_len, 10);
        assert_eq!(config.topics.certificates, "certifytrack-certificates");
        assert_eq!(config.campus_offset().local_minus_utc(), 0);
    }

    #[test]
    fn zero_lengths_are_rejected() {
        let mut config = EngineConfig::default();
        config.approval.verification_code_len = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "verification_code_len",
                ..
            })
        ));
    }

    #[test]
    fn offset_is_bounded() {
        let mut config = EngineConfig::default();
        config.utc_offset_minutes = 330;
        assert!(config.validate().is_ok());
        assert_eq!(config.campus_offset().local_minus_utc(), 330 * 60);

        config.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }
}
