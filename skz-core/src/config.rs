// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Central-hub configuration.
//!
//! Defaults are production values; `from_env` overlays the environment.
//! Provider credentials are optional; when absent the notification
//! channels run in stub mode.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Email provider credentials.
#[derive(Debug, Clone)]
pub struct EmailProviderConfig {
    pub api_key: String,
    pub from_email: String,
}

/// SMS provider credentials.
#[derive(Debug, Clone)]
pub struct SmsProviderConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Configuration for the control plane.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Root for `databases/`, `uploads/`, and `captures/`.
    pub data_dir: PathBuf,

    /// Feature-vector dimension D. Records are stored as D*4 bytes.
    pub feature_dim: usize,

    /// Compiled index versions kept per scope.
    pub artifact_versions_to_keep: usize,

    /// Retry budget for background tasks.
    pub notification_max_retries: u32,

    /// Base for exponential retry backoff.
    pub notification_retry_backoff_base: Duration,

    /// Pairing-code lifetime.
    pub pairing_code_ttl: Duration,

    /// Heartbeat gap after which a device is marked offline.
    pub offline_after: Duration,

    /// Worker queue poll interval.
    pub worker_poll_interval: Duration,

    /// Timeout for outbound calls to device agents.
    pub device_agent_timeout: Duration,

    /// Timeout for provider HTTP calls (email, SMS, webhook).
    pub provider_timeout: Duration,

    /// Soft/hard time limits for notification tasks.
    pub notification_task_soft_limit: Duration,
    pub notification_task_hard_limit: Duration,

    /// Soft/hard time limits for compilation and import tasks.
    pub compile_task_soft_limit: Duration,
    pub compile_task_hard_limit: Duration,

    pub email: Option<EmailProviderConfig>,
    pub sms: Option<SmsProviderConfig>,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            data_dir: PathBuf::from("./data"),
            feature_dim: 128,
            artifact_versions_to_keep: 5,
            notification_max_retries: 3,
            notification_retry_backoff_base: Duration::from_secs(60),
            pairing_code_ttl: Duration::from_secs(300),
            offline_after: Duration::from_secs(300),
            worker_poll_interval: Duration::from_secs(5),
            device_agent_timeout: Duration::from_secs(10),
            provider_timeout: Duration::from_secs(10),
            notification_task_soft_limit: Duration::from_secs(30),
            notification_task_hard_limit: Duration::from_secs(60),
            compile_task_soft_limit: Duration::from_secs(55 * 60),
            compile_task_hard_limit: Duration::from_secs(60 * 60),
            email: None,
            sms: None,
        }
    }
}

impl HubConfig {
    /// Builds a config from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = HubConfig::default();

        if let Ok(dir) = env::var("SKZ_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dim) = env_usize("FEATURE_DIM") {
            config.feature_dim = dim;
        }
        if let Some(keep) = env_usize("ARTIFACT_VERSIONS_TO_KEEP") {
            config.artifact_versions_to_keep = keep;
        }
        if let Some(retries) = env_usize("NOTIFICATION_MAX_RETRIES") {
            config.notification_max_retries = retries as u32;
        }
        if let Some(base) = env_usize("NOTIFICATION_RETRY_BACKOFF_BASE") {
            config.notification_retry_backoff_base = Duration::from_secs(base as u64);
        }
        if let Some(ttl) = env_usize("PAIRING_CODE_TTL") {
            config.pairing_code_ttl = Duration::from_secs(ttl as u64);
        }
        if let Some(gap) = env_usize("DEVICE_OFFLINE_AFTER") {
            config.offline_after = Duration::from_secs(gap as u64);
        }

        if let Ok(api_key) = env::var("EMAIL_PROVIDER_KEY") {
            if !api_key.is_empty() {
                config.email = Some(EmailProviderConfig {
                    api_key,
                    from_email: env::var("EMAIL_FROM")
                        .unwrap_or_else(|_| "alerts@skz.example".to_string()),
                });
            }
        }

        if let (Ok(account_sid), Ok(auth_token)) =
            (env::var("SMS_PROVIDER_SID"), env::var("SMS_PROVIDER_TOKEN"))
        {
            if !account_sid.is_empty() && !auth_token.is_empty() {
                config.sms = Some(SmsProviderConfig {
                    account_sid,
                    auth_token,
                    from_number: env::var("SMS_PROVIDER_FROM").unwrap_or_default(),
                });
            }
        }

        config
    }

    pub fn databases_dir(&self) -> PathBuf {
        self.data_dir.join("databases")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn captures_dir(&self) -> PathBuf {
        self.data_dir.join("captures")
    }
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = HubConfig::default();
        assert_eq!(config.feature_dim, 128);
        assert_eq!(config.artifact_versions_to_keep, 5);
        assert_eq!(config.notification_max_retries, 3);
        assert_eq!(config.notification_retry_backoff_base, Duration::from_secs(60));
        assert_eq!(config.pairing_code_ttl, Duration::from_secs(300));
        assert!(config.email.is_none());
        assert!(config.sms.is_none());
    }

    #[test]
    fn storage_paths_hang_off_data_dir() {
        let config = HubConfig {
            data_dir: PathBuf::from("/srv/skz"),
            ..HubConfig::default()
        };
        assert_eq!(config.databases_dir(), PathBuf::from("/srv/skz/databases"));
        assert_eq!(config.uploads_dir(), PathBuf::from("/srv/skz/uploads"));
        assert_eq!(config.captures_dir(), PathBuf::from("/srv/skz/captures"));
    }
}
