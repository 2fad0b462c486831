// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Delivery channels: email, SMS, webhook.
//!
//! Email and SMS submit to their providers over HTTP when credentials are
//! configured and otherwise run in stub mode: the send is logged and a
//! synthetic receipt marked `is_stub` comes back, so the rest of the
//! pipeline (logging, idempotence, retries) behaves identically in
//! development.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::recipient::{validate_email, validate_phone};
use super::{NotifyError, SMS_MAX_LEN};
use crate::alert::NotificationChannel;
use crate::config::{EmailProviderConfig, HubConfig, SmsProviderConfig};

/// Provider acknowledgement for one delivery.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReceipt {
    pub message_id: String,
    pub is_stub: bool,
}

/// Truncates an SMS body to the provider limit, with an ellipsis.
pub fn truncate_sms(body: &str) -> String {
    if body.chars().count() <= SMS_MAX_LEN {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(SMS_MAX_LEN - 1).collect();
    truncated.push('…');
    truncated
}

/// Multi-channel notification sender.
pub struct Notifier {
    client: reqwest::Client,
    email: Option<EmailProviderConfig>,
    sms: Option<SmsProviderConfig>,
}

impl Notifier {
    pub fn new(config: &HubConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .unwrap_or_default();
        Notifier {
            client,
            email: config.email.clone(),
            sms: config.sms.clone(),
        }
    }

    /// Delivers one message over one channel to one recipient.
    pub async fn deliver(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<ChannelReceipt, NotifyError> {
        match channel {
            NotificationChannel::Email => self.send_email(recipient, subject, body).await,
            NotificationChannel::Sms => self.send_sms(recipient, body).await,
            NotificationChannel::Webhook => self.send_webhook(recipient, subject, body).await,
        }
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<ChannelReceipt, NotifyError> {
        if !validate_email(to) {
            return Err(NotifyError::InvalidRecipient(format!(
                "invalid email address: {to}"
            )));
        }

        let Some(provider) = &self.email else {
            info!(to, subject, "[stub email] provider not configured");
            return Ok(stub_receipt("email"));
        };

        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": provider.from_email },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });
        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&provider.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Provider(format!("email submit failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider(format!(
                "email provider returned {status}: {detail}"
            )));
        }
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("email-{}", Uuid::new_v4().simple()));
        Ok(ChannelReceipt {
            message_id,
            is_stub: false,
        })
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<ChannelReceipt, NotifyError> {
        if !validate_phone(to) {
            return Err(NotifyError::InvalidRecipient(format!(
                "invalid phone number: {to}"
            )));
        }
        let body = truncate_sms(body);

        let Some(provider) = &self.sms else {
            info!(to, "[stub sms] provider not configured");
            return Ok(stub_receipt("sms"));
        };

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            provider.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&provider.account_sid, Some(&provider.auth_token))
            .form(&[
                ("To", to),
                ("From", provider.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Provider(format!("sms submit failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider(format!(
                "sms provider returned {status}: {detail}"
            )));
        }
        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("sid").and_then(|s| s.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("sms-{}", Uuid::new_v4().simple()));
        Ok(ChannelReceipt {
            message_id,
            is_stub: false,
        })
    }

    async fn send_webhook(
        &self,
        url: &str,
        subject: &str,
        body: &str,
    ) -> Result<ChannelReceipt, NotifyError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(NotifyError::InvalidRecipient(format!(
                "invalid webhook url: {url}"
            )));
        }

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "subject": subject, "message": body }))
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "webhook unreachable");
                NotifyError::Provider(format!("webhook unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Provider(format!(
                "webhook returned {status}"
            )));
        }
        Ok(ChannelReceipt {
            message_id: format!("webhook-{}", Uuid::new_v4().simple()),
            is_stub: false,
        })
    }
}

fn stub_receipt(channel: &str) -> ChannelReceipt {
    ChannelReceipt {
        message_id: format!("stub-{channel}-{}", Uuid::new_v4().simple()),
        is_stub: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;

    fn stub_notifier() -> Notifier {
        Notifier::new(&HubConfig::default())
    }

    #[tokio::test]
    async fn stub_email_and_sms_succeed_without_credentials() {
        let notifier = stub_notifier();
        let receipt = notifier
            .deliver(NotificationChannel::Email, "a@x.example", "s", "b")
            .await
            .unwrap();
        assert!(receipt.is_stub);
        assert!(receipt.message_id.starts_with("stub-email-"));

        let receipt = notifier
            .deliver(NotificationChannel::Sms, "+15551234567", "s", "b")
            .await
            .unwrap();
        assert!(receipt.is_stub);
        assert!(receipt.message_id.starts_with("stub-sms-"));
    }

    #[tokio::test]
    async fn invalid_recipients_are_non_retryable() {
        let notifier = stub_notifier();
        let err = notifier
            .deliver(NotificationChannel::Email, "not-an-email", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidRecipient(_)));
        assert!(!err.is_retryable());

        let err = notifier
            .deliver(NotificationChannel::Sms, "12", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidRecipient(_)));

        let err = notifier
            .deliver(NotificationChannel::Webhook, "ftp://x", "s", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidRecipient(_)));
    }

    #[tokio::test]
    async fn unreachable_webhook_is_retryable() {
        let notifier = stub_notifier();
        let err = notifier
            .deliver(
                NotificationChannel::Webhook,
                "http://127.0.0.1:9/hook",
                "s",
                "b",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Provider(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn sms_truncation_at_limit() {
        let short = "a".repeat(SMS_MAX_LEN);
        assert_eq!(truncate_sms(&short), short);

        let long = "a".repeat(SMS_MAX_LEN + 50);
        let truncated = truncate_sms(&long);
        assert_eq!(truncated.chars().count(), SMS_MAX_LEN);
        assert!(truncated.ends_with('…'));
    }
}
