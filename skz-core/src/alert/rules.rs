// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification rules and their selection by alert type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AlertType;

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Webhook,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
            NotificationChannel::Webhook => "webhook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(NotificationChannel::Email),
            "sms" => Some(NotificationChannel::Sms),
            "webhook" => Some(NotificationChannel::Webhook),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel-matched recipient list, tagged by field shape:
/// `{"emails": [..]}`, `{"phones": [..]}`, or `{"urls": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleRecipients {
    Emails { emails: Vec<String> },
    Phones { phones: Vec<String> },
    Urls { urls: Vec<String> },
}

impl RuleRecipients {
    pub fn list(&self) -> &[String] {
        match self {
            RuleRecipients::Emails { emails } => emails,
            RuleRecipients::Phones { phones } => phones,
            RuleRecipients::Urls { urls } => urls,
        }
    }

    /// True when the recipient shape matches the channel.
    pub fn matches_channel(&self, channel: NotificationChannel) -> bool {
        matches!(
            (self, channel),
            (RuleRecipients::Emails { .. }, NotificationChannel::Email)
                | (RuleRecipients::Phones { .. }, NotificationChannel::Sms)
                | (RuleRecipients::Urls { .. }, NotificationChannel::Webhook)
        )
    }
}

/// A named, channel-specific recipient list with a delivery delay.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRule {
    pub id: Uuid,
    /// Free-form key; alerts select rules whose name is in the fixed set
    /// for their type (see [`rule_names_for`]).
    pub name: String,
    pub channel: NotificationChannel,
    pub recipients: RuleRecipients,
    pub delay_minutes: u32,
    pub enabled: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The fixed alert-type → rule-name mapping.
pub fn rule_names_for(alert_type: AlertType) -> &'static [&'static str] {
    match alert_type {
        AlertType::MissingPersonMatch => &["ncmec_alert", "ncmec_match", "critical_alert"],
        AlertType::LoyaltyMatch => &["loyalty_alert", "loyalty_match"],
    }
}
