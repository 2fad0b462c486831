// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Match-event alerts and their review workflow.

pub mod processor;
mod rules;

pub use processor::{AlertProcessor, DispatchSummary, NewAlert, RetrySummary};
pub use rules::{NotificationChannel, NotificationRule, RuleRecipients};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("invalid alert: {0}")]
    InvalidAlert(String),

    #[error("alert not found: {0}")]
    NotFound(Uuid),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: AlertStatus, to: AlertStatus },

    #[error("failed to schedule notification: {0}")]
    Schedule(String),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// The kind of match the edge pipeline reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    MissingPersonMatch,
    LoyaltyMatch,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::MissingPersonMatch => "missing_person_match",
            AlertType::LoyaltyMatch => "loyalty_match",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "missing_person_match" => Some(AlertType::MissingPersonMatch),
            "loyalty_match" => Some(AlertType::LoyaltyMatch),
            _ => None,
        }
    }
}

/// Who the match is about, tagged by alert type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSubject {
    MissingPerson { case_ref: String },
    LoyaltyMember { member_ref: String },
}

impl AlertSubject {
    pub fn alert_type(&self) -> AlertType {
        match self {
            AlertSubject::MissingPerson { .. } => AlertType::MissingPersonMatch,
            AlertSubject::LoyaltyMember { .. } => AlertType::LoyaltyMatch,
        }
    }

    pub fn case_ref(&self) -> Option<&str> {
        match self {
            AlertSubject::MissingPerson { case_ref } => Some(case_ref),
            AlertSubject::LoyaltyMember { .. } => None,
        }
    }

    pub fn member_ref(&self) -> Option<&str> {
        match self {
            AlertSubject::LoyaltyMember { member_ref } => Some(member_ref),
            AlertSubject::MissingPerson { .. } => None,
        }
    }
}

/// Review workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Reviewed,
    Escalated,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Reviewed => "reviewed",
            AlertStatus::Escalated => "escalated",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false_positive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(AlertStatus::New),
            "reviewed" => Some(AlertStatus::Reviewed),
            "escalated" => Some(AlertStatus::Escalated),
            "resolved" => Some(AlertStatus::Resolved),
            "false_positive" => Some(AlertStatus::FalsePositive),
            _ => None,
        }
    }

    /// True when `self -> to` is a legal review transition. Transitions to
    /// the same status are allowed as no-ops; terminal states accept
    /// nothing else.
    pub fn can_transition_to(&self, to: AlertStatus) -> bool {
        use AlertStatus::*;
        if *self == to {
            return true;
        }
        match self {
            New => matches!(to, Reviewed | Escalated | Resolved | FalsePositive),
            Reviewed => matches!(to, Escalated | Resolved | FalsePositive),
            Escalated => matches!(to, Resolved | FalsePositive),
            Resolved | FalsePositive => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::FalsePositive)
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted match event.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub hub_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub subject: AlertSubject,
    pub confidence: f64,
    pub captured_image_path: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub reviewer: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Alert {
    pub fn alert_type(&self) -> AlertType {
        self.subject.alert_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_paths() {
        use AlertStatus::*;
        assert!(New.can_transition_to(Reviewed));
        assert!(New.can_transition_to(Escalated));
        assert!(New.can_transition_to(Resolved));
        assert!(Reviewed.can_transition_to(Escalated));
        assert!(Reviewed.can_transition_to(FalsePositive));
        assert!(Escalated.can_transition_to(Resolved));

        // Backwards and out of terminal states is illegal.
        assert!(!Reviewed.can_transition_to(New));
        assert!(!Escalated.can_transition_to(Reviewed));
        assert!(!Resolved.can_transition_to(Escalated));
        assert!(!FalsePositive.can_transition_to(Resolved));

        // Same-state no-ops are allowed everywhere.
        for s in [New, Reviewed, Escalated, Resolved, FalsePositive] {
            assert!(s.can_transition_to(s));
        }
    }

    #[test]
    fn subject_carries_the_type() {
        let mp = AlertSubject::MissingPerson {
            case_ref: "C-001".into(),
        };
        assert_eq!(mp.alert_type(), AlertType::MissingPersonMatch);
        assert_eq!(mp.case_ref(), Some("C-001"));
        assert_eq!(mp.member_ref(), None);
    }
}
