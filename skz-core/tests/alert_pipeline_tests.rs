// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Alert pipeline end-to-end: ingestion, dispatch counts, at-most-once
//! delivery, retry, and review transitions.

use chrono::Utc;
use skz_core::alert::{
    NewAlert, NotificationChannel, NotificationRule, RuleRecipients,
};
use skz_core::notify::DeliveryStatus;
use skz_core::storage::AlertQuery;
use skz_core::{AlertStatus, AlertType, CentralHub, HubConfig};
use uuid::Uuid;

fn test_hub(dir: &std::path::Path) -> CentralHub {
    let config = HubConfig {
        data_dir: dir.to_path_buf(),
        feature_dim: 16,
        ..HubConfig::default()
    };
    CentralHub::in_memory(config).unwrap()
}

fn email_rule(name: &str, recipients: Vec<&str>, delay_minutes: u32) -> NotificationRule {
    NotificationRule {
        id: Uuid::new_v4(),
        name: name.into(),
        channel: NotificationChannel::Email,
        recipients: RuleRecipients::Emails {
            emails: recipients.into_iter().map(str::to_string).collect(),
        },
        delay_minutes,
        enabled: true,
        description: None,
        created_at: Utc::now(),
    }
}

fn missing_person_alert() -> NewAlert {
    NewAlert {
        alert_type: Some("missing_person_match".into()),
        confidence: Some(0.97),
        detected_at: Some("2024-06-15T14:30:00Z".into()),
        case_ref: Some("C-001".into()),
        ..NewAlert::default()
    }
}

#[tokio::test]
async fn missing_person_match_dispatches_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    hub.create_notification_rule(&email_rule("ncmec_alert", vec!["a@x.example"], 0))
        .unwrap();

    let (alert, summary) = hub.ingest_alert(missing_person_alert()).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.scheduled, 0);
    assert_eq!(alert.status, AlertStatus::New);
    assert_eq!(alert.alert_type(), AlertType::MissingPersonMatch);

    let history = hub.alert_notification_history(alert.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].channel, NotificationChannel::Email);
    assert_eq!(history[0].recipient, "a@x.example");
    assert_eq!(history[0].status, DeliveryStatus::Sent);

    // A second identical event is a NEW alert; de-duplication is
    // per-alert, so its own dispatch sends again.
    let (second, summary) = hub.ingest_alert(missing_person_alert()).await.unwrap();
    assert_ne!(second.id, alert.id);
    assert_eq!(summary.sent, 1);

    let (alerts, total) = hub.list_alerts(&AlertQuery::default()).unwrap();
    assert_eq!(total, 2);
    assert_eq!(alerts.len(), 2);
}

#[tokio::test]
async fn retry_honours_at_most_once_per_recipient() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    hub.create_notification_rule(&email_rule("ncmec_alert", vec!["a@x.example"], 0))
        .unwrap();

    let (alert, summary) = hub.ingest_alert(missing_person_alert()).await.unwrap();
    assert_eq!(summary.sent, 1);

    // Retry with only a sent row present: nothing to do.
    let retried = hub.retry_alert_notifications(alert.id).await.unwrap();
    assert_eq!(retried.sent, 0);
    assert_eq!(retried.failed, 0);
    assert_eq!(hub.alert_notification_history(alert.id).unwrap().len(), 1);
}

#[tokio::test]
async fn retry_reissues_only_failed_recipients() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    // One valid and one invalid recipient: the invalid one fails and
    // stays failed, the valid one is sent.
    hub.create_notification_rule(&email_rule(
        "ncmec_alert",
        vec!["good@x.example", "not-an-address"],
        0,
    ))
    .unwrap();

    let (alert, summary) = hub.ingest_alert(missing_person_alert()).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 1);

    let retried = hub.retry_alert_notifications(alert.id).await.unwrap();
    // The bad address fails again; the good one is protected by the
    // at-most-once guard and is not re-sent.
    assert_eq!(retried.sent, 0);
    assert_eq!(retried.failed, 1);

    let history = hub.alert_notification_history(alert.id).unwrap();
    let sent_rows = history
        .iter()
        .filter(|l| l.status == DeliveryStatus::Sent && l.recipient == "good@x.example")
        .count();
    assert_eq!(sent_rows, 1);
}

#[tokio::test]
async fn loyalty_rules_schedule_delayed_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    hub.create_notification_rule(&email_rule("loyalty_alert", vec!["ops@x.example"], 15))
        .unwrap();

    let (_, summary) = hub
        .ingest_alert(NewAlert {
            alert_type: Some("loyalty_match".into()),
            confidence: Some(0.82),
            detected_at: Some("2024-06-15T15:00:00Z".into()),
            member_ref: Some("M-77".into()),
            ..NewAlert::default()
        })
        .await
        .unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.scheduled, 1);
    assert_eq!(hub.storage().queued_task_count().unwrap(), 1);
}

#[tokio::test]
async fn invalid_payloads_persist_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());

    let bad = NewAlert {
        confidence: Some(2.0),
        ..missing_person_alert()
    };
    let err = hub.ingest_alert(bad).await.unwrap_err();
    assert_eq!(err.http_status(), 400);

    let (_, total) = hub.list_alerts(&AlertQuery::default()).unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn review_rejects_illegal_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    let (alert, _) = hub.ingest_alert(missing_person_alert()).await.unwrap();

    hub.review_alert(alert.id, AlertStatus::Resolved, "r", None)
        .unwrap();

    let err = hub
        .review_alert(alert.id, AlertStatus::Escalated, "r", None)
        .unwrap_err();
    assert_eq!(err.http_status(), 400);
    assert!(err.to_string().contains("transition"));

    let unchanged = hub.get_alert(alert.id).unwrap();
    assert_eq!(unchanged.status, AlertStatus::Resolved);
}

#[tokio::test]
async fn alert_filters_by_status_and_type() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());

    let (mp, _) = hub.ingest_alert(missing_person_alert()).await.unwrap();
    hub.ingest_alert(NewAlert {
        alert_type: Some("loyalty_match".into()),
        member_ref: Some("M-1".into()),
        case_ref: None,
        ..missing_person_alert()
    })
    .await
    .unwrap();
    hub.review_alert(mp.id, AlertStatus::Escalated, "r", None)
        .unwrap();

    let (escalated, total) = hub
        .list_alerts(&AlertQuery {
            status: Some(AlertStatus::Escalated),
            ..AlertQuery::default()
        })
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(escalated[0].id, mp.id);

    let (loyalty, total) = hub
        .list_alerts(&AlertQuery {
            alert_type: Some(AlertType::LoyaltyMatch),
            ..AlertQuery::default()
        })
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(loyalty[0].alert_type(), AlertType::LoyaltyMatch);
}

#[tokio::test]
async fn captures_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let hub = test_hub(dir.path());
    let (alert, _) = hub.ingest_alert(missing_person_alert()).await.unwrap();

    let mut image = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    image.extend_from_slice(b"frame-bytes");
    let path = hub.save_alert_capture(alert.id, &image).unwrap();
    assert!(path.ends_with(&format!("{}.png", alert.id)));

    let read_back = hub.read_alert_capture(alert.id).unwrap();
    assert_eq!(read_back, image);

    // Unknown format is rejected.
    let err = hub.save_alert_capture(alert.id, b"GIF89a...").unwrap_err();
    assert_eq!(err.http_status(), 400);
}
