// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device/playlist assignments and the audience-trigger vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of audience signals that can select a playlist at
/// runtime. `Default` plays when nothing else fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentTrigger {
    Default,
    FaceDetected,
    AgeChild,
    AgeTeen,
    AgeAdult,
    AgeSenior,
    GenderMale,
    GenderFemale,
    LoyaltyRecognized,
    NcmecAlert,
}

impl AssignmentTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentTrigger::Default => "default",
            AssignmentTrigger::FaceDetected => "face_detected",
            AssignmentTrigger::AgeChild => "age_child",
            AssignmentTrigger::AgeTeen => "age_teen",
            AssignmentTrigger::AgeAdult => "age_adult",
            AssignmentTrigger::AgeSenior => "age_senior",
            AssignmentTrigger::GenderMale => "gender_male",
            AssignmentTrigger::GenderFemale => "gender_female",
            AssignmentTrigger::LoyaltyRecognized => "loyalty_recognized",
            AssignmentTrigger::NcmecAlert => "ncmec_alert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(AssignmentTrigger::Default),
            "face_detected" => Some(AssignmentTrigger::FaceDetected),
            "age_child" => Some(AssignmentTrigger::AgeChild),
            "age_teen" => Some(AssignmentTrigger::AgeTeen),
            "age_adult" => Some(AssignmentTrigger::AgeAdult),
            "age_senior" => Some(AssignmentTrigger::AgeSenior),
            "gender_male" => Some(AssignmentTrigger::GenderMale),
            "gender_female" => Some(AssignmentTrigger::GenderFemale),
            "loyalty_recognized" => Some(AssignmentTrigger::LoyaltyRecognized),
            "ncmec_alert" => Some(AssignmentTrigger::NcmecAlert),
            _ => None,
        }
    }
}

/// Binds one playlist to one device under one trigger.
/// `(device_id, trigger_type)` is unique.
#[derive(Debug, Clone, Serialize)]
pub struct DevicePlaylistAssignment {
    pub id: Uuid,
    pub device_id: Uuid,
    pub playlist_id: Uuid,
    pub trigger_type: AssignmentTrigger,
    pub priority: i32,
    /// Default-trigger assignments are created enabled; all others start
    /// disabled until explicitly activated.
    pub is_enabled: bool,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
