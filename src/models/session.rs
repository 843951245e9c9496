use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::PhaseEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedingMode {
    Breast,
    Bottle,
}

impl FeedingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedingMode::Breast => "breast",
            FeedingMode::Bottle => "bottle",
        }
    }
}

impl Default for FeedingMode {
    fn default() -> Self {
        FeedingMode::Breast
    }
}

/// One feeding event. `end_time`, `duration` and the per-phase totals are
/// null while the session is open; at most one open session exists per baby.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedingSession {
    pub id: String,
    pub baby_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Total feeding seconds, excluding break time.
    pub duration: Option<u64>,
    pub feeding_mode: FeedingMode,
    /// Bottle volume in ml, attached after the session ends.
    pub volume: Option<u64>,
    pub first_breast_duration: Option<u64>,
    pub second_breast_duration: Option<u64>,
    pub break_duration: Option<u64>,
    /// JSON-encoded `Vec<PhaseEntry>`, set when the session is finalized.
    pub phases: Option<String>,
    /// JSON-encoded `PhaseSnapshot`, present only while the session is open.
    pub phase_state: Option<String>,
    pub audio_note_path: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedingSession {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Decode the stored phase history. Missing or malformed blobs yield
    /// `None` rather than an error; callers treat that as "no history".
    pub fn phase_entries(&self) -> Option<Vec<PhaseEntry>> {
        let raw = self.phases.as_deref()?;
        serde_json::from_str(raw).ok()
    }
}

/// The in-memory identity of the session currently being timed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub id: String,
    pub baby_id: String,
    pub start_time: DateTime<Utc>,
    pub feeding_mode: FeedingMode,
}

/// Returned from a successful stop so callers can drive follow-up prompts
/// (bottle volume, audio note, reminder).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedFeeding {
    pub session_id: String,
    pub duration: u64,
    pub feeding_mode: FeedingMode,
}
