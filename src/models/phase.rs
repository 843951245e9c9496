use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::FeedingMode;

/// Sub-phase of a breast feeding session. Bottle sessions run as a single
/// `First` phase for their whole duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedingPhase {
    First,
    Second,
    Break,
}

impl FeedingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedingPhase::First => "first",
            FeedingPhase::Second => "second",
            FeedingPhase::Break => "break",
        }
    }

    pub fn is_breast(&self) -> bool {
        matches!(self, FeedingPhase::First | FeedingPhase::Second)
    }

    /// The other breast. `Break` has no opposite and is returned unchanged.
    pub fn opposite(&self) -> FeedingPhase {
        match self {
            FeedingPhase::First => FeedingPhase::Second,
            FeedingPhase::Second => FeedingPhase::First,
            FeedingPhase::Break => FeedingPhase::Break,
        }
    }
}

/// One contiguous sub-phase within a session. `end_time`/`duration` are
/// absent while the entry is still the active sub-phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEntry {
    #[serde(rename = "type")]
    pub phase_type: FeedingPhase,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl PhaseEntry {
    pub fn open(phase_type: FeedingPhase, start_time: DateTime<Utc>) -> Self {
        Self {
            phase_type,
            start_time,
            end_time: None,
            duration: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Recovery snapshot of an open session's phase state. The accumulators
/// exclude the currently-open sub-phase, whose live share is computed from
/// `phase_start` on top.
///
/// Serialized as an opaque JSON blob in the `phase_state` column; the field
/// names match what older app versions wrote, so existing rows restore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSnapshot {
    pub current_phase: FeedingPhase,
    pub on_break: bool,
    pub phases: Vec<PhaseEntry>,
    pub phase_start: Option<DateTime<Utc>>,
    pub first_acc: u64,
    pub second_acc: u64,
    pub break_acc: u64,
    #[serde(default)]
    pub feeding_mode: FeedingMode,
}
