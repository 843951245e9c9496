use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::models::{FeedingMode, FeedingPhase, FeedingSession, PhaseEntry, PhaseSnapshot};
use crate::utils::duration_seconds;

/// Live elapsed seconds for display. `total` is feeding time only; break
/// time never counts toward it.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LiveElapsed {
    pub total: u64,
    pub first: u64,
    pub second: u64,
    pub break_elapsed: u64,
}

/// Final per-phase totals produced when a session closes.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTotals {
    pub first_secs: u64,
    pub second_secs: u64,
    pub break_secs: u64,
    pub phases: Vec<PhaseEntry>,
}

/// Tracks which sub-phase of an open session is active and how much time
/// each category has accumulated.
///
/// The accumulators hold only *closed* sub-phases; the open sub-phase's
/// share is computed live from `phase_start`. Every transition closes the
/// open `PhaseEntry` and opens a new one, so the entries always tile the
/// session span with no gaps or overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTracker {
    mode: FeedingMode,
    current_phase: FeedingPhase,
    on_break: bool,
    phases: Vec<PhaseEntry>,
    phase_start: Option<DateTime<Utc>>,
    first_acc: u64,
    second_acc: u64,
    break_acc: u64,
}

impl PhaseTracker {
    /// Fresh tracker for a session starting now. Bottle sessions run as a
    /// single `First` phase; the switch/break transitions are simply never
    /// offered to the user in that mode.
    pub fn start(mode: FeedingMode, start_time: DateTime<Utc>) -> Self {
        Self {
            mode,
            current_phase: FeedingPhase::First,
            on_break: false,
            phases: vec![PhaseEntry::open(FeedingPhase::First, start_time)],
            phase_start: Some(start_time),
            first_acc: 0,
            second_acc: 0,
            break_acc: 0,
        }
    }

    /// Rebuild from a stored recovery snapshot.
    pub fn from_snapshot(snapshot: PhaseSnapshot) -> Self {
        Self {
            mode: snapshot.feeding_mode,
            current_phase: snapshot.current_phase,
            on_break: snapshot.on_break,
            phases: snapshot.phases,
            phase_start: snapshot.phase_start,
            first_acc: snapshot.first_acc,
            second_acc: snapshot.second_acc,
            break_acc: snapshot.break_acc,
        }
    }

    /// Rebuild for a session with no usable snapshot: the whole elapsed
    /// time since the session started counts as first-side feeding.
    pub fn from_session_start(mode: FeedingMode, start_time: DateTime<Utc>) -> Self {
        Self::start(mode, start_time)
    }

    /// Restore an open session, preferring its snapshot and falling back to
    /// the session start when the snapshot is missing or fails to decode.
    pub fn restore(session: &FeedingSession) -> Self {
        if let Some(raw) = session.phase_state.as_deref() {
            match serde_json::from_str::<PhaseSnapshot>(raw) {
                Ok(snapshot) => return Self::from_snapshot(snapshot),
                Err(err) => {
                    warn!(
                        "Malformed phase snapshot for session {}; using legacy restore: {err}",
                        session.id
                    );
                }
            }
        }
        Self::from_session_start(session.feeding_mode, session.start_time)
    }

    pub fn mode(&self) -> FeedingMode {
        self.mode
    }

    pub fn current_phase(&self) -> FeedingPhase {
        self.current_phase
    }

    pub fn on_break(&self) -> bool {
        self.on_break
    }

    pub fn phases(&self) -> &[PhaseEntry] {
        &self.phases
    }

    /// Switch to the other breast.
    ///
    /// While on break this only flips which side feeding resumes on; the
    /// open break entry keeps running untouched. Otherwise the current
    /// breast entry closes and a new one opens on the other side.
    pub fn switch_breast(&mut self, now: DateTime<Utc>) {
        let next = self.current_phase.opposite();

        if self.on_break {
            self.current_phase = next;
            return;
        }

        let secs = self.close_open_entry(now);
        self.credit(secs);
        self.current_phase = next;
        self.open_entry(next, now);
    }

    /// Enter or leave a break. Leaving resumes on `current_phase`, which
    /// may have been flipped while paused.
    pub fn toggle_break(&mut self, now: DateTime<Utc>) {
        let secs = self.close_open_entry(now);
        self.credit(secs);

        if self.on_break {
            self.on_break = false;
            self.open_entry(self.current_phase, now);
        } else {
            self.on_break = true;
            self.open_entry(FeedingPhase::Break, now);
        }
    }

    /// Close the tracker at session end, crediting the final open phase.
    pub fn close(mut self, end_time: DateTime<Utc>) -> PhaseTotals {
        let secs = self.close_open_entry(end_time);
        self.credit(secs);

        PhaseTotals {
            first_secs: self.first_acc,
            second_secs: self.second_acc,
            break_secs: self.break_acc,
            phases: self.phases,
        }
    }

    /// Live elapsed seconds at `now`. During a break the feeding total is
    /// frozen and only the break counter grows.
    pub fn elapsed(&self, now: DateTime<Utc>) -> LiveElapsed {
        let live = self
            .phase_start
            .map(|start| duration_seconds(start, now))
            .unwrap_or(0);

        let mut first = self.first_acc;
        let mut second = self.second_acc;
        let mut break_elapsed = self.break_acc;

        if self.on_break {
            break_elapsed += live;
        } else if self.current_phase == FeedingPhase::First {
            first += live;
        } else {
            second += live;
        }

        LiveElapsed {
            total: first + second,
            first,
            second,
            break_elapsed,
        }
    }

    /// Produce a recovery snapshot.
    ///
    /// With `fold_at` set, the open sub-phase's elapsed time is folded into
    /// its accumulator and the phase clock restarts at that instant, so the
    /// stored state stands alone even if the process dies right after.
    /// Folding is required before switching the active baby context.
    pub fn snapshot(&self, fold_at: Option<DateTime<Utc>>) -> PhaseSnapshot {
        let mut snapshot = PhaseSnapshot {
            current_phase: self.current_phase,
            on_break: self.on_break,
            phases: self.phases.clone(),
            phase_start: self.phase_start,
            first_acc: self.first_acc,
            second_acc: self.second_acc,
            break_acc: self.break_acc,
            feeding_mode: self.mode,
        };

        if let (Some(now), Some(start)) = (fold_at, self.phase_start) {
            let live = duration_seconds(start, now);
            if self.on_break {
                snapshot.break_acc += live;
            } else if self.current_phase == FeedingPhase::First {
                snapshot.first_acc += live;
            } else {
                snapshot.second_acc += live;
            }
            snapshot.phase_start = Some(now);
        }

        snapshot
    }

    fn close_open_entry(&mut self, end_time: DateTime<Utc>) -> u64 {
        let Some(phase_start) = self.phase_start else {
            return 0;
        };
        let Some(last) = self.phases.last_mut() else {
            return 0;
        };

        let secs = duration_seconds(phase_start, end_time);
        last.end_time = Some(end_time);
        last.duration = Some(secs);
        secs
    }

    fn credit(&mut self, secs: u64) {
        if self.on_break {
            self.break_acc += secs;
        } else if self.current_phase == FeedingPhase::First {
            self.first_acc += secs;
        } else {
            self.second_acc += secs;
        }
    }

    fn open_entry(&mut self, phase_type: FeedingPhase, start_time: DateTime<Utc>) {
        self.phases.push(PhaseEntry::open(phase_type, start_time));
        self.phase_start = Some(start_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn assert_contiguous(phases: &[PhaseEntry], start: DateTime<Utc>, end: DateTime<Utc>) {
        assert!(!phases.is_empty());
        assert_eq!(phases[0].start_time, start);
        for pair in phases.windows(2) {
            assert_eq!(pair[0].end_time, Some(pair[1].start_time));
        }
        assert_eq!(phases.last().unwrap().end_time, Some(end));
    }

    #[test]
    fn switch_then_stop_splits_sides() {
        // start -> 90s first -> switch -> 60s second -> stop
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.switch_breast(at(90));
        let totals = tracker.close(at(150));

        assert_eq!(totals.first_secs, 90);
        assert_eq!(totals.second_secs, 60);
        assert_eq!(totals.break_secs, 0);
        assert_eq!(totals.phases.len(), 2);
        assert_contiguous(&totals.phases, t0(), at(150));
    }

    #[test]
    fn break_time_is_excluded_from_feeding_total() {
        // 30s first -> 45s break -> 20s first -> stop
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.toggle_break(at(30));
        tracker.toggle_break(at(75));
        let totals = tracker.close(at(95));

        assert_eq!(totals.first_secs, 50);
        assert_eq!(totals.second_secs, 0);
        assert_eq!(totals.break_secs, 45);
        assert_contiguous(&totals.phases, t0(), at(95));
        assert_eq!(totals.phases[1].phase_type, FeedingPhase::Break);
        assert_eq!(totals.phases[2].phase_type, FeedingPhase::First);
    }

    #[test]
    fn bottle_session_is_one_phase() {
        let tracker = PhaseTracker::start(FeedingMode::Bottle, t0());
        let totals = tracker.close(at(180));

        assert_eq!(totals.first_secs, 180);
        assert_eq!(totals.second_secs, 0);
        assert_eq!(totals.phases.len(), 1);
        assert_eq!(totals.phases[0].duration, Some(180));
    }

    #[test]
    fn elapsed_freezes_total_during_break() {
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.toggle_break(at(40));

        // Total frozen at 40 while the break counter grows.
        let during = tracker.elapsed(at(65));
        assert_eq!(during.total, 40);
        assert_eq!(during.first, 40);
        assert_eq!(during.break_elapsed, 25);

        tracker.toggle_break(at(70));
        let after = tracker.elapsed(at(100));
        assert_eq!(after.total, 70);
        assert_eq!(after.break_elapsed, 30);
    }

    #[test]
    fn switch_during_break_only_changes_resume_side() {
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.toggle_break(at(30));
        let entries_before = tracker.phases().len();

        tracker.switch_breast(at(40));

        assert_eq!(tracker.phases().len(), entries_before);
        assert!(tracker.on_break());
        assert_eq!(tracker.current_phase(), FeedingPhase::Second);
        assert_eq!(tracker.elapsed(at(50)).break_elapsed, 20);

        tracker.toggle_break(at(60));
        let totals = tracker.close(at(90));
        assert_eq!(totals.first_secs, 30);
        assert_eq!(totals.second_secs, 30);
        assert_eq!(totals.break_secs, 30);
    }

    #[test]
    fn repeated_switches_accumulate_per_side() {
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.switch_breast(at(10));
        tracker.switch_breast(at(30));
        tracker.switch_breast(at(60));
        let totals = tracker.close(at(100));

        assert_eq!(totals.first_secs, 10 + 30);
        assert_eq!(totals.second_secs, 20 + 40);
        assert_contiguous(&totals.phases, t0(), at(100));
    }

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.switch_breast(at(90));
        tracker.toggle_break(at(120));

        let snapshot = tracker.snapshot(None);
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = PhaseTracker::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored, tracker);
        assert_eq!(restored.elapsed(at(150)), tracker.elapsed(at(150)));
    }

    #[test]
    fn folded_snapshot_stands_alone() {
        let mut tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        tracker.switch_breast(at(90));

        let snapshot = tracker.snapshot(Some(at(120)));
        assert_eq!(snapshot.second_acc, 30);
        assert_eq!(snapshot.phase_start, Some(at(120)));

        // Restoring and closing immediately loses nothing.
        let restored = PhaseTracker::from_snapshot(snapshot);
        let totals = restored.close(at(120));
        assert_eq!(totals.first_secs, 90);
        assert_eq!(totals.second_secs, 30);
    }

    #[test]
    fn snapshot_json_uses_app_field_names() {
        let tracker = PhaseTracker::start(FeedingMode::Breast, t0());
        let json = serde_json::to_string(&tracker.snapshot(None)).unwrap();

        assert!(json.contains("\"currentPhase\":\"first\""));
        assert!(json.contains("\"onBreak\":false"));
        assert!(json.contains("\"firstAcc\":0"));
        assert!(json.contains("\"feedingMode\":\"breast\""));
        assert!(json.contains("\"type\":\"first\""));
    }

    #[test]
    fn restore_falls_back_on_malformed_snapshot() {
        let session = FeedingSession {
            id: "s1".into(),
            baby_id: "b1".into(),
            start_time: t0(),
            end_time: None,
            duration: None,
            feeding_mode: FeedingMode::Breast,
            volume: None,
            first_breast_duration: None,
            second_breast_duration: None,
            break_duration: None,
            phases: None,
            phase_state: Some("{not json".into()),
            audio_note_path: None,
            note: None,
            created_at: t0(),
        };

        let tracker = PhaseTracker::restore(&session);
        assert_eq!(tracker.current_phase(), FeedingPhase::First);
        assert!(!tracker.on_break());
        assert_eq!(tracker.elapsed(at(30)).total, 30);
    }

    #[test]
    fn restore_accepts_snapshot_without_feeding_mode() {
        // Rows written before feeding modes existed lack the field.
        let raw = r#"{"currentPhase":"second","onBreak":true,
            "phases":[{"type":"first","startTime":"2026-03-10T09:00:00Z",
                       "endTime":"2026-03-10T09:01:00Z","duration":60},
                      {"type":"break","startTime":"2026-03-10T09:01:00Z"}],
            "phaseStart":"2026-03-10T09:01:00Z",
            "firstAcc":60,"secondAcc":0,"breakAcc":0}"#;

        let snapshot: PhaseSnapshot = serde_json::from_str(raw).unwrap();
        let tracker = PhaseTracker::from_snapshot(snapshot);

        assert_eq!(tracker.mode(), FeedingMode::Breast);
        assert!(tracker.on_break());
        assert_eq!(tracker.current_phase(), FeedingPhase::Second);
        assert_eq!(tracker.elapsed(at(90)).break_elapsed, 30);
    }
}
