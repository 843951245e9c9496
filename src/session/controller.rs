use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};

use crate::db::Database;
use crate::models::{
    ActiveSession, CompletedFeeding, FeedingMode, FeedingPhase, PhaseSnapshot,
};
use crate::session::phase::{LiveElapsed, PhaseTracker};
use crate::utils;

/// Minimum interval between accepted start/stop calls; absorbs accidental
/// double-taps on the primary control. Switch/break toggles are not
/// debounced.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Which breast to offer for the next session, derived from the last closed
/// session's phase history. `last_was_bottle` lets the caller distinguish
/// "no prior data" from "last feed was a bottle".
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreastSuggestion {
    pub suggested: Option<FeedingPhase>,
    pub last_was_bottle: bool,
}

struct ControllerState {
    active: Option<ActiveSession>,
    tracker: Option<PhaseTracker>,
    suggestion: BreastSuggestion,
}

/// Orchestrates feeding sessions for one baby context at a time: start/stop
/// with debounce, phase transitions with fire-and-forget snapshot writes,
/// restore on baby switch, and a 1 Hz elapsed-time tick.
///
/// In-memory state is authoritative while a session is open; snapshot
/// persistence is for crash recovery only, so its failures are logged and
/// never roll back a transition.
#[derive(Clone)]
pub struct FeedingController {
    db: Database,
    state: Arc<Mutex<ControllerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    last_tap: Arc<Mutex<Option<Instant>>>,
    elapsed_tx: Arc<watch::Sender<LiveElapsed>>,
    elapsed_rx: watch::Receiver<LiveElapsed>,
    debounce_window: Duration,
}

impl FeedingController {
    pub fn new(db: Database) -> Self {
        Self::with_debounce(db, DEBOUNCE_WINDOW)
    }

    /// Same as [`FeedingController::new`] with a custom debounce window;
    /// tests shrink it to keep themselves fast.
    pub fn with_debounce(db: Database, debounce_window: Duration) -> Self {
        let (elapsed_tx, elapsed_rx) = watch::channel(LiveElapsed::default());
        Self {
            db,
            state: Arc::new(Mutex::new(ControllerState {
                active: None,
                tracker: None,
                suggestion: BreastSuggestion::default(),
            })),
            ticker: Arc::new(Mutex::new(None)),
            last_tap: Arc::new(Mutex::new(None)),
            elapsed_tx: Arc::new(elapsed_tx),
            elapsed_rx,
            debounce_window,
        }
    }

    /// Start a new feeding session. Returns `None` when debounced or when a
    /// session is already running; storage failures surface, since a start
    /// that silently fails to persist would desync memory and disk.
    pub async fn start(&self, baby_id: &str, mode: FeedingMode) -> Result<Option<ActiveSession>> {
        {
            let state = self.state.lock().await;
            if state.active.is_some() {
                warn!("start ignored: a session is already running");
                return Ok(None);
            }
        }

        if self.debounced().await {
            return Ok(None);
        }

        let start_time = utils::now();
        let id = utils::new_id();

        self.db
            .insert_session(&id, baby_id, start_time, mode)
            .await?;

        let session = ActiveSession {
            id: id.clone(),
            baby_id: baby_id.to_string(),
            start_time,
            feeding_mode: mode,
        };

        let snapshot = {
            let mut state = self.state.lock().await;
            let tracker = PhaseTracker::start(mode, start_time);
            let snapshot = tracker.snapshot(None);
            state.active = Some(session.clone());
            state.tracker = Some(tracker);
            snapshot
        };

        let _ = self.elapsed_tx.send(LiveElapsed::default());
        self.spawn_ticker().await;
        self.persist_snapshot_detached(id, snapshot);

        info!(
            "Started {} feeding session for baby {baby_id}",
            mode.as_str()
        );

        Ok(Some(session))
    }

    /// Stop the open session: credit the final phase, finalize the record
    /// atomically, reset live state and refresh the breast suggestion.
    /// Returns `None` when no session is open or the call is debounced.
    pub async fn stop(&self) -> Result<Option<CompletedFeeding>> {
        {
            let state = self.state.lock().await;
            if state.active.is_none() {
                return Ok(None);
            }
        }

        if self.debounced().await {
            return Ok(None);
        }

        let end_time = utils::now();

        let (session_id, baby_id, mode, totals) = {
            let state = self.state.lock().await;
            let Some(active) = state.active.as_ref() else {
                return Ok(None);
            };
            let tracker = state.tracker.clone().unwrap_or_else(|| {
                PhaseTracker::from_session_start(active.feeding_mode, active.start_time)
            });
            (
                active.id.clone(),
                active.baby_id.clone(),
                active.feeding_mode,
                tracker.close(end_time),
            )
        };

        // Break time never counts toward the reported duration; for bottle
        // sessions the second accumulator is always zero.
        let duration = totals.first_secs + totals.second_secs;

        let phases_json =
            serde_json::to_string(&totals.phases).context("failed to encode phase history")?;

        self.db
            .finalize_session(
                &session_id,
                end_time,
                duration,
                totals.first_secs,
                totals.second_secs,
                totals.break_secs,
                &phases_json,
            )
            .await?;

        self.cancel_ticker().await;
        {
            let mut state = self.state.lock().await;
            state.active = None;
            state.tracker = None;
        }
        let _ = self.elapsed_tx.send(LiveElapsed::default());

        self.reload_suggestion(&baby_id).await;

        info!("Stopped session {session_id} after {duration}s of feeding");

        Ok(Some(CompletedFeeding {
            session_id,
            duration,
            feeding_mode: mode,
        }))
    }

    /// Switch to the other breast. A no-op when no session is open. The
    /// in-memory state updates synchronously; the snapshot write is
    /// fire-and-forget so rapid taps never wait on storage.
    pub async fn switch_breast(&self) {
        let now = utils::now();
        let (session_id, snapshot) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let (Some(active), Some(tracker)) = (state.active.as_ref(), state.tracker.as_mut())
            else {
                return;
            };
            tracker.switch_breast(now);
            let _ = self.elapsed_tx.send(tracker.elapsed(now));
            (active.id.clone(), tracker.snapshot(None))
        };

        self.persist_snapshot_detached(session_id, snapshot);
    }

    /// Enter or leave a break. Same no-op and persistence rules as
    /// [`FeedingController::switch_breast`].
    pub async fn toggle_break(&self) {
        let now = utils::now();
        let (session_id, snapshot) = {
            let mut guard = self.state.lock().await;
            let state = &mut *guard;
            let (Some(active), Some(tracker)) = (state.active.as_ref(), state.tracker.as_mut())
            else {
                return;
            };
            tracker.toggle_break(now);
            let _ = self.elapsed_tx.send(tracker.elapsed(now));
            (active.id.clone(), tracker.snapshot(None))
        };

        self.persist_snapshot_detached(session_id, snapshot);
    }

    /// Switch the active baby context. Persists the outgoing baby's folded
    /// snapshot first, then loads the incoming baby's open session (if any);
    /// the ordering matters, or a fast switch back could read a snapshot
    /// that was about to be overwritten.
    pub async fn restore_for_baby(&self, baby_id: &str) {
        self.save_open_snapshot().await;
        self.cancel_ticker().await;

        match self.db.get_open_session(baby_id).await {
            Ok(Some(session)) => {
                let tracker = PhaseTracker::restore(&session);
                let active = ActiveSession {
                    id: session.id.clone(),
                    baby_id: session.baby_id.clone(),
                    start_time: session.start_time,
                    feeding_mode: tracker.mode(),
                };
                let _ = self.elapsed_tx.send(tracker.elapsed(utils::now()));
                {
                    let mut state = self.state.lock().await;
                    state.active = Some(active);
                    state.tracker = Some(tracker);
                }
                self.spawn_ticker().await;
                info!("Restored open session {} for baby {baby_id}", session.id);
            }
            Ok(None) => {
                let mut state = self.state.lock().await;
                state.active = None;
                state.tracker = None;
                drop(state);
                let _ = self.elapsed_tx.send(LiveElapsed::default());
            }
            Err(err) => {
                error!("Failed to restore session for baby {baby_id}: {err:#}");
                let mut state = self.state.lock().await;
                state.active = None;
                state.tracker = None;
                drop(state);
                let _ = self.elapsed_tx.send(LiveElapsed::default());
            }
        }

        self.reload_suggestion(baby_id).await;
    }

    /// Tear down the controller: persist a folded snapshot for the open
    /// session (if any) and stop the tick. The session itself stays open
    /// and resumes on the next restore.
    pub async fn shutdown(&self) {
        self.save_open_snapshot().await;
        self.cancel_ticker().await;
    }

    pub async fn active_session(&self) -> Option<ActiveSession> {
        self.state.lock().await.active.clone()
    }

    pub async fn is_feeding(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    pub async fn current_phase(&self) -> Option<FeedingPhase> {
        let state = self.state.lock().await;
        state.tracker.as_ref().map(|t| t.current_phase())
    }

    pub async fn on_break(&self) -> bool {
        let state = self.state.lock().await;
        state.tracker.as_ref().map(|t| t.on_break()).unwrap_or(false)
    }

    pub async fn suggestion(&self) -> BreastSuggestion {
        self.state.lock().await.suggestion
    }

    /// Live elapsed seconds computed on demand.
    pub async fn live_elapsed(&self) -> LiveElapsed {
        let state = self.state.lock().await;
        state
            .tracker
            .as_ref()
            .map(|t| t.elapsed(utils::now()))
            .unwrap_or_default()
    }

    /// Receiver for the 1 Hz elapsed-time feed. Holds the latest value; new
    /// subscribers see it immediately.
    pub fn subscribe(&self) -> watch::Receiver<LiveElapsed> {
        self.elapsed_rx.clone()
    }

    /// Attach a bottle volume to a finalized session. Post-hoc attachments
    /// are non-critical: failures are logged, not surfaced.
    pub async fn save_volume(&self, session_id: &str, volume_ml: u64) {
        if let Err(err) = self.db.attach_volume(session_id, volume_ml).await {
            error!("Failed to save volume for session {session_id}: {err:#}");
        }
    }

    pub async fn save_audio_note(&self, session_id: &str, path: &str) {
        if let Err(err) = self.db.attach_audio_note(session_id, path).await {
            error!("Failed to save audio note for session {session_id}: {err:#}");
        }
    }

    pub async fn save_note(&self, session_id: &str, note: &str) {
        if let Err(err) = self.db.attach_note(session_id, note).await {
            error!("Failed to save note for session {session_id}: {err:#}");
        }
    }

    /// True when the call arrives within the debounce window of the last
    /// accepted start/stop; accepted calls move the window forward.
    async fn debounced(&self) -> bool {
        let mut guard = self.last_tap.lock().await;
        let now = Instant::now();
        if let Some(last) = *guard {
            if now.duration_since(last) < self.debounce_window {
                return true;
            }
        }
        *guard = Some(now);
        false
    }

    /// Persist a folded snapshot for the open session, awaiting the write so
    /// a follow-up restore reads consistent state.
    async fn save_open_snapshot(&self) {
        let persist = {
            let state = self.state.lock().await;
            match (state.active.as_ref(), state.tracker.as_ref()) {
                (Some(active), Some(tracker)) => {
                    Some((active.id.clone(), tracker.snapshot(Some(utils::now()))))
                }
                _ => None,
            }
        };

        let Some((session_id, snapshot)) = persist else {
            return;
        };

        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(err) = self.db.update_phase_snapshot(&session_id, &json).await {
                    error!("Failed to save phase snapshot for {session_id}: {err:#}");
                }
            }
            Err(err) => error!("Failed to encode phase snapshot for {session_id}: {err}"),
        }
    }

    /// Fire-and-forget snapshot write. Losing one only costs recovery
    /// precision; the next transition overwrites it.
    fn persist_snapshot_detached(&self, session_id: String, snapshot: PhaseSnapshot) {
        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(err) => {
                error!("Failed to encode phase snapshot for {session_id}: {err}");
                return;
            }
        };

        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(err) = db.update_phase_snapshot(&session_id, &json).await {
                error!("Failed to persist phase snapshot for {session_id}: {err:#}");
            }
        });
    }

    /// Recompute the next-breast suggestion from the last closed session,
    /// scanning its phase history backward for the last non-break entry.
    /// Empty or unparseable histories permissively yield no suggestion.
    async fn reload_suggestion(&self, baby_id: &str) {
        let suggestion = match self.db.get_last_closed_session(baby_id).await {
            Ok(Some(session)) => {
                if session.feeding_mode == FeedingMode::Bottle {
                    BreastSuggestion {
                        suggested: None,
                        last_was_bottle: true,
                    }
                } else {
                    let suggested = session.phase_entries().and_then(|phases| {
                        phases
                            .iter()
                            .rev()
                            .find(|entry| entry.phase_type.is_breast())
                            .map(|entry| entry.phase_type.opposite())
                    });
                    BreastSuggestion {
                        suggested,
                        last_was_bottle: false,
                    }
                }
            }
            Ok(None) => BreastSuggestion::default(),
            Err(err) => {
                error!("Failed to load last session for baby {baby_id}: {err:#}");
                BreastSuggestion::default()
            }
        };

        self.state.lock().await.suggestion = suggestion;
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let elapsed_tx = self.elapsed_tx.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;

                let elapsed = {
                    let state = state.lock().await;
                    let Some(tracker) = state.tracker.as_ref() else {
                        break;
                    };
                    tracker.elapsed(utils::now())
                };

                let _ = elapsed_tx.send(elapsed);
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
