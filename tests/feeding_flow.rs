use std::time::Duration;

use nursling::models::{FeedingMode, FeedingPhase};
use nursling::{utils, Database, FeedingController};
use tempfile::TempDir;

fn open_db(dir: &TempDir) -> Database {
    Database::new(dir.path().join("nursling.sqlite3")).expect("open database")
}

async fn seed_baby(db: &Database, id: &str) {
    db.insert_baby(id, "Test Baby", None, None, utils::now())
        .await
        .expect("insert baby");
}

/// Zero-width window disables the debounce for flow tests.
fn controller(db: &Database) -> FeedingController {
    FeedingController::with_debounce(db.clone(), Duration::ZERO)
}

#[tokio::test]
async fn breast_session_splits_time_across_sides() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    let started = feeding.start("baby-1", FeedingMode::Breast).await.unwrap();
    assert!(started.is_some());
    assert!(feeding.is_feeding().await);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    feeding.switch_breast().await;
    assert_eq!(feeding.current_phase().await, Some(FeedingPhase::Second));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let completed = feeding.stop().await.unwrap().expect("session finalizes");

    assert_eq!(completed.feeding_mode, FeedingMode::Breast);
    assert!(!feeding.is_feeding().await);

    let session = db
        .get_last_closed_session("baby-1")
        .await
        .unwrap()
        .expect("closed session stored");

    assert_eq!(session.id, completed.session_id);
    assert_eq!(session.duration, Some(completed.duration));
    assert_eq!(
        session.duration,
        Some(
            session.first_breast_duration.unwrap() + session.second_breast_duration.unwrap()
        )
    );
    assert_eq!(session.break_duration, Some(0));
    assert!(session.first_breast_duration.unwrap() >= 1);
    assert!(session.second_breast_duration.unwrap() >= 1);
    // Snapshot is cleared once the session closes.
    assert!(session.phase_state.is_none());

    // Phase entries tile the whole session with no gaps.
    let phases = session.phase_entries().expect("phase history parses");
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[0].start_time, session.start_time);
    assert_eq!(phases[0].end_time, Some(phases[1].start_time));
    assert_eq!(phases[1].end_time, session.end_time);
}

#[tokio::test]
async fn bottle_session_reports_bottle_mode() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    feeding.start("baby-1", FeedingMode::Bottle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let completed = feeding.stop().await.unwrap().expect("session finalizes");

    assert_eq!(completed.feeding_mode, FeedingMode::Bottle);

    let session = db.get_last_closed_session("baby-1").await.unwrap().unwrap();
    assert_eq!(session.feeding_mode, FeedingMode::Bottle);
    assert_eq!(session.second_breast_duration, Some(0));

    // Volume attaches post-hoc without touching the timing fields.
    feeding.save_volume(&completed.session_id, 120).await;
    let session = db.get_last_closed_session("baby-1").await.unwrap().unwrap();
    assert_eq!(session.volume, Some(120));
    assert_eq!(session.duration, Some(completed.duration));
}

#[tokio::test]
async fn stop_without_open_session_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    assert!(feeding.stop().await.unwrap().is_none());
    assert!(!feeding.is_feeding().await);
}

#[tokio::test]
async fn rapid_stop_after_start_is_debounced() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = FeedingController::with_debounce(db.clone(), Duration::from_millis(500));

    let started = feeding.start("baby-1", FeedingMode::Breast).await.unwrap();
    assert!(started.is_some());

    // Inside the window: rejected, session stays open.
    assert!(feeding.stop().await.unwrap().is_none());
    assert!(feeding.is_feeding().await);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(feeding.stop().await.unwrap().is_some());
    assert!(!feeding.is_feeding().await);
}

#[tokio::test]
async fn double_start_only_creates_one_session() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    assert!(feeding
        .start("baby-1", FeedingMode::Breast)
        .await
        .unwrap()
        .is_some());
    assert!(feeding
        .start("baby-1", FeedingMode::Breast)
        .await
        .unwrap()
        .is_none());

    tokio::time::sleep(Duration::from_millis(200)).await;
    let open = db.get_open_session("baby-1").await.unwrap();
    assert!(open.is_some());
    feeding.stop().await.unwrap();
}

#[tokio::test]
async fn open_session_survives_controller_restart() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;

    let feeding = controller(&db);
    feeding.start("baby-1", FeedingMode::Breast).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    feeding.toggle_break().await;
    feeding.switch_breast().await; // pick the resume side while paused
    feeding.shutdown().await;

    // A fresh controller (new process, same database) picks the session up
    // mid-break with the flipped side intact.
    let revived = controller(&db);
    revived.restore_for_baby("baby-1").await;

    assert!(revived.is_feeding().await);
    assert!(revived.on_break().await);
    assert_eq!(revived.current_phase().await, Some(FeedingPhase::Second));

    let elapsed = revived.live_elapsed().await;
    assert!(elapsed.total >= 1, "feeding time carried over: {elapsed:?}");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    revived.toggle_break().await;
    let completed = revived.stop().await.unwrap().expect("session finalizes");

    let session = db.get_last_closed_session("baby-1").await.unwrap().unwrap();
    assert_eq!(session.id, completed.session_id);
    assert!(session.break_duration.unwrap() >= 1);
    assert_eq!(
        session.duration.unwrap(),
        session.first_breast_duration.unwrap() + session.second_breast_duration.unwrap()
    );
}

#[tokio::test]
async fn restore_for_baby_without_session_resets_state() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    seed_baby(&db, "baby-2").await;

    let feeding = controller(&db);
    feeding.start("baby-1", FeedingMode::Breast).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    feeding.restore_for_baby("baby-2").await;
    assert!(!feeding.is_feeding().await);
    assert_eq!(feeding.live_elapsed().await.total, 0);

    // Baby 1's session is still open on disk and restores with its time.
    feeding.restore_for_baby("baby-1").await;
    assert!(feeding.is_feeding().await);
    assert!(feeding.live_elapsed().await.total >= 1);

    feeding.stop().await.unwrap();
}

#[tokio::test]
async fn suggestion_flips_to_the_unused_side() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    // No prior data: no suggestion, no bottle flag.
    feeding.restore_for_baby("baby-1").await;
    let suggestion = feeding.suggestion().await;
    assert_eq!(suggestion.suggested, None);
    assert!(!suggestion.last_was_bottle);

    // Session ending on the second breast suggests the first.
    feeding.start("baby-1", FeedingMode::Breast).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    feeding.switch_breast().await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    feeding.stop().await.unwrap().expect("session finalizes");

    let suggestion = feeding.suggestion().await;
    assert_eq!(suggestion.suggested, Some(FeedingPhase::First));
    assert!(!suggestion.last_was_bottle);
}

#[tokio::test]
async fn bottle_session_suppresses_suggestion() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    feeding.start("baby-1", FeedingMode::Bottle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    feeding.stop().await.unwrap().expect("session finalizes");

    let suggestion = feeding.suggestion().await;
    assert_eq!(suggestion.suggested, None);
    assert!(suggestion.last_was_bottle);
}

#[tokio::test]
async fn live_tick_publishes_elapsed_seconds() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    seed_baby(&db, "baby-1").await;
    let feeding = controller(&db);

    let mut ticks = feeding.subscribe();
    feeding.start("baby-1", FeedingMode::Breast).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2200)).await;
    let elapsed = *ticks.borrow_and_update();
    assert!(elapsed.total >= 1, "tick advanced: {elapsed:?}");
    assert_eq!(elapsed.total, elapsed.first + elapsed.second);

    feeding.stop().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(feeding.live_elapsed().await.total, 0);
}
