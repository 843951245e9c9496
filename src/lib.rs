//! Local-first baby-care tracking engine: timed feeding sessions with
//! breast-switch and break sub-phases, diaper logs, growth records, and the
//! statistics derived from them. Storage is an embedded SQLite database;
//! all state needed to resume an interrupted session is persisted as it
//! changes.

pub mod db;
pub mod growth;
pub mod models;
pub mod session;
pub mod stats;
pub mod utils;

pub use db::Database;
pub use session::{BreastSuggestion, FeedingController, LiveElapsed, PhaseTracker};
