pub mod controller;
pub mod phase;

pub use controller::{BreastSuggestion, FeedingController};
pub use phase::{LiveElapsed, PhaseTotals, PhaseTracker};
