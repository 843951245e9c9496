pub mod baby;
pub mod diaper;
pub mod growth;
pub mod phase;
pub mod session;
pub mod stats;

pub use baby::{Baby, Sex};
pub use diaper::{DiaperLog, DiaperType};
pub use growth::GrowthRecord;
pub use phase::{FeedingPhase, PhaseEntry, PhaseSnapshot};
pub use session::{ActiveSession, CompletedFeeding, FeedingMode, FeedingSession};
pub use stats::{
    BottleAggregates, BottleDayStats, BottleRangeStats, DailyBreakdown, DayStatistics,
    DiaperAggregates, DiaperDayStats, DiaperRangeStats, FeedingAggregates, RangeStatistics,
};
