use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw feeding aggregates as the store computes them over one date window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedingAggregates {
    pub total_feedings: u64,
    pub total_duration: u64,
    pub avg_duration: f64,
    pub longest_session: u64,
    pub shortest_session: u64,
}

/// Raw bottle/breast aggregates over one date window. Volume sums treat
/// null volumes as 0; the average skips them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BottleAggregates {
    pub bottle_count: u64,
    pub breast_count: u64,
    pub total_volume: u64,
    pub avg_volume: f64,
}

/// Raw diaper tallies over one date window. A `both` log counts toward pee
/// and poop but once toward the total.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiaperAggregates {
    pub total: u64,
    pub total_pee: u64,
    pub total_poop: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayStatistics {
    pub date: NaiveDate,
    pub total_feedings: u64,
    pub total_duration: u64,
    pub average_duration: f64,
    pub longest_session: u64,
    pub shortest_session: u64,
}

/// Feeding statistics over an inclusive date range (a week, a month, or any
/// custom window).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RangeStatistics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_feedings: u64,
    pub total_duration: u64,
    pub average_duration: f64,
    pub average_feedings_per_day: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BottleDayStats {
    pub date: NaiveDate,
    pub bottle_count: u64,
    pub breast_count: u64,
    pub total_volume: u64,
    pub avg_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BottleRangeStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bottle_count: u64,
    pub breast_count: u64,
    pub total_volume: u64,
    pub avg_volume: f64,
    pub avg_daily_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiaperDayStats {
    pub date: NaiveDate,
    pub total: u64,
    pub total_pee: u64,
    pub total_poop: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiaperRangeStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total: u64,
    pub total_pee: u64,
    pub total_poop: u64,
    pub avg_per_day: f64,
}

/// Per-day feeding roll-up inside a range, one entry per local calendar
/// date that has at least one closed session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub total_feedings: u64,
    pub total_duration: u64,
    pub avg_duration: f64,
}
