//! Read-side statistics derived from stored records. Everything here is
//! recomputed on demand from the store's pre-aggregated queries; two calls
//! against unchanged data return identical results.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};

use crate::db::Database;
use crate::models::{
    BottleDayStats, BottleRangeStats, DailyBreakdown, DayStatistics, DiaperDayStats,
    DiaperRangeStats, FeedingAggregates, RangeStatistics,
};

/// Inclusive day count of a date range; degenerate ranges count as one day.
fn day_count(start_date: NaiveDate, end_date: NaiveDate) -> u64 {
    ((end_date - start_date).num_days() + 1).max(1) as u64
}

/// Monday of the week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 is valid in every month")
}

fn month_end(first_day: NaiveDate) -> NaiveDate {
    let (year, month) = if first_day.month() == 12 {
        (first_day.year() + 1, 1)
    } else {
        (first_day.year(), first_day.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is valid") - Duration::days(1)
}

fn to_range_statistics(
    start_date: NaiveDate,
    end_date: NaiveDate,
    aggregates: FeedingAggregates,
) -> RangeStatistics {
    let days = day_count(start_date, end_date);
    RangeStatistics {
        start_date,
        end_date,
        total_feedings: aggregates.total_feedings,
        total_duration: aggregates.total_duration,
        average_duration: aggregates.avg_duration,
        average_feedings_per_day: aggregates.total_feedings as f64 / days as f64,
    }
}

/// Feeding statistics over closed sessions starting on `date`. Zero
/// sessions yield a well-defined zero result, not an error.
pub async fn day_statistics(
    db: &Database,
    baby_id: &str,
    date: NaiveDate,
) -> Result<DayStatistics> {
    let aggregates = db.day_stats(baby_id, date).await?;
    Ok(DayStatistics {
        date,
        total_feedings: aggregates.total_feedings,
        total_duration: aggregates.total_duration,
        average_duration: aggregates.avg_duration,
        longest_session: aggregates.longest_session,
        shortest_session: aggregates.shortest_session,
    })
}

/// Feeding statistics over an inclusive date range.
pub async fn range_statistics(
    db: &Database,
    baby_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<RangeStatistics> {
    let aggregates = db.range_stats(baby_id, start_date, end_date).await?;
    Ok(to_range_statistics(start_date, end_date, aggregates))
}

pub async fn bottle_day_statistics(
    db: &Database,
    baby_id: &str,
    date: NaiveDate,
) -> Result<BottleDayStats> {
    let aggregates = db.bottle_day_stats(baby_id, date).await?;
    Ok(BottleDayStats {
        date,
        bottle_count: aggregates.bottle_count,
        breast_count: aggregates.breast_count,
        total_volume: aggregates.total_volume,
        avg_volume: aggregates.avg_volume,
    })
}

pub async fn bottle_range_statistics(
    db: &Database,
    baby_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<BottleRangeStats> {
    let aggregates = db.bottle_range_stats(baby_id, start_date, end_date).await?;
    let days = day_count(start_date, end_date);
    Ok(BottleRangeStats {
        start_date,
        end_date,
        bottle_count: aggregates.bottle_count,
        breast_count: aggregates.breast_count,
        total_volume: aggregates.total_volume,
        avg_volume: aggregates.avg_volume,
        avg_daily_volume: aggregates.total_volume as f64 / days as f64,
    })
}

pub async fn diaper_day_statistics(
    db: &Database,
    baby_id: &str,
    date: NaiveDate,
) -> Result<DiaperDayStats> {
    let aggregates = db.diaper_day_stats(baby_id, date).await?;
    Ok(DiaperDayStats {
        date,
        total: aggregates.total,
        total_pee: aggregates.total_pee,
        total_poop: aggregates.total_poop,
    })
}

pub async fn diaper_range_statistics(
    db: &Database,
    baby_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<DiaperRangeStats> {
    let aggregates = db.diaper_range_stats(baby_id, start_date, end_date).await?;
    let days = day_count(start_date, end_date);
    let avg_per_day = (aggregates.total as f64 / days as f64 * 10.0).round() / 10.0;
    Ok(DiaperRangeStats {
        start_date,
        end_date,
        total: aggregates.total,
        total_pee: aggregates.total_pee,
        total_poop: aggregates.total_poop,
        avg_per_day,
    })
}

/// Per-day breakdown inside a range; days with no sessions are omitted.
pub async fn daily_breakdown(
    db: &Database,
    baby_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<DailyBreakdown>> {
    db.daily_stats_for_range(baby_id, start_date, end_date).await
}

/// Weekly rollups from the week containing `today` back to the baby's first
/// recorded session. Monday-based weeks; weeks with zero feedings are left
/// out of the result.
pub async fn weekly_history(
    db: &Database,
    baby_id: &str,
    today: NaiveDate,
) -> Result<Vec<RangeStatistics>> {
    let Some(first_date) = db.first_session_date(baby_id).await? else {
        return Ok(Vec::new());
    };

    let mut buckets = Vec::new();
    let mut start = week_start(today);

    loop {
        let end = start + Duration::days(6);
        if end < first_date {
            break;
        }

        let aggregates = db.range_stats(baby_id, start, end).await?;
        if aggregates.total_feedings > 0 {
            buckets.push(to_range_statistics(start, end, aggregates));
        }

        start = start - Duration::days(7);
    }

    Ok(buckets)
}

/// Monthly rollups, same construction as [`weekly_history`] over calendar
/// months.
pub async fn monthly_history(
    db: &Database,
    baby_id: &str,
    today: NaiveDate,
) -> Result<Vec<RangeStatistics>> {
    let Some(first_date) = db.first_session_date(baby_id).await? else {
        return Ok(Vec::new());
    };

    let mut buckets = Vec::new();
    let mut start = month_start(today);

    loop {
        let end = month_end(start);
        if end < first_date {
            break;
        }

        let aggregates = db.range_stats(baby_id, start, end).await?;
        if aggregates.total_feedings > 0 {
            buckets.push(to_range_statistics(start, end, aggregates));
        }

        start = month_start(start - Duration::days(1));
    }

    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        assert_eq!(week_start(date(2026, 8, 5)), date(2026, 8, 3));
        assert_eq!(week_start(date(2026, 8, 3)), date(2026, 8, 3));
        assert_eq!(week_start(date(2026, 8, 9)), date(2026, 8, 3));
    }

    #[test]
    fn month_bounds_handle_year_edges() {
        assert_eq!(month_start(date(2026, 12, 25)), date(2026, 12, 1));
        assert_eq!(month_end(date(2026, 12, 1)), date(2026, 12, 31));
        assert_eq!(month_end(date(2026, 2, 1)), date(2026, 2, 28));
        assert_eq!(month_end(date(2024, 2, 1)), date(2024, 2, 29));
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(day_count(date(2026, 8, 3), date(2026, 8, 9)), 7);
        assert_eq!(day_count(date(2026, 8, 3), date(2026, 8, 3)), 1);
    }
}
