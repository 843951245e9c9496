use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{
        format_date, format_datetime, opt_to_u64, parse_date, parse_datetime, parse_feeding_mode,
        parse_optional_datetime, to_i64, to_u64,
    },
    Database,
};
use crate::models::{BottleAggregates, DailyBreakdown, FeedingAggregates, FeedingMode, FeedingSession};

const SESSION_COLUMNS: &str = "id, baby_id, start_time, end_time, duration, feeding_mode, volume, \
     first_breast_duration, second_breast_duration, break_duration, phases, phase_state, \
     audio_note_path, note, created_at";

fn row_to_session(row: &Row) -> Result<FeedingSession> {
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;
    let created_at: String = row.get("created_at")?;
    let feeding_mode: String = row.get("feeding_mode")?;
    let duration: Option<i64> = row.get("duration")?;
    let volume: Option<i64> = row.get("volume")?;
    let first_breast_duration: Option<i64> = row.get("first_breast_duration")?;
    let second_breast_duration: Option<i64> = row.get("second_breast_duration")?;
    let break_duration: Option<i64> = row.get("break_duration")?;

    Ok(FeedingSession {
        id: row.get("id")?,
        baby_id: row.get("baby_id")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_optional_datetime(end_time, "end_time")?,
        duration: opt_to_u64(duration, "duration")?,
        feeding_mode: parse_feeding_mode(&feeding_mode)?,
        volume: opt_to_u64(volume, "volume")?,
        first_breast_duration: opt_to_u64(first_breast_duration, "first_breast_duration")?,
        second_breast_duration: opt_to_u64(second_breast_duration, "second_breast_duration")?,
        break_duration: opt_to_u64(break_duration, "break_duration")?,
        phases: row.get("phases")?,
        phase_state: row.get("phase_state")?,
        audio_note_path: row.get("audio_note_path")?,
        note: row.get("note")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_session(
        &self,
        id: &str,
        baby_id: &str,
        start_time: DateTime<Utc>,
        mode: FeedingMode,
    ) -> Result<()> {
        let id = id.to_string();
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO feeding_sessions (id, baby_id, start_time, feeding_mode, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    baby_id,
                    format_datetime(start_time),
                    mode.as_str(),
                    format_datetime(start_time),
                ],
            )
            .with_context(|| "failed to insert feeding session")?;
            Ok(())
        })
        .await
    }

    /// Close a session in one atomic UPDATE: end time, totals and the phase
    /// history land together, and the recovery snapshot is cleared.
    pub async fn finalize_session(
        &self,
        id: &str,
        end_time: DateTime<Utc>,
        duration: u64,
        first_breast_duration: u64,
        second_breast_duration: u64,
        break_duration: u64,
        phases_json: &str,
    ) -> Result<()> {
        let id = id.to_string();
        let phases_json = phases_json.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE feeding_sessions
                     SET end_time = ?1,
                         duration = ?2,
                         first_breast_duration = ?3,
                         second_breast_duration = ?4,
                         break_duration = ?5,
                         phases = ?6,
                         phase_state = NULL
                     WHERE id = ?7",
                    params![
                        format_datetime(end_time),
                        to_i64(duration)?,
                        to_i64(first_breast_duration)?,
                        to_i64(second_breast_duration)?,
                        to_i64(break_duration)?,
                        phases_json,
                        id,
                    ],
                )
                .with_context(|| "failed to finalize feeding session")?;

            if rows_affected == 0 {
                return Err(anyhow!("session {id} not found"));
            }

            Ok(())
        })
        .await
    }

    /// Overwrite the recovery snapshot for an open session. Called on every
    /// phase transition, so it stays a single-column UPDATE.
    pub async fn update_phase_snapshot(&self, id: &str, snapshot_json: &str) -> Result<()> {
        let id = id.to_string();
        let snapshot_json = snapshot_json.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE feeding_sessions SET phase_state = ?1 WHERE id = ?2",
                params![snapshot_json, id],
            )
            .with_context(|| "failed to update phase snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn attach_volume(&self, id: &str, volume_ml: u64) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE feeding_sessions SET volume = ?1 WHERE id = ?2",
                    params![to_i64(volume_ml)?, id],
                )
                .with_context(|| "failed to attach volume")?;

            if rows_affected == 0 {
                return Err(anyhow!("session {id} not found"));
            }

            Ok(())
        })
        .await
    }

    pub async fn attach_audio_note(&self, id: &str, path: &str) -> Result<()> {
        let id = id.to_string();
        let path = path.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE feeding_sessions SET audio_note_path = ?1 WHERE id = ?2",
                    params![path, id],
                )
                .with_context(|| "failed to attach audio note")?;

            if rows_affected == 0 {
                return Err(anyhow!("session {id} not found"));
            }

            Ok(())
        })
        .await
    }

    pub async fn attach_note(&self, id: &str, note: &str) -> Result<()> {
        let id = id.to_string();
        let note = note.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE feeding_sessions SET note = ?1 WHERE id = ?2",
                    params![note, id],
                )
                .with_context(|| "failed to attach note")?;

            if rows_affected == 0 {
                return Err(anyhow!("session {id} not found"));
            }

            Ok(())
        })
        .await
    }

    /// The single open session for a baby, if any.
    pub async fn get_open_session(&self, baby_id: &str) -> Result<Option<FeedingSession>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND end_time IS NULL
                 ORDER BY start_time DESC
                 LIMIT 1"
            ))?;

            let mut rows = stmt.query(params![baby_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Most recent finalized session, used for the next-breast suggestion.
    pub async fn get_last_closed_session(&self, baby_id: &str) -> Result<Option<FeedingSession>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND end_time IS NOT NULL
                 ORDER BY start_time DESC
                 LIMIT 1"
            ))?;

            let mut rows = stmt.query(params![baby_id])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    pub async fn sessions_for_date(
        &self,
        baby_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<FeedingSession>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND date(start_time, 'localtime') = ?2
                 ORDER BY start_time DESC"
            ))?;

            let mut rows = stmt.query(params![baby_id, format_date(date)])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    pub async fn sessions_for_range(
        &self,
        baby_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<FeedingSession>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM feeding_sessions
                 WHERE baby_id = ?1
                   AND date(start_time, 'localtime') >= ?2
                   AND date(start_time, 'localtime') <= ?3
                 ORDER BY start_time DESC"
            ))?;

            let mut rows = stmt.query(params![
                baby_id,
                format_date(start_date),
                format_date(end_date)
            ])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Distinct local dates with at least one session in the given month,
    /// for calendar dot markers.
    pub async fn marked_dates(
        &self,
        baby_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<NaiveDate>> {
        let baby_id = baby_id.to_string();
        let year_month = format!("{year:04}-{month:02}");
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT date(start_time, 'localtime') AS day
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND strftime('%Y-%m', start_time, 'localtime') = ?2",
            )?;

            let mut rows = stmt.query(params![baby_id, year_month])?;
            let mut dates = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row.get("day")?;
                dates.push(parse_date(&raw, "day")?);
            }
            Ok(dates)
        })
        .await
    }

    /// Local date of the earliest finalized session; anchors the historical
    /// rollups.
    pub async fn first_session_date(&self, baby_id: &str) -> Result<Option<NaiveDate>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date(start_time, 'localtime') AS first_date
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND end_time IS NOT NULL
                 ORDER BY start_time ASC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query(params![baby_id])?;
            let date = match rows.next()? {
                Some(row) => {
                    let raw: String = row.get("first_date")?;
                    Some(parse_date(&raw, "first_date")?)
                }
                None => None,
            };
            Ok(date)
        })
        .await
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM feeding_sessions WHERE id = ?1", params![id])
                .with_context(|| "failed to delete feeding session")?;
            Ok(())
        })
        .await
    }

    pub async fn day_stats(&self, baby_id: &str, date: NaiveDate) -> Result<FeedingAggregates> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   COUNT(*) AS total_feedings,
                   COALESCE(SUM(duration), 0) AS total_duration,
                   COALESCE(AVG(duration), 0) AS avg_duration,
                   COALESCE(MAX(duration), 0) AS longest_session,
                   COALESCE(MIN(duration), 0) AS shortest_session
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND date(start_time, 'localtime') = ?2 AND end_time IS NOT NULL",
            )?;

            let (count, total, avg, longest, shortest): (i64, i64, f64, i64, i64) = stmt
                .query_row(params![baby_id, format_date(date)], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?;

            Ok(FeedingAggregates {
                total_feedings: to_u64(count, "total_feedings")?,
                total_duration: to_u64(total, "total_duration")?,
                avg_duration: avg,
                longest_session: to_u64(longest, "longest_session")?,
                shortest_session: to_u64(shortest, "shortest_session")?,
            })
        })
        .await
    }

    pub async fn range_stats(
        &self,
        baby_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FeedingAggregates> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   COUNT(*) AS total_feedings,
                   COALESCE(SUM(duration), 0) AS total_duration,
                   COALESCE(AVG(duration), 0) AS avg_duration,
                   COALESCE(MAX(duration), 0) AS longest_session,
                   COALESCE(MIN(duration), 0) AS shortest_session
                 FROM feeding_sessions
                 WHERE baby_id = ?1
                   AND date(start_time, 'localtime') >= ?2
                   AND date(start_time, 'localtime') <= ?3
                   AND end_time IS NOT NULL",
            )?;

            let (count, total, avg, longest, shortest): (i64, i64, f64, i64, i64) = stmt
                .query_row(
                    params![baby_id, format_date(start_date), format_date(end_date)],
                    |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    },
                )?;

            Ok(FeedingAggregates {
                total_feedings: to_u64(count, "total_feedings")?,
                total_duration: to_u64(total, "total_duration")?,
                avg_duration: avg,
                longest_session: to_u64(longest, "longest_session")?,
                shortest_session: to_u64(shortest, "shortest_session")?,
            })
        })
        .await
    }

    /// Per-local-date aggregates over a range; dates without sessions are
    /// simply absent from the result.
    pub async fn daily_stats_for_range(
        &self,
        baby_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBreakdown>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   date(start_time, 'localtime') AS day,
                   COUNT(*) AS total_feedings,
                   COALESCE(SUM(duration), 0) AS total_duration,
                   COALESCE(AVG(duration), 0) AS avg_duration
                 FROM feeding_sessions
                 WHERE baby_id = ?1
                   AND date(start_time, 'localtime') >= ?2
                   AND date(start_time, 'localtime') <= ?3
                   AND end_time IS NOT NULL
                 GROUP BY date(start_time, 'localtime')
                 ORDER BY date(start_time, 'localtime') DESC",
            )?;

            let mut rows = stmt.query(params![
                baby_id,
                format_date(start_date),
                format_date(end_date)
            ])?;
            let mut days = Vec::new();
            while let Some(row) = rows.next()? {
                let raw_date: String = row.get("day")?;
                let count: i64 = row.get("total_feedings")?;
                let total: i64 = row.get("total_duration")?;
                days.push(DailyBreakdown {
                    date: parse_date(&raw_date, "day")?,
                    total_feedings: to_u64(count, "total_feedings")?,
                    total_duration: to_u64(total, "total_duration")?,
                    avg_duration: row.get("avg_duration")?,
                });
            }
            Ok(days)
        })
        .await
    }

    pub async fn bottle_day_stats(
        &self,
        baby_id: &str,
        date: NaiveDate,
    ) -> Result<BottleAggregates> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   COALESCE(SUM(CASE WHEN feeding_mode = 'bottle' THEN 1 ELSE 0 END), 0) AS bottle_count,
                   COALESCE(SUM(CASE WHEN feeding_mode = 'breast' THEN 1 ELSE 0 END), 0) AS breast_count,
                   COALESCE(SUM(CASE WHEN feeding_mode = 'bottle' THEN volume ELSE 0 END), 0) AS total_volume,
                   COALESCE(AVG(CASE WHEN feeding_mode = 'bottle' AND volume IS NOT NULL THEN volume END), 0) AS avg_volume
                 FROM feeding_sessions
                 WHERE baby_id = ?1 AND date(start_time, 'localtime') = ?2 AND end_time IS NOT NULL",
            )?;

            let (bottle, breast, total_volume, avg_volume): (i64, i64, i64, f64) = stmt
                .query_row(params![baby_id, format_date(date)], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?;

            Ok(BottleAggregates {
                bottle_count: to_u64(bottle, "bottle_count")?,
                breast_count: to_u64(breast, "breast_count")?,
                total_volume: to_u64(total_volume, "total_volume")?,
                avg_volume,
            })
        })
        .await
    }

    pub async fn bottle_range_stats(
        &self,
        baby_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BottleAggregates> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   COALESCE(SUM(CASE WHEN feeding_mode = 'bottle' THEN 1 ELSE 0 END), 0) AS bottle_count,
                   COALESCE(SUM(CASE WHEN feeding_mode = 'breast' THEN 1 ELSE 0 END), 0) AS breast_count,
                   COALESCE(SUM(CASE WHEN feeding_mode = 'bottle' THEN volume ELSE 0 END), 0) AS total_volume,
                   COALESCE(AVG(CASE WHEN feeding_mode = 'bottle' AND volume IS NOT NULL THEN volume END), 0) AS avg_volume
                 FROM feeding_sessions
                 WHERE baby_id = ?1
                   AND date(start_time, 'localtime') >= ?2
                   AND date(start_time, 'localtime') <= ?3
                   AND end_time IS NOT NULL",
            )?;

            let (bottle, breast, total_volume, avg_volume): (i64, i64, i64, f64) = stmt
                .query_row(
                    params![baby_id, format_date(start_date), format_date(end_date)],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?;

            Ok(BottleAggregates {
                bottle_count: to_u64(bottle, "bottle_count")?,
                breast_count: to_u64(breast, "breast_count")?,
                total_volume: to_u64(total_volume, "total_volume")?,
                avg_volume,
            })
        })
        .await
    }
}
