use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{format_date, format_datetime, parse_datetime, parse_diaper_type, to_u64},
    Database,
};
use crate::models::{DiaperAggregates, DiaperLog, DiaperType};

fn row_to_diaper_log(row: &Row) -> Result<DiaperLog> {
    let diaper_type: String = row.get("type")?;
    let created_at: String = row.get("created_at")?;

    Ok(DiaperLog {
        id: row.get("id")?,
        baby_id: row.get("baby_id")?,
        diaper_type: parse_diaper_type(&diaper_type)?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_diaper_log(
        &self,
        id: &str,
        baby_id: &str,
        diaper_type: DiaperType,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO diaper_logs (id, baby_id, type, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, baby_id, diaper_type.as_str(), format_datetime(created_at)],
            )
            .with_context(|| "failed to insert diaper log")?;
            Ok(())
        })
        .await
    }

    pub async fn delete_diaper_log(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM diaper_logs WHERE id = ?1", params![id])
                .with_context(|| "failed to delete diaper log")?;
            Ok(())
        })
        .await
    }

    pub async fn diaper_logs_for_date(
        &self,
        baby_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<DiaperLog>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, baby_id, type, created_at
                 FROM diaper_logs
                 WHERE baby_id = ?1 AND date(created_at, 'localtime') = ?2
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query(params![baby_id, format_date(date)])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_diaper_log(row)?);
            }
            Ok(logs)
        })
        .await
    }

    pub async fn diaper_logs_for_range(
        &self,
        baby_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DiaperLog>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, baby_id, type, created_at
                 FROM diaper_logs
                 WHERE baby_id = ?1
                   AND date(created_at, 'localtime') >= ?2
                   AND date(created_at, 'localtime') <= ?3
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query(params![
                baby_id,
                format_date(start_date),
                format_date(end_date)
            ])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_diaper_log(row)?);
            }
            Ok(logs)
        })
        .await
    }

    /// A `both` log counts toward pee and poop but only once toward total.
    pub async fn diaper_day_stats(
        &self,
        baby_id: &str,
        date: NaiveDate,
    ) -> Result<DiaperAggregates> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN type = 'pee' OR type = 'both' THEN 1 ELSE 0 END), 0) AS total_pee,
                   COALESCE(SUM(CASE WHEN type = 'poop' OR type = 'both' THEN 1 ELSE 0 END), 0) AS total_poop
                 FROM diaper_logs
                 WHERE baby_id = ?1 AND date(created_at, 'localtime') = ?2",
            )?;

            let (total, total_pee, total_poop): (i64, i64, i64) = stmt
                .query_row(params![baby_id, format_date(date)], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?;

            Ok(DiaperAggregates {
                total: to_u64(total, "total")?,
                total_pee: to_u64(total_pee, "total_pee")?,
                total_poop: to_u64(total_poop, "total_poop")?,
            })
        })
        .await
    }

    pub async fn diaper_range_stats(
        &self,
        baby_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<DiaperAggregates> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                   COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN type = 'pee' OR type = 'both' THEN 1 ELSE 0 END), 0) AS total_pee,
                   COALESCE(SUM(CASE WHEN type = 'poop' OR type = 'both' THEN 1 ELSE 0 END), 0) AS total_poop
                 FROM diaper_logs
                 WHERE baby_id = ?1
                   AND date(created_at, 'localtime') >= ?2
                   AND date(created_at, 'localtime') <= ?3",
            )?;

            let (total, total_pee, total_poop): (i64, i64, i64) = stmt
                .query_row(
                    params![baby_id, format_date(start_date), format_date(end_date)],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;

            Ok(DiaperAggregates {
                total: to_u64(total, "total")?,
                total_pee: to_u64(total_pee, "total_pee")?,
                total_poop: to_u64(total_poop, "total_poop")?,
            })
        })
        .await
    }
}
