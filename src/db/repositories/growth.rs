use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{format_date, format_datetime, parse_date, parse_datetime},
    Database,
};
use crate::models::GrowthRecord;

fn row_to_growth_record(row: &Row) -> Result<GrowthRecord> {
    let date: String = row.get("date")?;
    let created_at: String = row.get("created_at")?;

    Ok(GrowthRecord {
        id: row.get("id")?,
        baby_id: row.get("baby_id")?,
        date: parse_date(&date, "date")?,
        weight_kg: row.get("weight_kg")?,
        height_cm: row.get("height_cm")?,
        head_cm: row.get("head_cm")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_growth_record(&self, record: &GrowthRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO growth_records (id, baby_id, date, weight_kg, height_cm, head_cm, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.baby_id,
                    format_date(record.date),
                    record.weight_kg,
                    record.height_cm,
                    record.head_cm,
                    format_datetime(record.created_at),
                ],
            )
            .with_context(|| "failed to insert growth record")?;
            Ok(())
        })
        .await
    }

    /// Newest first, so the head of the list is the latest measurement.
    pub async fn growth_records_for_baby(&self, baby_id: &str) -> Result<Vec<GrowthRecord>> {
        let baby_id = baby_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, baby_id, date, weight_kg, height_cm, head_cm, created_at
                 FROM growth_records
                 WHERE baby_id = ?1
                 ORDER BY date DESC, created_at DESC",
            )?;

            let mut rows = stmt.query(params![baby_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_growth_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn delete_growth_record(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM growth_records WHERE id = ?1", params![id])
                .with_context(|| "failed to delete growth record")?;
            Ok(())
        })
        .await
    }
}
