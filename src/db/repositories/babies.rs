use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{format_date, format_datetime, parse_datetime, parse_optional_date, parse_sex},
    Database,
};
use crate::models::{Baby, Sex};

fn row_to_baby(row: &Row) -> Result<Baby> {
    let birth_date: Option<String> = row.get("birth_date")?;
    let sex: Option<String> = row.get("sex")?;
    let created_at: String = row.get("created_at")?;

    Ok(Baby {
        id: row.get("id")?,
        name: row.get("name")?,
        birth_date: parse_optional_date(birth_date, "birth_date")?,
        sex: sex.as_deref().map(parse_sex).transpose()?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_baby(
        &self,
        id: &str,
        name: &str,
        birth_date: Option<NaiveDate>,
        sex: Option<Sex>,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = id.to_string();
        let name = name.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO babies (id, name, birth_date, sex, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    name,
                    birth_date.map(format_date),
                    sex.map(|s| s.as_str()),
                    format_datetime(created_at),
                ],
            )
            .with_context(|| "failed to insert baby")?;
            Ok(())
        })
        .await
    }

    pub async fn all_babies(&self) -> Result<Vec<Baby>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, birth_date, sex, created_at
                 FROM babies
                 ORDER BY created_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut babies = Vec::new();
            while let Some(row) = rows.next()? {
                babies.push(row_to_baby(row)?);
            }
            Ok(babies)
        })
        .await
    }

    pub async fn get_baby(&self, id: &str) -> Result<Option<Baby>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, birth_date, sex, created_at
                 FROM babies
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![id])?;
            let baby = match rows.next()? {
                Some(row) => Some(row_to_baby(row)?),
                None => None,
            };
            Ok(baby)
        })
        .await
    }

    pub async fn update_baby(
        &self,
        id: &str,
        name: &str,
        birth_date: Option<NaiveDate>,
        sex: Option<Sex>,
    ) -> Result<()> {
        let id = id.to_string();
        let name = name.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE babies SET name = ?1, birth_date = ?2, sex = ?3 WHERE id = ?4",
                    params![
                        name,
                        birth_date.map(format_date),
                        sex.map(|s| s.as_str()),
                        id,
                    ],
                )
                .with_context(|| "failed to update baby")?;

            if rows_affected == 0 {
                return Err(anyhow!("baby {id} not found"));
            }

            Ok(())
        })
        .await
    }

    /// Sessions, diaper logs and growth records cascade via foreign keys.
    pub async fn delete_baby(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM babies WHERE id = ?1", params![id])
                .with_context(|| "failed to delete baby")?;
            Ok(())
        })
        .await
    }
}
