use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One growth measurement. All three metrics are optional; a record with
/// every metric null is rejected at the call site, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRecord {
    pub id: String,
    pub baby_id: String,
    pub date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub head_cm: Option<f64>,
    pub created_at: DateTime<Utc>,
}
