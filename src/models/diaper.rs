use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiaperType {
    Pee,
    Poop,
    Both,
}

impl DiaperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiaperType::Pee => "pee",
            DiaperType::Poop => "poop",
            DiaperType::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaperLog {
    pub id: String,
    pub baby_id: String,
    #[serde(rename = "type")]
    pub diaper_type: DiaperType,
    pub created_at: DateTime<Utc>,
}
