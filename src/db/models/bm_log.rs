use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BmLog {
    pub id: String,
    pub patient_id: String,
    pub caregiver_id: String,
    pub had_bm: bool,
    pub notes: Option<String>,
    pub logged_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}
