use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single fluid-intake entry (water or juice; the two live in separate
/// tables but share one row shape). Amounts are canonically fluid ounces.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct IntakeLog {
    pub id: String,
    pub patient_id: String,
    pub caregiver_id: String,
    pub amount_oz: i64,
    pub logged_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}
