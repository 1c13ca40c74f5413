use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-circle daily goals. One row per patient; created with defaults at
/// sign-up and upserted on update.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamSettings {
    pub id: String,
    pub patient_id: String,
    pub hydration_goal_oz: i64,
    pub juice_goal_oz: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
