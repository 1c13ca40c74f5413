use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub patient_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: NaiveDateTime,
}
