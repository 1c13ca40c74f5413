use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    pub dosage: String,
    /// 0 means "as needed": the schedule evaluator never reports due/overdue.
    pub frequency_hours: i64,
    pub duration_days: i64,
    pub start_date: NaiveDateTime,
    pub is_mandatory: bool,
    /// Manual sort order within the circle's medication list.
    pub position: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Append-only administration record. The most recent log per medication
/// drives the taken/overdue/next-due derivation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MedicationLog {
    pub id: String,
    pub medication_id: String,
    pub patient_id: String,
    pub caregiver_id: String,
    pub administered_at: NaiveDateTime,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}
