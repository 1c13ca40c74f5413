use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Caregiver {
    pub id: String,
    pub patient_id: String,
    pub email: String,
    pub name: String,
    /// NULL for a pending invite that has not been claimed at sign-up yet.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_admin: bool,

    // Login bookkeeping, used by clients to show first-run help.
    pub first_login: bool,
    pub login_count: i64,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Caregiver {
    /// A caregiver row created by an invite but never claimed at sign-up.
    pub fn is_pending(&self) -> bool {
        self.password_hash.is_none()
    }
}
