use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db::models::Patient;
use crate::error::AppResult;

pub struct PatientRepository;

impl PatientRepository {
    /// Insert a new circle anchor. Runs inside the sign-up transaction so the
    /// patient and its admin caregiver appear atomically.
    pub async fn insert(conn: &mut SqliteConnection, name: &str) -> AppResult<Patient> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(patient)
    }
}
