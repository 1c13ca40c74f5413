use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::Caregiver;
use crate::error::AppResult;

const CAREGIVER_COLUMNS: &str = r#"
    id, patient_id, email, name, password_hash,
    is_admin, first_login, login_count,
    created_at, updated_at
"#;

pub struct CaregiverRepository;

impl CaregiverRepository {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Caregiver>> {
        let caregiver = sqlx::query_as::<_, Caregiver>(&format!(
            "SELECT {CAREGIVER_COLUMNS} FROM caregivers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(caregiver)
    }

    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> AppResult<Option<Caregiver>> {
        let caregiver = sqlx::query_as::<_, Caregiver>(&format!(
            "SELECT {CAREGIVER_COLUMNS} FROM caregivers WHERE LOWER(email) = LOWER(?)"
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(caregiver)
    }

    pub async fn list_for_patient(
        pool: &SqlitePool,
        patient_id: &str,
    ) -> AppResult<Vec<Caregiver>> {
        let caregivers = sqlx::query_as::<_, Caregiver>(&format!(
            "SELECT {CAREGIVER_COLUMNS} FROM caregivers WHERE patient_id = ? ORDER BY created_at ASC"
        ))
        .bind(patient_id)
        .fetch_all(pool)
        .await?;

        Ok(caregivers)
    }

    /// Team-size check and the subsequent insert must share a transaction;
    /// callers pass the open connection for both.
    pub async fn count_for_patient(
        conn: &mut SqliteConnection,
        patient_id: &str,
    ) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM caregivers WHERE patient_id = ?")
                .bind(patient_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(count)
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        patient_id: &str,
        email: &str,
        name: &str,
        password_hash: Option<&str>,
        is_admin: bool,
    ) -> AppResult<Caregiver> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let caregiver = sqlx::query_as::<_, Caregiver>(&format!(
            r#"
            INSERT INTO caregivers (
                id, patient_id, email, name, password_hash,
                is_admin, first_login, login_count,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, TRUE, 0, ?, ?)
            RETURNING {CAREGIVER_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(patient_id)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(is_admin)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(caregiver)
    }

    /// Attach credentials to a pending invite row, turning it into a real
    /// member of the circle it was invited to.
    pub async fn claim_pending(
        conn: &mut SqliteConnection,
        id: &str,
        name: &str,
        password_hash: &str,
    ) -> AppResult<Caregiver> {
        let now = Utc::now().naive_utc();

        let caregiver = sqlx::query_as::<_, Caregiver>(&format!(
            r#"
            UPDATE caregivers
            SET name = ?, password_hash = ?, updated_at = ?
            WHERE id = ?
            RETURNING {CAREGIVER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(password_hash)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(caregiver)
    }

    pub async fn record_login(
        pool: &SqlitePool,
        id: &str,
        login_count: i64,
        first_login: bool,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE caregivers
            SET login_count = ?, first_login = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(login_count)
        .bind(first_login)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn update_name(pool: &SqlitePool, id: &str, name: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE caregivers
            SET name = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: &str, patient_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM caregivers WHERE id = ? AND patient_id = ?")
            .bind(id)
            .bind(patient_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
