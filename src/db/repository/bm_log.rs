use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::BmLog;
use crate::error::AppResult;

const BM_COLUMNS: &str = r#"
    id, patient_id, caregiver_id, had_bm, notes, logged_at, created_at
"#;

pub struct BmLogRepository;

impl BmLogRepository {
    pub async fn list_recent(
        pool: &SqlitePool,
        patient_id: &str,
        limit: i64,
    ) -> AppResult<Vec<BmLog>> {
        let logs = sqlx::query_as::<_, BmLog>(&format!(
            r#"
            SELECT {BM_COLUMNS}
            FROM bm_logs
            WHERE patient_id = ?
            ORDER BY logged_at DESC
            LIMIT ?
            "#
        ))
        .bind(patient_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    /// Most recent positive entry; the hours elapsed since it drive the
    /// traffic-light bowel status.
    pub async fn last_positive(pool: &SqlitePool, patient_id: &str) -> AppResult<Option<BmLog>> {
        let log = sqlx::query_as::<_, BmLog>(&format!(
            r#"
            SELECT {BM_COLUMNS}
            FROM bm_logs
            WHERE patient_id = ? AND had_bm
            ORDER BY logged_at DESC
            LIMIT 1
            "#
        ))
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

        Ok(log)
    }

    pub async fn count_for_patient(pool: &SqlitePool, patient_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bm_logs WHERE patient_id = ?")
            .bind(patient_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn insert(
        pool: &SqlitePool,
        patient_id: &str,
        caregiver_id: &str,
        had_bm: bool,
        notes: Option<&str>,
    ) -> AppResult<BmLog> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let log = sqlx::query_as::<_, BmLog>(&format!(
            r#"
            INSERT INTO bm_logs (id, patient_id, caregiver_id, had_bm, notes, logged_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {BM_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(patient_id)
        .bind(caregiver_id)
        .bind(had_bm)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    pub async fn delete(pool: &SqlitePool, id: &str, patient_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM bm_logs WHERE id = ? AND patient_id = ?")
            .bind(id)
            .bind(patient_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_for_patient(
        conn: &mut SqliteConnection,
        patient_id: &str,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM bm_logs WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
