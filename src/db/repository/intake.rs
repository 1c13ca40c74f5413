use chrono::{NaiveDateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::IntakeLog;
use crate::error::AppResult;

/// Water and juice entries share one row shape in two tables; the table name
/// is a compile-time constant per repository, never caller input.
async fn list_since(
    pool: &SqlitePool,
    table: &'static str,
    patient_id: &str,
    since: NaiveDateTime,
) -> AppResult<Vec<IntakeLog>> {
    let logs = sqlx::query_as::<_, IntakeLog>(&format!(
        r#"
        SELECT id, patient_id, caregiver_id, amount_oz, logged_at, created_at
        FROM {table}
        WHERE patient_id = ? AND logged_at >= ?
        ORDER BY logged_at DESC
        "#
    ))
    .bind(patient_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

async fn insert(
    pool: &SqlitePool,
    table: &'static str,
    patient_id: &str,
    caregiver_id: &str,
    amount_oz: i64,
) -> AppResult<IntakeLog> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    let log = sqlx::query_as::<_, IntakeLog>(&format!(
        r#"
        INSERT INTO {table} (id, patient_id, caregiver_id, amount_oz, logged_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, patient_id, caregiver_id, amount_oz, logged_at, created_at
        "#
    ))
    .bind(&id)
    .bind(patient_id)
    .bind(caregiver_id)
    .bind(amount_oz)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(log)
}

async fn delete(
    pool: &SqlitePool,
    table: &'static str,
    id: &str,
    patient_id: &str,
) -> AppResult<u64> {
    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE id = ? AND patient_id = ?"
    ))
    .bind(id)
    .bind(patient_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn delete_for_patient(
    conn: &mut SqliteConnection,
    table: &'static str,
    patient_id: &str,
) -> AppResult<()> {
    sqlx::query(&format!("DELETE FROM {table} WHERE patient_id = ?"))
        .bind(patient_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub struct HydrationLogRepository;

impl HydrationLogRepository {
    pub async fn list_since(
        pool: &SqlitePool,
        patient_id: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<IntakeLog>> {
        list_since(pool, "hydration_logs", patient_id, since).await
    }

    pub async fn insert(
        pool: &SqlitePool,
        patient_id: &str,
        caregiver_id: &str,
        amount_oz: i64,
    ) -> AppResult<IntakeLog> {
        insert(pool, "hydration_logs", patient_id, caregiver_id, amount_oz).await
    }

    pub async fn delete(pool: &SqlitePool, id: &str, patient_id: &str) -> AppResult<u64> {
        delete(pool, "hydration_logs", id, patient_id).await
    }

    pub async fn delete_for_patient(
        conn: &mut SqliteConnection,
        patient_id: &str,
    ) -> AppResult<()> {
        delete_for_patient(conn, "hydration_logs", patient_id).await
    }
}

pub struct JuiceLogRepository;

impl JuiceLogRepository {
    pub async fn list_since(
        pool: &SqlitePool,
        patient_id: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<IntakeLog>> {
        list_since(pool, "juice_logs", patient_id, since).await
    }

    pub async fn insert(
        pool: &SqlitePool,
        patient_id: &str,
        caregiver_id: &str,
        amount_oz: i64,
    ) -> AppResult<IntakeLog> {
        insert(pool, "juice_logs", patient_id, caregiver_id, amount_oz).await
    }

    pub async fn delete(pool: &SqlitePool, id: &str, patient_id: &str) -> AppResult<u64> {
        delete(pool, "juice_logs", id, patient_id).await
    }

    pub async fn delete_for_patient(
        conn: &mut SqliteConnection,
        patient_id: &str,
    ) -> AppResult<()> {
        delete_for_patient(conn, "juice_logs", patient_id).await
    }
}
