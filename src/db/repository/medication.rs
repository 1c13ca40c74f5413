use chrono::{NaiveDateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::{Medication, MedicationLog};
use crate::error::AppResult;

const MEDICATION_COLUMNS: &str = r#"
    id, patient_id, name, dosage, frequency_hours, duration_days,
    start_date, is_mandatory, position, created_at, updated_at
"#;

const LOG_COLUMNS: &str = r#"
    id, medication_id, patient_id, caregiver_id,
    administered_at, notes, created_at
"#;

pub struct MedicationRepository;

impl MedicationRepository {
    pub async fn list_for_patient(
        pool: &SqlitePool,
        patient_id: &str,
    ) -> AppResult<Vec<Medication>> {
        let medications = sqlx::query_as::<_, Medication>(&format!(
            r#"
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE patient_id = ?
            ORDER BY position ASC, created_at ASC
            "#
        ))
        .bind(patient_id)
        .fetch_all(pool)
        .await?;

        Ok(medications)
    }

    pub async fn find_for_patient(
        pool: &SqlitePool,
        id: &str,
        patient_id: &str,
    ) -> AppResult<Option<Medication>> {
        let medication = sqlx::query_as::<_, Medication>(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ? AND patient_id = ?"
        ))
        .bind(id)
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

        Ok(medication)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &SqlitePool,
        patient_id: &str,
        name: &str,
        dosage: &str,
        frequency_hours: i64,
        duration_days: i64,
        start_date: NaiveDateTime,
        is_mandatory: bool,
    ) -> AppResult<Medication> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        // New medications land at the end of the manual sort order.
        let next_position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM medications WHERE patient_id = ?",
        )
        .bind(patient_id)
        .fetch_one(pool)
        .await?;

        let medication = sqlx::query_as::<_, Medication>(&format!(
            r#"
            INSERT INTO medications (
                id, patient_id, name, dosage, frequency_hours, duration_days,
                start_date, is_mandatory, position, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(patient_id)
        .bind(name)
        .bind(dosage)
        .bind(frequency_hours)
        .bind(duration_days)
        .bind(start_date)
        .bind(is_mandatory)
        .bind(next_position)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(medication)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        patient_id: &str,
        name: &str,
        dosage: &str,
        frequency_hours: i64,
        duration_days: i64,
        start_date: NaiveDateTime,
        is_mandatory: bool,
    ) -> AppResult<Option<Medication>> {
        let now = Utc::now().naive_utc();

        let medication = sqlx::query_as::<_, Medication>(&format!(
            r#"
            UPDATE medications
            SET name = ?, dosage = ?, frequency_hours = ?, duration_days = ?,
                start_date = ?, is_mandatory = ?, updated_at = ?
            WHERE id = ? AND patient_id = ?
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(dosage)
        .bind(frequency_hours)
        .bind(duration_days)
        .bind(start_date)
        .bind(is_mandatory)
        .bind(now)
        .bind(id)
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

        Ok(medication)
    }

    pub async fn delete(pool: &SqlitePool, id: &str, patient_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM medications WHERE id = ? AND patient_id = ?")
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
        sqlx::query("DELETE FROM medications WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Apply a full manual reorder: each medication's position becomes its
    /// index in `ordered_ids`. Ids outside the circle are ignored by the
    /// patient_id guard.
    pub async fn set_positions(
        conn: &mut SqliteConnection,
        patient_id: &str,
        ordered_ids: &[String],
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        for (index, id) in ordered_ids.iter().enumerate() {
            sqlx::query(
                r#"
                UPDATE medications
                SET position = ?, updated_at = ?
                WHERE id = ? AND patient_id = ?
                "#,
            )
            .bind(index as i64)
            .bind(now)
            .bind(id)
            .bind(patient_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

pub struct MedicationLogRepository;

impl MedicationLogRepository {
    pub async fn latest_for_medication(
        conn: &mut SqliteConnection,
        medication_id: &str,
    ) -> AppResult<Option<MedicationLog>> {
        let log = sqlx::query_as::<_, MedicationLog>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM medication_logs
            WHERE medication_id = ?
            ORDER BY administered_at DESC
            LIMIT 1
            "#
        ))
        .bind(medication_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(log)
    }

    /// Most recent log per medication for a circle, used by the status view.
    pub async fn latest_per_medication(
        pool: &SqlitePool,
        patient_id: &str,
    ) -> AppResult<Vec<MedicationLog>> {
        let logs = sqlx::query_as::<_, MedicationLog>(
            r#"
            SELECT ml.id, ml.medication_id, ml.patient_id, ml.caregiver_id,
                   ml.administered_at, ml.notes, ml.created_at
            FROM medication_logs ml
            JOIN (
                SELECT medication_id, MAX(administered_at) AS latest_at
                FROM medication_logs
                WHERE patient_id = ?
                GROUP BY medication_id
            ) latest
              ON ml.medication_id = latest.medication_id
             AND ml.administered_at = latest.latest_at
            "#,
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    pub async fn list_for_patient(
        pool: &SqlitePool,
        patient_id: &str,
        limit: i64,
    ) -> AppResult<Vec<MedicationLog>> {
        let logs = sqlx::query_as::<_, MedicationLog>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM medication_logs
            WHERE patient_id = ?
            ORDER BY administered_at DESC
            LIMIT ?
            "#
        ))
        .bind(patient_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        medication_id: &str,
        patient_id: &str,
        caregiver_id: &str,
        administered_at: NaiveDateTime,
        notes: Option<&str>,
    ) -> AppResult<MedicationLog> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let log = sqlx::query_as::<_, MedicationLog>(&format!(
            r#"
            INSERT INTO medication_logs (
                id, medication_id, patient_id, caregiver_id,
                administered_at, notes, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(medication_id)
        .bind(patient_id)
        .bind(caregiver_id)
        .bind(administered_at)
        .bind(notes)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(log)
    }

    pub async fn delete_for_patient(
        conn: &mut SqliteConnection,
        patient_id: &str,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM medication_logs WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
