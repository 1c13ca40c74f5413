use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::TeamSettings;
use crate::error::AppResult;

const SETTINGS_COLUMNS: &str =
    "id, patient_id, hydration_goal_oz, juice_goal_oz, created_at, updated_at";

pub struct TeamSettingsRepository;

impl TeamSettingsRepository {
    pub async fn find_for_patient(
        pool: &SqlitePool,
        patient_id: &str,
    ) -> AppResult<Option<TeamSettings>> {
        let settings = sqlx::query_as::<_, TeamSettings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM team_settings WHERE patient_id = ?"
        ))
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

        Ok(settings)
    }

    /// Seed a circle's goals at sign-up, inside the same transaction that
    /// creates the patient row.
    pub async fn insert(
        conn: &mut SqliteConnection,
        patient_id: &str,
        hydration_goal_oz: i64,
        juice_goal_oz: i64,
    ) -> AppResult<TeamSettings> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let settings = sqlx::query_as::<_, TeamSettings>(&format!(
            r#"
            INSERT INTO team_settings (id, patient_id, hydration_goal_oz, juice_goal_oz, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {SETTINGS_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(patient_id)
        .bind(hydration_goal_oz)
        .bind(juice_goal_oz)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(settings)
    }

    pub async fn upsert(
        pool: &SqlitePool,
        patient_id: &str,
        hydration_goal_oz: i64,
        juice_goal_oz: i64,
    ) -> AppResult<TeamSettings> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let settings = sqlx::query_as::<_, TeamSettings>(&format!(
            r#"
            INSERT INTO team_settings (id, patient_id, hydration_goal_oz, juice_goal_oz, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(patient_id) DO UPDATE SET
                hydration_goal_oz = excluded.hydration_goal_oz,
                juice_goal_oz = excluded.juice_goal_oz,
                updated_at = excluded.updated_at
            RETURNING {SETTINGS_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(patient_id)
        .bind(hydration_goal_oz)
        .bind(juice_goal_oz)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(settings)
    }
}
