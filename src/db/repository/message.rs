use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::models::Message;
use crate::error::AppResult;

const MESSAGE_COLUMNS: &str = "id, patient_id, sender_id, content, created_at";

pub struct MessageRepository;

impl MessageRepository {
    pub async fn list_recent(
        pool: &SqlitePool,
        patient_id: &str,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE patient_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#
        ))
        .bind(patient_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }

    pub async fn find_for_patient(
        pool: &SqlitePool,
        id: &str,
        patient_id: &str,
    ) -> AppResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ? AND patient_id = ?"
        ))
        .bind(id)
        .bind(patient_id)
        .fetch_optional(pool)
        .await?;

        Ok(message)
    }

    pub async fn insert(
        pool: &SqlitePool,
        patient_id: &str,
        sender_id: &str,
        content: &str,
    ) -> AppResult<Message> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (id, patient_id, sender_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(patient_id)
        .bind(sender_id)
        .bind(content)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(message)
    }

    pub async fn delete(pool: &SqlitePool, id: &str, patient_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND patient_id = ?")
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
        sqlx::query("DELETE FROM messages WHERE patient_id = ?")
            .bind(patient_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
