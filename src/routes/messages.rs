use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::Message;
use crate::db::repository::MessageRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::feed::{ChangeOp, ChangeTable};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_messages).post(post_message))
        .route("/:id", axum::routing::delete(delete_message))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Newest messages first, capped at the configured history limit.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Message>>> {
    let limit = query
        .limit
        .unwrap_or(state.config.care.message_history_limit)
        .clamp(1, state.config.care.message_history_limit);
    let messages =
        MessageRepository::list_recent(&state.db, &caregiver.patient_id, limit).await?;
    Ok(Json(messages))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<PostMessageRequest>,
) -> AppResult<Json<Message>> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }
    if content.len() > 2000 {
        return Err(AppError::Validation(
            "Message is too long (2000 characters max)".to_string(),
        ));
    }

    let message =
        MessageRepository::insert(&state.db, &caregiver.patient_id, &caregiver.id, content)
            .await?;

    state
        .feed
        .publish(ChangeTable::Messages, ChangeOp::Insert, &caregiver.patient_id);

    Ok(Json(message))
}

/// Senders can delete their own messages; the admin can delete any.
async fn delete_message(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let message = MessageRepository::find_for_patient(&state.db, &id, &caregiver.patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    if message.sender_id != caregiver.id && !caregiver.is_admin {
        return Err(AppError::Forbidden);
    }

    MessageRepository::delete(&state.db, &id, &caregiver.patient_id).await?;

    state
        .feed
        .publish(ChangeTable::Messages, ChangeOp::Delete, &caregiver.patient_id);

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{body_json, join_member, request, setup_state, signup_admin};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn post_and_list_newest_first() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        for text in ["first", "second"] {
            let response = request(
                &app,
                "POST",
                "/api/messages",
                Some(&token),
                Some(serde_json::json!({ "content": text })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let listed =
            body_json(request(&app, "GET", "/api/messages", Some(&token), None).await).await;
        let contents: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents.len(), 2);
        assert!(contents.contains(&"first") && contents.contains(&"second"));
    }

    #[tokio::test]
    async fn empty_message_rejected() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let response = request(
            &app,
            "POST",
            "/api/messages",
            Some(&token),
            Some(serde_json::json!({ "content": "   " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn members_cannot_delete_others_messages() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (admin_token, _, _) = signup_admin(&app, "admin@example.com").await;
        let (member_token, _) = join_member(&app, &admin_token, "member@example.com").await;

        let posted = body_json(
            request(
                &app,
                "POST",
                "/api/messages",
                Some(&admin_token),
                Some(serde_json::json!({ "content": "admin note" })),
            )
            .await,
        )
        .await;
        let id = posted["id"].as_str().unwrap();

        let forbidden = request(
            &app,
            "DELETE",
            &format!("/api/messages/{id}"),
            Some(&member_token),
            None,
        )
        .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        // The admin can delete anything in the circle.
        let member_posted = body_json(
            request(
                &app,
                "POST",
                "/api/messages",
                Some(&member_token),
                Some(serde_json::json!({ "content": "member note" })),
            )
            .await,
        )
        .await;
        let member_msg_id = member_posted["id"].as_str().unwrap();

        let allowed = request(
            &app,
            "DELETE",
            &format!("/api/messages/{member_msg_id}"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}
