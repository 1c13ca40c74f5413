use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::BmLog;
use crate::db::repository::BmLogRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::feed::{ChangeOp, ChangeTable};
use crate::services::status::{bowel_status, BowelStatus};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_logs).post(create_log))
        .route("/status", get(status))
        .route("/:id", axum::routing::delete(delete_log))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BmLogRequest {
    pub had_bm: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BowelStatusResponse {
    pub status: BowelStatus,
    pub last_positive_at: Option<NaiveDateTime>,
    pub hours_since: Option<i64>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<BmLog>>> {
    let limit = query.limit.unwrap_or(30).clamp(1, 200);
    let logs = BmLogRepository::list_recent(&state.db, &caregiver.patient_id, limit).await?;
    Ok(Json(logs))
}

async fn create_log(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<BmLogRequest>,
) -> AppResult<Json<BmLog>> {
    let log = BmLogRepository::insert(
        &state.db,
        &caregiver.patient_id,
        &caregiver.id,
        request.had_bm,
        request.notes.as_deref(),
    )
    .await?;

    state
        .feed
        .publish(ChangeTable::BmLogs, ChangeOp::Insert, &caregiver.patient_id);

    Ok(Json(log))
}

async fn delete_log(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = BmLogRepository::delete(&state.db, &id, &caregiver.patient_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Log entry not found".to_string()));
    }

    state
        .feed
        .publish(ChangeTable::BmLogs, ChangeOp::Delete, &caregiver.patient_id);

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Traffic-light regularity status from hours since the last positive log.
async fn status(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<BowelStatusResponse>> {
    let now = Utc::now().naive_utc();
    let last_positive = BmLogRepository::last_positive(&state.db, &caregiver.patient_id).await?;
    let has_logs = BmLogRepository::count_for_patient(&state.db, &caregiver.patient_id).await? > 0;

    let last_positive_at = last_positive.map(|log| log.logged_at);
    let status = bowel_status(
        last_positive_at,
        has_logs,
        now,
        state.config.care.bm_caution_hours,
        state.config.care.bm_alert_hours,
    );

    Ok(Json(BowelStatusResponse {
        status,
        last_positive_at,
        hours_since: last_positive_at.map(|at| (now - at).num_hours()),
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{body_json, request, setup_state, signup_admin};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn status_starts_with_no_data() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let body = body_json(request(&app, "GET", "/api/bm/status", Some(&token), None).await).await;
        assert_eq!(body["status"], "no_data");
        assert!(body["last_positive_at"].is_null());
    }

    #[tokio::test]
    async fn positive_log_turns_status_regular() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let created = request(
            &app,
            "POST",
            "/api/bm",
            Some(&token),
            Some(serde_json::json!({ "had_bm": true, "notes": "normal" })),
        )
        .await;
        assert_eq!(created.status(), StatusCode::OK);

        let body = body_json(request(&app, "GET", "/api/bm/status", Some(&token), None).await).await;
        assert_eq!(body["status"], "regular");
        assert_eq!(body["hours_since"], 0);
    }

    #[tokio::test]
    async fn only_negative_logs_read_as_caution() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let created = request(
            &app,
            "POST",
            "/api/bm",
            Some(&token),
            Some(serde_json::json!({ "had_bm": false })),
        )
        .await;
        assert_eq!(created.status(), StatusCode::OK);

        let body = body_json(request(&app, "GET", "/api/bm/status", Some(&token), None).await).await;
        assert_eq!(body["status"], "caution");
    }
}
