use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Caregiver, IntakeLog};
use crate::db::repository::{HydrationLogRepository, JuiceLogRepository, TeamSettingsRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::feed::{ChangeOp, ChangeTable};
use crate::services::status::{daily_total, progress_percent};
use crate::AppState;

/// Water and juice tracking share one handler set; the two routers differ
/// only in which table and daily goal they bind to.
#[derive(Debug, Clone, Copy)]
enum Tracker {
    Hydration,
    Juice,
}

impl Tracker {
    fn change_table(self) -> ChangeTable {
        match self {
            Tracker::Hydration => ChangeTable::HydrationLogs,
            Tracker::Juice => ChangeTable::JuiceLogs,
        }
    }
}

pub fn hydration_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(hydration_list).post(hydration_create))
        .route("/summary", get(hydration_summary))
        .route("/:id", axum::routing::delete(hydration_delete))
}

pub fn juice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(juice_list).post(juice_create))
        .route("/summary", get(juice_summary))
        .route("/:id", axum::routing::delete(juice_delete))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub amount_oz: i64,
}

#[derive(Debug, Serialize)]
pub struct IntakeSummaryResponse {
    pub total_oz: i64,
    pub goal_oz: i64,
    pub percent: f64,
}

fn start_of_today() -> NaiveDateTime {
    Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| Utc::now().naive_utc())
}

// ============================================================================
// Shared handler bodies
// ============================================================================

async fn list_today(
    state: &AppState,
    caregiver: &Caregiver,
    tracker: Tracker,
) -> AppResult<Vec<IntakeLog>> {
    let since = start_of_today();
    match tracker {
        Tracker::Hydration => {
            HydrationLogRepository::list_since(&state.db, &caregiver.patient_id, since).await
        }
        Tracker::Juice => {
            JuiceLogRepository::list_since(&state.db, &caregiver.patient_id, since).await
        }
    }
}

async fn create_log(
    state: &AppState,
    caregiver: &Caregiver,
    tracker: Tracker,
    request: IntakeRequest,
) -> AppResult<IntakeLog> {
    if !(1..=128).contains(&request.amount_oz) {
        return Err(AppError::Validation(
            "Amount must be between 1 and 128 ounces".to_string(),
        ));
    }

    let log = match tracker {
        Tracker::Hydration => {
            HydrationLogRepository::insert(
                &state.db,
                &caregiver.patient_id,
                &caregiver.id,
                request.amount_oz,
            )
            .await?
        }
        Tracker::Juice => {
            JuiceLogRepository::insert(
                &state.db,
                &caregiver.patient_id,
                &caregiver.id,
                request.amount_oz,
            )
            .await?
        }
    };

    state
        .feed
        .publish(tracker.change_table(), ChangeOp::Insert, &caregiver.patient_id);

    Ok(log)
}

async fn delete_log(
    state: &AppState,
    caregiver: &Caregiver,
    tracker: Tracker,
    id: &str,
) -> AppResult<()> {
    let deleted = match tracker {
        Tracker::Hydration => {
            HydrationLogRepository::delete(&state.db, id, &caregiver.patient_id).await?
        }
        Tracker::Juice => JuiceLogRepository::delete(&state.db, id, &caregiver.patient_id).await?,
    };
    if deleted == 0 {
        return Err(AppError::NotFound("Log entry not found".to_string()));
    }

    state
        .feed
        .publish(tracker.change_table(), ChangeOp::Delete, &caregiver.patient_id);

    Ok(())
}

async fn summarize(
    state: &AppState,
    caregiver: &Caregiver,
    tracker: Tracker,
) -> AppResult<IntakeSummaryResponse> {
    let logs = list_today(state, caregiver, tracker).await?;
    let total_oz = daily_total(logs.iter().map(|log| log.amount_oz));

    let settings = TeamSettingsRepository::find_for_patient(&state.db, &caregiver.patient_id)
        .await?;
    let goal_oz = match tracker {
        Tracker::Hydration => settings
            .map(|s| s.hydration_goal_oz)
            .unwrap_or(state.config.care.default_hydration_goal_oz),
        Tracker::Juice => settings
            .map(|s| s.juice_goal_oz)
            .unwrap_or(state.config.care.default_juice_goal_oz),
    };

    Ok(IntakeSummaryResponse {
        total_oz,
        goal_oz,
        percent: progress_percent(total_oz, goal_oz),
    })
}

// ============================================================================
// Route-facing handlers
// ============================================================================

async fn hydration_list(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<Vec<IntakeLog>>> {
    Ok(Json(list_today(&state, &caregiver, Tracker::Hydration).await?))
}

async fn hydration_create(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<IntakeRequest>,
) -> AppResult<Json<IntakeLog>> {
    Ok(Json(
        create_log(&state, &caregiver, Tracker::Hydration, request).await?,
    ))
}

async fn hydration_delete(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    delete_log(&state, &caregiver, Tracker::Hydration, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn hydration_summary(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<IntakeSummaryResponse>> {
    Ok(Json(summarize(&state, &caregiver, Tracker::Hydration).await?))
}

async fn juice_list(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<Vec<IntakeLog>>> {
    Ok(Json(list_today(&state, &caregiver, Tracker::Juice).await?))
}

async fn juice_create(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<IntakeRequest>,
) -> AppResult<Json<IntakeLog>> {
    Ok(Json(
        create_log(&state, &caregiver, Tracker::Juice, request).await?,
    ))
}

async fn juice_delete(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    delete_log(&state, &caregiver, Tracker::Juice, &id).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn juice_summary(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<IntakeSummaryResponse>> {
    Ok(Json(summarize(&state, &caregiver, Tracker::Juice).await?))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{body_json, request, setup_state, signup_admin};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn hydration_summary_tracks_default_goal() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        for amount in [8, 16, 32] {
            let response = request(
                &app,
                "POST",
                "/api/hydration",
                Some(&token),
                Some(serde_json::json!({ "amount_oz": amount })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let summary = body_json(
            request(&app, "GET", "/api/hydration/summary", Some(&token), None).await,
        )
        .await;
        assert_eq!(summary["total_oz"], 56);
        assert_eq!(summary["goal_oz"], 128);
        assert_eq!(summary["percent"], 43.75);
    }

    #[tokio::test]
    async fn juice_goal_zero_reports_zero_percent() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let response = request(
            &app,
            "POST",
            "/api/juice",
            Some(&token),
            Some(serde_json::json!({ "amount_oz": 8 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let summary =
            body_json(request(&app, "GET", "/api/juice/summary", Some(&token), None).await).await;
        assert_eq!(summary["total_oz"], 8);
        assert_eq!(summary["goal_oz"], 0);
        assert_eq!(summary["percent"], 0.0);
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let response = request(
            &app,
            "POST",
            "/api/hydration",
            Some(&token),
            Some(serde_json::json!({ "amount_oz": 0 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn delete_removes_entry_from_today() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let created = body_json(
            request(
                &app,
                "POST",
                "/api/hydration",
                Some(&token),
                Some(serde_json::json!({ "amount_oz": 12 })),
            )
            .await,
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let deleted = request(
            &app,
            "DELETE",
            &format!("/api/hydration/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(deleted.status(), StatusCode::OK);

        let listed =
            body_json(request(&app, "GET", "/api/hydration", Some(&token), None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 0);
    }
}
