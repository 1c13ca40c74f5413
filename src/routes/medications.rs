use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{Medication, MedicationLog};
use crate::db::repository::{CaregiverRepository, MedicationLogRepository, MedicationRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::feed::{ChangeOp, ChangeTable};
use crate::services::status::{days_remaining, evaluate_dose, DoseStatus};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_medications).post(create_medication))
        .route("/reorder", put(reorder))
        .route("/status", get(status_board))
        .route("/logs", get(list_logs))
        .route("/:id", put(update_medication).delete(delete_medication))
        .route("/:id/doses", post(record_dose))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MedicationRequest {
    pub name: String,
    pub dosage: Option<String>,
    pub frequency_hours: i64,
    /// 0 means an open-ended course.
    pub duration_days: Option<i64>,
    pub start_date: Option<NaiveDateTime>,
    pub is_mandatory: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub medication_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordDoseRequest {
    /// Back-dates the dose when supplied; defaults to now.
    pub administered_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MedicationStatusResponse {
    #[serde(flatten)]
    pub medication: Medication,
    pub status: DoseStatus,
    pub days_remaining: Option<i64>,
    pub last_administered_at: Option<NaiveDateTime>,
    pub last_administered_by: Option<String>,
}

fn validate(request: &MedicationRequest) -> AppResult<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Medication name is required".to_string()));
    }
    if !(0..=168).contains(&request.frequency_hours) {
        return Err(AppError::Validation(
            "Frequency must be between 0 and 168 hours".to_string(),
        ));
    }
    if request.duration_days.unwrap_or(0) < 0 {
        return Err(AppError::Validation(
            "Duration cannot be negative".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// List the circle's medications in manual sort order.
async fn list_medications(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<Vec<Medication>>> {
    let medications =
        MedicationRepository::list_for_patient(&state.db, &caregiver.patient_id).await?;
    Ok(Json(medications))
}

async fn create_medication(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<MedicationRequest>,
) -> AppResult<Json<Medication>> {
    validate(&request)?;

    let medication = MedicationRepository::insert(
        &state.db,
        &caregiver.patient_id,
        request.name.trim(),
        request.dosage.as_deref().unwrap_or("").trim(),
        request.frequency_hours,
        request.duration_days.unwrap_or(0),
        request.start_date.unwrap_or_else(|| Utc::now().naive_utc()),
        request.is_mandatory.unwrap_or(false),
    )
    .await?;

    state
        .feed
        .publish(ChangeTable::Medications, ChangeOp::Insert, &caregiver.patient_id);

    Ok(Json(medication))
}

async fn update_medication(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<MedicationRequest>,
) -> AppResult<Json<Medication>> {
    validate(&request)?;

    let existing = MedicationRepository::find_for_patient(&state.db, &id, &caregiver.patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Medication not found".to_string()))?;

    let medication = MedicationRepository::update(
        &state.db,
        &id,
        &caregiver.patient_id,
        request.name.trim(),
        request.dosage.as_deref().unwrap_or("").trim(),
        request.frequency_hours,
        request.duration_days.unwrap_or(existing.duration_days),
        request.start_date.unwrap_or(existing.start_date),
        request.is_mandatory.unwrap_or(existing.is_mandatory),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Medication not found".to_string()))?;

    state
        .feed
        .publish(ChangeTable::Medications, ChangeOp::Update, &caregiver.patient_id);

    Ok(Json(medication))
}

async fn delete_medication(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = MedicationRepository::delete(&state.db, &id, &caregiver.patient_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Medication not found".to_string()));
    }

    state
        .feed
        .publish(ChangeTable::Medications, ChangeOp::Delete, &caregiver.patient_id);

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Replace the manual sort order with the given id sequence.
async fn reorder(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<ReorderRequest>,
) -> AppResult<Json<Vec<Medication>>> {
    let mut tx = state.db.begin().await?;
    MedicationRepository::set_positions(&mut tx, &caregiver.patient_id, &request.medication_ids)
        .await?;
    tx.commit().await?;

    state
        .feed
        .publish(ChangeTable::Medications, ChangeOp::Update, &caregiver.patient_id);

    let medications =
        MedicationRepository::list_for_patient(&state.db, &caregiver.patient_id).await?;
    Ok(Json(medications))
}

/// The dashboard view: every medication with its schedule state, course
/// countdown, and who gave the last dose.
async fn status_board(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<Vec<MedicationStatusResponse>>> {
    let now = Utc::now().naive_utc();
    let medications =
        MedicationRepository::list_for_patient(&state.db, &caregiver.patient_id).await?;
    let latest_logs =
        MedicationLogRepository::latest_per_medication(&state.db, &caregiver.patient_id).await?;
    let members = CaregiverRepository::list_for_patient(&state.db, &caregiver.patient_id).await?;

    let latest_by_medication: HashMap<String, MedicationLog> = latest_logs
        .into_iter()
        .map(|log| (log.medication_id.clone(), log))
        .collect();
    let names: HashMap<String, String> =
        members.into_iter().map(|m| (m.id, m.name)).collect();

    let board = medications
        .into_iter()
        .map(|medication| {
            let latest = latest_by_medication.get(&medication.id);
            let status = evaluate_dose(
                medication.frequency_hours,
                latest.map(|log| log.administered_at),
                now,
            );
            let remaining = days_remaining(medication.duration_days, medication.start_date, now);
            MedicationStatusResponse {
                status,
                days_remaining: remaining,
                last_administered_at: latest.map(|log| log.administered_at),
                last_administered_by: latest
                    .and_then(|log| names.get(&log.caregiver_id).cloned()),
                medication,
            }
        })
        .collect();

    Ok(Json(board))
}

/// Record an administration.
///
/// The double-record guard runs inside the insert transaction: a second
/// "taken now" while the schedule window is still open is rejected with a
/// conflict. Back-dated entries skip the guard since they are corrections.
async fn record_dose(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<RecordDoseRequest>,
) -> AppResult<Json<MedicationLog>> {
    let medication = MedicationRepository::find_for_patient(&state.db, &id, &caregiver.patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Medication not found".to_string()))?;

    let now = Utc::now().naive_utc();
    let mut tx = state.db.begin().await?;

    if request.administered_at.is_none() && medication.frequency_hours > 0 {
        if let Some(latest) = MedicationLogRepository::latest_for_medication(&mut tx, &id).await? {
            let window_end = latest.administered_at + Duration::hours(medication.frequency_hours);
            if now < window_end {
                return Err(AppError::Conflict(
                    "A dose was already recorded for this window".to_string(),
                ));
            }
        }
    }

    let log = MedicationLogRepository::insert(
        &mut tx,
        &id,
        &caregiver.patient_id,
        &caregiver.id,
        request.administered_at.unwrap_or(now),
        request.notes.as_deref(),
    )
    .await?;
    tx.commit().await?;

    tracing::debug!(
        "Dose recorded for medication {} by caregiver {}",
        id,
        caregiver.id
    );
    state.feed.publish(
        ChangeTable::MedicationLogs,
        ChangeOp::Insert,
        &caregiver.patient_id,
    );

    Ok(Json(log))
}

/// Recent administration history for the whole circle.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Query(query): Query<LogsQuery>,
) -> AppResult<Json<Vec<MedicationLog>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let logs =
        MedicationLogRepository::list_for_patient(&state.db, &caregiver.patient_id, limit).await?;
    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{body_json, request, setup_state, signup_admin};
    use axum::http::StatusCode;

    async fn create_med(
        app: &axum::Router,
        token: &str,
        name: &str,
        frequency_hours: i64,
    ) -> String {
        let response = request(
            app,
            "POST",
            "/api/medications",
            Some(token),
            Some(serde_json::json!({
                "name": name,
                "dosage": "10mg",
                "frequency_hours": frequency_hours
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn crud_and_ordering() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let first = create_med(&app, &token, "Lasix", 8).await;
        let second = create_med(&app, &token, "Potassium", 12).await;

        let listed =
            body_json(request(&app, "GET", "/api/medications", Some(&token), None).await).await;
        let names: Vec<&str> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Lasix", "Potassium"]);

        let reordered = request(
            &app,
            "PUT",
            "/api/medications/reorder",
            Some(&token),
            Some(serde_json::json!({ "medication_ids": [second, first] })),
        )
        .await;
        assert_eq!(reordered.status(), StatusCode::OK);
        let body = body_json(reordered).await;
        assert_eq!(body[0]["name"], "Potassium");
        assert_eq!(body[1]["name"], "Lasix");
    }

    #[tokio::test]
    async fn rejects_invalid_frequency() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;

        let response = request(
            &app,
            "POST",
            "/api/medications",
            Some(&token),
            Some(serde_json::json!({ "name": "Lasix", "frequency_hours": 300 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn status_moves_from_due_to_taken() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;
        let med_id = create_med(&app, &token, "Lasix", 8).await;

        let board = body_json(
            request(&app, "GET", "/api/medications/status", Some(&token), None).await,
        )
        .await;
        assert_eq!(board[0]["status"]["state"], "due");

        let dose = request(
            &app,
            "POST",
            &format!("/api/medications/{med_id}/doses"),
            Some(&token),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(dose.status(), StatusCode::OK);

        let board = body_json(
            request(&app, "GET", "/api/medications/status", Some(&token), None).await,
        )
        .await;
        assert_eq!(board[0]["status"]["state"], "taken");
        assert_eq!(board[0]["last_administered_by"], "Admin");
    }

    #[tokio::test]
    async fn double_record_in_window_conflicts() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;
        let med_id = create_med(&app, &token, "Lasix", 8).await;

        let first = request(
            &app,
            "POST",
            &format!("/api/medications/{med_id}/doses"),
            Some(&token),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = request(
            &app,
            "POST",
            &format!("/api/medications/{med_id}/doses"),
            Some(&token),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn back_dated_dose_skips_guard() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;
        let med_id = create_med(&app, &token, "Lasix", 8).await;

        let now = request(
            &app,
            "POST",
            &format!("/api/medications/{med_id}/doses"),
            Some(&token),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(now.status(), StatusCode::OK);

        let correction = request(
            &app,
            "POST",
            &format!("/api/medications/{med_id}/doses"),
            Some(&token),
            Some(serde_json::json!({
                "administered_at": "2026-03-01T08:00:00",
                "notes": "Missed entry from yesterday"
            })),
        )
        .await;
        assert_eq!(correction.status(), StatusCode::OK);

        let logs = body_json(
            request(&app, "GET", "/api/medications/logs", Some(&token), None).await,
        )
        .await;
        assert_eq!(logs.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn as_needed_medication_never_conflicts() {
        let state = setup_state().await;
        let app = crate::router(state.clone());
        let (token, _, _) = signup_admin(&app, "admin@example.com").await;
        let med_id = create_med(&app, &token, "Tylenol", 0).await;

        for _ in 0..2 {
            let response = request(
                &app,
                "POST",
                &format!("/api/medications/{med_id}/doses"),
                Some(&token),
                Some(serde_json::json!({})),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let board = body_json(
            request(&app, "GET", "/api/medications/status", Some(&token), None).await,
        )
        .await;
        assert_eq!(board[0]["status"]["state"], "as_needed");
    }
}
