use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{Caregiver, TeamSettings};
use crate::db::repository::{
    BmLogRepository, CaregiverRepository, HydrationLogRepository, JuiceLogRepository,
    MedicationLogRepository, MedicationRepository, MessageRepository, TeamSettingsRepository,
};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::feed::{ChangeOp, ChangeTable};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_team))
        .route("/invite", post(invite))
        .route("/members/:id", delete(remove_member))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/reset", post(reset_circle))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TeamMemberResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    /// Invited but not signed up yet.
    pub pending: bool,
}

impl From<Caregiver> for TeamMemberResponse {
    fn from(caregiver: Caregiver) -> Self {
        let pending = caregiver.is_pending();
        TeamMemberResponse {
            id: caregiver.id,
            email: caregiver.email,
            name: caregiver.name,
            is_admin: caregiver.is_admin,
            pending,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub hydration_goal_oz: i64,
    pub juice_goal_oz: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// List every caregiver in the circle, pending invites included.
async fn list_team(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<Vec<TeamMemberResponse>>> {
    let members = CaregiverRepository::list_for_patient(&state.db, &caregiver.patient_id).await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// Invite a caregiver into the circle by email.
///
/// The size check and the insert share one transaction so two concurrent
/// invites cannot push the circle past its cap.
async fn invite(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<InviteRequest>,
) -> AppResult<Json<TeamMemberResponse>> {
    if !caregiver.is_admin {
        return Err(AppError::Forbidden);
    }

    let email = request.email.trim().to_string();
    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    let name = request.name.as_deref().unwrap_or("").trim().to_string();

    let mut tx = state.db.begin().await?;

    if CaregiverRepository::find_by_email(&mut tx, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "This email already belongs to a caregiver".to_string(),
        ));
    }

    let count = CaregiverRepository::count_for_patient(&mut tx, &caregiver.patient_id).await?;
    if count >= state.config.care.max_caregivers {
        return Err(AppError::Conflict(format!(
            "Care team is full ({} caregivers max)",
            state.config.care.max_caregivers
        )));
    }

    let invited = CaregiverRepository::insert(
        &mut tx,
        &caregiver.patient_id,
        &email,
        &name,
        None,
        false,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Caregiver {} invited {} to circle {}",
        caregiver.id,
        invited.id,
        caregiver.patient_id
    );
    state
        .feed
        .publish(ChangeTable::Caregivers, ChangeOp::Insert, &caregiver.patient_id);

    Ok(Json(invited.into()))
}

/// Remove a caregiver from the circle. Admin only; the admin row itself
/// cannot be removed.
async fn remove_member(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Path(member_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !caregiver.is_admin {
        return Err(AppError::Forbidden);
    }

    let member = CaregiverRepository::find_by_id(&state.db, &member_id)
        .await?
        .filter(|m| m.patient_id == caregiver.patient_id)
        .ok_or_else(|| AppError::NotFound("Caregiver not found".to_string()))?;

    if member.is_admin {
        return Err(AppError::BadRequest(
            "The circle admin cannot be removed".to_string(),
        ));
    }

    CaregiverRepository::delete(&state.db, &member.id, &caregiver.patient_id).await?;

    state
        .feed
        .publish(ChangeTable::Caregivers, ChangeOp::Delete, &caregiver.patient_id);

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Get the circle's daily goals.
async fn get_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<TeamSettings>> {
    let settings = TeamSettingsRepository::find_for_patient(&state.db, &caregiver.patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team settings not found".to_string()))?;
    Ok(Json(settings))
}

/// Update the circle's daily goals.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> AppResult<Json<TeamSettings>> {
    if !(1..=256).contains(&request.hydration_goal_oz) {
        return Err(AppError::Validation(
            "Hydration goal must be between 1 and 256 ounces".to_string(),
        ));
    }
    if !(0..=128).contains(&request.juice_goal_oz) {
        return Err(AppError::Validation(
            "Juice goal must be between 0 and 128 ounces".to_string(),
        ));
    }

    let settings = TeamSettingsRepository::upsert(
        &state.db,
        &caregiver.patient_id,
        request.hydration_goal_oz,
        request.juice_goal_oz,
    )
    .await?;

    state
        .feed
        .publish(ChangeTable::TeamSettings, ChangeOp::Update, &caregiver.patient_id);

    Ok(Json(settings))
}

/// Wipe the circle's tracking history. Membership and settings survive;
/// medications and every log and message go.
async fn reset_circle(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    if !caregiver.is_admin {
        return Err(AppError::Forbidden);
    }

    let patient_id = caregiver.patient_id.clone();
    let mut tx = state.db.begin().await?;
    MedicationLogRepository::delete_for_patient(&mut tx, &patient_id).await?;
    MedicationRepository::delete_for_patient(&mut tx, &patient_id).await?;
    HydrationLogRepository::delete_for_patient(&mut tx, &patient_id).await?;
    JuiceLogRepository::delete_for_patient(&mut tx, &patient_id).await?;
    BmLogRepository::delete_for_patient(&mut tx, &patient_id).await?;
    MessageRepository::delete_for_patient(&mut tx, &patient_id).await?;
    tx.commit().await?;

    tracing::info!("Circle {} reset by admin {}", patient_id, caregiver.id);
    state
        .feed
        .publish(ChangeTable::Medications, ChangeOp::Delete, &patient_id);

    Ok(Json(serde_json::json!({ "ok": true })))
}
