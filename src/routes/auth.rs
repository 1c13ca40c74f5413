use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::Caregiver;
use crate::db::repository::{CaregiverRepository, PatientRepository, TeamSettingsRepository};
use crate::error::{AppError, AppResult};
use crate::services::auth::{caregiver_from_token, create_jwt, hash_password, verify_password};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me).put(update_me))
        .route("/logout", post(logout))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Required when sign-up starts a brand new circle; ignored when the
    /// email matches a pending invite.
    pub patient_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub caregiver: Caregiver,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new caregiver.
///
/// An email matching a pending invite claims that invite and joins the
/// inviting circle. Any other email starts a brand new circle: a patient
/// row, the caregiver as its admin, and default team settings, all in one
/// transaction.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = request.email.trim().to_string();
    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let password_hash = hash_password(&request.password)?;

    let mut tx = state.db.begin().await?;

    let caregiver = match CaregiverRepository::find_by_email(&mut tx, &email).await? {
        Some(existing) if existing.is_pending() => {
            CaregiverRepository::claim_pending(&mut tx, &existing.id, &name, &password_hash).await?
        }
        Some(_) => {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        None => {
            let patient_name = request
                .patient_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    AppError::Validation(
                        "A patient name is required to start a new circle".to_string(),
                    )
                })?;

            let patient = PatientRepository::insert(&mut tx, patient_name).await?;
            let caregiver = CaregiverRepository::insert(
                &mut tx,
                &patient.id,
                &email,
                &name,
                Some(&password_hash),
                true,
            )
            .await?;
            TeamSettingsRepository::insert(
                &mut tx,
                &patient.id,
                state.config.care.default_hydration_goal_oz,
                state.config.care.default_juice_goal_oz,
            )
            .await?;
            caregiver
        }
    };

    tx.commit().await?;

    tracing::info!(
        "Caregiver {} signed up for circle {}",
        caregiver.id,
        caregiver.patient_id
    );

    let token = create_jwt(&caregiver.id, &state.config.jwt)?;
    Ok(Json(AuthResponse { token, caregiver }))
}

/// Authenticate with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let mut conn = state.db.acquire().await?;
    let caregiver = CaregiverRepository::find_by_email(&mut conn, request.email.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;
    drop(conn);

    // A pending invite has no credentials yet; the caller must sign up first.
    let hash = caregiver.password_hash.as_deref().ok_or(AppError::Unauthorized)?;
    if !verify_password(&request.password, hash)? {
        return Err(AppError::Unauthorized);
    }

    // The response keeps the pre-login first_login flag so clients can show
    // first-run help exactly once.
    CaregiverRepository::record_login(&state.db, &caregiver.id, caregiver.login_count + 1, false)
        .await?;

    let token = create_jwt(&caregiver.id, &state.config.jwt)?;
    Ok(Json(AuthResponse { token, caregiver }))
}

/// Get the authenticated caregiver's profile.
async fn me(AuthUser(caregiver): AuthUser) -> AppResult<Json<Caregiver>> {
    Ok(Json(caregiver))
}

/// Update the authenticated caregiver's display name.
async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(caregiver): AuthUser,
    Json(request): Json<UpdateMeRequest>,
) -> AppResult<Json<Caregiver>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    CaregiverRepository::update_name(&state.db, &caregiver.id, name).await?;

    let updated = CaregiverRepository::find_by_id(&state.db, &caregiver.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Caregiver not found".to_string()))?;

    Ok(Json(updated))
}

/// Logout.
///
/// Auth is a stateless JWT so there is no server-side session to clear, but
/// the endpoint gives clients a stable call and a place to grow server-side
/// invalidation later.
async fn logout(State(_state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

// ============================================================================
// Auth Middleware / Extractor
// ============================================================================

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Extractor for the authenticated caregiver.
pub struct AuthUser(pub Caregiver);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
            tracing::debug!("Authorization header doesn't start with 'Bearer '");
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let caregiver = caregiver_from_token(&state.db, token, &state.config.jwt).await?;

        tracing::debug!("Authenticated caregiver: {}", caregiver.id);
        Ok(AuthUser(caregiver))
    }
}
