//! Current health status endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use migru_common::{HealthStatus, OnboardingStatus, RiskLevel};

use crate::auth::CurrentUser;
use crate::db::{logs, users};
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: HealthStatus,
    pub hrv: i64,
    pub risk_level: RiskLevel,
    pub logs_count: i64,
    pub onboarding_status: OnboardingStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub status: &'static str,
    pub new_status: HealthStatus,
}

pub async fn current_status(pool: &SqlitePool, user: &User) -> ApiResult<StatusResponse> {
    let logs_count = logs::count_logs(pool, user.id).await?;
    Ok(StatusResponse {
        status: user.current_status,
        hrv: user.current_hrv,
        risk_level: user.current_risk_level,
        logs_count,
        onboarding_status: user.onboarding_status,
    })
}

/// GET /api/status
pub async fn get_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<StatusResponse>> {
    Ok(Json(current_status(&state.db, &user).await?))
}

pub async fn apply_status_update(
    pool: &SqlitePool,
    user: &User,
    status: &str,
) -> ApiResult<UpdateStatusResponse> {
    let new_status: HealthStatus = status
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid status: {}", status)))?;

    users::update_status(pool, user.id, new_status, None).await?;

    Ok(UpdateStatusResponse {
        status: "success",
        new_status,
    })
}

/// PUT /api/status
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<UpdateStatusResponse>> {
    Ok(Json(
        apply_status_update(&state.db, &user, &request.status).await?,
    ))
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/status", get(get_status).put(update_status))
}
