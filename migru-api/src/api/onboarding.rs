//! Onboarding progress endpoints

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use migru_common::OnboardingStatus;

use crate::auth::CurrentUser;
use crate::db::{analytics, users};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/onboarding/status
pub async fn get_onboarding_status(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({
        "status": user.onboarding_status,
        "completed": user.onboarding_status == OnboardingStatus::Completed,
        "baseline_established": user.has_baseline(),
        "tone_preference_set": !user.tone_preference.is_empty()
    }))
}

/// POST /api/onboarding/complete
pub async fn complete_onboarding(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    users::set_onboarding_status(&state.db, user.id, OnboardingStatus::Completed).await?;

    // Refresh the user so the recalculation sees the completion timestamp
    if let Some(updated) = users::get_user(&state.db, user.id).await? {
        analytics::calculate_user_analytics(&state.db, &updated).await?;
    }

    tracing::info!(user_id = user.id, "onboarding completed");

    Ok(Json(json!({
        "status": "success",
        "message": "Onboarding completed!"
    })))
}

pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route("/api/onboarding/status", get(get_onboarding_status))
        .route("/api/onboarding/complete", post(complete_onboarding))
}
