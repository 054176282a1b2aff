//! Intervention delivery and outcome endpoints

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::agents::intervention::{self, InterventionContext};
use crate::auth::CurrentUser;
use crate::db::interventions;
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterventionRequest {
    /// Deliver this technique directly; auto-select when absent
    pub intervention_type: Option<String>,
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Deserialize)]
pub struct InterventionOutcomeRequest {
    pub engaged: bool,
    pub completion_percentage: f64,
    pub rating: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InterventionOutcomeResponse {
    pub status: &'static str,
    pub intervention_id: i64,
    pub effectiveness: Option<i64>,
    pub hrv_change: Option<f64>,
}

/// Build the delivery context: client hints merged with the latest voice
/// session's stress score and the user's current risk level.
pub async fn start_intervention_core(
    pool: &SqlitePool,
    user: &User,
    request: &InterventionRequest,
) -> ApiResult<Value> {
    let mut context = InterventionContext {
        risk_level: user.current_risk_level,
        requested_type: request.intervention_type.clone(),
        ..Default::default()
    };

    if let Some(obj) = request.context.as_object() {
        if let Some(triggered_by) = obj.get("triggered_by").and_then(|v| v.as_str()) {
            context.triggered_by = triggered_by.to_string();
        }
        if let Some(prodromal) = obj.get("prodromal_detected").and_then(|v| v.as_bool()) {
            context.prodromal_detected = prodromal;
        }
        if let Some(tone_matched) = obj.get("tone_matched").and_then(|v| v.as_bool()) {
            context.tone_matched = tone_matched;
        }
        if let Some(stress) = obj.get("stress_score").and_then(|v| v.as_f64()) {
            context.stress_score = stress;
        }
    }

    if let Some(session) = crate::db::voice_sessions::latest_session(pool, user.id).await? {
        if let Some(stress) = session.stress_score {
            context.stress_score = stress;
        }
    }

    let delivered = intervention::deliver_intervention(pool, user, &context).await?;
    let instructions = delivered.content.instructions.clone();

    let mut value = serde_json::to_value(&delivered)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("status".to_string(), json!("success"));
        map.insert("instructions".to_string(), json!(instructions));
    }
    Ok(value)
}

/// POST /api/interventions
pub async fn start_intervention(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<InterventionRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        start_intervention_core(&state.db, &user, &request).await?,
    ))
}

/// POST /api/interventions/:id/outcome
///
/// Record engagement and rating; stress reduction is derived from the
/// HRV change across the intervention.
pub async fn log_intervention_outcome(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(intervention_id): Path<i64>,
    Json(request): Json<InterventionOutcomeRequest>,
) -> ApiResult<Json<InterventionOutcomeResponse>> {
    let existing = interventions::get_intervention(&state.db, user.id, intervention_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Intervention not found".to_string()))?;

    let hrv_change = intervention::hrv_change_percentage(existing.hrv_before, user.current_hrv);

    interventions::set_outcome(
        &state.db,
        intervention_id,
        request.engaged,
        request.completion_percentage,
        request.rating,
        user.current_status,
        user.current_hrv,
        hrv_change,
    )
    .await?;

    Ok(Json(InterventionOutcomeResponse {
        status: "success",
        intervention_id,
        effectiveness: request.rating,
        hrv_change,
    }))
}

/// GET /api/interventions/best
pub async fn get_best_interventions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let best = interventions::best_interventions(&state.db, user.id, 3).await?;
    Ok(Json(json!({ "interventions": best })))
}

pub fn intervention_routes() -> Router<AppState> {
    Router::new()
        .route("/api/interventions", post(start_intervention))
        .route(
            "/api/interventions/:intervention_id/outcome",
            post(log_intervention_outcome),
        )
        .route("/api/interventions/best", get(get_best_interventions))
}
