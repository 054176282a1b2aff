//! Forecast and prediction model endpoints

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::agents::pattern_recognition;
use crate::auth::CurrentUser;
use crate::db::predictions;
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    #[serde(default = "default_performance_days")]
    pub days: i64,
}

fn default_performance_days() -> i64 {
    30
}

pub async fn forecast_payload(pool: &SqlitePool, user: &User) -> ApiResult<Value> {
    let forecast = pattern_recognition::generate_forecast(pool, user).await?;
    let mut value = serde_json::to_value(&forecast)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("status".to_string(), json!("success"));
    }
    Ok(value)
}

/// GET /api/forecast
///
/// Generate a fresh 48-hour risk prediction.
pub async fn get_forecast(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    Ok(Json(forecast_payload(&state.db, &user).await?))
}

/// GET /api/patterns/performance
///
/// Accuracy metrics for validated predictions.
pub async fn get_pattern_performance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<Value>> {
    match pattern_recognition::model_performance(&state.db, user.id, query.days).await? {
        Some(performance) => {
            let mut value = serde_json::to_value(&performance)?;
            if let Some(map) = value.as_object_mut() {
                map.insert("status".to_string(), json!("success"));
            }
            Ok(Json(value))
        }
        None => Ok(Json(json!({ "status": "insufficient_data" }))),
    }
}

/// POST /api/patterns/validate/:prediction_id
///
/// Check a prediction against what actually happened once its window
/// has closed; pending until then.
pub async fn validate_prediction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(prediction_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let prediction = predictions::get_prediction(&state.db, user.id, prediction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Prediction not found".to_string()))?;

    let result = pattern_recognition::validate_prediction(&state.db, &prediction).await?;
    Ok(Json(serde_json::to_value(&result)?))
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/api/forecast", get(get_forecast))
        .route("/api/patterns/performance", get(get_pattern_performance))
        .route(
            "/api/patterns/validate/:prediction_id",
            post(validate_prediction),
        )
}
