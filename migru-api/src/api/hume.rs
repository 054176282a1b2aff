//! Hume EVI endpoints
//!
//! Token brokering for the browser voice client, assistant configuration
//! (tool schema and system prompt), the tool-call dispatch bridge, and
//! emotion score synchronization.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agents::hume;
use crate::auth::{CurrentUser, OptionalUser};
use crate::db::voice_sessions;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub struct EmotionSyncRequest {
    pub session_id: i64,
    pub emotion_data: Value,
}

#[derive(Debug, Deserialize)]
pub struct SessionMetadataRequest {
    pub session_id: i64,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub message_count: Option<i64>,
    #[serde(default)]
    pub user_transcript: Option<String>,
    #[serde(default)]
    pub agent_response: Option<String>,
    #[serde(default)]
    pub tools_called: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct EmotionTrendQuery {
    #[serde(default = "default_trend_days")]
    pub days: i64,
}

fn default_trend_days() -> i64 {
    7
}

/// GET /hume/auth
///
/// Access token for the voice client. Works without identity (cache key
/// falls back to a shared slot) and honors per-request key overrides via
/// the X-Hume-Api-Key / X-Hume-Secret-Key headers.
pub async fn hume_auth(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    headers: HeaderMap,
) -> Json<hume::TokenResponse> {
    let api_key = headers
        .get("x-hume-api-key")
        .and_then(|v| v.to_str().ok());
    let secret_key = headers
        .get("x-hume-secret-key")
        .and_then(|v| v.to_str().ok());

    let user_id = user.map(|u| u.id).unwrap_or(0);
    let token = state
        .hume
        .get_access_token(user_id, api_key, secret_key)
        .await;
    Json(token)
}

/// GET /hume/tools
pub async fn get_hume_tools() -> Json<Value> {
    Json(hume::tool_definitions())
}

/// GET /hume/prompt
pub async fn get_hume_prompt(CurrentUser(user): CurrentUser) -> Json<Value> {
    Json(json!({ "prompt": hume::create_system_prompt(&user) }))
}

/// POST /hume/tool-call
///
/// Dispatch a tool invocation from the EVI assistant onto the matching
/// API operation.
pub async fn handle_tool_call(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ToolCallRequest>,
) -> ApiResult<Json<Value>> {
    let args = &request.arguments;

    let result = match request.tool_name.as_str() {
        "get_forecast" => super::forecast::forecast_payload(&state.db, &user).await?,

        "get_status" => serde_json::to_value(super::status::current_status(&state.db, &user).await?)?,

        "log_attack" => {
            let severity = args
                .get("severity")
                .and_then(|v| v.as_i64())
                .ok_or_else(|| ApiError::BadRequest("log_attack requires severity".to_string()))?;
            let symptoms = args
                .get("symptoms")
                .and_then(|v| v.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|s| s.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            let notes = args
                .get("notes")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            let log_request = super::logs::LogAttackRequest {
                severity,
                primary_symptoms: symptoms,
                secondary_symptoms: Vec::new(),
                triggers: Vec::new(),
                notes,
                duration_minutes: None,
            };
            serde_json::to_value(super::logs::record_attack(&state.db, &user, &log_request).await?)?
        }

        "update_status" => {
            let status = args
                .get("status")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ApiError::BadRequest("update_status requires status".to_string()))?;
            serde_json::to_value(
                super::status::apply_status_update(&state.db, &user, status).await?,
            )?
        }

        "get_recent_logs" => {
            let limit = args.get("limit").and_then(|v| v.as_i64()).unwrap_or(3);
            serde_json::to_value(
                super::logs::recent_log_summaries(&state.db, user.id, limit).await?,
            )?
        }

        "start_intervention" => {
            let intervention_request = super::interventions::InterventionRequest {
                intervention_type: args
                    .get("intervention_type")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                context: json!({ "triggered_by": "hume_tool_call" }),
            };
            super::interventions::start_intervention_core(&state.db, &user, &intervention_request)
                .await?
        }

        "analyze_voice" => match voice_sessions::latest_session(&state.db, user.id).await? {
            Some(session) => json!({
                "stress_score": session.stress_score,
                "tremor_detected": session.tremor_detected,
                "baseline_deviation": session.deviation_from_baseline
            }),
            None => json!({ "status": "no_data" }),
        },

        unknown => {
            return Err(ApiError::NotFound(format!("Tool {} not found", unknown)));
        }
    };

    Ok(Json(result))
}

/// POST /hume/emotion-sync
pub async fn sync_emotion_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<EmotionSyncRequest>,
) -> ApiResult<Json<Value>> {
    // Session must belong to the caller
    voice_sessions::get_session(&state.db, user.id, request.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    match state
        .hume
        .process_emotion_scores(&state.db, request.session_id, &request.emotion_data)
        .await?
    {
        Some((top_emotion, top_score, analysis)) => Ok(Json(json!({
            "status": "success",
            "top_emotion": top_emotion,
            "top_score": top_score,
            "migraine_analysis": analysis
        }))),
        None => Ok(Json(json!({ "status": "no_emotion_data" }))),
    }
}

/// POST /hume/session-metadata
///
/// End-of-conversation metadata pushed by the voice client: duration,
/// transcript, and which tools the assistant invoked.
pub async fn sync_session_metadata(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SessionMetadataRequest>,
) -> ApiResult<Json<Value>> {
    voice_sessions::get_session(&state.db, user.id, request.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    voice_sessions::set_session_metadata(
        &state.db,
        request.session_id,
        &voice_sessions::SessionMetadata {
            duration_seconds: request.duration_seconds,
            message_count: request.message_count,
            user_transcript: request.user_transcript,
            agent_response: request.agent_response,
            tools_called: request.tools_called,
        },
    )
    .await?;

    Ok(Json(json!({
        "status": "success",
        "session_id": request.session_id
    })))
}

/// GET /hume/emotion-trend
pub async fn get_emotion_trend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<EmotionTrendQuery>,
) -> ApiResult<Json<Value>> {
    match state.hume.emotion_trend(&state.db, user.id, query.days).await? {
        Some(trend) => {
            let mut value = serde_json::to_value(&trend)?;
            if let Some(map) = value.as_object_mut() {
                map.insert("status".to_string(), json!("success"));
            }
            Ok(Json(value))
        }
        None => Ok(Json(json!({ "status": "insufficient_data" }))),
    }
}

pub fn hume_routes() -> Router<AppState> {
    Router::new()
        .route("/hume/auth", get(hume_auth))
        .route("/hume/tools", get(get_hume_tools))
        .route("/hume/prompt", get(get_hume_prompt))
        .route("/hume/tool-call", post(handle_tool_call))
        .route("/hume/emotion-sync", post(sync_emotion_data))
        .route("/hume/session-metadata", post(sync_session_metadata))
        .route("/hume/emotion-trend", get(get_emotion_trend))
}
