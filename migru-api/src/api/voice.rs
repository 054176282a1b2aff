//! Voice biomarker endpoints
//!
//! Audio arrives base64-encoded as little-endian f32 mono PCM, the
//! format the browser client captures from the Hume EVI stream.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agents::voice_analysis::{self, Baseline, VoiceAnalyzer, VoiceFeatures};
use crate::auth::CurrentUser;
use crate::db::{users, voice_sessions};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VoiceAnalysisRequest {
    pub audio_base64: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_sample_rate() -> u32 {
    voice_analysis::DEFAULT_SAMPLE_RATE
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VoiceAnalysisResponse {
    InsufficientData {
        message: &'static str,
    },
    Success {
        session_id: i64,
        features: VoiceFeatures,
        stress_score: f64,
        baseline_deviation: f64,
        tremor_detected: bool,
        prodromal_risk: &'static str,
        recommendations: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    #[serde(default = "default_trend_days")]
    pub days: i64,
}

fn default_trend_days() -> i64 {
    7
}

/// Decode base64 little-endian f32 PCM into samples
fn decode_audio(audio_base64: &str) -> ApiResult<Vec<f32>> {
    let bytes = BASE64
        .decode(audio_base64)
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 audio: {}", e)))?;

    if bytes.len() % 4 != 0 {
        return Err(ApiError::BadRequest(
            "Audio payload is not f32 PCM".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// POST /api/voice/analyze
///
/// Analyze one audio chunk: extract biomarkers, score stress against the
/// user's baseline, detect tremor, and persist the session.
pub async fn analyze_voice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<VoiceAnalysisRequest>,
) -> ApiResult<Json<VoiceAnalysisResponse>> {
    let audio = decode_audio(&request.audio_base64)?;
    let analyzer = VoiceAnalyzer::new(request.sample_rate);

    if !analyzer.has_enough_speech(&audio) {
        return Ok(Json(VoiceAnalysisResponse::InsufficientData {
            message: "Audio too short for analysis",
        }));
    }

    let features = analyzer.extract_features(&audio);
    let baseline = Baseline::from_user(&user);
    let deviation = analyzer.baseline_deviation(&features, &baseline);
    let stress_score = analyzer.stress_score(&features, &baseline);
    let tremor_detected = analyzer.detect_tremor(&audio);

    let session_id = voice_sessions::insert_session(
        &state.db,
        user.id,
        &features,
        stress_score,
        deviation,
        tremor_detected,
    )
    .await?;

    let prodromal_risk = if stress_score > 70.0 || deviation > 30.0 {
        "high"
    } else {
        "low"
    };

    Ok(Json(VoiceAnalysisResponse::Success {
        session_id,
        features,
        stress_score,
        baseline_deviation: deviation,
        tremor_detected,
        prodromal_risk,
        recommendations: voice_analysis::recommendations(stress_score, tremor_detected),
    }))
}

/// POST /api/voice/baseline
///
/// Establish the user's vocal baseline from onboarding recordings.
/// Requires at least 3 chunks; chunks below the minimum speech duration
/// are skipped.
pub async fn establish_baseline(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(audio_chunks): Json<Vec<String>>,
) -> ApiResult<Json<Value>> {
    if audio_chunks.len() < 3 {
        return Err(ApiError::BadRequest(
            "Need at least 3 audio samples to establish baseline".to_string(),
        ));
    }

    let mut decoded = Vec::with_capacity(audio_chunks.len());
    for chunk in &audio_chunks {
        decoded.push(decode_audio(chunk)?);
    }

    let analyzer = VoiceAnalyzer::default();
    let baseline = analyzer
        .average_baseline(&decoded)
        .ok_or_else(|| ApiError::BadRequest("Insufficient valid audio data".to_string()))?;

    users::set_baseline(
        &state.db,
        user.id,
        baseline.pitch_mean,
        baseline.pitch_variance,
        baseline.tempo,
        baseline.energy_mean,
        baseline.jitter,
        baseline.shimmer,
    )
    .await?;

    tracing::info!(user_id = user.id, "established voice baseline");

    Ok(Json(json!({
        "status": "success",
        "message": "Baseline established",
        "baseline": {
            "pitch_mean": baseline.pitch_mean,
            "tempo": baseline.tempo,
            "energy": baseline.energy_mean,
            "jitter": baseline.jitter,
            "shimmer": baseline.shimmer
        }
    })))
}

/// GET /api/voice/trend
///
/// Stress score trend over recent sessions via linear regression.
pub async fn voice_trend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TrendQuery>,
) -> ApiResult<Json<Value>> {
    let cutoff = Utc::now() - Duration::days(query.days);
    let sessions = voice_sessions::sessions_since(&state.db, user.id, cutoff).await?;

    let scores: Vec<f64> = sessions.iter().filter_map(|s| s.stress_score).collect();

    // Session index as x keeps the slope in score-per-session units and
    // stays well-defined even when sessions share a timestamp.
    let points: Vec<(f64, f64)> = scores
        .iter()
        .enumerate()
        .map(|(i, score)| (i as f64, *score))
        .collect();

    let slope = match VoiceAnalyzer::trend_slope(&points) {
        Some(slope) => slope,
        None => {
            return Ok(Json(json!({
                "status": "insufficient_data",
                "trend": "unknown"
            })))
        }
    };

    let trend = if slope > 1.0 {
        "increasing"
    } else if slope < -1.0 {
        "decreasing"
    } else {
        "stable"
    };

    let average = scores.iter().sum::<f64>() / scores.len() as f64;

    Ok(Json(json!({
        "status": "success",
        "trend": trend,
        "slope": slope,
        "current_score": scores.last(),
        "average_score": average,
        "session_count": scores.len()
    })))
}

pub fn voice_routes() -> Router<AppState> {
    Router::new()
        .route("/api/voice/analyze", post(analyze_voice))
        .route("/api/voice/baseline", post(establish_baseline))
        .route("/api/voice/trend", get(voice_trend))
}
