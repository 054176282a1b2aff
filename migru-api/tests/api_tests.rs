//! Integration tests for the migru-api HTTP surface
//!
//! Each test builds the full router over an in-memory SQLite database,
//! with dev mode enabled so requests without an Authorization header
//! resolve to the shared demo user.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use migru_api::config::ServiceConfig;
use migru_api::{build_router, AppState};

async fn setup_app_with(dev_mode: bool) -> axum::Router {
    let db = migru_api::db::init_memory_pool()
        .await
        .expect("Should create in-memory database");

    let config = ServiceConfig {
        port: 0,
        data_dir: std::env::temp_dir(),
        dev_mode,
        hume_api_key: None,
        hume_secret_key: None,
    };

    build_router(AppState::new(db, config))
}

async fn setup_app() -> axum::Router {
    setup_app_with(true).await
}

/// Like `setup_app`, but also hands back the pool for direct row seeding
async fn setup_app_and_pool() -> (axum::Router, sqlx::SqlitePool) {
    let db = migru_api::db::init_memory_pool()
        .await
        .expect("Should create in-memory database");

    let config = ServiceConfig {
        port: 0,
        data_dir: std::env::temp_dir(),
        dev_mode: true,
        hume_api_key: None,
        hume_secret_key: None,
    };

    (build_router(AppState::new(db.clone(), config)), db)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Base64-encoded f32 LE PCM sine tone
fn sine_audio_base64(freq: f64, secs: f64) -> String {
    let rate = 24_000u32;
    let n = (secs * rate as f64) as usize;
    let bytes: Vec<u8> = (0..n)
        .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate as f64).sin() as f32)
        .flat_map(|s| s.to_le_bytes())
        .collect();
    BASE64.encode(&bytes)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_agents() {
    let app = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agents"]["voice_analysis"], "active");
    assert!(body["version"].is_string());
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn dev_mode_resolves_demo_user() {
    let app = setup_app().await;

    let response = app.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "Balanced");
    assert_eq!(body["hrv"], 65);
    assert_eq!(body["risk_level"], "Moderate");
    assert_eq!(body["logs_count"], 0);
    assert_eq!(body["onboarding_status"], "not_started");
}

#[tokio::test]
async fn missing_identity_is_rejected_outside_dev_mode() {
    let app = setup_app_with(false).await;

    let response = app.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn bearer_subject_creates_isolated_user() {
    let app = setup_app_with(false).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/status")
        .header("authorization", "Bearer subject_abc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "Balanced");
}

// =============================================================================
// Migraine logging
// =============================================================================

#[tokio::test]
async fn severe_attack_raises_status_and_risk() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({
                "severity": 8,
                "primary_symptoms": ["Aura", "Nausea"],
                "triggers": ["Stress"],
                "notes": "sudden onset"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["new_status"], "Attack");
    assert!(body["log_id"].is_i64());

    let response = app.clone().oneshot(get("/api/status")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "Attack");
    assert_eq!(body["risk_level"], "High");
    assert_eq!(body["logs_count"], 1);

    let response = app.oneshot(get("/api/logs?limit=5")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["severity"], 8);
    assert_eq!(logs[0]["primary_symptoms"][0], "Aura");
}

#[tokio::test]
async fn mild_attack_marks_prodromal_phase() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request("POST", "/api/logs", json!({ "severity": 2 })))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["new_status"], "Prodromal");
}

#[tokio::test]
async fn out_of_range_severity_is_rejected() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request("POST", "/api/logs", json!({ "severity": 11 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Status updates
// =============================================================================

#[tokio::test]
async fn status_update_round_trip() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/status",
            json!({ "status": "Recovery" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["new_status"], "Recovery");

    let response = app.oneshot(get("/api/status")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "Recovery");
}

#[tokio::test]
async fn invalid_status_is_rejected() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/status",
            json!({ "status": "Zen" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Voice analysis
// =============================================================================

#[tokio::test]
async fn short_audio_yields_insufficient_data() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/voice/analyze",
            json!({ "audio_base64": sine_audio_base64(150.0, 0.5) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "insufficient_data");
}

#[tokio::test]
async fn voice_analysis_persists_a_session() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/voice/analyze",
            json!({ "audio_base64": sine_audio_base64(150.0, 3.0) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert!(body["session_id"].is_i64());
    assert!(body["features"]["pitch_mean"].as_f64().unwrap() > 100.0);
    // No baseline yet, so stress is neutral
    assert_eq!(body["stress_score"], 0.0);
    assert_eq!(body["baseline_deviation"], 0.0);
}

#[tokio::test]
async fn garbage_audio_is_rejected() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/voice/analyze",
            json!({ "audio_base64": "@@not-base64@@" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn baseline_requires_three_chunks() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/voice/baseline",
            json!([sine_audio_base64(150.0, 3.0)]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn baseline_establishment_flows_into_onboarding() {
    let app = setup_app().await;

    let chunk = sine_audio_base64(150.0, 3.0);
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/voice/baseline",
            json!([chunk.clone(), chunk.clone(), chunk]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert!(body["baseline"]["pitch_mean"].as_f64().unwrap() > 100.0);

    let response = app.oneshot(get("/api/onboarding/status")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["baseline_established"], true);
}

#[tokio::test]
async fn voice_trend_needs_at_least_two_sessions() {
    let app = setup_app().await;

    let response = app.clone().oneshot(get("/api/voice/trend")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "insufficient_data");
    assert_eq!(body["trend"], "unknown");

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/voice/analyze",
                json!({ "audio_base64": sine_audio_base64(150.0, 3.0) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/api/voice/trend?days=7")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["session_count"], 2);
    // Identical audio twice: flat trend
    assert_eq!(body["trend"], "stable");
}

// =============================================================================
// Forecast
// =============================================================================

#[tokio::test]
async fn forecast_without_history_is_low_risk() {
    let app = setup_app().await;

    let response = app.oneshot(get("/api/forecast")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["risk_level"], "Low");
    assert_eq!(body["probability"], 0.0);
    assert_eq!(body["confidence"], 0.0);
    assert_eq!(body["factors"]["temporal"]["status"], "insufficient_data");
    assert_eq!(
        body["factors"]["physiological"]["status"],
        "no_recent_voice_data"
    );
    assert!(body["prediction_id"].is_i64());
}

#[tokio::test]
async fn forecast_sees_logged_history() {
    let app = setup_app().await;

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/logs", json!({ "severity": 6 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/api/forecast")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["factors"]["temporal"]["status"], "success");
    assert_eq!(body["factors"]["temporal"]["total_attacks_analyzed"], 3);
    // Three attacks inside the last week push probability above zero
    assert!(body["probability"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn fresh_prediction_validates_as_pending() {
    let app = setup_app().await;

    let response = app.clone().oneshot(get("/api/forecast")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let prediction_id = body["prediction_id"].as_i64().unwrap();

    // Window has not closed yet
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/patterns/validate/{}", prediction_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "pending");

    let response = app
        .oneshot(json_request("POST", "/api/patterns/validate/9999", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn model_performance_without_validated_predictions() {
    let app = setup_app().await;

    let response = app
        .oneshot(get("/api/patterns/performance?days=30"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "insufficient_data");
}

#[tokio::test]
async fn closed_prediction_windows_validate_and_feed_performance() {
    use chrono::{Duration, Utc};
    use migru_api::db::predictions::{self, NewPrediction};
    use migru_api::db::users;
    use migru_common::RiskLevel;

    let (app, pool) = setup_app_and_pool().await;

    let user = users::get_or_create_user(&pool, "dev_user_1", None)
        .await
        .expect("Should resolve demo user");

    // An attack two hours ago, inside both prediction windows
    sqlx::query("INSERT INTO migraine_logs (user_id, created_at, severity) VALUES (?, ?, ?)")
        .bind(user.id)
        .bind(Utc::now() - Duration::hours(2))
        .bind(6i64)
        .execute(&pool)
        .await
        .expect("Should insert log");

    // Two predictions whose windows closed an hour ago
    let predicted_for = Utc::now() - Duration::hours(25);
    let prediction = |risk_level| NewPrediction {
        predicted_for,
        risk_level,
        probability: 50.0,
        confidence: 40.0,
        temporal_patterns: json!({}),
        environmental_factors: json!({}),
        physiological_indicators: json!({}),
        model_version: "v1.0".to_string(),
    };
    let high_id = predictions::insert_prediction(&pool, user.id, &prediction(RiskLevel::High))
        .await
        .expect("Should insert prediction");
    let low_id = predictions::insert_prediction(&pool, user.id, &prediction(RiskLevel::Low))
        .await
        .expect("Should insert prediction");

    // High-risk prediction matched the attack
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/patterns/validate/{}", high_id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "validated");
    assert_eq!(body["predicted_risk"], "High");
    assert_eq!(body["actual_occurred"], true);
    assert_eq!(body["actual_severity"], 6);
    assert_eq!(body["accuracy"], 100.0);
    assert_eq!(body["correct"], true);

    // Low-risk prediction missed it
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/patterns/validate/{}", low_id),
            json!({}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "validated");
    assert_eq!(body["actual_occurred"], true);
    assert_eq!(body["accuracy"], 0.0);
    assert_eq!(body["correct"], false);

    let response = app
        .oneshot(get("/api/patterns/performance?days=30"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["total_predictions"], 2);
    assert_eq!(body["average_accuracy"], 50.0);
    assert_eq!(body["sensitivity"], 100.0);
    assert_eq!(body["specificity"], 0.0);
}

// =============================================================================
// Interventions
// =============================================================================

#[tokio::test]
async fn intervention_delivery_and_outcome() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/interventions", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert!(body["type"].is_string());
    assert!(!body["content"]["script"].as_str().unwrap().is_empty());
    assert!(body["estimated_duration_seconds"].as_u64().unwrap() >= 60);
    let intervention_id = body["intervention_id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/interventions/{}/outcome", intervention_id),
            json!({ "engaged": true, "completion_percentage": 100.0, "rating": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["effectiveness"], 5);
    // HRV unchanged across the intervention
    assert_eq!(body["hrv_change"], 0.0);

    let response = app.oneshot(get("/api/interventions/best")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let best = body["interventions"].as_array().unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0]["rating"], 5);
    assert_eq!(best[0]["times_used"], 1);
}

#[tokio::test]
async fn requested_intervention_type_is_honored() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/interventions",
            json!({ "intervention_type": "breathing_478" }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["type"], "breathing_478");
    assert!(body["content"]["script"].as_str().unwrap().contains("4-7-8"));
}

#[tokio::test]
async fn outcome_for_unknown_intervention_is_404() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/interventions/9999/outcome",
            json!({ "engaged": false, "completion_percentage": 0.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Analytics and onboarding
// =============================================================================

#[tokio::test]
async fn analytics_snapshot_is_grouped() {
    let app = setup_app().await;

    let response = app.oneshot(get("/api/analytics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["onboarding"]["status"], "not_started");
    assert_eq!(body["onboarding"]["completion_rate"], 0.0);
    assert_eq!(body["engagement"]["total_voice_sessions"], 0);
    assert_eq!(body["health_outcomes"]["achieved_40_percent_reduction"], false);
    assert!(body["nps"]["score"].is_null());
}

#[tokio::test]
async fn completing_onboarding_updates_analytics() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/onboarding/complete", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/onboarding/status")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["completed"], true);

    let response = app.oneshot(get("/api/analytics")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["onboarding"]["completion_rate"], 100.0);
    assert!(body["onboarding"]["completed_at"].is_string());
}

// =============================================================================
// Hume integration
// =============================================================================

#[tokio::test]
async fn hume_auth_without_credentials_returns_mock_token() {
    let app = setup_app().await;

    let response = app.oneshot(get("/hume/auth")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["access_token"], "mock_token_for_demo");
}

#[tokio::test]
async fn hume_tools_schema_is_complete() {
    let app = setup_app().await;

    let response = app.oneshot(get("/hume/tools")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let tools = body.as_array().unwrap();
    assert_eq!(tools.len(), 7);
    assert!(tools.iter().any(|t| t["name"] == "log_attack"));
}

#[tokio::test]
async fn hume_prompt_reflects_user_state() {
    let app = setup_app().await;

    let response = app.oneshot(get("/hume/prompt")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.contains("Migru"));
    assert!(prompt.contains("Status: Balanced"));
    assert!(prompt.contains("HRV: 65ms"));
}

#[tokio::test]
async fn tool_call_dispatches_to_handlers() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/hume/tool-call",
            json!({ "tool_name": "get_status", "arguments": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "Balanced");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/hume/tool-call",
            json!({
                "tool_name": "log_attack",
                "arguments": { "severity": 7, "symptoms": ["Nausea"] }
            }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["new_status"], "Attack");

    // No voice sessions yet
    let response = app
        .oneshot(json_request(
            "POST",
            "/hume/tool-call",
            json!({ "tool_name": "analyze_voice", "arguments": {} }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "no_data");
}

#[tokio::test]
async fn unknown_tool_is_404() {
    let app = setup_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/hume/tool-call",
            json!({ "tool_name": "launch_rocket", "arguments": {} }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn emotion_sync_round_trip() {
    let app = setup_app().await;

    // Unknown session
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/hume/emotion-sync",
            json!({ "session_id": 42, "emotion_data": { "emotions": [] } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Create a session via voice analysis
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/voice/analyze",
            json!({ "audio_base64": sine_audio_base64(150.0, 3.0) }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let session_id = body["session_id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/hume/emotion-sync",
            json!({
                "session_id": session_id,
                "emotion_data": {
                    "emotions": [
                        { "name": "Anxiety", "score": 0.9 },
                        { "name": "Calmness", "score": 0.2 }
                    ]
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["top_emotion"], "Anxiety");
    assert!(body["migraine_analysis"]["stress_indicator"].as_f64().unwrap() > 0.0);

    let response = app.oneshot(get("/hume/emotion-trend?days=7")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["session_count"], 1);
    assert_eq!(body["dominant_emotion"], "Anxiety");
}

#[tokio::test]
async fn session_metadata_sync_requires_ownership() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/hume/session-metadata",
            json!({ "session_id": 42, "duration_seconds": 120 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/voice/analyze",
            json!({ "audio_base64": sine_audio_base64(150.0, 3.0) }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let session_id = body["session_id"].as_i64().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/hume/session-metadata",
            json!({
                "session_id": session_id,
                "duration_seconds": 120,
                "message_count": 6,
                "tools_called": ["get_status", "start_intervention"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["session_id"], session_id);
}
