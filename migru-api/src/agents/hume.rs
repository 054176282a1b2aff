//! Hume EVI integration
//!
//! Brokers OAuth access tokens for the browser voice client (24-hour
//! per-user cache), maps Hume emotion scores onto migraine-relevant
//! states, and exposes the tool schema and system prompt that configure
//! the voice assistant.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use migru_common::Result;

use crate::db::voice_sessions;
use crate::models::{User, VoiceSession};

const TOKEN_URL: &str = "https://api.hume.ai/oauth2-cc/token";
const TOKEN_TTL_HOURS: i64 = 24;

/// Issued to unauthenticated demo clients when no credentials exist
const MOCK_TOKEN: &str = "mock_token_for_demo";

/// Emotions treated as stress signals for trend analysis
const STRESS_EMOTIONS: &[&str] = &["Anxiety", "Fear", "Distress"];

/// Emotion-to-migraine state mapping
const STRESS_INDICATORS: &[&str] = &["Anxiety", "Fear", "Distress", "Nervousness"];
const PAIN_INDICATORS: &[&str] = &["Pain", "Distress", "Sadness", "Concentration"];
const PRODROMAL_INDICATORS: &[&str] = &["Confusion", "Tiredness", "Concentration", "Disgust"];
const RECOVERY_INDICATORS: &[&str] = &["Relief", "Calmness", "Joy", "Satisfaction"];

/// Access token response for the voice client
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Migraine-relevant breakdown of a Hume emotion distribution
#[derive(Debug, Clone, Serialize)]
pub struct EmotionAnalysis {
    pub stress_indicator: f64,
    pub pain_indicator: f64,
    pub prodromal_indicator: f64,
    pub recovery_indicator: f64,
    pub dominant_state: String,
    pub recommendation: String,
}

/// Emotion trend over recent sessions
#[derive(Debug, Clone, Serialize)]
pub struct EmotionTrend {
    pub days_analyzed: i64,
    pub session_count: usize,
    pub top_emotions: Vec<EmotionCount>,
    pub stress_trend: &'static str,
    pub dominant_emotion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmotionCount {
    pub emotion: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Hume EVI bridge shared across requests
pub struct HumeAgent {
    client: reqwest::Client,
    api_key: Option<String>,
    secret_key: Option<String>,
    token_url: String,
    token_cache: RwLock<HashMap<i64, CachedToken>>,
}

impl HumeAgent {
    pub fn new(api_key: Option<String>, secret_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            secret_key,
            token_url: TOKEN_URL.to_string(),
            token_cache: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn with_token_url(mut self, url: String) -> Self {
        self.token_url = url;
        self
    }

    /// Fetch an EVI access token, serving from the per-user cache when
    /// still valid. Per-request key overrides let users supply their own
    /// Hume credentials. Falls back to a mock token so demo clients keep
    /// working without credentials or connectivity.
    pub async fn get_access_token(
        &self,
        user_id: i64,
        api_key_override: Option<&str>,
        secret_key_override: Option<&str>,
    ) -> TokenResponse {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.get(&user_id) {
                if Utc::now() < cached.expires_at {
                    return TokenResponse {
                        status: "cached",
                        access_token: cached.token.clone(),
                        expires_at: Some(cached.expires_at),
                        message: None,
                    };
                }
            }
        }

        let api_key = api_key_override.or(self.api_key.as_deref());
        let secret_key = secret_key_override.or(self.secret_key.as_deref());

        let (api_key, secret_key) = match (api_key, secret_key) {
            (Some(a), Some(s)) => (a, s),
            _ => {
                return TokenResponse {
                    status: "error",
                    access_token: MOCK_TOKEN.to_string(),
                    expires_at: None,
                    message: Some("Hume API credentials not configured".to_string()),
                }
            }
        };

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(api_key, Some(secret_key))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<Value>().await {
                    Ok(body) => match body.get("access_token").and_then(|t| t.as_str()) {
                        Some(token) => {
                            let expires_at = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
                            let mut cache = self.token_cache.write().await;
                            cache.insert(
                                user_id,
                                CachedToken {
                                    token: token.to_string(),
                                    expires_at,
                                },
                            );
                            TokenResponse {
                                status: "success",
                                access_token: token.to_string(),
                                expires_at: Some(expires_at),
                                message: None,
                            }
                        }
                        None => TokenResponse {
                            status: "error",
                            access_token: MOCK_TOKEN.to_string(),
                            expires_at: None,
                            message: Some("Hume token response missing access_token".to_string()),
                        },
                    },
                    Err(e) => TokenResponse {
                        status: "error",
                        access_token: MOCK_TOKEN.to_string(),
                        expires_at: None,
                        message: Some(format!("Invalid token response: {}", e)),
                    },
                }
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Hume token request rejected");
                TokenResponse {
                    status: "error",
                    access_token: MOCK_TOKEN.to_string(),
                    expires_at: None,
                    message: Some(format!("Hume API error: {}", resp.status())),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Hume token request failed");
                TokenResponse {
                    status: "error",
                    access_token: MOCK_TOKEN.to_string(),
                    expires_at: None,
                    message: Some(format!("Connection failed: {}", e)),
                }
            }
        }
    }

    /// Store a Hume emotion distribution on a voice session and return
    /// the migraine-relevant analysis. `emotion_data` carries an
    /// `emotions` array of `{name, score}` objects.
    pub async fn process_emotion_scores(
        &self,
        pool: &SqlitePool,
        session_id: i64,
        emotion_data: &Value,
    ) -> Result<Option<(String, f64, EmotionAnalysis)>> {
        let emotions = match emotion_data.get("emotions").and_then(|e| e.as_array()) {
            Some(list) if !list.is_empty() => list,
            _ => return Ok(None),
        };

        let scores = emotion_scores(emotions);
        let top = scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, score)| (name.clone(), *score));

        let (top_name, top_score) = match top {
            Some(t) => t,
            None => return Ok(None),
        };

        voice_sessions::set_emotion_scores(
            pool,
            session_id,
            &top_name,
            emotion_data.get("emotions").unwrap_or(&Value::Null),
        )
        .await?;

        let analysis = analyze_migraine_emotions(&scores);
        Ok(Some((top_name, top_score, analysis)))
    }

    /// Most common top emotions over recent sessions, plus a coarse
    /// stress trend.
    pub async fn emotion_trend(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        days: i64,
    ) -> Result<Option<EmotionTrend>> {
        let cutoff = Utc::now() - Duration::days(days);
        let sessions: Vec<VoiceSession> = voice_sessions::sessions_since(pool, user_id, cutoff)
            .await?
            .into_iter()
            .filter(|s| s.hume_top_emotion.is_some())
            .collect();

        if sessions.is_empty() {
            return Ok(None);
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut stress_sessions = 0usize;
        for session in &sessions {
            if let Some(emotion) = &session.hume_top_emotion {
                *counts.entry(emotion.clone()).or_default() += 1;
                if STRESS_EMOTIONS.contains(&emotion.as_str()) {
                    stress_sessions += 1;
                }
            }
        }

        let mut top_emotions: Vec<EmotionCount> = counts
            .into_iter()
            .map(|(emotion, count)| EmotionCount { emotion, count })
            .collect();
        top_emotions.sort_by(|a, b| b.count.cmp(&a.count));
        top_emotions.truncate(5);

        let stress_trend = if stress_sessions * 3 > sessions.len() {
            "increasing"
        } else {
            "stable"
        };

        Ok(Some(EmotionTrend {
            days_analyzed: days,
            session_count: sessions.len(),
            dominant_emotion: top_emotions.first().map(|e| e.emotion.clone()),
            top_emotions,
            stress_trend,
        }))
    }
}

/// Tool schemas the EVI assistant can invoke against this API
pub fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "name": "get_forecast",
            "description": "Get the user's current migraine forecast and risk level for the next 48 hours.",
            "parameters": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "type": "function",
            "name": "get_status",
            "description": "Get the user's current health status, migraine phase, and heart rate variability.",
            "parameters": { "type": "object", "properties": {}, "required": [] }
        },
        {
            "type": "function",
            "name": "log_attack",
            "description": "Log a migraine attack with severity, symptoms, and notes.",
            "parameters": {
                "type": "object",
                "properties": {
                    "severity": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 10,
                        "description": "Pain severity from 1 (mild) to 10 (severe)"
                    },
                    "symptoms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of symptoms (e.g., 'Nausea', 'Aura', 'Light Sensitivity')"
                    },
                    "notes": {
                        "type": "string",
                        "description": "Additional notes about triggers or context"
                    }
                },
                "required": ["severity", "symptoms"]
            }
        },
        {
            "type": "function",
            "name": "update_status",
            "description": "Update the user's current health status/phase.",
            "parameters": {
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["Balanced", "Prodromal", "Attack", "Postdromal", "Recovery"],
                        "description": "Current migraine phase"
                    }
                },
                "required": ["status"]
            }
        },
        {
            "type": "function",
            "name": "get_recent_logs",
            "description": "Retrieve recent migraine attack logs.",
            "parameters": {
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 10,
                        "default": 3,
                        "description": "Number of recent logs to retrieve"
                    }
                },
                "required": []
            }
        },
        {
            "type": "function",
            "name": "start_intervention",
            "description": "Start a therapeutic intervention (breathing exercise, visualization, etc.)",
            "parameters": {
                "type": "object",
                "properties": {
                    "intervention_type": {
                        "type": "string",
                        "enum": [
                            "breathing_478",
                            "breathing_box",
                            "breathing_coherence",
                            "progressive_relaxation",
                            "visualization_cool_dark",
                            "body_scan",
                            "grounding_54321"
                        ],
                        "description": "Type of intervention to deliver"
                    }
                },
                "required": []
            }
        },
        {
            "type": "function",
            "name": "analyze_voice",
            "description": "Analyze current voice biomarkers for stress and prodromal indicators.",
            "parameters": { "type": "object", "properties": {}, "required": [] }
        }
    ])
}

/// Personalized EVI system prompt from user preferences and state
pub fn create_system_prompt(user: &User) -> String {
    let tone = if user.tone_preference.is_empty() {
        "calm"
    } else {
        &user.tone_preference
    };
    let name = user
        .email
        .as_deref()
        .and_then(|e| e.split('@').next())
        .unwrap_or("there");

    format!(
        "You are Migru, an empathetic AI health companion specialized in migraine management.\n\
         \n\
         **Core Personality:**\n\
         - Tone: {tone} and supportive\n\
         - Deeply empathetic, validating pain experiences\n\
         - Solution-oriented without being pushy\n\
         - Uses Milton Model NLP patterns naturally (presuppositions, embedded commands)\n\
         \n\
         **Current User Context:**\n\
         - User: {name}\n\
         - Status: {status}\n\
         - Risk Level: {risk}\n\
         - HRV: {hrv}ms\n\
         \n\
         **Guidelines:**\n\
         1. **Listen first** - validate emotions before suggesting solutions\n\
         2. **Be concise** - voice interactions should be brief and clear\n\
         3. **Use tools proactively**:\n\
            - Check forecast when user asks \"how am I doing\"\n\
            - Log attacks when pain is reported\n\
            - Start interventions when stress/pain is high\n\
            - Analyze voice biomarkers for prodromal detection\n\
         4. **Milton Model patterns**:\n\
            - \"As you begin to notice relief...\"\n\
            - \"When you find yourself feeling better...\"\n\
            - \"You might notice yourself *breathing more easily*...\"\n\
         5. **Match energy** - if user sounds stressed, acknowledge it; if calm, maintain that\n\
         6. **Suggest preventively** - if risk is high, offer interventions before asked\n\
         \n\
         **Tone Examples:**\n\
         - High stress: \"I hear the tension in your voice. Let's take a moment together. Would you like to try a quick breathing exercise?\"\n\
         - Prodromal: \"It sounds like you might be in a prodromal phase. How about we check your forecast and see what might help?\"\n\
         - Attack: \"I'm so sorry you're going through this. Let me log this for you, and we can explore some relief options.\"\n\
         - Recovery: \"I'm glad to hear you're feeling better. Let's track this so we can identify what's working.\"\n\
         \n\
         **Remember:** You're a calm tech companion that actually *listens*. Not another wellness app.\n",
        tone = tone,
        name = name,
        status = user.current_status,
        risk = user.current_risk_level,
        hrv = user.current_hrv,
    )
}

fn emotion_scores(emotions: &[Value]) -> Vec<(String, f64)> {
    emotions
        .iter()
        .filter_map(|e| {
            let name = e.get("name")?.as_str()?.to_string();
            let score = e.get("score")?.as_f64()?;
            Some((name, score))
        })
        .collect()
}

/// Composite stress/pain/prodromal/recovery indicators from a raw
/// emotion distribution
fn analyze_migraine_emotions(scores: &[(String, f64)]) -> EmotionAnalysis {
    let lookup: HashMap<&str, f64> = scores.iter().map(|(n, s)| (n.as_str(), *s)).collect();

    let composite = |indicators: &[&str]| -> f64 {
        let sum: f64 = indicators
            .iter()
            .map(|name| lookup.get(name).copied().unwrap_or(0.0))
            .sum();
        sum / indicators.len() as f64 * 100.0
    };

    let stress = composite(STRESS_INDICATORS);
    let pain = composite(PAIN_INDICATORS);
    let prodromal = composite(PRODROMAL_INDICATORS);
    let recovery = composite(RECOVERY_INDICATORS);

    let states = [
        ("stress", stress),
        ("pain", pain),
        ("prodromal", prodromal),
        ("recovery", recovery),
    ];
    let (dominant_state, dominant_score) = states
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .copied()
        .unwrap_or(("recovery", 0.0));

    EmotionAnalysis {
        stress_indicator: round2(stress),
        pain_indicator: round2(pain),
        prodromal_indicator: round2(prodromal),
        recovery_indicator: round2(recovery),
        dominant_state: dominant_state.to_string(),
        recommendation: emotion_recommendation(dominant_state, dominant_score),
    }
}

fn emotion_recommendation(state: &str, score: f64) -> String {
    match state {
        "stress" if score > 60.0 => "High stress detected - breathing exercise recommended",
        "pain" if score > 50.0 => "Pain indicators present - consider logging symptoms",
        "prodromal" if score > 40.0 => "Prodromal indicators detected - monitor closely",
        "recovery" => "Recovery state detected - gentle activities recommended",
        _ => "Emotional state within normal range",
    }
    .to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credentials_fall_back_to_mock_token() {
        let agent = HumeAgent::new(None, None);
        let response = agent.get_access_token(1, None, None).await;
        assert_eq!(response.status, "error");
        assert_eq!(response.access_token, MOCK_TOKEN);
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back_to_mock_token() {
        let agent = HumeAgent::new(Some("key".to_string()), Some("secret".to_string()))
            .with_token_url("http://127.0.0.1:1/oauth2-cc/token".to_string());
        let response = agent.get_access_token(1, None, None).await;
        assert_eq!(response.status, "error");
        assert_eq!(response.access_token, MOCK_TOKEN);
    }

    #[tokio::test]
    async fn cached_token_is_served_until_expiry() {
        let agent = HumeAgent::new(None, None);
        {
            let mut cache = agent.token_cache.write().await;
            cache.insert(
                7,
                CachedToken {
                    token: "cached-token".to_string(),
                    expires_at: Utc::now() + Duration::hours(1),
                },
            );
            cache.insert(
                8,
                CachedToken {
                    token: "expired-token".to_string(),
                    expires_at: Utc::now() - Duration::hours(1),
                },
            );
        }

        let response = agent.get_access_token(7, None, None).await;
        assert_eq!(response.status, "cached");
        assert_eq!(response.access_token, "cached-token");

        // Expired entry is ignored; no credentials means mock fallback
        let response = agent.get_access_token(8, None, None).await;
        assert_eq!(response.status, "error");
        assert_eq!(response.access_token, MOCK_TOKEN);
    }

    #[test]
    fn stressful_distribution_maps_to_stress_state() {
        let scores = vec![
            ("Anxiety".to_string(), 0.8),
            ("Fear".to_string(), 0.7),
            ("Distress".to_string(), 0.6),
            ("Nervousness".to_string(), 0.9),
            ("Joy".to_string(), 0.1),
        ];
        let analysis = analyze_migraine_emotions(&scores);
        assert_eq!(analysis.dominant_state, "stress");
        assert!(analysis.stress_indicator > 60.0);
        assert!(analysis.recommendation.contains("breathing exercise"));
    }

    #[test]
    fn calm_distribution_maps_to_recovery_state() {
        let scores = vec![
            ("Calmness".to_string(), 0.9),
            ("Relief".to_string(), 0.8),
            ("Joy".to_string(), 0.7),
        ];
        let analysis = analyze_migraine_emotions(&scores);
        assert_eq!(analysis.dominant_state, "recovery");
        assert!(analysis.recommendation.contains("gentle activities"));
    }

    #[test]
    fn tool_schema_covers_the_assistant_surface() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"get_forecast"));
        assert!(names.contains(&"log_attack"));
        assert!(names.contains(&"start_intervention"));
    }
}
