//! Database row models
//!
//! One struct per persisted table. JSON-blob columns (symptom lists,
//! factor breakdowns, emotion distributions) use `sqlx::types::Json` so
//! they serialize transparently in API responses.

use chrono::{DateTime, Utc};
use migru_common::{HealthStatus, OnboardingStatus, RiskLevel};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;

/// User row, keyed externally by the bearer-token subject id
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub subject_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Onboarding
    pub onboarding_status: OnboardingStatus,
    pub onboarding_completed_at: Option<DateTime<Utc>>,

    // Voice baseline (established during onboarding)
    pub baseline_pitch_mean: Option<f64>,
    pub baseline_pitch_variance: Option<f64>,
    pub baseline_tempo: Option<f64>,
    pub baseline_energy: Option<f64>,
    pub baseline_jitter: Option<f64>,
    pub baseline_shimmer: Option<f64>,

    // Preferences
    pub tone_preference: String,
    pub notification_enabled: bool,
    pub theme_preference: String,

    // Current health state
    pub current_status: HealthStatus,
    pub current_hrv: i64,
    pub current_risk_level: RiskLevel,
}

impl User {
    /// Whether a voice baseline has been captured
    pub fn has_baseline(&self) -> bool {
        self.baseline_pitch_mean.is_some()
    }
}

/// Individual migraine attack record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MigraineLog {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,

    pub severity: i64,
    pub duration_minutes: Option<i64>,

    pub primary_symptoms: Json<Vec<String>>,
    pub secondary_symptoms: Json<Vec<String>>,
    pub triggers: Json<Vec<String>>,

    // Environmental context at time of attack
    pub weather_condition: Option<String>,
    pub barometric_pressure: Option<f64>,
    pub temperature: Option<f64>,

    pub notes: Option<String>,

    // Voice biomarkers at time of logging
    pub voice_stress_score: Option<f64>,
    pub voice_tremor_detected: bool,

    pub intervention_used: Option<String>,
    pub intervention_effectiveness: Option<i64>,

    pub status_before: Option<HealthStatus>,
    pub status_after: Option<HealthStatus>,
}

/// Voice interaction session with biomarker analysis
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VoiceSession {
    pub id: i64,
    pub user_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,

    // Voice biomarkers
    pub pitch_mean: Option<f64>,
    pub pitch_variance: Option<f64>,
    pub tempo: Option<f64>,
    pub energy_mean: Option<f64>,
    pub jitter: Option<f64>,
    pub shimmer: Option<f64>,

    // Computed stress indicators
    pub stress_score: Option<f64>,
    pub deviation_from_baseline: Option<f64>,
    pub tremor_detected: bool,

    // Hume emotion analysis
    pub hume_top_emotion: Option<String>,
    pub hume_emotion_scores: Option<Json<Value>>,

    // Conversation metadata
    pub message_count: i64,
    pub user_transcript: Option<String>,
    pub agent_response: Option<String>,
    pub tools_called: Json<Vec<String>>,
}

/// 48-hour migraine prediction from the pattern recognition agent
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Prediction {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub predicted_for: DateTime<Utc>,

    pub risk_level: RiskLevel,
    pub probability: f64,
    pub confidence: f64,

    // Contributing factor breakdowns
    pub temporal_patterns: Option<Json<Value>>,
    pub environmental_factors: Option<Json<Value>>,
    pub physiological_indicators: Option<Json<Value>>,

    pub model_version: String,

    // Outcome tracking, filled in after the prediction window passes
    pub actual_occurred: Option<bool>,
    pub actual_severity: Option<i64>,
    pub prediction_accuracy: Option<f64>,
}

/// Delivered intervention with efficacy tracking
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Intervention {
    pub id: i64,
    pub user_id: i64,
    pub delivered_at: DateTime<Utc>,

    pub intervention_type: String,
    pub content: String,

    pub triggered_by: Option<String>,
    pub risk_level_at_delivery: Option<RiskLevel>,
    pub stress_score_at_delivery: Option<f64>,

    pub nlp_patterns: Option<Json<Vec<String>>>,
    pub tone_matched: bool,

    // Efficacy tracking
    pub user_engaged: Option<bool>,
    pub completion_percentage: Option<f64>,
    pub user_rating: Option<i64>,

    // Outcome
    pub status_before: Option<HealthStatus>,
    pub status_after: Option<HealthStatus>,
    pub hrv_before: Option<i64>,
    pub hrv_after: Option<i64>,
    pub stress_reduction: Option<f64>,
}

/// Per-user KPI snapshot, recalculated on demand
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserAnalytics {
    pub id: i64,
    pub user_id: i64,

    pub onboarding_started_at: Option<DateTime<Utc>>,
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    pub onboarding_completion_rate: f64,

    pub weekly_voice_checkins: i64,
    pub last_voice_checkin: Option<DateTime<Utc>>,
    pub total_voice_sessions: i64,
    pub total_interactions: i64,

    pub baseline_attack_frequency: Option<f64>,
    pub current_attack_frequency: Option<f64>,
    pub migraine_reduction_percentage: Option<f64>,

    pub days_to_40_percent_reduction: Option<i64>,
    pub achieved_40_percent_reduction: bool,

    pub nps_score: Option<i64>,
    pub last_nps_survey: Option<DateTime<Utc>>,

    pub current_checkin_streak: i64,
    pub longest_checkin_streak: i64,

    pub last_calculated: DateTime<Utc>,
}
