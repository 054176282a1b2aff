//! Database access for migru-api
//!
//! SQLite via sqlx, schema created on startup with idempotent
//! `CREATE TABLE IF NOT EXISTS` statements.

pub mod analytics;
pub mod interventions;
pub mod logs;
pub mod predictions;
pub mod users;
pub mod voice_sessions;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to migru.db in the data directory, creating it if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create an in-memory pool with the full schema (used by tests)
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Initialize the Migru schema
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id TEXT NOT NULL UNIQUE,
            email TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            onboarding_status TEXT NOT NULL DEFAULT 'not_started',
            onboarding_completed_at TEXT,
            baseline_pitch_mean REAL,
            baseline_pitch_variance REAL,
            baseline_tempo REAL,
            baseline_energy REAL,
            baseline_jitter REAL,
            baseline_shimmer REAL,
            tone_preference TEXT NOT NULL DEFAULT 'calm',
            notification_enabled INTEGER NOT NULL DEFAULT 1,
            theme_preference TEXT NOT NULL DEFAULT 'dark',
            current_status TEXT NOT NULL DEFAULT 'Balanced',
            current_hrv INTEGER NOT NULL DEFAULT 65,
            current_risk_level TEXT NOT NULL DEFAULT 'Moderate'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migraine_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            severity INTEGER NOT NULL,
            duration_minutes INTEGER,
            primary_symptoms TEXT NOT NULL DEFAULT '[]',
            secondary_symptoms TEXT NOT NULL DEFAULT '[]',
            triggers TEXT NOT NULL DEFAULT '[]',
            weather_condition TEXT,
            barometric_pressure REAL,
            temperature REAL,
            notes TEXT,
            voice_stress_score REAL,
            voice_tremor_detected INTEGER NOT NULL DEFAULT 0,
            intervention_used TEXT,
            intervention_effectiveness INTEGER,
            status_before TEXT,
            status_after TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voice_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            duration_seconds INTEGER,
            pitch_mean REAL,
            pitch_variance REAL,
            tempo REAL,
            energy_mean REAL,
            jitter REAL,
            shimmer REAL,
            stress_score REAL,
            deviation_from_baseline REAL,
            tremor_detected INTEGER NOT NULL DEFAULT 0,
            hume_top_emotion TEXT,
            hume_emotion_scores TEXT,
            message_count INTEGER NOT NULL DEFAULT 0,
            user_transcript TEXT,
            agent_response TEXT,
            tools_called TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            predicted_for TEXT NOT NULL,
            risk_level TEXT NOT NULL,
            probability REAL NOT NULL,
            confidence REAL NOT NULL,
            temporal_patterns TEXT,
            environmental_factors TEXT,
            physiological_indicators TEXT,
            model_version TEXT NOT NULL DEFAULT 'v1.0',
            actual_occurred INTEGER,
            actual_severity INTEGER,
            prediction_accuracy REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interventions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            delivered_at TEXT NOT NULL,
            intervention_type TEXT NOT NULL,
            content TEXT NOT NULL,
            triggered_by TEXT,
            risk_level_at_delivery TEXT,
            stress_score_at_delivery REAL,
            nlp_patterns TEXT,
            tone_matched INTEGER NOT NULL DEFAULT 0,
            user_engaged INTEGER,
            completion_percentage REAL,
            user_rating INTEGER,
            status_before TEXT,
            status_after TEXT,
            hrv_before INTEGER,
            hrv_after INTEGER,
            stress_reduction REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_analytics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            onboarding_started_at TEXT,
            onboarding_completed_at TEXT,
            onboarding_completion_rate REAL NOT NULL DEFAULT 0.0,
            weekly_voice_checkins INTEGER NOT NULL DEFAULT 0,
            last_voice_checkin TEXT,
            total_voice_sessions INTEGER NOT NULL DEFAULT 0,
            total_interactions INTEGER NOT NULL DEFAULT 0,
            baseline_attack_frequency REAL,
            current_attack_frequency REAL,
            migraine_reduction_percentage REAL,
            days_to_40_percent_reduction INTEGER,
            achieved_40_percent_reduction INTEGER NOT NULL DEFAULT 0,
            nps_score INTEGER,
            last_nps_survey TEXT,
            current_checkin_streak INTEGER NOT NULL DEFAULT 0,
            longest_checkin_streak INTEGER NOT NULL DEFAULT 0,
            last_calculated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Query-path indices
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_logs_user_created ON migraine_logs(user_id, created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user_started ON voice_sessions(user_id, started_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_predictions_user_created ON predictions(user_id, created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_interventions_user_delivered ON interventions(user_id, delivered_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}
