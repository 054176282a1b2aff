//! Migraine log operations

use chrono::{DateTime, Utc};
use migru_common::{HealthStatus, Result};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::MigraineLog;

/// Fields captured when logging an attack
#[derive(Debug, Clone)]
pub struct NewLog {
    pub severity: i64,
    pub duration_minutes: Option<i64>,
    pub primary_symptoms: Vec<String>,
    pub secondary_symptoms: Vec<String>,
    pub triggers: Vec<String>,
    pub notes: Option<String>,
    pub voice_stress_score: Option<f64>,
    pub voice_tremor_detected: bool,
    pub status_before: Option<HealthStatus>,
    pub status_after: Option<HealthStatus>,
}

/// Insert a migraine log, returning its row id
pub async fn insert_log(pool: &SqlitePool, user_id: i64, log: &NewLog) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO migraine_logs (
            user_id, created_at, severity, duration_minutes,
            primary_symptoms, secondary_symptoms, triggers, notes,
            voice_stress_score, voice_tremor_detected,
            status_before, status_after
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(log.severity)
    .bind(log.duration_minutes)
    .bind(Json(&log.primary_symptoms))
    .bind(Json(&log.secondary_symptoms))
    .bind(Json(&log.triggers))
    .bind(&log.notes)
    .bind(log.voice_stress_score)
    .bind(log.voice_tremor_detected)
    .bind(log.status_before)
    .bind(log.status_after)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Most recent logs for a user, newest first
pub async fn recent_logs(pool: &SqlitePool, user_id: i64, limit: i64) -> Result<Vec<MigraineLog>> {
    let logs = sqlx::query_as::<_, MigraineLog>(
        "SELECT * FROM migraine_logs WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(logs)
}

/// All logs for a user since a cutoff, oldest first
pub async fn logs_since(
    pool: &SqlitePool,
    user_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<Vec<MigraineLog>> {
    let logs = sqlx::query_as::<_, MigraineLog>(
        "SELECT * FROM migraine_logs WHERE user_id = ? AND created_at >= ? ORDER BY created_at",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(logs)
}

/// Logs inside a closed time window, used for prediction validation
pub async fn logs_in_window(
    pool: &SqlitePool,
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<MigraineLog>> {
    let logs = sqlx::query_as::<_, MigraineLog>(
        "SELECT * FROM migraine_logs WHERE user_id = ? AND created_at >= ? AND created_at <= ? ORDER BY created_at",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(logs)
}

/// Total log count for a user
pub async fn count_logs(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migraine_logs WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Count of logs since a cutoff
pub async fn count_logs_since(
    pool: &SqlitePool,
    user_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM migraine_logs WHERE user_id = ? AND created_at >= ?",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Count of logs in a closed window
pub async fn count_logs_in_window(
    pool: &SqlitePool,
    user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM migraine_logs WHERE user_id = ? AND created_at >= ? AND created_at <= ?",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
