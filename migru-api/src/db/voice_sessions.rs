//! Voice session operations

use chrono::{DateTime, Utc};
use migru_common::Result;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::agents::voice_analysis::VoiceFeatures;
use crate::models::VoiceSession;

/// Insert a voice session from an analysis pass, returning its row id
pub async fn insert_session(
    pool: &SqlitePool,
    user_id: i64,
    features: &VoiceFeatures,
    stress_score: f64,
    deviation_from_baseline: f64,
    tremor_detected: bool,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO voice_sessions (
            user_id, started_at,
            pitch_mean, pitch_variance, tempo, energy_mean, jitter, shimmer,
            stress_score, deviation_from_baseline, tremor_detected
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(features.pitch_mean)
    .bind(features.pitch_variance)
    .bind(features.tempo)
    .bind(features.energy_mean)
    .bind(features.jitter)
    .bind(features.shimmer)
    .bind(stress_score)
    .bind(deviation_from_baseline)
    .bind(tremor_detected)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Fetch a session owned by the given user
pub async fn get_session(
    pool: &SqlitePool,
    user_id: i64,
    session_id: i64,
) -> Result<Option<VoiceSession>> {
    let session = sqlx::query_as::<_, VoiceSession>(
        "SELECT * FROM voice_sessions WHERE id = ? AND user_id = ?",
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(session)
}

/// Latest session for a user, if any
pub async fn latest_session(pool: &SqlitePool, user_id: i64) -> Result<Option<VoiceSession>> {
    let session = sqlx::query_as::<_, VoiceSession>(
        "SELECT * FROM voice_sessions WHERE user_id = ? ORDER BY started_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(session)
}

/// Sessions since a cutoff, oldest first
pub async fn sessions_since(
    pool: &SqlitePool,
    user_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<Vec<VoiceSession>> {
    let sessions = sqlx::query_as::<_, VoiceSession>(
        "SELECT * FROM voice_sessions WHERE user_id = ? AND started_at >= ? ORDER BY started_at",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(sessions)
}

/// Count of sessions since a cutoff
pub async fn count_sessions_since(
    pool: &SqlitePool,
    user_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM voice_sessions WHERE user_id = ? AND started_at >= ?",
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Total session count for a user
pub async fn count_sessions(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM voice_sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Store Hume emotion results on a session
pub async fn set_emotion_scores(
    pool: &SqlitePool,
    session_id: i64,
    top_emotion: &str,
    scores: &serde_json::Value,
) -> Result<()> {
    sqlx::query(
        "UPDATE voice_sessions SET hume_top_emotion = ?, hume_emotion_scores = ? WHERE id = ?",
    )
    .bind(top_emotion)
    .bind(Json(scores))
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Conversation metadata synced back from Hume at session end
#[derive(Debug, Clone, Default)]
pub struct SessionMetadata {
    pub duration_seconds: Option<i64>,
    pub message_count: Option<i64>,
    pub user_transcript: Option<String>,
    pub agent_response: Option<String>,
    pub tools_called: Option<Vec<String>>,
}

/// Apply end-of-session metadata and stamp ended_at
pub async fn set_session_metadata(
    pool: &SqlitePool,
    session_id: i64,
    metadata: &SessionMetadata,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE voice_sessions SET
            duration_seconds = COALESCE(?, duration_seconds),
            message_count = COALESCE(?, message_count),
            user_transcript = COALESCE(?, user_transcript),
            agent_response = COALESCE(?, agent_response),
            tools_called = COALESCE(?, tools_called),
            ended_at = ?
        WHERE id = ?
        "#,
    )
    .bind(metadata.duration_seconds)
    .bind(metadata.message_count)
    .bind(&metadata.user_transcript)
    .bind(&metadata.agent_response)
    .bind(metadata.tools_called.as_ref().map(Json))
    .bind(Utc::now())
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(())
}
