//! User row operations

use chrono::Utc;
use migru_common::{HealthStatus, OnboardingStatus, Result, RiskLevel};
use sqlx::SqlitePool;

use crate::models::User;

/// Fetch user by primary key
pub async fn get_user(pool: &SqlitePool, user_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Get existing user by subject id or create a new one
///
/// A fresh analytics row is created alongside a new user, mirroring the
/// 1:1 relationship between users and their KPI snapshot.
pub async fn get_or_create_user(
    pool: &SqlitePool,
    subject_id: &str,
    email: Option<&str>,
) -> Result<User> {
    if let Some(user) = sqlx::query_as::<_, User>("SELECT * FROM users WHERE subject_id = ?")
        .bind(subject_id)
        .fetch_optional(pool)
        .await?
    {
        return Ok(user);
    }

    let now = Utc::now();
    let user_id = sqlx::query(
        r#"
        INSERT INTO users (subject_id, email, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(subject_id)
    .bind(email)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO user_analytics (user_id, last_calculated) VALUES (?, ?)",
    )
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(subject_id = %subject_id, user_id, "Created new user");

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

/// Update current health status, optionally with a new risk level
pub async fn update_status(
    pool: &SqlitePool,
    user_id: i64,
    status: HealthStatus,
    risk_level: Option<RiskLevel>,
) -> Result<()> {
    if let Some(risk) = risk_level {
        sqlx::query(
            "UPDATE users SET current_status = ?, current_risk_level = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(risk)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    } else {
        sqlx::query("UPDATE users SET current_status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(user_id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Store voice baseline metrics on the user row
pub async fn set_baseline(
    pool: &SqlitePool,
    user_id: i64,
    pitch_mean: f64,
    pitch_variance: f64,
    tempo: f64,
    energy: f64,
    jitter: f64,
    shimmer: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            baseline_pitch_mean = ?,
            baseline_pitch_variance = ?,
            baseline_tempo = ?,
            baseline_energy = ?,
            baseline_jitter = ?,
            baseline_shimmer = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(pitch_mean)
    .bind(pitch_variance)
    .bind(tempo)
    .bind(energy)
    .bind(jitter)
    .bind(shimmer)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Advance onboarding status; sets onboarding_completed_at when completed
pub async fn set_onboarding_status(
    pool: &SqlitePool,
    user_id: i64,
    status: OnboardingStatus,
) -> Result<()> {
    let completed_at = if status == OnboardingStatus::Completed {
        Some(Utc::now())
    } else {
        None
    };

    sqlx::query(
        "UPDATE users SET onboarding_status = ?, onboarding_completed_at = COALESCE(?, onboarding_completed_at), updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(completed_at)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}
