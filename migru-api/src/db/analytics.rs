//! Per-user KPI recalculation
//!
//! Recomputes the user_analytics row from the underlying logs and voice
//! sessions. Called after writes that can move a KPI (new log, completed
//! onboarding) and before serving the analytics endpoint.

use chrono::{Duration, Utc};
use migru_common::Result;
use sqlx::SqlitePool;

use super::{logs, voice_sessions};
use crate::models::{User, UserAnalytics};

/// Fetch the analytics row for a user
pub async fn get_analytics(pool: &SqlitePool, user_id: i64) -> Result<Option<UserAnalytics>> {
    let analytics =
        sqlx::query_as::<_, UserAnalytics>("SELECT * FROM user_analytics WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(analytics)
}

/// Recalculate all KPIs for a user and return the fresh snapshot
pub async fn calculate_user_analytics(pool: &SqlitePool, user: &User) -> Result<UserAnalytics> {
    let now = Utc::now();

    // Onboarding completion
    let onboarding_completion_rate = if user.onboarding_completed_at.is_some() {
        100.0
    } else {
        user.onboarding_status.completion_rate()
    };

    // Voice engagement
    let week_ago = now - Duration::days(7);
    let weekly_voice_checkins = voice_sessions::count_sessions_since(pool, user.id, week_ago).await?;
    let total_voice_sessions = voice_sessions::count_sessions(pool, user.id).await?;
    let last_voice_checkin = voice_sessions::latest_session(pool, user.id)
        .await?
        .map(|s| s.started_at);

    // Migraine frequency: rolling 30-day window vs first 30 days on record
    let thirty_days_ago = now - Duration::days(30);
    let current_attack_frequency = logs::count_logs_since(pool, user.id, thirty_days_ago).await? as f64;

    let baseline_end = user.created_at + Duration::days(30);
    let baseline_attacks =
        logs::count_logs_in_window(pool, user.id, user.created_at, baseline_end).await? as f64;

    let mut baseline_attack_frequency = None;
    let mut migraine_reduction_percentage = None;
    let mut achieved_40 = false;
    let mut days_to_40: Option<i64> = None;

    if baseline_attacks > 0.0 {
        baseline_attack_frequency = Some(baseline_attacks);

        let reduction = (baseline_attacks - current_attack_frequency) / baseline_attacks * 100.0;
        migraine_reduction_percentage = Some(reduction.max(0.0));

        if reduction >= 40.0 {
            achieved_40 = true;
            days_to_40 = Some((now - user.created_at).num_days());
        }
    }

    // Preserve an already-achieved milestone and its date
    let previous = get_analytics(pool, user.id).await?;
    if let Some(prev) = &previous {
        if prev.achieved_40_percent_reduction {
            achieved_40 = true;
            days_to_40 = prev.days_to_40_percent_reduction;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO user_analytics (
            user_id, onboarding_completed_at, onboarding_completion_rate,
            weekly_voice_checkins, last_voice_checkin, total_voice_sessions,
            baseline_attack_frequency, current_attack_frequency,
            migraine_reduction_percentage,
            days_to_40_percent_reduction, achieved_40_percent_reduction,
            last_calculated
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            onboarding_completed_at = excluded.onboarding_completed_at,
            onboarding_completion_rate = excluded.onboarding_completion_rate,
            weekly_voice_checkins = excluded.weekly_voice_checkins,
            last_voice_checkin = excluded.last_voice_checkin,
            total_voice_sessions = excluded.total_voice_sessions,
            baseline_attack_frequency = excluded.baseline_attack_frequency,
            current_attack_frequency = excluded.current_attack_frequency,
            migraine_reduction_percentage = excluded.migraine_reduction_percentage,
            days_to_40_percent_reduction = excluded.days_to_40_percent_reduction,
            achieved_40_percent_reduction = excluded.achieved_40_percent_reduction,
            last_calculated = excluded.last_calculated
        "#,
    )
    .bind(user.id)
    .bind(user.onboarding_completed_at)
    .bind(onboarding_completion_rate)
    .bind(weekly_voice_checkins)
    .bind(last_voice_checkin)
    .bind(total_voice_sessions)
    .bind(baseline_attack_frequency)
    .bind(current_attack_frequency)
    .bind(migraine_reduction_percentage)
    .bind(days_to_40)
    .bind(achieved_40)
    .bind(now)
    .execute(pool)
    .await?;

    let analytics =
        sqlx::query_as::<_, UserAnalytics>("SELECT * FROM user_analytics WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(pool)
            .await?;
    Ok(analytics)
}
