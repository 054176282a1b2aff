//! Intervention row operations

use chrono::Utc;
use migru_common::{HealthStatus, Result, RiskLevel};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::Intervention;

/// Fields captured when delivering an intervention
#[derive(Debug, Clone)]
pub struct NewIntervention {
    pub intervention_type: String,
    pub content: String,
    pub triggered_by: String,
    pub risk_level_at_delivery: RiskLevel,
    pub stress_score_at_delivery: f64,
    pub nlp_patterns: Vec<String>,
    pub tone_matched: bool,
    pub status_before: HealthStatus,
    pub hrv_before: i64,
}

/// Insert a delivered intervention, returning its row id
pub async fn insert_intervention(
    pool: &SqlitePool,
    user_id: i64,
    intervention: &NewIntervention,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO interventions (
            user_id, delivered_at, intervention_type, content,
            triggered_by, risk_level_at_delivery, stress_score_at_delivery,
            nlp_patterns, tone_matched, status_before, hrv_before
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(&intervention.intervention_type)
    .bind(&intervention.content)
    .bind(&intervention.triggered_by)
    .bind(intervention.risk_level_at_delivery)
    .bind(intervention.stress_score_at_delivery)
    .bind(Json(&intervention.nlp_patterns))
    .bind(intervention.tone_matched)
    .bind(intervention.status_before)
    .bind(intervention.hrv_before)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Fetch an intervention owned by the given user
pub async fn get_intervention(
    pool: &SqlitePool,
    user_id: i64,
    intervention_id: i64,
) -> Result<Option<Intervention>> {
    let intervention = sqlx::query_as::<_, Intervention>(
        "SELECT * FROM interventions WHERE id = ? AND user_id = ?",
    )
    .bind(intervention_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(intervention)
}

/// Record outcome data for a delivered intervention
pub async fn set_outcome(
    pool: &SqlitePool,
    intervention_id: i64,
    engaged: bool,
    completion_percentage: f64,
    rating: Option<i64>,
    status_after: HealthStatus,
    hrv_after: i64,
    stress_reduction: Option<f64>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE interventions SET
            user_engaged = ?,
            completion_percentage = ?,
            user_rating = ?,
            status_after = ?,
            hrv_after = ?,
            stress_reduction = ?
        WHERE id = ?
        "#,
    )
    .bind(engaged)
    .bind(completion_percentage)
    .bind(rating)
    .bind(status_after)
    .bind(hrv_after)
    .bind(stress_reduction)
    .bind(intervention_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// A top-rated intervention type with its usage count
#[derive(Debug, Clone, Serialize)]
pub struct RatedIntervention {
    #[serde(rename = "type")]
    pub intervention_type: String,
    pub rating: i64,
    pub times_used: i64,
}

/// Highest-rated interventions for a user with per-type usage counts
pub async fn best_interventions(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<RatedIntervention>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT intervention_type, user_rating
        FROM interventions
        WHERE user_id = ? AND user_rating IS NOT NULL
        ORDER BY user_rating DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut best = Vec::with_capacity(rows.len());
    for (intervention_type, rating) in rows {
        let times_used: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interventions WHERE user_id = ? AND intervention_type = ?",
        )
        .bind(user_id)
        .bind(&intervention_type)
        .fetch_one(pool)
        .await?;

        best.push(RatedIntervention {
            intervention_type,
            rating,
            times_used,
        });
    }

    Ok(best)
}
