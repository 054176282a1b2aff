//! Prediction row operations

use chrono::{DateTime, Utc};
use migru_common::{Result, RiskLevel};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::Prediction;

/// Fields captured when persisting a new prediction
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub predicted_for: DateTime<Utc>,
    pub risk_level: RiskLevel,
    pub probability: f64,
    pub confidence: f64,
    pub temporal_patterns: serde_json::Value,
    pub environmental_factors: serde_json::Value,
    pub physiological_indicators: serde_json::Value,
    pub model_version: String,
}

/// Insert a prediction, returning its row id
pub async fn insert_prediction(
    pool: &SqlitePool,
    user_id: i64,
    prediction: &NewPrediction,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO predictions (
            user_id, created_at, predicted_for, risk_level,
            probability, confidence,
            temporal_patterns, environmental_factors, physiological_indicators,
            model_version
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(prediction.predicted_for)
    .bind(prediction.risk_level)
    .bind(prediction.probability)
    .bind(prediction.confidence)
    .bind(Json(&prediction.temporal_patterns))
    .bind(Json(&prediction.environmental_factors))
    .bind(Json(&prediction.physiological_indicators))
    .bind(&prediction.model_version)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Fetch a prediction owned by the given user
pub async fn get_prediction(
    pool: &SqlitePool,
    user_id: i64,
    prediction_id: i64,
) -> Result<Option<Prediction>> {
    let prediction =
        sqlx::query_as::<_, Prediction>("SELECT * FROM predictions WHERE id = ? AND user_id = ?")
            .bind(prediction_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(prediction)
}

/// Record the observed outcome for a prediction
pub async fn set_outcome(
    pool: &SqlitePool,
    prediction_id: i64,
    occurred: bool,
    severity: Option<i64>,
    accuracy: f64,
) -> Result<()> {
    sqlx::query(
        "UPDATE predictions SET actual_occurred = ?, actual_severity = ?, prediction_accuracy = ? WHERE id = ?",
    )
    .bind(occurred)
    .bind(severity)
    .bind(accuracy)
    .bind(prediction_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Validated predictions (accuracy recorded) since a cutoff
pub async fn validated_predictions_since(
    pool: &SqlitePool,
    user_id: i64,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Prediction>> {
    let predictions = sqlx::query_as::<_, Prediction>(
        r#"
        SELECT * FROM predictions
        WHERE user_id = ? AND created_at >= ? AND prediction_accuracy IS NOT NULL
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(predictions)
}
