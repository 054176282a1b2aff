//! Migraine attack logging endpoints

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use migru_common::{HealthStatus, RiskLevel};

use crate::auth::CurrentUser;
use crate::db::{analytics, logs, users};
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct LogAttackRequest {
    pub severity: i64,
    #[serde(default)]
    pub primary_symptoms: Vec<String>,
    #[serde(default)]
    pub secondary_symptoms: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub notes: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LogAttackResponse {
    pub status: &'static str,
    pub log_id: i64,
    pub message: String,
    pub new_status: HealthStatus,
}

#[derive(Debug, Serialize)]
pub struct LogSummary {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub severity: i64,
    pub duration_minutes: Option<i64>,
    pub primary_symptoms: Vec<String>,
    pub secondary_symptoms: Vec<String>,
    pub triggers: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub logs: Vec<LogSummary>,
}

#[derive(Debug, Deserialize)]
pub struct LogListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// Severity drives the automatic status transition: severe attacks also
/// raise the risk level, mild ones mark a prodromal phase.
fn status_for_severity(severity: i64) -> (HealthStatus, Option<RiskLevel>) {
    if severity >= 7 {
        (HealthStatus::Attack, Some(RiskLevel::High))
    } else if severity >= 4 {
        (HealthStatus::Attack, None)
    } else {
        (HealthStatus::Prodromal, None)
    }
}

/// Record an attack, transition the user's status, and refresh KPIs
pub async fn record_attack(
    pool: &SqlitePool,
    user: &User,
    request: &LogAttackRequest,
) -> ApiResult<LogAttackResponse> {
    if !(1..=10).contains(&request.severity) {
        return Err(ApiError::BadRequest(format!(
            "Severity must be 1-10, got {}",
            request.severity
        )));
    }

    let (new_status, new_risk) = status_for_severity(request.severity);

    let log_id = logs::insert_log(
        pool,
        user.id,
        &logs::NewLog {
            severity: request.severity,
            duration_minutes: request.duration_minutes,
            primary_symptoms: request.primary_symptoms.clone(),
            secondary_symptoms: request.secondary_symptoms.clone(),
            triggers: request.triggers.clone(),
            notes: request.notes.clone(),
            voice_stress_score: None,
            voice_tremor_detected: false,
            status_before: Some(user.current_status),
            status_after: Some(new_status),
        },
    )
    .await?;

    users::update_status(pool, user.id, new_status, new_risk).await?;
    analytics::calculate_user_analytics(pool, user).await?;

    tracing::info!(
        user_id = user.id,
        log_id,
        severity = request.severity,
        new_status = %new_status,
        "logged migraine attack"
    );

    Ok(LogAttackResponse {
        status: "success",
        log_id,
        message: format!(
            "Attack logged. Severity {}/10. Status updated to {}",
            request.severity, new_status
        ),
        new_status,
    })
}

pub async fn recent_log_summaries(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> ApiResult<LogListResponse> {
    let logs = logs::recent_logs(pool, user_id, limit).await?;
    Ok(LogListResponse {
        logs: logs
            .into_iter()
            .map(|log| LogSummary {
                id: log.id,
                date: log.created_at,
                severity: log.severity,
                duration_minutes: log.duration_minutes,
                primary_symptoms: log.primary_symptoms.0,
                secondary_symptoms: log.secondary_symptoms.0,
                triggers: log.triggers.0,
                notes: log.notes,
            })
            .collect(),
    })
}

/// POST /api/logs
pub async fn log_attack(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<LogAttackRequest>,
) -> ApiResult<Json<LogAttackResponse>> {
    Ok(Json(record_attack(&state.db, &user, &request).await?))
}

/// GET /api/logs
pub async fn get_recent_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LogListQuery>,
) -> ApiResult<Json<LogListResponse>> {
    Ok(Json(
        recent_log_summaries(&state.db, user.id, query.limit).await?,
    ))
}

pub fn log_routes() -> Router<AppState> {
    Router::new().route("/api/logs", get(get_recent_logs).post(log_attack))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_drives_status_transition() {
        assert_eq!(
            status_for_severity(9),
            (HealthStatus::Attack, Some(RiskLevel::High))
        );
        assert_eq!(status_for_severity(7), (HealthStatus::Attack, Some(RiskLevel::High)));
        assert_eq!(status_for_severity(5), (HealthStatus::Attack, None));
        assert_eq!(status_for_severity(3), (HealthStatus::Prodromal, None));
        assert_eq!(status_for_severity(1), (HealthStatus::Prodromal, None));
    }
}
