//! User analytics endpoint

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::db::analytics;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/analytics
///
/// Recalculates KPIs before serving the grouped snapshot.
pub async fn get_analytics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    let analytics = analytics::calculate_user_analytics(&state.db, &user).await?;

    Ok(Json(json!({
        "onboarding": {
            "status": user.onboarding_status,
            "completion_rate": analytics.onboarding_completion_rate,
            "completed_at": analytics.onboarding_completed_at
        },
        "engagement": {
            "weekly_voice_checkins": analytics.weekly_voice_checkins,
            "total_voice_sessions": analytics.total_voice_sessions,
            "last_checkin": analytics.last_voice_checkin,
            "current_streak": analytics.current_checkin_streak,
            "longest_streak": analytics.longest_checkin_streak
        },
        "health_outcomes": {
            "baseline_attack_frequency": analytics.baseline_attack_frequency,
            "current_attack_frequency": analytics.current_attack_frequency,
            "migraine_reduction_percentage": analytics.migraine_reduction_percentage,
            "achieved_40_percent_reduction": analytics.achieved_40_percent_reduction,
            "days_to_40_percent_reduction": analytics.days_to_40_percent_reduction
        },
        "nps": {
            "score": analytics.nps_score,
            "last_survey": analytics.last_nps_survey
        }
    })))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/api/analytics", get(get_analytics))
}
