//! Temporal pattern analysis and 48-hour risk prediction
//!
//! Learns from the user's migraine history (time-of-day and day-of-week
//! clustering, barometric pressure correlation) and recent voice sessions
//! (stress, tremor, baseline deviation) to produce a probabilistic
//! 48-hour forecast. Predictions are persisted so their accuracy can be
//! validated once the window passes.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use migru_common::{Result, RiskLevel};

use crate::db::{logs, predictions, voice_sessions};
use crate::models::{MigraineLog, Prediction, User, VoiceSession};

const LOOKBACK_DAYS: i64 = 90;
const PREDICTION_WINDOW_HOURS: i64 = 48;
const MODEL_VERSION: &str = "v1.0";

/// HRV below this is treated as elevated stress
const HRV_RISK_FLOOR: i64 = 55;

/// Time-based risk factors from migraine history
#[derive(Debug, Clone, Serialize)]
pub struct TemporalPatterns {
    pub peak_hour: u32,
    pub peak_day: u32,
    pub current_hour_risk: f64,
    pub current_weekday_risk: f64,
    pub recent_cluster_risk: f64,
    pub total_attacks_analyzed: usize,
}

/// Environmental correlation factors
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentalFactors {
    pub pressure_risk: f64,
    pub high_risk_weather: Option<String>,
}

/// Prodromal signals from recent voice sessions
#[derive(Debug, Clone, Serialize)]
pub struct PhysiologicalIndicators {
    pub avg_stress_score: f64,
    pub tremor_rate: f64,
    pub baseline_deviation: f64,
    pub hrv_risk: f64,
    pub prodromal_detected: bool,
    pub prodromal_confidence: f64,
}

/// Full forecast returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub prediction_id: i64,
    pub risk_level: RiskLevel,
    pub probability: f64,
    pub confidence: f64,
    pub factors: ForecastFactors,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastFactors {
    pub temporal: Value,
    pub environmental: Value,
    pub physiological: Value,
}

/// Outcome of checking a prediction against what actually happened
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Prediction window has not closed yet
    Pending,
    Validated {
        prediction_id: i64,
        predicted_risk: RiskLevel,
        actual_occurred: bool,
        actual_severity: Option<i64>,
        accuracy: f64,
        correct: bool,
    },
}

/// Accuracy metrics over validated predictions
#[derive(Debug, Clone, Serialize)]
pub struct ModelPerformance {
    pub total_predictions: usize,
    pub average_accuracy: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub days_analyzed: i64,
}

/// Generate and persist a 48-hour migraine risk prediction
pub async fn generate_forecast(pool: &SqlitePool, user: &User) -> Result<Forecast> {
    let now = Utc::now();
    let lookback = now - Duration::days(LOOKBACK_DAYS);

    let history = logs::logs_since(pool, user.id, lookback).await?;
    let recent_sessions =
        voice_sessions::sessions_since(pool, user.id, now - Duration::hours(24)).await?;

    let temporal = analyze_temporal(&history, now);
    let environmental = analyze_environmental(&history);
    let physiological = analyze_physiological(&recent_sessions, user.current_hrv);

    let risk_score = risk_score(
        temporal.as_ref(),
        environmental.as_ref(),
        physiological.as_ref(),
    );
    let risk_level = RiskLevel::from_probability(risk_score);

    let session_count = voice_sessions::count_sessions_since(pool, user.id, lookback).await?;
    let confidence = confidence(history.len() as i64, session_count, user.has_baseline());

    let recommendations = forecast_recommendations(risk_level, temporal.as_ref(), environmental.as_ref());

    let temporal_json = factor_json(temporal.as_ref(), "insufficient_data");
    let environmental_json = factor_json(environmental.as_ref(), "no_environmental_data");
    let physiological_json = factor_json(physiological.as_ref(), "no_recent_voice_data");

    // Midpoint of the 48-hour window
    let predicted_for = now + Duration::hours(PREDICTION_WINDOW_HOURS / 2);
    let prediction_id = predictions::insert_prediction(
        pool,
        user.id,
        &predictions::NewPrediction {
            predicted_for,
            risk_level,
            probability: risk_score,
            confidence,
            temporal_patterns: temporal_json.clone(),
            environmental_factors: environmental_json.clone(),
            physiological_indicators: physiological_json.clone(),
            model_version: MODEL_VERSION.to_string(),
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        prediction_id,
        risk = %risk_level,
        probability = risk_score,
        "generated 48h forecast"
    );

    Ok(Forecast {
        prediction_id,
        risk_level,
        probability: risk_score,
        confidence,
        factors: ForecastFactors {
            temporal: temporal_json,
            environmental: environmental_json,
            physiological: physiological_json,
        },
        recommendations,
    })
}

/// Validate a prediction once its window has passed, recording accuracy
pub async fn validate_prediction(
    pool: &SqlitePool,
    prediction: &Prediction,
) -> Result<ValidationResult> {
    let now = Utc::now();
    let window_end = prediction.predicted_for + Duration::hours(24);
    if now < window_end {
        return Ok(ValidationResult::Pending);
    }

    let window_start = prediction.predicted_for - Duration::hours(24);
    let attacks = logs::logs_in_window(pool, prediction.user_id, window_start, window_end).await?;

    let occurred = !attacks.is_empty();
    let severity = attacks.iter().map(|a| a.severity).max();

    let predicted_high_risk = matches!(prediction.risk_level, RiskLevel::High | RiskLevel::Moderate);
    let correct = predicted_high_risk == occurred;
    let accuracy = if correct { 100.0 } else { 0.0 };

    predictions::set_outcome(pool, prediction.id, occurred, severity, accuracy).await?;

    Ok(ValidationResult::Validated {
        prediction_id: prediction.id,
        predicted_risk: prediction.risk_level,
        actual_occurred: occurred,
        actual_severity: severity,
        accuracy,
        correct,
    })
}

/// Accuracy metrics over validated predictions in the last `days`
pub async fn model_performance(
    pool: &SqlitePool,
    user_id: i64,
    days: i64,
) -> Result<Option<ModelPerformance>> {
    let cutoff = Utc::now() - Duration::days(days);
    let validated = predictions::validated_predictions_since(pool, user_id, cutoff).await?;

    if validated.is_empty() {
        return Ok(None);
    }

    let accuracies: Vec<f64> = validated
        .iter()
        .filter_map(|p| p.prediction_accuracy)
        .collect();
    let average_accuracy = accuracies.iter().sum::<f64>() / accuracies.len() as f64;

    let high_risk: Vec<&Prediction> = validated
        .iter()
        .filter(|p| matches!(p.risk_level, RiskLevel::High | RiskLevel::Moderate))
        .collect();
    let true_positives = high_risk
        .iter()
        .filter(|p| p.actual_occurred == Some(true))
        .count();
    let sensitivity = if high_risk.is_empty() {
        0.0
    } else {
        true_positives as f64 / high_risk.len() as f64 * 100.0
    };

    let low_risk: Vec<&Prediction> = validated
        .iter()
        .filter(|p| p.risk_level == RiskLevel::Low)
        .collect();
    let true_negatives = low_risk
        .iter()
        .filter(|p| p.actual_occurred == Some(false))
        .count();
    let specificity = if low_risk.is_empty() {
        0.0
    } else {
        true_negatives as f64 / low_risk.len() as f64 * 100.0
    };

    Ok(Some(ModelPerformance {
        total_predictions: validated.len(),
        average_accuracy: round2(average_accuracy),
        sensitivity: round2(sensitivity),
        specificity: round2(specificity),
        days_analyzed: days,
    }))
}

/// Hour and weekday clustering over the lookback window
fn analyze_temporal(history: &[MigraineLog], now: DateTime<Utc>) -> Option<TemporalPatterns> {
    if history.is_empty() {
        return None;
    }

    let mut hour_counts = [0usize; 24];
    let mut day_counts = [0usize; 7];
    let mut recent_week = 0usize;
    let week_ago = now - Duration::days(7);

    for log in history {
        hour_counts[log.created_at.hour() as usize] += 1;
        day_counts[log.created_at.weekday().num_days_from_monday() as usize] += 1;
        if log.created_at >= week_ago {
            recent_week += 1;
        }
    }

    let peak_hour = argmax(&hour_counts) as u32;
    let peak_day = argmax(&day_counts) as u32;

    let total = history.len() as f64;
    let current_hour_risk = hour_counts[now.hour() as usize] as f64 / total * 100.0;
    let current_weekday_risk =
        day_counts[now.weekday().num_days_from_monday() as usize] as f64 / total * 100.0;

    // Attacks clustering in the last week raise near-term risk
    let recent_cluster_risk = recent_week as f64 / 7.0 * 100.0;

    Some(TemporalPatterns {
        peak_hour,
        peak_day,
        current_hour_risk: round2(current_hour_risk),
        current_weekday_risk: round2(current_weekday_risk),
        recent_cluster_risk: round2(recent_cluster_risk),
        total_attacks_analyzed: history.len(),
    })
}

/// Barometric pressure and weather correlation from logged context
fn analyze_environmental(history: &[MigraineLog]) -> Option<EnvironmentalFactors> {
    let pressures: Vec<f64> = history
        .iter()
        .filter_map(|log| log.barometric_pressure)
        .collect();

    if pressures.is_empty() {
        return None;
    }

    let avg_attack_pressure = pressures.iter().sum::<f64>() / pressures.len() as f64;
    // Standard atmosphere stands in for a live weather feed
    let current_pressure = 1013.25;
    let pressure_risk = (current_pressure - avg_attack_pressure).abs() / avg_attack_pressure * 100.0;

    let mut weather_counts: std::collections::HashMap<&str, usize> = Default::default();
    for log in history {
        if let Some(condition) = log.weather_condition.as_deref() {
            *weather_counts.entry(condition).or_default() += 1;
        }
    }
    let high_risk_weather = weather_counts
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(condition, _)| condition.to_string());

    Some(EnvironmentalFactors {
        pressure_risk: round2(pressure_risk),
        high_risk_weather,
    })
}

/// Prodromal signal detection over the last 24 hours of voice sessions
fn analyze_physiological(
    sessions: &[VoiceSession],
    current_hrv: i64,
) -> Option<PhysiologicalIndicators> {
    if sessions.is_empty() {
        return None;
    }

    let stress_scores: Vec<f64> = sessions.iter().filter_map(|s| s.stress_score).collect();
    let avg_stress = mean(&stress_scores);

    let tremor_count = sessions.iter().filter(|s| s.tremor_detected).count();
    let tremor_rate = tremor_count as f64 / sessions.len() as f64 * 100.0;

    let deviations: Vec<f64> = sessions
        .iter()
        .filter_map(|s| s.deviation_from_baseline)
        .collect();
    let avg_deviation = mean(&deviations);

    let hrv_risk = if current_hrv < HRV_RISK_FLOOR {
        (HRV_RISK_FLOOR - current_hrv) as f64 / HRV_RISK_FLOOR as f64 * 100.0
    } else {
        0.0
    };

    // Two or more elevated indicators mark a likely prodromal phase
    let mut indicators = 0;
    if avg_stress > 60.0 {
        indicators += 1;
    }
    if tremor_rate > 20.0 {
        indicators += 1;
    }
    if avg_deviation > 25.0 {
        indicators += 1;
    }
    if hrv_risk > 30.0 {
        indicators += 1;
    }

    Some(PhysiologicalIndicators {
        avg_stress_score: round2(avg_stress),
        tremor_rate: round2(tremor_rate),
        baseline_deviation: round2(avg_deviation),
        hrv_risk: round2(hrv_risk),
        prodromal_detected: indicators >= 2,
        prodromal_confidence: indicators as f64 / 4.0 * 100.0,
    })
}

/// Weighted combination of factor groups into a 0-100 risk score.
/// Physiological signals carry the most weight.
fn risk_score(
    temporal: Option<&TemporalPatterns>,
    environmental: Option<&EnvironmentalFactors>,
    physiological: Option<&PhysiologicalIndicators>,
) -> f64 {
    let mut score = 0.0;

    if let Some(t) = temporal {
        let temporal_score = t.current_hour_risk * 0.4
            + t.current_weekday_risk * 0.3
            + t.recent_cluster_risk * 0.3;
        score += temporal_score * 0.30;
    }

    if let Some(e) = environmental {
        let env_score = (e.pressure_risk * 2.0).min(100.0);
        score += env_score * 0.25;
    }

    if let Some(p) = physiological {
        let physio_score = p.avg_stress_score * 0.4
            + p.tremor_rate * 0.3
            + p.baseline_deviation * 0.2
            + p.hrv_risk * 0.1;
        score += physio_score * 0.45;
    }

    score.min(100.0)
}

/// Confidence from data availability: logged attacks, voice sessions,
/// and an established baseline.
fn confidence(log_count: i64, session_count: i64, has_baseline: bool) -> f64 {
    let mut confidence = 0.0;

    if log_count >= 5 {
        confidence += (log_count as f64 * 5.0).min(50.0);
    }
    if session_count >= 10 {
        confidence += (session_count as f64 * 2.0).min(30.0);
    }
    if has_baseline {
        confidence += 20.0;
    }

    confidence.min(100.0)
}

fn forecast_recommendations(
    risk_level: RiskLevel,
    temporal: Option<&TemporalPatterns>,
    environmental: Option<&EnvironmentalFactors>,
) -> Vec<String> {
    let mut recs = Vec::new();

    match risk_level {
        RiskLevel::High => {
            recs.push("High migraine risk in next 48h - consider preventive measures".to_string());
            recs.push("Ensure adequate hydration and rest".to_string());
            recs.push("Have rescue medication accessible".to_string());
        }
        RiskLevel::Moderate => {
            recs.push("Moderate risk - monitor for prodromal symptoms".to_string());
            recs.push("Avoid known triggers if possible".to_string());
        }
        RiskLevel::Low => {}
    }

    if let Some(t) = temporal {
        recs.push(format!(
            "Your attacks often occur around {}:00 - plan accordingly",
            t.peak_hour
        ));
    }

    if let Some(e) = environmental {
        if e.pressure_risk > 50.0 {
            recs.push("Barometric pressure changes detected - stay alert".to_string());
        }
    }

    recs
}

/// Serialize a factor group with its status tag, or the missing-data marker
fn factor_json<T: Serialize>(factor: Option<&T>, missing_status: &str) -> Value {
    match factor {
        Some(f) => {
            let mut value = serde_json::to_value(f).unwrap_or(Value::Null);
            if let Some(map) = value.as_object_mut() {
                map.insert("status".to_string(), json!("success"));
            }
            value
        }
        None => json!({ "status": missing_status }),
    }
}

fn argmax(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporal(hour: f64, weekday: f64, cluster: f64) -> TemporalPatterns {
        TemporalPatterns {
            peak_hour: 8,
            peak_day: 0,
            current_hour_risk: hour,
            current_weekday_risk: weekday,
            recent_cluster_risk: cluster,
            total_attacks_analyzed: 10,
        }
    }

    fn physiological(stress: f64, tremor: f64, deviation: f64, hrv: f64) -> PhysiologicalIndicators {
        PhysiologicalIndicators {
            avg_stress_score: stress,
            tremor_rate: tremor,
            baseline_deviation: deviation,
            hrv_risk: hrv,
            prodromal_detected: false,
            prodromal_confidence: 0.0,
        }
    }

    #[test]
    fn risk_score_is_zero_without_data() {
        assert_eq!(risk_score(None, None, None), 0.0);
    }

    #[test]
    fn risk_score_weights_factor_groups() {
        let t = temporal(100.0, 100.0, 100.0);
        let e = EnvironmentalFactors {
            pressure_risk: 50.0,
            high_risk_weather: None,
        };
        let p = physiological(100.0, 100.0, 100.0, 100.0);

        // Each group saturated: 100*0.30 + 100*0.25 + 100*0.45 = 100
        let score = risk_score(Some(&t), Some(&e), Some(&p));
        assert!((score - 100.0).abs() < 1e-9);

        // Physiological alone caps at its 45% weight
        let score = risk_score(None, None, Some(&p));
        assert!((score - 45.0).abs() < 1e-9);
    }

    #[test]
    fn pressure_risk_is_doubled_and_capped() {
        let e = EnvironmentalFactors {
            pressure_risk: 80.0,
            high_risk_weather: None,
        };
        // min(100, 80*2) * 0.25 = 25
        let score = risk_score(None, Some(&e), None);
        assert!((score - 25.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_thresholds() {
        // Below both minimums, no baseline
        assert_eq!(confidence(4, 9, false), 0.0);
        // Logs past the threshold contribute 5 points each, capped at 50
        assert_eq!(confidence(5, 0, false), 25.0);
        assert_eq!(confidence(20, 0, false), 50.0);
        // Sessions contribute 2 points each, capped at 30
        assert_eq!(confidence(0, 10, false), 20.0);
        assert_eq!(confidence(0, 30, false), 30.0);
        // Baseline adds a flat 20
        assert_eq!(confidence(0, 0, true), 20.0);
        assert_eq!(confidence(20, 30, true), 100.0);
    }

    #[test]
    fn prodromal_needs_two_indicators() {
        let sessions: Vec<VoiceSession> = Vec::new();
        assert!(analyze_physiological(&sessions, 65).is_none());
    }

    #[test]
    fn hrv_risk_scales_below_floor() {
        let p = analyze_physiological_hrv_only(40);
        assert!((p - (55.0 - 40.0) / 55.0 * 100.0).abs() < 1e-9);
        assert_eq!(analyze_physiological_hrv_only(65), 0.0);
    }

    fn analyze_physiological_hrv_only(hrv: i64) -> f64 {
        if hrv < HRV_RISK_FLOOR {
            (HRV_RISK_FLOOR - hrv) as f64 / HRV_RISK_FLOOR as f64 * 100.0
        } else {
            0.0
        }
    }

    #[test]
    fn high_risk_recommendations_lead_with_prevention() {
        let recs = forecast_recommendations(RiskLevel::High, None, None);
        assert!(recs[0].contains("High migraine risk"));

        let recs = forecast_recommendations(RiskLevel::Low, None, None);
        assert!(recs.is_empty());
    }

    #[test]
    fn missing_factor_serializes_with_status_marker() {
        let value = factor_json::<TemporalPatterns>(None, "insufficient_data");
        assert_eq!(value["status"], "insufficient_data");

        let t = temporal(10.0, 20.0, 30.0);
        let value = factor_json(Some(&t), "insufficient_data");
        assert_eq!(value["status"], "success");
        assert_eq!(value["peak_hour"], 8);
    }
}
