//! Health domain enums shared across Migru services
//!
//! All three enums are persisted as TEXT using their wire names, so the
//! database stays readable and compatible with existing Migru data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Migraine phase the user is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum HealthStatus {
    Balanced,
    Prodromal,
    Attack,
    Postdromal,
    Recovery,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Balanced => "Balanced",
            HealthStatus::Prodromal => "Prodromal",
            HealthStatus::Attack => "Attack",
            HealthStatus::Postdromal => "Postdromal",
            HealthStatus::Recovery => "Recovery",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Balanced" => Ok(HealthStatus::Balanced),
            "Prodromal" => Ok(HealthStatus::Prodromal),
            "Attack" => Ok(HealthStatus::Attack),
            "Postdromal" => Ok(HealthStatus::Postdromal),
            "Recovery" => Ok(HealthStatus::Recovery),
            other => Err(Error::InvalidInput(format!("Invalid status: {}", other))),
        }
    }
}

/// 48-hour migraine risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }

    /// Classify a 0-100 risk probability: High >= 70, Moderate >= 40
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 70.0 {
            RiskLevel::High
        } else if probability >= 40.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(RiskLevel::Low),
            "Moderate" => Ok(RiskLevel::Moderate),
            "High" => Ok(RiskLevel::High),
            other => Err(Error::InvalidInput(format!("Invalid risk level: {}", other))),
        }
    }
}

/// Onboarding wizard progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OnboardingStatus {
    NotStarted,
    VoiceBaseline,
    MigraineHistory,
    TonePreference,
    Completed,
}

impl OnboardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStatus::NotStarted => "not_started",
            OnboardingStatus::VoiceBaseline => "voice_baseline",
            OnboardingStatus::MigraineHistory => "migraine_history",
            OnboardingStatus::TonePreference => "tone_preference",
            OnboardingStatus::Completed => "completed",
        }
    }

    /// Partial completion percentage used for the onboarding KPI
    pub fn completion_rate(&self) -> f64 {
        match self {
            OnboardingStatus::NotStarted => 0.0,
            OnboardingStatus::VoiceBaseline => 25.0,
            OnboardingStatus::MigraineHistory => 50.0,
            OnboardingStatus::TonePreference => 75.0,
            OnboardingStatus::Completed => 100.0,
        }
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_round_trip() {
        for s in ["Balanced", "Prodromal", "Attack", "Postdromal", "Recovery"] {
            let status: HealthStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(matches!(
            "balanced".parse::<HealthStatus>(),
            Err(crate::Error::InvalidInput(_))
        ));
    }

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_probability(85.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(55.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(40.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(10.0), RiskLevel::Low);
    }

    #[test]
    fn onboarding_completion_rates() {
        assert_eq!(OnboardingStatus::NotStarted.completion_rate(), 0.0);
        assert_eq!(OnboardingStatus::TonePreference.completion_rate(), 75.0);
        assert_eq!(OnboardingStatus::Completed.completion_rate(), 100.0);
    }

    #[test]
    fn onboarding_wire_names() {
        assert_eq!(OnboardingStatus::VoiceBaseline.as_str(), "voice_baseline");
        let json = serde_json::to_string(&OnboardingStatus::MigraineHistory).unwrap();
        assert_eq!(json, "\"migraine_history\"");
    }
}
