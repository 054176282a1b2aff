//! # Migru Common Library
//!
//! Shared code for the Migru backend services:
//! - Health domain enums (status, risk level, onboarding)
//! - Error types
//! - Configuration loading and data directory resolution

pub mod config;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{HealthStatus, OnboardingStatus, RiskLevel};
