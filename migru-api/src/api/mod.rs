//! HTTP API handlers

pub mod analytics;
pub mod forecast;
pub mod health;
pub mod hume;
pub mod interventions;
pub mod logs;
pub mod onboarding;
pub mod status;
pub mod voice;

pub use analytics::analytics_routes;
pub use forecast::forecast_routes;
pub use health::health_routes;
pub use hume::hume_routes;
pub use interventions::intervention_routes;
pub use logs::log_routes;
pub use onboarding::onboarding_routes;
pub use status::status_routes;
pub use voice::voice_routes;
