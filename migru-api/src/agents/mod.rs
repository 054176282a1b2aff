//! Deterministic heuristic agents behind the API surface

pub mod hume;
pub mod intervention;
pub mod pattern_recognition;
pub mod voice_analysis;
