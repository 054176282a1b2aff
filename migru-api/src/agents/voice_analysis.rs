//! Voice biomarker analysis
//!
//! Extracts vocal features from raw PCM audio and compares them to the
//! user's baseline to detect stress and potential migraine prodrome:
//! - Pitch proxy via zero-crossing rate, clamped to the voice band
//! - Tempo proxy from envelope peak counting
//! - RMS energy
//! - Jitter (frame-level pitch stability)
//! - Shimmer (frame-level amplitude stability)
//! - Micro-tremor detection (4-12 Hz envelope modulation)
//!
//! Lightweight signal processing only; audio arrives as mono f32 samples.

use serde::Serialize;

use crate::models::User;

/// Hume EVI streams 24 kHz audio
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Minimum speech duration for a meaningful analysis pass
const MIN_SPEECH_SECONDS: f64 = 2.0;

/// Voiced speech fundamental range (Hz); ZCR estimates outside it are noise
const PITCH_FLOOR_HZ: f64 = 80.0;
const PITCH_CEIL_HZ: f64 = 300.0;
const PITCH_FALLBACK_HZ: f64 = 150.0;

/// Envelope modulation band associated with vocal micro-tremor
const TREMOR_BAND_LOW_HZ: f64 = 4.0;
const TREMOR_BAND_HIGH_HZ: f64 = 12.0;
const TREMOR_POWER_RATIO: f64 = 0.1;

/// Envelope sample rate after decimation, ample for the 4-12 Hz band
const ENVELOPE_RATE_HZ: u32 = 100;

/// Extracted vocal biomarkers for one audio chunk
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceFeatures {
    /// Estimated fundamental frequency (Hz)
    pub pitch_mean: f64,
    /// Frame-level pitch spread (Hz)
    pub pitch_variance: f64,
    /// Envelope peaks per minute (syllable-rate proxy)
    pub tempo: f64,
    /// RMS amplitude
    pub energy_mean: f64,
    /// Frame-level pitch standard deviation (vocal stability)
    pub jitter: f64,
    /// Frame-level energy standard deviation (amplitude variation)
    pub shimmer: f64,
}

/// User baseline captured during onboarding
#[derive(Debug, Clone, Copy, Default)]
pub struct Baseline {
    pub pitch_mean: Option<f64>,
    pub pitch_variance: Option<f64>,
    pub tempo: Option<f64>,
    pub energy: Option<f64>,
    pub jitter: Option<f64>,
    pub shimmer: Option<f64>,
}

impl Baseline {
    pub fn from_user(user: &User) -> Self {
        Self {
            pitch_mean: user.baseline_pitch_mean,
            pitch_variance: user.baseline_pitch_variance,
            tempo: user.baseline_tempo,
            energy: user.baseline_energy,
            jitter: user.baseline_jitter,
            shimmer: user.baseline_shimmer,
        }
    }

    pub fn is_established(&self) -> bool {
        self.pitch_mean.is_some()
    }
}

/// Voice biomarker analyzer over mono f32 PCM
#[derive(Debug, Clone, Copy)]
pub struct VoiceAnalyzer {
    sample_rate: u32,
}

impl Default for VoiceAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl VoiceAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Whether the chunk is long enough to analyze
    pub fn has_enough_speech(&self, audio: &[f32]) -> bool {
        audio.len() as f64 >= self.sample_rate as f64 * MIN_SPEECH_SECONDS
    }

    /// Extract vocal biomarkers from an audio chunk
    pub fn extract_features(&self, audio: &[f32]) -> VoiceFeatures {
        let energy = rms(audio);

        // Pitch proxy from zero-crossing rate. A rough estimate, but stable
        // enough for baseline-relative comparison.
        let zcr_hz = zero_crossing_rate(audio) * self.sample_rate as f64;
        let pitch_estimate = clamp_pitch(zcr_hz / 2.0);

        // Frame-level stability over 30 ms frames
        let frame_len = (0.03 * self.sample_rate as f64) as usize;
        let mut frame_pitches = Vec::new();
        let mut frame_energies = Vec::new();
        for frame in audio.chunks_exact(frame_len) {
            frame_pitches.push(zero_crossing_rate(frame) * self.sample_rate as f64 / 2.0);
            frame_energies.push(rms(frame));
        }
        let jitter = std_dev(&frame_pitches);
        let shimmer = std_dev(&frame_energies);

        // Tempo proxy: peaks of the smoothed envelope per minute
        let window = (0.1 * self.sample_rate as f64) as usize;
        let envelope = smoothed_envelope(audio, window.max(1));
        let peaks = count_peaks(&envelope);
        let duration_secs = audio.len() as f64 / self.sample_rate as f64;
        let tempo = if duration_secs > 0.0 {
            peaks as f64 / duration_secs * 60.0
        } else {
            0.0
        };

        VoiceFeatures {
            pitch_mean: pitch_estimate,
            pitch_variance: jitter,
            tempo,
            energy_mean: energy,
            jitter,
            shimmer,
        }
    }

    /// Mean percentage deviation from the user baseline across pitch,
    /// tempo, and energy. Zero when no baseline is established.
    pub fn baseline_deviation(&self, features: &VoiceFeatures, baseline: &Baseline) -> f64 {
        if !baseline.is_established() {
            return 0.0;
        }

        let mut deviations = Vec::new();

        if let Some(pitch) = baseline.pitch_mean.filter(|p| *p > 0.0) {
            deviations.push((features.pitch_mean - pitch).abs() / pitch * 100.0);
        }
        if let Some(tempo) = baseline.tempo.filter(|t| *t > 0.0) {
            deviations.push((features.tempo - tempo).abs() / tempo * 100.0);
        }
        if let Some(energy) = baseline.energy.filter(|e| *e > 0.0) {
            deviations.push((features.energy_mean - energy).abs() / energy * 100.0);
        }

        mean(&deviations)
    }

    /// Stress score 0-100 from baseline-relative changes.
    ///
    /// Higher pitch, faster/erratic tempo, and increased jitter or shimmer
    /// each contribute a capped amount.
    pub fn stress_score(&self, features: &VoiceFeatures, baseline: &Baseline) -> f64 {
        let mut score: f64 = 0.0;

        if let Some(pitch) = baseline.pitch_mean.filter(|p| *p > 0.0) {
            let pitch_increase = (features.pitch_mean - pitch) / pitch;
            score += (pitch_increase * 100.0).clamp(0.0, 30.0);
        }

        if let Some(jitter) = baseline.jitter.filter(|j| *j > 0.0) {
            let jitter_increase = (features.jitter - jitter) / jitter;
            score += (jitter_increase * 100.0).clamp(0.0, 30.0);
        }

        if let Some(tempo) = baseline.tempo.filter(|t| *t > 0.0) {
            let tempo_change = (features.tempo - tempo).abs() / tempo;
            score += (tempo_change * 50.0).clamp(0.0, 20.0);
        }

        if let Some(shimmer) = baseline.shimmer.filter(|s| *s > 0.0) {
            let shimmer_increase = (features.shimmer - shimmer) / shimmer;
            score += (shimmer_increase * 100.0).clamp(0.0, 20.0);
        }

        score.min(100.0)
    }

    /// Detect micro-tremor: >10% of total envelope power in the
    /// 4-12 Hz band.
    ///
    /// The amplitude envelope is smoothed, decimated to 100 Hz, then
    /// scanned with a direct DFT. Total power includes the DC bin, so a
    /// flat envelope keeps the band ratio near zero.
    pub fn detect_tremor(&self, audio: &[f32]) -> bool {
        let window = (0.05 * self.sample_rate as f64) as usize;
        let envelope = smoothed_envelope(audio, window.max(1));

        let decim = (self.sample_rate / ENVELOPE_RATE_HZ).max(1) as usize;
        let decimated: Vec<f64> = envelope
            .chunks(decim)
            .map(|c| c.iter().map(|s| *s as f64).sum::<f64>() / c.len() as f64)
            .collect();

        let n = decimated.len();
        if n < 2 {
            return false;
        }

        let bin_hz = ENVELOPE_RATE_HZ as f64 / n as f64;
        let mut band_power = 0.0;
        let mut total_power = dft_bin_power(&decimated, 0);
        for k in 1..=n / 2 {
            let freq = k as f64 * bin_hz;
            let power = dft_bin_power(&decimated, k);
            total_power += power;
            if (TREMOR_BAND_LOW_HZ..=TREMOR_BAND_HIGH_HZ).contains(&freq) {
                band_power += power;
            }
        }

        total_power > 0.0 && band_power / total_power > TREMOR_POWER_RATIO
    }

    /// Slope of stress scores via least-squares regression.
    /// Input: (session index, stress score) pairs in chronological order.
    pub fn trend_slope(points: &[(f64, f64)]) -> Option<f64> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let mut num = 0.0;
        let mut den = 0.0;
        for (x, y) in points {
            num += (x - mean_x) * (y - mean_y);
            den += (x - mean_x) * (x - mean_x);
        }

        if den == 0.0 {
            return None;
        }
        Some(num / den)
    }

    /// Average features across baseline recording chunks. Chunks shorter
    /// than the minimum speech duration are skipped; returns None when no
    /// chunk qualifies.
    pub fn average_baseline(&self, chunks: &[Vec<f32>]) -> Option<VoiceFeatures> {
        let features: Vec<VoiceFeatures> = chunks
            .iter()
            .filter(|c| self.has_enough_speech(c))
            .map(|c| self.extract_features(c))
            .collect();

        if features.is_empty() {
            return None;
        }

        let n = features.len() as f64;
        Some(VoiceFeatures {
            pitch_mean: features.iter().map(|f| f.pitch_mean).sum::<f64>() / n,
            pitch_variance: features.iter().map(|f| f.pitch_variance).sum::<f64>() / n,
            tempo: features.iter().map(|f| f.tempo).sum::<f64>() / n,
            energy_mean: features.iter().map(|f| f.energy_mean).sum::<f64>() / n,
            jitter: features.iter().map(|f| f.jitter).sum::<f64>() / n,
            shimmer: features.iter().map(|f| f.shimmer).sum::<f64>() / n,
        })
    }
}

/// Recommendations for an analysis pass
pub fn recommendations(stress_score: f64, tremor_detected: bool) -> Vec<String> {
    let mut recs = Vec::new();

    if stress_score > 70.0 {
        recs.push("High stress detected - consider a breathing exercise".to_string());
    } else if stress_score > 50.0 {
        recs.push("Moderate stress - may benefit from a short break".to_string());
    }

    if tremor_detected {
        recs.push("Vocal tremor detected - possible prodromal phase, stay hydrated".to_string());
    }

    recs
}

fn clamp_pitch(estimate: f64) -> f64 {
    if (PITCH_FLOOR_HZ..=PITCH_CEIL_HZ).contains(&estimate) {
        estimate
    } else {
        PITCH_FALLBACK_HZ
    }
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Sign changes per sample
fn zero_crossing_rate(samples: &[f32]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / samples.len() as f64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Moving-average smoothed amplitude envelope (prefix sums, O(n))
fn smoothed_envelope(samples: &[f32], window: usize) -> Vec<f32> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mut prefix = Vec::with_capacity(n + 1);
    let mut running = 0.0f64;
    prefix.push(running);
    for s in samples {
        running += s.abs() as f64;
        prefix.push(running);
    }

    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            ((prefix[hi] - prefix[lo]) / (hi - lo) as f64) as f32
        })
        .collect()
}

/// Local maxima in a signal
fn count_peaks(signal: &[f32]) -> usize {
    signal
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2])
        .count()
}

/// Power of DFT bin k for a real signal
fn dft_bin_power(signal: &[f64], k: usize) -> f64 {
    let n = signal.len() as f64;
    let mut re = 0.0;
    let mut im = 0.0;
    for (i, s) in signal.iter().enumerate() {
        let angle = -2.0 * std::f64::consts::PI * k as f64 * i as f64 / n;
        re += s * angle.cos();
        im += s * angle.sin();
    }
    re * re + im * im
}
