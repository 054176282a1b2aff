//! Therapeutic intervention delivery
//!
//! Selects a technique from the current state (stress score, risk level,
//! prodromal flag), renders a guided script using Milton Model language
//! patterns, and records the delivery so outcomes can be rated and the
//! best-performing techniques surfaced later.

use rand::seq::SliceRandom;
use serde::Serialize;
use sqlx::SqlitePool;

use migru_common::{Result, RiskLevel};

use crate::db::interventions::{self, NewIntervention};
use crate::models::User;

const PRESUPPOSITIONS: &[&str] = &[
    "As you begin to notice the relief...",
    "When you find yourself feeling calmer...",
    "Before you realize how much better you feel...",
    "While you continue to relax more deeply...",
];

const EMBEDDED_COMMANDS: &[&str] = &[
    "You might notice yourself *feeling more comfortable* now",
    "It's possible to *let go of that tension* naturally",
    "You can *breathe more easily* with each moment",
    "Allow yourself to *release the discomfort*",
];

const METAPHORS: &[&str] = &[
    "Like waves gently washing away tension from the shore...",
    "As clouds slowly drift across a peaceful sky...",
    "Like a tight knot gradually loosening...",
    "As darkness fades with the coming dawn...",
];

/// Techniques for prodromal or high-risk states
const URGENT_TYPES: &[&str] = &[
    "breathing_478",
    "progressive_relaxation",
    "visualization_cool_dark",
];

/// Techniques for high stress without prodromal signals
const HIGH_STRESS_TYPES: &[&str] = &["breathing_box", "grounding_54321", "bilateral_stimulation"];

/// Techniques for moderate stress
const MODERATE_STRESS_TYPES: &[&str] =
    &["breathing_coherence", "body_scan", "positive_affirmations"];

/// Preventive and maintenance techniques
const MAINTENANCE_TYPES: &[&str] = &["mindful_breathing", "gratitude_practice", "gentle_movement"];

/// Current state driving technique selection
#[derive(Debug, Clone)]
pub struct InterventionContext {
    pub stress_score: f64,
    pub risk_level: RiskLevel,
    pub prodromal_detected: bool,
    pub triggered_by: String,
    pub tone_matched: bool,
    /// Skip auto-selection and deliver this technique directly
    pub requested_type: Option<String>,
}

impl Default for InterventionContext {
    fn default() -> Self {
        Self {
            stress_score: 50.0,
            risk_level: RiskLevel::Moderate,
            prodromal_detected: false,
            triggered_by: "user_request".to_string(),
            tone_matched: false,
            requested_type: None,
        }
    }
}

/// Rendered guided script with delivery guidance
#[derive(Debug, Clone, Serialize)]
pub struct InterventionScript {
    pub script: String,
    pub duration: u32,
    pub instructions: String,
    pub target_breaths_per_minute: u32,
}

/// A delivered intervention as returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct DeliveredIntervention {
    pub intervention_id: i64,
    #[serde(rename = "type")]
    pub intervention_type: String,
    pub content: InterventionScript,
    pub nlp_patterns: Vec<String>,
    pub estimated_duration_seconds: u32,
}

/// TTS prosody settings mirroring the user's voice
#[derive(Debug, Clone, Serialize)]
pub struct TtsSettings {
    pub pitch_hz: f64,
    pub tempo_wpm: f64,
    pub energy: &'static str,
    pub prosody: &'static str,
}

/// Select, render, and persist an intervention for the user's state
pub async fn deliver_intervention(
    pool: &SqlitePool,
    user: &User,
    context: &InterventionContext,
) -> Result<DeliveredIntervention> {
    // ThreadRng is !Send; sample everything before the first await
    let (intervention_type, content, patterns) = {
        let mut rng = rand::thread_rng();
        let intervention_type = match context.requested_type.as_deref() {
            Some(requested) => requested,
            None => select_type(
                context.stress_score,
                context.risk_level,
                context.prodromal_detected,
                &mut rng,
            ),
        };
        let content = render_script(intervention_type, &mut rng);
        let patterns = select_nlp_patterns(intervention_type, context.stress_score);
        (intervention_type, content, patterns)
    };

    let intervention_id = interventions::insert_intervention(
        pool,
        user.id,
        &NewIntervention {
            intervention_type: intervention_type.to_string(),
            content: content.script.clone(),
            triggered_by: context.triggered_by.clone(),
            risk_level_at_delivery: context.risk_level,
            stress_score_at_delivery: context.stress_score,
            nlp_patterns: patterns.clone(),
            tone_matched: context.tone_matched,
            status_before: user.current_status,
            hrv_before: user.current_hrv,
        },
    )
    .await?;

    tracing::info!(
        user_id = user.id,
        intervention_id,
        intervention_type,
        "delivered intervention"
    );

    Ok(DeliveredIntervention {
        intervention_id,
        intervention_type: intervention_type.to_string(),
        estimated_duration_seconds: content.duration,
        content,
        nlp_patterns: patterns,
    })
}

/// HRV percentage change from before to after, the stress-reduction proxy
pub fn hrv_change_percentage(hrv_before: Option<i64>, hrv_after: i64) -> Option<f64> {
    let before = hrv_before.filter(|b| *b > 0)?;
    Some((hrv_after - before) as f64 / before as f64 * 100.0)
}

/// Prosody settings that mirror the user's voice: slightly lower pitch
/// and 15% slower tempo to lead toward calm.
pub fn tone_matched_settings(user_pitch: f64, user_tempo: f64) -> TtsSettings {
    TtsSettings {
        pitch_hz: user_pitch * 0.95,
        tempo_wpm: user_tempo * 0.85,
        energy: "soft",
        prosody: "soothing",
    }
}

/// Decision tree over stress, risk, and prodromal state
fn select_type(
    stress_score: f64,
    risk_level: RiskLevel,
    prodromal: bool,
    rng: &mut impl rand::Rng,
) -> &'static str {
    let candidates = if prodromal || risk_level == RiskLevel::High {
        URGENT_TYPES
    } else if stress_score > 70.0 {
        HIGH_STRESS_TYPES
    } else if stress_score > 50.0 {
        MODERATE_STRESS_TYPES
    } else {
        MAINTENANCE_TYPES
    };

    candidates.choose(rng).copied().unwrap_or("mindful_breathing")
}

/// Milton Model pattern families woven into the script
fn select_nlp_patterns(intervention_type: &str, stress_score: f64) -> Vec<String> {
    let mut patterns = vec!["presupposition".to_string()];

    if stress_score > 60.0 {
        patterns.push("embedded_command".to_string());
        patterns.push("pacing_leading".to_string());
    }

    if intervention_type.contains("visualization") || intervention_type.contains("relaxation") {
        patterns.push("sensory_language".to_string());
        patterns.push("metaphor".to_string());
    }

    patterns
}

fn render_script(intervention_type: &str, rng: &mut impl rand::Rng) -> InterventionScript {
    let presup = pick(PRESUPPOSITIONS, rng);
    let command = pick(EMBEDDED_COMMANDS, rng);
    let metaphor = pick(METAPHORS, rng);

    match intervention_type {
        "breathing_478" => InterventionScript {
            script: format!(
                "{presup}\n\n\
                 Let's do the 4-7-8 breathing together. This powerful technique *calms your nervous system* naturally.\n\n\
                 **As you begin, you might notice** yourself settling into a comfortable position...\n\n\
                 *Breathe in* through your nose for 4... feel your lungs filling...\n\n\
                 *Hold* for 7... notice the stillness...\n\n\
                 *Exhale slowly* through your mouth for 8... releasing all tension...\n\n\
                 {metaphor}\n\n\
                 We'll repeat this cycle **as your body remembers** how to relax deeply.\n\n\
                 *Inhale* for 4... 2... 3... 4...\n\n\
                 *Hold* for 7... 2... 3... 4... 5... 6... 7...\n\n\
                 *Exhale* for 8... 2... 3... 4... 5... 6... 7... 8...\n\n\
                 **And you can continue at your own pace**, knowing that each breath brings more comfort."
            ),
            duration: 180,
            instructions: "Follow the breathing pattern: 4 counts in, 7 counts hold, 8 counts out"
                .to_string(),
            target_breaths_per_minute: 6,
        },
        "breathing_box" => InterventionScript {
            script: format!(
                "{presup}\n\n\
                 Box breathing, used by Navy SEALs to stay calm under pressure. Simple, yet profound.\n\n\
                 **As you settle in**, picture a square...\n\n\
                 *Breathe in* for 4 counts... traveling up the first side...\n\n\
                 *Hold* for 4... across the top...\n\n\
                 *Breathe out* for 4... down the other side...\n\n\
                 *Hold* for 4... completing the box...\n\n\
                 {command}\n\n\
                 Let's continue...\n\n\
                 *In* 2-3-4... *Hold* 2-3-4... *Out* 2-3-4... *Hold* 2-3-4...\n\n\
                 **Perfect.** You're doing great. Continue for a few more cycles **at your own rhythm**."
            ),
            duration: 120,
            instructions: "Equal counts: 4 in, 4 hold, 4 out, 4 hold".to_string(),
            target_breaths_per_minute: 6,
        },
        "breathing_coherence" => InterventionScript {
            script: format!(
                "Before you realize how much better you feel, let's try coherence breathing.\n\n\
                 This rhythm synchronizes your heart and mind.\n\n\
                 **Breathe in** through your nose for 5... feeling your chest expand...\n\n\
                 **Breathe out** through your nose for 5... naturally, easily...\n\n\
                 {metaphor}\n\n\
                 Continue this gentle rhythm...\n\n\
                 *In* 2-3-4-5... *Out* 2-3-4-5...\n\n\
                 **Notice** how your body settles into this comfortable pattern...\n\n\
                 *In* 2-3-4-5... *Out* 2-3-4-5...\n\n\
                 You can continue **as long as feels right**."
            ),
            duration: 300,
            instructions: "Breathe in for 5, out for 5. Aim for 6 breaths per minute.".to_string(),
            target_breaths_per_minute: 6,
        },
        "progressive_relaxation" => InterventionScript {
            script: format!(
                "As you begin to notice the relief spreading through your body...\n\n\
                 We'll systematically **release tension** from each muscle group.\n\n\
                 Start by *making a fist* with both hands... tighter... tighter...\n\n\
                 **And release.** *Notice the difference* between tension and relaxation...\n\n\
                 Now *scrunch your shoulders* up toward your ears... hold...\n\n\
                 **And let them drop.** Feel that wave of relief...\n\n\
                 {metaphor}\n\n\
                 *Clench your jaw*... hold... **and soften it completely.**\n\n\
                 With each release, you might notice yourself *feeling more comfortable*, more at ease.\n\n\
                 Your forehead... *tense*... **and smooth.**\n\n\
                 Your whole body **remembering** how to let go..."
            ),
            duration: 240,
            instructions:
                "Tense each muscle group for 5 seconds, then release and notice the difference"
                    .to_string(),
            target_breaths_per_minute: 8,
        },
        "visualization_cool_dark" => InterventionScript {
            script: format!(
                "**While you continue to relax**, let me guide you to a healing space...\n\n\
                 *Imagine* a cool, dark room... peaceful and quiet...\n\n\
                 A soft pillow supporting your head...\n\n\
                 {metaphor}\n\n\
                 *Feel* the coolness on your forehead... soothing...\n\n\
                 *Hear* the gentle silence... wrapping around you...\n\n\
                 With each breath, the discomfort **begins to fade**, like shadows dissolving in moonlight...\n\n\
                 You're safe here... comfortable... **allowing** your body to heal...\n\n\
                 Stay in this space **as long as you need**..."
            ),
            duration: 180,
            instructions: "Close your eyes and follow the visualization".to_string(),
            target_breaths_per_minute: 8,
        },
        "body_scan" => InterventionScript {
            script: format!(
                "As you settle into stillness...\n\n\
                 Let's **scan through** your body with gentle awareness...\n\n\
                 *Notice* your feet... without changing anything... just aware...\n\n\
                 Your calves... knees... thighs... **softening** naturally...\n\n\
                 {command}\n\n\
                 Your hips and lower back... *releasing* any holding...\n\n\
                 Your belly... chest... shoulders... **letting go**...\n\n\
                 Down your arms to your fingertips...\n\n\
                 Your neck... jaw... face... **completely relaxed**...\n\n\
                 You might notice yourself *feeling lighter*, more present..."
            ),
            duration: 300,
            instructions:
                "Bring gentle awareness to each body part without trying to change anything"
                    .to_string(),
            target_breaths_per_minute: 8,
        },
        "grounding_54321" => InterventionScript {
            script: format!(
                "When stress feels overwhelming, this technique **brings you back** to the present.\n\n\
                 **Look around** and name 5 things you can *see*...\n\n\
                 Now 4 things you can *feel* or *touch*...\n\n\
                 3 things you can *hear*...\n\n\
                 {command}\n\n\
                 2 things you can *smell* (or imagine smelling)...\n\n\
                 And 1 thing you can *taste*...\n\n\
                 **And already**, you might notice yourself *feeling more grounded*, more here..."
            ),
            duration: 120,
            instructions: "Use your senses to anchor yourself in the present moment".to_string(),
            target_breaths_per_minute: 10,
        },
        "mindful_breathing" => InterventionScript {
            script: format!(
                "{presup}\n\n\
                 Simply *notice* your breath... no need to change it...\n\n\
                 **Feel** the air entering your nose... filling your lungs...\n\n\
                 **Notice** the pause at the top...\n\n\
                 **Sense** the exhale... the natural release...\n\n\
                 {metaphor}\n\n\
                 Thoughts will come... that's okay... just gently return to the breath...\n\n\
                 **Each moment**, you can *feel more present*, more at peace..."
            ),
            duration: 300,
            instructions: "Simply observe your natural breathing without trying to control it"
                .to_string(),
            target_breaths_per_minute: 12,
        },
        _ => InterventionScript {
            script: "Take a moment to breathe deeply and notice how you're feeling right now."
                .to_string(),
            duration: 60,
            instructions: "Pause and check in with yourself".to_string(),
            target_breaths_per_minute: 10,
        },
    }
}

fn pick<'a>(options: &[&'a str], rng: &mut impl rand::Rng) -> &'a str {
    options.choose(rng).copied().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_future_is_send() {
        fn require_send<T: Send>(_: T) {}
        #[allow(dead_code)]
        fn check(pool: &SqlitePool, user: &User, context: &InterventionContext) {
            require_send(deliver_intervention(pool, user, context));
        }
    }

    #[test]
    fn urgent_states_get_urgent_techniques() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let t = select_type(30.0, RiskLevel::High, false, &mut rng);
            assert!(URGENT_TYPES.contains(&t));

            let t = select_type(30.0, RiskLevel::Low, true, &mut rng);
            assert!(URGENT_TYPES.contains(&t));
        }
    }

    #[test]
    fn stress_buckets_select_expected_families() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let t = select_type(80.0, RiskLevel::Low, false, &mut rng);
            assert!(HIGH_STRESS_TYPES.contains(&t));

            let t = select_type(60.0, RiskLevel::Low, false, &mut rng);
            assert!(MODERATE_STRESS_TYPES.contains(&t));

            let t = select_type(20.0, RiskLevel::Low, false, &mut rng);
            assert!(MAINTENANCE_TYPES.contains(&t));
        }
    }

    #[test]
    fn nlp_patterns_track_stress_and_type() {
        let patterns = select_nlp_patterns("mindful_breathing", 30.0);
        assert_eq!(patterns, vec!["presupposition"]);

        let patterns = select_nlp_patterns("breathing_box", 70.0);
        assert!(patterns.contains(&"embedded_command".to_string()));
        assert!(patterns.contains(&"pacing_leading".to_string()));

        let patterns = select_nlp_patterns("visualization_cool_dark", 30.0);
        assert!(patterns.contains(&"sensory_language".to_string()));
        assert!(patterns.contains(&"metaphor".to_string()));
    }

    #[test]
    fn every_known_type_renders_a_script() {
        let mut rng = rand::thread_rng();
        for family in [
            URGENT_TYPES,
            HIGH_STRESS_TYPES,
            MODERATE_STRESS_TYPES,
            MAINTENANCE_TYPES,
        ] {
            for t in family {
                let content = render_script(t, &mut rng);
                assert!(!content.script.is_empty());
                assert!(content.duration >= 60);
            }
        }
    }

    #[test]
    fn hrv_change_is_percentage_of_before() {
        assert_eq!(hrv_change_percentage(Some(50), 60), Some(20.0));
        assert_eq!(hrv_change_percentage(Some(50), 40), Some(-20.0));
        assert_eq!(hrv_change_percentage(None, 60), None);
        assert_eq!(hrv_change_percentage(Some(0), 60), None);
    }

    #[test]
    fn tone_matching_lowers_pitch_and_slows_tempo() {
        let settings = tone_matched_settings(200.0, 160.0);
        assert!((settings.pitch_hz - 190.0).abs() < 1e-9);
        assert!((settings.tempo_wpm - 136.0).abs() < 1e-9);
        assert_eq!(settings.energy, "soft");
    }
}
