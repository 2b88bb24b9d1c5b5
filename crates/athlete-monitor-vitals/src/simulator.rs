//! Per-subject vital-sign generator.
//!
//! Each call to [`VitalsSimulator::next`] produces one reading:
//!
//! 1. Advance the activity phase by the wall-clock seconds since the
//!    previous reading, transitioning through [`ActivityPhase::transitions`]
//!    when the phase duration is used up.
//! 2. Pull every vital toward the current phase's targets.
//! 3. Overlay incidents: start one with a small per-tick probability, or,
//!    when the previous reading already crosses incident thresholds, either
//!    reinforce it or recover.
//! 4. Clamp the summed result to hard physiological bounds, round for
//!    display precision and remember it as the previous reading.
//!
//! The simulator itself is stateless; all per-subject state lives in a
//! [`SimulationState`] owned by the caller.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{VitalKind, VitalReading};
use crate::{Result, VitalsError};

/// Longest gap between two readings that still advances the drift model.
/// Longer gaps are treated as this many seconds.
const MAX_STEP_SECS: f64 = 10.0;

/// Fraction of the distance to baseline removed by a recovery step.
const RECOVERY_FRACTION: f64 = 0.5;

/// Pick an item with probability proportional to its weight.
///
/// Returns `None` for an empty slice or when no weight is positive.
pub fn weighted_choice<'a, T, R, F>(rng: &mut R, items: &'a [T], weight: F) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    let dist = WeightedIndex::new(items.iter().map(|item| weight(item).max(0.0))).ok()?;
    items.get(dist.sample(rng))
}

// ---------------------------------------------------------------------------
// Activity phases
// ---------------------------------------------------------------------------

/// Simulated activity level of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPhase {
    /// Resting; vitals drift back toward baseline.
    Rest,
    /// Light activity.
    LightActivity,
    /// Intense activity.
    IntenseActivity,
    /// Post-exertion recovery; a damped version of rest.
    Recovery,
}

/// One outgoing edge of the phase transition table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Phase entered.
    pub next: ActivityPhase,
    /// Selection probability among the current phase's edges.
    pub probability: f64,
    /// Range of the new phase's duration in seconds.
    pub duration_secs: (f64, f64),
}

const SHORT: (f64, f64) = (30.0, 90.0);
const LONG: (f64, f64) = (30.0, 210.0);

const fn edge(next: ActivityPhase, probability: f64, duration_secs: (f64, f64)) -> Transition {
    Transition { next, probability, duration_secs }
}

const FROM_REST: [Transition; 2] = [
    edge(ActivityPhase::LightActivity, 0.7, LONG),
    edge(ActivityPhase::IntenseActivity, 0.3, SHORT),
];
const FROM_LIGHT: [Transition; 2] = [
    edge(ActivityPhase::IntenseActivity, 0.6, SHORT),
    edge(ActivityPhase::Rest, 0.4, LONG),
];
const FROM_INTENSE: [Transition; 2] = [
    edge(ActivityPhase::Recovery, 0.8, LONG),
    edge(ActivityPhase::LightActivity, 0.2, LONG),
];
const FROM_RECOVERY: [Transition; 2] = [
    edge(ActivityPhase::LightActivity, 0.7, LONG),
    edge(ActivityPhase::Rest, 0.3, LONG),
];

/// Vital targets and pull strength of a phase.
#[derive(Debug, Clone, Copy)]
struct PhaseProfile {
    /// Target per vital, indexed by `VitalKind as usize`.
    targets: [f64; 6],
    /// Fraction of the distance to target covered per second.
    pull_per_sec: f64,
}

/// Resting baseline per vital, indexed by `VitalKind as usize`.
const BASELINE: [f64; 6] = [36.8, 72.0, 98.0, 95.0, 15.0, 15.0];

/// Per-tick noise amplitude per vital.
const NOISE: [f64; 6] = [0.03, 1.5, 0.2, 0.3, 0.4, 0.5];

impl ActivityPhase {
    /// Outgoing transitions of this phase.
    pub fn transitions(&self) -> &'static [Transition] {
        match self {
            ActivityPhase::Rest => &FROM_REST,
            ActivityPhase::LightActivity => &FROM_LIGHT,
            ActivityPhase::IntenseActivity => &FROM_INTENSE,
            ActivityPhase::Recovery => &FROM_RECOVERY,
        }
    }

    fn profile(&self) -> PhaseProfile {
        match self {
            ActivityPhase::Rest => PhaseProfile {
                targets: [36.8, 68.0, 98.5, 100.0, 14.0, 10.0],
                pull_per_sec: 0.05,
            },
            ActivityPhase::LightActivity => PhaseProfile {
                targets: [37.2, 88.0, 97.5, 85.0, 18.0, 35.0],
                pull_per_sec: 0.03,
            },
            ActivityPhase::IntenseActivity => PhaseProfile {
                targets: [37.5, 100.0, 96.5, 70.0, 20.5, 55.0],
                pull_per_sec: 0.06,
            },
            ActivityPhase::Recovery => PhaseProfile {
                targets: [36.9, 75.0, 98.0, 95.0, 15.0, 20.0],
                pull_per_sec: 0.025,
            },
        }
    }
}

impl std::fmt::Display for ActivityPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityPhase::Rest => write!(f, "rest"),
            ActivityPhase::LightActivity => write!(f, "light_activity"),
            ActivityPhase::IntenseActivity => write!(f, "intense_activity"),
            ActivityPhase::Recovery => write!(f, "recovery"),
        }
    }
}

/// Current phase of a subject with its target duration and progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    /// Active phase.
    pub phase: ActivityPhase,
    /// Randomly chosen length of the phase (seconds).
    pub duration_secs: f64,
    /// Seconds spent in the phase so far.
    pub elapsed_secs: f64,
}

impl PhaseState {
    /// Enter `phase` with the given duration.
    pub fn new(phase: ActivityPhase, duration_secs: f64) -> Self {
        Self { phase, duration_secs, elapsed_secs: 0.0 }
    }

    /// Initial phase for a newly tracked subject.
    fn initial<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(ActivityPhase::LightActivity, rng.gen_range(60.0..=180.0))
    }

    /// Add elapsed time, transitioning when the phase is used up.
    ///
    /// Returns `true` when a transition happened.
    pub fn advance<R: Rng + ?Sized>(&mut self, dt_secs: f64, rng: &mut R) -> bool {
        self.elapsed_secs += dt_secs;
        if self.elapsed_secs < self.duration_secs {
            return false;
        }

        let edges = self.phase.transitions();
        let Some(edge) = weighted_choice(rng, edges, |t| t.probability) else {
            // Unreachable with the built-in table; restart the phase.
            self.elapsed_secs = 0.0;
            return false;
        };
        let (lo, hi) = edge.duration_secs;
        let from = self.phase;
        *self = Self::new(edge.next, rng.gen_range(lo..=hi));
        debug!(from = %from, to = %self.phase, duration = self.duration_secs, "phase transition");
        true
    }
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

/// A vital crossing an incident threshold in the previous reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSign {
    /// Temperature above 37.7 °C.
    Fever,
    /// Temperature below 36.3 °C.
    Hypothermia,
    /// Heart rate above 110 BPM.
    Tachycardia,
    /// Heart rate below 50 BPM.
    Bradycardia,
    /// Blood oxygen below 93 %.
    Hypoxia,
    /// Hydration below 60 %.
    Dehydration,
    /// Fatigue above 80.
    Exhaustion,
}

impl IncidentSign {
    /// Signs present in `reading`.
    pub fn detect(reading: &VitalReading) -> Vec<IncidentSign> {
        let mut signs = Vec::new();
        if reading.temperature > 37.7 {
            signs.push(IncidentSign::Fever);
        } else if reading.temperature < 36.3 {
            signs.push(IncidentSign::Hypothermia);
        }
        if reading.heart_rate > 110.0 {
            signs.push(IncidentSign::Tachycardia);
        } else if reading.heart_rate < 50.0 {
            signs.push(IncidentSign::Bradycardia);
        }
        if reading.blood_oxygen < 93.0 {
            signs.push(IncidentSign::Hypoxia);
        }
        if reading.hydration.is_some_and(|h| h < 60.0) {
            signs.push(IncidentSign::Dehydration);
        }
        if reading.fatigue.is_some_and(|f| f > 80.0) {
            signs.push(IncidentSign::Exhaustion);
        }
        signs
    }

    /// Vital affected by this sign.
    pub fn kind(&self) -> VitalKind {
        match self {
            IncidentSign::Fever | IncidentSign::Hypothermia => VitalKind::Temperature,
            IncidentSign::Tachycardia | IncidentSign::Bradycardia => VitalKind::HeartRate,
            IncidentSign::Hypoxia => VitalKind::BloodOxygen,
            IncidentSign::Dehydration => VitalKind::Hydration,
            IncidentSign::Exhaustion => VitalKind::Fatigue,
        }
    }

    /// Direction in which the vital moves away from normal.
    fn direction(&self) -> f64 {
        match self {
            IncidentSign::Fever | IncidentSign::Tachycardia | IncidentSign::Exhaustion => 1.0,
            IncidentSign::Hypothermia
            | IncidentSign::Bradycardia
            | IncidentSign::Hypoxia
            | IncidentSign::Dehydration => -1.0,
        }
    }

    /// Per-tick self-reinforcing step range.
    fn reinforcement(&self) -> (f64, f64) {
        match self.kind() {
            VitalKind::Temperature => (0.02, 0.06),
            VitalKind::HeartRate => (0.5, 2.0),
            VitalKind::BloodOxygen => (0.1, 0.3),
            VitalKind::Hydration => (0.3, 1.0),
            VitalKind::Respiration => (0.1, 0.4),
            VitalKind::Fatigue => (0.3, 1.0),
        }
    }
}

/// Kinds of incident that can start spontaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentArchetype {
    /// Temperature spike with a raised heart and breathing rate.
    Fever,
    /// Heart rate surge.
    Tachycardia,
    /// Oxygen drop with faster breathing.
    Hypoxia,
    /// Hydration loss with a raised heart rate.
    Dehydration,
    /// Fatigue spike with a slowing heart.
    FatigueBradycardia,
}

impl IncidentArchetype {
    /// All archetypes, equally likely.
    pub const ALL: [IncidentArchetype; 5] = [
        IncidentArchetype::Fever,
        IncidentArchetype::Tachycardia,
        IncidentArchetype::Hypoxia,
        IncidentArchetype::Dehydration,
        IncidentArchetype::FatigueBradycardia,
    ];

    /// One-time delta applied when the incident starts.
    fn impulse<R: Rng + ?Sized>(&self, rng: &mut R) -> Deltas {
        let mut d = Deltas::default();
        match self {
            IncidentArchetype::Fever => {
                d.add(VitalKind::Temperature, rng.gen_range(1.0..1.6));
                d.add(VitalKind::HeartRate, rng.gen_range(8.0..15.0));
                d.add(VitalKind::Respiration, rng.gen_range(2.0..4.0));
            }
            IncidentArchetype::Tachycardia => {
                d.add(VitalKind::HeartRate, rng.gen_range(30.0..45.0));
            }
            IncidentArchetype::Hypoxia => {
                d.add(VitalKind::BloodOxygen, -rng.gen_range(5.0..7.0));
                d.add(VitalKind::Respiration, rng.gen_range(4.0..7.0));
            }
            IncidentArchetype::Dehydration => {
                d.add(VitalKind::Hydration, -rng.gen_range(25.0..35.0));
                d.add(VitalKind::HeartRate, rng.gen_range(5.0..12.0));
                d.add(VitalKind::Fatigue, rng.gen_range(5.0..10.0));
            }
            IncidentArchetype::FatigueBradycardia => {
                d.add(VitalKind::Fatigue, rng.gen_range(30.0..40.0));
                d.add(VitalKind::HeartRate, -rng.gen_range(25.0..35.0));
            }
        }
        d
    }
}

impl std::fmt::Display for IncidentArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentArchetype::Fever => write!(f, "fever"),
            IncidentArchetype::Tachycardia => write!(f, "tachycardia"),
            IncidentArchetype::Hypoxia => write!(f, "hypoxia"),
            IncidentArchetype::Dehydration => write!(f, "dehydration"),
            IncidentArchetype::FatigueBradycardia => write!(f, "fatigue_bradycardia"),
        }
    }
}

/// Accumulated per-vital change for one tick.
#[derive(Debug, Clone, Copy, Default)]
struct Deltas([f64; 6]);

impl Deltas {
    fn add(&mut self, kind: VitalKind, delta: f64) {
        self.0[kind as usize] += delta;
    }

    fn get(&self, kind: VitalKind) -> f64 {
        self.0[kind as usize]
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Hard physiological bounds applied after summing all deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardBounds {
    /// Temperature bounds (°C).
    pub temperature: (f64, f64),
    /// Heart rate bounds (BPM).
    pub heart_rate: (f64, f64),
    /// Blood oxygen bounds (%).
    pub blood_oxygen: (f64, f64),
    /// Hydration bounds (%).
    pub hydration: (f64, f64),
    /// Respiration bounds (breaths/min).
    pub respiration: (f64, f64),
    /// Fatigue bounds.
    pub fatigue: (f64, f64),
}

impl Default for HardBounds {
    fn default() -> Self {
        Self {
            temperature: (35.5, 40.0),
            heart_rate: (40.0, 180.0),
            blood_oxygen: (85.0, 100.0),
            hydration: (40.0, 100.0),
            respiration: (8.0, 35.0),
            fatigue: (5.0, 95.0),
        }
    }
}

impl HardBounds {
    /// Bounds for a kind.
    pub fn get(&self, kind: VitalKind) -> (f64, f64) {
        match kind {
            VitalKind::Temperature => self.temperature,
            VitalKind::HeartRate => self.heart_rate,
            VitalKind::BloodOxygen => self.blood_oxygen,
            VitalKind::Hydration => self.hydration,
            VitalKind::Respiration => self.respiration,
            VitalKind::Fatigue => self.fatigue,
        }
    }

    /// Clamp `value` into the bounds of `kind`.
    pub fn clamp(&self, kind: VitalKind, value: f64) -> f64 {
        let (lo, hi) = self.get(kind);
        value.clamp(lo, hi)
    }
}

/// Tunables of the vitals simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Per-tick probability of starting an incident when none is active.
    pub incident_probability: f64,
    /// Per-tick probability of recovering from an active incident.
    pub recovery_probability: f64,
    /// Hard physiological bounds.
    pub hard_bounds: HardBounds,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            incident_probability: 0.003,
            recovery_probability: 0.03,
            hard_bounds: HardBounds::default(),
        }
    }
}

impl SimulatorConfig {
    /// Reject settings that would produce undefined readings.
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("incident_probability", self.incident_probability),
            ("recovery_probability", self.recovery_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(VitalsError::Config(format!("{name} must be within [0, 1], got {p}")));
            }
        }
        for kind in VitalKind::ALL {
            let (lo, hi) = self.hard_bounds.get(kind);
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(VitalsError::Config(format!(
                    "{kind} hard bounds ({lo}, {hi}) are invalid"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Per-subject simulation state. Empty until the first tick.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    phase: Option<PhaseState>,
    previous: Option<VitalReading>,
}

impl SimulationState {
    /// Current activity phase, if initialized.
    pub fn phase(&self) -> Option<&PhaseState> {
        self.phase.as_ref()
    }

    /// Most recent generated reading.
    pub fn previous(&self) -> Option<&VitalReading> {
        self.previous.as_ref()
    }

    /// Whether the previous reading crosses incident thresholds.
    pub fn in_incident(&self) -> bool {
        self.previous
            .as_ref()
            .is_some_and(|r| !IncidentSign::detect(r).is_empty())
    }
}

/// Stateless reading generator; see the module docs for the algorithm.
#[derive(Debug, Clone)]
pub struct VitalsSimulator {
    config: SimulatorConfig,
}

impl VitalsSimulator {
    /// Create a simulator, validating the configuration.
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Simulator configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Produce the next reading for a subject at `now_secs`.
    pub fn next<R: Rng + ?Sized>(
        &self,
        state: &mut SimulationState,
        now_secs: f64,
        rng: &mut R,
    ) -> VitalReading {
        let (Some(phase), Some(previous)) = (state.phase.as_mut(), state.previous.as_ref()) else {
            let reading = self.initial_reading(now_secs, rng);
            state.phase = Some(PhaseState::initial(rng));
            state.previous = Some(reading.clone());
            return reading;
        };

        let gap = (now_secs - previous.timestamp_secs).max(0.0);
        phase.advance(gap, rng);

        // Only the drift pull is capped; the phase clock sees the full gap.
        let dt = gap.min(MAX_STEP_SECS);

        let mut deltas = Self::phase_deltas(phase.phase, previous, dt, rng);

        let signs = IncidentSign::detect(previous);
        if signs.is_empty() {
            if rng.gen_bool(self.config.incident_probability) {
                if let Some(archetype) = weighted_choice(rng, &IncidentArchetype::ALL, |_| 1.0) {
                    info!(incident = %archetype, phase = %phase.phase, "incident started");
                    let impulse = archetype.impulse(rng);
                    for kind in VitalKind::ALL {
                        deltas.add(kind, impulse.get(kind));
                    }
                }
            }
        } else if rng.gen_bool(self.config.recovery_probability) {
            info!(?signs, "incident recovery started");
            for sign in &signs {
                let kind = sign.kind();
                let current = value_or_baseline(previous, kind);
                deltas.add(kind, (BASELINE[kind as usize] - current) * RECOVERY_FRACTION);
            }
        } else {
            for sign in &signs {
                let (lo, hi) = sign.reinforcement();
                deltas.add(sign.kind(), sign.direction() * rng.gen_range(lo..hi));
            }
        }

        let reading = self.compose(previous, &deltas, now_secs);
        state.previous = Some(reading.clone());
        reading
    }

    fn initial_reading<R: Rng + ?Sized>(&self, now_secs: f64, rng: &mut R) -> VitalReading {
        let mut values = [0.0; 6];
        values[VitalKind::Temperature as usize] = 36.8 + rng.gen_range(-0.2..=0.2);
        values[VitalKind::HeartRate as usize] = rng.gen_range(70.0..=85.0);
        values[VitalKind::BloodOxygen as usize] = rng.gen_range(97.0..=99.0);
        values[VitalKind::Hydration as usize] = rng.gen_range(90.0..=100.0);
        values[VitalKind::Respiration as usize] = rng.gen_range(14.0..=17.0);
        values[VitalKind::Fatigue as usize] = rng.gen_range(10.0..=25.0);
        self.finish(values, now_secs)
    }

    fn phase_deltas<R: Rng + ?Sized>(
        phase: ActivityPhase,
        previous: &VitalReading,
        dt: f64,
        rng: &mut R,
    ) -> Deltas {
        let profile = phase.profile();
        let pull = (profile.pull_per_sec * dt).min(1.0);
        let mut deltas = Deltas::default();
        for kind in VitalKind::ALL {
            let i = kind as usize;
            let current = value_or_baseline(previous, kind);
            let noise = NOISE[i];
            deltas.add(kind, (profile.targets[i] - current) * pull + rng.gen_range(-noise..=noise));
        }
        deltas
    }

    /// Sum deltas onto the previous reading, then clamp and round once.
    fn compose(&self, previous: &VitalReading, deltas: &Deltas, now_secs: f64) -> VitalReading {
        let mut values = [0.0; 6];
        for kind in VitalKind::ALL {
            values[kind as usize] = value_or_baseline(previous, kind) + deltas.get(kind);
        }
        self.finish(values, now_secs)
    }

    fn finish(&self, values: [f64; 6], now_secs: f64) -> VitalReading {
        let v = |kind: VitalKind| {
            let clamped = self.config.hard_bounds.clamp(kind, values[kind as usize]);
            match kind {
                VitalKind::HeartRate => clamped.round(),
                _ => (clamped * 10.0).round() / 10.0,
            }
        };
        VitalReading {
            temperature: v(VitalKind::Temperature),
            heart_rate: v(VitalKind::HeartRate),
            blood_oxygen: v(VitalKind::BloodOxygen),
            hydration: Some(v(VitalKind::Hydration)),
            respiration: Some(v(VitalKind::Respiration)),
            fatigue: Some(v(VitalKind::Fatigue)),
            timestamp_secs: now_secs,
            alert_duration_secs: None,
        }
    }
}

fn value_or_baseline(reading: &VitalReading, kind: VitalKind) -> f64 {
    reading.value(kind).unwrap_or(BASELINE[kind as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn simulator() -> VitalsSimulator {
        VitalsSimulator::new(SimulatorConfig::default()).unwrap()
    }

    fn assert_within_hard_bounds(reading: &VitalReading, bounds: &HardBounds) {
        for kind in VitalKind::ALL {
            let value = reading.value(kind).unwrap();
            let (lo, hi) = bounds.get(kind);
            assert!(
                value >= lo && value <= hi,
                "{kind} = {value} outside [{lo}, {hi}]"
            );
        }
    }

    #[test]
    fn transition_table_probabilities_sum_to_one() {
        for phase in [
            ActivityPhase::Rest,
            ActivityPhase::LightActivity,
            ActivityPhase::IntenseActivity,
            ActivityPhase::Recovery,
        ] {
            let total: f64 = phase.transitions().iter().map(|t| t.probability).sum();
            assert!((total - 1.0).abs() < 1e-9, "{phase}: {total}");
        }
    }

    #[test]
    fn intense_phases_are_short() {
        for phase in [ActivityPhase::Rest, ActivityPhase::LightActivity] {
            for t in phase.transitions() {
                if t.next == ActivityPhase::IntenseActivity {
                    assert_eq!(t.duration_secs, (30.0, 90.0));
                }
            }
        }
    }

    #[test]
    fn weighted_choice_respects_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items = [("a", 0.0), ("b", 1.0)];
        for _ in 0..100 {
            assert_eq!(weighted_choice(&mut rng, &items, |i| i.1).unwrap().0, "b");
        }
        let none: [(&str, f64); 0] = [];
        assert!(weighted_choice(&mut rng, &none, |i| i.1).is_none());
        assert!(weighted_choice(&mut rng, &[("z", 0.0)], |i| i.1).is_none());
    }

    #[test]
    fn weighted_choice_distribution_is_roughly_proportional() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let edges = ActivityPhase::IntenseActivity.transitions();
        let recoveries = (0..10_000)
            .filter(|_| {
                weighted_choice(&mut rng, edges, |t| t.probability).unwrap().next
                    == ActivityPhase::Recovery
            })
            .count();
        assert!((7_500..8_500).contains(&recoveries), "recoveries = {recoveries}");
    }

    #[test]
    fn first_reading_is_near_resting_values() {
        let sim = simulator();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let mut state = SimulationState::default();
            let r = sim.next(&mut state, 0.0, &mut rng);
            assert!((36.6..=37.0).contains(&r.temperature));
            assert!((70.0..=85.0).contains(&r.heart_rate));
            assert!((97.0..=99.0).contains(&r.blood_oxygen));
            assert!(r.is_complete());
            let phase = state.phase().unwrap();
            assert_eq!(phase.phase, ActivityPhase::LightActivity);
            assert!((60.0..=180.0).contains(&phase.duration_secs));
        }
    }

    #[test]
    fn phase_advances_by_elapsed_time() {
        let sim = simulator();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = SimulationState::default();
        sim.next(&mut state, 100.0, &mut rng);
        sim.next(&mut state, 102.5, &mut rng);
        let phase = state.phase().unwrap();
        assert!((phase.elapsed_secs - 2.5).abs() < 1e-9);
    }

    #[test]
    fn long_gap_counts_fully_toward_phase() {
        let sim = simulator();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = SimulationState::default();
        sim.next(&mut state, 0.0, &mut rng);
        state.phase = Some(PhaseState::new(ActivityPhase::Rest, 1000.0));

        let reading = sim.next(&mut state, 100.0, &mut rng);
        let phase = state.phase().unwrap();
        assert_eq!(phase.phase, ActivityPhase::Rest);
        assert!((phase.elapsed_secs - 100.0).abs() < 1e-9);
        assert_within_hard_bounds(&reading, &sim.config().hard_bounds);
    }

    #[test]
    fn phase_transitions_when_duration_used_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut phase = PhaseState::new(ActivityPhase::IntenseActivity, 5.0);
        assert!(!phase.advance(4.0, &mut rng));
        assert!(phase.advance(1.0, &mut rng));
        assert!(matches!(
            phase.phase,
            ActivityPhase::Recovery | ActivityPhase::LightActivity
        ));
        assert_eq!(phase.elapsed_secs, 0.0);
        assert!((30.0..=210.0).contains(&phase.duration_secs));
    }

    #[test]
    fn readings_stay_within_hard_bounds() {
        let config = SimulatorConfig {
            incident_probability: 0.2,
            recovery_probability: 0.01,
            ..SimulatorConfig::default()
        };
        let bounds = config.hard_bounds;
        let sim = VitalsSimulator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut state = SimulationState::default();
        for tick in 0..5_000 {
            let r = sim.next(&mut state, tick as f64, &mut rng);
            assert_within_hard_bounds(&r, &bounds);
        }
    }

    #[test]
    fn readings_are_rounded_for_display() {
        let sim = simulator();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut state = SimulationState::default();
        for tick in 0..200 {
            let r = sim.next(&mut state, tick as f64, &mut rng);
            assert_eq!(r.heart_rate, r.heart_rate.round());
            let tenths = r.temperature * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn incident_reinforces_without_recovery() {
        let config = SimulatorConfig {
            incident_probability: 0.0,
            recovery_probability: 0.0,
            ..SimulatorConfig::default()
        };
        let sim = VitalsSimulator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut state = SimulationState {
            phase: Some(PhaseState::new(ActivityPhase::Rest, 1_000.0)),
            previous: Some(VitalReading {
                hydration: Some(95.0),
                respiration: Some(15.0),
                fatigue: Some(15.0),
                ..VitalReading::primary(36.8, 140.0, 98.0, 0.0)
            }),
        };
        assert!(state.in_incident());
        // Rest pulls 140 BPM down by ~3.6 in one second; reinforcement
        // partly offsets that.
        let r = sim.next(&mut state, 1.0, &mut rng);
        assert!(r.heart_rate > 110.0);
    }

    #[test]
    fn recovery_pulls_toward_baseline() {
        let config = SimulatorConfig {
            incident_probability: 0.0,
            recovery_probability: 1.0,
            ..SimulatorConfig::default()
        };
        let sim = VitalsSimulator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let mut state = SimulationState {
            phase: Some(PhaseState::new(ActivityPhase::Rest, 1_000.0)),
            previous: Some(VitalReading {
                hydration: Some(95.0),
                respiration: Some(15.0),
                fatigue: Some(15.0),
                ..VitalReading::primary(39.0, 72.0, 98.0, 0.0)
            }),
        };
        let r = sim.next(&mut state, 1.0, &mut rng);
        assert!(r.temperature < 38.0, "temperature = {}", r.temperature);
    }

    #[test]
    fn incidents_eventually_start() {
        let config = SimulatorConfig {
            incident_probability: 1.0,
            ..SimulatorConfig::default()
        };
        let sim = VitalsSimulator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let mut state = SimulationState::default();
        sim.next(&mut state, 0.0, &mut rng);
        let mut saw_incident = false;
        for tick in 1..20 {
            sim.next(&mut state, tick as f64, &mut rng);
            saw_incident |= state.in_incident();
        }
        assert!(saw_incident);
    }

    #[test]
    fn detect_signs_from_thresholds() {
        let mut r = VitalReading::primary(38.0, 45.0, 92.0, 0.0);
        r.hydration = Some(55.0);
        r.fatigue = Some(85.0);
        let signs = IncidentSign::detect(&r);
        assert_eq!(
            signs,
            vec![
                IncidentSign::Fever,
                IncidentSign::Bradycardia,
                IncidentSign::Hypoxia,
                IncidentSign::Dehydration,
                IncidentSign::Exhaustion,
            ]
        );
        assert!(IncidentSign::detect(&VitalReading::primary(36.8, 72.0, 98.0, 0.0)).is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimulatorConfig::default();
        config.hard_bounds.blood_oxygen = (100.0, 85.0);
        assert!(matches!(VitalsSimulator::new(config), Err(VitalsError::Config(_))));

        let config = SimulatorConfig {
            incident_probability: f64::NAN,
            ..SimulatorConfig::default()
        };
        assert!(VitalsSimulator::new(config).is_err());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let sim = simulator();
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut state = SimulationState::default();
            (0..100)
                .map(|t| sim.next(&mut state, t as f64, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }
}
