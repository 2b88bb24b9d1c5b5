//! Optional model-based infection advisory.
//!
//! An [`InfectionAdvisor`] estimates the probability that a reading shows an
//! infection. Its output is combined with the rule-based check by
//! [`combine`] and may only ever upgrade a later tick; the monitor is fully
//! correct with no advisor attached.
//!
//! ```text
//! reading -> rule-based check ----------\
//!         -> advisor (async, timeout) ---> combine -> AdvisoryVerdict
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::detect_infection;
use crate::types::VitalReading;

/// Probability at or above which the model alone flags an infection.
pub const MODEL_THRESHOLD: f64 = 0.7;

/// Probability above which the model overrides a negative rule-based check.
pub const MODEL_OVERRIDE_THRESHOLD: f64 = 0.85;

/// Errors reported by an advisory collaborator
#[derive(Debug, Error)]
pub enum AdvisoryError {
    /// Advisor not available
    #[error("Advisor unavailable: {0}")]
    Unavailable(String),

    /// Advisor did not answer in time
    #[error("Advisor timed out after {0} ms")]
    Timeout(u64),

    /// Input or output outside the model domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for advisory operations
pub type AdvisoryResult<T> = std::result::Result<T, AdvisoryError>;

/// Which detector produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Rule-based check only
    RuleBased,
    /// Model probability only
    Model,
    /// Both detectors agree
    Combined,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::RuleBased => write!(f, "rule-based"),
            DetectionMethod::Model => write!(f, "model"),
            DetectionMethod::Combined => write!(f, "combined"),
        }
    }
}

/// Combined infection verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryVerdict {
    /// Whether an infection is assumed
    pub is_infection: bool,
    /// Confidence of the verdict (0.0-1.0)
    pub confidence: f64,
    /// Detector responsible for the verdict
    pub method: DetectionMethod,
    /// Raw model probability
    pub probability: f64,
}

/// Merge the rule-based result with a model probability.
pub fn combine(rule_based: bool, probability: f64) -> AdvisoryVerdict {
    let model_flag = probability >= MODEL_THRESHOLD;

    let (is_infection, confidence, method) = if rule_based && model_flag {
        (true, probability.max(0.85), DetectionMethod::Combined)
    } else if rule_based {
        (true, 0.6 + probability * 0.2, DetectionMethod::RuleBased)
    } else if model_flag && probability > MODEL_OVERRIDE_THRESHOLD {
        (true, probability, DetectionMethod::Model)
    } else if probability < 0.3 {
        (false, 0.9, DetectionMethod::Combined)
    } else {
        (false, 0.7, DetectionMethod::Model)
    };

    AdvisoryVerdict {
        is_infection,
        confidence,
        method,
        probability,
    }
}

/// Strategy interface for infection probability estimation
#[async_trait]
pub trait InfectionAdvisor: Send + Sync {
    /// Probability (0.0-1.0) that `reading` shows an infection
    async fn infection_probability(&self, reading: &VitalReading) -> AdvisoryResult<f64>;

    /// Advisor name for logs
    fn name(&self) -> &str;

    /// Probability combined with the rule-based check
    async fn assess(&self, reading: &VitalReading) -> AdvisoryResult<AdvisoryVerdict> {
        let probability = self.infection_probability(reading).await?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(AdvisoryError::InvalidInput(format!(
                "probability {probability} outside [0, 1]"
            )));
        }
        Ok(combine(detect_infection(reading).is_some(), probability))
    }
}

/// Advisor that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAdvisor;

#[async_trait]
impl InfectionAdvisor for NoopAdvisor {
    async fn infection_probability(&self, _reading: &VitalReading) -> AdvisoryResult<f64> {
        Err(AdvisoryError::Unavailable("no advisor configured".into()))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Feature order: temperature, heart rate, blood oxygen, hydration,
/// respiration, fatigue.
const FEATURES: usize = 6;

const NORMAL_ROWS: [[f64; FEATURES]; 5] = [
    [37.0, 70.0, 98.0, 75.0, 16.0, 30.0],
    [36.8, 65.0, 97.0, 80.0, 15.0, 25.0],
    [37.2, 72.0, 96.0, 70.0, 17.0, 35.0],
    [36.5, 68.0, 99.0, 85.0, 14.0, 20.0],
    [37.1, 75.0, 97.0, 78.0, 16.0, 40.0],
];

const INFECTION_ROWS: [[f64; FEATURES]; 5] = [
    [38.5, 105.0, 93.0, 65.0, 20.0, 60.0],
    [39.0, 110.0, 92.0, 60.0, 22.0, 65.0],
    [38.7, 100.0, 91.0, 62.0, 21.0, 55.0],
    [38.2, 95.0, 93.0, 68.0, 19.0, 50.0],
    [39.2, 115.0, 90.0, 55.0, 23.0, 70.0],
];

/// Stand-ins for missing optional vitals.
const DEFAULT_HYDRATION: f64 = 75.0;
const DEFAULT_RESPIRATION: f64 = 16.0;
const DEFAULT_FATIGUE: f64 = 30.0;

const EPOCHS: usize = 500;
const LEARNING_RATE: f64 = 0.5;

/// Logistic model fitted on a small fixed set of reference readings.
///
/// Training is deterministic full-batch gradient descent on standardized
/// features, so two instances always agree.
#[derive(Debug, Clone)]
pub struct ReferenceAdvisor {
    mean: [f64; FEATURES],
    scale: [f64; FEATURES],
    weights: [f64; FEATURES],
    bias: f64,
}

impl Default for ReferenceAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceAdvisor {
    /// Fit the model on the reference rows.
    pub fn new() -> Self {
        let rows: Vec<([f64; FEATURES], f64)> = NORMAL_ROWS
            .iter()
            .map(|r| (*r, 0.0))
            .chain(INFECTION_ROWS.iter().map(|r| (*r, 1.0)))
            .collect();
        let n = rows.len() as f64;

        let mut mean = [0.0; FEATURES];
        for (row, _) in &rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scale = [0.0; FEATURES];
        for (row, _) in &rows {
            for i in 0..FEATURES {
                scale[i] += (row[i] - mean[i]).powi(2) / n;
            }
        }
        for s in &mut scale {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }

        let mut model = Self {
            mean,
            scale,
            weights: [0.0; FEATURES],
            bias: 0.0,
        };

        let standardized: Vec<([f64; FEATURES], f64)> = rows
            .iter()
            .map(|(row, label)| (model.standardize(row), *label))
            .collect();

        for _ in 0..EPOCHS {
            let mut grad_w = [0.0; FEATURES];
            let mut grad_b = 0.0;
            for (x, label) in &standardized {
                let err = model.logit_standardized(x) - label;
                for (g, xi) in grad_w.iter_mut().zip(x) {
                    *g += err * xi / n;
                }
                grad_b += err / n;
            }
            for (w, g) in model.weights.iter_mut().zip(grad_w) {
                *w -= LEARNING_RATE * g;
            }
            model.bias -= LEARNING_RATE * grad_b;
        }

        model
    }

    fn standardize(&self, row: &[f64; FEATURES]) -> [f64; FEATURES] {
        let mut out = [0.0; FEATURES];
        for i in 0..FEATURES {
            out[i] = (row[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    fn logit_standardized(&self, x: &[f64; FEATURES]) -> f64 {
        let z: f64 = self.weights.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + self.bias;
        1.0 / (1.0 + (-z).exp())
    }

    /// Synchronous probability for `reading`.
    pub fn predict(&self, reading: &VitalReading) -> AdvisoryResult<f64> {
        let row = [
            reading.temperature,
            reading.heart_rate,
            reading.blood_oxygen,
            reading.hydration.unwrap_or(DEFAULT_HYDRATION),
            reading.respiration.unwrap_or(DEFAULT_RESPIRATION),
            reading.fatigue.unwrap_or(DEFAULT_FATIGUE),
        ];
        if row.iter().any(|v| !v.is_finite()) {
            return Err(AdvisoryError::InvalidInput("non-finite vital".into()));
        }
        Ok(self.logit_standardized(&self.standardize(&row)))
    }
}

#[async_trait]
impl InfectionAdvisor for ReferenceAdvisor {
    async fn infection_probability(&self, reading: &VitalReading) -> AdvisoryResult<f64> {
        self.predict(reading)
    }

    fn name(&self) -> &str {
        "reference"
    }
}
