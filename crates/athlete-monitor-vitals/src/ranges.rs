//! Normal, warning and alert bands per vital kind.
//!
//! The table is pure configuration. Each kind carries a normal `[min, max]`
//! range and, optionally, warning and alert sub-bands. Sub-bands may be
//! one-sided (blood oxygen, hydration and fatigue only alert in one
//! direction) and are not required to nest inside each other.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::VitalKind;
use crate::{Result, VitalsError};

/// Fraction of the normal span added on each side to derive the alert
/// threshold for ranges without explicit sub-bands.
pub const SIMPLE_RANGE_MARGIN: f64 = 0.1;

/// A possibly one-sided band. A missing side never triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound, if the band is bounded below.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound, if the band is bounded above.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Bounds {
    /// Two-sided band.
    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    /// Band bounded only from below.
    pub fn below(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    /// Band bounded only from above.
    pub fn above(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    /// `true` when `value` reaches or passes either bound.
    pub fn reached_by(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value <= min) || self.max.is_some_and(|max| value >= max)
    }

    /// `true` when `value` lies strictly outside either bound.
    pub fn exceeded_by(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max)
    }

    fn validate(&self, kind: VitalKind, band: &str) -> Result<()> {
        if self.min.is_none() && self.max.is_none() {
            return Err(VitalsError::Config(format!("{kind} {band} band has no bounds")));
        }
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(VitalsError::Config(format!("{kind} {band} band bound is not finite")));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(VitalsError::Config(format!(
                    "{kind} {band} band min {min} exceeds max {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Normal range of one vital kind plus optional sub-bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalRange {
    /// Lower edge of the normal range.
    pub min: f64,
    /// Upper edge of the normal range.
    pub max: f64,
    /// Warning sub-band, crossed when strictly outside it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<Bounds>,
    /// Alert sub-band, crossed when reaching either bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<Bounds>,
}

impl VitalRange {
    /// Simple range without sub-bands.
    pub const fn simple(min: f64, max: f64) -> Self {
        Self { min, max, warning: None, alert: None }
    }

    /// Attach a warning sub-band.
    pub fn with_warning(mut self, warning: Bounds) -> Self {
        self.warning = Some(warning);
        self
    }

    /// Attach an alert sub-band.
    pub fn with_alert(mut self, alert: Bounds) -> Self {
        self.alert = Some(alert);
        self
    }

    /// Whether explicit sub-bands drive classification for this kind.
    pub fn has_sub_bands(&self) -> bool {
        self.warning.is_some() || self.alert.is_some()
    }

    /// `true` when `value` lies inside the normal range (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Width of the normal range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Lower alert threshold used when no sub-bands are configured.
    pub fn lower_threshold(&self) -> f64 {
        self.min - self.span() * SIMPLE_RANGE_MARGIN
    }

    /// Upper alert threshold used when no sub-bands are configured.
    pub fn upper_threshold(&self) -> f64 {
        self.max + self.span() * SIMPLE_RANGE_MARGIN
    }

    fn validate(&self, kind: VitalKind) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(VitalsError::Config(format!("{kind} range bound is not finite")));
        }
        if self.min > self.max {
            return Err(VitalsError::Config(format!(
                "{kind} range min {} exceeds max {}",
                self.min, self.max
            )));
        }
        if let Some(warning) = &self.warning {
            warning.validate(kind, "warning")?;
        }
        if let Some(alert) = &self.alert {
            alert.validate(kind, "alert")?;
        }
        Ok(())
    }
}

/// Ranges for every vital kind.
///
/// Every kind is a required field, so a JSON document missing one fails to
/// deserialize instead of silently falling back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VitalRangeTable {
    /// Core temperature (°C).
    pub temperature: VitalRange,
    /// Heart rate (BPM).
    pub heart_rate: VitalRange,
    /// Oxygen saturation (%).
    pub blood_oxygen: VitalRange,
    /// Hydration (%).
    pub hydration: VitalRange,
    /// Respiratory rate (breaths/min).
    pub respiration: VitalRange,
    /// Fatigue score.
    pub fatigue: VitalRange,
}

impl Default for VitalRangeTable {
    fn default() -> Self {
        Self {
            temperature: VitalRange::simple(36.5, 37.5),
            heart_rate: VitalRange::simple(60.0, 100.0),
            blood_oxygen: VitalRange::simple(95.0, 100.0)
                .with_warning(Bounds::below(95.0))
                .with_alert(Bounds::below(92.0)),
            hydration: VitalRange::simple(50.0, 100.0)
                .with_warning(Bounds::below(60.0))
                .with_alert(Bounds::below(50.0)),
            respiration: VitalRange::simple(12.0, 20.0),
            fatigue: VitalRange::simple(0.0, 50.0)
                .with_warning(Bounds::above(50.0))
                .with_alert(Bounds::above(80.0)),
        }
    }
}

impl VitalRangeTable {
    /// Range for a kind.
    pub fn get(&self, kind: VitalKind) -> &VitalRange {
        match kind {
            VitalKind::Temperature => &self.temperature,
            VitalKind::HeartRate => &self.heart_rate,
            VitalKind::BloodOxygen => &self.blood_oxygen,
            VitalKind::Hydration => &self.hydration,
            VitalKind::Respiration => &self.respiration,
            VitalKind::Fatigue => &self.fatigue,
        }
    }

    /// Mutable range for a kind.
    pub fn get_mut(&mut self, kind: VitalKind) -> &mut VitalRange {
        match kind {
            VitalKind::Temperature => &mut self.temperature,
            VitalKind::HeartRate => &mut self.heart_rate,
            VitalKind::BloodOxygen => &mut self.blood_oxygen,
            VitalKind::Hydration => &mut self.hydration,
            VitalKind::Respiration => &mut self.respiration,
            VitalKind::Fatigue => &mut self.fatigue,
        }
    }

    /// Check every range; any malformed band is a configuration error.
    pub fn validate(&self) -> Result<()> {
        for kind in VitalKind::ALL {
            self.get(kind).validate(kind)?;
        }
        Ok(())
    }

    /// Parse and validate a table from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)
            .map_err(|e| VitalsError::Config(format!("invalid range table: {e}")))?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
