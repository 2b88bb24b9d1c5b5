//! Health status classification.
//!
//! Classification of one tick runs in a fixed order:
//! 1. Rule-based infection check on the raw reading
//! 2. Banded aggregate over the primary vitals
//! 3. Duration escalation, only while the banded aggregate is `Alert`
//!
//! The classifier is pure: all per-subject memory is carried in the
//! [`StatusHistoryEntry`] the caller passes back in on the next tick.

use serde::{Deserialize, Serialize};

use crate::ranges::{VitalRange, VitalRangeTable};
use crate::types::{HealthStatus, VitalKind, VitalReading};

/// Default seconds of continuous alert before escalation to infection.
pub const DEFAULT_ESCALATION_SECS: f64 = 30.0;

/// Temperature at or above which a fever is assumed (°C).
pub const FEVER_TEMPERATURE: f64 = 38.0;
/// Temperature at or above which a fever is considered high (°C).
pub const HIGH_FEVER_TEMPERATURE: f64 = 39.0;
/// Heart rate at or above which it counts as elevated (BPM).
pub const ELEVATED_HEART_RATE: f64 = 100.0;
/// Blood oxygen below which it counts as low (%).
pub const LOW_BLOOD_OXYGEN: f64 = 94.0;

/// Per-vital status for `value` against `range`.
///
/// Ranges with sub-bands are checked alert first (inclusive), then warning
/// (strict), then the normal range, with `Warning` as the catch-all.
/// Simple ranges derive their alert thresholds from
/// [`SIMPLE_RANGE_MARGIN`](crate::ranges::SIMPLE_RANGE_MARGIN).
pub fn classify_value(value: f64, range: &VitalRange) -> HealthStatus {
    if range.has_sub_bands() {
        if range.alert.is_some_and(|alert| alert.reached_by(value)) {
            return HealthStatus::Alert;
        }
        if range.warning.is_some_and(|warning| warning.exceeded_by(value)) {
            return HealthStatus::Warning;
        }
        return if range.contains(value) {
            HealthStatus::Normal
        } else {
            HealthStatus::Warning
        };
    }

    if value < range.lower_threshold() || value > range.upper_threshold() {
        HealthStatus::Alert
    } else if !range.contains(value) {
        HealthStatus::Warning
    } else {
        HealthStatus::Normal
    }
}

/// Which rule-based infection pattern fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectionTrigger {
    /// Temperature ≥ 39 °C with an elevated heart rate or low oxygen.
    HighFever,
    /// Fever with both an elevated heart rate and low oxygen.
    FeverTachycardiaHypoxemia,
    /// Fever with an elevated heart rate.
    FeverTachycardia,
    /// Fever with low oxygen.
    FeverHypoxemia,
}

impl std::fmt::Display for InfectionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfectionTrigger::HighFever => write!(f, "high fever"),
            InfectionTrigger::FeverTachycardiaHypoxemia => {
                write!(f, "fever, elevated heart rate and low oxygen")
            }
            InfectionTrigger::FeverTachycardia => write!(f, "fever with elevated heart rate"),
            InfectionTrigger::FeverHypoxemia => write!(f, "fever with low oxygen"),
        }
    }
}

/// Rule-based infection check on a single reading.
pub fn detect_infection(reading: &VitalReading) -> Option<InfectionTrigger> {
    let fever = reading.temperature >= FEVER_TEMPERATURE;
    let tachycardia = reading.heart_rate >= ELEVATED_HEART_RATE;
    let hypoxemia = reading.blood_oxygen < LOW_BLOOD_OXYGEN;

    if !fever || !(tachycardia || hypoxemia) {
        return None;
    }
    Some(if reading.temperature >= HIGH_FEVER_TEMPERATURE {
        InfectionTrigger::HighFever
    } else if tachycardia && hypoxemia {
        InfectionTrigger::FeverTachycardiaHypoxemia
    } else if tachycardia {
        InfectionTrigger::FeverTachycardia
    } else {
        InfectionTrigger::FeverHypoxemia
    })
}

/// Per-subject status memory carried between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    /// Status emitted on the recorded tick.
    pub status: HealthStatus,
    /// Timestamp of the recorded tick.
    pub timestamp_secs: f64,
    /// Start of the current uninterrupted alert run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_start_secs: Option<f64>,
}

/// Result of classifying one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Final status after infection checks and escalation.
    pub status: HealthStatus,
    /// Worst primary-vital status before any infection override.
    pub banded_status: HealthStatus,
    /// Start of the current alert run, `None` when not in alert.
    pub alert_start_secs: Option<f64>,
    /// Seconds spent continuously in alert, `None` when not in alert.
    pub alert_duration_secs: Option<f64>,
    /// Rule-based infection pattern, if one fired.
    pub trigger: Option<InfectionTrigger>,
}

impl Classification {
    /// Whether the status was upgraded by duration alone.
    pub fn escalated(&self) -> bool {
        self.status == HealthStatus::Infection && self.trigger.is_none()
    }

    /// Status memory to pass into the next tick.
    pub fn entry(&self, timestamp_secs: f64) -> StatusHistoryEntry {
        StatusHistoryEntry {
            status: self.status,
            timestamp_secs,
            alert_start_secs: self.alert_start_secs,
        }
    }
}

/// Maps readings to a discrete [`HealthStatus`].
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    ranges: VitalRangeTable,
    escalation_secs: f64,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(VitalRangeTable::default(), DEFAULT_ESCALATION_SECS)
    }
}

impl StatusClassifier {
    /// Create a classifier over a validated range table.
    pub fn new(ranges: VitalRangeTable, escalation_secs: f64) -> Self {
        Self { ranges, escalation_secs }
    }

    /// Range table in use.
    pub fn ranges(&self) -> &VitalRangeTable {
        &self.ranges
    }

    /// Escalation window in seconds.
    pub fn escalation_secs(&self) -> f64 {
        self.escalation_secs
    }

    /// Status of a single kind, `None` when the reading lacks it.
    pub fn vital_status(&self, reading: &VitalReading, kind: VitalKind) -> Option<HealthStatus> {
        reading
            .value(kind)
            .map(|value| classify_value(value, self.ranges.get(kind)))
    }

    /// Worst status over temperature, heart rate and blood oxygen.
    pub fn banded_status(&self, reading: &VitalReading) -> HealthStatus {
        VitalKind::PRIMARY
            .iter()
            .filter_map(|kind| self.vital_status(reading, *kind))
            .max()
            .unwrap_or(HealthStatus::Normal)
    }

    /// Classify `reading` given the subject's previous status memory.
    ///
    /// With `previous == None` the result depends only on the reading and
    /// the range table.
    pub fn classify(
        &self,
        reading: &VitalReading,
        previous: Option<&StatusHistoryEntry>,
    ) -> Classification {
        let trigger = detect_infection(reading);
        let banded_status = self.banded_status(reading);

        let now = reading.timestamp_secs;
        let alert_start_secs = (banded_status == HealthStatus::Alert).then(|| {
            previous
                .and_then(|p| p.alert_start_secs)
                .filter(|start| *start <= now)
                .unwrap_or(now)
        });
        let alert_duration_secs = alert_start_secs.map(|start| now - start);

        let status = if trigger.is_some() {
            HealthStatus::Infection
        } else if alert_duration_secs.is_some_and(|d| d > self.escalation_secs) {
            HealthStatus::Infection
        } else {
            banded_status
        };

        Classification {
            status,
            banded_status,
            alert_start_secs,
            alert_duration_secs,
            trigger,
        }
    }
}
