//! Abnormal-vitals explanation for subjects in alert or infection.

use serde::Serialize;

use crate::ranges::VitalRangeTable;
use crate::types::{VitalKind, VitalReading};

/// Alert duration after which a subject needs immediate attention.
pub const SUSTAINED_ALERT_SECS: f64 = 20.0;

/// How far out of range a vital is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Outside the normal range.
    Medium,
    /// Beyond the clinically notable cut-off.
    High,
}

/// Side of the normal range a vital left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Above `max`.
    High,
    /// Below `min`.
    Low,
}

/// One vital outside its normal range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbnormalVital {
    /// Kind.
    pub kind: VitalKind,
    /// Observed value.
    pub value: f64,
    /// Which side of the range.
    pub direction: Direction,
    /// Severity.
    pub severity: Severity,
    /// Normal `(min, max)`.
    pub normal_range: (f64, f64),
    /// Advice for staff.
    pub note: &'static str,
}

impl AbnormalVital {
    /// Value formatted with its unit, e.g. `38.6°C`.
    pub fn display_value(&self) -> String {
        match self.kind {
            VitalKind::Temperature | VitalKind::BloodOxygen | VitalKind::Hydration | VitalKind::Fatigue => {
                format!("{}{}", self.kind.format_value(self.value), self.kind.unit())
            }
            _ => format!("{} {}", self.kind.format_value(self.value), self.kind.unit()),
        }
    }
}

fn is_high_severity(kind: VitalKind, value: f64) -> bool {
    match kind {
        VitalKind::Temperature => value >= 38.5,
        VitalKind::HeartRate => value >= 130.0,
        VitalKind::BloodOxygen => value < 92.0,
        VitalKind::Hydration => value < 70.0,
        VitalKind::Respiration => value > 25.0,
        VitalKind::Fatigue => value > 70.0,
    }
}

fn note(kind: VitalKind, severity: Severity) -> &'static str {
    match (kind, severity) {
        (VitalKind::Temperature, Severity::High) => {
            "Elevated body temperature indicates potential overheating. Medical evaluation recommended."
        }
        (VitalKind::Temperature, Severity::Medium) => {
            "Temperature outside normal range. Continue monitoring."
        }
        (VitalKind::HeartRate, Severity::High) => {
            "Sustained elevated heart rate requires immediate attention."
        }
        (VitalKind::HeartRate, Severity::Medium) => "Heart rate outside normal resting range.",
        (VitalKind::BloodOxygen, Severity::High) => {
            "Low oxygen saturation is concerning. Medical attention needed."
        }
        (VitalKind::BloodOxygen, Severity::Medium) => "Blood oxygen levels below optimal range.",
        (VitalKind::Hydration, Severity::High) => {
            "Significant dehydration detected. Immediate rehydration required."
        }
        (VitalKind::Hydration, Severity::Medium) => {
            "Hydration below optimal levels. Fluid intake recommended."
        }
        (VitalKind::Respiration, Severity::High) => {
            "Elevated respiratory rate may indicate respiratory distress."
        }
        (VitalKind::Respiration, Severity::Medium) => "Respiration rate outside normal range.",
        (VitalKind::Fatigue, Severity::High) => {
            "High fatigue level detected. Consider player rotation or rest."
        }
        (VitalKind::Fatigue, Severity::Medium) => "Fatigue level outside normal range.",
    }
}

/// Every vital of `reading` outside its normal range, in display order.
///
/// Kinds missing from the reading are skipped.
pub fn explain(reading: &VitalReading, table: &VitalRangeTable) -> Vec<AbnormalVital> {
    VitalKind::ALL
        .iter()
        .filter_map(|&kind| {
            let value = reading.value(kind)?;
            let range = table.get(kind);
            let direction = if value > range.max {
                Direction::High
            } else if value < range.min {
                Direction::Low
            } else {
                return None;
            };
            let severity = if is_high_severity(kind, value) {
                Severity::High
            } else {
                Severity::Medium
            };
            Some(AbnormalVital {
                kind,
                value,
                direction,
                severity,
                normal_range: (range.min, range.max),
                note: note(kind, severity),
            })
        })
        .collect()
}

/// Whether an alert has lasted long enough to need immediate attention.
pub fn sustained_alert(alert_duration_secs: Option<f64>) -> bool {
    alert_duration_secs.is_some_and(|d| d > SUSTAINED_ALERT_SECS)
}
