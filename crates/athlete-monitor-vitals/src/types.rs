//! Vital sign domain types.

use serde::{Deserialize, Serialize};

/// The six vital kinds tracked per subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    /// Core body temperature (°C).
    Temperature,
    /// Heart rate (beats per minute).
    HeartRate,
    /// Peripheral oxygen saturation (%).
    BloodOxygen,
    /// Hydration level (%).
    Hydration,
    /// Respiratory rate (breaths per minute).
    Respiration,
    /// Fatigue score (0-100).
    Fatigue,
}

impl VitalKind {
    /// All kinds, in display order.
    pub const ALL: [VitalKind; 6] = [
        VitalKind::Temperature,
        VitalKind::HeartRate,
        VitalKind::BloodOxygen,
        VitalKind::Hydration,
        VitalKind::Respiration,
        VitalKind::Fatigue,
    ];

    /// Kinds that contribute to the aggregate health status.
    pub const PRIMARY: [VitalKind; 3] = [
        VitalKind::Temperature,
        VitalKind::HeartRate,
        VitalKind::BloodOxygen,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            VitalKind::Temperature => "Temperature",
            VitalKind::HeartRate => "Heart Rate",
            VitalKind::BloodOxygen => "Blood Oxygen",
            VitalKind::Hydration => "Hydration",
            VitalKind::Respiration => "Respiration",
            VitalKind::Fatigue => "Fatigue",
        }
    }

    /// Display unit.
    pub fn unit(&self) -> &'static str {
        match self {
            VitalKind::Temperature => "°C",
            VitalKind::HeartRate => "BPM",
            VitalKind::BloodOxygen | VitalKind::Hydration | VitalKind::Fatigue => "%",
            VitalKind::Respiration => "breaths/min",
        }
    }

    /// Whether this kind is part of the aggregate status computation.
    pub fn is_primary(&self) -> bool {
        Self::PRIMARY.contains(self)
    }

    /// Format a value with the display precision for this kind.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            VitalKind::Temperature | VitalKind::BloodOxygen | VitalKind::Hydration => {
                format!("{value:.1}")
            }
            _ => format!("{}", value.round() as i64),
        }
    }
}

impl std::fmt::Display for VitalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single immutable vital-sign reading for one subject.
///
/// Temperature, heart rate and blood oxygen are always present. The
/// remaining kinds are optional so externally supplied partial data can be
/// classified; simulator output populates every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    /// Core temperature (°C).
    pub temperature: f64,
    /// Heart rate (BPM).
    pub heart_rate: f64,
    /// Oxygen saturation (%).
    pub blood_oxygen: f64,
    /// Hydration (%).
    pub hydration: Option<f64>,
    /// Respiratory rate (breaths/min).
    pub respiration: Option<f64>,
    /// Fatigue score (0-100).
    pub fatigue: Option<f64>,
    /// Timestamp (seconds, monotonic within a run).
    pub timestamp_secs: f64,
    /// Seconds spent continuously in alert, when currently in alert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_duration_secs: Option<f64>,
}

impl VitalReading {
    /// Create a reading carrying only the three primary vitals.
    pub fn primary(temperature: f64, heart_rate: f64, blood_oxygen: f64, timestamp_secs: f64) -> Self {
        Self {
            temperature,
            heart_rate,
            blood_oxygen,
            hydration: None,
            respiration: None,
            fatigue: None,
            timestamp_secs,
            alert_duration_secs: None,
        }
    }

    /// Value for a given kind, `None` when the kind is absent.
    pub fn value(&self, kind: VitalKind) -> Option<f64> {
        match kind {
            VitalKind::Temperature => Some(self.temperature),
            VitalKind::HeartRate => Some(self.heart_rate),
            VitalKind::BloodOxygen => Some(self.blood_oxygen),
            VitalKind::Hydration => self.hydration,
            VitalKind::Respiration => self.respiration,
            VitalKind::Fatigue => self.fatigue,
        }
    }

    /// Whether every vital kind is populated.
    pub fn is_complete(&self) -> bool {
        VitalKind::ALL.iter().all(|k| self.value(*k).is_some())
    }

    /// Copy of this reading with the alert duration attached.
    pub fn with_alert_duration(mut self, secs: Option<f64>) -> Self {
        self.alert_duration_secs = secs;
        self
    }
}

/// Discrete health status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// All primary vitals within range.
    Normal,
    /// At least one primary vital slightly out of range.
    Warning,
    /// At least one primary vital far out of range.
    Alert,
    /// Infection pattern detected or alert sustained past the escalation window.
    Infection,
}

impl HealthStatus {
    /// Whether the status calls for an explanation of abnormal vitals.
    pub fn is_critical(&self) -> bool {
        matches!(self, HealthStatus::Alert | HealthStatus::Infection)
    }

    /// Display color used by dashboards.
    pub fn color(&self) -> &'static str {
        match self {
            HealthStatus::Normal => "green",
            HealthStatus::Warning => "yellow",
            HealthStatus::Alert => "red",
            HealthStatus::Infection => "purple",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Normal => write!(f, "NORMAL"),
            HealthStatus::Warning => write!(f, "WARNING"),
            HealthStatus::Alert => write!(f, "ALERT"),
            HealthStatus::Infection => write!(f, "INFECTION"),
        }
    }
}

/// Stable identifier of a tracked subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u32);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SubjectId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identity and display metadata of a tracked subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Identifier, key for all per-subject state.
    pub id: SubjectId,
    /// Display name.
    pub name: String,
    /// Squad number.
    pub number: u16,
    /// Playing position.
    pub position: String,
}

impl Subject {
    /// Create a subject.
    pub fn new(id: u32, name: impl Into<String>, number: u16, position: impl Into<String>) -> Self {
        Self {
            id: SubjectId(id),
            name: name.into(),
            number,
            position: position.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_follows_severity() {
        assert!(HealthStatus::Normal < HealthStatus::Warning);
        assert!(HealthStatus::Warning < HealthStatus::Alert);
        assert!(HealthStatus::Alert < HealthStatus::Infection);
        assert_eq!(
            [HealthStatus::Warning, HealthStatus::Alert, HealthStatus::Normal]
                .into_iter()
                .max(),
            Some(HealthStatus::Alert)
        );
    }

    #[test]
    fn primary_reading_is_incomplete() {
        let reading = VitalReading::primary(37.0, 72.0, 98.0, 0.0);
        assert_eq!(reading.value(VitalKind::HeartRate), Some(72.0));
        assert_eq!(reading.value(VitalKind::Hydration), None);
        assert!(!reading.is_complete());
    }

    #[test]
    fn only_three_kinds_are_primary() {
        let primary: Vec<_> = VitalKind::ALL.iter().filter(|k| k.is_primary()).collect();
        assert_eq!(primary.len(), 3);
        assert!(!VitalKind::Fatigue.is_primary());
    }

    #[test]
    fn format_value_uses_kind_precision() {
        assert_eq!(VitalKind::Temperature.format_value(37.04), "37.0");
        assert_eq!(VitalKind::HeartRate.format_value(71.6), "72");
        assert_eq!(VitalKind::Hydration.format_value(80.26), "80.3");
    }

    #[test]
    fn reading_serde_skips_missing_alert_duration() {
        let reading = VitalReading::primary(37.0, 72.0, 98.0, 1.0);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(!json.contains("alert_duration_secs"));

        let with = reading.with_alert_duration(Some(12.0));
        let parsed: VitalReading = serde_json::from_str(&serde_json::to_string(&with).unwrap()).unwrap();
        assert_eq!(parsed.alert_duration_secs, Some(12.0));
    }
}
