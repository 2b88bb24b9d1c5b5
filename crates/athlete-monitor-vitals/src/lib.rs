//! Simulated athlete vital-sign streams with health status classification.
//!
//! Generates one vital-sign reading per subject per tick in the absence of
//! real sensor hardware, and derives a discrete health status from it.
//!
//! # Architecture
//!
//! Each tick flows through four stages:
//!
//! 1. **Simulation** ([`VitalsSimulator`]): activity-phase driven drift with a
//!    probabilistic incident/recovery overlay, clamped to hard
//!    physiological bounds.
//! 2. **Classification** ([`StatusClassifier`]): banded per-vital status,
//!    rule-based infection detection and sustained-alert escalation.
//! 3. **History** ([`HistoryStore`]): bounded rolling window per subject.
//! 4. **Orchestration** ([`SimulationOrchestrator`]): owns all per-subject
//!    state and guarantees at most one simulation step per subject per tick.
//!
//! An optional [`InfectionAdvisor`] can be attached; its verdicts are
//! computed off the tick path and only ever upgrade a later tick.
//!
//! # Example
//!
//! ```
//! use athlete_monitor_vitals::{
//!     HealthStatus, MonitorConfig, SimulationOrchestrator, Subject,
//! };
//!
//! let config = MonitorConfig::builder().seed(7).build();
//! let orchestrator = SimulationOrchestrator::new(config).unwrap();
//! let squad = vec![Subject::new(1, "John Smith", 10, "Forward")];
//!
//! let snapshots = orchestrator.tick_at(1, 0.0, &squad);
//! assert_eq!(snapshots.len(), 1);
//! assert!(snapshots[0].status <= HealthStatus::Infection);
//! assert_eq!(orchestrator.history(squad[0].id).len(), 1);
//! ```

#![warn(missing_docs)]

pub mod advisory;
pub mod classifier;
pub mod config;
pub mod explanation;
pub mod history;
pub mod orchestrator;
pub mod ranges;
pub mod roster;
pub mod simulator;
pub mod types;

pub use advisory::{
    combine, AdvisoryError, AdvisoryResult, AdvisoryVerdict, DetectionMethod, InfectionAdvisor,
    NoopAdvisor, ReferenceAdvisor,
};
pub use classifier::{
    classify_value, detect_infection, Classification, InfectionTrigger, StatusClassifier,
    StatusHistoryEntry,
};
pub use config::{MonitorConfig, MonitorConfigBuilder};
pub use explanation::{explain, sustained_alert, AbnormalVital, Direction, Severity};
pub use history::{HistoryStore, VitalStats};
pub use orchestrator::{SimulationOrchestrator, StatusSummary, SubjectSnapshot};
pub use ranges::{Bounds, VitalRange, VitalRangeTable};
pub use roster::default_roster;
pub use simulator::{
    weighted_choice, ActivityPhase, HardBounds, IncidentArchetype, IncidentSign, PhaseState,
    SimulationState, SimulatorConfig, VitalsSimulator,
};
pub use types::{HealthStatus, Subject, SubjectId, VitalKind, VitalReading};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for monitor operations
pub type Result<T> = std::result::Result<T, VitalsError>;

/// Unified error type for monitor operations
#[derive(Debug, thiserror::Error)]
pub enum VitalsError {
    /// Malformed range table or simulator configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Advisory collaborator failure
    #[error("Advisory error: {0}")]
    Advisory(#[from] AdvisoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        HealthStatus, HistoryStore, MonitorConfig, Result, SimulationOrchestrator,
        StatusClassifier, Subject, SubjectId, SubjectSnapshot, VitalKind, VitalRangeTable,
        VitalReading, VitalsError, VitalsSimulator,
    };
}
