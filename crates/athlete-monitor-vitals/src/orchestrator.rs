//! Per-tick driver tying simulation, classification and history together.
//!
//! The orchestrator exclusively owns every piece of per-subject mutable
//! state. Each subject's state sits behind its own mutex, so ticks for one
//! subject are serialized while different subjects never contend. A tick
//! number that a subject has already processed returns the cached snapshot
//! instead of advancing the simulation again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::advisory::{AdvisoryError, AdvisoryVerdict, InfectionAdvisor};
use crate::classifier::{StatusClassifier, StatusHistoryEntry};
use crate::config::MonitorConfig;
use crate::explanation::{explain, sustained_alert, AbnormalVital};
use crate::history::{HistoryStore, VitalStats};
use crate::ranges::VitalRangeTable;
use crate::simulator::{SimulationState, VitalsSimulator};
use crate::types::{HealthStatus, Subject, SubjectId, VitalReading};
use crate::{Result, VitalsError};

/// Snapshot of one subject emitted by a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSnapshot {
    /// Identity and display metadata
    pub subject: Subject,
    /// Reading generated on this tick
    pub reading: VitalReading,
    /// Status after classification and any advisory upgrade
    pub status: HealthStatus,
    /// Seconds continuously in alert, when in alert
    pub alert_duration_secs: Option<f64>,
    /// Tick that produced the snapshot
    pub tick: u64,
}

impl SubjectSnapshot {
    /// Abnormal vitals, only for subjects in alert or infection.
    pub fn abnormal_vitals(&self, table: &VitalRangeTable) -> Vec<AbnormalVital> {
        if self.status.is_critical() {
            explain(&self.reading, table)
        } else {
            Vec::new()
        }
    }

    /// Whether the alert has lasted long enough to need immediate attention.
    pub fn needs_attention(&self) -> bool {
        sustained_alert(self.alert_duration_secs)
    }
}

/// Number of subjects per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    /// Subjects in normal status
    pub normal: usize,
    /// Subjects in warning status
    pub warning: usize,
    /// Subjects in alert status
    pub alert: usize,
    /// Subjects in infection status
    pub infection: usize,
}

impl StatusSummary {
    /// Count statuses over a set of snapshots.
    pub fn from_snapshots(snapshots: &[SubjectSnapshot]) -> Self {
        let mut summary = Self::default();
        for snapshot in snapshots {
            match snapshot.status {
                HealthStatus::Normal => summary.normal += 1,
                HealthStatus::Warning => summary.warning += 1,
                HealthStatus::Alert => summary.alert += 1,
                HealthStatus::Infection => summary.infection += 1,
            }
        }
        summary
    }

    /// Total subjects counted.
    pub fn total(&self) -> usize {
        self.normal + self.warning + self.alert + self.infection
    }
}

/// Advisory verdict waiting to be applied on a subject's next tick.
#[derive(Debug, Clone, Copy)]
struct PendingAdvice {
    generation: u64,
    tick: u64,
    verdict: AdvisoryVerdict,
}

/// Mutable state of one subject.
struct SubjectState {
    simulation: SimulationState,
    rng: ChaCha8Rng,
    status: Option<StatusHistoryEntry>,
    last_tick: Option<u64>,
    last_snapshot: Option<SubjectSnapshot>,
}

impl SubjectState {
    fn new(id: SubjectId, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed ^ u64::from(id.0)),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            simulation: SimulationState::default(),
            rng,
            status: None,
            last_tick: None,
            last_snapshot: None,
        }
    }
}

/// Drives one tick at a time for a set of subjects.
pub struct SimulationOrchestrator {
    config: MonitorConfig,
    simulator: VitalsSimulator,
    classifier: StatusClassifier,
    subjects: RwLock<HashMap<SubjectId, Arc<Mutex<SubjectState>>>>,
    history: RwLock<HistoryStore>,
    advisor: Option<Arc<dyn InfectionAdvisor>>,
    pending: Arc<Mutex<HashMap<SubjectId, PendingAdvice>>>,
    /// Bumped by `reset`; verdicts dispatched before it are discarded.
    generation: Arc<AtomicU64>,
    tick_counter: AtomicU64,
    started_at: Instant,
}

impl SimulationOrchestrator {
    /// Create an orchestrator, validating the configuration.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let simulator = VitalsSimulator::new(config.simulator.clone())?;
        let classifier = StatusClassifier::new(config.ranges.clone(), config.escalation_secs);
        let history = HistoryStore::new(config.history_capacity);

        Ok(Self {
            config,
            simulator,
            classifier,
            subjects: RwLock::new(HashMap::new()),
            history: RwLock::new(history),
            advisor: None,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            tick_counter: AtomicU64::new(0),
            started_at: Instant::now(),
        })
    }

    /// Attach an infection advisor.
    pub fn with_advisor(mut self, advisor: Arc<dyn InfectionAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Classifier in use.
    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    /// Advance every subject by one tick, timestamped with monotonic
    /// seconds since the orchestrator was created.
    pub fn tick(&self, subjects: &[Subject]) -> Vec<SubjectSnapshot> {
        let tick = self.tick_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let now_secs = self.started_at.elapsed().as_secs_f64();
        self.tick_at(tick, now_secs, subjects)
    }

    /// Advance every subject to `tick` at timestamp `now_secs`.
    pub fn tick_at(&self, tick: u64, now_secs: f64, subjects: &[Subject]) -> Vec<SubjectSnapshot> {
        subjects
            .iter()
            .map(|subject| self.tick_subject(tick, now_secs, subject))
            .collect()
    }

    /// Advance one subject to `tick`.
    ///
    /// A tick at or before the subject's last processed tick returns the
    /// cached snapshot without touching any state.
    pub fn tick_subject(&self, tick: u64, now_secs: f64, subject: &Subject) -> SubjectSnapshot {
        let id = subject.id;
        let cell = self.subject_cell(id);
        let mut state = cell.lock();

        if let (Some(last), Some(cached)) = (state.last_tick, state.last_snapshot.as_ref()) {
            if tick <= last {
                debug!(subject = %id, tick, last, "tick already processed");
                return cached.clone();
            }
        }

        let SubjectState { simulation, rng, .. } = &mut *state;
        let reading = self.simulator.next(simulation, now_secs, rng);
        let classification = self.classifier.classify(&reading, state.status.as_ref());
        let mut status = classification.status;

        let advice = self.pending.lock().remove(&id);
        if let Some(advice) = advice {
            let on_next_tick = state.last_tick == Some(advice.tick)
                && advice.generation == self.generation.load(Ordering::SeqCst);
            if on_next_tick
                && advice.verdict.is_infection
                && matches!(status, HealthStatus::Warning | HealthStatus::Alert)
            {
                info!(
                    subject = %id,
                    method = %advice.verdict.method,
                    confidence = advice.verdict.confidence,
                    "advisory upgraded status to infection"
                );
                status = HealthStatus::Infection;
            }
        }

        let previous_status = state.status.map(|entry| entry.status);
        if previous_status != Some(status) {
            if classification.escalated() && status == HealthStatus::Infection {
                warn!(
                    subject = %id,
                    alert_secs = classification.alert_duration_secs,
                    "sustained alert escalated to infection"
                );
            } else if let Some(trigger) = classification.trigger {
                warn!(subject = %id, %trigger, "infection pattern detected");
            } else {
                debug!(subject = %id, from = ?previous_status, to = %status, "status changed");
            }
        }

        let reading = reading.with_alert_duration(classification.alert_duration_secs);
        state.status = Some(StatusHistoryEntry {
            status,
            ..classification.entry(reading.timestamp_secs)
        });
        self.history.write().append(id, reading.clone());

        let snapshot = SubjectSnapshot {
            subject: subject.clone(),
            reading,
            status,
            alert_duration_secs: classification.alert_duration_secs,
            tick,
        };
        state.last_tick = Some(tick);
        state.last_snapshot = Some(snapshot.clone());
        drop(state);

        self.dispatch_advisory(id, tick, &snapshot.reading);
        snapshot
    }

    /// Readings for `id`, oldest first. Empty for an unknown subject.
    pub fn history(&self, id: SubjectId) -> Vec<VitalReading> {
        self.history.read().history(id)
    }

    /// Summary statistics over the retained readings of `id`.
    pub fn stats(&self, id: SubjectId) -> Option<VitalStats> {
        self.history.read().stats(id)
    }

    /// Most recent snapshot emitted for `id`.
    pub fn latest(&self, id: SubjectId) -> Option<SubjectSnapshot> {
        let cell = self.subjects.read().get(&id).cloned()?;
        let state = cell.lock();
        state.last_snapshot.clone()
    }

    /// Number of subjects with state.
    pub fn subject_count(&self) -> usize {
        self.subjects.read().len()
    }

    /// Drop all per-subject state, history and pending advice.
    pub fn reset(&self) {
        self.subjects.write().clear();
        self.history.write().clear();
        {
            let mut pending = self.pending.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            pending.clear();
        }
        self.tick_counter.store(0, Ordering::SeqCst);
        info!("orchestrator state reset");
    }

    fn subject_cell(&self, id: SubjectId) -> Arc<Mutex<SubjectState>> {
        if let Some(cell) = self.subjects.read().get(&id) {
            return Arc::clone(cell);
        }
        let mut subjects = self.subjects.write();
        let cell = subjects.entry(id).or_insert_with(|| {
            debug!(subject = %id, "tracking new subject");
            Arc::new(Mutex::new(SubjectState::new(id, self.config.seed)))
        });
        Arc::clone(cell)
    }

    /// Fire-and-forget advisory call; the verdict lands in `pending`.
    fn dispatch_advisory(&self, id: SubjectId, tick: u64, reading: &VitalReading) {
        let Some(advisor) = self.advisor.clone() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(subject = %id, "no async runtime, advisory skipped");
            return;
        };

        let pending = Arc::clone(&self.pending);
        let generation = Arc::clone(&self.generation);
        let dispatched_in = generation.load(Ordering::SeqCst);
        let timeout_ms = self.config.advisory_timeout_ms;
        let reading = reading.clone();
        handle.spawn(async move {
            let result =
                match tokio::time::timeout(Duration::from_millis(timeout_ms), advisor.assess(&reading))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AdvisoryError::Timeout(timeout_ms)),
                };
            match result {
                Ok(verdict) => {
                    let mut pending = pending.lock();
                    if generation.load(Ordering::SeqCst) != dispatched_in {
                        debug!(subject = %id, tick, "verdict from before reset dropped");
                        return;
                    }
                    // Verdicts may land out of order; keep the newest.
                    if pending.get(&id).map_or(true, |p| p.tick < tick) {
                        let advice = PendingAdvice { generation: dispatched_in, tick, verdict };
                        pending.insert(id, advice);
                    }
                }
                Err(AdvisoryError::Unavailable(reason)) => {
                    debug!(subject = %id, advisor = advisor.name(), %reason, "advisor unavailable");
                }
                Err(e) => {
                    let err = VitalsError::from(e);
                    warn!(subject = %id, advisor = advisor.name(), error = %err, "advisory failed");
                }
            }
        });
    }
}
