//! End-to-end tests for the monitor pipeline.
//!
//! Simulation runs are seeded; classification scenarios use hand-built
//! readings with explicit timestamps.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use athlete_monitor_vitals::advisory::AdvisoryResult;
use athlete_monitor_vitals::{
    default_roster, HealthStatus, HistoryStore, InfectionAdvisor, MonitorConfig, NoopAdvisor,
    SimulationOrchestrator, SimulatorConfig, StatusClassifier, StatusHistoryEntry, Subject,
    SubjectId, VitalKind, VitalRange, VitalRangeTable, VitalReading,
};

fn seeded(seed: u64) -> SimulationOrchestrator {
    SimulationOrchestrator::new(MonitorConfig::builder().seed(seed).build()).unwrap()
}

#[test]
fn test_hard_bounds_hold_over_long_runs() {
    let config = MonitorConfig::builder()
        .seed(2024)
        .simulator(SimulatorConfig {
            incident_probability: 0.05,
            ..SimulatorConfig::default()
        })
        .build();
    let bounds = config.simulator.hard_bounds;
    let orch = SimulationOrchestrator::new(config).unwrap();
    let squad = default_roster();

    for tick in 1..=600 {
        for snapshot in orch.tick_at(tick, tick as f64, &squad) {
            for kind in VitalKind::ALL {
                let value = snapshot.reading.value(kind).unwrap();
                let (lo, hi) = bounds.get(kind);
                assert!(
                    (lo..=hi).contains(&value),
                    "tick {tick}: {kind} = {value} outside [{lo}, {hi}]"
                );
            }
        }
    }
}

#[test]
fn test_history_is_bounded_to_most_recent() {
    let orch = seeded(1);
    let squad = vec![Subject::new(1, "John Smith", 10, "Forward")];
    let mut emitted = Vec::new();
    for tick in 1..=75 {
        let snapshots = orch.tick_at(tick, tick as f64, &squad);
        emitted.push(snapshots[0].reading.clone());
    }

    let history = orch.history(SubjectId(1));
    assert_eq!(history.len(), 60);
    assert_eq!(history.as_slice(), &emitted[15..]);
}

#[test]
fn test_history_store_fifo_eviction() {
    let mut store = HistoryStore::new(60);
    let id = SubjectId(4);
    for i in 0..100 {
        store.append(id, VitalReading::primary(37.0, 70.0, 98.0, i as f64));
    }
    let history = store.history(id);
    assert_eq!(history.len(), 60);
    assert!((history[0].timestamp_secs - 40.0).abs() < f64::EPSILON);
    assert!((history[59].timestamp_secs - 99.0).abs() < f64::EPSILON);
}

#[test]
fn test_unknown_subject_history_is_empty() {
    let orch = seeded(2);
    orch.tick_at(1, 0.0, &default_roster());
    assert!(orch.history(SubjectId(404)).is_empty());
    assert!(orch.stats(SubjectId(404)).is_none());
}

#[test]
fn test_classification_is_idempotent() {
    let classifier = StatusClassifier::default();
    let reading = VitalReading {
        hydration: Some(55.0),
        respiration: Some(22.0),
        fatigue: Some(75.0),
        ..VitalReading::primary(37.9, 103.0, 94.5, 10.0)
    };
    let first = classifier.classify(&reading, None);
    let second = classifier.classify(&reading, None);
    assert_eq!(first, second);
}

#[test]
fn test_rule_based_infection_on_first_tick() {
    let classifier = StatusClassifier::default();
    let reading = VitalReading {
        hydration: Some(80.0),
        respiration: Some(18.0),
        fatigue: Some(40.0),
        ..VitalReading::primary(39.2, 112.0, 96.0, 0.0)
    };
    assert_eq!(classifier.classify(&reading, None).status, HealthStatus::Infection);
}

#[test]
fn test_sustained_alert_escalates_at_31_seconds() {
    let classifier = StatusClassifier::default();
    let mut previous: Option<StatusHistoryEntry> = None;
    let mut statuses = Vec::new();

    // Oxygen at 91 % is an alert but never an infection pattern.
    for second in 0..=31 {
        let reading = VitalReading::primary(36.9, 75.0, 91.0, second as f64);
        let c = classifier.classify(&reading, previous.as_ref());
        assert!(c.trigger.is_none());
        statuses.push(c.status);
        previous = Some(c.entry(reading.timestamp_secs));
    }

    assert!(statuses[..31].iter().all(|s| *s == HealthStatus::Alert));
    assert_eq!(statuses[31], HealthStatus::Infection);
}

#[test]
fn test_heart_rate_band_edges() {
    let classifier = StatusClassifier::default();
    let hr = |bpm: f64| {
        classifier
            .vital_status(&VitalReading::primary(37.0, bpm, 98.0, 0.0), VitalKind::HeartRate)
            .unwrap()
    };
    assert_eq!(hr(100.0), HealthStatus::Normal);
    assert_eq!(hr(103.0), HealthStatus::Warning);
    assert_eq!(hr(104.0 + 1e-6), HealthStatus::Alert);
}

#[test]
fn test_custom_range_table_drives_classification() {
    let mut ranges = VitalRangeTable::default();
    ranges.heart_rate = VitalRange::simple(50.0, 90.0);
    let classifier = StatusClassifier::new(ranges, 30.0);
    let c = classifier.classify(&VitalReading::primary(37.0, 95.0, 98.0, 0.0), None);
    assert_eq!(c.status, HealthStatus::Alert);
}

#[test]
fn test_duplicate_tick_does_not_advance() {
    let orch = seeded(3);
    let squad = default_roster();
    orch.tick_at(1, 0.0, &squad);
    let second = orch.tick_at(2, 1.0, &squad);

    // Same tick requested concurrently from several threads.
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let again = orch.tick_at(2, 1.5, &squad);
                assert_eq!(again, second);
            });
        }
    });
    assert_eq!(orch.history(squad[0].id).len(), 2);

    let control = seeded(3);
    control.tick_at(1, 0.0, &squad);
    control.tick_at(2, 1.0, &squad);
    assert_eq!(
        orch.tick_at(3, 2.0, &squad),
        control.tick_at(3, 2.0, &squad)
    );
}

#[test]
fn test_reset_starts_from_scratch() {
    let orch = seeded(4);
    let squad = default_roster();
    let first = orch.tick_at(1, 0.0, &squad);
    orch.tick_at(2, 1.0, &squad);

    orch.reset();
    assert_eq!(orch.subject_count(), 0);
    assert!(orch.history(squad[0].id).is_empty());

    let replay = orch.tick_at(1, 0.0, &squad);
    assert_eq!(replay, first);
}

/// Config under which every tick is a plain alert: the temperature range
/// sits far below body temperature and no incidents start.
fn always_alert_config() -> MonitorConfig {
    let mut ranges = VitalRangeTable::default();
    ranges.temperature = VitalRange::simple(20.0, 30.0);
    MonitorConfig::builder()
        .seed(11)
        .escalation_secs(1.0e6)
        .ranges(ranges)
        .simulator(SimulatorConfig {
            incident_probability: 0.0,
            ..SimulatorConfig::default()
        })
        .build()
}

#[test]
fn test_orchestrator_escalates_sustained_alert() {
    let mut config = always_alert_config();
    config.escalation_secs = 30.0;
    let orch = SimulationOrchestrator::new(config).unwrap();
    let squad = vec![Subject::new(2, "Michael Johnson", 7, "Midfielder")];

    for second in 0..=30u64 {
        let snapshot = orch.tick_at(second + 1, second as f64, &squad).remove(0);
        let expected = Some(second as f64);
        assert_eq!(snapshot.status, HealthStatus::Alert, "t={second}");
        assert_eq!(snapshot.alert_duration_secs, expected, "t={second}");
        assert_eq!(snapshot.reading.alert_duration_secs, expected, "t={second}");
    }

    let escalated = orch.tick_at(32, 31.0, &squad).remove(0);
    assert_eq!(escalated.status, HealthStatus::Infection);
    assert_eq!(escalated.reading.alert_duration_secs, Some(31.0));
    assert_eq!(orch.history(squad[0].id).len(), 32);
}

struct ConfidentAdvisor;

#[async_trait]
impl InfectionAdvisor for ConfidentAdvisor {
    async fn infection_probability(&self, _reading: &VitalReading) -> AdvisoryResult<f64> {
        Ok(0.95)
    }

    fn name(&self) -> &str {
        "confident"
    }
}

struct StalledAdvisor;

#[async_trait]
impl InfectionAdvisor for StalledAdvisor {
    async fn infection_probability(&self, _reading: &VitalReading) -> AdvisoryResult<f64> {
        std::future::pending::<AdvisoryResult<f64>>().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

#[tokio::test]
async fn test_advisory_upgrades_next_tick_only() {
    let orch = SimulationOrchestrator::new(always_alert_config())
        .unwrap()
        .with_advisor(Arc::new(ConfidentAdvisor));
    let squad = vec![Subject::new(5, "David Chen", 19, "Midfielder")];

    let first = orch.tick_at(1, 0.0, &squad);
    assert_eq!(first[0].status, HealthStatus::Alert);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = orch.tick_at(2, 1.0, &squad);
    assert_eq!(second[0].status, HealthStatus::Infection);
    assert_eq!(first[0].status, HealthStatus::Alert);

    // No yield in between: tick 2's verdict cannot have arrived yet.
    let third = orch.tick_at(3, 2.0, &squad);
    assert_eq!(third[0].status, HealthStatus::Alert);

    // Verdicts for ticks 2 and 3 are stale by now; only tick 4's applies.
    let fourth = orch.tick_at(4, 3.0, &squad);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fifth = orch.tick_at(5, 4.0, &squad);
    assert_eq!(fourth[0].status, HealthStatus::Alert);
    assert_eq!(fifth[0].status, HealthStatus::Infection);
}

#[tokio::test]
async fn test_reset_discards_verdicts_in_flight() {
    let orch = SimulationOrchestrator::new(always_alert_config())
        .unwrap()
        .with_advisor(Arc::new(ConfidentAdvisor));
    let squad = vec![Subject::new(5, "David Chen", 19, "Midfielder")];

    // No yield: the advisory tasks for ticks 1..=5 are still queued.
    for tick in 1..=5 {
        orch.tick_at(tick, tick as f64, &squad);
    }
    orch.reset();

    let first = orch.tick_at(1, 0.0, &squad);
    assert_eq!(first[0].status, HealthStatus::Alert);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = orch.tick_at(2, 1.0, &squad);
    assert_eq!(second[0].status, HealthStatus::Infection);
}

#[tokio::test]
async fn test_unavailable_advisor_changes_nothing() {
    let squad = default_roster();
    let plain = seeded(12);
    let advised = seeded(12).with_advisor(Arc::new(NoopAdvisor));
    for tick in 1..=10 {
        let expected = plain.tick_at(tick, tick as f64, &squad);
        let actual = advised.tick_at(tick, tick as f64, &squad);
        assert_eq!(actual, expected);
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_stalled_advisor_never_blocks_ticks() {
    let config = MonitorConfig::builder().seed(13).advisory_timeout_ms(5).build();
    let orch = SimulationOrchestrator::new(config)
        .unwrap()
        .with_advisor(Arc::new(StalledAdvisor));
    let squad = default_roster();
    for tick in 1..=5 {
        let snapshots = orch.tick_at(tick, tick as f64, &squad);
        assert_eq!(snapshots.len(), squad.len());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
