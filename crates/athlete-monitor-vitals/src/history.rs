//! Bounded per-subject reading history.
//!
//! Each subject gets a FIFO window of the most recent readings; appending
//! past capacity evicts the oldest entry.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::types::{SubjectId, VitalReading};

/// Default number of readings retained per subject (~1 minute at 1 Hz).
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// Summary statistics over a subject's retained readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalStats {
    /// Number of readings in the window.
    pub count: usize,
    /// Mean heart rate (BPM).
    pub hr_mean: f64,
    /// Min heart rate (BPM).
    pub hr_min: f64,
    /// Max heart rate (BPM).
    pub hr_max: f64,
    /// Mean temperature (°C).
    pub temp_mean: f64,
    /// Min temperature (°C).
    pub temp_min: f64,
    /// Max temperature (°C).
    pub temp_max: f64,
}

/// Rolling window of readings per subject.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    windows: HashMap<SubjectId, VecDeque<VitalReading>>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    /// Create a store retaining at most `capacity` readings per subject.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a reading, evicting the oldest one when at capacity.
    pub fn append(&mut self, id: SubjectId, reading: VitalReading) {
        let window = self
            .windows
            .entry(id)
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        if window.len() >= self.capacity {
            window.pop_front();
        }
        window.push_back(reading);
    }

    /// Readings for `id`, oldest first. Empty for an unknown subject.
    #[must_use]
    pub fn history(&self, id: SubjectId) -> Vec<VitalReading> {
        self.windows
            .get(&id)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recent reading for `id`.
    #[must_use]
    pub fn latest(&self, id: SubjectId) -> Option<&VitalReading> {
        self.windows.get(&id).and_then(|w| w.back())
    }

    /// Number of readings retained for `id`.
    #[must_use]
    pub fn len(&self, id: SubjectId) -> usize {
        self.windows.get(&id).map_or(0, VecDeque::len)
    }

    /// Whether no readings are stored at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.values().all(VecDeque::is_empty)
    }

    /// Maximum readings retained per subject.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Summary statistics over the window for `id`.
    ///
    /// Returns `None` if nothing is stored for the subject.
    #[must_use]
    pub fn stats(&self, id: SubjectId) -> Option<VitalStats> {
        let window = self.windows.get(&id).filter(|w| !w.is_empty())?;

        let n = window.len() as f64;
        let mut hr_sum = 0.0;
        let mut temp_sum = 0.0;
        let mut hr_min = f64::MAX;
        let mut hr_max = f64::MIN;
        let mut temp_min = f64::MAX;
        let mut temp_max = f64::MIN;

        for r in window {
            hr_sum += r.heart_rate;
            temp_sum += r.temperature;
            hr_min = hr_min.min(r.heart_rate);
            hr_max = hr_max.max(r.heart_rate);
            temp_min = temp_min.min(r.temperature);
            temp_max = temp_max.max(r.temperature);
        }

        Some(VitalStats {
            count: window.len(),
            hr_mean: hr_sum / n,
            hr_min,
            hr_max,
            temp_mean: temp_sum / n,
            temp_min,
            temp_max,
        })
    }

    /// Drop every subject's history.
    pub fn clear(&mut self) {
        self.windows.clear();
    }
}
