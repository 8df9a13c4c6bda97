use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use super::snapshot::{KeyMetrics, Snapshot};

const DEFAULT_CAPACITY: usize = 60;
// Larger stores grow on demand.
const PREALLOCATED_ENTRIES: usize = 1024;

/// Mean of the key metrics over a run of history entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowAverage {
    pub samples: usize,
    #[serde(skip)]
    pub first: SystemTime,
    #[serde(skip)]
    pub last: SystemTime,
    pub mean: KeyMetrics,
}

/// Per-field extremes over a run of history entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowRange {
    pub samples: usize,
    pub min: KeyMetrics,
    pub max: KeyMetrics,
}

/// Fixed-capacity rolling history of snapshots.
///
/// Entries are stored as owned copies and every read hands out fresh copies,
/// so nothing a caller does to a returned [`Snapshot`] reaches the store.
/// Once full, each `add` evicts the oldest entry.
#[derive(Debug)]
pub struct HistoryStore {
    entries: RwLock<VecDeque<Snapshot>>,
    capacity: usize,
}

impl HistoryStore {
    /// A zero capacity falls back to 60 entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(PREALLOCATED_ENTRIES))),
            capacity,
        }
    }

    pub fn add(&self, snapshot: &Snapshot) {
        let copy = snapshot.clone();
        let mut entries = self.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(copy);
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.read().back().cloned()
    }

    /// The `n` newest entries, oldest first. Returns everything when fewer
    /// than `n` are stored.
    pub fn last(&self, n: usize) -> Vec<Snapshot> {
        let entries = self.read();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn all(&self) -> Vec<Snapshot> {
        self.last(self.capacity)
    }

    /// Average over the `n` newest entries, `None` when the store is empty or `n` is 0.
    pub fn average(&self, n: usize) -> Option<WindowAverage> {
        let entries = self.read();
        let skip = entries.len().saturating_sub(n);
        average_of(entries.iter().skip(skip))
    }

    pub fn min_max(&self, n: usize) -> Option<WindowRange> {
        let entries = self.read();
        let skip = entries.len().saturating_sub(n);
        range_of(entries.iter().skip(skip))
    }

    /// Average over entries no older than `window` before the newest entry.
    pub fn average_over(&self, window: Duration) -> Option<WindowAverage> {
        let entries = self.read();
        let cutoff = window_cutoff(&entries, window)?;
        average_of(entries.iter().filter(|s| s.timestamp >= cutoff))
    }

    pub fn min_max_over(&self, window: Duration) -> Option<WindowRange> {
        let entries = self.read();
        let cutoff = window_cutoff(&entries, window)?;
        range_of(entries.iter().filter(|s| s.timestamp >= cutoff))
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.read().len() == self.capacity
    }

    // A writer can only panic between whole push/pop calls, so a poisoned
    // buffer is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Snapshot>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Snapshot>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn window_cutoff(entries: &VecDeque<Snapshot>, window: Duration) -> Option<SystemTime> {
    let newest = entries.back()?.timestamp;
    Some(newest.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH))
}

fn average_of<'a>(snapshots: impl Iterator<Item = &'a Snapshot>) -> Option<WindowAverage> {
    let mut samples = 0usize;
    let mut first = None;
    let mut last = None;
    let mut sum = KeyMetrics::default();
    for snapshot in snapshots {
        samples += 1;
        first.get_or_insert(snapshot.timestamp);
        last = Some(snapshot.timestamp);
        sum = sum.zip_with(snapshot.key_metrics(), |a, b| a + b);
    }
    let (first, last) = (first?, last?);
    let n = samples as f64;
    Some(WindowAverage {
        samples,
        first,
        last,
        mean: sum.map(|total| total / n),
    })
}

fn range_of<'a>(mut snapshots: impl Iterator<Item = &'a Snapshot>) -> Option<WindowRange> {
    let seed = snapshots.next()?.key_metrics();
    let mut range = WindowRange {
        samples: 1,
        min: seed,
        max: seed,
    };
    for snapshot in snapshots {
        let metrics = snapshot.key_metrics();
        range.samples += 1;
        range.min = range.min.zip_with(metrics, f64::min);
        range.max = range.max.zip_with(metrics, f64::max);
    }
    Some(range)
}
