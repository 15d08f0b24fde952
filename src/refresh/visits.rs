//! Per-document pass counters

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Counts resolution passes per manifest path for the lifetime of the process.
///
/// Counts only grow; nothing is ever reset or removed.
#[derive(Debug, Default)]
pub struct VisitCounter {
    counts: Mutex<HashMap<PathBuf, u64>>,
}

impl VisitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one pass for `path` and return the updated count
    pub fn record(&self, path: &Path) -> u64 {
        // A poisoned lock still holds valid counts
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(path.to_path_buf()).or_insert(0);
        *count += 1;
        *count
    }

    /// Current count for `path`, zero if it was never resolved
    pub fn get(&self, path: &Path) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.get(path).copied().unwrap_or(0)
    }
}

/// Numbers passes per manifest path in start order.
///
/// A pass may render only while its generation is still the newest one
/// started for that path.
#[derive(Debug, Default)]
pub struct PassGenerations {
    latest: Mutex<HashMap<PathBuf, u64>>,
}

impl PassGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pass for `path` and return its generation
    pub fn begin(&self, path: &Path) -> u64 {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        let generation = latest.entry(path.to_path_buf()).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Whether no pass for `path` has started after `generation`
    pub fn is_current(&self, path: &Path, generation: u64) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.get(path).copied().unwrap_or(0) == generation
    }
}
