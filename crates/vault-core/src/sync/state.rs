//! Process-lifetime memory of what the engine has seen and done

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use vault_fs::NormalizedPath;

use crate::config::Timing;
use crate::snapshot::TreeSnapshot;
use crate::tracker::PathStateTracker;

/// The engine's last look at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Stat facts only; digests are never kept
    pub snapshot: TreeSnapshot,
    /// All three digests matched when this was recorded
    pub in_sync: bool,
}

/// Timers and observations for every live path.
#[derive(Debug)]
pub struct SyncState {
    pub tracker: PathStateTracker,
    pub observations: HashMap<NormalizedPath, Observation>,
}

impl SyncState {
    pub fn new(timing: &Timing) -> Self {
        Self {
            tracker: PathStateTracker::new(timing.stability_window, timing.cooldown),
            observations: HashMap::new(),
        }
    }

    /// Record a fresh observation. Digests are dropped.
    pub fn observe(&mut self, path: &NormalizedPath, mut snapshot: TreeSnapshot, in_sync: bool) {
        snapshot.local.digest = None;
        snapshot.cloud.digest = None;
        snapshot.history.digest = None;
        self.observations
            .insert(path.clone(), Observation { snapshot, in_sync });
    }

    pub fn forget(&mut self, path: &NormalizedPath) {
        self.tracker.forget(path);
        self.observations.remove(path);
    }

    /// Drop state for paths no longer present in any tree. Timers of a
    /// vanished path survive until its cooldown expires.
    pub fn retain<F>(&mut self, now: DateTime<Utc>, keep: F)
    where
        F: Fn(&NormalizedPath) -> bool,
    {
        self.observations.retain(|path, _| keep(path));
        self.tracker.retain(now, |path| keep(path));
    }
}

/// Lock the shared state, recovering it if a worker panicked while holding
/// it.
pub(crate) fn lock(state: &Mutex<SyncState>) -> MutexGuard<'_, SyncState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
