//! Per-path stabilization and cooldown timers
//!
//! A path is only acted on once its changed state has persisted for the
//! stabilization window, and is left alone for the cooldown after every
//! action so the engine does not chase its own writes.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use vault_fs::NormalizedPath;

use crate::clock;

/// What the gate allows for a path on this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDecision {
    /// Under cooldown; do nothing
    Skip,
    /// Changed too recently; do nothing yet
    Wait,
    /// Stable long enough to act on
    Proceed,
}

/// Timer state held for one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathTimerState {
    pub first_seen_changed_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl PathTimerState {
    fn is_idle(&self) -> bool {
        self.first_seen_changed_at.is_none() && self.cooldown_until.is_none()
    }
}

/// In-memory timer store keyed by tracked path.
#[derive(Debug, Clone)]
pub struct PathStateTracker {
    stability_window: Duration,
    cooldown: Duration,
    states: HashMap<NormalizedPath, PathTimerState>,
}

impl PathStateTracker {
    pub fn new(stability_window: Duration, cooldown: Duration) -> Self {
        Self {
            stability_window,
            cooldown,
            states: HashMap::new(),
        }
    }

    /// Run the gate for `path`.
    ///
    /// The first change starts the stabilization clock; later changes do not
    /// restart it. Once the window has elapsed the path proceeds and the
    /// clock is cleared.
    pub fn observe(
        &mut self,
        path: &NormalizedPath,
        changed_now: bool,
        now: DateTime<Utc>,
    ) -> TimerDecision {
        let state = self.states.entry(path.clone()).or_default();

        if let Some(until) = state.cooldown_until {
            if until > now {
                return TimerDecision::Skip;
            }
            state.cooldown_until = None;
        }

        let decision = match state.first_seen_changed_at {
            None if changed_now => {
                state.first_seen_changed_at = Some(now);
                TimerDecision::Wait
            }
            Some(first) if now < clock::add(first, self.stability_window) => TimerDecision::Wait,
            _ => {
                state.first_seen_changed_at = None;
                TimerDecision::Proceed
            }
        };

        if state.is_idle() {
            self.states.remove(path);
        }
        decision
    }

    /// Start the cooldown for `path`.
    pub fn mark_acted(&mut self, path: &NormalizedPath, now: DateTime<Utc>) {
        let state = self.states.entry(path.clone()).or_default();
        state.first_seen_changed_at = None;
        state.cooldown_until = Some(clock::add(now, self.cooldown));
    }

    /// Restart the stabilization window for a path whose action was
    /// postponed.
    pub fn defer(&mut self, path: &NormalizedPath, now: DateTime<Utc>) {
        self.states.entry(path.clone()).or_default().first_seen_changed_at = Some(now);
    }

    /// Drop every timer for `path`.
    pub fn forget(&mut self, path: &NormalizedPath) {
        self.states.remove(path);
    }

    pub fn state(&self, path: &NormalizedPath) -> Option<PathTimerState> {
        self.states.get(path).copied()
    }

    /// Keep state only for paths still present in some tree, plus any path
    /// whose cooldown has not expired by `now`.
    pub fn retain<F>(&mut self, now: DateTime<Utc>, mut keep: F)
    where
        F: FnMut(&NormalizedPath) -> bool,
    {
        self.states.retain(|path, state| {
            keep(path) || state.cooldown_until.is_some_and(|until| until > now)
        });
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
