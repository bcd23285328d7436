//! DecisionEngine: picks and carries out one action per path
//!
//! Every path goes through the same steps: the timer gate, a classification
//! by which trees hold it, digest comparison where needed, then at most one
//! action. Failures are folded into the returned report entry; nothing here
//! aborts a pass.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use vault_fs::constants::CONFLICT_TIMESTAMP_FORMAT;
use vault_fs::{Digest, NormalizedPath, RobustnessConfig, Side, VaultLayout, WriteOutcome, io};

use super::decision::{self, Case, Deletion, Verdict};
use super::state::{SyncState, lock};
use crate::clock::Clock;
use crate::config::Timing;
use crate::filter::EphemeralPolicy;
use crate::history::HistoryStore;
use crate::report::{FailureKind, Outcome, PathReport, SyncAction};
use crate::snapshot::{SideSnapshot, TreeSnapshot};
use crate::tracker::TimerDecision;

/// What happened to one path during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    CoolingDown,
    Waiting,
    InSync,
    Acted(PathReport),
}

/// Why an action stopped before completing.
#[derive(Debug)]
enum Halt {
    Fs(vault_fs::Error),
    Defer(String),
}

impl From<vault_fs::Error> for Halt {
    fn from(err: vault_fs::Error) -> Self {
        Self::Fs(err)
    }
}

type Step<T> = std::result::Result<T, Halt>;

/// Highest attempt count seen across the writes of one action.
#[derive(Debug, Default)]
struct Tally {
    attempts: u32,
}

impl Tally {
    fn add(&mut self, outcome: WriteOutcome) {
        let attempts = outcome.attempts + u32::from(outcome.forced);
        self.attempts = self.attempts.max(attempts);
    }
}

enum Decided {
    /// The path vanished from every tree
    Gone,
    InSync,
    /// New file not ready to seed
    Ephemeral,
    Acted {
        action: SyncAction,
        result: Step<Tally>,
    },
}

impl Decided {
    fn inspect_failed(halt: Halt) -> Self {
        Self::Acted {
            action: SyncAction::Inspect,
            result: Err(halt),
        }
    }
}

/// Decides and executes the action for a single path.
pub struct DecisionEngine {
    layout: VaultLayout,
    history: HistoryStore,
    robustness: RobustnessConfig,
    stabilize_wait: Duration,
    ephemeral: EphemeralPolicy,
    clock: Arc<dyn Clock>,
}

impl DecisionEngine {
    pub fn new(
        layout: VaultLayout,
        timing: &Timing,
        robustness: RobustnessConfig,
        ephemeral: EphemeralPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = HistoryStore::new(layout.history.clone(), robustness);
        Self {
            layout,
            history,
            robustness,
            stabilize_wait: timing.stabilize_wait,
            ephemeral,
            clock,
        }
    }

    /// Run `rel` through the gate and, if it proceeds, decide and act.
    ///
    /// The state lock is only held for map updates, never across I/O.
    pub fn evaluate(&self, rel: &NormalizedPath, state: &Mutex<SyncState>) -> Evaluation {
        let snapshot = TreeSnapshot::capture(&self.layout, rel);
        let now = self.clock.now();

        let (decision, known_in_sync) = {
            let mut state = lock(state);
            let previous = state.observations.get(rel).copied();
            let changed = previous.is_none_or(|seen| !seen.snapshot.same_stat(&snapshot));
            let decision = state.tracker.observe(rel, changed, now);
            let known_in_sync = !changed && previous.is_some_and(|seen| seen.in_sync);
            if decision != TimerDecision::Skip {
                state.observe(rel, snapshot, known_in_sync);
            }
            (decision, known_in_sync)
        };
        tracing::debug!(path = %rel, ?decision, "gate");

        match decision {
            TimerDecision::Skip => return Evaluation::CoolingDown,
            TimerDecision::Wait => return Evaluation::Waiting,
            TimerDecision::Proceed if known_in_sync => return Evaluation::InSync,
            TimerDecision::Proceed => {}
        }

        match self.decide(rel, &snapshot) {
            Decided::Gone => {
                lock(state).forget(rel);
                Evaluation::InSync
            }
            Decided::InSync => {
                lock(state).observe(rel, snapshot, true);
                Evaluation::InSync
            }
            Decided::Ephemeral => {
                tracing::debug!(path = %rel, "new file looks ephemeral, deferring seed");
                lock(state).tracker.defer(rel, self.clock.now());
                Evaluation::Waiting
            }
            Decided::Acted { action, result } => self.finish(rel, action, result, state),
        }
    }

    fn decide(&self, rel: &NormalizedPath, snapshot: &TreeSnapshot) -> Decided {
        match Case::classify(snapshot.presence()) {
            Case::AllMissing => Decided::Gone,
            Case::HistoryOnly => self.apply(SyncAction::PruneHistory, |_| {
                self.history.delete(rel)?;
                Ok(())
            }),
            Case::LocalDeleted => self.deleted(rel, Side::Local),
            Case::CloudDeleted => self.deleted(rel, Side::Cloud),
            Case::NewLocal => self.seed(rel, Side::Local, snapshot.local.size),
            Case::NewCloud => self.seed(rel, Side::Cloud, snapshot.cloud.size),
            Case::HistoryMissing => {
                let (local, cloud) = match self.digest_pair(rel, Side::Local, Side::Cloud) {
                    Ok(pair) => pair,
                    Err(halt) => return Decided::inspect_failed(halt),
                };
                if local == cloud {
                    self.apply(SyncAction::RecordHistory, |tally| {
                        self.copy(rel, Side::Local, Side::History, tally)
                    })
                } else {
                    self.resolve_conflict(rel, local, cloud)
                }
            }
            Case::AllPresent => self.steady(rel),
        }
    }

    /// One side is gone but history remembers the path.
    fn deleted(&self, rel: &NormalizedPath, missing: Side) -> Decided {
        let survivor = missing.opposite().unwrap_or(Side::Cloud);
        let (current, remembered) = match self.digest_pair(rel, survivor, Side::History) {
            Ok(pair) => pair,
            Err(halt) => return Decided::inspect_failed(halt),
        };

        match decision::deletion(current, remembered) {
            Deletion::Propagate => {
                let action = match survivor {
                    Side::Cloud => SyncAction::DeleteCloud,
                    _ => SyncAction::DeleteLocal,
                };
                self.apply(action, |_| {
                    self.remove(rel, survivor)?;
                    self.remove(rel, Side::History)
                })
            }
            Deletion::Restore => {
                let action = match survivor {
                    Side::Cloud => SyncAction::Restore,
                    _ => SyncAction::Push,
                };
                self.apply(action, |tally| {
                    self.copy(rel, survivor, missing, tally)?;
                    self.copy(rel, survivor, Side::History, tally)
                })
            }
        }
    }

    /// A file that exists on one side only.
    ///
    /// The other side is written before history: a history entry without
    /// the second copy would read as a deletion on the next pass.
    fn seed(&self, rel: &NormalizedPath, origin: Side, size: u64) -> Decided {
        if self.ephemeral.is_ephemeral(rel, size) {
            return Decided::Ephemeral;
        }
        let target = origin.opposite().unwrap_or(Side::Cloud);
        let action = match origin {
            Side::Local => SyncAction::SeedFromLocal,
            _ => SyncAction::SeedFromCloud,
        };
        self.apply(action, |tally| {
            self.copy(rel, origin, target, tally)?;
            self.copy(rel, origin, Side::History, tally)
        })
    }

    /// All three trees hold the path.
    fn steady(&self, rel: &NormalizedPath) -> Decided {
        let digests = self
            .digest_pair(rel, Side::Local, Side::Cloud)
            .and_then(|(l, c)| Ok((l, c, self.digest(rel, Side::History)?)));
        let (local, cloud, history) = match digests {
            Ok(digests) => digests,
            Err(halt) => return Decided::inspect_failed(halt),
        };

        match decision::compare(local, cloud, history) {
            Verdict::InSync => Decided::InSync,
            Verdict::Converged => self.apply(SyncAction::RecordHistory, |tally| {
                self.copy(rel, Side::Local, Side::History, tally)
            }),
            Verdict::LocalChanged => self.apply(SyncAction::Push, |tally| {
                self.copy(rel, Side::Local, Side::Cloud, tally)?;
                self.copy(rel, Side::Local, Side::History, tally)
            }),
            Verdict::CloudChanged => self.apply(SyncAction::Restore, |tally| {
                self.copy(rel, Side::Cloud, Side::Local, tally)?;
                self.copy(rel, Side::Cloud, Side::History, tally)
            }),
            Verdict::Conflict => self.resolve_conflict(rel, local, cloud),
        }
    }

    /// Both sides diverged from history and from each other.
    ///
    /// Waits out the stabilize window once, then re-reads both sides to see
    /// which one is still moving.
    fn resolve_conflict(&self, rel: &NormalizedPath, local: Digest, cloud: Digest) -> Decided {
        tracing::warn!(
            path = %rel,
            wait_secs = self.stabilize_wait.as_secs_f64(),
            "conflict: both sides changed, waiting for them to settle"
        );
        self.clock.sleep(self.stabilize_wait);

        let (local_now, cloud_now) = match self.digest_pair(rel, Side::Local, Side::Cloud) {
            Ok(pair) => pair,
            Err(halt) => return Decided::inspect_failed(halt),
        };
        let local_mtime = SideSnapshot::stat(&self.layout.resolve(Side::Local, rel)).mtime;
        let cloud_mtime = SideSnapshot::stat(&self.layout.resolve(Side::Cloud, rel)).mtime;

        let resolution = decision::pick_winner(
            local_now != local,
            cloud_now != cloud,
            local_mtime,
            cloud_mtime,
        );
        let winner = resolution.winner;
        let loser = resolution.loser();
        let duplicate = resolution.duplicate.then(|| self.duplicate_path(rel));

        tracing::warn!(
            path = %rel,
            winner = %winner,
            duplicate = duplicate.as_ref().map(|d| d.as_str()),
            "conflict resolved"
        );

        let action = SyncAction::ResolveConflict {
            winner,
            duplicate: duplicate.clone(),
        };
        self.apply(action, |tally| {
            if let Some(dup) = &duplicate {
                let src = self.layout.resolve(loser, rel);
                let dst = self.layout.resolve(loser, dup);
                tally.add(io::copy_atomic(src, dst, self.robustness)?);
            }
            self.copy(rel, winner, loser, tally)?;
            self.copy(rel, winner, Side::History, tally)
        })
    }

    /// First conflict name for `rel` that no tree uses yet.
    fn duplicate_path(&self, rel: &NormalizedPath) -> NormalizedPath {
        let stamp = self
            .clock
            .now()
            .with_timezone(&Local)
            .format(CONFLICT_TIMESTAMP_FORMAT)
            .to_string();
        let mut counter = 0;
        loop {
            let candidate = rel.conflict_sibling(&stamp, counter);
            let taken = Side::ALL
                .iter()
                .any(|&side| self.layout.resolve(side, &candidate).exists());
            if !taken {
                return candidate;
            }
            counter += 1;
        }
    }

    fn apply<F>(&self, action: SyncAction, op: F) -> Decided
    where
        F: FnOnce(&mut Tally) -> Step<()>,
    {
        let mut tally = Tally::default();
        let result = op(&mut tally).map(|()| tally);
        Decided::Acted { action, result }
    }

    fn digest(&self, rel: &NormalizedPath, side: Side) -> Step<Digest> {
        let digest = match side {
            Side::History => self.history.fingerprint(rel)?,
            _ => vault_fs::fingerprint(&self.layout.resolve(side, rel), self.robustness)?,
        };
        digest.ok_or_else(|| Halt::Defer(format!("{side} copy disappeared")))
    }

    fn digest_pair(&self, rel: &NormalizedPath, a: Side, b: Side) -> Step<(Digest, Digest)> {
        Ok((self.digest(rel, a)?, self.digest(rel, b)?))
    }

    fn copy(&self, rel: &NormalizedPath, from: Side, to: Side, tally: &mut Tally) -> Step<()> {
        let src = self.layout.resolve(from, rel);
        let outcome = match to {
            Side::History => self.history.write_from(rel, &src)?,
            _ => io::copy_atomic(&src, self.layout.resolve(to, rel), self.robustness)?,
        };
        tally.add(outcome);
        Ok(())
    }

    fn remove(&self, rel: &NormalizedPath, side: Side) -> Step<()> {
        match side {
            Side::History => self.history.delete(rel)?,
            _ => io::remove_file(self.layout.resolve(side, rel), self.robustness)?,
        };
        Ok(())
    }

    fn finish(
        &self,
        rel: &NormalizedPath,
        action: SyncAction,
        result: Step<Tally>,
        state: &Mutex<SyncState>,
    ) -> Evaluation {
        let outcome = outcome_of(result);
        log_outcome(rel, &action, &outcome);

        let after = TreeSnapshot::capture(&self.layout, rel);
        let now = self.clock.now();
        let mut state = lock(state);
        if action != SyncAction::Inspect {
            state.tracker.mark_acted(rel, now);
            if let SyncAction::ResolveConflict {
                duplicate: Some(dup),
                ..
            } = &action
            {
                state.tracker.mark_acted(dup, now);
            }
        }
        state.observe(rel, after, false);

        Evaluation::Acted(PathReport {
            path: rel.clone(),
            action,
            outcome,
        })
    }
}

fn outcome_of(result: Step<Tally>) -> Outcome {
    match result {
        Ok(tally) if tally.attempts > 1 => Outcome::Retried {
            attempts: tally.attempts,
        },
        Ok(_) => Outcome::Succeeded,
        Err(Halt::Defer(reason)) => Outcome::Deferred { reason },
        Err(Halt::Fs(err)) => classify(&err),
    }
}

fn classify(err: &vault_fs::Error) -> Outcome {
    let reason = err.to_string();
    match err {
        vault_fs::Error::Locked { .. } => Outcome::Deferred { reason },
        vault_fs::Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            Outcome::Deferred { reason }
        }
        vault_fs::Error::WriteBlocked { .. } => Outcome::Failed {
            kind: FailureKind::WriteBlocked,
            reason,
        },
        vault_fs::Error::Unreadable { .. } => Outcome::Failed {
            kind: FailureKind::Unreadable,
            reason,
        },
        _ => Outcome::Failed {
            kind: FailureKind::Io,
            reason,
        },
    }
}

fn log_outcome(rel: &NormalizedPath, action: &SyncAction, outcome: &Outcome) {
    match outcome {
        Outcome::Succeeded => tracing::info!(path = %rel, action = %action, "applied"),
        Outcome::Retried { attempts } => {
            tracing::warn!(path = %rel, action = %action, attempts, "applied after retries")
        }
        Outcome::Deferred { reason } => {
            tracing::warn!(path = %rel, action = %action, reason = %reason, "deferred")
        }
        Outcome::Failed { kind, reason } => {
            tracing::error!(path = %rel, action = %action, ?kind, reason = %reason, "failed")
        }
    }
}
