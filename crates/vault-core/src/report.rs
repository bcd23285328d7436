//! What a sync pass did, path by path

use chrono::{DateTime, Utc};
use serde::Serialize;
use vault_fs::{NormalizedPath, Side};

/// The action chosen for a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncAction {
    /// Local changed: copied to cloud and history
    Push,
    /// Cloud changed: copied to local and history
    Restore,
    /// New local file seeded into history and cloud
    SeedFromLocal,
    /// New cloud file seeded into history and local
    SeedFromCloud,
    /// Both sides already agree; history brought up to date
    RecordHistory,
    /// Local deletion propagated to cloud and history
    DeleteCloud,
    /// Cloud deletion propagated to local and history
    DeleteLocal,
    /// Stale history entry removed
    PruneHistory,
    /// Both sides diverged; the loser's content kept as a duplicate when
    /// the winner was picked by mtime
    ResolveConflict {
        winner: Side,
        duplicate: Option<NormalizedPath>,
    },
    /// The path could not be examined well enough to pick an action
    Inspect,
}

impl SyncAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Restore => "restore",
            Self::SeedFromLocal => "seed-from-local",
            Self::SeedFromCloud => "seed-from-cloud",
            Self::RecordHistory => "record-history",
            Self::DeleteCloud => "delete-cloud",
            Self::DeleteLocal => "delete-local",
            Self::PruneHistory => "prune-history",
            Self::ResolveConflict { .. } => "resolve-conflict",
            Self::Inspect => "inspect",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Category of a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Destination could not be replaced; left untouched
    WriteBlocked,
    /// Source could not be read
    Unreadable,
    /// Any other I/O failure
    Io,
}

/// How an action ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    /// Succeeded after retrying a contended write
    Retried { attempts: u32 },
    /// Put off until a later pass, typically because a file stayed locked
    Deferred { reason: String },
    Failed { kind: FailureKind, reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Retried { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One acted-upon path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathReport {
    pub path: NormalizedPath,
    pub action: SyncAction,
    pub outcome: Outcome,
}

/// Summary of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Paths in the union of the three trees
    pub scanned: usize,
    /// Paths that needed nothing
    pub in_sync: usize,
    /// Paths inside their stabilization window
    pub waiting: usize,
    /// Paths skipped because they were acted on recently
    pub cooling_down: usize,
    pub temp_artifacts_removed: usize,
    /// Paths acted on, in scan order
    pub entries: Vec<PathReport>,
    /// Problems outside any single path, such as unreadable directories
    pub errors: Vec<String>,
}

impl PassReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            scanned: 0,
            in_sync: 0,
            waiting: 0,
            cooling_down: 0,
            temp_artifacts_removed: 0,
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when the pass took no action at all.
    pub fn is_quiet(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when nothing failed.
    pub fn success(&self) -> bool {
        self.errors.is_empty() && !self.entries.iter().any(|e| e.outcome.is_failure())
    }

    pub fn entry(&self, path: &str) -> Option<&PathReport> {
        self.entries.iter().find(|e| e.path.as_str() == path)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PathReport> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    pub fn deferred(&self) -> impl Iterator<Item = &PathReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Deferred { .. }))
    }
}
