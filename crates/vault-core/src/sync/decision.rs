//! Pure decision rules
//!
//! Nothing here touches the filesystem; the engine gathers the facts and
//! carries out whatever these functions pick.

use std::time::SystemTime;

use vault_fs::{Digest, Side};

use crate::snapshot::Presence;

/// Which trees hold the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    AllMissing,
    /// Only a stale history entry is left
    HistoryOnly,
    /// Missing locally, present in cloud and history
    LocalDeleted,
    /// Missing in cloud, present locally and in history
    CloudDeleted,
    NewLocal,
    NewCloud,
    /// Both sides present without a history entry
    HistoryMissing,
    AllPresent,
}

impl Case {
    pub fn classify(presence: Presence) -> Self {
        match (presence.local, presence.cloud, presence.history) {
            (false, false, false) => Self::AllMissing,
            (false, false, true) => Self::HistoryOnly,
            (false, true, true) => Self::LocalDeleted,
            (true, false, true) => Self::CloudDeleted,
            (true, false, false) => Self::NewLocal,
            (false, true, false) => Self::NewCloud,
            (true, true, false) => Self::HistoryMissing,
            (true, true, true) => Self::AllPresent,
        }
    }
}

/// Comparison of the three digests when every tree holds the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    InSync,
    LocalChanged,
    CloudChanged,
    /// Both sides made the same change; only history is behind
    Converged,
    Conflict,
}

pub fn compare(local: Digest, cloud: Digest, history: Digest) -> Verdict {
    match (local == cloud, cloud == history, local == history) {
        (true, true, _) => Verdict::InSync,
        (true, false, _) => Verdict::Converged,
        (false, true, _) => Verdict::LocalChanged,
        (false, false, true) => Verdict::CloudChanged,
        (false, false, false) => Verdict::Conflict,
    }
}

/// What to do when one side is missing but history still has the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The survivor is unchanged since the last sync: the deletion stands
    Propagate,
    /// The survivor was edited: bring the deleted side back
    Restore,
}

pub fn deletion(survivor: Digest, history: Digest) -> Deletion {
    if survivor == history {
        Deletion::Propagate
    } else {
        Deletion::Restore
    }
}

/// Outcome of a conflict tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Side,
    /// Whether the loser's content must be kept as a duplicate
    pub duplicate: bool,
}

impl Resolution {
    pub fn loser(&self) -> Side {
        self.winner.opposite().unwrap_or(Side::Cloud)
    }
}

/// Pick the conflict winner after the stabilize wait.
///
/// A side still being written to during the wait is the live one and wins
/// outright. Otherwise the later mtime wins, local on ties, and the loser is
/// duplicated.
pub fn pick_winner(
    local_moved: bool,
    cloud_moved: bool,
    local_mtime: Option<SystemTime>,
    cloud_mtime: Option<SystemTime>,
) -> Resolution {
    match (local_moved, cloud_moved) {
        (true, false) => Resolution {
            winner: Side::Local,
            duplicate: false,
        },
        (false, true) => Resolution {
            winner: Side::Cloud,
            duplicate: false,
        },
        _ => Resolution {
            winner: if local_mtime >= cloud_mtime {
                Side::Local
            } else {
                Side::Cloud
            },
            duplicate: true,
        },
    }
}
