//! Cheap per-tree facts about one tracked path

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use vault_fs::{Digest, NormalizedPath, Side, VaultLayout};

/// Existence, size and mtime of a path in one tree, plus its digest once
/// computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideSnapshot {
    pub exists: bool,
    pub size: u64,
    pub mtime: Option<SystemTime>,
    pub digest: Option<Digest>,
}

impl SideSnapshot {
    pub fn missing() -> Self {
        Self::default()
    }

    /// Stat `path`. Anything that is not a regular file counts as missing.
    pub fn stat(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Self {
                exists: true,
                size: meta.len(),
                mtime: meta.modified().ok(),
                digest: None,
            },
            _ => Self::missing(),
        }
    }

    /// Equal on existence, size and mtime, ignoring digests.
    pub fn same_stat(&self, other: &Self) -> bool {
        self.exists == other.exists && self.size == other.size && self.mtime == other.mtime
    }
}

/// Which trees hold the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    pub local: bool,
    pub cloud: bool,
    pub history: bool,
}

/// The path as seen in all three trees at one moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub local: SideSnapshot,
    pub cloud: SideSnapshot,
    pub history: SideSnapshot,
}

impl TreeSnapshot {
    pub fn capture(layout: &VaultLayout, rel: &NormalizedPath) -> Self {
        Self {
            local: SideSnapshot::stat(&layout.resolve(Side::Local, rel)),
            cloud: SideSnapshot::stat(&layout.resolve(Side::Cloud, rel)),
            history: SideSnapshot::stat(&layout.resolve(Side::History, rel)),
        }
    }

    pub fn side(&self, side: Side) -> &SideSnapshot {
        match side {
            Side::Local => &self.local,
            Side::Cloud => &self.cloud,
            Side::History => &self.history,
        }
    }

    pub fn presence(&self) -> Presence {
        Presence {
            local: self.local.exists,
            cloud: self.cloud.exists,
            history: self.history.exists,
        }
    }

    pub fn same_stat(&self, other: &Self) -> bool {
        Side::ALL
            .iter()
            .all(|&side| self.side(side).same_stat(other.side(side)))
    }
}
