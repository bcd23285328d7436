//! Constants and enums shared across the vault trees.

use serde::{Deserialize, Serialize};

/// Suffix appended to a destination path while its replacement is staged.
pub const TEMP_SUFFIX: &str = ".vsync.tmp";

/// Marker embedded in the file name of a conflict duplicate.
pub const CONFLICT_MARKER: &str = "_CONFLICT_";

/// chrono format string for the timestamp in a conflict duplicate name.
pub const CONFLICT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One of the three trees compared for every tracked path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The working directory the editor writes to
    Local,
    /// The mirror maintained by the cloud-sync client
    Cloud,
    /// Last-known-good snapshot
    History,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Local, Side::Cloud, Side::History];

    /// Get the string representation of the side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
            Self::History => "history",
        }
    }

    /// The other authoritative side. History has no counterpart.
    pub fn opposite(&self) -> Option<Side> {
        match self {
            Self::Local => Some(Self::Cloud),
            Self::Cloud => Some(Self::Local),
            Self::History => None,
        }
    }
}

impl AsRef<str> for Side {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
