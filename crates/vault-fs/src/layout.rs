//! Vault layout: the three tree roots
//!
//! The local vault, its cloud mirror and the history snapshot share one
//! relative hierarchy. History must live outside both authoritative trees,
//! otherwise its files would be scanned back in as vault content.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, NormalizedPath, Result, Side};

/// Root directories of the three trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLayout {
    pub local: PathBuf,
    pub cloud: PathBuf,
    pub history: PathBuf,
}

impl VaultLayout {
    pub fn new(
        local: impl Into<PathBuf>,
        cloud: impl Into<PathBuf>,
        history: impl Into<PathBuf>,
    ) -> Self {
        Self {
            local: local.into(),
            cloud: cloud.into(),
            history: history.into(),
        }
    }

    /// Root directory of one tree.
    pub fn root(&self, side: Side) -> &Path {
        match side {
            Side::Local => &self.local,
            Side::Cloud => &self.cloud,
            Side::History => &self.history,
        }
    }

    /// Native path of a tracked file inside one tree.
    pub fn resolve(&self, side: Side, rel: &NormalizedPath) -> PathBuf {
        rel.under(self.root(side))
    }

    /// Create the history root if it does not exist yet.
    pub fn ensure_history(&self) -> Result<()> {
        fs::create_dir_all(&self.history).map_err(|e| Error::io(&self.history, e))
    }

    /// Validate that the layout can be synchronised.
    ///
    /// Local and cloud roots must be existing directories; history must be a
    /// directory if present. No root may contain another.
    pub fn validate(&self) -> Result<()> {
        for side in [Side::Local, Side::Cloud] {
            let root = self.root(side);
            if !root.is_dir() {
                return Err(Error::LayoutValidation {
                    message: format!("{side} root {} is not a directory", root.display()),
                });
            }
        }
        if self.history.exists() && !self.history.is_dir() {
            return Err(Error::LayoutValidation {
                message: format!("history root {} is not a directory", self.history.display()),
            });
        }

        let resolved: Vec<(Side, PathBuf)> = Side::ALL
            .iter()
            .map(|&side| {
                let root = self.root(side);
                (side, dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()))
            })
            .collect();

        for (a_side, a) in &resolved {
            for (b_side, b) in &resolved {
                if a_side != b_side && b.starts_with(a) {
                    return Err(Error::LayoutValidation {
                        message: format!(
                            "{b_side} root {} lies inside {a_side} root {}",
                            b.display(),
                            a.display()
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}
