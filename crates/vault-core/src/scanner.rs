//! Union scan over the three trees

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vault_fs::{NormalizedPath, Side, VaultLayout, io};
use walkdir::WalkDir;

use crate::filter::PathFilter;

/// Everything one scan found.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Relative paths present as a file in at least one tree
    pub paths: BTreeSet<NormalizedPath>,
    /// Staging files left behind by interrupted writes
    pub temp_artifacts: Vec<PathBuf>,
    /// Entries that could not be read; the scan continued past them
    pub errors: Vec<String>,
}

/// Walks the local, cloud and history roots and unions their relative paths.
#[derive(Clone)]
pub struct UnionScanner {
    layout: VaultLayout,
    filter: Arc<dyn PathFilter>,
}

impl UnionScanner {
    pub fn new(layout: VaultLayout, filter: Arc<dyn PathFilter>) -> Self {
        Self { layout, filter }
    }

    pub fn scan(&self) -> ScanResult {
        let mut result = ScanResult::default();
        for side in Side::ALL {
            self.scan_root(side, &mut result);
        }
        tracing::debug!(
            paths = result.paths.len(),
            temp_artifacts = result.temp_artifacts.len(),
            "scan complete"
        );
        result
    }

    fn scan_root(&self, side: Side, result: &mut ScanResult) {
        let root = self.layout.root(side);
        if !root.is_dir() {
            tracing::debug!(side = %side, root = %root.display(), "root missing, scanning as empty");
            return;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !self.excluded(root, entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    tracing::warn!(side = %side, path = %path, error = %e, "scan error");
                    result.errors.push(format!("{side}: {path}: {e}"));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            if io::is_temp_artifact(entry.path()) {
                result.temp_artifacts.push(entry.into_path());
                continue;
            }
            if let Some(rel) = NormalizedPath::relative_to(entry.path(), root) {
                result.paths.insert(rel);
            }
        }
    }

    fn excluded(&self, root: &Path, path: &Path) -> bool {
        NormalizedPath::relative_to(path, root).is_some_and(|rel| self.filter.is_excluded(&rel))
    }
}
