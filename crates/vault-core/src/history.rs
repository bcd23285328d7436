//! The last-known-good snapshot tree
//!
//! History mirrors the vault's relative layout. An entry holds the content a
//! path had the last time it was in sync on both sides; it is only used to
//! tell which side moved, never as a source of truth.

use std::fs;
use std::path::{Path, PathBuf};

use vault_fs::{Digest, NormalizedPath, RobustnessConfig, WriteOutcome, io};

use crate::snapshot::SideSnapshot;

/// Read/write access to history entries by relative path.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
    robustness: RobustnessConfig,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>, robustness: RobustnessConfig) -> Self {
        Self {
            root: root.into(),
            robustness,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, rel: &NormalizedPath) -> PathBuf {
        rel.under(&self.root)
    }

    pub fn exists(&self, rel: &NormalizedPath) -> bool {
        self.path_of(rel).is_file()
    }

    /// Content of the entry, or `None` when there is no entry.
    pub fn read(&self, rel: &NormalizedPath) -> vault_fs::Result<Option<Vec<u8>>> {
        match io::read_bytes(self.path_of(rel), self.robustness) {
            Ok(content) => Ok(Some(content)),
            Err(vault_fs::Error::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn write(&self, rel: &NormalizedPath, content: &[u8]) -> vault_fs::Result<WriteOutcome> {
        io::write_atomic(self.path_of(rel), content, self.robustness)
    }

    /// Record the current content of `src` as the entry for `rel`.
    pub fn write_from(&self, rel: &NormalizedPath, src: &Path) -> vault_fs::Result<WriteOutcome> {
        io::copy_atomic(src, self.path_of(rel), self.robustness)
    }

    /// Remove the entry, then any directories it leaves empty.
    ///
    /// Returns `false` when there was no entry.
    pub fn delete(&self, rel: &NormalizedPath) -> vault_fs::Result<bool> {
        let path = self.path_of(rel);
        let removed = io::remove_file(&path, self.robustness)?;
        self.prune_empty_parents(&path);
        Ok(removed)
    }

    pub fn fingerprint(&self, rel: &NormalizedPath) -> vault_fs::Result<Option<Digest>> {
        vault_fs::fingerprint(&self.path_of(rel), self.robustness)
    }

    pub fn snapshot(&self, rel: &NormalizedPath) -> SideSnapshot {
        SideSnapshot::stat(&self.path_of(rel))
    }

    fn prune_empty_parents(&self, path: &Path) {
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // Fails on a non-empty directory, which ends the walk
            if fs::remove_dir(current).is_err() {
                break;
            }
            tracing::debug!(dir = %current.display(), "pruned empty history directory");
            dir = current.parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history"), RobustnessConfig::default());
        (dir, store)
    }

    #[test]
    fn write_creates_parents_and_reads_back() {
        let (_dir, store) = store();
        let rel = NormalizedPath::new("notes/daily/today.md");

        store.write(&rel, b"content").unwrap();

        assert!(store.exists(&rel));
        assert_eq!(store.read(&rel).unwrap(), Some(b"content".to_vec()));
        assert_eq!(
            store.fingerprint(&rel).unwrap(),
            Some(Digest::of(b"content"))
        );
    }

    #[test]
    fn read_missing_entry_is_none() {
        let (_dir, store) = store();
        assert_eq!(store.read(&NormalizedPath::new("nope.md")).unwrap(), None);
        assert_eq!(store.fingerprint(&NormalizedPath::new("nope.md")).unwrap(), None);
    }

    #[test]
    fn delete_prunes_empty_parents_but_keeps_root() {
        let (_dir, store) = store();
        let deep = NormalizedPath::new("a/b/c.md");
        let sibling = NormalizedPath::new("a/keep.md");
        store.write(&deep, b"x").unwrap();
        store.write(&sibling, b"y").unwrap();

        assert!(store.delete(&deep).unwrap());

        assert!(!store.root().join("a").join("b").exists());
        assert!(store.root().join("a").exists());

        assert!(store.delete(&sibling).unwrap());
        assert!(!store.root().join("a").exists());
        assert!(store.root().exists());
    }

    #[test]
    fn delete_missing_entry_reports_false() {
        let (_dir, store) = store();
        fs::create_dir_all(store.root()).unwrap();
        assert!(!store.delete(&NormalizedPath::new("missing.md")).unwrap());
    }

    #[test]
    fn write_from_copies_source() {
        let (dir, store) = store();
        let src = dir.path().join("src.md");
        fs::write(&src, "from source").unwrap();
        let rel = NormalizedPath::new("src.md");

        store.write_from(&rel, &src).unwrap();

        assert_eq!(store.read(&rel).unwrap(), Some(b"from source".to_vec()));
        let snap = store.snapshot(&rel);
        assert_eq!(snap.size, 11);
        assert_eq!(snap.mtime, fs::metadata(&src).unwrap().modified().ok());
    }
}
