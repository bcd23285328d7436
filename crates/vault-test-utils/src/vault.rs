//! [`TestVault`] fixture for three-tree sync scenarios.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use vault_fs::{Side, VaultLayout};

/// A temporary directory holding `local/`, `cloud/` and `history/` roots,
/// with helpers to set up and assert on files in each.
///
/// # Example
///
/// ```rust,no_run
/// use vault_fs::Side;
/// use vault_test_utils::TestVault;
///
/// let vault = TestVault::new();
/// vault.write(Side::Local, "notes/a.md", "hello world");
/// vault.assert_content(Side::Local, "notes/a.md", "hello world");
/// vault.assert_missing(Side::Cloud, "notes/a.md");
/// ```
pub struct TestVault {
    temp_dir: TempDir,
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

impl TestVault {
    /// Create the three (empty) roots.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        for side in Side::ALL {
            fs::create_dir_all(temp_dir.path().join(side.as_str())).unwrap();
        }
        Self { temp_dir }
    }

    /// Directory containing the three roots.
    pub fn base(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn root(&self, side: Side) -> PathBuf {
        self.base().join(side.as_str())
    }

    pub fn layout(&self) -> VaultLayout {
        VaultLayout::new(
            self.root(Side::Local),
            self.root(Side::Cloud),
            self.root(Side::History),
        )
    }

    /// Full path of `rel` inside one tree.
    pub fn path(&self, side: Side, rel: &str) -> PathBuf {
        self.root(side).join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, side: Side, rel: &str, content: &str) -> PathBuf {
        let path = self.path(side, rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write the same content to every tree, as if the path had already
    /// been synced.
    pub fn write_all(&self, rel: &str, content: &str) {
        let mtime = SystemTime::now() - Duration::from_secs(3600);
        for side in Side::ALL {
            self.write(side, rel, content);
            self.set_mtime(side, rel, mtime);
        }
    }

    pub fn read(&self, side: Side, rel: &str) -> Option<String> {
        fs::read_to_string(self.path(side, rel)).ok()
    }

    pub fn exists(&self, side: Side, rel: &str) -> bool {
        self.path(side, rel).is_file()
    }

    pub fn remove(&self, side: Side, rel: &str) {
        fs::remove_file(self.path(side, rel)).unwrap();
    }

    pub fn set_mtime(&self, side: Side, rel: &str, mtime: SystemTime) {
        File::options()
            .write(true)
            .open(self.path(side, rel))
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    /// Relative paths of every file in one tree, sorted, with `/` separators.
    pub fn files(&self, side: Side) -> Vec<String> {
        fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
            let Ok(entries) = fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, root, out);
                } else if let Ok(rel) = path.strip_prefix(root) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }

        let root = self.root(side);
        let mut out = Vec::new();
        walk(&root, &root, &mut out);
        out.sort();
        out
    }

    /// Assert that `rel` holds exactly `content` in one tree.
    ///
    /// # Panics
    /// Panics with a descriptive message if the file is missing or differs.
    pub fn assert_content(&self, side: Side, rel: &str, content: &str) {
        match self.read(side, rel) {
            Some(actual) => assert_eq!(
                actual, content,
                "{side}/{rel} has unexpected content"
            ),
            None => panic!("Expected {side}/{rel} to exist"),
        }
    }

    /// Assert that `rel` is absent from one tree.
    ///
    /// # Panics
    /// Panics if the file exists.
    pub fn assert_missing(&self, side: Side, rel: &str) {
        assert!(
            !self.exists(side, rel),
            "Expected {side}/{rel} NOT to exist, found: {:?}",
            self.read(side, rel)
        );
    }

    /// Assert that all three trees hold `rel` with `content`.
    pub fn assert_converged(&self, rel: &str, content: &str) {
        for side in Side::ALL {
            self.assert_content(side, rel, content);
        }
    }
}
