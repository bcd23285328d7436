//! Normalized relative path handling
//!
//! Every tracked file is keyed by its path relative to the vault root. The
//! same key has to resolve inside the local, cloud and history trees, so it
//! is stored with forward slashes and converted to a native path only when
//! joined onto a root.

use std::path::{Component, Path, PathBuf};

use crate::constants::CONFLICT_MARKER;

/// A path normalized to use forward slashes internally.
///
/// Empty and `.` components are dropped and duplicate separators collapse,
/// so `a//b/./c` and `a\b\c` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Build the relative key of `full` inside `root`.
    ///
    /// Returns `None` when `full` does not live under `root`.
    pub fn relative_to(full: &Path, root: &Path) -> Option<Self> {
        let rel = full.strip_prefix(root).ok()?;
        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self {
            inner: parts.join("/"),
        })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Resolve this key under a tree root.
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(self.to_native())
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        if self.inner.is_empty() {
            return Self {
                inner: clean(&segment_normalized),
            };
        }
        Self {
            inner: clean(&format!("{}/{}", self.inner, segment_normalized)),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let idx = self.inner.rfind('/')?;
        Some(Self {
            inner: self.inner[..idx].to_string(),
        })
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present. Dotfiles such as `.env` have none.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }

    /// Path of a conflict duplicate next to this one.
    ///
    /// `notes/a.md` with stamp `20240101_120000` becomes
    /// `notes/a_CONFLICT_20240101_120000.md`. A non-zero `counter` is
    /// appended to the stamp so repeated conflicts within one second stay
    /// distinct.
    pub fn conflict_sibling(&self, stamp: &str, counter: u32) -> Self {
        let name = self.file_name().unwrap_or_default();
        let (stem, ext) = match self.extension() {
            Some(ext) => (&name[..name.len() - ext.len() - 1], Some(ext)),
            None => (name, None),
        };

        let mut dup = format!("{stem}{CONFLICT_MARKER}{stamp}");
        if counter > 0 {
            dup.push_str(&format!("_{counter}"));
        }
        if let Some(ext) = ext {
            dup.push('.');
            dup.push_str(ext);
        }

        match self.parent() {
            Some(parent) => parent.join(&dup),
            None => Self { inner: dup },
        }
    }

    /// Whether this path is itself a conflict duplicate.
    pub fn is_conflict_duplicate(&self) -> bool {
        self.file_name()
            .is_some_and(|name| name.contains(CONFLICT_MARKER))
    }
}

fn clean(raw: &str) -> String {
    let leading_slash = raw.starts_with('/');
    let body = raw
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/");
    if leading_slash {
        format!("/{body}")
    } else {
        body
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl serde::Serialize for NormalizedPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslashes_and_dot_components_collapse() {
        assert_eq!(NormalizedPath::new("a\\b/./c//d.md").as_str(), "a/b/c/d.md");
    }

    #[test]
    fn relative_to_strips_root() {
        let root = Path::new("/vault");
        let full = Path::new("/vault/notes/today.md");
        let rel = NormalizedPath::relative_to(full, root).unwrap();
        assert_eq!(rel.as_str(), "notes/today.md");
    }

    #[test]
    fn relative_to_rejects_root_itself() {
        let root = Path::new("/vault");
        assert!(NormalizedPath::relative_to(root, root).is_none());
    }

    #[test]
    fn conflict_sibling_keeps_extension() {
        let path = NormalizedPath::new("notes/a.md");
        assert_eq!(
            path.conflict_sibling("20240101_120000", 0).as_str(),
            "notes/a_CONFLICT_20240101_120000.md"
        );
    }

    #[test]
    fn conflict_sibling_counter_and_no_extension() {
        let path = NormalizedPath::new("Makefile");
        assert_eq!(
            path.conflict_sibling("20240101_120000", 2).as_str(),
            "Makefile_CONFLICT_20240101_120000_2"
        );
    }

    #[test]
    fn dotfile_has_no_extension() {
        let path = NormalizedPath::new(".obsidian/.hidden");
        assert_eq!(path.extension(), None);
        assert_eq!(
            path.conflict_sibling("x", 0).as_str(),
            ".obsidian/.hidden_CONFLICT_x"
        );
    }
}
