//! Path exclusion and the ephemeral-file predicate

use regex::Regex;
use vault_fs::NormalizedPath;

/// Default exclusion: the editor's per-machine workspace layout files.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[r"(^|/)\.obsidian/workspace[^/]*\.json$"];

/// Decides whether a relative path is left out of synchronisation.
///
/// Directories are offered too, so returning `true` for a directory prunes
/// its whole subtree from the scan.
pub trait PathFilter: Send + Sync {
    fn is_excluded(&self, path: &NormalizedPath) -> bool;
}

impl<F> PathFilter for F
where
    F: Fn(&NormalizedPath) -> bool + Send + Sync,
{
    fn is_excluded(&self, path: &NormalizedPath) -> bool {
        self(path)
    }
}

/// Regex exclusion rules matched against the forward-slash relative path.
#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    patterns: Vec<Regex>,
}

impl ExcludePatterns {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn default_patterns() -> Self {
        Self::new(DEFAULT_EXCLUDE_PATTERNS).unwrap_or_default()
    }

    /// Exclude nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PathFilter for ExcludePatterns {
    fn is_excluded(&self, path: &NormalizedPath) -> bool {
        self.patterns.iter().any(|re| re.is_match(path.as_str()))
    }
}

/// When a brand-new file is too young or too small to seed from.
///
/// Editors create placeholder files ("Untitled.md", empty notes) that are
/// often renamed or deleted seconds later; seeding them would resurrect them
/// on the other side.
#[derive(Debug, Clone, Default)]
pub struct EphemeralPolicy {
    pub min_size: u64,
    pub name_patterns: Vec<Regex>,
}

impl EphemeralPolicy {
    pub fn new<I, S>(min_size: u64, name_patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name_patterns = name_patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            min_size,
            name_patterns,
        })
    }

    pub fn is_ephemeral(&self, path: &NormalizedPath, size: u64) -> bool {
        if size < self.min_size {
            return true;
        }
        let name = path.file_name().unwrap_or_default();
        self.name_patterns.iter().any(|re| re.is_match(name))
    }
}
