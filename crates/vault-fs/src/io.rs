//! Atomic I/O operations with lock-aware retries
//!
//! Writes go to `<destination>.vsync.tmp` first and become visible through a
//! single rename, so a concurrent reader sees either the old content or the
//! new content in full. Renames that hit a sharing violation (another
//! process holding the destination open) are retried with exponential
//! backoff before falling back to remove-then-rename.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use fs2::FileExt;

use crate::constants::TEMP_SUFFIX;
use crate::{Error, Result};

/// Retry limits and backoff shape for I/O against contended files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustnessConfig {
    /// Attempts made to read a stable fingerprint before reporting `Locked`
    pub fingerprint_attempts: u32,
    /// Rename attempts before the forced fallback
    pub write_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on the delay between retries
    pub max_backoff: Duration,
    /// Growth factor applied to the delay after each retry
    pub multiplier: f64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            fingerprint_attempts: 6,
            write_attempts: 12,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            multiplier: 1.8,
        }
    }
}

impl RobustnessConfig {
    fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_backoff)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `op` until it succeeds, fails permanently, or `max_attempts` is
    /// used up. Returns the value with the number of attempts made.
    pub(crate) fn retry<T, F>(
        &self,
        max_attempts: u32,
        mut op: F,
    ) -> std::result::Result<(T, u32), (Error, u32)>
    where
        F: FnMut(u32) -> std::result::Result<T, backoff::Error<Error>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempts = 0u32;
        let result = backoff::retry_notify(
            self.policy(),
            || {
                attempts += 1;
                match op(attempts) {
                    Err(backoff::Error::Transient { err, .. }) if attempts >= max_attempts => {
                        Err(backoff::Error::permanent(err))
                    }
                    other => other,
                }
            },
            |err: Error, wait: Duration| {
                tracing::debug!(error = %err, wait_ms = wait.as_millis() as u64, "transient I/O failure, backing off");
            },
        );

        match result {
            Ok(value) => Ok((value, attempts)),
            Err(backoff::Error::Permanent(err)) | Err(backoff::Error::Transient { err, .. }) => {
                Err((err, attempts))
            }
        }
    }
}

/// How a successful write got its content into place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Rename attempts made, including the successful one
    pub attempts: u32,
    /// Whether the forced remove-then-rename fallback was needed
    pub forced: bool,
}

/// Whether an I/O error is expected to clear if the operation is retried.
///
/// Covers sharing and lock violations raised while another process (the
/// cloud-sync client, the editor) holds the file.
pub fn is_transient(err: &std::io::Error) -> bool {
    #[cfg(windows)]
    {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        if matches!(err.raw_os_error(), Some(32) | Some(33)) {
            return true;
        }
    }
    // Windows reports some sharing conflicts as access denied; elsewhere it
    // is a real permission problem.
    if cfg!(windows) && err.kind() == ErrorKind::PermissionDenied {
        return true;
    }
    matches!(
        err.kind(),
        ErrorKind::WouldBlock
            | ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::ResourceBusy
    )
}

/// Temp path used while staging a replacement for `dst`.
pub fn temp_path_for(dst: &Path) -> PathBuf {
    let mut name = dst.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Whether `path` is a staging file left by an atomic write.
pub fn is_temp_artifact(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(TEMP_SUFFIX))
}

/// Read a file in full, retrying while it is locked.
///
/// # Errors
///
/// `Locked` once retries are exhausted, `Io` with `NotFound` when the file is
/// gone, `Unreadable` for any other failure.
pub fn read_bytes(path: impl AsRef<Path>, robustness: RobustnessConfig) -> Result<Vec<u8>> {
    let path = path.as_ref();
    robustness
        .retry(robustness.fingerprint_attempts, |_| {
            let mut file = File::open(path).map_err(|e| classify_read(path, e))?;
            let mut content = Vec::new();
            file.read_to_end(&mut content)
                .map_err(|e| classify_read(path, e))?;
            Ok(content)
        })
        .map(|(content, _)| content)
        .map_err(|(err, _)| err)
}

/// Read UTF-8 text content from a file.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write content atomically to `path`.
///
/// # Errors
///
/// `WriteBlocked` when the destination could not be replaced; the
/// destination keeps its previous content in that case.
pub fn write_atomic(
    path: impl AsRef<Path>,
    content: &[u8],
    robustness: RobustnessConfig,
) -> Result<WriteOutcome> {
    replace(path.as_ref(), content, None, robustness)
}

/// Copy `src` over `dst` atomically, carrying the modification time along.
pub fn copy_atomic(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    robustness: RobustnessConfig,
) -> Result<WriteOutcome> {
    let src = src.as_ref();
    let content = read_bytes(src, robustness)?;
    let modified = fs::metadata(src).and_then(|m| m.modified()).ok();
    replace(dst.as_ref(), &content, modified, robustness)
}

/// Remove a file, retrying while it is locked.
///
/// Returns `false` when there was nothing to remove.
pub fn remove_file(path: impl AsRef<Path>, robustness: RobustnessConfig) -> Result<bool> {
    let path = path.as_ref();
    robustness
        .retry(robustness.write_attempts, |_| match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) if is_transient(&e) => Err(backoff::Error::transient(Error::locked(
                path,
                e.to_string(),
            ))),
            Err(e) => Err(backoff::Error::permanent(Error::io(path, e))),
        })
        .map(|(removed, _)| removed)
        .map_err(|(err, _)| match err {
            Error::Locked { path, detail } => Error::WriteBlocked {
                path,
                reason: detail,
            },
            other => other,
        })
}

fn classify_read(path: &Path, e: std::io::Error) -> backoff::Error<Error> {
    if e.kind() == ErrorKind::NotFound {
        backoff::Error::permanent(Error::io(path, e))
    } else if is_transient(&e) {
        backoff::Error::transient(Error::locked(path, e.to_string()))
    } else {
        backoff::Error::permanent(Error::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn replace(
    dst: &Path,
    content: &[u8],
    modified: Option<SystemTime>,
    robustness: RobustnessConfig,
) -> Result<WriteOutcome> {
    replace_with(dst, content, modified, robustness, |from, to| fs::rename(from, to))
}

/// [`replace`] with the rename step supplied by the caller.
fn replace_with<R>(
    dst: &Path,
    content: &[u8],
    modified: Option<SystemTime>,
    robustness: RobustnessConfig,
    rename: R,
) -> Result<WriteOutcome>
where
    R: Fn(&Path, &Path) -> std::io::Result<()>,
{
    // Ensure parent directory exists
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_path_for(dst);
    if let Err(err) = stage(&temp_path, content, modified) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    let renamed = robustness.retry(robustness.write_attempts, |_| {
        clear_readonly(dst);
        rename(&temp_path, dst).map_err(|e| {
            if is_transient(&e) {
                backoff::Error::transient(Error::locked(dst, e.to_string()))
            } else {
                backoff::Error::permanent(Error::io(dst, e))
            }
        })
    });

    match renamed {
        Ok(((), attempts)) => Ok(WriteOutcome {
            attempts,
            forced: false,
        }),
        Err((rename_err, attempts)) => {
            tracing::warn!(
                path = %dst.display(),
                attempts,
                error = %rename_err,
                "rename kept failing, forcing replace"
            );
            match forced_replace(&temp_path, dst, &rename) {
                Ok(()) => Ok(WriteOutcome {
                    attempts,
                    forced: true,
                }),
                Err(forced_err) => {
                    let _ = fs::remove_file(&temp_path);
                    Err(Error::WriteBlocked {
                        path: dst.to_path_buf(),
                        reason: format!("{rename_err}; forced replace failed: {forced_err}"),
                    })
                }
            }
        }
    }
}

fn stage(temp_path: &Path, content: &[u8], modified: Option<SystemTime>) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    FileExt::lock_exclusive(&temp_file).map_err(|e| Error::locked(temp_path, e.to_string()))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if let Some(modified) = modified {
        temp_file
            .set_modified(modified)
            .map_err(|e| Error::io(temp_path, e))?;
    }

    temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;

    // Released on drop as well
    FileExt::unlock(&temp_file).map_err(|e| Error::locked(temp_path, e.to_string()))?;
    Ok(())
}

/// Where the destination waits while the forced fallback swaps it out.
fn aside_path_for(dst: &Path) -> PathBuf {
    let mut name = dst.as_os_str().to_owned();
    name.push(".old");
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Move the destination aside, then move the staged file into place.
///
/// The original is moved back when the second rename fails, so a failed
/// fallback leaves the destination as it was. Directories are never moved.
fn forced_replace<R>(temp_path: &Path, dst: &Path, rename: &R) -> std::io::Result<()>
where
    R: Fn(&Path, &Path) -> std::io::Result<()>,
{
    if dst.is_dir() {
        return Err(std::io::Error::other("destination is a directory"));
    }
    clear_readonly(dst);

    let aside = aside_path_for(dst);
    let displaced = match rename(dst, &aside) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };

    match rename(temp_path, dst) {
        Ok(()) => {
            if displaced && let Err(e) = fs::remove_file(&aside) {
                tracing::warn!(path = %aside.display(), error = %e, "could not remove displaced original");
            }
            Ok(())
        }
        Err(e) => {
            if displaced && let Err(restore) = fs::rename(&aside, dst) {
                tracing::error!(
                    path = %dst.display(),
                    aside = %aside.display(),
                    error = %restore,
                    "could not move the original back"
                );
            }
            Err(e)
        }
    }
}

#[cfg(windows)]
fn clear_readonly(path: &Path) {
    if let Ok(metadata) = fs::metadata(path) {
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            let _ = fs::set_permissions(path, permissions);
        }
    }
}

#[cfg(not(windows))]
fn clear_readonly(_path: &Path) {}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use tempfile::tempdir;

    fn fast() -> RobustnessConfig {
        RobustnessConfig {
            fingerprint_attempts: 3,
            write_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[test]
    fn temp_path_sits_next_to_destination() {
        let tmp = temp_path_for(Path::new("/vault/notes/a.md"));
        assert_eq!(tmp, PathBuf::from("/vault/notes/a.md.vsync.tmp"));
        assert!(is_temp_artifact(&tmp));
        assert!(!is_temp_artifact(Path::new("/vault/notes/a.md")));
    }

    #[test]
    fn retry_counts_attempts_until_success() {
        let config = fast();
        let (value, attempts) = config
            .retry(5, |attempt| {
                if attempt < 3 {
                    Err(backoff::Error::transient(Error::locked("x", "busy")))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(attempts, 3);
    }

    #[test]
    fn retry_stops_at_attempt_cap() {
        let config = fast();
        let (err, attempts) = config
            .retry(2, |_| -> std::result::Result<(), _> {
                Err(backoff::Error::transient(Error::locked("x", "busy")))
            })
            .unwrap_err();
        assert_eq!(attempts, 2);
        assert!(matches!(err, Error::Locked { .. }));
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let config = fast();
        let (_, attempts) = config
            .retry(5, |_| -> std::result::Result<(), _> {
                Err(backoff::Error::permanent(Error::LayoutValidation {
                    message: "nope".into(),
                }))
            })
            .unwrap_err();
        assert_eq!(attempts, 1);
    }

    fn busy() -> std::io::Error {
        std::io::Error::from(ErrorKind::ResourceBusy)
    }

    fn leftovers(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_temp_artifact(p))
            .collect()
    }

    #[test]
    fn busy_destination_is_retried() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("note.md");
        fs::write(&dst, "old").unwrap();

        let calls = Cell::new(0);
        let outcome = replace_with(&dst, b"new", None, fast(), |from, to| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err(busy()) } else { fs::rename(from, to) }
        })
        .unwrap();

        assert_eq!(
            outcome,
            WriteOutcome {
                attempts: 3,
                forced: false
            }
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn forced_fallback_replaces_after_retries_run_out() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("note.md");
        fs::write(&dst, "old").unwrap();
        let config = RobustnessConfig {
            write_attempts: 1,
            ..fast()
        };

        let calls = Cell::new(0);
        let outcome = replace_with(&dst, b"new", None, config, |from, to| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 { Err(busy()) } else { fs::rename(from, to) }
        })
        .unwrap();

        assert_eq!(
            outcome,
            WriteOutcome {
                attempts: 1,
                forced: true
            }
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn failed_fallback_keeps_the_original() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("note.md");
        fs::write(&dst, "old").unwrap();
        let staged = temp_path_for(&dst);

        let result = replace_with(&dst, b"new", None, fast(), |from, to| {
            if from == staged.as_path() { Err(busy()) } else { fs::rename(from, to) }
        });

        assert!(
            matches!(result, Err(Error::WriteBlocked { .. })),
            "expected WriteBlocked, got {result:?}"
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn copy_preserves_modification_time() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("out").join("dst.md");
        fs::write(&src, "body").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let outcome = copy_atomic(&src, &dst, fast()).unwrap();

        assert_eq!(
            outcome,
            WriteOutcome {
                attempts: 1,
                forced: false
            }
        );
        assert_eq!(fs::read_to_string(&dst).unwrap(), "body");
        assert_eq!(
            fs::metadata(&dst).unwrap().modified().unwrap(),
            fs::metadata(&src).unwrap().modified().unwrap()
        );
    }
}
