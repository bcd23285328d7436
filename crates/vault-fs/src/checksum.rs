//! SHA-256 content fingerprints
//!
//! A fingerprint is only trusted when the file held still while it was read:
//! the byte count must match the size reported before the read, and size and
//! modification time must be unchanged afterwards. Anything else means the
//! cloud client is still hydrating the file or the editor is mid-save, and
//! the read is retried.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use fs2::FileExt;
use sha2::{Digest as _, Sha256};

use crate::io::{RobustnessConfig, is_transient};
use crate::{Error, Result};

/// Prefix used when rendering a digest
const PREFIX: &str = "sha256:";

const CHUNK_SIZE: usize = 64 * 1024;

/// A 256-bit content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Fingerprint an in-memory buffer.
    pub fn of(content: &[u8]) -> Self {
        Self(Sha256::digest(content).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(PREFIX)?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({}..)", &self.to_string()[..PREFIX.len() + 12])
    }
}

/// Compute the fingerprint of a file, retrying across lock and hydration
/// races.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// `Locked` when no stable read was possible within the configured attempts,
/// `Unreadable` for permanent failures.
pub fn fingerprint(path: &Path, robustness: RobustnessConfig) -> Result<Option<Digest>> {
    robustness
        .retry(robustness.fingerprint_attempts, |attempt| {
            hash_once(path, attempt)
        })
        .map(|(digest, attempts)| {
            if attempts > 1 {
                tracing::debug!(path = %path.display(), attempts, "fingerprint stabilised after retry");
            }
            digest
        })
        .map_err(|(err, _)| err)
}

fn hash_once(path: &Path, attempt: u32) -> std::result::Result<Option<Digest>, backoff::Error<Error>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(classify(path, e)),
    };

    // An exclusive holder means a writer is active; a filesystem without
    // lock support just proceeds.
    if let Err(e) = FileExt::try_lock_shared(&file)
        && is_transient(&e)
    {
        return Err(backoff::Error::transient(Error::locked(path, "held exclusively")));
    }

    let before = file.metadata().map_err(|e| classify(path, e))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;
    loop {
        let read = file.read(&mut buf).map_err(|e| classify(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        total += read as u64;
    }

    let _ = FileExt::unlock(&file);

    let after = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(backoff::Error::transient(Error::locked(path, "vanished during read")));
        }
        Err(e) => return Err(classify(path, e)),
    };

    let moved = after.len() != before.len() || after.modified().ok() != before.modified().ok();
    if total != before.len() || moved {
        return Err(backoff::Error::transient(Error::locked(
            path,
            format!("changed during read ({total} of {} bytes)", before.len()),
        )));
    }

    if attempt > 1 && total == 0 {
        return Err(backoff::Error::transient(Error::locked(path, "empty read on retry")));
    }

    Ok(Some(Digest(hasher.finalize().into())))
}

fn classify(path: &Path, e: std::io::Error) -> backoff::Error<Error> {
    if is_transient(&e) {
        backoff::Error::transient(Error::locked(path, e.to_string()))
    } else {
        backoff::Error::permanent(Error::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
