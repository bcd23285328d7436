//! Filesystem primitives for vault-sync
//!
//! Provides the pieces the decision engine builds on: normalized relative
//! paths, content fingerprints that survive lock and hydration races, atomic
//! replace-with-fallback writes, and the three-root vault layout.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod layout;
pub mod path;

pub use checksum::{Digest, fingerprint};
pub use config::ConfigStore;
pub use constants::Side;
pub use error::{Error, Result};
pub use io::{RobustnessConfig, WriteOutcome};
pub use layout::VaultLayout;
pub use path::NormalizedPath;
