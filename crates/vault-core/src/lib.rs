//! Three-way sync core for vault-sync
//!
//! Keeps a local vault and its cloud mirror consistent, using a history
//! snapshot of the last agreed content to tell which side changed:
//!
//! - **Gate**: per-path stabilization window and cooldown ([`PathStateTracker`])
//! - **Scan**: union of the paths in the three trees ([`UnionScanner`])
//! - **Decide**: push, restore, propagate a deletion, or resolve a conflict
//!   ([`DecisionEngine`])
//! - **Drive**: one pass over every path on a worker pool ([`SyncPass`])
//!
//! # Architecture
//!
//! ```text
//!                  vault-cli
//!                      |
//!                 vault-core
//!                      |
//!                  vault-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vault_core::{SyncPass, SyncSettings};
//!
//! let settings = SyncSettings::for_roots("/vault", "/cloud/vault", "/history");
//! let pass = SyncPass::new(&settings)?;
//! let report = pass.run_pass();
//! println!("{} actions", report.entries.len());
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod report;
pub mod scanner;
pub mod snapshot;
pub mod sync;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SettingsResolver, SyncSettings, Timing};
pub use error::{Error, Result};
pub use filter::{EphemeralPolicy, ExcludePatterns, PathFilter};
pub use history::HistoryStore;
pub use report::{FailureKind, Outcome, PassReport, PathReport, SyncAction};
pub use scanner::{ScanResult, UnionScanner};
pub use snapshot::{Presence, SideSnapshot, TreeSnapshot};
pub use sync::{DecisionEngine, Evaluation, SyncPass, SyncState};
pub use tracker::{PathStateTracker, PathTimerState, TimerDecision};
