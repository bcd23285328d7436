//! Three-way synchronisation
//!
//! This module provides:
//! - **decision**: the pure rules mapping tree facts to an action
//! - **engine**: gathering those facts for one path and carrying out the action
//! - **driver**: the pass loop over every path, on a small worker pool
//! - **state**: timers and observations kept between passes

pub mod decision;
mod driver;
mod engine;
mod state;

pub use decision::{Case, Deletion, Resolution, Verdict};
pub use driver::SyncPass;
pub use engine::{DecisionEngine, Evaluation};
pub use state::{Observation, SyncState};
