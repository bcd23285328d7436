//! Command implementations

mod check;
mod output;
mod run;

pub use check::run_check;
pub use run::{run_loop, run_once};
