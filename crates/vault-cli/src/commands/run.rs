//! The run and once commands

use std::thread;

use colored::Colorize;
use vault_core::{SettingsResolver, SyncPass};

use super::output;
use crate::error::Result;

/// Run passes every poll interval until `passes` have completed, or forever.
///
/// Failed actions are reported but never stop the loop; the exit code is
/// non-zero if the last pass had failures.
pub fn run_loop(resolver: &SettingsResolver, passes: Option<u64>) -> Result<i32> {
    let settings = resolver.resolve()?;
    let sync = SyncPass::new(&settings)?;
    let interval = sync.timing().poll_interval;

    println!(
        "{} Syncing {} <-> {} every {:?}",
        "=>".blue().bold(),
        sync.layout().local.display(),
        sync.layout().cloud.display(),
        interval
    );

    let mut completed = 0u64;
    let last_ok = loop {
        let report = sync.run_pass();
        output::print_report(&report, false);
        completed += 1;

        if passes.is_some_and(|limit| completed >= limit) {
            break report.success();
        }
        thread::sleep(interval);
    };

    Ok(if last_ok { 0 } else { 2 })
}

/// Settle the vault once and print what was done.
///
/// A fresh process has seen nothing yet, so every path starts its
/// stabilization window on the first pass. The actions happen on a second
/// pass one window later.
pub fn run_once(resolver: &SettingsResolver, json: bool) -> Result<i32> {
    let settings = resolver.resolve()?;
    let sync = SyncPass::new(&settings)?;

    let first = sync.run_pass();
    tracing::debug!(waiting = first.waiting, "opened stabilization windows");
    thread::sleep(sync.timing().stability_window);
    let mut report = sync.run_pass();
    report.started_at = first.started_at;
    report.temp_artifacts_removed += first.temp_artifacts_removed;
    let mut errors = first.errors;
    errors.append(&mut report.errors);
    report.errors = errors;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report, true);
    }

    Ok(if report.success() { 0 } else { 2 })
}
