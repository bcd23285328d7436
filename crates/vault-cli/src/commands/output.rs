//! Human-readable pass reports

use colored::Colorize;
use vault_core::{Outcome, PassReport, PathReport, SyncAction};

/// Print a pass report. Quiet passes print a single summary line, or
/// nothing at all unless `always` is set.
pub fn print_report(report: &PassReport, always: bool) {
    if report.is_quiet() && report.errors.is_empty() && report.temp_artifacts_removed == 0 {
        if always {
            println!("{} {}", "OK".green().bold(), summary(report));
        }
        return;
    }

    println!(
        "{} Pass at {}: {}",
        "=>".blue().bold(),
        report.started_at.format("%H:%M:%S"),
        summary(report)
    );
    for entry in &report.entries {
        println!("   {} {} {}", label(&entry.outcome), entry.path, describe(entry));
    }
    if report.temp_artifacts_removed > 0 {
        println!("   removed {} leftover temp file(s)", report.temp_artifacts_removed);
    }
    for error in &report.errors {
        println!("   {} {}", "ERROR".red().bold(), error);
    }
}

fn summary(report: &PassReport) -> String {
    let mut line = format!(
        "{} scanned, {} acted, {} in sync, {} waiting, {} cooling down",
        report.scanned,
        report.entries.len(),
        report.in_sync,
        report.waiting,
        report.cooling_down
    );
    let deferred = report.deferred().count();
    let failed = report.failures().count();
    if deferred > 0 || failed > 0 {
        line.push_str(&format!(" ({deferred} deferred, {failed} failed)"));
    }
    line
}

fn label(outcome: &Outcome) -> colored::ColoredString {
    match outcome {
        Outcome::Succeeded => "OK".green().bold(),
        Outcome::Retried { .. } => "RETRIED".green(),
        Outcome::Deferred { .. } => "DEFERRED".yellow().bold(),
        Outcome::Failed { .. } => "FAILED".red().bold(),
    }
}

fn describe(entry: &PathReport) -> String {
    let action = match &entry.action {
        SyncAction::ResolveConflict {
            winner,
            duplicate: Some(dup),
        } => format!("({} kept {winner}, other copy at {dup})", entry.action),
        SyncAction::ResolveConflict { winner, duplicate: None } => {
            format!("({} kept {winner})", entry.action)
        }
        other => format!("({other})"),
    };
    match &entry.outcome {
        Outcome::Succeeded => action,
        Outcome::Retried { attempts } => format!("{action} after {attempts} attempts"),
        Outcome::Deferred { reason } => format!("{action}: {reason}"),
        Outcome::Failed { reason, .. } => format!("{action}: {}", reason.red()),
    }
}
