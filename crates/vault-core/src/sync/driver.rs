//! SyncPass: one scan, then one engine evaluation per path

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use vault_fs::{NormalizedPath, RobustnessConfig, VaultLayout, io};

use super::engine::{DecisionEngine, Evaluation};
use super::state::{SyncState, lock};
use crate::clock::{Clock, SystemClock};
use crate::config::{SyncSettings, Timing};
use crate::filter::PathFilter;
use crate::report::PassReport;
use crate::scanner::UnionScanner;
use crate::Result;

/// A configured sync instance.
///
/// Holds the timer and observation state for the life of the process, so
/// the same `SyncPass` must be reused from pass to pass.
pub struct SyncPass {
    layout: VaultLayout,
    timing: Timing,
    robustness: RobustnessConfig,
    workers: usize,
    scanner: UnionScanner,
    engine: DecisionEngine,
    state: Mutex<SyncState>,
    clock: Arc<dyn Clock>,
}

impl SyncPass {
    /// Build a pass runner on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error when the settings are invalid or the layout cannot
    /// be synchronised.
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &SyncSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        settings.validate()?;
        let layout = settings.layout();
        layout.validate()?;
        layout.ensure_history()?;

        let timing = settings.timing()?;
        let robustness = settings.robustness();
        let filter: Arc<dyn PathFilter> = Arc::new(settings.exclusions()?);
        let engine = DecisionEngine::new(
            layout.clone(),
            &timing,
            robustness,
            settings.ephemeral_policy()?,
            Arc::clone(&clock),
        );

        Ok(Self {
            scanner: UnionScanner::new(layout.clone(), filter),
            layout,
            timing,
            robustness,
            workers: settings.workers.max(1),
            engine,
            state: Mutex::new(SyncState::new(&timing)),
            clock,
        })
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Number of paths with a live stabilization or cooldown timer.
    pub fn tracked_paths(&self) -> usize {
        lock(&self.state).tracker.len()
    }

    /// Scan once and give every path one turn through the engine.
    pub fn run_pass(&self) -> PassReport {
        let mut report = PassReport::new(self.clock.now());

        let scan = self.scanner.scan();
        report.errors.extend(scan.errors);

        for artifact in &scan.temp_artifacts {
            match io::remove_file(artifact, self.robustness) {
                Ok(true) => {
                    tracing::info!(path = %artifact.display(), "removed leftover temp file");
                    report.temp_artifacts_removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(path = %artifact.display(), error = %e, "could not remove temp file");
                    report.errors.push(e.to_string());
                }
            }
        }

        let paths: Vec<NormalizedPath> = scan.paths.into_iter().collect();
        report.scanned = paths.len();

        for evaluation in self.evaluate_all(&paths) {
            match evaluation {
                Evaluation::CoolingDown => report.cooling_down += 1,
                Evaluation::Waiting => report.waiting += 1,
                Evaluation::InSync => report.in_sync += 1,
                Evaluation::Acted(entry) => report.entries.push(entry),
            }
        }

        let live: std::collections::HashSet<&NormalizedPath> = paths.iter().collect();
        report.finished_at = self.clock.now();
        let tracked = {
            let mut state = lock(&self.state);
            state.retain(report.finished_at, |path| live.contains(path));
            state.tracker.len()
        };

        tracing::info!(
            scanned = report.scanned,
            tracked,
            acted = report.entries.len(),
            waiting = report.waiting,
            cooling_down = report.cooling_down,
            "pass complete"
        );
        report
    }

    /// Evaluate paths on up to `workers` threads, pulling from a shared
    /// index. Results come back in input order.
    fn evaluate_all(&self, paths: &[NormalizedPath]) -> Vec<Evaluation> {
        let workers = self.workers.min(paths.len());
        if workers <= 1 {
            return paths
                .iter()
                .map(|path| self.engine.evaluate(path, &self.state))
                .collect();
        }

        let next = AtomicUsize::new(0);
        let results = Mutex::new(Vec::with_capacity(paths.len()));
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = paths.get(index) else {
                            break;
                        };
                        let evaluation = self.engine.evaluate(path, &self.state);
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((index, evaluation));
                    }
                });
            }
        });

        let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, evaluation)| evaluation).collect()
    }
}
