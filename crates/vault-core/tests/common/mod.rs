//! Harness shared by the sync scenario tests.
//!
//! Every harness runs on a [`ManualClock`], so stabilization windows,
//! cooldowns and the conflict wait elapse instantly.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vault_core::{ManualClock, PassReport, SyncPass, SyncSettings};
use vault_fs::Side;
use vault_test_utils::TestVault;

pub const WINDOW: Duration = Duration::from_secs(2);
pub const COOLDOWN: Duration = Duration::from_secs(3);

pub struct Harness {
    pub vault: TestVault,
    pub clock: ManualClock,
    pub pass: SyncPass,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    /// Default settings with fast I/O backoff, adjusted by `tweak`.
    pub fn with_settings(tweak: impl FnOnce(&mut SyncSettings)) -> Self {
        let vault = TestVault::new();
        let mut settings = settings_for(&vault);
        tweak(&mut settings);

        let clock = ManualClock::starting_now();
        let pass = SyncPass::with_clock(&settings, Arc::new(clock.clone())).unwrap();
        Self { vault, clock, pass }
    }

    pub fn run(&self) -> PassReport {
        self.pass.run_pass()
    }

    /// One pass to notice a change, then another once the window elapsed.
    pub fn settle(&self) -> PassReport {
        self.run();
        self.clock.advance(WINDOW);
        self.run()
    }

    pub fn cool_down(&self) {
        self.clock.advance(COOLDOWN);
    }

    /// Run passes a second apart until two in a row have nothing left to do.
    pub fn converge(&self) -> Vec<PassReport> {
        let mut reports = Vec::new();
        let mut quiet_streak = 0;
        for _ in 0..30 {
            let report = self.run();
            let idle = report.is_quiet() && report.waiting == 0 && report.cooling_down == 0;
            quiet_streak = if idle { quiet_streak + 1 } else { 0 };
            reports.push(report);
            if quiet_streak == 2 {
                return reports;
            }
            self.clock.advance(Duration::from_secs(1));
        }
        panic!("vault did not converge in 30 passes");
    }

    /// Files in `side` whose name marks them as conflict duplicates.
    pub fn duplicates(&self, side: Side) -> Vec<String> {
        self.vault
            .files(side)
            .into_iter()
            .filter(|f| f.contains("_CONFLICT_"))
            .collect()
    }
}

pub fn settings_for(vault: &TestVault) -> SyncSettings {
    let mut settings = SyncSettings::for_roots(
        vault.root(Side::Local),
        vault.root(Side::Cloud),
        vault.root(Side::History),
    );
    settings.io.initial_backoff_ms = 1;
    settings.io.max_backoff_ms = 5;
    settings
}
