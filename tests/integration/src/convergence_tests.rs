//! Whole-vault properties: whatever each side does to a set of notes, the
//! three trees end up identical and no edited content is lost.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use vault_core::{ManualClock, PassReport, SyncAction, SyncPass, SyncSettings};
use vault_fs::Side;
use vault_test_utils::TestVault;

const ORIGINAL: &str = "original note body";

struct Vault {
    files: TestVault,
    clock: ManualClock,
    pass: SyncPass,
}

impl Vault {
    fn new(workers: usize) -> Self {
        let files = TestVault::new();
        let mut settings = SyncSettings::for_roots(
            files.root(Side::Local),
            files.root(Side::Cloud),
            files.root(Side::History),
        );
        settings.workers = workers;
        settings.io.initial_backoff_ms = 1;
        settings.io.max_backoff_ms = 5;

        let clock = ManualClock::starting_now();
        let pass = SyncPass::with_clock(&settings, Arc::new(clock.clone())).unwrap();
        Self { files, clock, pass }
    }

    /// Run passes a second apart until two in a row are idle.
    fn converge(&self) -> Vec<PassReport> {
        let mut reports = Vec::new();
        let mut idle_streak = 0;
        for _ in 0..40 {
            let report = self.pass.run_pass();
            let idle = report.is_quiet() && report.waiting == 0 && report.cooling_down == 0;
            idle_streak = if idle { idle_streak + 1 } else { 0 };
            assert!(report.success(), "pass failed: {report:?}");
            reports.push(report);
            if idle_streak == 2 {
                return reports;
            }
            self.clock.advance(Duration::from_secs(1));
        }
        panic!("vault did not converge");
    }

    fn contents(&self, side: Side) -> BTreeMap<String, String> {
        self.files
            .files(side)
            .into_iter()
            .map(|rel| {
                let body = self.files.read(side, &rel).unwrap_or_default();
                (rel, body)
            })
            .collect()
    }

    fn assert_trees_identical(&self) {
        let local = self.contents(Side::Local);
        assert_eq!(local, self.contents(Side::Cloud));
        assert_eq!(local, self.contents(Side::History));
    }

    fn apply(&self, side: Side, rel: &str, edit: &Edit) {
        match edit {
            Edit::Keep => {}
            Edit::Write(body) => {
                self.files.write(side, rel, body);
            }
            Edit::Delete => {
                if self.files.exists(side, rel) {
                    self.files.remove(side, rel);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Keep,
    Write(String),
    Delete,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        Just(Edit::Keep),
        // Long enough to clear the seeding size floor
        "[a-z]{8,24}".prop_map(Edit::Write),
        Just(Edit::Delete),
    ]
}

/// One round: an edit per side for each of three notes.
fn round() -> impl Strategy<Value = Vec<(Edit, Edit)>> {
    proptest::collection::vec((edit(), edit()), 3)
}

fn note(i: usize) -> String {
    format!("notes/n{i}.md")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_any_edits_converge_without_losing_content(rounds in proptest::collection::vec(round(), 1..3)) {
        let vault = Vault::new(2);
        for i in 0..3 {
            vault.files.write_all(&note(i), ORIGINAL);
        }
        vault.converge();

        for edits in rounds {
            let mut written = Vec::new();
            for (i, (local, cloud)) in edits.iter().enumerate() {
                vault.apply(Side::Local, &note(i), local);
                vault.apply(Side::Cloud, &note(i), cloud);
                for e in [local, cloud] {
                    if let Edit::Write(body) = e {
                        written.push(body.clone());
                    }
                }
            }

            vault.converge();
            vault.assert_trees_identical();

            let surviving: Vec<String> = vault.contents(Side::Local).into_values().collect();
            for body in written {
                prop_assert!(
                    surviving.contains(&body),
                    "edited content {body:?} was lost; local tree holds {surviving:?}"
                );
            }
        }

        let last = vault.pass.run_pass();
        prop_assert!(last.is_quiet());
    }
}

#[test]
fn test_many_notes_settle_with_parallel_workers() {
    let vault = Vault::new(8);
    for i in 0..40 {
        let rel = format!("folder{}/note{i}.md", i % 5);
        match i % 4 {
            0 => vault.files.write_all(&rel, ORIGINAL),
            1 => {
                vault.files.write(Side::Local, &rel, &format!("local note number {i}"));
            }
            2 => {
                vault.files.write(Side::Cloud, &rel, &format!("cloud note number {i}"));
            }
            _ => {
                vault.files.write_all(&rel, ORIGINAL);
                vault.files.write(Side::Local, &rel, &format!("edited note number {i}"));
            }
        }
    }

    let reports = vault.converge();
    vault.assert_trees_identical();

    let acted: usize = reports.iter().map(|r| r.entries.len()).sum();
    assert_eq!(acted, 30);
    assert_eq!(vault.files.files(Side::Local).len(), 40);
}

#[test]
fn test_conflict_duplicate_reaches_every_tree() {
    let vault = Vault::new(4);
    vault.files.write_all("plan.md", ORIGINAL);
    vault.converge();

    vault.files.write(Side::Local, "plan.md", "local rewrite of the plan");
    vault.files.write(Side::Cloud, "plan.md", "cloud rewrite of the plan");
    let reports = vault.converge();

    let duplicate = reports
        .iter()
        .flat_map(|r| r.entries.iter())
        .find_map(|e| match &e.action {
            SyncAction::ResolveConflict { duplicate, .. } => duplicate.clone(),
            _ => None,
        })
        .expect("a conflict with a duplicate");

    vault.assert_trees_identical();
    let files = vault.files.files(Side::Local);
    assert_eq!(files.len(), 2);
    assert!(files.contains(&duplicate.as_str().to_string()));

    let mut bodies: Vec<String> = vault.contents(Side::Cloud).into_values().collect();
    bodies.sort();
    assert_eq!(
        bodies,
        vec![
            "cloud rewrite of the plan".to_string(),
            "local rewrite of the plan".to_string()
        ]
    );
}
