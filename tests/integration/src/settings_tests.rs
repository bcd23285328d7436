//! Settings files drive real passes

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use vault_core::{Error, ManualClock, SettingsResolver, SyncAction, SyncPass, SyncSettings};
use vault_fs::Side;
use vault_test_utils::TestVault;

fn settings_toml(vault: &TestVault, extra: &str) -> String {
    let path = |side| vault.root(side).display().to_string().replace('\\', "/");
    format!(
        r#"
workers = 2

[vault]
local = "{}"
cloud = "{}"
history = "{}"

[io]
initial_backoff_ms = 1
max_backoff_ms = 5
{extra}
"#,
        path(Side::Local),
        path(Side::Cloud),
        path(Side::History)
    )
}

fn write_config(dir: &Path, text: &str) {
    let app_dir = dir.join("vault-sync");
    fs::create_dir_all(&app_dir).unwrap();
    fs::write(app_dir.join("config.toml"), text).unwrap();
}

fn settle(pass: &SyncPass, clock: &ManualClock) -> Vec<vault_core::PassReport> {
    (0..6)
        .map(|_| {
            let report = pass.run_pass();
            clock.advance(Duration::from_secs(2));
            report
        })
        .collect()
}

#[test]
fn test_settings_from_default_location_drive_a_pass() {
    let vault = TestVault::new();
    let config_dir = tempfile::tempdir().unwrap();
    write_config(
        config_dir.path(),
        &settings_toml(
            &vault,
            r#"
[exclude]
patterns = ['(^|/)\.trash/']

[seeding]
ephemeral_patterns = ['^Untitled.*\.md$']
"#,
        ),
    );

    let settings = SettingsResolver::new()
        .with_config_dir(config_dir.path().to_path_buf())
        .resolve()
        .unwrap();
    assert_eq!(settings.workers, 2);

    vault.write(Side::Local, "kept.md", "a note that should sync");
    vault.write(Side::Local, ".trash/old.md", "excluded from syncing");
    vault.write(Side::Local, "Untitled.md", "placeholder text here");

    let clock = ManualClock::starting_now();
    let pass = SyncPass::with_clock(&settings, Arc::new(clock.clone())).unwrap();
    let reports = settle(&pass, &clock);

    assert!(reports.iter().any(|r| {
        r.entry("kept.md").map(|e| &e.action) == Some(&SyncAction::SeedFromLocal)
    }));
    vault.assert_converged("kept.md", "a note that should sync");
    vault.assert_missing(Side::Cloud, ".trash/old.md");
    vault.assert_missing(Side::History, ".trash/old.md");
    vault.assert_missing(Side::Cloud, "Untitled.md");
    vault.assert_missing(Side::History, "Untitled.md");
}

#[test]
fn test_history_root_is_created_on_first_use() {
    let vault = TestVault::new();
    fs::remove_dir(vault.root(Side::History)).unwrap();

    let settings = SyncSettings::for_roots(
        vault.root(Side::Local),
        vault.root(Side::Cloud),
        vault.root(Side::History),
    );
    SyncPass::new(&settings).unwrap();

    assert!(vault.root(Side::History).is_dir());
}

#[test]
fn test_json_settings_are_accepted() {
    let vault = TestVault::new();
    let settings = SyncSettings::for_roots(
        vault.root(Side::Local),
        vault.root(Side::Cloud),
        vault.root(Side::History),
    );
    let path = vault.base().join("settings.json");
    fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

    let loaded = SettingsResolver::new()
        .with_explicit(Some(path))
        .resolve()
        .unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_overlapping_roots_are_rejected() {
    let vault = TestVault::new();
    let settings = SyncSettings::for_roots(
        vault.root(Side::Local),
        vault.root(Side::Cloud),
        vault.root(Side::Local).join(".history"),
    );

    let err = SyncPass::new(&settings).err().expect("layout must be rejected");
    assert!(matches!(err, Error::Fs(vault_fs::Error::LayoutValidation { .. })));
}

#[test]
fn test_wait_shorter_than_window_is_rejected() {
    let vault = TestVault::new();
    let config_dir = tempfile::tempdir().unwrap();
    write_config(
        config_dir.path(),
        &settings_toml(
            &vault,
            r#"
[timing]
stability_window_secs = 5.0
stabilize_wait_secs = 2.0
"#,
        ),
    );

    let err = SettingsResolver::new()
        .with_config_dir(config_dir.path().to_path_buf())
        .resolve()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSettings { .. }));
}
