//! Locating and loading the settings file

use std::path::{Path, PathBuf};

use vault_fs::ConfigStore;

use super::settings::SyncSettings;
use crate::{Error, Result};

/// File name looked up inside the per-user config directory.
pub const SETTINGS_FILE: &str = "config.toml";

/// Directory name under the platform config directory.
pub const APP_DIR: &str = "vault-sync";

/// Finds, loads and validates [`SyncSettings`].
///
/// An explicit path wins; otherwise `<config_dir>/vault-sync/config.toml` is
/// used, where `<config_dir>` comes from `dirs::config_dir()`:
/// - Linux: `~/.config/`
/// - macOS: `~/Library/Application Support/`
/// - Windows: `%APPDATA%\`
#[derive(Debug, Clone, Default)]
pub struct SettingsResolver {
    explicit: Option<PathBuf>,

    /// Override for the user config directory (used for testing).
    config_dir_override: Option<PathBuf>,
}

impl SettingsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from this file instead of the default location.
    pub fn with_explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// Use `dir` in place of the platform config directory.
    pub fn with_config_dir(mut self, dir: PathBuf) -> Self {
        self.config_dir_override = Some(dir);
        self
    }

    /// The path that [`resolve`](Self::resolve) will read.
    pub fn settings_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        self.config_dir_override
            .clone()
            .or_else(dirs::config_dir)
            .map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    pub fn resolve(&self) -> Result<SyncSettings> {
        let path = self.settings_path().ok_or_else(|| Error::ConfigNotFound {
            path: PathBuf::from(APP_DIR).join(SETTINGS_FILE),
        })?;
        load(&path)
    }
}

/// Load and validate settings from `path`. The format follows the extension.
pub fn load(path: &Path) -> Result<SyncSettings> {
    if !path.is_file() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), "loading settings");
    let settings: SyncSettings = ConfigStore::new().load(path)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
[vault]
local = "/v/local"
cloud = "/v/cloud"
history = "/v/history"
"#;

    #[test]
    fn explicit_path_wins() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");
        fs::write(&explicit, MINIMAL).unwrap();

        let resolver = SettingsResolver::new()
            .with_config_dir(dir.path().join("unused"))
            .with_explicit(Some(explicit.clone()));

        assert_eq!(resolver.settings_path(), Some(explicit));
        assert_eq!(resolver.resolve().unwrap().workers, 4);
    }

    #[test]
    fn falls_back_to_config_dir() {
        let dir = tempdir().unwrap();
        let app_dir = dir.path().join(APP_DIR);
        fs::create_dir_all(&app_dir).unwrap();
        fs::write(app_dir.join(SETTINGS_FILE), MINIMAL).unwrap();

        let resolver = SettingsResolver::new().with_config_dir(dir.path().to_path_buf());
        let settings = resolver.resolve().unwrap();
        assert_eq!(settings.vault.cloud, PathBuf::from("/v/cloud"));
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = tempdir().unwrap();
        let resolver = SettingsResolver::new().with_config_dir(dir.path().to_path_buf());
        let err = resolver.resolve().unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, format!("workers = 0\n{MINIMAL}")).unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidSettings { .. }));
    }

    #[test]
    fn json_settings_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"vault": {"local": "/l", "cloud": "/c", "history": "/h"}, "workers": 2}"#,
        )
        .unwrap();

        let settings = load(&path).unwrap();
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.timing.cooldown_secs, 3.0);
    }

    #[test]
    fn malformed_file_is_fs_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[vault\nlocal = ").unwrap();

        assert!(matches!(load(&path).unwrap_err(), Error::Fs(_)));
    }
}
