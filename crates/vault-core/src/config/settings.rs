//! Sync settings and their validation

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vault_fs::{RobustnessConfig, VaultLayout};

use crate::filter::{DEFAULT_EXCLUDE_PATTERNS, EphemeralPolicy, ExcludePatterns};
use crate::{Error, Result};

/// Everything a sync pass needs to know, as stored in the settings file.
///
/// `workers` comes first so the struct serializes to valid TOML (plain keys
/// before tables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Worker threads per pass
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// The three tree roots
    pub vault: VaultSection,

    #[serde(default)]
    pub timing: TimingSection,

    #[serde(default)]
    pub seeding: SeedingSection,

    #[serde(default)]
    pub exclude: ExcludeSection,

    #[serde(default)]
    pub io: IoSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSection {
    pub local: PathBuf,
    pub cloud: PathBuf,
    pub history: PathBuf,
}

/// Timer lengths in (fractional) seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub stability_window_secs: f64,
    pub stabilize_wait_secs: f64,
    pub cooldown_secs: f64,
    pub poll_interval_secs: f64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            stability_window_secs: 2.0,
            stabilize_wait_secs: 8.0,
            cooldown_secs: 3.0,
            poll_interval_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingSection {
    /// New files smaller than this many bytes are not seeded yet
    pub min_size: u64,
    /// File-name regexes for placeholder files that are never seeded
    pub ephemeral_patterns: Vec<String>,
}

impl Default for SeedingSection {
    fn default() -> Self {
        Self {
            min_size: 8,
            ephemeral_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeSection {
    /// Regexes matched against forward-slash relative paths
    pub patterns: Vec<String>,
}

impl Default for ExcludeSection {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSection {
    pub fingerprint_attempts: u32,
    pub write_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for IoSection {
    fn default() -> Self {
        let defaults = RobustnessConfig::default();
        Self {
            fingerprint_attempts: defaults.fingerprint_attempts,
            write_attempts: defaults.write_attempts,
            initial_backoff_ms: defaults.initial_backoff.as_millis() as u64,
            max_backoff_ms: defaults.max_backoff.as_millis() as u64,
        }
    }
}

/// Timer lengths converted to durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub stability_window: Duration,
    pub stabilize_wait: Duration,
    pub cooldown: Duration,
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        TimingSection::default()
            .to_timing()
            .unwrap_or(Self {
                stability_window: Duration::from_secs(2),
                stabilize_wait: Duration::from_secs(8),
                cooldown: Duration::from_secs(3),
                poll_interval: Duration::from_secs(2),
            })
    }
}

impl TimingSection {
    fn to_timing(&self) -> Result<Timing> {
        Ok(Timing {
            stability_window: seconds("timing.stability_window_secs", self.stability_window_secs)?,
            stabilize_wait: seconds("timing.stabilize_wait_secs", self.stabilize_wait_secs)?,
            cooldown: seconds("timing.cooldown_secs", self.cooldown_secs)?,
            poll_interval: seconds("timing.poll_interval_secs", self.poll_interval_secs)?,
        })
    }
}

fn default_workers() -> usize {
    4
}

fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| Error::invalid(format!("{key} must be a finite, non-negative number, got {value}")))
}

impl SyncSettings {
    /// Default settings for the given roots.
    pub fn for_roots(
        local: impl Into<PathBuf>,
        cloud: impl Into<PathBuf>,
        history: impl Into<PathBuf>,
    ) -> Self {
        Self {
            workers: default_workers(),
            vault: VaultSection {
                local: local.into(),
                cloud: cloud.into(),
                history: history.into(),
            },
            timing: TimingSection::default(),
            seeding: SeedingSection::default(),
            exclude: ExcludeSection::default(),
            io: IoSection::default(),
        }
    }

    pub fn layout(&self) -> VaultLayout {
        VaultLayout::new(&self.vault.local, &self.vault.cloud, &self.vault.history)
    }

    pub fn timing(&self) -> Result<Timing> {
        self.timing.to_timing()
    }

    pub fn robustness(&self) -> RobustnessConfig {
        RobustnessConfig {
            fingerprint_attempts: self.io.fingerprint_attempts,
            write_attempts: self.io.write_attempts,
            initial_backoff: Duration::from_millis(self.io.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.io.max_backoff_ms),
            ..RobustnessConfig::default()
        }
    }

    pub fn ephemeral_policy(&self) -> Result<EphemeralPolicy> {
        Ok(EphemeralPolicy::new(
            self.seeding.min_size,
            &self.seeding.ephemeral_patterns,
        )?)
    }

    pub fn exclusions(&self) -> Result<ExcludePatterns> {
        Ok(ExcludePatterns::new(&self.exclude.patterns)?)
    }

    /// Check every value a pass depends on.
    ///
    /// Does not touch the filesystem; see [`VaultLayout::validate`] for the
    /// roots.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid("workers must be at least 1"));
        }

        let timing = self.timing()?;
        if timing.stabilize_wait <= timing.stability_window {
            return Err(Error::invalid(format!(
                "timing.stabilize_wait_secs ({}) must be greater than timing.stability_window_secs ({})",
                self.timing.stabilize_wait_secs, self.timing.stability_window_secs
            )));
        }

        if self.io.fingerprint_attempts == 0 {
            return Err(Error::invalid("io.fingerprint_attempts must be at least 1"));
        }
        if self.io.write_attempts == 0 {
            return Err(Error::invalid("io.write_attempts must be at least 1"));
        }
        if self.io.max_backoff_ms < self.io.initial_backoff_ms {
            return Err(Error::invalid(
                "io.max_backoff_ms must not be smaller than io.initial_backoff_ms",
            ));
        }

        self.exclusions()?;
        self.ephemeral_policy()?;
        Ok(())
    }
}
