//! Settings for a vault-sync instance
//!
//! Settings live in one file (TOML, JSON or YAML by extension) and are
//! resolved in this order:
//!
//! 1. **Explicit path** - `--config` or `VAULT_SYNC_CONFIG`
//! 2. **User config** - `<config_dir>/vault-sync/config.toml`
//!
//! Every loaded file is validated before a pass is built from it.

mod resolver;
mod settings;

pub use resolver::{APP_DIR, SETTINGS_FILE, SettingsResolver, load};
pub use settings::{
    ExcludeSection, IoSection, SeedingSection, SyncSettings, Timing, TimingSection, VaultSection,
};
