//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// vault-sync - Keep a local vault and its cloud mirror in step
#[derive(Parser, Debug)]
#[command(name = "vault-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (TOML, JSON or YAML)
    #[arg(short, long, global = true, env = "VAULT_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run sync passes on the poll interval
    ///
    /// Examples:
    ///   vault-sync run               # Until interrupted
    ///   vault-sync run --passes 10   # Stop after ten passes
    Run {
        /// Stop after this many passes
        #[arg(long)]
        passes: Option<u64>,
    },

    /// Run a single sync pass and print what it did
    Once {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Validate settings and the vault layout without syncing
    Check,

    /// Generate shell completions
    ///
    /// Examples:
    ///   vault-sync completions bash > ~/.local/share/bash-completion/completions/vault-sync
    ///   vault-sync completions zsh > ~/.zfunc/_vault-sync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
