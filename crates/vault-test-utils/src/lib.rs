//! Shared test utilities for the vault-sync workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`vault`]: [`TestVault`] with local, cloud and history roots in one
//!   temporary directory

pub mod vault;

pub use vault::TestVault;
