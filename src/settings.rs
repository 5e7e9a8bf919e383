//! Settings - Layered configuration for the ledger and its collaborators
//!
//! Every component keeps its own `*Config` struct with working defaults;
//! this module only layers an optional file and `GIG_ESCROW__`-prefixed
//! environment variables on top of them.

use crate::{
    artifact_store::ArtifactStoreConfig, ledger::LedgerConfig, notifier::SmsNotifierConfig,
    EscrowResult,
};
use serde::Deserialize;

/// Top-level settings, one section per component
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ledger: LedgerConfig,
    pub notifier: SmsNotifierConfig,
    pub artifacts: ArtifactStoreConfig,
}

impl Settings {
    /// Load settings from an optional config file plus environment variables.
    ///
    /// Environment variables use the `GIG_ESCROW` prefix with `__` as the
    /// section separator, e.g. `GIG_ESCROW__NOTIFIER__ACCOUNT_SID`.
    pub fn load(config_file: Option<&str>) -> EscrowResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let loaded = builder
            .add_source(
                config::Environment::with_prefix("GIG_ESCROW")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(loaded.try_deserialize()?)
    }
}
