mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

use crate::secret::Secret;

const API_KEY_VARS: [&str; 2] = ["MANIMATE_VOYAGE_API_KEY", "VOYAGE_API_KEY"];

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error naming the first out-of-range setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be at least 1");
        }
        if self.index.batch_size == 0 {
            bail!("index.batch_size must be at least 1");
        }
        if self.index.package_name.trim().is_empty() {
            bail!("index.package_name must not be empty");
        }
        if self.store.api_collection.trim().is_empty()
            || self.store.examples_collection.trim().is_empty()
        {
            bail!("store collection names must not be empty");
        }
        if self.store.api_collection == self.store.examples_collection {
            bail!(
                "store.api_collection and store.examples_collection must differ (both are {:?})",
                self.store.api_collection
            );
        }
        Ok(())
    }

    /// Read the Voyage API key from the environment. The first non-empty variable wins.
    pub fn resolve_secrets(&mut self) {
        if let Some((key, var)) = Secret::from_env(&API_KEY_VARS) {
            tracing::debug!(var, "voyage api key resolved");
            self.secrets.voyage_api_key = Some(key);
        }
    }
}
