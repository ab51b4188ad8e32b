//! Guest configuration

use crate::error::{GuestError, Result};
use dams_store_client::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub guest: GuestSettings,
}

/// Runtime behaviour of the guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestSettings {
    /// Skip save/load until the session has been verified
    #[serde(default = "default_true")]
    pub require_trusted_session: bool,

    /// Capacity of the command and event channels
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for GuestSettings {
    fn default() -> Self {
        Self {
            require_trusted_session: true,
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    64
}

impl GuestConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| GuestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GuestError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.guest.channel_capacity == 0 {
            return Err(GuestError::Config("channel_capacity must be at least 1".into()));
        }
        if !self.store.base_url.starts_with("http://") && !self.store.base_url.starts_with("https://") {
            return Err(GuestError::Config(format!(
                "store base_url must be http(s): {}",
                self.store.base_url
            )));
        }
        Ok(())
    }
}
