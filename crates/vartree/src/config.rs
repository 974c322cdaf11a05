// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Controller configuration, stored as TOML (`~/.vartree.toml` by default)

use std::{fs, path::Path, path::PathBuf};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::node::DEFAULT_MAX_DISPLAY_LEN;

/// Default number of children fetched per page of an enumerable value
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Settings of a [`TreeController`](crate::TreeController)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Children fetched per page of an enumerable value
    pub page_size: usize,
    /// Display values are truncated beyond this many characters
    pub max_display_len: usize,
    /// Whether watch expressions can be added and edited
    pub watch_expressions: bool,
    /// Whether values can be edited in place
    pub allow_editing: bool,
    /// Buffered events per subscriber before the slowest one starts lagging
    pub event_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_display_len: DEFAULT_MAX_DISPLAY_LEN,
            watch_expressions: true,
            allow_editing: true,
            event_capacity: 1024,
        }
    }
}

impl TreeConfig {
    /// Get the config file path (~/.vartree.toml)
    pub fn config_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| eyre::eyre!("Unable to determine home directory"))?;
        Ok(home.join(".vartree.toml"))
    }

    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found, creating default at {:?}", config_path);
            let default_config = Self::default();
            default_config.save_to_path(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;

        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;

        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).wrap_err("Invalid TOML")?;
        Ok(config.sanitized())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).wrap_err("Failed to serialize config to TOML")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {path:?}"))?;

        debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Clamp values that would stall paging or the event channel
    fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}
