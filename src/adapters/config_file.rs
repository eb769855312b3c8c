//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] by reading a [`SystemConfig`] from a file on
//! disk.  The file is read once at startup; there is no reload.

use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::SystemConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = SystemConfig::from_json(&text)?;
        info!(
            "Config: loaded {} ({} lines, start {}, run {}, gap {})",
            self.path.display(),
            config.lines.len(),
            config.start,
            config.duration,
            config.gap
        );
        Ok(config)
    }
}
