//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`].  With no path the built-in defaults are
//! used; a given path must exist, parse and validate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SupervisorConfig;

#[derive(Debug, Clone, Default)]
pub struct JsonConfigFile {
    path: Option<PathBuf>,
}

impl JsonConfigFile {
    pub fn new(path: Option<impl AsRef<Path>>) -> Self {
        Self {
            path: path.map(|p| p.as_ref().to_path_buf()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SupervisorConfig, ConfigError> {
        let Some(path) = &self.path else {
            info!("Config: no file given, using defaults");
            let cfg = SupervisorConfig::default();
            cfg.validate()?;
            return Ok(cfg);
        };

        let text = fs::read_to_string(path).map_err(|e| {
            warn!("Config: cannot read {}: {}", path.display(), e);
            match e.kind() {
                io::ErrorKind::NotFound => ConfigError::NotFound,
                _ => ConfigError::IoError,
            }
        })?;
        let cfg: SupervisorConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("Config: {} is not valid: {}", path.display(), e);
            ConfigError::Corrupted
        })?;
        cfg.validate()?;
        info!("Config: loaded {}", path.display());
        Ok(cfg)
    }
}
