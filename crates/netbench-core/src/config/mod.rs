pub mod types;

pub use types::*;

use crate::types::BenchError;
use std::path::{Path, PathBuf};

/// Loads, validates and saves the TOML benchmark configuration.
pub struct ConfigManager {
    path: PathBuf,
    config: BenchConfig,
}

impl ConfigManager {
    /// Load config from `path`. Creates a default config file if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                BenchError::Config(format!("Failed to read config at {}: {e}", path.display()))
            })?;
            let config: BenchConfig = toml::from_str(&contents).map_err(|e| {
                BenchError::Config(format!("Failed to parse config at {}: {e}", path.display()))
            })?;
            config.validate()?;
            Ok(Self {
                path: path.to_path_buf(),
                config,
            })
        } else {
            let manager = Self {
                path: path.to_path_buf(),
                config: BenchConfig::default(),
            };
            manager.save()?;
            tracing::info!(path = %path.display(), "wrote default config");
            Ok(manager)
        }
    }

    /// Write the current config to the file path.
    pub fn save(&self) -> Result<(), BenchError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BenchError::Config(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let toml_str = toml::to_string_pretty(&self.config)
            .map_err(|e| BenchError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&self.path, toml_str).map_err(|e| {
            BenchError::Config(format!(
                "Failed to write config to {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(())
    }

    /// Returns a reference to the current configuration.
    pub fn get(&self) -> &BenchConfig {
        &self.config
    }

    /// Consume the manager and hand out the configuration.
    pub fn into_config(self) -> BenchConfig {
        self.config
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
