//! Engine configuration via `exstrings.toml`
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock engine: batches of 50 keys and two background workers.

use serde::{Deserialize, Serialize};
use std::path::Path;

use exstrings_core::{Error, Result, DEFAULT_BATCH_SIZE};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "exstrings.toml";

/// Bulk scan settings, `[scan]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// `COUNT` passed to each SCAN call when the client gives none.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Background pool settings, `[background]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Worker threads running background walks.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Tasks that may wait in the queue before submissions are refused.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
}

fn default_workers() -> usize {
    2
}

fn default_max_queue_depth() -> usize {
    1024
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_queue_depth: default_max_queue_depth(),
        }
    }
}

/// Engine configuration loaded from `exstrings.toml`.
///
/// # Example
///
/// ```toml
/// [scan]
/// batch_size = 50
///
/// [background]
/// workers = 2
/// max_queue_depth = 1024
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bulk scan settings.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Background pool settings.
    #[serde(default)]
    pub background: BackgroundConfig,
}

impl EngineConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# exstrings engine configuration

[scan]
# Keys requested per SCAN call by NGET/NDEL when no COUNT is given.
batch_size = 50

[background]
# Worker threads for NGET.NOATOMIC walks.
workers = 2
# Queued walks beyond this are refused with an error reply.
max_queue_depth = 1024
"#
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first setting below one.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("scan.batch_size", self.scan.batch_size),
            ("background.workers", self.background.workers),
            ("background.max_queue_depth", self.background.max_queue_depth),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(Error::config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => {
                Error::config(format!("{} ({})", reason, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
