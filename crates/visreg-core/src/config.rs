//! Configuration types for visreg.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Engine configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VisregConfig {
    /// Snapshot store settings
    pub store: StoreSettings,
    /// Comparison settings
    pub compare: CompareSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl VisregConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: VisregConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::Config(format!(
                "logging.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        Ok(())
    }
}

/// Where and how snapshot sets are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory holding one folder per subject
    pub root: PathBuf,
    /// Folder name of the baseline role
    pub baseline_dir: String,
    /// Folder name of the current role
    pub current_dir: String,
    /// Image file extension, without the dot
    pub extension: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("screenshots"),
            baseline_dir: "base".to_string(),
            current_dir: "cur".to_string(),
            extension: "png".to_string(),
        }
    }
}

impl StoreSettings {
    /// Validate directory names and extension.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("store.baseline_dir", &self.baseline_dir),
            ("store.current_dir", &self.current_dir),
        ] {
            if !is_single_component(value) {
                return Err(Error::Config(format!(
                    "{field} must be a single directory name, got {value:?}"
                )));
            }
        }

        if self.baseline_dir == self.current_dir {
            return Err(Error::Config(
                "store.baseline_dir and store.current_dir must differ".to_string(),
            ));
        }

        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(Error::Config(format!(
                "store.extension must be a bare extension like \"png\", got {:?}",
                self.extension
            )));
        }

        Ok(())
    }
}

/// Comparison behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    /// Promote the current set into an empty baseline at session end
    pub auto_promote: bool,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self { auto_promote: true }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn is_single_component(name: &str) -> bool {
    !name.trim().is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
