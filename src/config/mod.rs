//! Configuration handling for presubmit.
//!
//! The check battery is fixed for a run: one warm-up command, an ordered
//! list of checks, and at most one installation command per check for
//! tool recovery. It is read from a `presubmit.toml` found by walking up
//! from the working directory, with compiled-in defaults when no file
//! exists. The root directory every check's `dir` is resolved against is
//! an explicit value on [`Config`], set when the file is located - never
//! read from ambient process state later.

use crate::core::error::{Error, Result};
use crate::core::launcher::CheckSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "presubmit.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory check working directories are resolved against.
    /// Set from the config file location (or the invocation directory),
    /// not serialized.
    #[serde(skip)]
    pub root: PathBuf,
    /// The warm-up step run before anything else.
    pub warmup: WarmupConfig,
    /// Checks to fan out after warm-up, in drain order.
    #[serde(rename = "check")]
    pub checks: Vec<CheckConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            warmup: WarmupConfig::default(),
            checks: default_checks(),
        }
    }
}

impl Config {
    /// Loads configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::find_config_file()?;
        Self::load_from(&path)
    }

    /// Loads configuration or returns defaults (rooted at the current
    /// directory) if no file is found.
    pub fn load_or_default() -> Result<Self> {
        match Self::find_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(Error::ConfigNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Loads configuration from a specific path. The file's directory
    /// becomes the root.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| Error::config_parse_with_source("Failed to parse TOML", e))?;

        config.root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        config.validate()?;

        Ok(config)
    }

    /// Finds the configuration file by searching up the directory tree.
    pub fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;

        let mut current = cwd.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::ConfigNotFound {
            path: cwd.join(CONFIG_FILE_NAME),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.warmup.command.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "warmup.command".to_string(),
                message: "command must not be empty".to_string(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for check in &self.checks {
            if check.name.is_empty() {
                return Err(Error::ConfigInvalid {
                    field: "check.name".to_string(),
                    message: "every check needs a name".to_string(),
                });
            }
            if !seen.insert(check.name.as_str()) {
                return Err(Error::ConfigInvalid {
                    field: format!("check.{}", check.name),
                    message: "duplicate check name".to_string(),
                });
            }
            if check.command.is_empty() {
                return Err(Error::ConfigInvalid {
                    field: format!("check.{}.command", check.name),
                    message: "command must not be empty".to_string(),
                });
            }
            if let Some(recovery) = &check.recovery {
                if recovery.install.is_empty() {
                    return Err(Error::ConfigInvalid {
                        field: format!("check.{}.recovery.install", check.name),
                        message: "install command must not be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Resolves the warm-up step against the root.
    #[must_use]
    pub fn warmup_spec(&self) -> CheckSpec {
        CheckSpec::new(
            "warmup",
            self.warmup.command.clone(),
            self.root.join(&self.warmup.dir),
        )
    }

    /// Resolves one check against the root.
    #[must_use]
    pub fn check_spec(&self, check: &CheckConfig) -> CheckSpec {
        CheckSpec::new(
            check.name.clone(),
            check.command.clone(),
            self.root.join(&check.dir),
        )
    }

    /// Generates default configuration as a string.
    #[must_use]
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// The warm-up command that primes shared build state before fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Argument vector to run.
    pub command: Vec<String>,
    /// Working directory, relative to the root.
    pub dir: String,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            command: vec!["go".to_string(), "test".to_string(), "-i".to_string()],
            dir: ".".to_string(),
        }
    }
}

/// Configuration for a single check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Name of the check, used for reporting.
    pub name: String,
    /// Argument vector to run.
    pub command: Vec<String>,
    /// Working directory, relative to the root.
    pub dir: String,
    /// Installation command used to acquire the check's tool when the
    /// launch cannot start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecoveryConfig>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: Vec::new(),
            dir: ".".to_string(),
            recovery: None,
        }
    }
}

/// Tool-acquisition fallback for one check.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Installation command, run with no working-directory override.
    pub install: Vec<String>,
}

/// The default battery: build, test, and an auxiliary lint whose tool is
/// installed on demand.
fn default_checks() -> Vec<CheckConfig> {
    vec![
        CheckConfig {
            name: "build".to_string(),
            command: vec!["go".to_string(), "build".to_string()],
            dir: ".".to_string(),
            recovery: None,
        },
        CheckConfig {
            name: "test".to_string(),
            command: vec!["go".to_string(), "test".to_string()],
            dir: ".".to_string(),
            recovery: None,
        },
        CheckConfig {
            name: "errcheck".to_string(),
            command: vec!["errcheck".to_string()],
            dir: ".".to_string(),
            recovery: Some(RecoveryConfig {
                install: vec![
                    "go".to_string(),
                    "install".to_string(),
                    "github.com/kisielk/errcheck@latest".to_string(),
                ],
            }),
        },
    ]
}
