//! TOML-based configuration for settingsrepo.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//! The store root may be overridden at runtime through the
//! `SETTINGSREPO_ROOT` environment variable (see
//! [`RepositoryConfig::resolve_env_vars`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::{ResolutionStrategy, StrategyKind, DEFAULT_SENTINEL};
use crate::errors::ConfigError;

/// Environment variable overriding `repository.root`.
pub const ROOT_ENV: &str = "SETTINGSREPO_ROOT";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Store location and index backend.
    #[serde(default)]
    pub repository: StoreConfig,

    /// Conflict resolution behaviour.
    #[serde(default)]
    pub conflicts: ConflictConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Which index backend pairs with the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Git index in the store root.
    #[default]
    Git,
    /// In-memory index, discarded on exit.
    Memory,
}

/// Store location and index backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store root. Defaults to `<data dir>/settingsrepo/repository`; a
    /// leading `~/` expands to the home directory.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Index backend.
    #[serde(default)]
    pub backend: BackendKind,
}

impl StoreConfig {
    /// The effective store root.
    pub fn resolved_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.root {
            Some(root) => Ok(expand_home(root)),
            None => default_root(),
        }
    }
}

fn default_root() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("settingsrepo").join("repository"))
        .ok_or(ConfigError::NoDefaultRoot)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// Whether conflicts are settled headless or by an operator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictMode {
    #[default]
    Automated,
    Interactive,
}

/// Conflict resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    #[serde(default)]
    pub mode: ConflictMode,

    /// Strategy used in automated mode.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Marker text for the sentinel strategy.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.into()
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            mode: ConflictMode::default(),
            strategy: StrategyKind::default(),
            sentinel: default_sentinel(),
        }
    }
}

impl ConflictConfig {
    pub fn build_strategy(&self) -> Box<dyn ResolutionStrategy> {
        self.strategy.build(&self.sentinel)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl RepositoryConfig {
    /// Load a [`RepositoryConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: RepositoryConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Apply the `SETTINGSREPO_ROOT` override when it is set.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        match std::env::var(ROOT_ENV) {
            Ok(root) if !root.is_empty() => {
                debug!(env_name = ROOT_ENV, "store root overridden from environment");
                self.repository.root = Some(PathBuf::from(root));
            }
            Ok(_) => warn!(env_name = ROOT_ENV, "env var is set but empty"),
            Err(_) => {}
        }
        Ok(())
    }

    /// Validate that all values are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.repository.root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "repository.root".into(),
                    detail: "store root must not be empty".into(),
                });
            }
        }
        if self.conflicts.strategy == StrategyKind::Sentinel && self.conflicts.sentinel.is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "conflicts.sentinel".into(),
                detail: "sentinel must not be empty when strategy is 'sentinel'".into(),
            });
        }
        if !LOG_LEVELS.contains(&self.logging.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_level".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.logging.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Default TOML config template.
    pub fn default_template() -> &'static str {
        r#"# settingsrepo configuration

[repository]
# root = "~/.local/share/settingsrepo/repository"  # platform data dir by default
backend = "git"

[conflicts]
mode = "automated"
strategy = "sentinel"
sentinel = "reset to my"

[logging]
log_level = "info"
"#
    }
}
