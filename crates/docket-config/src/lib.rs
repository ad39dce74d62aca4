//! # docket-config
//!
//! Layered configuration loading for Docket using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`DOCKET_*` prefix, `__` as separator)
//! 2. Project-level `.docket/config.toml`
//! 3. User-level `~/.config/docket/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `DOCKET_SYNC__STRATEGY` -> `sync.strategy`,
//! `DOCKET_DISCOVERY__VALIDATION_LEVEL` -> `discovery.validation_level`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use docket_config::DocketConfig;
//!
//! let config = DocketConfig::load_with_dotenv(None).expect("config");
//! println!("scanning {}", config.sync.docs_root);
//! ```

mod discovery;
mod error;
mod general;
mod sync;

pub use discovery::DiscoveryConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use sync::{
    DEFAULT_CLOCK_SKEW_SECS, DEFAULT_MAX_FILE_SIZE, PatternConfig, SyncConfig, builtin_patterns,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
pub const PROJECT_DIR: &str = ".docket";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocketConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl DocketConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// `project_root` locates `.docket/config.toml`; `None` uses the current directory.
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(project_root).extract()?;
        config.sync.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the project root (or cwd).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_with_dotenv(project_root: Option<&Path>) -> Result<Self, ConfigError> {
        match project_root.map(|root| root.join(".env")) {
            Some(env_path) if env_path.exists() => {
                let _ = dotenvy::from_path(&env_path);
            }
            _ => {
                let _ = dotenvy::dotenv();
            }
        }
        Self::load(project_root)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment(project_root: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path = Self::project_config_path(project_root.unwrap_or_else(|| Path::new("")));
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("DOCKET_").split("__"))
    }

    /// `.docket/config.toml` under `project_root`.
    #[must_use]
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_DIR).join("config.toml")
    }

    /// Resolve `general.db_path` against the project root.
    #[must_use]
    pub fn db_path(&self, project_root: &Path) -> PathBuf {
        let path = Path::new(&self.general.db_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docket").join("config.toml"))
    }
}
