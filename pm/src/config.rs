//! pipemigrate configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::translate::TranslateOptions;
use crate::workflow::{DEFAULT_NOTEBOOK_ROOT, DEFAULT_SECRET_SCOPE, PrepareOptions};

/// Project-local config file name
pub const CONFIG_FILE: &str = "pipemigrate.yml";

/// Main pipemigrate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Translation behavior
    pub translate: TranslateConfig,

    /// Workflow preparation and code generation
    pub prepare: PrepareConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./pipemigrate.yml
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/pipemigrate/pipemigrate.yml
        if let Some(user_config) = Self::user_config_path().filter(|p| p.exists()) {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed here; the full [`load`](Self::load) reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => std::iter::once(PathBuf::from(CONFIG_FILE))
                .chain(Self::user_config_path())
                .collect(),
        };
        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pipemigrate").join(CONFIG_FILE))
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            strict: self.translate.strict,
        }
    }

    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            files_to_delta_sinks: self.prepare.files_to_delta_sinks,
            secret_scope: self.prepare.secret_scope.clone(),
            notebook_root: self.prepare.notebook_root.clone(),
            templates_dir: self.prepare.expanded_templates_dir(),
        }
    }
}

/// Translation behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Fail on untranslatable activities instead of substituting placeholders
    pub strict: bool,
}

/// Workflow preparation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Force the declarative pipeline strategy on or off for every Copy activity
    #[serde(rename = "files-to-delta-sinks")]
    pub files_to_delta_sinks: Option<bool>,

    /// Secret scope generated scripts read credentials from
    #[serde(rename = "secret-scope")]
    pub secret_scope: String,

    /// Workspace folder for generated notebooks
    #[serde(rename = "notebook-root")]
    pub notebook_root: String,

    /// Directory of `.hbs` files overriding the embedded templates
    #[serde(rename = "templates-dir")]
    pub templates_dir: Option<String>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            files_to_delta_sinks: None,
            secret_scope: DEFAULT_SECRET_SCOPE.to_string(),
            notebook_root: DEFAULT_NOTEBOOK_ROOT.to_string(),
            templates_dir: None,
        }
    }
}

impl PrepareConfig {
    /// Templates directory with `~/` resolved
    pub fn expanded_templates_dir(&self) -> Option<PathBuf> {
        self.templates_dir.as_deref().map(|p| match p.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| PathBuf::from(p)),
            None => PathBuf::from(p),
        })
    }
}
