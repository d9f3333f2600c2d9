//! Configuration handling for tcrecipe
//!
//! Configuration is read from `tcrecipe.toml` (project, found by walking up
//! from the current directory) and `~/.config/tcrecipe/config.toml`
//! (global). A project file replaces the global `[resolve]` section.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{NormalizeOptions, DEFAULT_MODULECLASS, INTERNAL_BLOCK, REQUIRED_FIELDS};

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = "tcrecipe.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings for recipe resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolveConfig {
    /// Top-level key holding internal variables
    pub internal_block: String,

    /// Module class for recipes that do not declare one
    pub default_moduleclass: String,

    /// Top-level fields a recipe must set (`name` and `version` always are)
    pub required_fields: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            internal_block: INTERNAL_BLOCK.to_string(),
            default_moduleclass: DEFAULT_MODULECLASS.to_string(),
            required_fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl ResolveConfig {
    /// Checks that every setting is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internal_block.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resolve.internal_block must not be empty".to_string(),
            ));
        }
        if self.default_moduleclass.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resolve.default_moduleclass must not be empty".to_string(),
            ));
        }
        if self.required_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "resolve.required_fields must not contain empty names".to_string(),
            ));
        }
        if self.required_fields.contains(&self.internal_block) {
            return Err(ConfigError::Invalid(format!(
                "resolve.required_fields cannot require the internal block '{}'",
                self.internal_block
            )));
        }
        Ok(())
    }

    /// Options handed to the normalizer
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            internal_block: self.internal_block.clone(),
            default_moduleclass: self.default_moduleclass.clone(),
            required_fields: self.required_fields.clone(),
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Resolution settings
    pub resolve: ResolveConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Resolution settings used outside a project
    pub resolve: ResolveConfig,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub project: Option<ProjectConfig>,

    /// File the project configuration came from
    pub project_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_file = Self::find_project_file();
        let project = match &project_file {
            Some(path) => Some(Self::load_project_config(path)?),
            None => None,
        };

        Ok(Self {
            global,
            project,
            project_file,
        })
    }

    /// Loads configuration with an explicit project file
    pub fn with_project_file(path: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(path)?;

        Ok(Self {
            global,
            project: Some(project),
            project_file: Some(path.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "tcrecipe", "tcrecipe").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Effective resolution settings
    pub fn resolve(&self) -> &ResolveConfig {
        self.project
            .as_ref()
            .map(|p| &p.resolve)
            .unwrap_or(&self.global.resolve)
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        let config: GlobalConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")?;
        config.resolve.validate()?;
        Ok(config)
    }

    /// Loads project configuration from a specific file
    fn load_project_config(config_path: &Path) -> Result<ProjectConfig> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;
        config.resolve.validate()?;
        Ok(config)
    }

    /// Finds `tcrecipe.toml` in the current directory or a parent
    pub fn find_project_file() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_file_from(&current)
    }

    /// Finds `tcrecipe.toml` in `start` or a parent
    pub fn find_project_file_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(PROJECT_CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
