//! # Storage Layer
//!
//! Reading recipes and configuration from disk.
//!
//! ## Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Recipes | YAML with anchors and `!join` | any path (`*.yeb`) |
//! | Project config | TOML | `tcrecipe.toml` in the working tree |
//! | Global config | TOML | `~/.config/tcrecipe/config.toml` |
//!
//! ## Key Types
//!
//! - [`RecipeFile`] - A recipe loaded from disk
//! - [`parse_recipe`] - Recipe source to unresolved document
//! - [`Config`] - Project and global configuration

mod yaml;
mod recipe_file;
mod config;

pub use yaml::parse_recipe;
pub use recipe_file::RecipeFile;
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, ResolveConfig, PROJECT_CONFIG_FILE};
