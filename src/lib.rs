//! tcrecipe - resolve anchored toolchain build recipes
//!
//! Recipes for scientific software stacks declare values once with YAML
//! anchors and reuse them through aliases and `!join` templates. This crate
//! resolves those references and produces a canonical
//! [`ToolchainDocument`] for a build orchestrator to consume.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Dependency, ResolveError, Toolchain, ToolchainDocument};
pub use storage::{parse_recipe, RecipeFile};

/// Parses and resolves recipe source with default options
pub fn resolve_str(source: &str) -> Result<ToolchainDocument, ResolveError> {
    let raw = parse_recipe(source)?;
    domain::normalize(&raw, &domain::NormalizeOptions::default())
}
