//! Recipe files on disk

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::yaml::parse_recipe;
use crate::domain::{normalize, populate_anchors, AnchorTable, NormalizeOptions, RawDocument, ToolchainDocument};

/// A recipe file loaded into memory
#[derive(Debug, Clone)]
pub struct RecipeFile {
    path: PathBuf,
    source: String,
}

impl RecipeFile {
    /// Reads a recipe from disk
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read recipe: {}", path.display()))?;

        Ok(Self { path, source })
    }

    /// Wraps already-loaded source; `path` is only used in messages
    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parses the recipe without resolving it
    pub fn parse(&self) -> Result<RawDocument> {
        parse_recipe(&self.source)
            .with_context(|| format!("Failed to parse recipe: {}", self.path.display()))
    }

    /// Resolves the recipe's anchor table
    pub fn anchors(&self) -> Result<AnchorTable> {
        let raw = self.parse()?;
        populate_anchors(&raw.anchors)
            .with_context(|| format!("Failed to resolve anchors in {}", self.path.display()))
    }

    /// Resolves the recipe into its canonical record
    pub fn resolve(&self, options: &NormalizeOptions) -> Result<ToolchainDocument> {
        let raw = self.parse()?;
        normalize(&raw, options)
            .with_context(|| format!("Failed to resolve recipe: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResolveError;
    use tempfile::TempDir;

    const RECIPE: &str = r#"
_internal_variables_:
  - &version 2018a
name: foss
version: *version
homepage: https://example.com
description: test toolchain
toolchain: {name: dummy, version: dummy}
"#;

    #[test]
    fn open_and_resolve() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foss-2018a.yeb");
        fs::write(&path, RECIPE).unwrap();

        let recipe = RecipeFile::open(&path).unwrap();
        assert_eq!(recipe.path(), path);

        let doc = recipe.resolve(&NormalizeOptions::default()).unwrap();
        assert_eq!(doc.version, "2018a");
        assert_eq!(recipe.anchors().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_names_path() {
        let err = RecipeFile::open("/nonexistent/recipe.yeb").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/recipe.yeb"));
    }

    #[test]
    fn domain_error_is_kept_as_source() {
        let recipe = RecipeFile::from_source("bad.yeb", "name: foss\nversion: *nope\n");
        let err = recipe.resolve(&NormalizeOptions::default()).unwrap_err();

        assert!(format!("{:#}", err).contains("bad.yeb"));
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::UnresolvedReference { name, .. }) if name == "nope"
        ));
    }
}
