//! Document normalization
//!
//! Runs the resolution pass over a parsed recipe:
//! populate anchors -> expand every field -> emit a [`ToolchainDocument`].

use std::collections::HashMap;

use super::anchors::AnchorTable;
use super::error::ResolveError;
use super::expand::Expander;
use super::graph::{AnchorDefinition, AnchorGraph};
use super::recipe::{non_empty, optional_scalar, Dependency, Toolchain, ToolchainDocument};
use super::value::{Expr, Value};

/// Default key of the internal variables block
pub const INTERNAL_BLOCK: &str = "_internal_variables_";

/// Module class used when a recipe does not declare one
pub const DEFAULT_MODULECLASS: &str = "base";

/// Top-level fields every recipe must set by default
pub const REQUIRED_FIELDS: [&str; 5] = ["name", "version", "homepage", "description", "toolchain"];

/// A parsed but unresolved recipe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    /// Anchor definitions, innermost first, in document order
    pub anchors: Vec<AnchorDefinition>,

    /// Top-level entries in document order
    pub body: Vec<(String, Expr)>,
}

impl RawDocument {
    /// Looks up a top-level entry
    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.body.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Knobs for normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Top-level key holding internal variables; dropped from the output
    pub internal_block: String,

    /// Module class used when the recipe has none
    pub default_moduleclass: String,

    /// Top-level fields that must be present and non-null. `name` and
    /// `version` are required whether listed or not.
    pub required_fields: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            internal_block: INTERNAL_BLOCK.to_string(),
            default_moduleclass: DEFAULT_MODULECLASS.to_string(),
            required_fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Resolves every anchor definition into a table
///
/// Anchors are resolved in reference order; the returned table lists them
/// in definition order.
pub fn populate_anchors(definitions: &[AnchorDefinition]) -> Result<AnchorTable, ResolveError> {
    let graph = AnchorGraph::from_definitions(definitions)?;
    let order = graph.resolution_order()?;

    let exprs: HashMap<&str, &Expr> = definitions
        .iter()
        .map(|def| (def.name.as_str(), &def.expr))
        .collect();

    let mut resolved = AnchorTable::new();
    for name in &order {
        let expr = exprs
            .get(name.as_str())
            .ok_or_else(|| ResolveError::UnknownAnchor(name.clone()))?;
        let value = Expander::new(&resolved).expand_at(expr, &format!("&{}", name))?;
        resolved.define(name.clone(), value)?;
    }

    let mut table = AnchorTable::new();
    for def in definitions {
        let value = resolved.resolve(&def.name)?.clone();
        table.define(def.name.clone(), value)?;
    }

    tracing::debug!(anchors = table.len(), "populated anchor table");
    Ok(table)
}

/// Resolves a raw recipe into its canonical record
pub fn normalize(raw: &RawDocument, options: &NormalizeOptions) -> Result<ToolchainDocument, ResolveError> {
    let anchors = populate_anchors(&raw.anchors)?;
    Normalizer::new(&anchors, options).normalize(&raw.body)
}

/// Walks the top-level entries of a recipe with a populated anchor table
pub struct Normalizer<'a> {
    expander: Expander<'a>,
    options: &'a NormalizeOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(anchors: &'a AnchorTable, options: &'a NormalizeOptions) -> Self {
        Self {
            expander: Expander::new(anchors),
            options,
        }
    }

    pub fn normalize(&self, body: &[(String, Expr)]) -> Result<ToolchainDocument, ResolveError> {
        let mut easyblock = None;
        let mut name = None;
        let mut versionprefix = None;
        let mut version = None;
        let mut versionsuffix = None;
        let mut homepage = None;
        let mut description = None;
        let mut toolchain = None;
        let mut moduleclass = None;
        let mut dependencies = Vec::new();
        let mut builddependencies = Vec::new();
        let mut parameters = Vec::new();
        let mut present = Vec::new();

        for (key, expr) in body {
            if *key == self.options.internal_block {
                continue;
            }

            let value = self.expander.expand_at(expr, key)?;
            if !value.is_null() {
                present.push(key.as_str());
            }
            match key.as_str() {
                "easyblock" => easyblock = optional_scalar(Some(&value), key)?,
                "name" => name = optional_scalar(Some(&value), key)?,
                "versionprefix" => versionprefix = optional_scalar(Some(&value), key)?.and_then(non_empty),
                "version" => version = optional_scalar(Some(&value), key)?,
                "versionsuffix" => versionsuffix = optional_scalar(Some(&value), key)?.and_then(non_empty),
                "homepage" => homepage = optional_scalar(Some(&value), key)?,
                "description" => description = optional_scalar(Some(&value), key)?,
                "moduleclass" => moduleclass = optional_scalar(Some(&value), key)?,
                "toolchain" if value.is_null() => toolchain = None,
                "toolchain" => toolchain = Some(Toolchain::from_value(&value, key)?),
                "dependencies" => dependencies = dependency_list(&value, key)?,
                "builddependencies" => builddependencies = dependency_list(&value, key)?,
                _ => parameters.push((key.clone(), value)),
            }
        }

        let name = non_blank(name, "name")?;
        let version = non_blank(version, "version")?;
        if let Some(field) = self
            .options
            .required_fields
            .iter()
            .find(|field| !present.contains(&field.as_str()))
        {
            return Err(ResolveError::missing(field.as_str()));
        }

        tracing::debug!(
            name = %name,
            version = %version,
            dependencies = dependencies.len(),
            "normalized recipe"
        );

        Ok(ToolchainDocument {
            easyblock,
            name,
            versionprefix,
            version,
            versionsuffix,
            homepage,
            description,
            toolchain: toolchain.unwrap_or_else(Toolchain::system),
            dependencies,
            builddependencies,
            moduleclass: moduleclass.unwrap_or_else(|| self.options.default_moduleclass.clone()),
            parameters,
        })
    }
}

/// Reads an ordered dependency list; order is kept exactly as written
fn dependency_list(value: &Value, path: &str) -> Result<Vec<Dependency>, ResolveError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Dependency::from_value(item, &format!("{}[{}]", path, i)))
            .collect(),
        other => Err(ResolveError::schema(
            path,
            format!("expected a sequence of dependencies, found a {}", other.kind()),
        )),
    }
}

fn non_blank(value: Option<String>, path: &str) -> Result<String, ResolveError> {
    match value {
        None => Err(ResolveError::missing(path)),
        Some(s) if s.trim().is_empty() => Err(ResolveError::schema(path, "must not be empty")),
        Some(s) => Ok(s),
    }
}
