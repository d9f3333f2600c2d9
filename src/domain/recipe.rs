//! Normalized recipe records
//!
//! These are the records handed to a build orchestrator: a toolchain
//! document with its ordered dependency lists. They are built from resolved
//! [`Value`]s and never change afterwards.

use serde::Serialize;
use std::fmt;

use super::error::ResolveError;
use super::expand::child_path;
use super::value::{serialize_entries, Value};

/// Toolchain names that mean "build with the system compiler"
const SYSTEM_TOOLCHAINS: [&str; 2] = ["dummy", "system"];

/// Field names of the explicit dependency form; never a dependency name
const DEPENDENCY_FIELDS: [&str; 4] = ["name", "version", "versionsuffix", "toolchain"];

/// A named compiler toolchain that software is built against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    pub name: String,
    pub version: String,
}

impl Toolchain {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// The system toolchain, used when a recipe names none
    pub fn system() -> Self {
        Self::new("system", "system")
    }

    /// Returns true for the system (`dummy`) toolchain
    pub fn is_system(&self) -> bool {
        SYSTEM_TOOLCHAINS
            .iter()
            .any(|name| self.name.eq_ignore_ascii_case(name))
    }

    /// Reads a toolchain from a `{name, version}` mapping or a
    /// `[name, version]` pair
    pub fn from_value(value: &Value, path: &str) -> Result<Self, ResolveError> {
        match value {
            Value::Mapping(_) => {
                let name = required_scalar(value.get("name"), &child_path(path, "name"))?;
                let version = required_scalar(value.get("version"), &child_path(path, "version"))?;
                Ok(Self { name, version })
            }
            Value::Sequence(items) if items.len() == 2 => {
                let name = required_scalar(items.first(), &format!("{}[0]", path))?;
                let version = required_scalar(items.get(1), &format!("{}[1]", path))?;
                Ok(Self { name, version })
            }
            Value::Sequence(items) => Err(ResolveError::schema(
                path,
                format!(
                    "toolchain must be a (name, version) pair, found {} elements",
                    items.len()
                ),
            )),
            Value::Null => Err(ResolveError::missing(path)),
            Value::Scalar(s) => Err(ResolveError::schema(
                path,
                format!("toolchain must be a (name, version) pair, found scalar '{}'", s),
            )),
        }
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// A required software component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub versionsuffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<Toolchain>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            versionsuffix: None,
            toolchain: None,
        }
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn with_versionsuffix(mut self, suffix: impl Into<String>) -> Self {
        self.versionsuffix = non_empty(suffix.into());
        self
    }

    /// Version including toolchain and suffix, e.g. `2.1.2-GCC-6.4.0-2.28`
    pub fn full_version(&self) -> String {
        full_version(
            &self.version,
            self.versionsuffix.as_deref(),
            self.toolchain.as_ref(),
        )
    }

    /// Reads one dependency entry
    ///
    /// Accepted shapes:
    /// - `Name: {version, versionsuffix, toolchain}` (or `Name: version`)
    /// - `{name, version, versionsuffix, toolchain}`
    /// - `[name, version, versionsuffix, toolchain]`
    pub fn from_value(value: &Value, path: &str) -> Result<Self, ResolveError> {
        match value {
            Value::Mapping(entries)
                if entries.len() == 1 && !DEPENDENCY_FIELDS.contains(&entries[0].0.as_str()) =>
            {
                let (name, spec) = &entries[0];
                let spec_path = child_path(path, name);
                match spec {
                    Value::Mapping(_) => Self::from_fields(name.clone(), spec, &spec_path),
                    Value::Scalar(version) => Self::build(name.clone(), version.clone(), None, None, &spec_path),
                    Value::Null => Err(ResolveError::missing(child_path(&spec_path, "version"))),
                    Value::Sequence(_) => Err(ResolveError::schema(
                        spec_path,
                        "expected a mapping of dependency fields, found a sequence",
                    )),
                }
            }
            Value::Mapping(_) => {
                let name = required_scalar(value.get("name"), &child_path(path, "name"))?;
                Self::from_fields(name, value, path)
            }
            Value::Sequence(items) => Self::from_tuple(items, path),
            other => Err(ResolveError::schema(
                path,
                format!("expected a dependency record, found a {}", other.kind()),
            )),
        }
    }

    fn from_fields(name: String, fields: &Value, path: &str) -> Result<Self, ResolveError> {
        if let Value::Mapping(entries) = fields {
            for (key, _) in entries {
                if !DEPENDENCY_FIELDS.contains(&key.as_str()) {
                    tracing::warn!(path = %child_path(path, key), "ignoring unknown dependency field");
                }
            }
        }

        let version = required_scalar(fields.get("version"), &child_path(path, "version"))?;
        let versionsuffix = optional_scalar(fields.get("versionsuffix"), &child_path(path, "versionsuffix"))?;
        let toolchain = match fields.get("toolchain") {
            None | Some(Value::Null) => None,
            Some(tc) => Some(Toolchain::from_value(tc, &child_path(path, "toolchain"))?),
        };

        Self::build(name, version, versionsuffix, toolchain, path)
    }

    fn from_tuple(items: &[Value], path: &str) -> Result<Self, ResolveError> {
        if !(2..=4).contains(&items.len()) {
            return Err(ResolveError::schema(
                path,
                format!(
                    "dependency tuple must be (name, version[, versionsuffix[, toolchain]]), found {} elements",
                    items.len()
                ),
            ));
        }

        let name = required_scalar(items.first(), &format!("{}[0]", path))?;
        let version = required_scalar(items.get(1), &format!("{}[1]", path))?;
        let versionsuffix = optional_scalar(items.get(2), &format!("{}[2]", path))?;
        let toolchain = match items.get(3) {
            None | Some(Value::Null) => None,
            Some(tc) => Some(Toolchain::from_value(tc, &format!("{}[3]", path))?),
        };

        Self::build(name, version, versionsuffix, toolchain, path)
    }

    fn build(
        name: String,
        version: String,
        versionsuffix: Option<String>,
        toolchain: Option<Toolchain>,
        path: &str,
    ) -> Result<Self, ResolveError> {
        if name.trim().is_empty() {
            return Err(ResolveError::schema(path, "dependency name must not be empty"));
        }
        if version.trim().is_empty() {
            return Err(ResolveError::schema(
                child_path(path, "version"),
                "dependency version must not be empty",
            ));
        }

        Ok(Self {
            name,
            version,
            versionsuffix: versionsuffix.and_then(non_empty),
            toolchain,
        })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.full_version())
    }
}

/// The canonical form of a toolchain recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easyblock: Option<String>,
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub versionprefix: Option<String>,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub versionsuffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub toolchain: Toolchain,

    /// Runtime dependencies in recipe order
    pub dependencies: Vec<Dependency>,

    /// Build-only dependencies in recipe order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub builddependencies: Vec<Dependency>,

    pub moduleclass: String,

    /// Every other top-level parameter, resolved, in recipe order
    #[serde(
        serialize_with = "serialize_entries",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub parameters: Vec<(String, Value)>,
}

impl ToolchainDocument {
    /// Version including prefix, toolchain and suffix, e.g.
    /// `2018a-Python-3.6.4` for a system toolchain
    pub fn full_version(&self) -> String {
        let full = full_version(&self.version, self.versionsuffix.as_deref(), Some(&self.toolchain));
        match &self.versionprefix {
            Some(prefix) => format!("{}{}", prefix, full),
            None => full,
        }
    }

    /// Package name, `{name}-{full_version}`
    pub fn package_name(&self) -> String {
        format!("{}-{}", self.name, self.full_version())
    }

    /// Looks up a parameter that has no dedicated field
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Version string including the toolchain (unless it is the system
/// toolchain) and the version suffix
pub fn full_version(version: &str, versionsuffix: Option<&str>, toolchain: Option<&Toolchain>) -> String {
    let mut full = version.to_string();

    if let Some(tc) = toolchain.filter(|tc| !tc.is_system()) {
        full.push('-');
        full.push_str(&tc.name);
        full.push('-');
        full.push_str(&tc.version);
    }

    if let Some(suffix) = versionsuffix {
        full.push_str(suffix);
    }

    full
}

/// Reads a scalar that must be present and non-null
pub(crate) fn required_scalar(value: Option<&Value>, path: &str) -> Result<String, ResolveError> {
    match value {
        None | Some(Value::Null) => Err(ResolveError::missing(path)),
        Some(Value::Scalar(s)) => Ok(s.clone()),
        Some(other) => Err(ResolveError::schema(
            path,
            format!("expected a scalar, found a {}", other.kind()),
        )),
    }
}

/// Reads a scalar that may be absent or null
pub(crate) fn optional_scalar(value: Option<&Value>, path: &str) -> Result<Option<String>, ResolveError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_scalar(value, path).map(Some),
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
