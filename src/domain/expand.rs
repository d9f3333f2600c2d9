//! Template expansion
//!
//! Resolves literals, anchor references and join expressions against an
//! [`AnchorTable`]. Expansion never writes to the table.

use super::anchors::AnchorTable;
use super::error::ResolveError;
use super::value::{Expr, Value};

/// Path reported for expressions expanded outside any document field
const ROOT_PATH: &str = "$";

/// Expands expressions against a populated anchor table
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    anchors: &'a AnchorTable,
}

impl<'a> Expander<'a> {
    pub fn new(anchors: &'a AnchorTable) -> Self {
        Self { anchors }
    }

    /// Expands an expression to its resolved value
    pub fn expand(&self, expr: &Expr) -> Result<Value, ResolveError> {
        self.expand_at(expr, ROOT_PATH)
    }

    /// Expands an expression that must produce a single string
    pub fn expand_scalar(&self, expr: &Expr) -> Result<String, ResolveError> {
        self.expand_scalar_at(expr, ROOT_PATH)
    }

    /// Expands an expression, reporting errors against `path`
    pub fn expand_at(&self, expr: &Expr, path: &str) -> Result<Value, ResolveError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Literal(s) => Ok(Value::Scalar(s.clone())),
            Expr::Ref(name) => self.anchors.resolve(name).cloned().map_err(|_| {
                ResolveError::UnresolvedReference {
                    name: name.clone(),
                    path: path.to_string(),
                }
            }),
            Expr::Join(parts) => self.join(parts, path).map(Value::Scalar),
            Expr::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.expand_at(item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Expr::Mapping(entries) => entries
                .iter()
                .map(|(key, item)| {
                    self.expand_at(item, &child_path(path, key))
                        .map(|value| (key.clone(), value))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Mapping),
        }
    }

    /// Expands an expression that must produce a single string, reporting
    /// errors against `path`
    pub fn expand_scalar_at(&self, expr: &Expr, path: &str) -> Result<String, ResolveError> {
        match self.expand_at(expr, path)? {
            Value::Scalar(s) => Ok(s),
            other => Err(ResolveError::schema(
                path,
                format!("expected a scalar, found a {}", other.kind()),
            )),
        }
    }

    fn join(&self, parts: &[Expr], path: &str) -> Result<String, ResolveError> {
        let mut joined = String::new();

        for (i, part) in parts.iter().enumerate() {
            let part_path = format!("{}[{}]", path, i);
            match self.expand_at(part, &part_path)? {
                Value::Scalar(s) => joined.push_str(&s),
                // An empty suffix anchor written as `~` contributes nothing
                Value::Null => {}
                other => {
                    return Err(ResolveError::schema(
                        part_path,
                        format!("join parts must be scalars, found a {}", other.kind()),
                    ))
                }
            }
        }

        Ok(joined)
    }
}

/// Path of `key` inside the mapping at `parent`
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() || parent == ROOT_PATH {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}
