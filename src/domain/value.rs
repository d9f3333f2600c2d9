//! Expression and value trees
//!
//! [`Expr`] is what a recipe says: literals, anchor references, joins and
//! nested collections. [`Value`] is what it means once every reference and
//! join has been resolved.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// An unresolved recipe expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Null,
    Literal(String),
    /// Reference to a named anchor
    Ref(String),
    /// Parts concatenated without a separator
    Join(Vec<Expr>),
    Sequence(Vec<Expr>),
    /// Entries in source order
    Mapping(Vec<(String, Expr)>),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Ref(name.into())
    }

    /// Returns every anchor name referenced inside this expression, in order
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Null | Expr::Literal(_) => {}
            Expr::Ref(name) => names.push(name),
            Expr::Join(items) | Expr::Sequence(items) => {
                for item in items {
                    item.collect_references(names);
                }
            }
            Expr::Mapping(entries) => {
                for (_, item) in entries {
                    item.collect_references(names);
                }
            }
        }
    }

    /// Looks up a mapping entry by key
    pub fn get(&self, key: &str) -> Option<&Expr> {
        match self {
            Expr::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A fully resolved value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Scalar(String),
    Sequence(Vec<Value>),
    Mapping(Vec<(String, Value)>),
}

impl Value {
    pub fn scalar(value: impl Into<String>) -> Self {
        Value::Scalar(value.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a mapping entry by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's shape, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(_) => "scalar",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "~"),
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Mapping(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Scalar(s) => serializer.serialize_str(s),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(entries) => serialize_entries(entries, serializer),
        }
    }
}

/// Serializes ordered key/value pairs as a map, keeping their order
pub(crate) fn serialize_entries<S: Serializer>(
    entries: &[(String, Value)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_collected_in_order() {
        let expr = Expr::Mapping(vec![
            ("version".into(), Expr::reference("ver")),
            (
                "toolchain".into(),
                Expr::Sequence(vec![Expr::reference("comp_name"), Expr::literal("x")]),
            ),
            (
                "suffix".into(),
                Expr::Join(vec![Expr::literal("-"), Expr::reference("ver")]),
            ),
        ]);

        assert_eq!(expr.references(), vec!["ver", "comp_name", "ver"]);
    }

    #[test]
    fn display_is_flow_style() {
        let value = Value::Mapping(vec![
            ("name".into(), Value::scalar("GCC")),
            (
                "pair".into(),
                Value::Sequence(vec![Value::scalar("a"), Value::Null]),
            ),
        ]);
        assert_eq!(value.to_string(), "{name: GCC, pair: [a, ~]}");
    }

    #[test]
    fn serializes_mapping_as_ordered_object() {
        let value = Value::Mapping(vec![
            ("z".into(), Value::scalar("1")),
            ("a".into(), Value::Sequence(vec![Value::scalar("x")])),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"z":"1","a":["x"]}"#);
    }

    #[test]
    fn accessors() {
        let value = Value::Sequence(vec![Value::scalar("GCC"), Value::scalar("6.4.0")]);
        assert_eq!(value.as_sequence().map(|s| s.len()), Some(2));
        assert_eq!(value.as_scalar(), None);
        assert_eq!(value.kind(), "sequence");
        assert!(Value::Null.is_null());
    }
}
