//! YAML recipe reader
//!
//! `serde_yaml` expands aliases while parsing and forgets anchor names, but
//! resolution needs the names. Before parsing, anchor markers are rewritten
//! into tags that survive as [`serde_yaml::value::TaggedValue`]s:
//!
//! | Source | Rewritten |
//! |--------|-----------|
//! | `&name value` | `!def:name value` |
//! | `&name !join [..]` | `!def:name:join [..]` |
//! | `*name` | `!ref "name"` |
//!
//! Rewriting never adds or removes lines, so line numbers in YAML errors
//! still point at the original source.

use serde_yaml::value::TaggedValue;
use serde_yaml::Value as YamlValue;

use crate::domain::{AnchorDefinition, Expr, RawDocument, ResolveError};

const DEF_TAG: &str = "def:";
const REF_TAG: &str = "ref";
const JOIN_TAG: &str = "join";

/// Parses recipe source into its unresolved form
pub fn parse_recipe(source: &str) -> Result<RawDocument, ResolveError> {
    if is_blank(source) {
        return Err(ResolveError::schema("$", "recipe is empty"));
    }

    let rewritten = rewrite_anchors(source)?;
    let yaml: YamlValue =
        serde_yaml::from_str(&rewritten).map_err(|e| ResolveError::Yaml(e.to_string()))?;

    let root = match yaml {
        YamlValue::Mapping(root) => root,
        YamlValue::Null => return Err(ResolveError::schema("$", "recipe is empty")),
        other => {
            return Err(ResolveError::schema(
                "$",
                format!("recipe must be a mapping, found {}", describe(&other)),
            ))
        }
    };

    let mut reader = TreeReader::default();
    let mut body = Vec::with_capacity(root.len());
    for (key, value) in &root {
        let key = key_text(key)?;
        let expr = reader.read(value)?;
        body.push((key, expr));
    }

    tracing::debug!(
        anchors = reader.definitions.len(),
        fields = body.len(),
        "parsed recipe"
    );

    Ok(RawDocument {
        anchors: reader.definitions,
        body,
    })
}

/// Converts the tagged YAML tree into expressions, collecting anchors
#[derive(Default)]
struct TreeReader {
    definitions: Vec<AnchorDefinition>,
}

impl TreeReader {
    fn read(&mut self, value: &YamlValue) -> Result<Expr, ResolveError> {
        match value {
            YamlValue::Null => Ok(Expr::Null),
            YamlValue::Bool(b) => Ok(Expr::Literal(b.to_string())),
            YamlValue::Number(n) => Ok(Expr::Literal(n.to_string())),
            YamlValue::String(s) => Ok(Expr::Literal(s.clone())),
            YamlValue::Sequence(items) => items
                .iter()
                .map(|item| self.read(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Expr::Sequence),
            YamlValue::Mapping(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, item) in map {
                    entries.push((key_text(key)?, self.read(item)?));
                }
                Ok(Expr::Mapping(entries))
            }
            YamlValue::Tagged(tagged) => self.read_tagged(tagged),
        }
    }

    fn read_tagged(&mut self, tagged: &TaggedValue) -> Result<Expr, ResolveError> {
        let tag = tagged.tag.to_string();
        let tag = tag.trim_start_matches('!');

        if tag == REF_TAG {
            let name = key_text(&tagged.value)?;
            return Ok(Expr::Ref(name));
        }

        if tag == JOIN_TAG {
            return self.read_join(&tagged.value);
        }

        if let Some(rest) = tag.strip_prefix(DEF_TAG) {
            let (name, inner) = match rest.split_once(':') {
                Some((name, inner)) => (name, Some(inner)),
                None => (rest, None),
            };

            // Nested anchors are pushed before the node that contains them
            let expr = match inner {
                None => self.read(&tagged.value)?,
                Some(JOIN_TAG) => self.read_join(&tagged.value)?,
                Some(other) => return Err(unsupported_tag(other)),
            };
            self.definitions.push(AnchorDefinition::new(name, expr));

            return Ok(Expr::Ref(name.to_string()));
        }

        Err(unsupported_tag(tag))
    }

    fn read_join(&mut self, value: &YamlValue) -> Result<Expr, ResolveError> {
        match value {
            YamlValue::Sequence(items) => items
                .iter()
                .map(|item| self.read(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Expr::Join),
            other => Err(ResolveError::schema(
                "!join",
                format!("expected a sequence of parts, found {}", describe(other)),
            )),
        }
    }
}

/// True when the source holds nothing but comments and document markers
fn is_blank(source: &str) -> bool {
    source.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

fn unsupported_tag(tag: &str) -> ResolveError {
    ResolveError::schema(format!("!{}", tag), "unsupported tag (only !join is recognized)")
}

/// Text of a mapping key or reference name
fn key_text(value: &YamlValue) -> Result<String, ResolveError> {
    match value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        other => Err(ResolveError::schema(
            "$",
            format!("keys must be scalars, found {}", describe(other)),
        )),
    }
}

fn describe(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) | YamlValue::Number(_) | YamlValue::String(_) => "a scalar",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

/// Rewrites anchor and alias markers into tags
pub(crate) fn rewrite_anchors(source: &str) -> Result<String, ResolveError> {
    let mut lexer = Lexer {
        out: String::with_capacity(source.len() + 64),
        ..Lexer::default()
    };

    for (idx, line) in source.split_inclusive('\n').enumerate() {
        lexer.line(line, idx + 1)?;
    }

    Ok(lexer.out)
}

#[derive(Default)]
struct Lexer {
    out: String,

    /// Indentation of the line that opened a block scalar (`|` or `>`)
    block_scalar_parent: Option<usize>,

    /// Quote character of a quoted scalar continuing on the next line
    open_quote: Option<char>,

    /// Indentation of the line that started a plain scalar which may
    /// continue on more-indented lines
    plain_scalar_parent: Option<usize>,

    /// Nesting depth of `[` / `{`
    flow_depth: usize,
}

impl Lexer {
    fn line(&mut self, line: &str, line_no: usize) -> Result<(), ResolveError> {
        let indent = line.len() - line.trim_start_matches(' ').len();

        if let Some(parent) = self.block_scalar_parent {
            if line.trim().is_empty() || indent > parent {
                self.out.push_str(line);
                return Ok(());
            }
            self.block_scalar_parent = None;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        // True wherever a new node may begin, and so where `&`, `*` and `!`
        // are indicators rather than text
        let mut node_start = true;
        // True while inside plain scalar text
        let mut in_plain = false;
        let mut plain_parent = None;

        if let Some(parent) = self.plain_scalar_parent.take() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.plain_scalar_parent = Some(parent);
                self.out.push_str(line);
                return Ok(());
            }
            if indent > parent && !trimmed.starts_with('#') {
                node_start = false;
                in_plain = true;
                plain_parent = Some(parent);
            }
        }

        if let Some(quote) = self.open_quote {
            i = self.copy_quoted(&chars, 0, quote);
            node_start = false;
        }

        while i < chars.len() {
            let c = chars[i];
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let next_is_break = next.map_or(true, char::is_whitespace);

            match c {
                _ if c.is_whitespace() => {
                    self.out.push(c);
                    i += 1;
                }
                '#' if prev.map_or(true, char::is_whitespace) => {
                    self.out.extend(&chars[i..]);
                    in_plain = false;
                    break;
                }
                '&' | '!' if node_start => {
                    i = self.properties(&chars, i, line_no)?;
                }
                '*' if node_start => {
                    let (name, end) = read_name(&chars, i + 1);
                    check_name(&name, line_no)?;
                    // Quoted so YAML keeps names like `null` or `1.10` as text
                    self.out.push('!');
                    self.out.push_str(REF_TAG);
                    self.out.push_str(" \"");
                    self.out.push_str(&name);
                    self.out.push('"');
                    i = end;
                    node_start = false;
                }
                '"' | '\'' if node_start => {
                    self.out.push(c);
                    i = self.copy_quoted(&chars, i + 1, c);
                    node_start = false;
                }
                '|' | '>' if node_start && self.flow_depth == 0 => {
                    self.block_scalar_parent = Some(indent);
                    self.out.extend(&chars[i..]);
                    break;
                }
                '[' | '{' if node_start => {
                    self.flow_depth += 1;
                    self.out.push(c);
                    i += 1;
                }
                ']' | '}' if self.flow_depth > 0 => {
                    self.flow_depth -= 1;
                    self.out.push(c);
                    i += 1;
                    node_start = false;
                    in_plain = false;
                }
                ',' if self.flow_depth > 0 => {
                    self.out.push(c);
                    i += 1;
                    node_start = true;
                    in_plain = false;
                }
                '-' | '?' if node_start && next_is_break => {
                    self.out.push(c);
                    i += 1;
                }
                ':' if next_is_break
                    || (self.flow_depth > 0 && next.is_some_and(|n| ",[]{}".contains(n))) =>
                {
                    self.out.push(c);
                    i += 1;
                    node_start = true;
                    in_plain = false;
                }
                _ => {
                    self.out.push(c);
                    i += 1;
                    node_start = false;
                    in_plain = true;
                }
            }
        }

        if in_plain && self.flow_depth == 0 && self.open_quote.is_none() {
            self.plain_scalar_parent = Some(plain_parent.unwrap_or(indent));
        }

        Ok(())
    }

    /// Rewrites a run of node properties (anchor and/or tag) starting at `i`
    fn properties(&mut self, chars: &[char], mut i: usize, line_no: usize) -> Result<usize, ResolveError> {
        let mut anchor: Option<String> = None;
        let mut tag: Option<String> = None;

        loop {
            match chars.get(i) {
                Some('&') => {
                    let (name, end) = read_name(chars, i + 1);
                    check_name(&name, line_no)?;
                    if anchor.replace(name).is_some() {
                        return Err(syntax(line_no, "a node may carry only one anchor"));
                    }
                    i = end;
                }
                Some('!') => {
                    let (text, end) = read_name(chars, i);
                    if tag.replace(text).is_some() {
                        return Err(syntax(line_no, "a node may carry only one tag"));
                    }
                    i = end;
                }
                _ => break,
            }

            let mut j = i;
            while chars.get(j).is_some_and(|c| *c == ' ' || *c == '\t') {
                j += 1;
            }
            if matches!(chars.get(j), Some('&') | Some('!')) {
                i = j;
            } else {
                break;
            }
        }

        match (anchor, tag) {
            (Some(name), None) => {
                self.out.push('!');
                self.out.push_str(DEF_TAG);
                self.out.push_str(&name);
            }
            (Some(name), Some(tag)) => {
                let local = tag
                    .strip_prefix('!')
                    .filter(|t| !t.is_empty() && !t.starts_with('!') && !t.starts_with('<'))
                    .ok_or_else(|| {
                        syntax(line_no, format!("anchored node has unsupported tag '{}'", tag))
                    })?;
                self.out.push('!');
                self.out.push_str(DEF_TAG);
                self.out.push_str(&name);
                self.out.push(':');
                self.out.push_str(local);
            }
            (None, Some(tag)) => self.out.push_str(&tag),
            (None, None) => {}
        }

        Ok(i)
    }

    /// Copies a quoted scalar body from `start`; returns the index after the
    /// closing quote, or the line length if the scalar continues
    fn copy_quoted(&mut self, chars: &[char], start: usize, quote: char) -> usize {
        let mut i = start;

        while i < chars.len() {
            let c = chars[i];
            self.out.push(c);
            i += 1;

            if quote == '"' && c == '\\' {
                if let Some(&escaped) = chars.get(i) {
                    self.out.push(escaped);
                    i += 1;
                }
                continue;
            }

            if c == quote {
                // '' is an escaped quote inside single-quoted scalars
                if quote == '\'' && chars.get(i) == Some(&'\'') {
                    self.out.push('\'');
                    i += 1;
                    continue;
                }
                self.open_quote = None;
                return i;
            }
        }

        self.open_quote = Some(quote);
        i
    }
}

/// Reads an anchor name, alias name or tag starting at `start`
fn read_name(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && !chars[end].is_whitespace() && !",[]{}".contains(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn check_name(name: &str, line_no: usize) -> Result<(), ResolveError> {
    if name.is_empty() {
        return Err(syntax(line_no, "anchor name is empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(syntax(line_no, format!("invalid anchor name '{}'", name)));
    }
    Ok(())
}

fn syntax(line: usize, message: impl Into<String>) -> ResolveError {
    ResolveError::Syntax {
        line,
        message: message.into(),
    }
}
