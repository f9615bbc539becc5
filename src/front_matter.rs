//! Front matter: the `---` fenced YAML block at the top of a document.
//!
//! The block is modelled as an ordered map from key to [`MetaValue`], so
//! rewriting a document keeps its keys in their original order. Everything
//! after the closing fence is the body and is carried through untouched.
//!
//! ```text
//! ---
//! title: Launch Day
//! tags: [news]
//! ---
//! Body text, never modified.
//! ```
//!
//! Jekyll reads front matter as YAML 1.1, where unquoted `yes`, `no`, `on`
//! and `off` are booleans. The YAML parser used here follows 1.2, so
//! top-level plain scalars of that form are resolved to booleans on read,
//! and strings of that form are always written single-quoted.

use indexmap::IndexMap;
use regex::Regex;
use serde::ser::{Serialize, Serializer};
use serde_yaml::Value;
use std::sync::LazyLock;

/// Fence line that opens and closes the block.
pub const FENCE: &str = "---";

/// Strings a YAML 1.1 reader resolves to a bool or null when unquoted.
static YAML11_RESERVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:y|n|yes|no|true|false|on|off|null|~)$").unwrap());

/// YAML 1.1 boolean value of a plain scalar, as Jekyll reads it.
fn yaml11_bool(scalar: &str) -> Option<bool> {
    match scalar.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" => Some(true),
        "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// A front-matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
    Sequence(Vec<MetaValue>),
    Mapping(FrontMatter),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a parsed YAML value. Tags are dropped and keep their inner value.
    fn from_yaml(value: Value) -> Self {
        match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(b),
            Value::Number(n) => MetaValue::Number(n),
            Value::String(s) => MetaValue::String(s),
            Value::Sequence(items) => {
                MetaValue::Sequence(items.into_iter().map(MetaValue::from_yaml).collect())
            }
            Value::Mapping(map) => MetaValue::Mapping(FrontMatter::from_mapping(map)),
            Value::Tagged(tagged) => MetaValue::from_yaml(tagged.value),
        }
    }

    fn mask_reserved(&self, marker: &str, reserved: &mut Vec<String>) -> MetaValue {
        match self {
            MetaValue::String(s) => MetaValue::String(mask_reserved_str(s, marker, reserved)),
            MetaValue::Sequence(items) => MetaValue::Sequence(
                items
                    .iter()
                    .map(|item| item.mask_reserved(marker, reserved))
                    .collect(),
            ),
            MetaValue::Mapping(map) => MetaValue::Mapping(map.mask_reserved(marker, reserved)),
            other => other.clone(),
        }
    }
}

/// Swap a reserved string for a numbered placeholder built from `marker`.
fn mask_reserved_str(s: &str, marker: &str, reserved: &mut Vec<String>) -> String {
    if !YAML11_RESERVED.is_match(s) {
        return s.to_string();
    }
    reserved.push(s.to_string());
    placeholder(marker, reserved.len() - 1)
}

fn placeholder(marker: &str, index: usize) -> String {
    format!("{}{}{}", marker, index, marker)
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::String(s)
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaValue::Null => serializer.serialize_unit(),
            MetaValue::Bool(b) => serializer.serialize_bool(*b),
            MetaValue::Number(n) => n.serialize(serializer),
            MetaValue::String(s) => serializer.serialize_str(s),
            MetaValue::Sequence(items) => serializer.collect_seq(items),
            MetaValue::Mapping(map) => map.serialize(serializer),
        }
    }
}

/// Ordered key/value block. Insertion order is the serialization order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    entries: IndexMap<String, MetaValue>,
}

impl FrontMatter {
    /// Parse YAML into a front-matter block.
    ///
    /// Returns `Ok(None)` when the YAML is empty or is not a non-empty mapping.
    pub fn from_yaml(yaml: &str) -> Result<Option<Self>, serde_yaml::Error> {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(map) if !map.is_empty() => {
                let mut fm = Self::from_mapping(map);
                fm.resolve_plain_booleans(yaml);
                Ok(Some(fm))
            }
            _ => Ok(None),
        }
    }

    /// Turn top-level `key: yes` style entries, which the parser hands back
    /// as strings, into the booleans Jekyll sees. Quoted values stay strings.
    fn resolve_plain_booleans(&mut self, yaml: &str) {
        for (key, value) in self.entries.iter_mut() {
            let MetaValue::String(s) = value else {
                continue;
            };
            let Some(b) = yaml11_bool(s) else {
                continue;
            };
            let plain_line = format!(
                r"(?m)^{}[ \t]*:[ \t]+{}[ \t]*(?:#.*)?\r?$",
                regex::escape(key),
                regex::escape(s)
            );
            if Regex::new(&plain_line).is_ok_and(|re| re.is_match(yaml)) {
                *value = MetaValue::Bool(b);
            }
        }
    }

    fn from_mapping(map: serde_yaml::Mapping) -> Self {
        let entries = map
            .into_iter()
            .map(|(k, v)| (key_to_string(k), MetaValue::from_yaml(v)))
            .collect();
        Self { entries }
    }

    /// Serialize as block YAML. Strings in [`YAML11_RESERVED`] are written
    /// single-quoted so Jekyll keeps reading them as strings.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let plain = serde_yaml::to_string(self)?;

        // The marker must not occur anywhere in the real content.
        let mut marker = String::from("__quoted_");
        while plain.contains(&marker) {
            marker.push('_');
        }
        let mut reserved = Vec::new();
        let masked = self.mask_reserved(&marker, &mut reserved);
        if reserved.is_empty() {
            return Ok(plain);
        }

        let mut yaml = serde_yaml::to_string(&masked)?;
        for (index, s) in reserved.iter().enumerate() {
            yaml = yaml.replace(&placeholder(&marker, index), &format!("'{}'", s));
        }
        Ok(yaml)
    }

    fn mask_reserved(&self, marker: &str, reserved: &mut Vec<String>) -> FrontMatter {
        let entries = self
            .entries
            .iter()
            .map(|(key, value)| {
                let key = mask_reserved_str(key, marker, reserved);
                (key, value.mask_reserved(marker, reserved))
            })
            .collect();
        FrontMatter { entries }
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Set `key`. A new key goes to the end; an existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The `title` key, when it is a string.
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(MetaValue::as_str)
    }
}

impl Serialize for FrontMatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}

fn key_to_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Split `content` into the raw YAML between the fences and the body.
///
/// Returns `None` unless the first line is a fence and a later line is a
/// fence too.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let first_end = content.find('\n')?;
    if content[..first_end].trim_end() != FENCE {
        return None;
    }
    let rest = &content[first_end + 1..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// A document: optional front matter plus an opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front_matter: Option<FrontMatter>,
    /// Everything after the closing fence, or the whole content when there
    /// is no usable front matter.
    pub body: String,
}

impl Document {
    /// Parse a document. Missing, unterminated, empty, or invalid front
    /// matter all yield `front_matter: None` with the full content as body.
    pub fn parse(content: &str) -> Self {
        let parsed = split_front_matter(content).and_then(|(yaml, body)| {
            match FrontMatter::from_yaml(yaml) {
                Ok(Some(fm)) => Some((fm, body)),
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring unparseable front matter");
                    None
                }
            }
        });

        match parsed {
            Some((fm, body)) => Self {
                front_matter: Some(fm),
                body: body.to_string(),
            },
            None => Self {
                front_matter: None,
                body: content.to_string(),
            },
        }
    }

    /// Serialize back to text: fence, YAML, fence, body.
    pub fn render(&self) -> Result<String, serde_yaml::Error> {
        let Some(fm) = &self.front_matter else {
            return Ok(self.body.clone());
        };
        let yaml = fm.to_yaml()?;
        let mut out = String::with_capacity(yaml.len() + self.body.len() + 8);
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(&yaml);
        if !yaml.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(&self.body);
        Ok(out)
    }
}
