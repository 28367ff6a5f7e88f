//! Annotation micro-grammar.
//!
//! ```text
//! name:arg1:arg2:...:argN:key1=value1:key2=value2:...
//! ```
//!
//! Segments are separated by `:`; `\:` is a literal colon. The first segment
//! names the plugin, the next N segments are positional arguments (N is
//! declared by the plugin) and the rest are `key=value` options.

pub mod entity;

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::Serialize;

pub use entity::{DeclEntities, DeclEntity, FieldEntities, FieldEntity};

pub const ANNOTATION_SEPARATOR: &str = ":";
pub const KEY_VALUE_SEPARATOR: &str = "=";
const ESCAPED_SEPARATOR: &str = "\\:";
// private-use code point standing in for an escaped colon while splitting
const SEPARATOR_PLACEHOLDER: &str = "\u{E03A}";

/// Parsed key-value options of one annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, String>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, or `default` when the key is absent or empty
    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(v) if !v.is_empty() => v,
            _ => default,
        }
    }

    /// Present with an empty value, or a value that parses as boolean true
    pub fn exist(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(v) => v.is_empty() || parse_bool(v),
            None => false,
        }
    }

    /// Adds a value; a repeated key appends `,value` to the existing one.
    pub fn push(&mut self, key: &str, value: &str) {
        match self.0.get_mut(key) {
            Some(existing) => {
                existing.push(',');
                existing.push_str(value);
            }
            None => {
                self.0.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Fills keys that are not already present.
    pub fn merge_defaults<'a, I>(&mut self, defaults: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (k, v) in defaults {
            self.0.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

impl Deref for Options {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Options {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, String)> for Options {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Positional arguments and options of a matched annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnnotation {
    pub args: Vec<String>,
    pub options: Options,
}

/// Matches `annotation` against a plugin `name` declaring `args_count`
/// positional arguments. Returns `None` on a name mismatch or when fewer
/// than `args_count` segments follow the name.
///
/// `ext_options` fills option keys the annotation does not set itself.
pub fn parse_annotation(
    annotation: &str,
    name: &str,
    args_count: usize,
    ext_options: &BTreeMap<String, String>,
) -> Option<ParsedAnnotation> {
    let escaped = escape_annotation(annotation);
    let segments: Vec<&str> = escaped.split(ANNOTATION_SEPARATOR).collect();

    if segments[0] != name || segments.len() - 1 < args_count {
        return None;
    }

    let mut options = Options::new();
    split_kv_segments(&segments[1 + args_count..], &mut options);
    for value in options.values_mut() {
        *value = unescape_annotation(value);
    }
    options.merge_defaults(ext_options);

    Some(ParsedAnnotation {
        args: segments[1..1 + args_count]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        options,
    })
}

pub fn escape_annotation(s: &str) -> String {
    s.replace(ESCAPED_SEPARATOR, SEPARATOR_PLACEHOLDER)
}

pub fn unescape_annotation(s: &str) -> String {
    s.replace(SEPARATOR_PLACEHOLDER, ANNOTATION_SEPARATOR)
}

/// Splits on the first `sep`; a string without `sep` is a key with empty value.
pub fn split_kv<'a>(s: &'a str, sep: &str) -> (&'a str, &'a str) {
    s.split_once(sep).unwrap_or((s, ""))
}

/// Collects `key=value` segments into `options`, skipping empty segments.
pub fn split_kv_segments(segments: &[&str], options: &mut Options) {
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        let (k, v) = split_kv(segment, KEY_VALUE_SEPARATOR);
        options.push(k, v);
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s, "1" | "t" | "T" | "true" | "TRUE" | "True")
}
