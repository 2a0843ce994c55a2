// src/realize.rs

//! Value realization: resolving per-item templates into concrete strings.
//!
//! Three template forms exist, matching what a TOML file can express:
//!
//! ```toml
//! args = [
//!     "wget",
//!     "--output-document={dir}/page.html",   # pattern with placeholders
//!     { key = "url" },                       # scalar property
//!     { expand = "extra_args" },             # list property, one arg each
//! ]
//! ```
//!
//! In patterns `{{` and `}}` produce literal braces.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{PipetaskError, Result};
use crate::item::{Item, ItemValue};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// A value resolved against an item before each process start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Template {
    /// String with `{key}` placeholders.
    Pattern(String),
    /// Reference to a whole property.
    Reference(Reference),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// Scalar value of the property.
    Key(String),
    /// List property expanded to one value per element.
    Expand(String),
}

impl Template {
    pub fn literal(s: impl Into<String>) -> Self {
        Template::Pattern(s.into())
    }

    pub fn key(key: impl Into<String>) -> Self {
        Template::Reference(Reference::Key(key.into()))
    }

    pub fn expand(key: impl Into<String>) -> Self {
        Template::Reference(Reference::Expand(key.into()))
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Template::Pattern(s.to_string())
    }
}

impl From<String> for Template {
    fn from(s: String) -> Self {
        Template::Pattern(s)
    }
}

/// Realize a template into zero or more values.
///
/// Only `{ expand = ... }` can produce anything other than exactly one value.
pub fn realize(template: &Template, item: &Item) -> Result<Vec<String>> {
    match template {
        Template::Reference(Reference::Expand(key)) => match lookup(key, item)? {
            ItemValue::List(values) => Ok(values),
            scalar => Ok(vec![scalar.to_string()]),
        },
        other => Ok(vec![realize_string(other, item)?]),
    }
}

/// Realize a template that must produce exactly one string.
pub fn realize_string(template: &Template, item: &Item) -> Result<String> {
    match template {
        Template::Pattern(pattern) => substitute(pattern, item),
        Template::Reference(Reference::Key(key)) => scalar(key, lookup(key, item)?, item),
        Template::Reference(Reference::Expand(key)) => Err(template_error(
            key,
            item,
            "list expansion is not allowed here",
        )),
    }
}

/// Realize a whole argument vector, flattening expansions.
pub fn realize_all(templates: &[Template], item: &Item) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(templates.len());
    for template in templates {
        out.extend(realize(template, item)?);
    }
    Ok(out)
}

fn substitute(pattern: &str, item: &Item) -> Result<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(pattern) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&pattern[last..whole.start()]);
        match (whole.as_str(), caps.get(1)) {
            ("{{", _) => out.push('{'),
            ("}}", _) => out.push('}'),
            (_, Some(key)) => {
                let key = key.as_str();
                let value = lookup(key, item)?;
                out.push_str(&scalar(key, value, item)?);
            }
            _ => {}
        }
        last = whole.end();
    }
    out.push_str(&pattern[last..]);

    Ok(out)
}

fn lookup(key: &str, item: &Item) -> Result<ItemValue> {
    item.get(key)
        .ok_or_else(|| template_error(key, item, "no such property"))
}

fn scalar(key: &str, value: ItemValue, item: &Item) -> Result<String> {
    match value {
        ItemValue::List(_) => Err(template_error(
            key,
            item,
            "list property used where a single value is required",
        )),
        other => Ok(other.to_string()),
    }
}

fn template_error(key: &str, item: &Item, reason: &str) -> PipetaskError {
    PipetaskError::Template {
        key: key.to_string(),
        item: item.name().to_string(),
        reason: reason.to_string(),
    }
}
