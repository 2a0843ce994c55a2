// src/item.rs

//! Work items.
//!
//! An [`Item`] is one unit of pipeline work. Tasks read its properties when
//! realizing command templates, append process output to its log, record
//! failed exit codes and keep the `tries` counter in its property map.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Property key holding the number of process starts for the current task.
pub const TRIES_KEY: &str = "tries";

/// A single item property value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    Int(i64),
    Text(String),
    List(Vec<String>),
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemValue::Int(n) => write!(f, "{n}"),
            ItemValue::Text(s) => f.write_str(s),
            ItemValue::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<i64> for ItemValue {
    fn from(n: i64) -> Self {
        ItemValue::Int(n)
    }
}

impl From<&str> for ItemValue {
    fn from(s: &str) -> Self {
        ItemValue::Text(s.to_string())
    }
}

impl From<String> for ItemValue {
    fn from(s: String) -> Self {
        ItemValue::Text(s)
    }
}

impl From<Vec<String>> for ItemValue {
    fn from(items: Vec<String>) -> Self {
        ItemValue::List(items)
    }
}

/// A failed exit code recorded by `log_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub task: String,
    pub exit_code: i32,
}

/// Callback receiving `(item name, bytes)` for every chunk of logged output.
pub type OutputEcho = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Mutable per-unit-of-work state.
#[derive(Clone)]
pub struct Item {
    name: String,
    properties: BTreeMap<String, ItemValue>,
    output: Vec<u8>,
    errors: Vec<ErrorRecord>,
    echo: Option<OutputEcho>,
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("output_len", &self.output.len())
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            output: Vec::new(),
            errors: Vec::new(),
            echo: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<ItemValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Forward every logged chunk to `echo` as well as the in-memory log.
    pub fn with_echo(mut self, echo: OutputEcho) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description used in log lines.
    pub fn description(&self) -> String {
        format!("Item {}", self.name)
    }

    /// Look up a property. `"item_name"` always resolves to the item name.
    pub fn get(&self, key: &str) -> Option<ItemValue> {
        match self.properties.get(key) {
            Some(value) => Some(value.clone()),
            None if key == "item_name" => Some(ItemValue::Text(self.name.clone())),
            None => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ItemValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn properties(&self) -> &BTreeMap<String, ItemValue> {
        &self.properties
    }

    /// Number of process starts recorded for the current task (0 if unset).
    pub fn tries(&self) -> u32 {
        match self.properties.get(TRIES_KEY) {
            Some(ItemValue::Int(n)) => u32::try_from(*n).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn set_tries(&mut self, tries: u32) {
        self.set(TRIES_KEY, i64::from(tries));
    }

    /// Append raw bytes to the output log, verbatim.
    pub fn log_output(&mut self, data: impl AsRef<[u8]>) {
        let data = data.as_ref();
        if data.is_empty() {
            return;
        }
        self.output.extend_from_slice(data);
        if let Some(echo) = &self.echo {
            echo(&self.name, data);
        }
    }

    /// Record a failed exit code for `task` in the error log.
    pub fn log_error(&mut self, task: &str, exit_code: i32) {
        tracing::error!(task, item = %self.name, exit_code, "process returned unaccepted exit code");
        self.errors.push(ErrorRecord {
            task: task.to_string(),
            exit_code,
        });
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output log decoded lossily as UTF-8.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }
}
