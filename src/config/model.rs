// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::item::ItemValue;
use crate::realize::Template;
use crate::types::TaskKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// name = "archive"
///
/// [default]
/// max_tries = 3
/// retry_delay = 10
///
/// [[task]]
/// kind = "external"
/// name = "Fetch"
/// args = ["curl", "-fsS", "-o", "{dir}/page.html", "{url}"]
///
/// [[task]]
/// kind = "rsync"
/// target = "rsync://host/module/{item_name}/"
/// files = ["{dir}/page.html"]
/// target_source_path = "{dir}/"
///
/// [[item]]
/// name = "page-1"
/// url = "http://example.com/"
/// dir = "data/page-1"
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Defaults for external and wget tasks from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[[task]]`, in pipeline order.
    #[serde(default)]
    pub task: Vec<TaskConfig>,

    /// All items from `[[item]]`.
    #[serde(default)]
    pub item: Vec<ItemConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub task: Vec<TaskConfig>,
    pub item: Vec<ItemConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            default: raw.default,
            task: raw.task,
            item: raw.item,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Pipeline name used in logs.
    #[serde(default = "default_pipeline_name")]
    pub name: String,

    /// Echo item output to stdout while processes run.
    #[serde(default)]
    pub echo_output: bool,
}

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            name: default_pipeline_name(),
            echo_output: false,
        }
    }
}

/// `max_tries` value: a positive count or `"unlimited"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MaxTries {
    Count(u32),
    Keyword(String),
}

impl MaxTries {
    pub const UNLIMITED: &'static str = "unlimited";

    /// `Ok(None)` for unlimited.
    pub fn limit(&self) -> Result<Option<u32>, String> {
        match self {
            MaxTries::Count(0) => Err("max_tries must be >= 1 (got 0)".to_string()),
            MaxTries::Count(n) => Ok(Some(*n)),
            MaxTries::Keyword(word) if word == Self::UNLIMITED => Ok(None),
            MaxTries::Keyword(word) => Err(format!(
                "max_tries must be a positive integer or \"unlimited\" (got \"{word}\")"
            )),
        }
    }
}

/// `[default]` section.
///
/// Fields left unset fall back to the built-in task defaults: one try, a
/// 30 second retry delay, accept exit code 0, retry any other code.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub max_tries: Option<MaxTries>,

    /// Seconds.
    #[serde(default)]
    pub retry_delay: Option<u64>,

    #[serde(default)]
    pub accept_on_exit_code: Option<Vec<i32>>,

    #[serde(default)]
    pub retry_on_exit_code: Option<Vec<i32>>,

    #[serde(default)]
    pub env: Option<BTreeMap<String, Template>>,

    #[serde(default)]
    pub cwd: Option<Template>,
}

/// One `[[task]]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    /// Task name; required for `external`, fixed for the presets.
    #[serde(default)]
    pub name: Option<String>,

    /// Argument vector; required for `external` and `wget`.
    #[serde(default)]
    pub args: Vec<Template>,

    #[serde(default)]
    pub max_tries: Option<MaxTries>,

    /// Seconds between a failed attempt and the next one.
    #[serde(default)]
    pub retry_delay: Option<u64>,

    #[serde(default)]
    pub accept_on_exit_code: Option<Vec<i32>>,

    /// Unset retries any non-accepted code; `[]` retries nothing.
    #[serde(default)]
    pub retry_on_exit_code: Option<Vec<i32>>,

    /// Replaces the child environment when set.
    #[serde(default)]
    pub env: Option<BTreeMap<String, Template>>,

    #[serde(default)]
    pub cwd: Option<Template>,

    /// Content written to stdin before it is closed.
    #[serde(default)]
    pub stdin: Option<Template>,

    /// rsync destination.
    #[serde(default)]
    pub target: Option<Template>,

    /// Files to upload (rsync).
    #[serde(default)]
    pub files: Vec<Template>,

    /// rsync source directory; file paths are passed relative to it.
    #[serde(default)]
    pub target_source_path: Option<Template>,

    /// rsync `--bwlimit`.
    #[serde(default)]
    pub bwlimit: Option<Template>,
}

/// One `[[item]]` section: a name plus arbitrary properties.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemConfig {
    pub name: String,

    #[serde(flatten)]
    pub properties: BTreeMap<String, ItemValue>,
}
