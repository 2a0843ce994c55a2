// src/task/presets.rs

//! Preset task configurations for common external tools.
//!
//! These are plain factory functions over [`TaskDescriptor`]; they fix the
//! argument vector (and for rsync the stdin content) and add no behaviour.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::engine::policy::DEFAULT_RETRY_DELAY_SECS;
use crate::realize::Template;
use crate::task::{StdinSource, TaskDescriptor};

pub const WGET_TASK_NAME: &str = "WgetDownload";
pub const RSYNC_TASK_NAME: &str = "RsyncUpload";

/// Options for [`wget_download`].
#[derive(Debug, Clone)]
pub struct WgetOptions {
    pub max_tries: Option<u32>,
    pub retry_delay: Duration,
    pub accept_on_exit_code: BTreeSet<i32>,
    pub retry_on_exit_code: Option<BTreeSet<i32>>,
    pub env: Option<BTreeMap<String, Template>>,
}

impl Default for WgetOptions {
    fn default() -> Self {
        Self {
            max_tries: Some(1),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            accept_on_exit_code: BTreeSet::from([0]),
            retry_on_exit_code: None,
            env: None,
        }
    }
}

/// Fetch with an external download tool; `args` is the complete argv.
pub fn wget_download(args: Vec<Template>, options: WgetOptions) -> TaskDescriptor {
    let task = TaskDescriptor::new(WGET_TASK_NAME, args)
        .max_tries(options.max_tries)
        .retry_delay(options.retry_delay)
        .accept_on_exit_code(options.accept_on_exit_code)
        .retry_on_exit_code(options.retry_on_exit_code);

    match options.env {
        Some(env) => task.env(env),
        None => task,
    }
}

/// Options for [`rsync_upload`].
#[derive(Debug, Clone)]
pub struct RsyncOptions {
    /// Directory the file list is made relative to; also the rsync source.
    pub target_source_path: Template,
    /// Value for `--bwlimit`; `"0"` means no limit.
    pub bwlimit: Template,
    pub max_tries: Option<u32>,
    pub retry_delay: Duration,
}

impl Default for RsyncOptions {
    fn default() -> Self {
        Self {
            target_source_path: Template::literal("./"),
            bwlimit: Template::literal("0"),
            max_tries: None,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

/// Push `files` to `target` with rsync, passing the file list on stdin.
pub fn rsync_upload(target: Template, files: Vec<Template>, options: RsyncOptions) -> TaskDescriptor {
    let args = vec![
        Template::literal("rsync"),
        Template::literal("-avz"),
        Template::literal("--compress-level=9"),
        Template::literal("--timeout=30"),
        Template::literal("--contimeout=30"),
        Template::literal("--progress"),
        Template::literal("--bwlimit"),
        options.bwlimit,
        Template::literal("--files-from=-"),
        options.target_source_path.clone(),
        target,
    ];

    TaskDescriptor::new(RSYNC_TASK_NAME, args)
        .max_tries(options.max_tries)
        .retry_delay(options.retry_delay)
        .stdin(StdinSource::FileList {
            files,
            base: options.target_source_path,
        })
}
