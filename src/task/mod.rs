// src/task/mod.rs

//! Task descriptors.
//!
//! A [`TaskDescriptor`] is the immutable configuration of one external-process
//! step: name, argument templates, environment, working directory, stdin
//! content and retry policy. Presets for common tools live in [`presets`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use crate::engine::RetryPolicy;
use crate::realize::Template;

pub mod presets;
pub mod stdin;

pub use presets::{RsyncOptions, WgetOptions, rsync_upload, wget_download};
pub use stdin::{StdinSource, relative_path};

#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    name: String,
    args: Vec<Template>,
    env: Option<BTreeMap<String, Template>>,
    cwd: Option<Template>,
    stdin: StdinSource,
    policy: RetryPolicy,
}

impl TaskDescriptor {
    /// A task with the default policy: one try, accept exit code 0.
    pub fn new(name: impl Into<String>, args: Vec<Template>) -> Self {
        Self {
            name: name.into(),
            args,
            env: None,
            cwd: None,
            stdin: StdinSource::Empty,
            policy: RetryPolicy::default(),
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// `None` means unlimited.
    pub fn max_tries(mut self, max_tries: Option<u32>) -> Self {
        self.policy.max_tries = max_tries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.policy.retry_delay = delay;
        self
    }

    pub fn accept_on_exit_code(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.policy.accept_on_exit_code = codes.into_iter().collect();
        self
    }

    pub fn retry_on_exit_code(mut self, codes: Option<BTreeSet<i32>>) -> Self {
        self.policy.retry_on_exit_code = codes;
        self
    }

    pub fn policy_from(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the child's environment with `env`.
    pub fn env(mut self, env: BTreeMap<String, Template>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn cwd(mut self, cwd: Template) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn stdin(mut self, stdin: StdinSource) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Template] {
        &self.args
    }

    pub fn env_template(&self) -> Option<&BTreeMap<String, Template>> {
        self.env.as_ref()
    }

    pub fn cwd_template(&self) -> Option<&Template> {
        self.cwd.as_ref()
    }

    pub fn stdin_source(&self) -> &StdinSource {
        &self.stdin
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
