// src/engine/policy.rs

//! Exit-code classification and retry budget.

use std::collections::BTreeSet;
use std::time::Duration;

/// Default delay before a retry, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;

/// Classification of a single exit code at a given attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Exit code is in the accept set.
    Accept,
    /// Run again after `delay`.
    Retry { delay: Duration },
    /// Not accepted and not retriable.
    Fail { exhausted: bool },
}

/// How a task reacts to the exit code of its process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of process starts. `None` means unlimited.
    pub max_tries: Option<u32>,
    pub retry_delay: Duration,
    pub accept_on_exit_code: BTreeSet<i32>,
    /// Exit codes that may be retried. `None` retries any non-accepted code;
    /// an empty set retries nothing.
    pub retry_on_exit_code: Option<BTreeSet<i32>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: Some(1),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            accept_on_exit_code: BTreeSet::from([0]),
            retry_on_exit_code: None,
        }
    }
}

impl RetryPolicy {
    pub fn accepts(&self, exit_code: i32) -> bool {
        self.accept_on_exit_code.contains(&exit_code)
    }

    /// Whether another attempt is within the `max_tries` budget after `tries`
    /// starts.
    pub fn has_budget(&self, tries: u32) -> bool {
        self.max_tries.is_none_or(|max| tries < max)
    }

    pub fn retries_code(&self, exit_code: i32) -> bool {
        self.retry_on_exit_code
            .as_ref()
            .is_none_or(|codes| codes.contains(&exit_code))
    }

    /// Classify `exit_code` observed after `tries` process starts.
    pub fn decide(&self, exit_code: i32, tries: u32) -> Decision {
        if self.accepts(exit_code) {
            return Decision::Accept;
        }
        if !self.retries_code(exit_code) {
            return Decision::Fail { exhausted: false };
        }
        if !self.has_budget(tries) {
            return Decision::Fail { exhausted: true };
        }
        Decision::Retry {
            delay: self.retry_delay,
        }
    }
}
