// src/engine/mod.rs

//! Task engine for pipetask.
//!
//! This module ties together:
//! - the retry policy (how exit codes are classified)
//! - the per-run task state machine (pure transitions, no IO)
//! - the pipeline runtime that moves items through tasks and collects
//!   lifecycle events
//!
//! The pure state machine lives in [`machine`]; the async/IO shell that
//! executes its commands is [`crate::exec::task_runner`], and the item-level
//! loop is [`runtime`].

use std::fmt;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Why a task gave up on an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The process could not be started.
    SpawnFailure(String),
    /// Exit code is outside both the accept and the retry sets.
    NotRetriable { exit_code: i32 },
    /// Exit code was retriable but `max_tries` starts have been used.
    RetriesExhausted { exit_code: i32, tries: u32 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SpawnFailure(msg) => write!(f, "spawn failure: {msg}"),
            FailureReason::NotRetriable { exit_code } => {
                write!(f, "exit code {exit_code} is not retriable")
            }
            FailureReason::RetriesExhausted { exit_code, tries } => {
                write!(f, "exit code {exit_code} after {tries} tries")
            }
        }
    }
}

/// Terminal outcome of one task for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(FailureReason),
}

impl TaskOutcome {
    /// Failure recorded for a run whose machine stopped without an outcome.
    pub fn unresolved() -> Self {
        TaskOutcome::Failed(FailureReason::NotRetriable {
            exit_code: crate::exec::exit_watcher::UNKNOWN_EXIT_CODE,
        })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

/// Lifecycle events flowing from task runs into the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    ItemStarted {
        task: TaskName,
        item: String,
    },
    ItemCompleted {
        task: TaskName,
        item: String,
    },
    ItemFailed {
        task: TaskName,
        item: String,
        reason: FailureReason,
    },
}

pub mod machine;
pub mod policy;
pub mod runtime;

pub use machine::{TaskCommand, TaskEvent, TaskMachine, TaskState, TaskStep};
pub use policy::{Decision, RetryPolicy};
pub use runtime::{FailedItem, Pipeline, PipelineReport, Runtime};
