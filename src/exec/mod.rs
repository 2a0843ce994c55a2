// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the commands defined by
//! tasks and feeding the results back into the task state machine.
//!
//! - [`command`] realizes a task's templates into a concrete command line.
//! - [`backend`] provides the `ProcessBackend` trait and the production
//!   `PtyBackend`, which tests replace with a scripted implementation.
//! - [`pty`] allocates the pseudo-terminal and wraps the non-blocking master.
//! - [`pump`] forwards output into the item log until hang-up.
//! - [`exit_watcher`] polls for the process exit status on a short timer.
//! - [`task_runner`] executes the machine's commands for one task and item.

pub mod backend;
pub mod command;
pub mod exit_watcher;
pub mod pty;
pub mod pump;
pub mod task_runner;

pub use backend::{ProcessBackend, PtyBackend, RunHandle};
pub use command::ResolvedCommand;
pub use exit_watcher::{EXIT_POLL_INTERVAL, ExitPoll, ExitWatcher, ProcessHandle};
pub use pump::{OutputPump, OutputSource, PumpStatus, Readiness};
pub use task_runner::{TaskRun, run_task};
