// src/engine/machine.rs

//! Pure per-task state machine.
//!
//! A [`TaskMachine`] tracks one task working on one item. It consumes
//! [`TaskEvent`]s and produces:
//! - an updated state
//! - updates to the item (`tries`, output log, error log)
//! - a list of [`TaskCommand`]s describing what the IO shell should do next
//!
//! The shell (`exec::task_runner`) owns the process, the pty and the timers.
//! The machine has no channels, no Tokio types and performs no IO, so every
//! transition can be tested without spawning anything.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::policy::Decision;
use crate::engine::FailureReason;
use crate::item::Item;
use crate::task::TaskDescriptor;

/// Lifecycle state of one task for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet enqueued.
    Idle,
    /// Waiting for the shell to report whether the process started.
    Starting,
    /// Process is running; output is being pumped.
    Running,
    /// Output has hung up; waiting for the exit status to classify.
    Deciding,
    /// Waiting for the retry delay to elapse.
    Retrying,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Input to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Enqueue,
    Spawned,
    SpawnFailed(String),
    HungUp,
    Exited(i32),
    RetryElapsed,
}

/// Work for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// Report `start_item` to the pipeline.
    StartItem,
    /// Start a new process attempt for the item.
    Spawn,
    /// Drain output until hang-up.
    PumpOutput,
    /// Poll for the exit status of the current attempt.
    WatchExit,
    /// Emit `RetryElapsed` after the delay.
    ScheduleRetry(Duration),
    /// Report `complete_item` to the pipeline.
    CompleteItem,
    /// Report `fail_item` to the pipeline.
    FailItem(FailureReason),
}

/// Commands produced by a single transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStep {
    pub commands: Vec<TaskCommand>,
}

impl TaskStep {
    fn of(commands: Vec<TaskCommand>) -> Self {
        Self { commands }
    }

    fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct TaskMachine {
    task: Arc<TaskDescriptor>,
    state: TaskState,
    retries_scheduled: u32,
}

impl TaskMachine {
    pub fn new(task: Arc<TaskDescriptor>) -> Self {
        Self {
            task,
            state: TaskState::Idle,
            retries_scheduled: 0,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn task(&self) -> &TaskDescriptor {
        &self.task
    }

    /// Number of retry timers requested so far.
    pub fn retries_scheduled(&self) -> u32 {
        self.retries_scheduled
    }

    /// Apply one event and return the resulting commands.
    pub fn step(&mut self, item: &mut Item, event: TaskEvent) -> TaskStep {
        match (self.state, event) {
            (TaskState::Idle, TaskEvent::Enqueue) => self.on_enqueue(item),
            (TaskState::Starting, TaskEvent::Spawned) => {
                self.state = TaskState::Running;
                TaskStep::of(vec![TaskCommand::PumpOutput])
            }
            (TaskState::Starting, TaskEvent::SpawnFailed(msg)) => self.on_spawn_failed(item, msg),
            (TaskState::Running, TaskEvent::HungUp) => {
                self.state = TaskState::Deciding;
                TaskStep::of(vec![TaskCommand::WatchExit])
            }
            (TaskState::Deciding, TaskEvent::Exited(code)) => self.on_exit(item, code),
            (TaskState::Retrying, TaskEvent::RetryElapsed) => {
                self.state = TaskState::Starting;
                TaskStep::of(vec![TaskCommand::Spawn])
            }
            (state, event) => {
                warn!(
                    task = %self.task.name(),
                    item = %item.name(),
                    ?state,
                    ?event,
                    "ignoring event not valid in current state"
                );
                TaskStep::none()
            }
        }
    }

    fn on_enqueue(&mut self, item: &mut Item) -> TaskStep {
        item.log_output(format!("Starting {} for {}\n", self.task, item.description()));
        item.set_tries(1);
        self.state = TaskState::Starting;
        TaskStep::of(vec![TaskCommand::StartItem, TaskCommand::Spawn])
    }

    fn on_spawn_failed(&mut self, item: &mut Item, msg: String) -> TaskStep {
        item.log_output(format!(
            "Could not start {} for {}: {}\n",
            self.task,
            item.description(),
            msg
        ));
        item.log_output(format!("Failed {} for {}\n", self.task, item.description()));
        self.state = TaskState::Failed;
        TaskStep::of(vec![TaskCommand::FailItem(FailureReason::SpawnFailure(msg))])
    }

    fn on_exit(&mut self, item: &mut Item, exit_code: i32) -> TaskStep {
        let tries = item.tries();
        let decision = self.task.policy().decide(exit_code, tries);
        debug!(
            task = %self.task.name(),
            item = %item.name(),
            exit_code,
            tries,
            ?decision,
            "classified exit code"
        );

        if decision == Decision::Accept {
            item.log_output(format!("Finished {} for {}\n", self.task, item.description()));
            self.state = TaskState::Completed;
            return TaskStep::of(vec![TaskCommand::CompleteItem]);
        }

        item.log_output(format!(
            "Process {} returned exit code {} for {}\n",
            self.task,
            exit_code,
            item.description()
        ));
        item.log_error(self.task.name(), exit_code);

        match decision {
            Decision::Retry { delay } => {
                item.log_output(format!(
                    "Retrying {} for {} after {} seconds...\n",
                    self.task,
                    item.description(),
                    delay.as_secs()
                ));
                item.set_tries(tries.saturating_add(1));
                self.retries_scheduled += 1;
                self.state = TaskState::Retrying;
                info!(
                    task = %self.task.name(),
                    item = %item.name(),
                    exit_code,
                    tries,
                    delay_secs = delay.as_secs(),
                    "scheduling retry"
                );
                TaskStep::of(vec![TaskCommand::ScheduleRetry(delay)])
            }
            Decision::Fail { exhausted } => {
                item.log_output(format!("Failed {} for {}\n", self.task, item.description()));
                self.state = TaskState::Failed;
                let reason = if exhausted {
                    FailureReason::RetriesExhausted { exit_code, tries }
                } else {
                    FailureReason::NotRetriable { exit_code }
                };
                TaskStep::of(vec![TaskCommand::FailItem(reason)])
            }
            Decision::Accept => TaskStep::none(),
        }
    }
}
