// src/exec/task_runner.rs

//! Async shell around [`TaskMachine`] for one task and one item.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, TaskCommand, TaskEvent, TaskMachine, TaskOutcome};
use crate::exec::backend::ProcessBackend;
use crate::exec::command::ResolvedCommand;
use crate::exec::exit_watcher::{ExitWatcher, ProcessHandle, UNKNOWN_EXIT_CODE};
use crate::exec::pump::OutputPump;
use crate::item::Item;
use crate::task::TaskDescriptor;

/// The item handed back together with its terminal outcome.
#[derive(Debug)]
pub struct TaskRun {
    pub item: Item,
    pub outcome: TaskOutcome,
    /// Number of retry timers that were scheduled.
    pub retries: u32,
}

/// The live process of the current attempt.
struct Attempt {
    pump: OutputPump,
    process: Box<dyn ProcessHandle>,
}

/// Run `task` for `item` until it completes or fails.
///
/// Lifecycle events are sent on `runtime_tx`; a closed channel is not an
/// error. At most one [`Attempt`] exists at any time and it is dropped as
/// soon as its exit status has been handed to the machine.
pub async fn run_task(
    task: Arc<TaskDescriptor>,
    mut item: Item,
    backend: &dyn ProcessBackend,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> TaskRun {
    let mut machine = TaskMachine::new(Arc::clone(&task));
    let mut pending: VecDeque<TaskCommand> = VecDeque::new();
    let mut attempt: Option<Attempt> = None;
    let mut outcome = None;

    pending.extend(machine.step(&mut item, TaskEvent::Enqueue).commands);

    while let Some(command) = pending.pop_front() {
        let event = match command {
            TaskCommand::StartItem => {
                send(runtime_tx, RuntimeEvent::ItemStarted {
                    task: task.name().to_string(),
                    item: item.name().to_string(),
                })
                .await;
                None
            }
            TaskCommand::Spawn => Some(spawn(&task, &item, backend, &mut attempt)),
            TaskCommand::PumpOutput => {
                if let Some(attempt) = attempt.as_mut() {
                    attempt.pump.run(&mut item).await;
                }
                Some(TaskEvent::HungUp)
            }
            TaskCommand::WatchExit => {
                let code = match attempt.take() {
                    Some(mut attempt) => {
                        let code = ExitWatcher::default().wait(attempt.process.as_mut()).await;
                        info!(
                            task = %task,
                            item = %item.name(),
                            pid = ?attempt.process.pid(),
                            exit_code = code,
                            "process exited"
                        );
                        code
                    }
                    None => {
                        warn!(task = %task, item = %item.name(), "no process to watch");
                        UNKNOWN_EXIT_CODE
                    }
                };
                Some(TaskEvent::Exited(code))
            }
            TaskCommand::ScheduleRetry(delay) => {
                sleep(delay).await;
                Some(TaskEvent::RetryElapsed)
            }
            TaskCommand::CompleteItem => {
                info!(task = %task, item = %item.name(), tries = item.tries(), "task completed for item");
                outcome = Some(TaskOutcome::Completed);
                send(runtime_tx, RuntimeEvent::ItemCompleted {
                    task: task.name().to_string(),
                    item: item.name().to_string(),
                })
                .await;
                None
            }
            TaskCommand::FailItem(reason) => {
                error!(task = %task, item = %item.name(), %reason, "task failed for item");
                outcome = Some(TaskOutcome::Failed(reason.clone()));
                send(runtime_tx, RuntimeEvent::ItemFailed {
                    task: task.name().to_string(),
                    item: item.name().to_string(),
                    reason,
                })
                .await;
                None
            }
        };

        if let Some(event) = event {
            pending.extend(machine.step(&mut item, event).commands);
        }
    }

    // Every non-terminal transition yields a command that feeds back an
    // event, so the queue only drains once an outcome was reported.
    let outcome = match outcome {
        Some(outcome) => outcome,
        None => {
            warn!(
                task = %task,
                item = %item.name(),
                state = ?machine.state(),
                "task stopped without an outcome; failing item"
            );
            let outcome = TaskOutcome::unresolved();
            if let TaskOutcome::Failed(reason) = &outcome {
                send(runtime_tx, RuntimeEvent::ItemFailed {
                    task: task.name().to_string(),
                    item: item.name().to_string(),
                    reason: reason.clone(),
                })
                .await;
            }
            outcome
        }
    };

    TaskRun {
        item,
        outcome,
        retries: machine.retries_scheduled(),
    }
}

fn spawn(
    task: &TaskDescriptor,
    item: &Item,
    backend: &dyn ProcessBackend,
    attempt: &mut Option<Attempt>,
) -> TaskEvent {
    let started = ResolvedCommand::resolve(task, item).and_then(|command| {
        debug!(task = %task, item = %item.name(), tries = item.tries(), cmd = %command, "starting attempt");
        backend.start(&command)
    });

    match started {
        Ok(handle) => {
            *attempt = Some(Attempt {
                pump: OutputPump::new(handle.output),
                process: handle.process,
            });
            TaskEvent::Spawned
        }
        Err(e) => {
            error!(task = %task, item = %item.name(), error = %e, "could not start process");
            TaskEvent::SpawnFailed(e.to_string())
        }
    }
}

async fn send(tx: &mpsc::Sender<RuntimeEvent>, event: RuntimeEvent) {
    if tx.send(event).await.is_err() {
        debug!("runtime event channel closed; dropping lifecycle event");
    }
}
