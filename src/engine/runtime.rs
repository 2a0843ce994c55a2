// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::{FailureReason, RuntimeEvent, TaskName, TaskOutcome};
use crate::errors::{Error, Result};
use crate::exec::{ProcessBackend, run_task};
use crate::item::Item;
use crate::task::TaskDescriptor;

/// An ordered list of tasks every item goes through.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    tasks: Vec<Arc<TaskDescriptor>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: TaskDescriptor) -> Self {
        self.tasks.push(Arc::new(task));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Arc<TaskDescriptor>] {
        &self.tasks
    }
}

/// An item that stopped at a failed task.
#[derive(Debug)]
pub struct FailedItem {
    pub item: Item,
    pub task: TaskName,
    pub reason: FailureReason,
}

/// What happened to every item of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub completed: Vec<Item>,
    pub failed: Vec<FailedItem>,
    /// Lifecycle events in the order they were received.
    pub events: Vec<RuntimeEvent>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum ItemResult {
    Completed(Item),
    Failed(FailedItem),
}

/// Moves items through a [`Pipeline`] on the current event loop.
///
/// Items run concurrently; within an item the tasks run in order and the
/// first failed task stops the item.
pub struct Runtime {
    pipeline: Arc<Pipeline>,
    backend: Arc<dyn ProcessBackend>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(pipeline: Pipeline, backend: Arc<dyn ProcessBackend>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            backend,
        }
    }

    /// Run every item through the pipeline and collect the results.
    pub async fn run(&self, items: Vec<Item>) -> Result<PipelineReport> {
        info!(
            pipeline = %self.pipeline.name(),
            tasks = self.pipeline.tasks().len(),
            items = items.len(),
            "pipeline started"
        );

        let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(64);
        let mut running = JoinSet::new();

        for item in items {
            let pipeline = Arc::clone(&self.pipeline);
            let backend = Arc::clone(&self.backend);
            let tx = tx.clone();
            running.spawn(async move { process_item(pipeline, item, backend, tx).await });
        }
        drop(tx);

        let mut report = PipelineReport::default();

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    log_event(&event);
                    report.events.push(event);
                }
                joined = running.join_next() => match joined {
                    Some(Ok(ItemResult::Completed(item))) => report.completed.push(item),
                    Some(Ok(ItemResult::Failed(failed))) => report.failed.push(failed),
                    Some(Err(e)) => return Err(Error::from(e).into()),
                    None => break,
                },
            }
        }

        while let Ok(event) = rx.try_recv() {
            log_event(&event);
            report.events.push(event);
        }

        info!(
            pipeline = %self.pipeline.name(),
            completed = report.completed.len(),
            failed = report.failed.len(),
            "pipeline finished"
        );

        Ok(report)
    }
}

async fn process_item(
    pipeline: Arc<Pipeline>,
    mut item: Item,
    backend: Arc<dyn ProcessBackend>,
    tx: mpsc::Sender<RuntimeEvent>,
) -> ItemResult {
    for task in pipeline.tasks() {
        let run = run_task(Arc::clone(task), item, backend.as_ref(), &tx).await;
        item = run.item;

        if let TaskOutcome::Failed(reason) = run.outcome {
            return ItemResult::Failed(FailedItem {
                item,
                task: task.name().to_string(),
                reason,
            });
        }
    }

    debug!(item = %item.name(), "item went through every task");
    ItemResult::Completed(item)
}

fn log_event(event: &RuntimeEvent) {
    match event {
        RuntimeEvent::ItemStarted { task, item } => {
            debug!(%task, %item, "item started");
        }
        RuntimeEvent::ItemCompleted { task, item } => {
            info!(%task, %item, "item completed");
        }
        RuntimeEvent::ItemFailed { task, item, reason } => {
            warn!(%task, %item, %reason, "item failed");
        }
    }
}
