#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use pipetask::engine::{RuntimeEvent, TaskCommand, TaskEvent, TaskMachine};
use pipetask::exec::{ProcessBackend, TaskRun, run_task};
use pipetask::item::Item;
use pipetask::realize::Template;
use pipetask::task::TaskDescriptor;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A task running `sh -c <script>` that retries immediately.
pub fn sh_task(name: &str, script: &str) -> TaskDescriptor {
    TaskDescriptor::new(
        name,
        vec![Template::from("sh"), Template::from("-c"), Template::from(script)],
    )
    .retry_delay(Duration::ZERO)
}

/// Feed `events` to a fresh machine and collect every command it emitted.
pub fn drive(task: TaskDescriptor, item: &mut Item, events: &[TaskEvent]) -> (TaskMachine, Vec<TaskCommand>) {
    let mut machine = TaskMachine::new(Arc::new(task));
    let mut commands = Vec::new();
    for event in events {
        commands.extend(machine.step(item, event.clone()).commands);
    }
    (machine, commands)
}

/// Events for one attempt that started and exited with `code`.
pub fn attempt(code: i32) -> [TaskEvent; 3] {
    [TaskEvent::Spawned, TaskEvent::HungUp, TaskEvent::Exited(code)]
}

/// Run `task` for `item` on `backend`, returning the run and every event.
pub async fn run_on(
    task: TaskDescriptor,
    item: Item,
    backend: &dyn ProcessBackend,
) -> (TaskRun, Vec<RuntimeEvent>) {
    let (tx, mut rx) = mpsc::channel(64);
    let run = run_task(Arc::new(task), item, backend, &tx).await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (run, events)
}

pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
