// tests/machine_transitions.rs

mod common;
use crate::common::{attempt, drive};

use std::collections::BTreeSet;
use std::time::Duration;

use pipetask::engine::{FailureReason, TaskCommand, TaskEvent, TaskState};
use pipetask::item::Item;
use pipetask::realize::Template;
use pipetask::task::TaskDescriptor;
use pipetask_test_utils::init_tracing;

fn task(max_tries: Option<u32>) -> TaskDescriptor {
    TaskDescriptor::new("Fetch", vec![Template::from("true")])
        .max_tries(max_tries)
        .retry_delay(Duration::from_secs(5))
}

#[test]
fn enqueue_sets_tries_and_requests_spawn() {
    init_tracing();

    let mut item = Item::new("page-1");
    let (machine, commands) = drive(task(Some(1)), &mut item, &[TaskEvent::Enqueue]);

    assert_eq!(machine.state(), TaskState::Starting);
    assert_eq!(commands, vec![TaskCommand::StartItem, TaskCommand::Spawn]);
    assert_eq!(item.tries(), 1);
    assert_eq!(item.output_lossy(), "Starting Fetch for Item page-1\n");
}

#[test]
fn accepted_exit_code_completes() {
    init_tracing();

    let mut item = Item::new("page-1");
    let mut events = vec![TaskEvent::Enqueue];
    events.extend(attempt(0));
    let (machine, commands) = drive(task(Some(1)), &mut item, &events);

    assert_eq!(machine.state(), TaskState::Completed);
    assert_eq!(
        commands,
        vec![
            TaskCommand::StartItem,
            TaskCommand::Spawn,
            TaskCommand::PumpOutput,
            TaskCommand::WatchExit,
            TaskCommand::CompleteItem,
        ]
    );
    assert!(item.output_lossy().ends_with("Finished Fetch for Item page-1\n"));
    assert!(item.errors().is_empty());
}

#[test]
fn retriable_code_schedules_retry_and_bumps_tries() {
    init_tracing();

    let mut item = Item::new("page-1");
    let mut events = vec![TaskEvent::Enqueue];
    events.extend(attempt(4));
    let (machine, commands) = drive(task(Some(3)), &mut item, &events);

    assert_eq!(machine.state(), TaskState::Retrying);
    assert_eq!(
        commands.last(),
        Some(&TaskCommand::ScheduleRetry(Duration::from_secs(5)))
    );
    assert_eq!(item.tries(), 2);
    assert_eq!(machine.retries_scheduled(), 1);

    let log = item.output_lossy();
    assert!(log.contains("Process Fetch returned exit code 4 for Item page-1\n"));
    assert!(log.contains("Retrying Fetch for Item page-1 after 5 seconds...\n"));
    assert_eq!(item.errors().len(), 1);
    assert_eq!(item.errors()[0].exit_code, 4);
}

#[test]
fn retry_elapsed_spawns_again() {
    init_tracing();

    let mut item = Item::new("page-1");
    let mut events = vec![TaskEvent::Enqueue];
    events.extend(attempt(1));
    events.push(TaskEvent::RetryElapsed);
    let (machine, commands) = drive(task(Some(3)), &mut item, &events);

    assert_eq!(machine.state(), TaskState::Starting);
    assert_eq!(commands.last(), Some(&TaskCommand::Spawn));
}

#[test]
fn exhausted_budget_fails_with_last_code() {
    init_tracing();

    let mut item = Item::new("page-1");
    let mut events = vec![TaskEvent::Enqueue];
    events.extend(attempt(1));
    events.push(TaskEvent::RetryElapsed);
    events.extend(attempt(8));
    let (machine, commands) = drive(task(Some(2)), &mut item, &events);

    assert_eq!(machine.state(), TaskState::Failed);
    assert_eq!(
        commands.last(),
        Some(&TaskCommand::FailItem(FailureReason::RetriesExhausted {
            exit_code: 8,
            tries: 2
        }))
    );
    assert_eq!(item.tries(), 2);
    assert_eq!(machine.retries_scheduled(), 1);
    assert_eq!(
        item.errors().iter().map(|e| e.exit_code).collect::<Vec<_>>(),
        vec![1, 8]
    );
    assert!(item.output_lossy().ends_with("Failed Fetch for Item page-1\n"));
}

#[test]
fn code_outside_retry_set_fails_without_retry() {
    init_tracing();

    let task = task(None).retry_on_exit_code(Some(BTreeSet::from([4])));
    let mut item = Item::new("page-1");
    let mut events = vec![TaskEvent::Enqueue];
    events.extend(attempt(2));
    let (machine, commands) = drive(task, &mut item, &events);

    assert_eq!(machine.state(), TaskState::Failed);
    assert_eq!(machine.retries_scheduled(), 0);
    assert_eq!(
        commands.last(),
        Some(&TaskCommand::FailItem(FailureReason::NotRetriable { exit_code: 2 }))
    );
}

#[test]
fn spawn_failure_fails_immediately() {
    init_tracing();

    let mut item = Item::new("page-1");
    let (machine, commands) = drive(
        task(None),
        &mut item,
        &[TaskEvent::Enqueue, TaskEvent::SpawnFailed("no such file".to_string())],
    );

    assert_eq!(machine.state(), TaskState::Failed);
    assert_eq!(
        commands.last(),
        Some(&TaskCommand::FailItem(FailureReason::SpawnFailure(
            "no such file".to_string()
        )))
    );
    assert!(
        item.output_lossy()
            .contains("Could not start Fetch for Item page-1: no such file\n")
    );
    assert!(item.errors().is_empty());
}

#[test]
fn out_of_order_events_are_ignored() {
    init_tracing();

    let mut item = Item::new("page-1");
    let (machine, commands) = drive(
        task(Some(1)),
        &mut item,
        &[
            TaskEvent::Exited(0),
            TaskEvent::Enqueue,
            TaskEvent::HungUp,
            TaskEvent::Enqueue,
        ],
    );

    assert_eq!(machine.state(), TaskState::Starting);
    assert_eq!(commands, vec![TaskCommand::StartItem, TaskCommand::Spawn]);
}

#[test]
fn terminal_states_accept_no_more_events() {
    init_tracing();

    let mut item = Item::new("page-1");
    let mut events = vec![TaskEvent::Enqueue];
    events.extend(attempt(0));
    events.extend([TaskEvent::RetryElapsed, TaskEvent::Spawned, TaskEvent::Exited(1)]);
    let (machine, commands) = drive(task(Some(3)), &mut item, &events);

    assert!(machine.state().is_terminal());
    assert_eq!(
        commands
            .iter()
            .filter(|c| matches!(c, TaskCommand::CompleteItem))
            .count(),
        1
    );
    assert!(item.errors().is_empty());
}
