// tests/property_retry.rs

mod common;
use crate::common::attempt;

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use pipetask::engine::{TaskEvent, TaskMachine, TaskState};
use pipetask::exec::{OutputPump, PumpStatus, Readiness};
use pipetask::item::Item;
use pipetask::realize::{Template, realize_string};
use pipetask::task::TaskDescriptor;
use pipetask_test_utils::scripted_backend::ScriptedOutput;

/// Drive a machine through scripted exit codes until it stops.
fn simulate(max_tries: Option<u32>, codes: &[i32]) -> (TaskMachine, Item, usize) {
    let task = TaskDescriptor::new("T", vec![Template::from("t")])
        .max_tries(max_tries)
        .retry_delay(Duration::ZERO);
    let mut machine = TaskMachine::new(Arc::new(task));
    let mut item = Item::new("i");
    let mut starts = 0;

    machine.step(&mut item, TaskEvent::Enqueue);
    for (i, &code) in codes.iter().enumerate() {
        if i > 0 {
            if machine.state() != TaskState::Retrying {
                break;
            }
            machine.step(&mut item, TaskEvent::RetryElapsed);
        }
        starts += 1;
        for event in attempt(code) {
            machine.step(&mut item, event);
        }
    }
    (machine, item, starts)
}

proptest! {
    #[test]
    fn starts_never_exceed_max_tries(
        max_tries in 1u32..6,
        codes in proptest::collection::vec(0i32..4, 1..12),
    ) {
        let (machine, item, starts) = simulate(Some(max_tries), &codes);

        let starts = starts as u32;
        prop_assert!(starts <= max_tries);
        if machine.state() == TaskState::Retrying {
            // Script ran out while a retry was pending.
            prop_assert_eq!(item.tries(), starts + 1);
            prop_assert_eq!(machine.retries_scheduled(), starts);
        } else {
            prop_assert!(machine.state().is_terminal());
            prop_assert_eq!(item.tries(), starts);
            prop_assert_eq!(machine.retries_scheduled(), starts - 1);
        }
    }

    #[test]
    fn completes_exactly_on_first_accepted_code(
        codes in proptest::collection::vec(0i32..4, 1..12),
    ) {
        let (machine, item, starts) = simulate(None, &codes);

        match codes.iter().position(|&c| c == 0) {
            Some(first_zero) => {
                prop_assert_eq!(machine.state(), TaskState::Completed);
                prop_assert_eq!(starts, first_zero + 1);
                prop_assert_eq!(item.errors().len(), first_zero);
            }
            None => {
                prop_assert_eq!(machine.state(), TaskState::Retrying);
                prop_assert_eq!(item.errors().len(), codes.len());
            }
        }
    }

    #[test]
    fn pump_preserves_every_byte(
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..8),
        max_read in 1usize..16,
        hang_up_with_last in any::<bool>(),
    ) {
        let expected: Vec<u8> = chunks.concat();
        let source = ScriptedOutput::from_chunks(chunks, hang_up_with_last).with_max_read(max_read);
        let mut pump = OutputPump::new(Box::new(source));
        let mut item = Item::new("i");

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(pump.run(&mut item));
        prop_assert_eq!(pump.on_ready(Readiness::HANG_UP, &mut item), PumpStatus::Closed);

        prop_assert!(pump.is_closed());
        prop_assert_eq!(item.output(), expected.as_slice());
    }

    #[test]
    fn brace_free_patterns_are_unchanged(text in "[a-zA-Z0-9 ./:=-]{0,40}") {
        let item = Item::new("i");
        prop_assert_eq!(realize_string(&Template::from(text.as_str()), &item).unwrap(), text);
    }
}
