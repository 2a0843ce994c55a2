// tests/pty_backend.rs
//
// These start real processes through `/bin/sh` on a pseudo-terminal. The
// terminal translates "\n" into "\r\n", so output is checked with `contains`.

mod common;
use crate::common::{TestResult, run_on, sh_task};

use std::collections::BTreeMap;

use tempfile::tempdir;

use pipetask::engine::{FailureReason, TaskOutcome};
use pipetask::exec::PtyBackend;
use pipetask::item::Item;
use pipetask::realize::Template;
use pipetask::task::{StdinSource, TaskDescriptor};
use pipetask_test_utils::{init_tracing, terminal_log, with_timeout};

#[tokio::test]
async fn captures_stdout() -> TestResult {
    init_tracing();

    let task = sh_task("Echo", "printf 'hello from %s\\n' \"$0\"");
    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    assert!(run.item.output_lossy().contains("hello from sh"));
    Ok(())
}

#[tokio::test]
async fn terminal_line_endings_fold_to_newlines() -> TestResult {
    init_tracing();

    let task = sh_task("Lines", "printf 'one\\ntwo\\n'");
    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    let log = terminal_log(&run.item);
    assert!(log.contains("one\ntwo\n"));
    assert!(!log.contains('\r'));
    Ok(())
}

#[tokio::test]
async fn captures_stderr_and_records_exit_code() -> TestResult {
    init_tracing();

    let task = sh_task("Fail", "echo oops >&2; exit 3");
    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert_eq!(
        run.outcome,
        TaskOutcome::Failed(FailureReason::RetriesExhausted {
            exit_code: 3,
            tries: 1
        })
    );
    let log = run.item.output_lossy();
    assert!(log.contains("oops"));
    assert!(log.contains("Process Fail returned exit code 3 for Item a"));
    assert_eq!(run.item.errors()[0].exit_code, 3);
    Ok(())
}

#[tokio::test]
async fn retries_real_process_until_it_succeeds() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let script = "n=$(cat count 2>/dev/null || echo 0); n=$((n+1)); echo $n > count; \
                  echo attempt $n; [ $n -ge 3 ]";
    let task = sh_task("Flaky", script)
        .max_tries(Some(3))
        .cwd(Template::from(dir.path().to_string_lossy().into_owned()));

    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    assert_eq!(run.item.tries(), 3);
    assert_eq!(run.retries, 2);
    let log = run.item.output_lossy();
    assert!(log.contains("attempt 1"));
    assert!(log.contains("attempt 3"));
    Ok(())
}

#[tokio::test]
async fn stdin_content_is_written_then_closed() -> TestResult {
    init_tracing();

    let task = TaskDescriptor::new("Cat", vec![Template::from("cat")])
        .stdin(StdinSource::Template(Template::from("first {item_name}\nsecond\n")));

    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    let log = run.item.output_lossy();
    assert!(log.contains("first a"));
    assert!(log.contains("second"));
    Ok(())
}

#[tokio::test]
async fn empty_stdin_reads_end_of_file() -> TestResult {
    init_tracing();

    let task = sh_task("Read", "if read line; then exit 1; else echo eof; fi");
    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    assert!(run.item.output_lossy().contains("eof"));
    Ok(())
}

#[tokio::test]
async fn environment_replaces_parent_environment() -> TestResult {
    init_tracing();

    let env = BTreeMap::from([("GREETING".to_string(), Template::from("hi {item_name}"))]);
    let task = TaskDescriptor::new(
        "Env",
        vec![
            Template::from("/bin/sh"),
            Template::from("-c"),
            Template::from("printf '[%s][%s]\\n' \"$GREETING\" \"$HOME\""),
        ],
    )
    .env(env);

    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    assert!(run.item.output_lossy().contains("[hi a][]"));
    Ok(())
}

#[tokio::test]
async fn runs_in_configured_directory() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let expected = dir.path().canonicalize()?;
    let task = sh_task("Pwd", "pwd -P")
        .cwd(Template::from(dir.path().to_string_lossy().into_owned()));

    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    assert!(run.item.output_lossy().contains(&*expected.to_string_lossy()));
    Ok(())
}

#[tokio::test]
async fn output_larger_than_one_read_is_complete() -> TestResult {
    init_tracing();

    let task = sh_task("Big", "i=0; while [ $i -lt 2000 ]; do printf 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx'; i=$((i+1)); done");
    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(run.outcome.is_completed());
    let xs = run.item.output().iter().filter(|&&b| b == b'x').count();
    assert_eq!(xs, 2000 * 49);
    Ok(())
}

#[tokio::test]
async fn killed_process_reports_negative_signal() -> TestResult {
    init_tracing();

    let task = sh_task("Die", "kill -9 $$");
    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert_eq!(
        run.outcome,
        TaskOutcome::Failed(FailureReason::RetriesExhausted {
            exit_code: -9,
            tries: 1
        })
    );
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() -> TestResult {
    init_tracing();

    let task = TaskDescriptor::new(
        "Missing",
        vec![Template::from("/nonexistent/pipetask-no-such-binary")],
    )
    .max_tries(None);

    let (run, _) = with_timeout(run_on(task, Item::new("a"), &PtyBackend)).await;

    assert!(matches!(
        run.outcome,
        TaskOutcome::Failed(FailureReason::SpawnFailure(_))
    ));
    assert_eq!(run.item.tries(), 1);
    Ok(())
}
