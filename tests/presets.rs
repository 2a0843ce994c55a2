// tests/presets.rs

use std::collections::BTreeSet;
use std::time::Duration;

use pipetask::exec::ResolvedCommand;
use pipetask::item::Item;
use pipetask::realize::Template;
use pipetask::task::presets::{RSYNC_TASK_NAME, WGET_TASK_NAME};
use pipetask::task::{RsyncOptions, WgetOptions, relative_path, rsync_upload, wget_download};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn wget_defaults_to_single_try() -> TestResult {
    let task = wget_download(
        vec![Template::from("wget"), Template::from("-O"), Template::from("{dir}/index.html"), Template::key("url")],
        WgetOptions::default(),
    );

    assert_eq!(task.name(), WGET_TASK_NAME);
    assert_eq!(task.policy().max_tries, Some(1));
    assert_eq!(task.policy().retry_delay, Duration::from_secs(30));
    assert_eq!(task.policy().accept_on_exit_code, BTreeSet::from([0]));
    assert!(task.env_template().is_none());

    let item = Item::new("page")
        .with_property("dir", "out/page")
        .with_property("url", "http://example.com/");
    let cmd = ResolvedCommand::resolve(&task, &item)?;
    assert_eq!(cmd.program, "wget");
    assert_eq!(cmd.args, vec!["-O", "out/page/index.html", "http://example.com/"]);
    assert_eq!(cmd.stdin, None);
    Ok(())
}

#[test]
fn wget_options_are_passed_through() {
    let options = WgetOptions {
        max_tries: Some(4),
        retry_delay: Duration::from_secs(2),
        accept_on_exit_code: BTreeSet::from([0, 8]),
        retry_on_exit_code: Some(BTreeSet::from([4])),
        env: None,
    };
    let task = wget_download(vec![Template::from("wget")], options);

    assert_eq!(task.policy().max_tries, Some(4));
    assert_eq!(task.policy().retry_delay, Duration::from_secs(2));
    assert!(task.policy().accepts(8));
    assert_eq!(task.policy().retry_on_exit_code, Some(BTreeSet::from([4])));
}

#[test]
fn rsync_builds_fixed_argument_vector() -> TestResult {
    let task = rsync_upload(
        Template::from("rsync://host/module/{item_name}/"),
        vec![Template::from("a/b.txt")],
        RsyncOptions {
            target_source_path: Template::from("a/"),
            bwlimit: Template::from("500"),
            ..RsyncOptions::default()
        },
    );

    assert_eq!(task.name(), RSYNC_TASK_NAME);
    assert_eq!(task.policy().max_tries, None);

    let cmd = ResolvedCommand::resolve(&task, &Item::new("x"))?;
    assert_eq!(cmd.program, "rsync");
    assert_eq!(
        cmd.args,
        vec![
            "-avz",
            "--compress-level=9",
            "--timeout=30",
            "--contimeout=30",
            "--progress",
            "--bwlimit",
            "500",
            "--files-from=-",
            "a/",
            "rsync://host/module/x/",
        ]
    );
    Ok(())
}

#[test]
fn rsync_stdin_lists_files_relative_to_source() -> TestResult {
    let task = rsync_upload(
        Template::from("rsync://host/module/"),
        vec![Template::from("a/b.txt"), Template::from("a/c.txt")],
        RsyncOptions {
            target_source_path: Template::from("a/"),
            ..RsyncOptions::default()
        },
    );

    let cmd = ResolvedCommand::resolve(&task, &Item::new("x"))?;
    assert_eq!(cmd.stdin.as_deref(), Some("b.txt\nc.txt\n"));
    Ok(())
}

#[test]
fn rsync_file_lists_expand_item_properties() -> TestResult {
    let task = rsync_upload(
        Template::from("target/"),
        vec![Template::expand("files")],
        RsyncOptions {
            target_source_path: Template::from("{dir}"),
            ..RsyncOptions::default()
        },
    );
    let item = Item::new("x")
        .with_property("dir", "data/x")
        .with_property("files", vec!["data/x/one.warc".to_string(), "data/x/logs/two.log".to_string()]);

    let cmd = ResolvedCommand::resolve(&task, &item)?;
    assert_eq!(cmd.stdin.as_deref(), Some("one.warc\nlogs/two.log\n"));
    Ok(())
}

#[test]
fn rsync_default_bwlimit_is_zero() -> TestResult {
    let task = rsync_upload(Template::from("t/"), Vec::new(), RsyncOptions::default());
    let cmd = ResolvedCommand::resolve(&task, &Item::new("x"))?;

    let pos = cmd.args.iter().position(|a| a == "--bwlimit").ok_or("no --bwlimit")?;
    assert_eq!(cmd.args[pos + 1], "0");
    assert_eq!(cmd.args[cmd.args.len() - 2], "./");
    assert_eq!(cmd.stdin.as_deref(), Some(""));
    Ok(())
}

#[test]
fn relative_paths_are_lexical() -> TestResult {
    use std::path::Path;

    assert_eq!(relative_path(Path::new("/srv/a/b.txt"), Path::new("/srv/a"))?, Path::new("b.txt"));
    assert_eq!(relative_path(Path::new("/srv/b/c.txt"), Path::new("/srv/a/"))?, Path::new("../b/c.txt"));
    assert_eq!(relative_path(Path::new("a/./x/../y"), Path::new("a"))?, Path::new("y"));
    assert_eq!(relative_path(Path::new("/srv/a"), Path::new("/srv/a/"))?, Path::new("."));
    Ok(())
}
