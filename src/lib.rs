// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod item;
pub mod logging;
pub mod realize;
pub mod task;
pub mod types;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::pipeline::describe_templates;
use crate::engine::{Pipeline, Runtime};
use crate::exec::{PtyBackend, ResolvedCommand};
use crate::item::{Item, OutputEcho};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - pipeline + items
/// - the pty process backend
/// - the runtime
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let pipeline = cfg.pipeline()?;
    let mut items = cfg.items(&args.items)?;

    if args.dry_run {
        print_dry_run(&cfg, &pipeline, &items);
        return Ok(());
    }

    if args.echo_output || cfg.config.echo_output {
        let echo = stdout_echo();
        items = items
            .into_iter()
            .map(|item| item.with_echo(Arc::clone(&echo)))
            .collect();
    }

    let runtime = Runtime::new(pipeline, Arc::new(PtyBackend));
    let report = runtime.run(items).await?;

    for failed in &report.failed {
        info!(
            item = %failed.item.name(),
            task = %failed.task,
            reason = %failed.reason,
            "item failed"
        );
    }

    if !report.is_success() {
        bail!(
            "{} of {} item(s) failed",
            report.failed.len(),
            report.failed.len() + report.completed.len()
        );
    }

    Ok(())
}

/// Write every output chunk to stdout as it arrives.
fn stdout_echo() -> OutputEcho {
    Arc::new(|item: &str, data: &[u8]| {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(data).and_then(|()| out.flush()) {
            debug!(item, error = %e, "echoing output to stdout failed");
        }
    })
}

/// Simple dry-run output: print tasks and the commands each item would run.
fn print_dry_run(cfg: &ConfigFile, pipeline: &Pipeline, items: &[Item]) {
    println!("pipetask dry-run: {}", pipeline.name());
    println!();

    println!("tasks ({}):", pipeline.tasks().len());
    for (task, section) in pipeline.tasks().iter().zip(cfg.task.iter()) {
        let policy = task.policy();
        println!("  - {task} ({})", section.kind);
        println!("      args: {}", describe_templates(task.args()));
        match policy.max_tries {
            Some(n) => println!("      max_tries: {n}"),
            None => println!("      max_tries: unlimited"),
        }
        println!("      retry_delay: {}s", policy.retry_delay.as_secs());
        println!("      accept_on_exit_code: {:?}", policy.accept_on_exit_code);
        if let Some(ref codes) = policy.retry_on_exit_code {
            println!("      retry_on_exit_code: {codes:?}");
        }
    }
    println!();

    println!("items ({}):", items.len());
    for item in items {
        println!("  - {}", item.name());
        for task in pipeline.tasks() {
            // Realization uses `tries = 1`, as on a first attempt.
            let mut probe = item.clone();
            probe.set_tries(1);
            match ResolvedCommand::resolve(task, &probe) {
                Ok(cmd) => {
                    println!("      {task}: {cmd}");
                    if let Some(stdin) = cmd.stdin.as_deref().filter(|s| !s.is_empty()) {
                        for line in stdin.lines() {
                            println!("        stdin: {line}");
                        }
                    }
                }
                Err(e) => println!("      {task}: cannot resolve: {e}"),
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
