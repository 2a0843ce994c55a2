// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The task runner talks to a `ProcessBackend` instead of spawning processes
//! directly. This makes it easy to swap in a scripted backend in tests while
//! keeping the production pty implementation in [`PtyBackend`].

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::errors::{PipetaskError, Result};
use crate::exec::command::ResolvedCommand;
use crate::exec::exit_watcher::ProcessHandle;
use crate::exec::pty::{PtyOutput, open_pty};
use crate::exec::pump::OutputSource;

/// One started process attempt.
pub struct RunHandle {
    pub output: Box<dyn OutputSource>,
    pub process: Box<dyn ProcessHandle>,
}

impl RunHandle {
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }
}

/// Trait abstracting how a process attempt is started.
///
/// Production code uses [`PtyBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send + Sync {
    /// Start one attempt. The returned output source must already be
    /// non-blocking. Failure to create the process is returned as an error.
    fn start(&self, command: &ResolvedCommand) -> Result<RunHandle>;
}

/// Real backend: stdout and stderr on a pseudo-terminal, stdin on a pipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtyBackend;

impl ProcessBackend for PtyBackend {
    fn start(&self, command: &ResolvedCommand) -> Result<RunHandle> {
        let pty = open_pty()?;
        let stderr_slave = pty.slave.try_clone().map_err(PipetaskError::Pty)?;

        let mut child = {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .stdin(Stdio::piped())
                .stdout(Stdio::from(pty.slave))
                .stderr(Stdio::from(stderr_slave));

            if let Some(env) = &command.env {
                cmd.env_clear().envs(env);
            }
            if let Some(cwd) = &command.cwd {
                cmd.current_dir(cwd);
            }

            // `cmd` owns the parent's copies of the slave; they are closed when
            // it is dropped at the end of this block so hang-up can be seen.
            cmd.spawn().map_err(|source| PipetaskError::Spawn {
                program: command.program.clone(),
                source,
            })?
        };

        info!(pid = ?child.id(), cmd = %command, "process started");

        if let Some(stdin) = child.stdin.take() {
            match command.stdin.clone() {
                Some(content) if !content.is_empty() => {
                    tokio::spawn(feed_stdin(stdin, content));
                }
                _ => drop(stdin),
            }
        }

        let output = PtyOutput::new(pty.master)?;

        Ok(RunHandle {
            output: Box::new(output),
            process: Box::new(child),
        })
    }
}

/// Write all of `content` and close the pipe.
async fn feed_stdin(mut stdin: ChildStdin, content: String) {
    match stdin.write_all(content.as_bytes()).await {
        Ok(()) => debug!(bytes = content.len(), "stdin written"),
        Err(e) => warn!(error = %e, "writing process stdin failed"),
    }
    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "closing process stdin failed");
    }
}
