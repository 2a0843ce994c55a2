// src/exec/exit_watcher.rs

//! Resolving the exit status of a process without blocking the loop.
//!
//! Hang-up on the output descriptor can be reported slightly before the
//! kernel makes the wait status available, so the watcher polls with a
//! non-blocking status check and sleeps on the tokio timer in between.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// Delay between two status checks.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Exit code reported when the status cannot be queried at all.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Non-blocking view of a running process.
pub trait ProcessHandle: Send {
    /// Exit code if the process has terminated, `None` while it runs.
    fn try_exit_code(&mut self) -> io::Result<Option<i32>>;

    fn pid(&self) -> Option<u32>;
}

impl ProcessHandle for tokio::process::Child {
    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self.try_wait()?.map(exit_code))
    }

    fn pid(&self) -> Option<u32> {
        self.id()
    }
}

/// Signed exit code: the process's own code, or `-signal` when it was killed.
pub fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => -signal,
        (None, None) => UNKNOWN_EXIT_CODE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPoll {
    Exited(i32),
    Pending,
}

#[derive(Debug, Clone)]
pub struct ExitWatcher {
    interval: Duration,
    polls: u32,
}

impl Default for ExitWatcher {
    fn default() -> Self {
        Self::new(EXIT_POLL_INTERVAL)
    }
}

impl ExitWatcher {
    pub fn new(interval: Duration) -> Self {
        Self { interval, polls: 0 }
    }

    /// Number of status checks performed so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// One non-blocking status check.
    pub fn poll(&mut self, process: &mut dyn ProcessHandle) -> ExitPoll {
        self.polls += 1;
        match process.try_exit_code() {
            Ok(Some(code)) => ExitPoll::Exited(code),
            Ok(None) => ExitPoll::Pending,
            Err(e) => {
                warn!(
                    pid = ?process.pid(),
                    error = %e,
                    "querying process status failed; reporting unknown exit code"
                );
                ExitPoll::Exited(UNKNOWN_EXIT_CODE)
            }
        }
    }

    /// Poll until an exit code is available, sleeping `interval` in between.
    pub async fn wait(&mut self, process: &mut dyn ProcessHandle) -> i32 {
        loop {
            match self.poll(process) {
                ExitPoll::Exited(code) => {
                    debug!(pid = ?process.pid(), exit_code = code, polls = self.polls, "process exited");
                    return code;
                }
                ExitPoll::Pending => sleep(self.interval).await,
            }
        }
    }
}
