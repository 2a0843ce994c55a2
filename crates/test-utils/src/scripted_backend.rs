#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pipetask::errors::{PipetaskError, Result};
use pipetask::exec::{OutputSource, ProcessBackend, ProcessHandle, Readiness, ResolvedCommand, RunHandle};
use tracing::debug;

/// What one scripted process attempt does.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    /// Output chunks, each delivered with its own readable notification.
    pub chunks: Vec<Vec<u8>>,
    pub exit_code: i32,
    /// Status checks answering "still running" once output has hung up.
    pub pending_polls: u32,
    /// Report hang-up in the same notification as the last chunk.
    pub hang_up_with_last_chunk: bool,
    /// `(read number, kind)` pairs failing the given `try_read` call.
    pub read_errors: Vec<(usize, io::ErrorKind)>,
    /// Readiness waits (1-based) that fail instead of reporting.
    pub ready_errors: Vec<usize>,
}

impl ScriptedRun {
    pub fn exits(exit_code: i32) -> Self {
        Self {
            chunks: Vec::new(),
            exit_code,
            pending_polls: 0,
            hang_up_with_last_chunk: false,
            read_errors: Vec::new(),
            ready_errors: Vec::new(),
        }
    }

    pub fn with_output(mut self, chunk: impl AsRef<[u8]>) -> Self {
        self.chunks.push(chunk.as_ref().to_vec());
        self
    }

    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn hang_up_with_last_chunk(mut self) -> Self {
        self.hang_up_with_last_chunk = true;
        self
    }

    pub fn with_read_error(mut self, at_read: usize, kind: io::ErrorKind) -> Self {
        self.read_errors.push((at_read, kind));
        self
    }

    pub fn with_ready_error(mut self, at_wait: usize) -> Self {
        self.ready_errors.push(at_wait);
        self
    }
}

#[derive(Debug, Clone)]
pub enum ScriptedAttempt {
    Run(ScriptedRun),
    SpawnError(String),
}

impl From<ScriptedRun> for ScriptedAttempt {
    fn from(run: ScriptedRun) -> Self {
        ScriptedAttempt::Run(run)
    }
}

#[derive(Default)]
struct Inner {
    attempts: VecDeque<ScriptedAttempt>,
    started: Vec<ResolvedCommand>,
}

/// A `ProcessBackend` that plays back scripted attempts in order.
///
/// Every `start` call is recorded, including the ones that fail. Once the
/// script is used up further starts fail with a spawn error.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedBackend {
    pub fn new(attempts: impl IntoIterator<Item = ScriptedAttempt>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                attempts: attempts.into_iter().collect(),
                started: Vec::new(),
            })),
        }
    }

    /// One silent attempt per exit code.
    pub fn exiting_with(codes: &[i32]) -> Self {
        Self::new(codes.iter().map(|&c| ScriptedRun::exits(c).into()))
    }

    pub fn push(&self, attempt: impl Into<ScriptedAttempt>) {
        self.inner.lock().unwrap().attempts.push_back(attempt.into());
    }

    pub fn started(&self) -> Vec<ResolvedCommand> {
        self.inner.lock().unwrap().started.clone()
    }

    pub fn start_count(&self) -> usize {
        self.inner.lock().unwrap().started.len()
    }

    pub fn remaining(&self) -> usize {
        self.inner.lock().unwrap().attempts.len()
    }
}

impl ProcessBackend for ScriptedBackend {
    fn start(&self, command: &ResolvedCommand) -> Result<RunHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.started.push(command.clone());

        let attempt = inner.attempts.pop_front();
        debug!(cmd = %command, remaining = inner.attempts.len(), ?attempt, "scripted start");

        match attempt {
            Some(ScriptedAttempt::Run(run)) => {
                let mut output =
                    ScriptedOutput::from_chunks(run.chunks, run.hang_up_with_last_chunk);
                for (at_read, kind) in run.read_errors {
                    output = output.with_read_error(at_read, kind);
                }
                for at_wait in run.ready_errors {
                    output = output.with_ready_error(at_wait);
                }
                let process = ScriptedProcess::new(run.exit_code, run.pending_polls);
                Ok(RunHandle {
                    output: Box::new(output),
                    process: Box::new(process),
                })
            }
            Some(ScriptedAttempt::SpawnError(msg)) => Err(PipetaskError::Spawn {
                program: command.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, msg),
            }),
            None => Err(PipetaskError::Spawn {
                program: command.program.clone(),
                source: io::Error::other("no scripted attempt left"),
            }),
        }
    }
}

/// In-memory `OutputSource` driven by a list of notifications.
///
/// Each notification makes its bytes readable and reports its readiness.
/// After the script ends every wait reports hang-up.
pub struct ScriptedOutput {
    notifications: VecDeque<(Readiness, Vec<u8>)>,
    buffered: VecDeque<u8>,
    hung_up: bool,
    max_read: usize,
    reads: Arc<Mutex<usize>>,
    read_errors: Vec<(usize, io::ErrorKind)>,
    waits: usize,
    ready_errors: Vec<usize>,
}

impl ScriptedOutput {
    pub fn new(notifications: Vec<(Readiness, Vec<u8>)>) -> Self {
        Self {
            notifications: notifications.into(),
            buffered: VecDeque::new(),
            hung_up: false,
            max_read: usize::MAX,
            reads: Arc::new(Mutex::new(0)),
            read_errors: Vec::new(),
            waits: 0,
            ready_errors: Vec::new(),
        }
    }

    /// One readable notification per chunk, then hang-up.
    pub fn from_chunks(chunks: Vec<Vec<u8>>, hang_up_with_last_chunk: bool) -> Self {
        let count = chunks.len();
        let mut notifications: Vec<(Readiness, Vec<u8>)> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let readiness = if hang_up_with_last_chunk && i + 1 == count {
                    Readiness::READABLE_AND_HANG_UP
                } else {
                    Readiness::READABLE
                };
                (readiness, chunk)
            })
            .collect();

        if !hang_up_with_last_chunk || count == 0 {
            notifications.push((Readiness::HANG_UP, Vec::new()));
        }
        Self::new(notifications)
    }

    /// Limit the bytes returned by a single `try_read`.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read.max(1);
        self
    }

    /// Fail the `at_read`-th `try_read` call (1-based) with `kind`. The
    /// buffered data stays in place.
    pub fn with_read_error(mut self, at_read: usize, kind: io::ErrorKind) -> Self {
        self.read_errors.push((at_read, kind));
        self
    }

    /// Fail the `at_wait`-th readiness wait (1-based). No notification is
    /// consumed by the failed wait.
    pub fn with_ready_error(mut self, at_wait: usize) -> Self {
        self.ready_errors.push(at_wait);
        self
    }

    /// Shared counter of `try_read` calls.
    pub fn read_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.reads)
    }

    /// Return the next readiness without awaiting anything.
    pub fn next_readiness(&mut self) -> Readiness {
        match self.notifications.pop_front() {
            Some((readiness, data)) => {
                self.buffered.extend(data);
                if readiness.hang_up {
                    self.hung_up = true;
                }
                readiness
            }
            None => {
                self.hung_up = true;
                Readiness::HANG_UP
            }
        }
    }
}

impl OutputSource for ScriptedOutput {
    fn ready(&mut self) -> Pin<Box<dyn Future<Output = io::Result<Readiness>> + Send + '_>> {
        self.waits += 1;
        if self.ready_errors.contains(&self.waits) {
            let err = io::Error::other("scripted readiness failure");
            return Box::pin(std::future::ready(Err(err)));
        }
        let readiness = self.next_readiness();
        Box::pin(std::future::ready(Ok(readiness)))
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read_no = {
            let mut reads = self.reads.lock().unwrap();
            *reads += 1;
            *reads
        };

        if let Some(pos) = self.read_errors.iter().position(|(at, _)| *at == read_no) {
            let (_, kind) = self.read_errors.remove(pos);
            return Err(io::Error::new(kind, "scripted read failure"));
        }

        if self.buffered.is_empty() {
            return if self.hung_up {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }

        let n = buf.len().min(self.max_read).min(self.buffered.len());
        for (slot, byte) in buf.iter_mut().zip(self.buffered.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

/// `ProcessHandle` that reports an exit code after some pending polls.
#[derive(Debug, Clone)]
pub struct ScriptedProcess {
    exit_code: i32,
    pending_polls: u32,
    status_error: bool,
}

impl ScriptedProcess {
    pub fn new(exit_code: i32, pending_polls: u32) -> Self {
        Self {
            exit_code,
            pending_polls,
            status_error: false,
        }
    }

    /// Every status check fails.
    pub fn failing() -> Self {
        Self {
            exit_code: 0,
            pending_polls: 0,
            status_error: true,
        }
    }
}

impl ProcessHandle for ScriptedProcess {
    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        if self.status_error {
            return Err(io::Error::other("status unavailable"));
        }
        if self.pending_polls > 0 {
            self.pending_polls -= 1;
            return Ok(None);
        }
        Ok(Some(self.exit_code))
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}
