// src/exec/pump.rs

//! Forwarding process output into the item log.
//!
//! The pump reacts to readiness notifications on the output descriptor:
//! readable data is drained until the read would block, and hang-up (or EOF)
//! closes the descriptor after everything still buffered has been drained.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tracing::{debug, trace, warn};

use crate::item::Item;

const READ_BUFFER_SIZE: usize = 8192;

/// Conditions reported by one readiness notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub readable: bool,
    pub hang_up: bool,
}

impl Readiness {
    pub const READABLE: Readiness = Readiness {
        readable: true,
        hang_up: false,
    };
    pub const HANG_UP: Readiness = Readiness {
        readable: false,
        hang_up: true,
    };
    pub const READABLE_AND_HANG_UP: Readiness = Readiness {
        readable: true,
        hang_up: true,
    };
}

/// Non-blocking byte source registered with the event loop.
///
/// `try_read` must never block: it returns `WouldBlock` when no data is
/// available and `Ok(0)` at end of stream.
pub trait OutputSource: Send {
    /// Wait for the next readiness notification.
    fn ready(&mut self) -> Pin<Box<dyn Future<Output = io::Result<Readiness>> + Send + '_>>;

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Result of handling one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Descriptor still open; wait for the next notification.
    Open,
    /// Output ended during this notification; the descriptor is now closed.
    HungUp,
    /// The descriptor was closed earlier; nothing was done.
    Closed,
}

pub struct OutputPump {
    source: Option<Box<dyn OutputSource>>,
    buf: Vec<u8>,
    bytes_forwarded: u64,
}

impl OutputPump {
    pub fn new(source: Box<dyn OutputSource>) -> Self {
        Self {
            source: Some(source),
            buf: vec![0; READ_BUFFER_SIZE],
            bytes_forwarded: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    pub fn bytes_forwarded(&self) -> u64 {
        self.bytes_forwarded
    }

    /// Handle one readiness notification.
    ///
    /// Pending data is always drained before a hang-up is acted upon.
    pub fn on_ready(&mut self, readiness: Readiness, item: &mut Item) -> PumpStatus {
        let Some(source) = self.source.as_mut() else {
            return PumpStatus::Closed;
        };

        let mut ended = readiness.hang_up;

        if readiness.readable || readiness.hang_up {
            loop {
                match source.try_read(&mut self.buf) {
                    Ok(0) => {
                        ended = true;
                        break;
                    }
                    Ok(n) => {
                        trace!(item = %item.name(), bytes = n, "forwarding output");
                        item.log_output(&self.buf[..n]);
                        self.bytes_forwarded += n as u64;
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(
                            item = %item.name(),
                            error = %e,
                            "unexpected error reading process output; treating as hang-up"
                        );
                        ended = true;
                        break;
                    }
                }
            }
        }

        if ended {
            self.close(item);
            PumpStatus::HungUp
        } else {
            PumpStatus::Open
        }
    }

    /// Pump notifications until the output hangs up.
    pub async fn run(&mut self, item: &mut Item) {
        loop {
            let readiness = match self.source.as_mut() {
                Some(source) => source.ready().await,
                None => return,
            };

            let readiness = match readiness {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        item = %item.name(),
                        error = %e,
                        "waiting for output readiness failed; treating as hang-up"
                    );
                    Readiness::HANG_UP
                }
            };

            if self.on_ready(readiness, item) != PumpStatus::Open {
                return;
            }
        }
    }

    fn close(&mut self, item: &Item) {
        if self.source.take().is_some() {
            debug!(
                item = %item.name(),
                bytes = self.bytes_forwarded,
                "output hung up; descriptor closed"
            );
        }
    }
}
