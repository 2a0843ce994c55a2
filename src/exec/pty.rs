// src/exec/pty.rs

//! Pseudo-terminal allocation and the non-blocking master reader.

use std::fs::File;
use std::future::Future;
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::pin::Pin;

use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};
use nix::pty::{Winsize, openpty};
use nix::sys::termios::Termios;
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use crate::errors::{PipetaskError, Result};
use crate::exec::pump::{OutputSource, Readiness};

/// Both ends of a freshly allocated pty.
#[derive(Debug)]
pub struct PtyPair {
    pub master: OwnedFd,
    pub slave: OwnedFd,
}

/// Allocate a pty pair with both ends marked close-on-exec, so the child only
/// sees the slave through the descriptors it is explicitly given.
pub fn open_pty() -> Result<PtyPair> {
    let pty = openpty(None::<&Winsize>, None::<&Termios>).map_err(|e| PipetaskError::Pty(e.into()))?;

    set_cloexec(pty.master.as_fd())?;
    set_cloexec(pty.slave.as_fd())?;

    Ok(PtyPair {
        master: pty.master,
        slave: pty.slave,
    })
}

fn set_cloexec(fd: BorrowedFd<'_>) -> Result<()> {
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(|e| PipetaskError::Pty(e.into()))?;
    Ok(())
}

fn set_nonblocking(fd: BorrowedFd<'_>) -> Result<()> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| PipetaskError::Pty(e.into()))?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| PipetaskError::Pty(e.into()))?;
    Ok(())
}

/// The pty master, switched to non-blocking mode and registered with the
/// reactor. Dropping it deregisters and closes the descriptor.
#[derive(Debug)]
pub struct PtyOutput {
    fd: AsyncFd<File>,
}

impl PtyOutput {
    pub fn new(master: OwnedFd) -> Result<Self> {
        set_nonblocking(master.as_fd())?;
        let fd = AsyncFd::with_interest(File::from(master), Interest::READABLE)
            .map_err(PipetaskError::Pty)?;
        Ok(Self { fd })
    }
}

impl OutputSource for PtyOutput {
    fn ready(&mut self) -> Pin<Box<dyn Future<Output = io::Result<Readiness>> + Send + '_>> {
        Box::pin(async move {
            let mut guard = self.fd.ready(Interest::READABLE).await?;
            let ready = guard.ready();
            // Edge-triggered: the pump drains until WouldBlock, so any data
            // arriving after this point produces a fresh notification.
            guard.clear_ready();
            Ok(Readiness {
                readable: ready.is_readable(),
                hang_up: ready.is_read_closed(),
            })
        })
    }

    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file: &File = self.fd.get_ref();
        match file.read(buf) {
            // Linux reports a closed slave as EIO on the master.
            Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => Ok(0),
            other => other,
        }
    }
}
