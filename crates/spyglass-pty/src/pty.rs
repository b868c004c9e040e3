use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, ChildKiller as _, CommandBuilder, MasterPty, PtySize};

/// Errors from PTY operations.
#[derive(Debug)]
pub enum PtyError {
    SpawnFailed(String),
    IoError(std::io::Error),
    SessionClosed,
}

impl std::fmt::Display for PtyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PtyError::SpawnFailed(msg) => write!(f, "PTY spawn failed: {msg}"),
            PtyError::IoError(err) => write!(f, "PTY I/O error: {err}"),
            PtyError::SessionClosed => write!(f, "PTY session is closed"),
        }
    }
}

impl std::error::Error for PtyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PtyError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PtyError {
    fn from(err: std::io::Error) -> Self {
        PtyError::IoError(err)
    }
}

/// Owns a portable-pty child process, master pair, reader, and writer.
///
/// The pair is released exactly once: either through [`PtyHandle::close`]
/// or on drop.
pub struct PtyHandle {
    master: Option<Box<dyn MasterPty + Send>>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    child: Box<dyn Child + Send + Sync>,
}

impl PtyHandle {
    /// Spawn `cmd` on the slave side of a fresh PTY with the given
    /// dimensions.
    ///
    /// The dimensions are copied from the local terminal by the caller so
    /// the spawned program renders at the correct size.
    pub fn spawn(cmd: CommandBuilder, cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn command: {e}")))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to take writer: {e}")))?;

        Ok(Self {
            master: Some(pair.master),
            reader: Some(reader),
            writer: Some(writer),
            child,
        })
    }

    /// Write bytes to the PTY master (local keystrokes -> remote program).
    ///
    /// Fails with [`PtyError::SessionClosed`] once the handle has been
    /// closed.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        let writer = self.writer.as_mut().ok_or(PtyError::SessionClosed)?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Extract the output reader for use on a dedicated I/O thread.
    ///
    /// Reads from the returned reader block until the child produces output
    /// and return `Ok(0)` when it exits. Returns `None` if the reader was
    /// already taken or the handle is closed.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// Check if the child process is still alive.
    pub fn is_alive(&mut self) -> bool {
        self.try_wait().is_none()
    }

    /// Get the child process exit status if it has exited.
    ///
    /// Returns `None` if the process is still running.
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }

    /// Block until the child process exits and return its exit code.
    pub fn wait(&mut self) -> Result<u32, PtyError> {
        let status = self.child.wait()?;
        Ok(status.exit_code())
    }

    /// Terminate the child if it is still running and release the PTY
    /// descriptors. Idempotent.
    pub fn close(&mut self) {
        if self.master.is_none() && self.writer.is_none() {
            return;
        }
        if self.try_wait().is_none() {
            if let Err(e) = self.child.kill() {
                log::warn!("failed to kill PTY child: {e}");
            }
        }
        self.writer = None;
        self.reader = None;
        self.master = None;
    }
}
