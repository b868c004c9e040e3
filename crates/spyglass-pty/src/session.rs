use std::io::Read;

use portable_pty::CommandBuilder;

use crate::pty::{PtyError, PtyHandle};

/// Remote monitor program run on each node when `SPYGLASS_MONITOR` is
/// unset.
pub const DEFAULT_MONITOR: &str = "top";

/// Returns the monitor command to run on each node.
///
/// Any interactive full-screen program that repaints from the cursor home
/// position works; `nmon` is a known-good alternative to the default.
pub fn monitor_command() -> String {
    std::env::var("SPYGLASS_MONITOR").unwrap_or_else(|_| DEFAULT_MONITOR.to_string())
}

/// One remote monitor process for one job node.
///
/// Pairs a [`PtyHandle`] with the node's identity. The supervisor owns the
/// session for lifecycle purposes; the input router writes through it and
/// the node's I/O thread reads from the extracted reader. Only the
/// supervisor closes it, after the child has exited.
pub struct NodeSession {
    node_index: usize,
    addr: String,
    pty: PtyHandle,
    alive: bool,
    exit_code: Option<u32>,
}

impl NodeSession {
    /// Open a session to `addr`: allocate a pty pair sized `cols` x `rows`
    /// (the local terminal's geometry) and spawn `ssh <addr> -t <monitor>`
    /// with its streams bound to the slave side.
    pub fn open(
        node_index: usize,
        addr: &str,
        monitor: &str,
        cols: u16,
        rows: u16,
    ) -> Result<Self, PtyError> {
        let mut cmd = CommandBuilder::new("ssh");
        cmd.arg(addr);
        cmd.arg("-t");
        cmd.arg(monitor);
        Self::with_command(node_index, addr, cmd, cols, rows)
    }

    /// Open a session running an arbitrary command instead of the ssh
    /// monitor invocation.
    pub fn with_command(
        node_index: usize,
        addr: &str,
        cmd: CommandBuilder,
        cols: u16,
        rows: u16,
    ) -> Result<Self, PtyError> {
        let pty = PtyHandle::spawn(cmd, cols, rows)?;
        log::debug!("node {node_index} ({addr}): session opened");
        Ok(Self {
            node_index,
            addr: addr.to_string(),
            pty,
            alive: true,
            exit_code: None,
        })
    }

    pub fn node_index(&self) -> usize {
        self.node_index
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Forward raw input bytes to the remote program.
    ///
    /// Reports [`PtyError::SessionClosed`] once the child has exited; the
    /// router treats that as a no-op.
    pub fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError> {
        if !self.is_alive() {
            return Err(PtyError::SessionClosed);
        }
        self.pty.write(data)
    }

    /// Extract the blocking output reader for this node's I/O thread.
    ///
    /// The reader lives outside the session mutex so blocking reads never
    /// hold up input routing or teardown. Returns `None` on a second call.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.pty.take_reader()
    }

    /// Check if the remote process is still running.
    pub fn is_alive(&mut self) -> bool {
        if self.alive {
            if let Some(code) = self.pty.try_wait() {
                self.alive = false;
                self.exit_code = Some(code);
            }
        }
        self.alive
    }

    /// Get the exit code if the remote process has exited.
    pub fn exit_code(&mut self) -> Option<u32> {
        if self.exit_code.is_none() {
            if let Some(code) = self.pty.try_wait() {
                self.alive = false;
                self.exit_code = Some(code);
            }
        }
        self.exit_code
    }

    /// Block until the remote process exits and return its exit code.
    pub fn wait(&mut self) -> Result<u32, PtyError> {
        let code = self.pty.wait()?;
        self.alive = false;
        self.exit_code = Some(code);
        log::debug!("node {} ({}): child exited with {code}", self.node_index, self.addr);
        Ok(code)
    }

    /// Terminate the session and release the pty pair. Idempotent.
    pub fn close(&mut self) {
        self.alive = false;
        self.pty.close();
    }
}
