//! spyglass-pty: pseudo-terminal supervision for spyglass.
//!
//! Each job node gets one remote monitor process attached to a dedicated
//! pseudo-terminal, so the remote program believes it is talking to a real
//! terminal and produces cursor-addressed full-screen repaints. This crate
//! owns that process lifecycle: spawn, blocking output stream, input
//! forwarding, and teardown.
//!
//! # Architecture
//!
//! - [`PtyHandle`] — low-level pty process management (spawn, read, write,
//!   reap).
//! - [`NodeSession`] — one `PtyHandle` bound to one node's `ssh` monitor
//!   invocation, tagged with the node's index and address.

pub mod pty;
pub mod session;

pub use pty::{PtyError, PtyHandle};
pub use session::{monitor_command, NodeSession, DEFAULT_MONITOR};
