//! spyglass-frame: screen-refresh framing for spyglass.
//!
//! A full-screen monitor such as `top` repaints by moving the cursor to the
//! home position and redrawing everything. This crate turns the raw byte
//! stream coming out of a node's pty into a sequence of discrete, complete
//! screen repaints keyed off that home-position marker. It is content
//! agnostic: nothing past the frame boundary is interpreted.
//!
//! # Architecture
//!
//! - [`Frame`] — one complete repaint, tagged with its node index and a
//!   monotonic sequence number.
//! - [`ScreenFramer`] — the accumulation buffer and boundary logic that
//!   carves frames out of arbitrarily chunked input.

pub mod frame;
pub mod framer;

pub use frame::Frame;
pub use framer::{ScreenFramer, HOME_MARKER};
