//! Local keystroke routing.
//!
//! One blocking loop reads raw bytes from the local terminal and either
//! mutates focus, forwards to the focused node, or broadcasts to all of
//! them. The per-key special-casing (rotate keys, the recognized-key
//! allowlist, the double-write nudge) compensates for the remote monitor's
//! own refresh timing and is deliberately literal.

use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::focus::FocusState;
use crate::supervisor::SessionSet;

/// Keys the remote monitor is known to handle; anything else is
/// normalized to a space so stray bytes cannot desynchronize its key
/// handling.
pub const SUPPORTED_KEYS: &[u8] = b"ABEeltm0123<>RHVJcjxyzbq";

/// Quit key, broadcast to every node.
pub const KEY_QUIT: u8 = b'q';
/// Interrupt byte (Ctrl-C), broadcast to every node.
pub const KEY_INTERRUPT: u8 = 0x03;
/// Rotate focus forward.
pub const KEY_NEXT: u8 = b']';
/// Rotate focus backward.
pub const KEY_PREV: u8 = b'[';

/// Pause between a forwarded key and the trailing refresh space; the
/// remote pty needs an idle tick before it flushes the repaint.
const NUDGE_DELAY: Duration = Duration::from_millis(10);

/// What a single keystroke means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Deliver the byte to every session, then shut down.
    Broadcast(u8),
    /// Rotate focus and poke the newly focused session with a space.
    Rotate(isize),
    /// Forward the byte to the focused session, then nudge a repaint.
    Forward(u8),
    /// Unrecognized byte: forward a bare space instead.
    Refresh,
}

/// Classify one raw keystroke.
pub fn classify(byte: u8) -> KeyAction {
    match byte {
        KEY_QUIT | KEY_INTERRUPT => KeyAction::Broadcast(byte),
        KEY_NEXT => KeyAction::Rotate(1),
        KEY_PREV => KeyAction::Rotate(-1),
        byte if SUPPORTED_KEYS.contains(&byte) => KeyAction::Forward(byte),
        _ => KeyAction::Refresh,
    }
}

/// Translates local keystrokes into focus mutations and forwarded or
/// broadcast bytes.
pub struct InputRouter {
    sessions: Arc<SessionSet>,
    focus: Arc<FocusState>,
}

impl InputRouter {
    pub fn new(sessions: Arc<SessionSet>, focus: Arc<FocusState>) -> Self {
        Self { sessions, focus }
    }

    /// Dispatch keystrokes from `input` until a broadcast key arrives or
    /// the input ends.
    ///
    /// Blocks on terminal reads; run it on a dedicated blocking thread.
    /// Writes to sessions whose child already exited are no-ops.
    pub fn run(&self, mut input: impl Read) -> std::io::Result<()> {
        let mut byte = [0u8; 1];
        loop {
            if input.read(&mut byte)? == 0 {
                return Ok(());
            }

            match classify(byte[0]) {
                KeyAction::Broadcast(key) => {
                    self.sessions.broadcast(&[key]);
                    return Ok(());
                }
                KeyAction::Rotate(delta) => {
                    let focused = self.focus.rotate(delta);
                    self.sessions.write_to(focused, b" ");
                }
                KeyAction::Forward(key) => {
                    let focused = self.focus.get();
                    self.sessions.write_to(focused, &[key]);
                    // Second space after a pause forces the repaint out.
                    thread::sleep(NUDGE_DELAY);
                    self.sessions.write_to(focused, b" ");
                }
                KeyAction::Refresh => {
                    self.sessions.write_to(self.focus.get(), b" ");
                }
            }
        }
    }
}
