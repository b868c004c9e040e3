use std::io;

use crossterm::{cursor, execute, terminal};

/// Puts the local terminal into raw mode for byte-level keystroke reads
/// and guarantees restoration on every exit path.
///
/// Dropping the guard leaves raw mode and re-shows the cursor (the
/// renderer hides it on every paint).
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn new() -> io::Result<RawModeGuard> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}
