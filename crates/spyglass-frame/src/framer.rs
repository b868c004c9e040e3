use crate::frame::Frame;

/// The escape sequence a full-screen program emits to move the cursor to
/// the home position before repainting. Frame boundaries are keyed off it.
pub const HOME_MARKER: &[u8] = b"\x1b[H";

/// Carves a raw, arbitrarily chunked byte stream into complete screen
/// repaints.
///
/// The monitored program's very first paint happens before the pty size
/// negotiation settles and is garbage, so the framer starts with a boundary
/// count of two: the first frame it emits is the content between the first
/// and second marker occurrences. After that, every marker both closes the
/// current frame and opens the next.
///
/// Content after the last marker with no following marker is a repaint in
/// progress and is never emitted.
pub struct ScreenFramer {
    node_index: usize,
    buf: Vec<u8>,
    /// Markers required in the buffer before a frame can close: 2 during
    /// warm-up, 1 afterwards.
    boundary: usize,
    next_seq: u64,
}

impl ScreenFramer {
    pub fn new(node_index: usize) -> Self {
        Self {
            node_index,
            buf: Vec::new(),
            boundary: 2,
            next_seq: 1,
        }
    }

    /// Append a chunk of pty output and return every frame it completes,
    /// in arrival order.
    ///
    /// A chunk may complete zero, one, or several frames; markers may be
    /// split across chunk boundaries.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let body = if self.boundary == 2 {
                let Some(first) = find_marker(&self.buf, 0) else {
                    break;
                };
                let Some(second) = find_marker(&self.buf, first + HOME_MARKER.len()) else {
                    break;
                };
                // Everything before the first marker is pre-paint noise.
                let body = self.buf[first + HOME_MARKER.len()..second].to_vec();
                self.buf.drain(..second + HOME_MARKER.len());
                self.boundary = 1;
                body
            } else {
                let Some(pos) = find_marker(&self.buf, 0) else {
                    break;
                };
                let body = self.buf[..pos].to_vec();
                self.buf.drain(..pos + HOME_MARKER.len());
                body
            };

            let seq = self.next_seq;
            self.next_seq += 1;
            frames.push(Frame {
                node_index: self.node_index,
                seq,
                text: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        frames
    }
}

fn find_marker(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(HOME_MARKER.len())
        .position(|w| w == HOME_MARKER)
        .map(|p| p + from)
}
