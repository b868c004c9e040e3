/// One complete full-screen repaint captured from a node's output stream.
///
/// Frames are immutable once emitted. Consumers keep at most the latest
/// frame per node; there is no history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Index of the node this repaint came from, stable for the session.
    pub node_index: usize,
    /// Monotonic per-node sequence number, starting at 1.
    pub seq: u64,
    /// The repaint body, exactly as the remote program wrote it (its own
    /// escape codes included), minus the boundary markers.
    pub text: String,
}

impl Frame {
    /// Lines of the repaint, in screen order.
    ///
    /// The final line is a repaint still in progress when the next boundary
    /// arrived; renderers skip it.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split() {
        let frame = Frame {
            node_index: 0,
            seq: 1,
            text: "top - 12:00\nTasks: 8\npartial".to_string(),
        };
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines, vec!["top - 12:00", "Tasks: 8", "partial"]);
    }

    #[test]
    fn test_lines_empty_frame() {
        let frame = Frame {
            node_index: 0,
            seq: 1,
            text: String::new(),
        };
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines, vec![""]);
    }
}
