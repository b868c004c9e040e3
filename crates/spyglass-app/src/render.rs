//! Terminal painting.
//!
//! One dedicated renderer task consumes the single-slot latest-frame
//! handoff and repaints the screen, so terminal writes are never
//! interleaved between node workers. The frame body is passed through
//! verbatim; the remote program's own escape codes do the in-frame
//! formatting.

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, queue, terminal};
use tokio::sync::watch;

use spyglass_frame::Frame;
use spyglass_slurm::{JobSummary, StatusCell};

use crate::focus::FocusState;

/// Status bar colors, distinct from the monitor body.
const STATUS_BG: Color = Color::DarkBlue;
const STATUS_FG: Color = Color::White;

/// Paints the focused node's latest frame plus a one-line status bar.
pub struct Renderer {
    focus: Arc<FocusState>,
    status: Arc<StatusCell>,
    /// Nodes whose session never started, reported on every status line.
    dead_nodes: Vec<String>,
}

impl Renderer {
    pub fn new(focus: Arc<FocusState>, status: Arc<StatusCell>, dead_nodes: Vec<String>) -> Self {
        Self {
            focus,
            status,
            dead_nodes,
        }
    }

    /// Paint `frame` to the local terminal if its node is still focused.
    pub fn paint(&self, frame: &Frame) -> io::Result<()> {
        let (cols, _) = terminal::size()?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.paint_to(&mut out, frame, cols as usize)?;
        Ok(())
    }

    /// Paint into `out`; returns whether the frame was actually drawn.
    ///
    /// A frame whose node lost focus between production and delivery is
    /// skipped; the next frame from the newly focused node paints over
    /// whatever is on screen.
    fn paint_to(&self, out: &mut impl Write, frame: &Frame, width: usize) -> io::Result<bool> {
        if frame.node_index != self.focus.get() {
            return Ok(false);
        }

        let summary = self.status.snapshot();
        let status_line = compose_status(&summary, frame.node_index, &self.dead_nodes, width);
        render_frame(out, frame, &status_line)?;
        Ok(true)
    }
}

/// Run the dedicated renderer worker over the latest-frame handoff.
///
/// Ends when every frame producer is gone.
pub fn start_render_task(
    mut frame_rx: watch::Receiver<Option<Frame>>,
    renderer: Renderer,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while frame_rx.changed().await.is_ok() {
            let frame = frame_rx.borrow_and_update().clone();
            if let Some(frame) = frame {
                if let Err(err) = renderer.paint(&frame) {
                    log::warn!("render failed: {err}");
                }
            }
        }
    })
}

/// Write one repaint: cursor home, cursor hidden, every body line except
/// the last verbatim with CRLF, then the colored status bar.
fn render_frame(out: &mut impl Write, frame: &Frame, status_line: &str) -> io::Result<()> {
    queue!(out, cursor::MoveTo(0, 0), cursor::Hide)?;

    let lines: Vec<&str> = frame.lines().collect();
    // The final line is a repaint in progress; the status bar replaces it.
    for line in &lines[..lines.len() - 1] {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\r\n")?;
    }

    queue!(
        out,
        SetBackgroundColor(STATUS_BG),
        SetForegroundColor(STATUS_FG),
        Print(status_line),
        ResetColor
    )?;
    out.flush()
}

/// Compose the status line, right-padded (and truncated) to `width`.
fn compose_status(
    summary: &JobSummary,
    monitor_index: usize,
    dead_nodes: &[String],
    width: usize,
) -> String {
    let monitor = summary
        .nodes
        .get(monitor_index)
        .map(String::as_str)
        .unwrap_or("?");

    let mut text = format!(
        "Job: {}  Status: {}  Partition: {}  Time: {}  Monitor: {}",
        summary.id, summary.status, summary.partition, summary.elapsed, monitor
    );
    if !dead_nodes.is_empty() {
        text.push_str(&format!("  Down: {}", dead_nodes.join(",")));
    }

    if text.len() < width {
        let pad = width - text.len();
        text.extend(std::iter::repeat(' ').take(pad));
    } else {
        text.truncate(width);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use spyglass_slurm::JobStatus;

    fn summary() -> JobSummary {
        JobSummary {
            id: "1234".to_string(),
            status: JobStatus::Running,
            partition: "batch".to_string(),
            elapsed: "1:23".to_string(),
            nodes: vec!["n01".to_string(), "n02".to_string()],
        }
    }

    fn frame(node_index: usize, text: &str) -> Frame {
        Frame {
            node_index,
            seq: 1,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_compose_status_content_and_padding() {
        let line = compose_status(&summary(), 0, &[], 120);
        assert!(line.starts_with(
            "Job: 1234  Status: RUNNING  Partition: batch  Time: 1:23  Monitor: n01"
        ));
        assert_eq!(line.len(), 120);
        assert!(line.ends_with(' '));
    }

    #[test]
    fn test_compose_status_truncates_to_width() {
        let line = compose_status(&summary(), 1, &[], 20);
        assert_eq!(line.len(), 20);
        assert_eq!(line, "Job: 1234  Status: R");
    }

    #[test]
    fn test_compose_status_reports_dead_nodes() {
        let dead = vec!["n02".to_string()];
        let line = compose_status(&summary(), 0, &dead, 120);
        assert!(line.contains("Down: n02"));
    }

    #[test]
    fn test_compose_status_out_of_range_monitor() {
        let line = compose_status(&summary(), 9, &[], 80);
        assert!(line.contains("Monitor: ?"));
    }

    #[test]
    fn test_render_frame_layout() {
        let mut out = Vec::new();
        let frame = frame(0, "line one\nline two\npartial tail");
        render_frame(&mut out, &frame, "STATUS").unwrap();
        let text = String::from_utf8(out).unwrap();

        // Cursor home + hide come first.
        assert!(text.starts_with("\x1b[1;1H\x1b[?25l"));
        // Every line but the last, each with CRLF.
        assert!(text.contains("line one\r\nline two\r\n"));
        assert!(!text.contains("partial tail"));
        // Colored status bar, then attribute reset.
        assert!(text.contains("STATUS"));
        assert!(text.contains("\x1b[0m"));
    }

    #[test]
    fn test_paint_gated_by_focus() {
        let focus = Arc::new(FocusState::new(2));
        let status = StatusCell::new(summary());
        let renderer = Renderer::new(Arc::clone(&focus), status, Vec::new());

        // Focused node paints and the status bar names its address.
        let mut out = Vec::new();
        assert!(renderer.paint_to(&mut out, &frame(0, "a\nb"), 80).unwrap());
        let painted = String::from_utf8_lossy(&out).into_owned();
        assert!(painted.contains("Monitor: n01"));

        // After a rotate, a stale frame for the old focus is not painted.
        focus.rotate(1);
        let mut out = Vec::new();
        assert!(!renderer.paint_to(&mut out, &frame(0, "a\nb"), 80).unwrap());
        assert!(out.is_empty());

        // The newly focused node paints with its own address.
        let mut out = Vec::new();
        assert!(renderer.paint_to(&mut out, &frame(1, "c\nd"), 80).unwrap());
        let painted = String::from_utf8_lossy(&out).into_owned();
        assert!(painted.contains("Monitor: n02"));
    }
}
