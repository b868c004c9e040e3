//! Per-node session supervision.
//!
//! Each node gets its own dedicated OS thread for the blocking
//! read-and-frame loop, because pty reads block. Session handles live
//! behind short-lived mutexes; the pty reader is extracted before the
//! session goes behind its lock, so blocking reads never hold up input
//! routing or teardown.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tokio::sync::watch;

use spyglass_frame::{Frame, ScreenFramer};
use spyglass_pty::{NodeSession, PtyError};
use spyglass_slurm::JobSummary;

use crate::focus::FocusState;

/// Index-aligned shared view of the per-node sessions.
///
/// A `None` slot is a node whose session failed to start; it stays blank
/// for the whole run. The input router writes through this set; only the
/// supervisor manages lifecycle.
pub struct SessionSet {
    slots: Vec<Option<Arc<Mutex<NodeSession>>>>,
}

impl SessionSet {
    /// Forward bytes to one node's session.
    ///
    /// Absent slots and sessions whose child has exited are a no-op.
    pub fn write_to(&self, index: usize, data: &[u8]) {
        let Some(Some(session)) = self.slots.get(index) else {
            return;
        };
        let mut session = match session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match session.write_input(data) {
            Ok(()) | Err(PtyError::SessionClosed) => {}
            Err(err) => log::debug!("write to node {index} failed: {err}"),
        }
    }

    /// Deliver `data` to every open session, once each.
    pub fn broadcast(&self, data: &[u8]) {
        for index in 0..self.slots.len() {
            self.write_to(index, data);
        }
    }
}

#[cfg(test)]
impl SessionSet {
    /// A set with no sessions at all, for router tests.
    pub(crate) fn empty() -> Self {
        Self { slots: Vec::new() }
    }
}

/// Owns the per-node (session, framer) pairs as a unit: startup,
/// join-on-exit, teardown.
pub struct SessionSupervisor {
    sessions: Arc<SessionSet>,
    workers: Vec<JoinHandle<()>>,
    dead_nodes: Vec<String>,
}

impl SessionSupervisor {
    /// Open one session per node and start its read-and-frame worker.
    ///
    /// A node whose spawn fails is non-fatal: its slot stays permanently
    /// blank and its address is reported once on the status bar. Completed
    /// frames for the focused node land in `frame_tx`; an undelivered
    /// frame is overwritten by a newer one, never queued.
    pub fn start(
        summary: &JobSummary,
        monitor: &str,
        cols: u16,
        rows: u16,
        focus: Arc<FocusState>,
        frame_tx: watch::Sender<Option<Frame>>,
    ) -> Self {
        let frame_tx = Arc::new(frame_tx);
        let mut slots = Vec::with_capacity(summary.nodes.len());
        let mut workers = Vec::new();
        let mut dead_nodes = Vec::new();

        for (index, addr) in summary.nodes.iter().enumerate() {
            match NodeSession::open(index, addr, monitor, cols, rows) {
                Ok(mut session) => {
                    let reader = session.take_reader();
                    slots.push(Some(Arc::new(Mutex::new(session))));
                    if let Some(reader) = reader {
                        workers.push(spawn_worker(
                            index,
                            reader,
                            Arc::clone(&focus),
                            Arc::clone(&frame_tx),
                        ));
                    }
                }
                Err(err) => {
                    log::warn!("node {index} ({addr}): spawn failed: {err}");
                    dead_nodes.push(addr.clone());
                    slots.push(None);
                }
            }
        }

        Self {
            sessions: Arc::new(SessionSet { slots }),
            workers,
            dead_nodes,
        }
    }

    /// The shared session view the input router writes through.
    pub fn sessions(&self) -> Arc<SessionSet> {
        Arc::clone(&self.sessions)
    }

    /// Addresses of nodes whose sessions never started.
    pub fn dead_nodes(&self) -> &[String] {
        &self.dead_nodes
    }

    /// Block until every worker has drained its stream and every child
    /// has exited, then release the pty pairs.
    ///
    /// Normally triggered by the router's broadcast quit. A hung child
    /// blocks here until it exits or is killed at the OS level.
    pub fn await_shutdown(self) {
        for worker in self.workers {
            let _ = worker.join();
        }
        for slot in self.sessions.slots.iter().flatten() {
            let mut session = match slot.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = session.wait() {
                log::warn!("node {}: reap failed: {err}", session.node_index());
            }
            session.close();
        }
    }
}

fn spawn_worker(
    node_index: usize,
    reader: Box<dyn Read + Send>,
    focus: Arc<FocusState>,
    frame_tx: Arc<watch::Sender<Option<Frame>>>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("node-io-{node_index}"))
        .spawn(move || read_loop(node_index, reader, focus, frame_tx))
        .expect("failed to spawn node I/O thread")
}

/// Blocking per-node loop: read pty output, carve frames, publish the
/// latest one while this node is focused.
///
/// Frames for non-focused nodes are still fully parsed so the node's pty
/// never backs up; they are just not published. Ends at stream EOF; a
/// read error ends it the same way, since the child's exit status is the
/// authoritative failure signal.
fn read_loop(
    node_index: usize,
    mut reader: Box<dyn Read + Send>,
    focus: Arc<FocusState>,
    frame_tx: Arc<watch::Sender<Option<Frame>>>,
) {
    let mut framer = ScreenFramer::new(node_index);
    let mut buf = [0u8; 4096];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(_) => return,
        };

        for frame in framer.feed(&buf[..n]) {
            if focus.get() == node_index {
                let _ = frame_tx.send(Some(frame));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_pty::CommandBuilder;
    use std::time::Duration;

    fn session(index: usize, shell_script: &str) -> NodeSession {
        let mut cmd = CommandBuilder::new("/bin/sh");
        cmd.arg("-c");
        cmd.arg(shell_script);
        NodeSession::with_command(index, &format!("n{index:02}"), cmd, 80, 24).unwrap()
    }

    fn read_until(reader: &mut Box<dyn Read + Send>, needle: &str) -> String {
        let mut output = Vec::new();
        let mut buf = [0u8; 4096];
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    output.extend_from_slice(&buf[..n]);
                    if String::from_utf8_lossy(&output).contains(needle) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&output).into_owned()
    }

    #[test]
    fn test_write_to_absent_slot_is_noop() {
        let set = SessionSet { slots: vec![None] };
        set.write_to(0, b"x");
        set.write_to(99, b"x");
        set.broadcast(b"x");
    }

    #[test]
    fn test_broadcast_reaches_every_open_session() {
        let mut first = session(0, "cat");
        let mut second = session(1, "cat");
        let mut readers = vec![
            first.take_reader().unwrap(),
            second.take_reader().unwrap(),
        ];
        let set = SessionSet {
            slots: vec![
                Some(Arc::new(Mutex::new(first))),
                None,
                Some(Arc::new(Mutex::new(second))),
            ],
        };

        set.broadcast(b"ping\n");

        for reader in &mut readers {
            assert!(read_until(reader, "ping").contains("ping"));
        }
        for slot in set.slots.iter().flatten() {
            slot.lock().unwrap().close();
        }
    }

    #[test]
    fn test_read_loop_publishes_latest_frame_for_focused_node() {
        // Two complete repaints: "one" closes at the second marker, "two"
        // at the third.
        let mut s = session(
            0,
            "printf 'junk\\033[Hone\\033[Htwo\\033[H'; sleep 0.2",
        );
        let reader = s.take_reader().unwrap();
        let focus = Arc::new(FocusState::new(1));
        let (tx, mut rx) = watch::channel(None);

        let worker = spawn_worker(0, reader, Arc::clone(&focus), Arc::new(tx));
        worker.join().unwrap();

        let latest = rx.borrow_and_update().clone().expect("no frame published");
        assert_eq!(latest.text, "two");
        assert_eq!(latest.node_index, 0);
        assert_eq!(latest.seq, 2);
        s.close();
    }

    #[test]
    fn test_read_loop_ignores_non_focused_node() {
        let mut s = session(1, "printf '\\033[Hone\\033[Htwo\\033[H'");
        let reader = s.take_reader().unwrap();
        // Focus stays on node 0; node 1's frames are drained but unpublished.
        let focus = Arc::new(FocusState::new(2));
        let (tx, rx) = watch::channel(None);

        let worker = spawn_worker(1, reader, Arc::clone(&focus), Arc::new(tx));
        worker.join().unwrap();

        assert!(rx.borrow().is_none());
        s.close();
    }

    #[test]
    fn test_broadcast_interrupt_shuts_everything_down() {
        let mut first = session(0, "cat");
        let mut second = session(1, "cat");
        let r1 = first.take_reader().unwrap();
        let r2 = second.take_reader().unwrap();
        let focus = Arc::new(FocusState::new(2));
        let (tx, _rx) = watch::channel(None);
        let tx = Arc::new(tx);

        let supervisor = SessionSupervisor {
            sessions: Arc::new(SessionSet {
                slots: vec![
                    Some(Arc::new(Mutex::new(first))),
                    Some(Arc::new(Mutex::new(second))),
                ],
            }),
            workers: vec![
                spawn_worker(0, r1, Arc::clone(&focus), Arc::clone(&tx)),
                spawn_worker(1, r2, Arc::clone(&focus), Arc::clone(&tx)),
            ],
            dead_nodes: Vec::new(),
        };

        let sessions = supervisor.sessions();
        // The pty line discipline turns the interrupt byte into SIGINT for
        // each child.
        sessions.broadcast(&[0x03]);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let all_dead = sessions
                .slots
                .iter()
                .flatten()
                .all(|slot| !slot.lock().unwrap().is_alive());
            if all_dead {
                break;
            }
            if std::time::Instant::now() > deadline {
                for slot in sessions.slots.iter().flatten() {
                    slot.lock().unwrap().close();
                }
                panic!("children did not exit on broadcast interrupt");
            }
            thread::sleep(Duration::from_millis(50));
        }

        // Children are gone; this must return promptly.
        supervisor.await_shutdown();
    }
}
