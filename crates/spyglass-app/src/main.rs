mod focus;
mod input;
mod render;
mod supervisor;
mod term;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::terminal;
use tokio::sync::watch;

use spyglass_slurm::{JobStatus, StatusCell};

use crate::focus::FocusState;
use crate::input::InputRouter;
use crate::render::Renderer;
use crate::supervisor::SessionSupervisor;

/// How often the status bar's scheduler snapshot is refreshed.
const STATUS_REFRESH: Duration = Duration::from_secs(2);

/// Spyglass -- watch a full-screen monitor on every node of a cluster job.
///
/// `]` and `[` rotate which node is displayed; `q` or Ctrl-C quits the
/// monitor on every node at once.
#[derive(Parser, Debug)]
#[command(name = "spyglass", version, about)]
struct Cli {
    /// Scheduler job id to monitor
    job: String,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let summary = match spyglass_slurm::query_job(&cli.job).await {
        Ok(summary) => summary,
        Err(err) => {
            log::debug!("initial job query failed: {err}");
            println!("Invalid job ID");
            return Ok(());
        }
    };

    if summary.status == JobStatus::Pending {
        println!("Job in pending state");
        return Ok(());
    }

    // A non-pending job with no allocation is as unusable as an unknown id.
    if summary.nodes.is_empty() {
        println!("Invalid job ID");
        return Ok(());
    }

    let (cols, rows) = terminal::size()?;
    let focus = Arc::new(FocusState::new(summary.nodes.len()));
    let status = StatusCell::new(summary.clone());
    let _status_refresh = status.spawn_refresh(STATUS_REFRESH);

    let monitor = spyglass_pty::monitor_command();
    let (frame_tx, frame_rx) = watch::channel(None);

    // Raw mode from here on; the guard restores the terminal on every
    // exit path below.
    let _guard = term::RawModeGuard::new()?;

    let supervisor = SessionSupervisor::start(
        &summary,
        &monitor,
        cols,
        rows,
        Arc::clone(&focus),
        frame_tx,
    );
    let renderer = Renderer::new(
        Arc::clone(&focus),
        Arc::clone(&status),
        supervisor.dead_nodes().to_vec(),
    );
    let _render = render::start_render_task(frame_rx, renderer);

    let router = InputRouter::new(supervisor.sessions(), Arc::clone(&focus));
    tokio::task::spawn_blocking(move || router.run(io::stdin().lock()))
        .await
        .expect("input router thread panicked")?;

    // The broadcast quit is on its way to every child; wait for all of
    // them to go down before giving the terminal back.
    tokio::task::spawn_blocking(move || supervisor.await_shutdown())
        .await
        .expect("supervisor thread panicked");

    Ok(())
}
