use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use factgraph::clock::{ManualClock, SystemClock};
use factgraph::driver::{DEFAULT_FPS, HeadlessDriver, PacedDriver};
use factgraph::{Frame, GraphSnapshot, LatestFrame, LayoutConfig, LayoutScheduler, io, watch};

/// Force-directed layout for personal fact graphs.
#[derive(Parser)]
#[command(name = "factgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Layout config file (.json or .yaml) overriding default constants
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay a graph out headlessly and write the settled positions as JSON
    Layout {
        /// Input graph snapshot (.json or .yaml)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the final frame; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Canvas width, overriding the snapshot
        #[arg(long)]
        width: Option<f64>,

        /// Canvas height, overriding the snapshot
        #[arg(long)]
        height: Option<f64>,

        /// Simulated frames per second
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Give up settling after this many frames
        #[arg(long, default_value = "20000")]
        max_frames: usize,
    },
    /// Animate a graph in real time, streaming one JSON frame per line
    Animate {
        /// Input graph snapshot (.json or .yaml)
        #[arg(short, long)]
        input: PathBuf,

        /// Frames per second
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Stop after this many frames; runs until interrupted when omitted
        #[arg(long)]
        frames: Option<u64>,

        /// Re-read the input when it changes on disk
        #[arg(short, long)]
        watch: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    match path {
        Some(path) => Ok(io::read_config(path)?),
        None => Ok(LayoutConfig::default()),
    }
}

fn load_snapshot(
    input: &Path,
    width: Option<f64>,
    height: Option<f64>,
) -> anyhow::Result<GraphSnapshot> {
    let mut snapshot = io::read_snapshot(input)?;
    if let Some(width) = width {
        snapshot.width = width;
    }
    if let Some(height) = height {
        snapshot.height = height;
    }
    Ok(snapshot)
}

fn layout(
    snapshot: &GraphSnapshot,
    config: LayoutConfig,
    fps: u32,
    max_frames: usize,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let driver = HeadlessDriver::new(clock.clone(), fps);
    let mut scheduler = LayoutScheduler::new(config, clock, LatestFrame::new());
    scheduler.ingest(snapshot);

    match driver.run_until_settled(&mut scheduler, max_frames) {
        Some(frames) => info!(frames, nodes = snapshot.nodes.len(), "layout settled"),
        None => warn!(max_frames, "layout did not settle, writing last frame"),
    }

    let frame = scheduler.sink_mut().take().unwrap_or_default();
    match output {
        Some(path) => {
            io::write_frame(&frame, path)?;
            println!(
                "Wrote {} node positions to {}",
                frame.positions.len(),
                path.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&frame)?),
    }
    Ok(())
}

async fn animate(
    input: &Path,
    config: LayoutConfig,
    fps: u32,
    frames: Option<u64>,
    watch: bool,
) -> anyhow::Result<()> {
    let snapshot = load_snapshot(input, None, None)?;

    let mut out = std::io::stdout();
    let sink = move |frame: &Frame| {
        let written = serde_json::to_writer(&mut out, frame)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out));
        if let Err(e) = written {
            debug!(error = %e, "dropped frame");
        }
    };
    let mut scheduler = LayoutScheduler::new(config, SystemClock::new(), sink);
    scheduler.ingest(&snapshot);

    let (watcher, snapshots) = if watch {
        let (watcher, rx) = watch::watch_snapshot(input)?;
        (Some(watcher), rx)
    } else {
        let (_tx, rx) = mpsc::channel(1);
        (None, rx)
    };

    let mut driver = PacedDriver::new(fps);
    if let Some(frames) = frames {
        driver = driver.with_max_frames(frames);
    }
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "could not listen for ctrl-c, running until the frame limit");
            std::future::pending::<()>().await;
        }
    };

    let ran = driver.run(&mut scheduler, snapshots, shutdown).await;
    drop(watcher);
    info!(frames = ran, "animation stopped");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Layout {
            input,
            output,
            width,
            height,
            fps,
            max_frames,
        } => {
            let snapshot = load_snapshot(&input, width, height)?;
            layout(&snapshot, config, fps, max_frames, output.as_deref())?;
        }
        Commands::Animate {
            input,
            fps,
            frames,
            watch,
        } => {
            animate(&input, config, fps, frames, watch).await?;
        }
    }

    Ok(())
}
