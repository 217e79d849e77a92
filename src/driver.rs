//! Drivers that call [`LayoutScheduler::tick`] at a frame cadence
//!
//! Anything that ticks the scheduler roughly once per frame is a valid
//! driver. Two are provided:
//! - [`HeadlessDriver`] steps simulated time as fast as possible, for batch
//!   layouts and tests
//! - [`PacedDriver`] ticks on a real interval inside a single-threaded tokio
//!   runtime and accepts replacement snapshots between frames

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::clock::{Clock, ManualClock};
use crate::graph::GraphSnapshot;
use crate::scheduler::{LayoutScheduler, PositionSink};

pub const DEFAULT_FPS: u32 = 60;

/// Duration of one frame at `fps` frames per second
pub fn frame_period(fps: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(fps.max(1)))
}

/// Runs frames on simulated time
#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    clock: ManualClock,
    frame_period: Duration,
}

impl HeadlessDriver {
    /// Create a driver that advances `clock` by one frame before each tick.
    /// The scheduler must read the same clock.
    pub fn new(clock: ManualClock, fps: u32) -> Self {
        Self {
            clock,
            frame_period: frame_period(fps),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Run exactly `frames` ticks
    pub fn run_frames<S: PositionSink>(
        &self,
        scheduler: &mut LayoutScheduler<ManualClock, S>,
        frames: usize,
    ) {
        for _ in 0..frames {
            if scheduler.is_torn_down() {
                break;
            }
            self.clock.advance(self.frame_period);
            scheduler.tick();
        }
    }

    /// Tick until the graph settles or `max_frames` is reached.
    ///
    /// Returns the number of frames it took to settle, or `None` if the
    /// layout was still active after `max_frames`.
    pub fn run_until_settled<S: PositionSink>(
        &self,
        scheduler: &mut LayoutScheduler<ManualClock, S>,
        max_frames: usize,
    ) -> Option<usize> {
        for frame in 1..=max_frames {
            if scheduler.is_torn_down() || scheduler.state().is_none() {
                return None;
            }
            self.clock.advance(self.frame_period);
            scheduler.tick();
            if scheduler.is_settled() {
                return Some(frame);
            }
        }
        None
    }
}

/// Ticks on a real frame interval
#[derive(Debug, Clone, Copy)]
pub struct PacedDriver {
    frame_period: Duration,
    max_frames: Option<u64>,
}

impl PacedDriver {
    pub fn new(fps: u32) -> Self {
        Self {
            frame_period: frame_period(fps),
            max_frames: None,
        }
    }

    /// Stop after this many frames
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Drive the scheduler until `shutdown` resolves, the frame limit is
    /// reached or the scheduler is torn down. Snapshots received on
    /// `snapshots` are ingested between frames. The scheduler is torn down
    /// on exit. Returns the number of frames run.
    pub async fn run<C, S, F>(
        &self,
        scheduler: &mut LayoutScheduler<C, S>,
        mut snapshots: mpsc::Receiver<GraphSnapshot>,
        shutdown: F,
    ) -> u64
    where
        C: Clock,
        S: PositionSink,
        F: Future<Output = ()>,
    {
        let mut interval = time::interval(self.frame_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut frames = 0;
        let mut snapshots_open = true;
        loop {
            if scheduler.is_torn_down() {
                break;
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break;
            }

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!(frames, "shutdown requested");
                    break;
                }
                snapshot = snapshots.recv(), if snapshots_open => match snapshot {
                    Some(snapshot) => scheduler.ingest(&snapshot),
                    None => snapshots_open = false,
                },
                _ = interval.tick() => {
                    scheduler.tick();
                    frames += 1;
                }
            }
        }

        scheduler.teardown();
        frames
    }
}
