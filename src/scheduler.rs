//! Tick scheduler
//!
//! Owns the simulation state for the active graph and advances it one frame
//! per [`LayoutScheduler::tick`]. After every tick the fresh positions are
//! handed to a caller-supplied [`PositionSink`] as a read-only [`Frame`].
//!
//! The scheduler is single-threaded: ingestion, resizing and ticking all
//! take `&mut self`, so no tick can observe a half-replaced graph.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::config::LayoutConfig;
use crate::forces;
use crate::graph::{Canvas, GraphSnapshot};
use crate::idle::IdleAnimator;
use crate::settle::{Phase, SettleDetector};
use crate::simulation::SimulationState;

/// Position of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn distance_to(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Positions delivered to the renderer after a tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Ticks run on the current graph, including this one
    pub tick: u64,
    /// Whether the graph has settled into idle motion
    pub settled: bool,
    /// Node positions keyed by node id
    pub positions: BTreeMap<String, Position>,
}

impl Frame {
    fn capture(state: &SimulationState, tick: u64) -> Self {
        let positions = state
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), Position { x: n.x, y: n.y }))
            .collect();
        Self {
            tick,
            settled: state.is_settled(),
            positions,
        }
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn phase(&self) -> Phase {
        if self.settled {
            Phase::Settled
        } else {
            Phase::Active
        }
    }
}

/// Receiver for the positions produced by each tick
pub trait PositionSink {
    fn deliver(&mut self, frame: &Frame);
}

impl<F: FnMut(&Frame)> PositionSink for F {
    fn deliver(&mut self, frame: &Frame) {
        self(frame)
    }
}

/// Sink that keeps only the most recent frame
#[derive(Debug, Default)]
pub struct LatestFrame {
    frame: Option<Frame>,
    delivered: u64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn take(&mut self) -> Option<Frame> {
        self.frame.take()
    }

    /// Number of frames delivered so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl PositionSink for LatestFrame {
    fn deliver(&mut self, frame: &Frame) {
        self.frame = Some(frame.clone());
        self.delivered += 1;
    }
}

/// Layout of the current graph plus its phase bookkeeping
#[derive(Debug)]
struct ActiveLayout {
    state: SimulationState,
    idle: Option<IdleAnimator>,
    ticks: u64,
}

/// Drives the layout of one graph at a time
pub struct LayoutScheduler<C: Clock, S: PositionSink> {
    config: LayoutConfig,
    detector: SettleDetector,
    clock: C,
    sink: S,
    rng: StdRng,
    layout: Option<ActiveLayout>,
    torn_down: bool,
}

impl<C: Clock, S: PositionSink> LayoutScheduler<C, S> {
    /// Create a scheduler with no graph yet.
    ///
    /// Unusable tuning values are replaced by their defaults, see
    /// [`LayoutConfig::sanitized`].
    pub fn new(config: LayoutConfig, clock: C, sink: S) -> Self {
        let config = config.sanitized();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            detector: SettleDetector::from_config(&config),
            config,
            clock,
            sink,
            rng,
            layout: None,
            torn_down: false,
        }
    }

    /// Take in a graph snapshot.
    ///
    /// A snapshot whose node/edge identity differs from the current graph
    /// replaces the layout entirely: fresh random positions, zero velocity,
    /// active phase and a new start time. An unchanged identity keeps
    /// positions and phase, only refreshing attributes and canvas size.
    pub fn ingest(&mut self, snapshot: &GraphSnapshot) {
        if self.torn_down {
            debug!("ignoring snapshot after teardown");
            return;
        }

        let identity = snapshot.identity();
        if let Some(layout) = self.layout.as_mut() {
            if layout.state.identity() == &identity {
                layout
                    .state
                    .refresh(snapshot, self.config.boundary_padding);
                return;
            }
        }

        debug!(
            nodes = identity.node_count(),
            edges = identity.edge_count(),
            replacing = self.layout.is_some(),
            "new graph identity, starting fresh layout"
        );
        let seed = self.rng.r#gen::<u64>();
        let state = SimulationState::from_snapshot(
            snapshot,
            self.config.initial_spread,
            self.config.boundary_padding,
            self.clock.now(),
            StdRng::seed_from_u64(seed),
        );
        self.layout = Some(ActiveLayout {
            state,
            idle: None,
            ticks: 0,
        });
    }

    /// Advance the layout by one frame and deliver the new positions.
    ///
    /// A no-op before the first ingest and after teardown.
    pub fn tick(&mut self) {
        if self.torn_down {
            return;
        }
        let Some(layout) = self.layout.as_mut() else {
            return;
        };

        let now = self.clock.now();
        layout.ticks += 1;

        match layout.idle.as_mut() {
            Some(idle) => idle.advance(&mut layout.state, now, &self.config),
            None => {
                let report = forces::step(&mut layout.state, &self.config);
                let elapsed = now.saturating_sub(layout.state.started_at());
                trace!(
                    tick = layout.ticks,
                    mean_speed = report.mean_speed,
                    clamped = report.clamped,
                    "force step"
                );

                if self.detector.is_converged(elapsed, report.mean_speed)
                    && layout.state.mark_settled()
                {
                    info!(
                        ticks = layout.ticks,
                        elapsed_ms = elapsed.as_millis() as u64,
                        nodes = layout.state.nodes().len(),
                        "layout settled"
                    );
                    layout.idle = Some(IdleAnimator::begin(
                        now,
                        layout.state.nodes().len(),
                        &self.config,
                    ));
                }
            }
        }

        self.sink
            .deliver(&Frame::capture(&layout.state, layout.ticks));
    }

    /// Resize the canvas of the current graph without resetting it
    pub fn resize(&mut self, width: f64, height: f64) {
        if let Some(layout) = self.layout.as_mut() {
            layout
                .state
                .resize(Canvas::new(width, height), self.config.boundary_padding);
        }
    }

    /// Stop the layout and release its state. Idempotent.
    pub fn teardown(&mut self) {
        if !self.torn_down {
            debug!("tearing down layout scheduler");
        }
        self.torn_down = true;
        self.layout = None;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_settled(&self) -> bool {
        self.layout
            .as_ref()
            .is_some_and(|layout| layout.state.is_settled())
    }

    pub fn phase(&self) -> Phase {
        if self.is_settled() {
            Phase::Settled
        } else {
            Phase::Active
        }
    }

    /// Read-only view of the current graph's state
    pub fn state(&self) -> Option<&SimulationState> {
        self.layout.as_ref().map(|layout| &layout.state)
    }

    /// Ticks run on the current graph
    pub fn ticks(&self) -> u64 {
        self.layout.as_ref().map_or(0, |layout| layout.ticks)
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::graph::{GraphEdge, GraphNode};
    use std::time::Duration;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn chain() -> GraphSnapshot {
        GraphSnapshot::new(
            vec![
                GraphNode::new("a", 5),
                GraphNode::new("b", 5),
                GraphNode::new("c", 5),
            ],
            vec![GraphEdge::new("a", "b", 1.0), GraphEdge::new("b", "c", 1.0)],
            400.0,
            400.0,
        )
    }

    fn scheduler() -> (ManualClock, LayoutScheduler<ManualClock, LatestFrame>) {
        let clock = ManualClock::new();
        let scheduler =
            LayoutScheduler::new(LayoutConfig::seeded(42), clock.clone(), LatestFrame::new());
        (clock, scheduler)
    }

    #[test]
    fn tick_before_ingest_is_noop() {
        let (_, mut scheduler) = scheduler();
        scheduler.tick();
        assert!(scheduler.sink().frame().is_none());
        assert_eq!(scheduler.ticks(), 0);
    }

    #[test]
    fn tick_delivers_positions_by_id() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&chain());
        clock.advance(FRAME);
        scheduler.tick();

        let frame = scheduler.sink().frame().unwrap();
        assert_eq!(frame.tick, 1);
        assert!(!frame.settled);
        assert_eq!(frame.phase(), Phase::Active);
        let ids: Vec<&str> = frame.positions.keys().map(String::as_str).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn cannot_settle_before_minimum_time() {
        let (_, mut scheduler) = scheduler();
        scheduler.ingest(&GraphSnapshot::new(
            vec![GraphNode::new("only", 5)],
            vec![],
            400.0,
            400.0,
        ));
        // Clock never advances, so the minimum time is never reached
        for _ in 0..2000 {
            scheduler.tick();
        }
        assert!(!scheduler.is_settled());
    }

    #[test]
    fn settles_and_switches_to_idle() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&chain());
        for _ in 0..5000 {
            if scheduler.is_settled() {
                break;
            }
            clock.advance(FRAME);
            scheduler.tick();
        }
        assert!(scheduler.is_settled());
        assert!(scheduler.sink().frame().unwrap().settled);

        for _ in 0..100 {
            clock.advance(FRAME);
            scheduler.tick();
            assert!(scheduler.is_settled());
        }
    }

    #[test]
    fn same_identity_keeps_positions() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&chain());
        for _ in 0..30 {
            clock.advance(FRAME);
            scheduler.tick();
        }
        let before = scheduler.sink().frame().unwrap().clone();

        let mut changed = chain();
        changed.nodes[1].importance = 9;
        changed.nodes[1].label = "Bee".to_string();
        scheduler.ingest(&changed);

        assert_eq!(scheduler.ticks(), 30);
        let state = scheduler.state().unwrap();
        for node in state.nodes() {
            let old = before.position(&node.id).unwrap();
            assert!((node.x - old.x).abs() < 1e-9);
            assert!((node.y - old.y).abs() < 1e-9);
        }
        assert_eq!(state.node("b").unwrap().label, "Bee");
    }

    #[test]
    fn different_identity_resets() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&chain());
        for _ in 0..30 {
            clock.advance(FRAME);
            scheduler.tick();
        }

        let mut bigger = chain();
        bigger.nodes.push(GraphNode::new("d", 2));
        scheduler.ingest(&bigger);

        assert_eq!(scheduler.ticks(), 0);
        let state = scheduler.state().unwrap();
        assert_eq!(state.nodes().len(), 4);
        assert_eq!(state.started_at(), clock.now());
        assert!(state.nodes().iter().all(|n| n.vx == 0.0 && n.vy == 0.0));
    }

    #[test]
    fn resize_keeps_phase_and_clamps() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&chain());
        clock.advance(FRAME);
        scheduler.tick();

        scheduler.resize(120.0, 0.0);
        let state = scheduler.state().unwrap();
        assert_eq!(state.canvas(), Canvas::new(120.0, 1.0));
        for node in state.nodes() {
            assert!(node.x <= 120.0);
            assert_eq!(node.y, 0.5);
        }
        assert_eq!(scheduler.ticks(), 1);
    }

    #[test]
    fn empty_graph_delivers_empty_frame() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&GraphSnapshot::empty(400.0, 400.0));
        clock.advance(FRAME);
        scheduler.tick();

        let frame = scheduler.sink().frame().unwrap();
        assert!(frame.positions.is_empty());
    }

    #[test]
    fn teardown_is_idempotent_and_stops_ticks() {
        let (clock, mut scheduler) = scheduler();
        scheduler.ingest(&chain());
        clock.advance(FRAME);
        scheduler.tick();
        assert_eq!(scheduler.sink().delivered(), 1);

        scheduler.teardown();
        scheduler.teardown();
        scheduler.tick();
        scheduler.ingest(&chain());

        assert!(scheduler.is_torn_down());
        assert!(scheduler.state().is_none());
        assert_eq!(scheduler.sink().delivered(), 1);
    }

    #[test]
    fn unusable_config_falls_back_to_defaults() {
        let clock = ManualClock::new();
        let config = LayoutConfig {
            initial_spread: -0.5,
            damping: 1.0,
            min_distance: f64::NAN,
            ..LayoutConfig::seeded(1)
        };
        let mut scheduler = LayoutScheduler::new(config, clock.clone(), LatestFrame::new());
        assert_eq!(scheduler.config().validate(), Ok(()));

        scheduler.ingest(&chain());
        for _ in 0..200 {
            clock.advance(FRAME);
            scheduler.tick();
        }

        let frame = scheduler.sink().frame().unwrap();
        assert_eq!(frame.positions.len(), 3);
        for position in frame.positions.values() {
            assert!(position.x.is_finite() && position.y.is_finite());
        }
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let clock = ManualClock::new();
            let mut scheduler = LayoutScheduler::new(
                LayoutConfig::seeded(1),
                clock.clone(),
                |frame: &Frame| seen.push(frame.positions.len()),
            );
            scheduler.ingest(&chain());
            clock.advance(FRAME);
            scheduler.tick();
            scheduler.tick();
        }
        assert_eq!(seen, [3, 3]);
    }
}
