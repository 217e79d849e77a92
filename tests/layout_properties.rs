use std::time::Duration;

use factgraph::clock::{Clock, ManualClock};
use factgraph::config::{BREATHING_AMPLITUDE, SPRING_LENGTH};
use factgraph::driver::{DEFAULT_FPS, HeadlessDriver};
use factgraph::{GraphEdge, GraphNode, GraphSnapshot, LatestFrame, LayoutConfig, LayoutScheduler};

const TOLERANCE: f64 = 1e-9;

struct Harness {
    driver: HeadlessDriver,
    scheduler: LayoutScheduler<ManualClock, LatestFrame>,
}

impl Harness {
    fn new(config: LayoutConfig) -> Self {
        let clock = ManualClock::new();
        Self {
            driver: HeadlessDriver::new(clock.clone(), DEFAULT_FPS),
            scheduler: LayoutScheduler::new(config, clock, LatestFrame::new()),
        }
    }

    fn seeded(seed: u64) -> Self {
        Self::new(LayoutConfig::seeded(seed))
    }

    fn tick(&mut self) {
        self.driver.run_frames(&mut self.scheduler, 1);
    }

    fn settle(&mut self, max_frames: usize) -> usize {
        self.driver
            .run_until_settled(&mut self.scheduler, max_frames)
            .expect("layout did not settle")
    }

    fn assert_in_bounds(&self) {
        let state = self.scheduler.state().expect("no active graph");
        let canvas = state.canvas();
        for node in state.nodes() {
            assert!(
                node.x >= node.radius - TOLERANCE && node.x <= canvas.width - node.radius + TOLERANCE,
                "{} x={} out of bounds",
                node.id,
                node.x
            );
            assert!(
                node.y >= node.radius - TOLERANCE
                    && node.y <= canvas.height - node.radius + TOLERANCE,
                "{} y={} out of bounds",
                node.id,
                node.y
            );
        }
    }

    fn positions(&self) -> Vec<(String, f64, f64)> {
        self.scheduler
            .state()
            .expect("no active graph")
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), n.x, n.y))
            .collect()
    }
}

/// Connected graph: a path through all nodes plus a few chords
fn connected_graph(n: usize, size: f64) -> GraphSnapshot {
    let nodes = (0..n)
        .map(|i| GraphNode::new(format!("fact-{i}"), (i % 10 + 1) as u8))
        .collect();
    let mut edges: Vec<GraphEdge> = (1..n)
        .map(|i| GraphEdge::new(format!("fact-{}", i - 1), format!("fact-{i}"), 0.8))
        .collect();
    for i in (0..n).step_by(4) {
        let j = (i * 7 + 3) % n;
        edges.push(GraphEdge::new(format!("fact-{i}"), format!("fact-{j}"), 0.4));
    }
    GraphSnapshot::new(nodes, edges, size, size)
}

fn chain() -> GraphSnapshot {
    GraphSnapshot::new(
        vec![
            GraphNode::new("A", 5),
            GraphNode::new("B", 5),
            GraphNode::new("C", 5),
        ],
        vec![GraphEdge::new("A", "B", 1.0), GraphEdge::new("B", "C", 1.0)],
        400.0,
        400.0,
    )
}

#[test]
fn boundary_invariant_holds_in_both_phases() {
    let mut harness = Harness::seeded(11);
    harness.scheduler.ingest(&connected_graph(40, 500.0));

    let mut settled_ticks = 0;
    for _ in 0..20_000 {
        harness.tick();
        harness.assert_in_bounds();
        if harness.scheduler.is_settled() {
            settled_ticks += 1;
            if settled_ticks > 300 {
                break;
            }
        }
    }
    assert!(settled_ticks > 300, "never reached the settled phase");
}

#[test]
fn connected_graphs_converge() {
    for (n, size) in [(5, 400.0), (20, 600.0), (60, 900.0), (100, 1200.0)] {
        let mut harness = Harness::seeded(n as u64);
        harness.scheduler.ingest(&connected_graph(n, size));
        let frames = harness.settle(30_000);
        assert!(frames > 0, "{n} nodes");
    }
}

#[test]
fn settling_is_monotonic() {
    let mut harness = Harness::seeded(21);
    harness.scheduler.ingest(&connected_graph(12, 500.0));
    harness.settle(20_000);

    for _ in 0..500 {
        harness.tick();
        assert!(harness.scheduler.is_settled());
        assert!(harness.scheduler.sink().frame().unwrap().settled);
    }
}

#[test]
fn reingesting_a_different_graph_resets() {
    let mut harness = Harness::seeded(31);
    harness.scheduler.ingest(&connected_graph(10, 500.0));
    harness.settle(20_000);
    let settled_positions = harness.positions();

    let mut next = connected_graph(10, 500.0);
    next.nodes.push(GraphNode::new("fresh", 3));
    harness.scheduler.ingest(&next);

    assert!(!harness.scheduler.is_settled());
    assert_eq!(harness.scheduler.ticks(), 0);
    let state = harness.scheduler.state().unwrap();
    assert_eq!(state.nodes().len(), 11);
    assert_eq!(state.started_at(), harness.driver.clock().now());
    assert!(state.nodes().iter().all(|n| n.vx == 0.0 && n.vy == 0.0));

    let moved = settled_positions
        .iter()
        .filter(|(id, x, y)| {
            let node = state.node(id).unwrap();
            (node.x - x).abs() > TOLERANCE || (node.y - y).abs() > TOLERANCE
        })
        .count();
    assert_eq!(moved, settled_positions.len());

    harness.tick();
    assert!(!harness.scheduler.sink().frame().unwrap().settled);
}

#[test]
fn same_identity_keeps_layout() {
    let mut harness = Harness::seeded(41);
    harness.scheduler.ingest(&connected_graph(8, 400.0));
    for _ in 0..50 {
        harness.tick();
    }
    let before = harness.positions();
    let velocities: Vec<(f64, f64)> = harness
        .scheduler
        .state()
        .unwrap()
        .nodes()
        .iter()
        .map(|n| (n.vx, n.vy))
        .collect();

    let mut reweighted = connected_graph(8, 400.0);
    for node in &mut reweighted.nodes {
        node.importance = 2;
    }
    harness.scheduler.ingest(&reweighted);

    assert_eq!(harness.positions(), before);
    let after: Vec<(f64, f64)> = harness
        .scheduler
        .state()
        .unwrap()
        .nodes()
        .iter()
        .map(|n| (n.vx, n.vy))
        .collect();
    assert_eq!(after, velocities);
    assert_eq!(harness.scheduler.ticks(), 50);
}

#[test]
fn canvas_changes_keep_settled_phase() {
    let mut harness = Harness::seeded(42);
    harness.scheduler.ingest(&connected_graph(12, 500.0));
    harness.settle(20_000);
    let ticks = harness.scheduler.ticks();

    // Same identity on a smaller canvas behaves like a resize
    harness.scheduler.ingest(&connected_graph(12, 200.0));
    assert!(harness.scheduler.is_settled());
    assert_eq!(harness.scheduler.ticks(), ticks);
    let canvas = harness.scheduler.state().unwrap().canvas();
    assert_eq!((canvas.width, canvas.height), (200.0, 200.0));
    harness.assert_in_bounds();

    harness.tick();
    assert!(harness.scheduler.is_settled());
    assert!(harness.scheduler.sink().frame().unwrap().settled);
    harness.assert_in_bounds();

    harness.scheduler.resize(150.0, 120.0);
    assert!(harness.scheduler.is_settled());
    let canvas = harness.scheduler.state().unwrap().canvas();
    assert_eq!((canvas.width, canvas.height), (150.0, 120.0));
    harness.assert_in_bounds();

    for _ in 0..60 {
        harness.tick();
        assert!(harness.scheduler.is_settled());
        assert!(harness.scheduler.sink().frame().unwrap().settled);
        harness.assert_in_bounds();
    }
}

#[test]
fn stacked_nodes_separate_without_nan() {
    let config = LayoutConfig {
        initial_spread: f64::MIN_POSITIVE,
        ..LayoutConfig::seeded(51)
    };
    let mut harness = Harness::new(config);
    harness.scheduler.ingest(&GraphSnapshot::new(
        vec![GraphNode::new("a", 5), GraphNode::new("b", 5)],
        vec![],
        400.0,
        400.0,
    ));
    let start = harness.positions();
    assert_eq!((start[0].1, start[0].2), (start[1].1, start[1].2));

    harness.tick();

    let state = harness.scheduler.state().unwrap();
    for node in state.nodes() {
        assert!(!node.x.is_nan() && !node.y.is_nan());
        assert!(!node.vx.is_nan() && !node.vy.is_nan());
    }
    let (a, b) = (&state.nodes()[0], &state.nodes()[1]);
    assert!((b.x - a.x).hypot(b.y - a.y) > 0.0);
}

#[test]
fn idle_motion_stays_bounded() {
    let mut harness = Harness::seeded(61);
    harness.scheduler.ingest(&connected_graph(25, 600.0));
    harness.settle(20_000);
    let anchors = harness.positions();

    for _ in 0..1000 {
        harness.tick();
        harness.assert_in_bounds();
    }

    for ((id, x0, y0), (_, x1, y1)) in anchors.iter().zip(harness.positions()) {
        assert!(
            (x1 - x0).abs() <= 4.0 * BREATHING_AMPLITUDE + TOLERANCE,
            "{id} drifted {} in x",
            x1 - x0
        );
        assert!(
            (y1 - y0).abs() <= 4.0 * BREATHING_AMPLITUDE + TOLERANCE,
            "{id} drifted {} in y",
            y1 - y0
        );
    }
}

#[test]
fn idle_motion_is_visible() {
    let mut harness = Harness::seeded(62);
    harness.scheduler.ingest(&chain());
    harness.settle(20_000);
    let before = harness.positions();

    for _ in 0..30 {
        harness.tick();
    }

    assert_ne!(harness.positions(), before);
}

#[test]
fn chain_settles_at_spring_length() {
    let mut harness = Harness::seeded(71);
    harness.scheduler.ingest(&chain());
    harness.settle(20_000);

    let frame = harness.scheduler.sink().frame().unwrap();
    let a = frame.position("A").unwrap();
    let b = frame.position("B").unwrap();
    let c = frame.position("C").unwrap();

    let ab = a.distance_to(&b);
    let bc = b.distance_to(&c);
    let ac = a.distance_to(&c);
    assert!((ab - SPRING_LENGTH).abs() < SPRING_LENGTH * 0.1, "A-B = {ab}");
    assert!((bc - SPRING_LENGTH).abs() < SPRING_LENGTH * 0.1, "B-C = {bc}");
    assert!(ac > ab, "A-C = {ac}, A-B = {ab}");
}

#[test]
fn empty_graph_ticks_cleanly() {
    let mut harness = Harness::seeded(81);
    harness.scheduler.ingest(&GraphSnapshot::empty(400.0, 400.0));

    harness.tick();

    let frame = harness.scheduler.sink().frame().unwrap();
    assert!(frame.positions.is_empty());
}

#[test]
fn tick_before_ingest_is_noop() {
    let mut harness = Harness::seeded(91);
    harness.tick();
    assert!(harness.scheduler.state().is_none());
    assert_eq!(harness.scheduler.sink().delivered(), 0);
}

#[test]
fn invalid_canvas_falls_back_to_unit_region() {
    let mut harness = Harness::seeded(101);
    harness.scheduler.ingest(&GraphSnapshot::new(
        vec![GraphNode::new("a", 5), GraphNode::new("b", 1)],
        vec![GraphEdge::new("a", "b", 1.0)],
        0.0,
        -10.0,
    ));

    for _ in 0..10 {
        harness.tick();
    }

    let frame = harness.scheduler.sink().frame().unwrap();
    for position in frame.positions.values() {
        assert_eq!((position.x, position.y), (0.5, 0.5));
    }
}

#[test]
fn minimum_settle_time_is_respected() {
    let mut harness = Harness::seeded(111);
    harness.scheduler.ingest(&GraphSnapshot::new(
        vec![GraphNode::new("solo", 4)],
        vec![],
        400.0,
        400.0,
    ));
    let frames = harness.settle(10_000);

    let elapsed = Duration::from_nanos(1_000_000_000 / u64::from(DEFAULT_FPS)) * frames as u32;
    assert!(elapsed > Duration::from_secs_f64(LayoutConfig::default().min_settle_secs));
}
