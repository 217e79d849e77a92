//! Per-graph simulation state
//!
//! Holds the positions and velocities of every node for one graph's
//! lifetime. The state is created from a [`GraphSnapshot`] and replaced
//! wholesale when the graph's identity changes.

use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::graph::{
    Canvas, Category, GraphIdentity, GraphNode, GraphSnapshot, MAX_IMPORTANCE, MIN_IMPORTANCE,
};

/// A node with position and velocity for simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimNode {
    /// Node ID (from GraphNode)
    pub id: String,
    /// Human-readable label for display
    pub label: String,
    pub category: Category,
    pub importance: u8,
    /// Position in canvas space
    pub x: f64,
    pub y: f64,
    /// Velocity, in canvas units per tick
    pub vx: f64,
    pub vy: f64,
    /// Radius derived from importance
    pub radius: f64,
}

impl SimNode {
    fn from_graph_node(node: &GraphNode, x: f64, y: f64) -> Self {
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            category: node.category,
            importance: node.importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE),
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: node.radius(),
        }
    }

    fn refresh_from(&mut self, node: &GraphNode) {
        self.label.clone_from(&node.label);
        self.category = node.category;
        self.importance = node.importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE);
        self.radius = node.radius();
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Clamp the node into the canvas, zeroing velocity on clamped axes.
    ///
    /// Returns true if either axis was clamped.
    pub(crate) fn clamp_into(&mut self, canvas: Canvas, padding: f64) -> bool {
        let (min_x, max_x) = axis_bounds(canvas.width, self.radius, padding);
        let (min_y, max_y) = axis_bounds(canvas.height, self.radius, padding);

        let x = self.x.clamp(min_x, max_x);
        let y = self.y.clamp(min_y, max_y);
        let clamped_x = x != self.x;
        let clamped_y = y != self.y;
        if clamped_x {
            self.x = x;
            self.vx = 0.0;
        }
        if clamped_y {
            self.y = y;
            self.vy = 0.0;
        }
        clamped_x || clamped_y
    }
}

/// Allowed range for a node center along one axis.
///
/// When the canvas is too small to hold the node the range collapses to the
/// middle of the axis.
pub fn axis_bounds(extent: f64, radius: f64, padding: f64) -> (f64, f64) {
    let min = radius + padding;
    let max = extent - radius - padding;
    if min > max {
        let mid = extent / 2.0;
        (mid, mid)
    } else {
        (min, max)
    }
}

/// An edge for simulation (indices into node array)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimEdge {
    pub source: usize,
    pub target: usize,
    /// Strength clamped to 0.0-1.0
    pub strength: f64,
}

/// State of one graph's layout
#[derive(Debug)]
pub struct SimulationState {
    pub(crate) nodes: Vec<SimNode>,
    pub(crate) edges: Vec<SimEdge>,
    pub(crate) canvas: Canvas,
    pub(crate) settled: bool,
    pub(crate) started_at: Duration,
    pub(crate) rng: StdRng,
    identity: GraphIdentity,
    node_id_to_index: HashMap<String, usize>,
}

impl SimulationState {
    /// Create state from a snapshot, placing every node at random inside
    /// the central `spread` fraction of the canvas with zero velocity.
    pub fn from_snapshot(
        snapshot: &GraphSnapshot,
        spread: f64,
        padding: f64,
        started_at: Duration,
        mut rng: StdRng,
    ) -> Self {
        let canvas = snapshot.canvas();
        let (cx, cy) = canvas.center();
        let half_w = canvas.width * spread / 2.0;
        let half_h = canvas.height * spread / 2.0;

        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        let mut node_id_to_index = HashMap::with_capacity(snapshot.nodes.len());
        for node in &snapshot.nodes {
            // Repeated ids keep their first occurrence
            if node_id_to_index.contains_key(&node.id) {
                continue;
            }
            let x = cx + rng.gen_range(-half_w..=half_w);
            let y = cy + rng.gen_range(-half_h..=half_h);
            let mut sim_node = SimNode::from_graph_node(node, x, y);
            sim_node.clamp_into(canvas, padding);
            node_id_to_index.insert(node.id.clone(), nodes.len());
            nodes.push(sim_node);
        }

        let mut state = Self {
            nodes,
            edges: Vec::new(),
            canvas,
            settled: false,
            started_at,
            rng,
            identity: snapshot.identity(),
            node_id_to_index,
        };
        state.edges = state.resolve_edges(snapshot);

        debug!(
            nodes = state.nodes.len(),
            edges = state.edges.len(),
            dropped_edges = snapshot.edges.len() - state.edges.len(),
            width = canvas.width,
            height = canvas.height,
            "ingested graph snapshot"
        );
        state
    }

    /// Map snapshot edges onto node indices.
    ///
    /// Missing endpoints and self-loops are dropped, duplicate pairs (in
    /// either direction) collapse into one edge with the strongest strength.
    fn resolve_edges(&self, snapshot: &GraphSnapshot) -> Vec<SimEdge> {
        let mut by_pair: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges: Vec<SimEdge> = Vec::new();

        for edge in &snapshot.edges {
            let (Some(&source), Some(&target)) = (
                self.node_id_to_index.get(&edge.source),
                self.node_id_to_index.get(&edge.target),
            ) else {
                continue;
            };
            if source == target {
                continue;
            }
            let strength = if edge.strength.is_nan() {
                0.0
            } else {
                edge.strength.clamp(0.0, 1.0)
            };

            let pair = (source.min(target), source.max(target));
            match by_pair.get(&pair) {
                Some(&existing) => {
                    let kept = &mut edges[existing];
                    kept.strength = kept.strength.max(strength);
                }
                None => {
                    by_pair.insert(pair, edges.len());
                    edges.push(SimEdge {
                        source,
                        target,
                        strength,
                    });
                }
            }
        }

        edges
    }

    /// Update node and edge attributes from a snapshot with the same
    /// identity, keeping positions, velocities and phase.
    pub fn refresh(&mut self, snapshot: &GraphSnapshot, padding: f64) {
        let mut refreshed = vec![false; self.nodes.len()];
        for node in &snapshot.nodes {
            if let Some(&index) = self.node_id_to_index.get(&node.id) {
                if !refreshed[index] {
                    self.nodes[index].refresh_from(node);
                    refreshed[index] = true;
                }
            }
        }
        self.edges = self.resolve_edges(snapshot);
        self.canvas = snapshot.canvas();
        self.clamp_all(padding);
        debug!(nodes = self.nodes.len(), "refreshed graph attributes");
    }

    /// Change the canvas and pull every node back inside it
    pub fn resize(&mut self, canvas: Canvas, padding: f64) {
        self.canvas = canvas;
        self.clamp_all(padding);
        debug!(
            width = canvas.width,
            height = canvas.height,
            "resized layout canvas"
        );
    }

    pub(crate) fn clamp_all(&mut self, padding: f64) {
        let canvas = self.canvas;
        for node in &mut self.nodes {
            node.clamp_into(canvas, padding);
        }
    }

    /// Mean speed across all nodes, zero for an empty graph
    pub fn mean_speed(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.nodes.iter().map(SimNode::speed).sum::<f64>() / self.nodes.len() as f64
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SimEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.node_id_to_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn identity(&self) -> &GraphIdentity {
        &self.identity
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Clock reading at ingestion
    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    /// Mark the graph settled; later calls are no-ops
    pub(crate) fn mark_settled(&mut self) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        true
    }

    #[cfg(test)]
    pub(crate) fn for_tests(snapshot: &GraphSnapshot, seed: u64) -> Self {
        use rand::SeedableRng;

        Self::from_snapshot(
            snapshot,
            crate::config::INITIAL_SPREAD,
            crate::config::BOUNDARY_PADDING,
            Duration::ZERO,
            StdRng::seed_from_u64(seed),
        )
    }
}
