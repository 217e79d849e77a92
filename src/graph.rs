//! Graph snapshot types handed to the layout engine
//!
//! A snapshot is the immutable description of what should be laid out at a
//! point in time: the nodes, the edges between them and the canvas they live
//! on. The engine never decides which nodes or edges exist; it only arranges
//! whatever it is given.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Smallest canvas extent accepted on either axis
pub const MIN_CANVAS_EXTENT: f64 = 1.0;

/// Importance range accepted from upstream
pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 10;

const BASE_RADIUS: f64 = 6.0;
const RADIUS_PER_SQRT_IMPORTANCE: f64 = 3.0;

/// Map an importance weight to a rendered node radius.
///
/// The curve is monotonic and flattens towards the top of the range so a
/// handful of very important facts do not dwarf the rest of the graph.
/// Out-of-range values are clamped to `1..=10`.
pub fn radius_for_importance(importance: u8) -> f64 {
    let importance = importance.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE);
    BASE_RADIUS + RADIUS_PER_SQRT_IMPORTANCE * f64::from(importance).sqrt()
}

/// Category of a personal fact
///
/// Only used for styling upstream; the physics ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Personal,
    Preference,
    Work,
    Health,
    Relationship,
    Location,
    Event,
    #[default]
    #[serde(other)]
    Other,
}

/// A node in a graph snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable identity of the node
    pub id: String,

    /// Human-readable label for display
    #[serde(default)]
    pub label: String,

    /// Fact category
    #[serde(default)]
    pub category: Category,

    /// Importance weight (1-10), drives the node radius
    #[serde(default = "default_importance")]
    pub importance: u8,
}

fn default_importance() -> u8 {
    5
}

impl GraphNode {
    pub fn new(id: impl Into<String>, importance: u8) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            category: Category::default(),
            importance,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Rendered radius derived from importance
    pub fn radius(&self) -> f64 {
        radius_for_importance(self.importance)
    }
}

/// A relationship between two nodes
///
/// Endpoints are weak references: an edge pointing at an id that is not in
/// the snapshot is ignored rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node ID
    pub source: String,

    /// Target node ID
    pub target: String,

    /// Relationship strength (0.0-1.0), scales the spring force
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_strength() -> f64 {
    1.0
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, strength: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            strength,
        }
    }
}

/// Canvas dimensions the layout is confined to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    /// Create a canvas, flooring non-positive or non-finite extents to 1×1
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: sanitize_extent(width),
            height: sanitize_extent(height),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

fn sanitize_extent(extent: f64) -> f64 {
    if extent.is_finite() {
        extent.max(MIN_CANVAS_EXTENT)
    } else {
        MIN_CANVAS_EXTENT
    }
}

/// Identity of a snapshot: which nodes exist and which pairs are connected
///
/// Two snapshots with equal identities describe the same graph even if node
/// attributes (label, importance), edge strengths or edge directions differ.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphIdentity {
    nodes: BTreeSet<String>,
    /// Unordered pairs, stored as `(min, max)`
    edges: BTreeSet<(String, String)>,
}

impl GraphIdentity {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Immutable description of a graph and its canvas at ingestion time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All nodes to lay out, in the order they should be iterated
    #[serde(default)]
    pub nodes: Vec<GraphNode>,

    /// All edges between nodes
    #[serde(default)]
    pub edges: Vec<GraphEdge>,

    /// Canvas width
    pub width: f64,

    /// Canvas height
    pub height: f64,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>, width: f64, height: f64) -> Self {
        Self {
            nodes,
            edges,
            width,
            height,
        }
    }

    /// A snapshot with no nodes; laying it out is a no-op
    pub fn empty(width: f64, height: f64) -> Self {
        Self::new(Vec::new(), Vec::new(), width, height)
    }

    /// Canvas for this snapshot with invalid geometry floored
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    /// Compute the identity used to decide whether re-ingestion must reset
    pub fn identity(&self) -> GraphIdentity {
        let nodes = self.nodes.iter().map(|n| n.id.clone()).collect();
        let edges = self
            .edges
            .iter()
            .map(|e| {
                let (a, b) = (e.source.clone(), e.target.clone());
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect();
        GraphIdentity { nodes, edges }
    }
}
