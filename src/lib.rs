//! factgraph - force-directed layout for personal fact graphs.
//!
//! Given nodes weighted by importance and edges weighted by relationship
//! strength, the engine positions every node on a canvas through simulated
//! forces, detects when the layout has settled, and then keeps it gently
//! drifting so the visualization never looks frozen.
//!
//! ```no_run
//! use factgraph::{GraphEdge, GraphNode, GraphSnapshot, LayoutConfig, LayoutScheduler};
//! use factgraph::clock::SystemClock;
//!
//! let snapshot = GraphSnapshot::new(
//!     vec![GraphNode::new("coffee", 7), GraphNode::new("mornings", 4)],
//!     vec![GraphEdge::new("coffee", "mornings", 0.8)],
//!     800.0,
//!     600.0,
//! );
//! let mut scheduler = LayoutScheduler::new(
//!     LayoutConfig::default(),
//!     SystemClock::new(),
//!     |frame: &factgraph::Frame| println!("{:?}", frame.positions),
//! );
//! scheduler.ingest(&snapshot);
//! scheduler.tick();
//! ```

pub mod clock;
pub mod config;
pub mod driver;
pub mod forces;
pub mod graph;
pub mod idle;
pub mod io;
pub mod scheduler;
pub mod settle;
pub mod simulation;
pub mod watch;

pub use config::LayoutConfig;
pub use graph::{Canvas, Category, GraphEdge, GraphNode, GraphSnapshot};
pub use scheduler::{Frame, LatestFrame, LayoutScheduler, Position, PositionSink};
pub use settle::Phase;
