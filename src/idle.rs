//! Idle "breathing" animation for settled graphs
//!
//! Once a layout settles, physics stops and every node drifts along a small
//! ellipse instead. Each node's phase is offset by its index so the graph
//! never pulses in unison.
//!
//! The drift is applied as a per-tick delta between consecutive samples of
//! the ellipse, so the node's net offset from where it settled stays within
//! the ellipse. Positions are re-clamped after every step.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::time::Duration;

use crate::config::LayoutConfig;
use crate::simulation::SimulationState;

/// Vertical axis of the drift ellipse relative to the horizontal one
const VERTICAL_RATIO: f64 = 0.7;

/// Drives idle motion from the moment a graph settles
#[derive(Debug, Clone)]
pub struct IdleAnimator {
    settled_at: Duration,
    /// Last applied ellipse sample per node
    offsets: Vec<(f64, f64)>,
}

impl IdleAnimator {
    /// Start animating `node_count` nodes at time `now`
    pub fn begin(now: Duration, node_count: usize, config: &LayoutConfig) -> Self {
        let offsets = (0..node_count)
            .map(|index| sample(index, node_count, 0.0, config))
            .collect();
        Self {
            settled_at: now,
            offsets,
        }
    }

    /// Move every node to the ellipse sample for `now`
    pub fn advance(&mut self, state: &mut SimulationState, now: Duration, config: &LayoutConfig) {
        let t = now.saturating_sub(self.settled_at).as_secs_f64();
        let count = state.nodes.len();
        let canvas = state.canvas;

        for (index, node) in state.nodes.iter_mut().enumerate() {
            let Some(last) = self.offsets.get_mut(index) else {
                break;
            };
            let next = sample(index, count, t, config);
            node.x += next.0 - last.0;
            node.y += next.1 - last.1;
            *last = next;

            node.vx = 0.0;
            node.vy = 0.0;
            node.clamp_into(canvas, config.boundary_padding);
        }
    }
}

/// Phase of a node, spread evenly around the cycle by index
fn phase(index: usize, count: usize) -> f64 {
    TAU * index as f64 / count.max(1) as f64
}

/// Point on a node's drift ellipse at time `t` seconds after settling
fn sample(index: usize, count: usize, t: f64, config: &LayoutConfig) -> (f64, f64) {
    let angle = config.breathing_speed * t + phase(index, count);
    let amplitude = config.breathing_amplitude;
    (
        amplitude * angle.sin(),
        amplitude * VERTICAL_RATIO * (angle + FRAC_PI_2).sin(),
    )
}
