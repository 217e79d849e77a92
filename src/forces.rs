//! Force stepper
//!
//! One call to [`step`] advances the layout by one tick:
//! - Repulsion between all node pairs (inverse-square)
//! - Spring attraction along edges (Hooke's law around a rest length)
//! - Gravity toward the canvas center
//! - Velocity integration with damping, a speed cap and boundary clamping
//!
//! The pairwise pass is O(n²), which is fine for the few hundred facts a
//! single user accumulates.

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::LayoutConfig;
use crate::simulation::SimulationState;

/// Outcome of one integration step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Mean velocity magnitude across all nodes after integration
    pub mean_speed: f64,
    /// Number of nodes that hit the canvas boundary this step
    pub clamped: usize,
}

/// Run one integration step over the whole graph
pub fn step(state: &mut SimulationState, config: &LayoutConfig) -> StepReport {
    let n = state.nodes.len();
    if n == 0 {
        return StepReport::default();
    }

    let mut accel = vec![(0.0_f64, 0.0_f64); n];

    apply_repulsion(state, config, &mut accel);
    apply_springs(state, config, &mut accel);
    apply_gravity(state, config, &mut accel);
    integrate(state, config, &accel)
}

/// Push every pair of nodes apart
fn apply_repulsion(state: &mut SimulationState, config: &LayoutConfig, accel: &mut [(f64, f64)]) {
    let nodes = &state.nodes;
    let rng = &mut state.rng;
    let n = nodes.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let mut dx = nodes[j].x - nodes[i].x;
            let mut dy = nodes[j].y - nodes[i].y;
            let mut dist = dx.hypot(dy);

            // Stacked nodes get a random separation so they cannot stay stuck
            if dist < config.min_distance || !dist.is_finite() {
                let angle = rng.gen_range(0.0..TAU);
                dx = angle.cos() * config.min_distance;
                dy = angle.sin() * config.min_distance;
                dist = config.min_distance;
            }

            // Coulomb's law: F = k / r^2
            let force = config.repulsion / (dist * dist);
            let fx = force * dx / dist;
            let fy = force * dy / dist;

            accel[i].0 -= fx;
            accel[i].1 -= fy;
            accel[j].0 += fx;
            accel[j].1 += fy;
        }
    }
}

/// Pull connected nodes toward the spring rest length
fn apply_springs(state: &SimulationState, config: &LayoutConfig, accel: &mut [(f64, f64)]) {
    let nodes = &state.nodes;

    for edge in &state.edges {
        let (source, target) = (edge.source, edge.target);
        if source == target || source >= nodes.len() || target >= nodes.len() {
            continue;
        }

        let dx = nodes[target].x - nodes[source].x;
        let dy = nodes[target].y - nodes[source].y;
        let dist = dx.hypot(dy).max(config.min_distance);

        // Hooke's law: F = k * (x - x0)
        let stretch = dist - config.spring_length;
        let force = config.spring_strength * edge.strength * stretch / dist;

        let fx = force * dx;
        let fy = force * dy;

        accel[source].0 += fx;
        accel[source].1 += fy;
        accel[target].0 -= fx;
        accel[target].1 -= fy;
    }
}

/// Pull every node toward the canvas center
fn apply_gravity(state: &SimulationState, config: &LayoutConfig, accel: &mut [(f64, f64)]) {
    let (cx, cy) = state.canvas.center();
    for (node, a) in state.nodes.iter().zip(accel.iter_mut()) {
        a.0 += (cx - node.x) * config.gravity;
        a.1 += (cy - node.y) * config.gravity;
    }
}

/// Apply acceleration, damping and the speed cap, then move and clamp
fn integrate(
    state: &mut SimulationState,
    config: &LayoutConfig,
    accel: &[(f64, f64)],
) -> StepReport {
    let canvas = state.canvas;
    let mut clamped = 0;

    for (node, &(ax, ay)) in state.nodes.iter_mut().zip(accel) {
        node.vx = (node.vx + ax) * config.damping;
        node.vy = (node.vy + ay) * config.damping;

        let speed = node.vx.hypot(node.vy);
        if speed > config.max_speed {
            let scale = config.max_speed / speed;
            node.vx *= scale;
            node.vy *= scale;
        }

        node.x += node.vx;
        node.y += node.vy;

        if node.clamp_into(canvas, config.boundary_padding) {
            clamped += 1;
        }
    }

    StepReport {
        mean_speed: state.mean_speed(),
        clamped,
    }
}
