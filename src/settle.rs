//! Settle detection
//!
//! A graph is either [`Phase::Active`] (forces applied every tick) or
//! [`Phase::Settled`] (idle animation only). It settles once it has been
//! active for a minimum time and its mean speed has dropped below a
//! threshold. There is no way back to active short of a new graph.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

/// Layout phase of the current graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Active,
    Settled,
}

impl Phase {
    pub fn is_settled(self) -> bool {
        self == Phase::Settled
    }
}

/// Convergence thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleDetector {
    min_velocity: f64,
    min_elapsed: Duration,
}

impl SettleDetector {
    pub fn new(min_velocity: f64, min_elapsed: Duration) -> Self {
        Self {
            min_velocity,
            min_elapsed,
        }
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        let min_elapsed =
            Duration::try_from_secs_f64(config.min_settle_secs).unwrap_or(Duration::ZERO);
        Self::new(config.min_velocity, min_elapsed)
    }

    /// Whether a graph active for `elapsed` with the given mean speed has
    /// converged. Both conditions must hold.
    pub fn is_converged(&self, elapsed: Duration, mean_speed: f64) -> bool {
        elapsed > self.min_elapsed && mean_speed < self.min_velocity
    }
}
