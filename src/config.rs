//! Tuning constants for the layout simulation
//!
//! Defaults are tuned so a typical fact graph (20-150 nodes) settles within a
//! few seconds at 60 frames per second. A config file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Inverse-square repulsion constant between every pair of nodes
pub const REPULSION: f64 = 2000.0;
/// Rest length of an edge spring
pub const SPRING_LENGTH: f64 = 100.0;
/// Spring stiffness, scaled per edge by its strength
pub const SPRING_STRENGTH: f64 = 0.05;
/// Pull towards the canvas center, proportional to displacement
pub const GRAVITY: f64 = 0.002;
/// Per-tick velocity multiplier
pub const DAMPING: f64 = 0.85;
/// Mean speed below which the layout counts as converged
pub const MIN_VELOCITY: f64 = 0.05;
/// Amplitude of the idle drift, in canvas units
pub const BREATHING_AMPLITUDE: f64 = 2.0;
/// Angular speed of the idle drift, in radians per second
pub const BREATHING_SPEED: f64 = 0.8;
/// Minimum time a graph stays active before it may settle
pub const MIN_SETTLE_SECS: f64 = 1.5;
/// Floor for distances used as force-law denominators
pub const MIN_DISTANCE: f64 = 1.0;
/// Speed cap applied after damping
pub const MAX_SPEED: f64 = 12.0;
/// Gap kept between a node's edge and the canvas border
pub const BOUNDARY_PADDING: f64 = 4.0;
/// Fraction of the canvas used for random initial placement
pub const INITIAL_SPREAD: f64 = 0.3;

/// Errors for unusable tuning values
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A value is NaN or infinite
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    /// A value that must be strictly positive is not
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    /// A value that may be zero is negative
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A value outside its allowed open interval
    #[error("{field} must be within ({min}, {max}), got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Configuration for the layout simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub repulsion: f64,
    pub spring_length: f64,
    pub spring_strength: f64,
    pub gravity: f64,
    /// Velocity multiplier per tick, strictly between 0 and 1
    pub damping: f64,
    pub max_speed: f64,
    pub min_distance: f64,
    pub boundary_padding: f64,
    pub min_velocity: f64,
    /// Seconds a graph must stay active before it may settle
    pub min_settle_secs: f64,
    pub breathing_amplitude: f64,
    pub breathing_speed: f64,
    pub initial_spread: f64,
    /// Seed for placement and tie-breaking; entropy when absent
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: REPULSION,
            spring_length: SPRING_LENGTH,
            spring_strength: SPRING_STRENGTH,
            gravity: GRAVITY,
            damping: DAMPING,
            max_speed: MAX_SPEED,
            min_distance: MIN_DISTANCE,
            boundary_padding: BOUNDARY_PADDING,
            min_velocity: MIN_VELOCITY,
            min_settle_secs: MIN_SETTLE_SECS,
            breathing_amplitude: BREATHING_AMPLITUDE,
            breathing_speed: BREATHING_SPEED,
            initial_spread: INITIAL_SPREAD,
            seed: None,
        }
    }
}

impl LayoutConfig {
    /// Default tuning with a fixed seed, for reproducible layouts
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Check every value is usable by the simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            ("repulsion", self.repulsion),
            ("spring_length", self.spring_length),
            ("spring_strength", self.spring_strength),
            ("gravity", self.gravity),
            ("damping", self.damping),
            ("max_speed", self.max_speed),
            ("min_distance", self.min_distance),
            ("boundary_padding", self.boundary_padding),
            ("min_velocity", self.min_velocity),
            ("min_settle_secs", self.min_settle_secs),
            ("breathing_amplitude", self.breathing_amplitude),
            ("breathing_speed", self.breathing_speed),
            ("initial_spread", self.initial_spread),
        ];
        for (field, value) in all {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
        }

        let positive = [
            ("spring_length", self.spring_length),
            ("max_speed", self.max_speed),
            ("min_distance", self.min_distance),
            ("min_velocity", self.min_velocity),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        let non_negative = [
            ("repulsion", self.repulsion),
            ("spring_strength", self.spring_strength),
            ("gravity", self.gravity),
            ("boundary_padding", self.boundary_padding),
            ("min_settle_secs", self.min_settle_secs),
            ("breathing_amplitude", self.breathing_amplitude),
            ("breathing_speed", self.breathing_speed),
        ];
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        if self.damping <= 0.0 || self.damping >= 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "damping",
                value: self.damping,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.initial_spread <= 0.0 || self.initial_spread > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "initial_spread",
                value: self.initial_spread,
                min: 0.0,
                max: 1.0,
            });
        }

        Ok(())
    }

    /// Replace every unusable value with its default.
    ///
    /// The result always passes [`LayoutConfig::validate`]. Used where a
    /// config built in code must not be able to break the simulation.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let positive = |v: f64| v > 0.0;
        let non_negative = |v: f64| v >= 0.0;
        Self {
            repulsion: usable("repulsion", self.repulsion, defaults.repulsion, non_negative),
            spring_length: usable(
                "spring_length",
                self.spring_length,
                defaults.spring_length,
                positive,
            ),
            spring_strength: usable(
                "spring_strength",
                self.spring_strength,
                defaults.spring_strength,
                non_negative,
            ),
            gravity: usable("gravity", self.gravity, defaults.gravity, non_negative),
            damping: usable("damping", self.damping, defaults.damping, |v| {
                v > 0.0 && v < 1.0
            }),
            max_speed: usable("max_speed", self.max_speed, defaults.max_speed, positive),
            min_distance: usable(
                "min_distance",
                self.min_distance,
                defaults.min_distance,
                positive,
            ),
            boundary_padding: usable(
                "boundary_padding",
                self.boundary_padding,
                defaults.boundary_padding,
                non_negative,
            ),
            min_velocity: usable(
                "min_velocity",
                self.min_velocity,
                defaults.min_velocity,
                positive,
            ),
            min_settle_secs: usable(
                "min_settle_secs",
                self.min_settle_secs,
                defaults.min_settle_secs,
                non_negative,
            ),
            breathing_amplitude: usable(
                "breathing_amplitude",
                self.breathing_amplitude,
                defaults.breathing_amplitude,
                non_negative,
            ),
            breathing_speed: usable(
                "breathing_speed",
                self.breathing_speed,
                defaults.breathing_speed,
                non_negative,
            ),
            initial_spread: usable(
                "initial_spread",
                self.initial_spread,
                defaults.initial_spread,
                |v| v > 0.0 && v <= 1.0,
            ),
            seed: self.seed,
        }
    }
}

fn usable(field: &'static str, value: f64, default: f64, valid: impl Fn(f64) -> bool) -> f64 {
    if value.is_finite() && valid(value) {
        value
    } else {
        warn!(field, value, default, "unusable layout value, using default");
        default
    }
}
