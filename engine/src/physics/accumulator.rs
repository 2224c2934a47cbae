//! Fixed timestep accumulator
//!
//! Frame deltas are summed and drained in whole fixed steps. The leftover
//! fraction carries over to the next frame.

use tracing::warn;

const STEP_EPSILON: f64 = 1e-9;

/// Accumulates frame time and hands out fixed steps
#[derive(Debug, Clone)]
pub struct PhysicsAccumulator {
    /// Accumulated time not yet simulated
    accumulated: f64,
    /// Fixed timestep for physics updates
    fixed_timestep: f64,
    /// Optional cap on steps per frame; excess time is dropped
    max_steps: Option<u32>,
}

impl PhysicsAccumulator {
    /// Create a new physics accumulator with the given fixed timestep
    pub fn new(fixed_timestep: f64) -> Self {
        Self {
            accumulated: 0.0,
            fixed_timestep,
            max_steps: None,
        }
    }

    /// Limit the number of steps one frame may produce
    pub fn with_max_steps(mut self, max_steps: Option<u32>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Add frame time and return the number of whole fixed steps to run.
    /// Negative or non-finite deltas are ignored.
    pub fn accumulate(&mut self, delta_time: f64) -> u32 {
        if !delta_time.is_finite() || delta_time < 0.0 {
            warn!(delta_time, "Ignoring invalid physics delta time");
            return 0;
        }
        self.accumulated += delta_time;

        // Tolerance keeps 3.5 steps from turning into 2 through rounding
        let mut steps = (self.accumulated / self.fixed_timestep + STEP_EPSILON).floor() as u32;
        self.accumulated = (self.accumulated - steps as f64 * self.fixed_timestep).max(0.0);

        if let Some(max_steps) = self.max_steps {
            if steps > max_steps {
                warn!(steps, max_steps, "Physics fell behind, dropping simulated time");
                steps = max_steps;
            }
        }
        steps
    }

    /// Fraction of a step left over, in `[0, 1)`
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulated / self.fixed_timestep
    }

    /// Reset the accumulator to zero
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Get the current accumulated time
    pub fn accumulated_time(&self) -> f64 {
        self.accumulated
    }

    pub fn fixed_timestep(&self) -> f64 {
        self.fixed_timestep
    }
}

impl Default for PhysicsAccumulator {
    fn default() -> Self {
        Self::new(1.0 / 50.0)
    }
}
