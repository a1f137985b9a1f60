//! Simulation data types.

use crate::error::{SimError, SimResult};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};

/// Number of decimal digits kept for positions and displacements.
const PRECISION: f64 = 100.0;

fn round_to_precision(val: f64) -> f64 {
    (val * PRECISION).round() / PRECISION
}

/// Rectangular area `[0, max_x] x [0, max_y]` agents live in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(max_x: f64, max_y: f64) -> SimResult<Self> {
        if !(max_x > 0.0 && max_y > 0.0 && max_x.is_finite() && max_y.is_finite()) {
            return Err(SimError::InvalidArgument(format!(
                "area bounds must be positive and finite, but are ({max_x}, {max_y})"
            )));
        }
        Ok(Self { max_x, max_y })
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.max_x).contains(&x) && (0.0..=self.max_y).contains(&y)
    }
}

/// Movement policy applied uniformly to all agents each step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub chance_to_move: f64,
    pub move_radius: f64,
    /// Maximum number of rejected candidate positions per move.
    pub max_attempts: usize,
}

impl Movement {
    pub fn new(chance_to_move: f64, move_radius: f64, max_attempts: usize) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&chance_to_move) {
            return Err(SimError::InvalidArgument(format!(
                "chance to move must be in [0, 1], but is {chance_to_move}"
            )));
        }
        if !(move_radius >= 0.0 && move_radius.is_finite()) {
            return Err(SimError::InvalidArgument(format!(
                "move radius must be non-negative and finite, but is {move_radius}"
            )));
        }
        if max_attempts == 0 {
            return Err(SimError::InvalidArgument(
                "maximum number of move attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            chance_to_move,
            move_radius,
            max_attempts,
        })
    }
}

/// Individual of the population.
///
/// Each agent has a position inside the area and an infection status
/// that never reverts once set.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    x: f64,
    y: f64,
    infected: bool,
}

impl Agent {
    /// Create an agent at a uniformly random position inside `bounds`.
    ///
    /// Rounding may push a coordinate past a bound that is not a multiple
    /// of the precision, so it is clamped back into the area.
    pub fn random<R: Rng + ?Sized>(bounds: &Bounds, infected: bool, rng: &mut R) -> Self {
        let x = round_to_precision(rng.random_range(0.0..=bounds.max_x));
        let y = round_to_precision(rng.random_range(0.0..=bounds.max_y));
        let x = x.clamp(0.0, bounds.max_x);
        let y = y.clamp(0.0, bounds.max_y);
        Self { x, y, infected }
    }

    #[cfg(test)]
    pub fn at(x: f64, y: f64, infected: bool) -> Self {
        Self { x, y, infected }
    }

    #[cfg(test)]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[cfg(test)]
    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn is_infected(&self) -> bool {
        self.infected
    }

    pub fn infect(&mut self) {
        self.infected = true;
    }

    pub fn distance_to(&self, other: &Agent) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Move the agent with probability `chance_to_move`.
    ///
    /// Displacements along each axis are drawn from `[-move_radius, move_radius]`
    /// and redrawn until the new position lies inside `bounds`.
    ///
    /// # Errors
    /// Returns [`SimError::Configuration`] if no in-bounds position is found
    /// within `max_attempts` draws. The agent is left where it was.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        movement: &Movement,
        bounds: &Bounds,
        rng: &mut R,
    ) -> SimResult<()> {
        let move_dist = Bernoulli::new(movement.chance_to_move)
            .map_err(|err| SimError::InvalidArgument(err.to_string()))?;
        if !move_dist.sample(rng) {
            return Ok(());
        }

        let radius = movement.move_radius;
        let disp_dist = Uniform::new_inclusive(-radius, radius)
            .map_err(|err| SimError::InvalidArgument(err.to_string()))?;

        for _ in 0..movement.max_attempts {
            let x = self.x + round_to_precision(disp_dist.sample(rng));
            let y = self.y + round_to_precision(disp_dist.sample(rng));
            if bounds.contains(x, y) {
                self.x = x;
                self.y = y;
                return Ok(());
            }
        }

        log::warn!(
            "agent at ({}, {}) found no in-bounds move in {} attempts",
            self.x,
            self.y,
            movement.max_attempts
        );
        Err(SimError::Configuration {
            attempts: movement.max_attempts,
        })
    }
}
