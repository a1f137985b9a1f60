use crate::error::{SimError, SimResult};
use crate::model::{Agent, Bounds, Movement};
use rand::Rng;

/// Maximum distance at which an infected agent infects a healthy one.
pub const INFECTION_DISTANCE: f64 = 1.0;

/// Number of agents infected at creation: `max(1, floor(quantity * infected_rate))`.
pub fn initial_infected_count(quantity: usize, infected_rate: f64) -> usize {
    ((quantity as f64 * infected_rate).floor() as usize).clamp(1, quantity.max(1))
}

/// Fixed-size population of agents sharing an area and a movement policy.
///
/// Owns its agents and the per-step infection history. Agents are only
/// mutated through [`Population::step`] and its parts.
#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<Agent>,
    bounds: Bounds,
    movement: Movement,
    rate_history: Vec<f64>,
}

impl Population {
    /// Create `quantity` agents at random positions.
    ///
    /// The first [`initial_infected_count`] agents are infected.
    pub fn new<R: Rng + ?Sized>(
        quantity: usize,
        bounds: Bounds,
        movement: Movement,
        infected_rate: f64,
        rng: &mut R,
    ) -> SimResult<Self> {
        if quantity == 0 {
            return Err(SimError::InvalidArgument(
                "population must have at least one agent".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&infected_rate) {
            return Err(SimError::InvalidArgument(format!(
                "infected rate must be in [0, 1], but is {infected_rate}"
            )));
        }

        let n_infected = initial_infected_count(quantity, infected_rate);

        let agents = (0..quantity)
            .map(|i_agt| Agent::random(&bounds, i_agt < n_infected, rng))
            .collect();

        Ok(Self::assemble(agents, bounds, movement))
    }

    #[cfg(test)]
    pub fn from_agents(agents: Vec<Agent>, bounds: Bounds, movement: Movement) -> SimResult<Self> {
        if agents.is_empty() {
            return Err(SimError::InvalidArgument(
                "population must have at least one agent".to_string(),
            ));
        }
        if let Some((i_agt, agt)) = agents
            .iter()
            .enumerate()
            .find(|(_, agt)| !bounds.contains(agt.x(), agt.y()))
        {
            return Err(SimError::InvalidArgument(format!(
                "agent {i_agt} at {:?} lies outside the area",
                agt.position()
            )));
        }

        Ok(Self::assemble(agents, bounds, movement))
    }

    fn assemble(agents: Vec<Agent>, bounds: Bounds, movement: Movement) -> Self {
        Self {
            agents,
            bounds,
            movement,
            rate_history: Vec::new(),
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn movement(&self) -> &Movement {
        &self.movement
    }

    pub fn quantity(&self) -> usize {
        self.agents.len()
    }

    /// Infection rate recorded after each completed step.
    pub fn rate_history(&self) -> &[f64] {
        &self.rate_history
    }

    pub fn infected_count(&self) -> usize {
        self.agents.iter().filter(|agt| agt.is_infected()).count()
    }

    /// Fraction of infected agents, in `[0, 1]`.
    pub fn infection_rate(&self) -> f64 {
        self.infected_count() as f64 / self.agents.len() as f64
    }

    /// Move every agent once.
    pub fn move_agents<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<()> {
        for agt in &mut self.agents {
            agt.step(&self.movement, &self.bounds, rng)?;
        }
        Ok(())
    }

    /// Run one propagation pass over all agent pairs.
    ///
    /// Pairs are visited with `i` ascending and `j > i` ascending, and an
    /// infection is visible to every later pair of the same pass, so one pass
    /// can chain through several agents.
    pub fn propagate_infection(&mut self) {
        let n_agt = self.agents.len();
        for i in 0..n_agt {
            for j in (i + 1)..n_agt {
                let (a, b) = (&self.agents[i], &self.agents[j]);
                if a.is_infected() == b.is_infected() {
                    continue;
                }
                if a.distance_to(b) <= INFECTION_DISTANCE {
                    self.agents[i].infect();
                    self.agents[j].infect();
                }
            }
        }
    }

    /// Advance the population by one step and record the resulting infection rate.
    ///
    /// Returns the infection rate after the step.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<f64> {
        self.move_agents(rng)?;
        self.propagate_infection();

        let rate = self.infection_rate();
        self.rate_history.push(rate);

        log::debug!(
            "step {}: {} infected",
            self.rate_history.len() - 1,
            self.infected_count()
        );

        Ok(rate)
    }
}
