use crate::simulation::{Record, Trajectory};
use crate::stats::RunningStats;
use anyhow::{Context, Result, bail};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, rec: &Record) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Infection state at the end of the run.
pub struct FinalState {
    n_steps: usize,
    last: Option<Record>,
}

impl FinalState {
    pub fn new() -> Self {
        Self {
            n_steps: 0,
            last: None,
        }
    }
}

impl Obs for FinalState {
    fn update(&mut self, rec: &Record) -> Result<()> {
        self.n_steps += 1;
        self.last = Some(rec.clone());
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "n_steps": self.n_steps,
            "final_infected_count": self.last.as_ref().map(|rec| rec.infected_count),
            "final_infection_rate": self.last.as_ref().map(|rec| rec.infection_rate),
        })
    }
}

/// Newly infected agents per step.
pub struct NewInfections {
    prev_count: usize,
    stats: RunningStats,
    peak: Option<(usize, usize)>,
}

impl NewInfections {
    pub fn new(initial_count: usize) -> Self {
        Self {
            prev_count: initial_count,
            stats: RunningStats::default(),
            peak: None,
        }
    }
}

impl Obs for NewInfections {
    fn update(&mut self, rec: &Record) -> Result<()> {
        let Some(n_new) = rec.infected_count.checked_sub(self.prev_count) else {
            bail!(
                "infected count decreased from {} to {} at step {}",
                self.prev_count,
                rec.infected_count,
                rec.step
            );
        };
        self.prev_count = rec.infected_count;
        self.stats.push(n_new as f64);

        if n_new > 0 && self.peak.is_none_or(|(_, peak)| n_new > peak) {
            self.peak = Some((rec.step, n_new));
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "new_infections": self.stats.summary(),
            "peak_step": self.peak.map(|(step, _)| step),
            "peak_new_infections": self.peak.map_or(0, |(_, n_new)| n_new),
        })
    }
}

/// First steps at which half and all of the population are infected.
pub struct Milestones {
    quantity: usize,
    half_step: Option<usize>,
    full_step: Option<usize>,
}

impl Milestones {
    pub fn new(quantity: usize) -> Self {
        Self {
            quantity,
            half_step: None,
            full_step: None,
        }
    }
}

impl Obs for Milestones {
    fn update(&mut self, rec: &Record) -> Result<()> {
        if self.half_step.is_none() && 2 * rec.infected_count >= self.quantity {
            self.half_step = Some(rec.step);
        }
        if self.full_step.is_none() && rec.infected_count == self.quantity {
            self.full_step = Some(rec.step);
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "half_infected_step": self.half_step,
            "fully_infected_step": self.full_step,
        })
    }
}

/// Summarizes a recorded trajectory through a set of observables.
pub struct Analyzer {
    initial_count: usize,
    quantity: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(quantity: usize, initial_count: usize) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(FinalState::new()),
            Box::new(NewInfections::new(initial_count)),
            Box::new(Milestones::new(quantity)),
        ];
        Self {
            initial_count,
            quantity,
            obs_ptr_vec,
        }
    }

    /// Build an analyzer from a trajectory and feed it every record.
    pub fn from_trajectory(trajectory: &Trajectory) -> Result<Self> {
        let mut analyzer = Self::new(trajectory.quantity, trajectory.initial_infected_count);
        analyzer.add_records(&trajectory.records)?;
        Ok(analyzer)
    }

    /// Build an analyzer from a MessagePack-encoded [`Trajectory`] file.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        let trajectory: Trajectory =
            decode::from_read(&mut reader).context("failed to deserialize trajectory")?;
        Self::from_trajectory(&trajectory)
    }

    pub fn add_records(&mut self, records: &[Record]) -> Result<()> {
        for rec in records {
            for obs in &mut self.obs_ptr_vec {
                obs.update(rec).context("failed to update observable")?;
            }
        }
        Ok(())
    }

    pub fn report(&self) -> serde_json::Value {
        let mut reports = vec![serde_json::json!({
            "quantity": self.quantity,
            "initial_infected_count": self.initial_count,
        })];
        reports.extend(self.obs_ptr_vec.iter().map(|obs| obs.report()));
        serde_json::Value::Array(reports)
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.report())
            .context("failed to serialize results")?;
        Ok(())
    }
}
