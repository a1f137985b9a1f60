use crate::error::{SimError, SimResult};
use crate::model::{Agent, Bounds, Movement};
use crate::population::Population;
use anyhow::Result;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Read-only view of the population after a step.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub step: usize,
    pub episodes: usize,
    pub agents: &'a [Agent],
    pub rate_history: &'a [f64],
    pub infected_count: usize,
    pub infection_rate: f64,
    pub bounds: &'a Bounds,
    pub movement: &'a Movement,
}

/// Record of the simulation at a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub step: usize,
    pub infected_count: usize,
    pub infection_rate: f64,
}

/// Everything a run records: the starting point and one record per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub quantity: usize,
    pub initial_infected_count: usize,
    pub records: Vec<Record>,
}

/// Produces one artifact per step.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot) -> Result<PathBuf>;
}

/// Consolidates the per-step artifacts once the run is over.
pub trait Exporter {
    fn export(&self, frames: &[PathBuf]) -> Result<()>;
}

/// Simulation loop.
///
/// Drives a population for a fixed number of steps, handing a snapshot
/// to the renderer after each one.
pub struct Simulation {
    population: Population,
    rng: ChaCha12Rng,
    episodes: usize,
}

impl Simulation {
    pub fn new(population: Population, rng: ChaCha12Rng, episodes: usize) -> Self {
        Self {
            population,
            rng,
            episodes,
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Run every episode, then export the rendered frames.
    ///
    /// The exporter is skipped when no frame was rendered.
    /// Any step, render or export failure aborts the run.
    pub fn run(
        &mut self,
        renderer: &mut dyn Renderer,
        exporter: Option<&dyn Exporter>,
    ) -> SimResult<Trajectory> {
        let quantity = self.population.quantity();
        let initial_infected_count = self.population.infected_count();
        let mut records = Vec::with_capacity(self.episodes);
        let mut frames = Vec::with_capacity(self.episodes);

        for step in 0..self.episodes {
            let infection_rate = self.population.step(&mut self.rng)?;
            let infected_count = self.population.infected_count();

            let snapshot = Snapshot {
                step,
                episodes: self.episodes,
                agents: self.population.agents(),
                rate_history: self.population.rate_history(),
                infected_count,
                infection_rate,
                bounds: self.population.bounds(),
                movement: self.population.movement(),
            };
            let frame = renderer
                .render(&snapshot)
                .map_err(|err| SimError::Collaborator(err.context(format!("step {step}"))))?;
            frames.push(frame);

            records.push(Record {
                step,
                infected_count,
                infection_rate,
            });

            log_progress(step, self.episodes);
        }

        if let Some(exporter) = exporter {
            if !frames.is_empty() {
                exporter.export(&frames).map_err(SimError::Collaborator)?;
            }
        }

        Ok(Trajectory {
            quantity,
            initial_infected_count,
            records,
        })
    }
}

fn log_progress(step: usize, episodes: usize) {
    // Roughly one line per percent.
    let stride = (episodes / 100).max(1);
    if (step + 1) % stride == 0 || step + 1 == episodes {
        let progress = 100.0 * (step + 1) as f64 / episodes as f64;
        log::info!("completed {progress:06.2}%");
    }
}

/// Frame file name for a step.
pub fn frame_name(step: usize) -> String {
    format!("frame-{step:06}.png")
}

/// Path of a step's frame inside `dir`.
pub fn frame_path(dir: &Path, step: usize) -> PathBuf {
    dir.join(frame_name(step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use rand::SeedableRng;
    use std::cell::Cell;

    #[derive(Default)]
    struct RecordingRenderer {
        steps: Vec<usize>,
        history_lens: Vec<usize>,
        agent_counts: Vec<usize>,
        fail_at: Option<usize>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, snapshot: &Snapshot) -> Result<PathBuf> {
            if self.fail_at == Some(snapshot.step) {
                bail!("disk full");
            }
            self.steps.push(snapshot.step);
            self.history_lens.push(snapshot.rate_history.len());
            self.agent_counts.push(snapshot.agents.len());
            assert_eq!(snapshot.rate_history.last(), Some(&snapshot.infection_rate));
            Ok(PathBuf::from(frame_name(snapshot.step)))
        }
    }

    #[derive(Default)]
    struct CountingExporter {
        calls: Cell<usize>,
        n_frames: Cell<usize>,
    }

    impl Exporter for CountingExporter {
        fn export(&self, frames: &[PathBuf]) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            self.n_frames.set(frames.len());
            Ok(())
        }
    }

    fn simulation(seed: u64, episodes: usize) -> Simulation {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let bounds = Bounds::new(10.0, 10.0).unwrap();
        let movement = Movement::new(0.3, 0.5, 10_000).unwrap();
        let population = Population::new(60, bounds, movement, 0.05, &mut rng).unwrap();
        Simulation::new(population, rng, episodes)
    }

    #[test]
    fn runs_every_episode_in_order() {
        let mut sim = simulation(20, 25);
        let mut renderer = RecordingRenderer::default();
        let exporter = CountingExporter::default();

        let trajectory = sim.run(&mut renderer, Some(&exporter)).unwrap();
        let records = &trajectory.records;

        assert_eq!(trajectory.quantity, 60);
        assert_eq!(trajectory.initial_infected_count, 3);
        assert_eq!(records.len(), 25);
        assert_eq!(sim.population().rate_history().len(), 25);
        assert_eq!(renderer.steps, (0..25).collect::<Vec<_>>());
        assert_eq!(renderer.history_lens, (1..=25).collect::<Vec<_>>());
        assert!(renderer.agent_counts.iter().all(|&n| n == 60));
        assert_eq!(exporter.calls.get(), 1);
        assert_eq!(exporter.n_frames.get(), 25);

        for (i_rec, rec) in records.iter().enumerate() {
            assert_eq!(rec.step, i_rec);
            assert!((0.0..=1.0).contains(&rec.infection_rate));
            assert_eq!(rec.infection_rate, rec.infected_count as f64 / 60.0);
        }
        assert!(
            records
                .windows(2)
                .all(|w| w[0].infected_count <= w[1].infected_count)
        );
    }

    #[test]
    fn same_seed_gives_same_run() {
        let mut renderer = RecordingRenderer::default();
        let a = simulation(21, 40).run(&mut renderer, None).unwrap();
        let mut renderer = RecordingRenderer::default();
        let b = simulation(21, 40).run(&mut renderer, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_episodes_skip_export() {
        let mut sim = simulation(23, 0);
        let mut renderer = RecordingRenderer::default();
        let exporter = CountingExporter::default();

        let trajectory = sim.run(&mut renderer, Some(&exporter)).unwrap();

        assert!(trajectory.records.is_empty());
        assert!(renderer.steps.is_empty());
        assert_eq!(exporter.calls.get(), 0);
        assert!(sim.population().rate_history().is_empty());
    }

    #[test]
    fn renderer_failure_aborts_run() {
        let mut sim = simulation(22, 10);
        let mut renderer = RecordingRenderer {
            fail_at: Some(3),
            ..Default::default()
        };
        let exporter = CountingExporter::default();

        let err = sim.run(&mut renderer, Some(&exporter)).unwrap_err();

        assert!(matches!(err, SimError::Collaborator(_)));
        assert_eq!(renderer.steps, vec![0, 1, 2]);
        assert_eq!(exporter.calls.get(), 0);
    }

    #[test]
    fn frame_names_sort_by_step() {
        assert_eq!(frame_name(7), "frame-000007.png");
        assert!(frame_name(99) < frame_name(100));
    }
}
