use crate::analysis::Analyzer;
use crate::config::Config;
use crate::export::VideoExporter;
use crate::model::{Bounds, Movement};
use crate::population::Population;
use crate::render::FrameRenderer;
use crate::simulation::{Exporter, Simulation};
use anyhow::{Context, Result};
use glob::glob;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rmp_serde::encode;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Owns a simulation directory: its config and every file a run produces.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn run_simulation(&self) -> Result<()> {
        let mut rng = match self.cfg.run.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let pop_cfg = &self.cfg.population;
        let mov_cfg = &self.cfg.movement;
        let bounds = Bounds::new(pop_cfg.max_x, pop_cfg.max_y)?;
        let movement = Movement::new(
            mov_cfg.chance_to_move,
            mov_cfg.move_radius,
            mov_cfg.max_attempts,
        )?;
        let population = Population::new(
            pop_cfg.quantity,
            bounds,
            movement,
            pop_cfg.infected_rate,
            &mut rng,
        )
        .context("failed to create population")?;
        log::info!(
            "created population of {} with {} infected",
            population.quantity(),
            population.infected_count()
        );

        let out_cfg = &self.cfg.output;
        let mut renderer = FrameRenderer::init(
            self.frames_dir(),
            (out_cfg.frame_width, out_cfg.frame_height),
        )
        .context("failed to initialize renderer")?;
        let exporter = out_cfg.video.then(|| {
            VideoExporter::new(self.frames_dir(), self.video_file(), out_cfg.frame_rate)
        });

        let mut sim = Simulation::new(population, rng, self.cfg.run.episodes);
        let trajectory = sim
            .run(
                &mut renderer,
                exporter.as_ref().map(|exp| exp as &dyn Exporter),
            )
            .context("failed to run simulation")?;
        log::info!(
            "final infection rate {:.4} ({} of {})",
            sim.population().infection_rate(),
            sim.population().infected_count(),
            sim.population().quantity()
        );

        let trajectory_file = self.trajectory_file();
        let file = File::create(&trajectory_file)
            .with_context(|| format!("failed to create {trajectory_file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &trajectory).context("failed to serialize trajectory")?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("created {trajectory_file:?}");

        Ok(())
    }

    pub fn run_analysis(&self) -> Result<()> {
        // Starting point comes from the trajectory, not the current config.
        let trajectory_file = self.trajectory_file();
        let analyzer = Analyzer::from_file(&trajectory_file)
            .with_context(|| format!("failed to analyze {trajectory_file:?}"))?;

        let results_file = self.results_file();
        analyzer
            .save_results(&results_file)
            .context("failed to save results")?;
        log::info!("created {results_file:?}");

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let frames_dir = self.frames_dir();
        if frames_dir.exists() {
            fs::remove_dir_all(&frames_dir)
                .with_context(|| format!("failed to remove {frames_dir:?}"))?;
            log::info!("removed {frames_dir:?}");
        }

        for name in ["trajectory.msgpack", "results.json", "*.mp4"] {
            let pattern = self.sim_dir.join(name);
            let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
            for file in glob(pattern).context("failed to glob files")? {
                let file = file.context("failed to read glob entry")?;
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }

        Ok(())
    }

    fn frames_dir(&self) -> PathBuf {
        self.sim_dir.join("frames")
    }

    fn video_file(&self) -> PathBuf {
        self.sim_dir.join("movie.mp4")
    }

    fn trajectory_file(&self) -> PathBuf {
        self.sim_dir.join("trajectory.msgpack")
    }

    fn results_file(&self) -> PathBuf {
        self.sim_dir.join("results.json")
    }
}
