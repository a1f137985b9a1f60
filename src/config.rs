use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub population: PopulationConfig,
    pub movement: MovementConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Population parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    /// Number of agents.
    pub quantity: usize,
    /// Width of the area.
    pub max_x: f64,
    /// Height of the area.
    pub max_y: f64,
    /// Fraction of agents infected at creation (at least one always is).
    pub infected_rate: f64,
}

/// Movement parameters shared by all agents.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovementConfig {
    /// Probability that an agent moves during a step.
    pub chance_to_move: f64,
    /// Maximum displacement along each axis.
    pub move_radius: f64,
    /// Maximum number of rejected draws before a move fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

/// Run parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of simulation steps.
    pub episodes: usize,
    /// Random seed (random if absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Frames per second of the encoded video.
    pub frame_rate: u32,
    /// Encode the frames into a video after the run.
    pub video: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_width: 1280,
            frame_height: 720,
            frame_rate: 120,
            video: true,
        }
    }
}

fn default_max_attempts() -> usize {
    10_000
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let pop = &self.population;
        check_num(pop.quantity, 1..100_000).context("invalid population quantity")?;
        check_num(pop.max_x, f64::MIN_POSITIVE..=1e6).context("invalid area width")?;
        check_num(pop.max_y, f64::MIN_POSITIVE..=1e6).context("invalid area height")?;
        check_num(pop.infected_rate, 0.0..=1.0).context("invalid infected rate")?;

        // A radius wider than the area makes rejection sampling arbitrarily slow.
        let mov = &self.movement;
        let max_radius = pop.max_x.min(pop.max_y);
        check_num(mov.chance_to_move, 0.0..=1.0).context("invalid chance to move")?;
        check_num(mov.move_radius, f64::MIN_POSITIVE..=max_radius)
            .context("invalid move radius")?;
        check_num(mov.max_attempts, 1..).context("invalid maximum number of move attempts")?;

        check_num(self.run.episodes, 1..1_000_000).context("invalid number of episodes")?;

        let out = &self.output;
        check_num(out.frame_width, 64..=8192).context("invalid frame width")?;
        check_num(out.frame_height, 64..=8192).context("invalid frame height")?;
        check_num(out.frame_rate, 1..=240).context("invalid frame rate")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
