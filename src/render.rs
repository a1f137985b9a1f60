use crate::simulation::{Renderer, Snapshot, frame_path};
use anyhow::{Context, Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

const MARGIN: u32 = 12;
const DOT_SIZE: i32 = 3;

/// Renders one PNG frame per step.
///
/// Left: agents in the area (infected red, healthy blue).
/// Upper right: infection rate over the run.
/// Lower right: infected and healthy counts.
pub struct FrameRenderer {
    frames_dir: PathBuf,
    size: (u32, u32),
}

impl FrameRenderer {
    /// Create a renderer writing to `frames_dir`.
    ///
    /// Any previous contents of `frames_dir` are removed.
    pub fn init<P: AsRef<Path>>(frames_dir: P, size: (u32, u32)) -> Result<Self> {
        let frames_dir = frames_dir.as_ref().to_path_buf();

        if frames_dir.exists() {
            fs::remove_dir_all(&frames_dir)
                .with_context(|| format!("failed to remove {frames_dir:?}"))?;
            log::info!("removed {frames_dir:?}");
        }
        fs::create_dir_all(&frames_dir)
            .with_context(|| format!("failed to create {frames_dir:?}"))?;
        log::info!("created {frames_dir:?}");

        Ok(Self { frames_dir, size })
    }
}

impl Renderer for FrameRenderer {
    fn render(&mut self, snapshot: &Snapshot) -> Result<PathBuf> {
        let file = frame_path(&self.frames_dir, snapshot.step);
        log::debug!(
            "rendering {file:?} (rate {:.4}, chance to move {}, move radius {})",
            snapshot.infection_rate,
            snapshot.movement.chance_to_move,
            snapshot.movement.move_radius
        );

        {
            let root = BitMapBackend::new(&file, self.size).into_drawing_area();
            draw_frame(&root, snapshot).map_err(|err| anyhow!("failed to draw frame: {err}"))?;
            root.present()
                .map_err(|err| anyhow!("failed to write {file:?}: {err}"))?;
        }

        Ok(file)
    }
}

fn draw_frame<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    snapshot: &Snapshot,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let (width, height) = root.dim_in_pixel();
    let (area, side) = root.split_horizontally(width / 2);
    let (curve, counts) = side.split_vertically(height / 2);

    draw_area(&area, snapshot)?;
    draw_curve(&curve, snapshot)?;
    draw_counts(&counts, snapshot)?;

    Ok(())
}

fn draw_area<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    snapshot: &Snapshot,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (max_x, max_y) = (snapshot.bounds.max_x, snapshot.bounds.max_y);
    let mut chart = ChartBuilder::on(area)
        .margin(MARGIN)
        .build_cartesian_2d(0.0..max_x, 0.0..max_y)?;

    chart.draw_series(std::iter::once(Rectangle::new(
        [(0.0, 0.0), (max_x, max_y)],
        BLACK.stroke_width(1),
    )))?;

    // Healthy first so infected dots stay visible on top.
    let healthy = snapshot.agents.iter().filter(|agt| !agt.is_infected());
    chart.draw_series(healthy.map(|agt| Circle::new(agt.position(), DOT_SIZE, BLUE.filled())))?;

    let infected = snapshot.agents.iter().filter(|agt| agt.is_infected());
    chart.draw_series(infected.map(|agt| Circle::new(agt.position(), DOT_SIZE, RED.filled())))?;

    Ok(())
}

fn draw_curve<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    snapshot: &Snapshot,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let episodes = snapshot.episodes.max(1) as f64;
    let mut chart = ChartBuilder::on(area)
        .margin(MARGIN)
        .build_cartesian_2d(0.0..episodes, 0.0..1.0)?;

    chart.draw_series(std::iter::once(Rectangle::new(
        [(0.0, 0.0), (episodes, 1.0)],
        BLACK.stroke_width(1),
    )))?;

    let points = snapshot
        .rate_history
        .iter()
        .enumerate()
        .map(|(step, &rate)| (step as f64, rate));
    chart.draw_series(LineSeries::new(points, RED.stroke_width(2)))?;

    Ok(())
}

fn draw_counts<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    snapshot: &Snapshot,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let quantity = snapshot.agents.len() as f64;
    let infected = snapshot.infected_count as f64;
    let mut chart = ChartBuilder::on(area)
        .margin(MARGIN)
        .build_cartesian_2d(0.0..2.0, 0.0..quantity)?;

    chart.draw_series([
        Rectangle::new([(0.2, 0.0), (0.8, infected)], RED.filled()),
        Rectangle::new([(1.2, 0.0), (1.8, quantity - infected)], BLUE.filled()),
    ])?;

    Ok(())
}
