use crate::simulation::Exporter;
use anyhow::{Context, Result, bail};
use std::{
    path::{Path, PathBuf},
    process::Command,
};

/// Encodes the rendered frames into an MPEG-4 video with `ffmpeg`.
pub struct VideoExporter {
    frames_dir: PathBuf,
    video_file: PathBuf,
    frame_rate: u32,
}

impl VideoExporter {
    pub fn new<P, Q>(frames_dir: P, video_file: Q, frame_rate: u32) -> Self
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        Self {
            frames_dir: frames_dir.as_ref().to_path_buf(),
            video_file: video_file.as_ref().to_path_buf(),
            frame_rate,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-loglevel", "error", "-r"])
            .arg(self.frame_rate.to_string())
            .arg("-i")
            .arg(self.frames_dir.join("frame-%06d.png"))
            .args(["-vcodec", "mpeg4", "-y"])
            .arg(&self.video_file);
        cmd
    }
}

impl Exporter for VideoExporter {
    fn export(&self, frames: &[PathBuf]) -> Result<()> {
        if frames.is_empty() {
            bail!("no frames to export");
        }
        // ffmpeg reads the frames through a numbered pattern, not the list itself.
        let outside = frames
            .iter()
            .find(|frame| frame.parent() != Some(self.frames_dir.as_path()));
        if let Some(frame) = outside {
            bail!("frame {frame:?} is not inside {:?}", self.frames_dir);
        }

        log::info!("encoding {} frames into {:?}", frames.len(), self.video_file);
        let output = self
            .command()
            .output()
            .context("failed to execute ffmpeg (is it installed?)")?;

        if !output.status.success() {
            bail!(
                "ffmpeg exited with {}:\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        log::info!("created {:?}", self.video_file);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn builds_ffmpeg_invocation() {
        let exporter = VideoExporter::new("sim/frames", "sim/movie.mp4", 120);
        let cmd = exporter.command();

        assert_eq!(cmd.get_program(), "ffmpeg");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        let pattern = Path::new("sim/frames").join("frame-%06d.png");
        let video = Path::new("sim/movie.mp4");
        let expected: Vec<&OsStr> = vec![
            "-loglevel".as_ref(),
            "error".as_ref(),
            "-r".as_ref(),
            "120".as_ref(),
            "-i".as_ref(),
            pattern.as_os_str(),
            "-vcodec".as_ref(),
            "mpeg4".as_ref(),
            "-y".as_ref(),
            video.as_os_str(),
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn refuses_to_export_nothing() {
        let exporter = VideoExporter::new("frames", "movie.mp4", 30);
        assert!(exporter.export(&[]).is_err());
    }

    #[test]
    fn refuses_frames_outside_frames_dir() {
        let exporter = VideoExporter::new("frames", "movie.mp4", 30);
        let frames = vec![PathBuf::from("elsewhere/frame-000000.png")];
        let err = exporter.export(&frames).unwrap_err();
        assert!(err.to_string().contains("is not inside"));
    }
}
