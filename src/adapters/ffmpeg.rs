//! `ffmpeg` / `ffprobe` adapter: transcoding and frame extraction.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::RgbImage;
use log::debug;

use crate::app::ports::{FrameSourcePort, TranscoderPort};
use crate::config::BaseConfig;
use crate::error::{ConversionError, MosaicError};

pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Ffmpeg {
    pub fn new(config: &BaseConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
        }
    }
}

/// Remux the raw H.264 stream into an MP4 without re-encoding.
fn transcode_args(raw: &Path, out: &Path, framerate: u32) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-framerate".into(),
        framerate.to_string().into(),
        "-i".into(),
        raw.into(),
        "-c".into(),
        "copy".into(),
        out.into(),
    ]
}

fn frame_count_args(video: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "error".into(),
        "-count_frames".into(),
        "-select_streams".into(),
        "v:0".into(),
        "-show_entries".into(),
        "stream=nb_read_frames".into(),
        "-of".into(),
        "csv=p=0".into(),
        video.into(),
    ]
}

/// Decode frame `index` and write it to stdout as PNG.
fn frame_at_args(video: &Path, index: u64) -> Vec<OsString> {
    vec![
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        video.into(),
        "-vf".into(),
        format!("select=eq(n\\,{index})").into(),
        "-vframes".into(),
        "1".into(),
        "-f".into(),
        "image2pipe".into(),
        "-vcodec".into(),
        "png".into(),
        "-".into(),
    ]
}

fn parse_frame_count(stdout: &[u8]) -> Result<u64, MosaicError> {
    let text = String::from_utf8_lossy(stdout);
    let first = text.lines().next().unwrap_or("").trim().trim_end_matches(',');
    first
        .parse()
        .map_err(|_| MosaicError::Probe(format!("unexpected frame count {first:?}")))
}

impl TranscoderPort for Ffmpeg {
    fn transcode(&mut self, raw: &Path, out: &Path, framerate: u32) -> Result<(), ConversionError> {
        debug!("CONVERT: {} -> {}", raw.display(), out.display());
        let status = Command::new(&self.ffmpeg)
            .args(transcode_args(raw, out, framerate))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(ConversionError::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(ConversionError::ExitStatus(status.to_string()))
        }
    }
}

impl FrameSourcePort for Ffmpeg {
    fn frame_count(&mut self, video: &Path) -> Result<u64, MosaicError> {
        let output = Command::new(&self.ffprobe)
            .args(frame_count_args(video))
            .stderr(Stdio::null())
            .output()
            .map_err(|e| MosaicError::Probe(e.to_string()))?;
        if !output.status.success() {
            return Err(MosaicError::Probe(format!("ffprobe exited with {}", output.status)));
        }
        parse_frame_count(&output.stdout)
    }

    fn frame_at(&mut self, video: &Path, index: u64) -> Result<RgbImage, MosaicError> {
        let frame_err = |reason: String| MosaicError::Frame { index, reason };
        let output = Command::new(&self.ffmpeg)
            .args(frame_at_args(video, index))
            .stderr(Stdio::null())
            .output()
            .map_err(|e| frame_err(e.to_string()))?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(frame_err(format!("ffmpeg exited with {}", output.status)));
        }
        Ok(image::load_from_memory(&output.stdout)?.to_rgb8())
    }
}
