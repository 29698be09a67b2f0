//! Thumbnail mosaic: N evenly spaced frames of a recording on one JPEG.
//!
//! ```text
//!   N = 9, total = 300 → stride 33 → frames 0, 33, 66, … 264
//!
//!   ┌─────┬─────┬─────┐
//!   │  0  │ 33  │ 66  │   side = ⌈√N⌉
//!   ├─────┼─────┼─────┤   each cell = preview resolution
//!   │ 99  │ 132 │ 165 │   row-major, unused cells stay black
//!   ├─────┼─────┼─────┤
//!   │ 198 │ 231 │ 264 │
//!   └─────┴─────┴─────┘
//! ```

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, RgbImage};
use log::debug;

use crate::app::ports::FrameSourcePort;
use crate::config::Resolution;
use crate::error::MosaicError;

/// An encoded mosaic ready to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mosaic {
    pub jpeg: Vec<u8>,
    /// Cells per row and per column.
    pub side: u32,
    /// Frame indices that were sampled, in cell order.
    pub frames: Vec<u64>,
}

/// `⌈√n⌉`.
pub fn grid_side(n: u32) -> u32 {
    let mut side = f64::from(n).sqrt() as u32;
    while side * side < n {
        side += 1;
    }
    side
}

/// `n` frame indices at stride `total / n`, starting at 0.
pub fn sample_indices(total: u64, n: u32) -> Result<Vec<u64>, MosaicError> {
    if n == 0 || total < u64::from(n) {
        return Err(MosaicError::NotEnoughFrames {
            total,
            requested: n,
        });
    }
    let stride = total / u64::from(n);
    Ok((0..u64::from(n)).map(|i| i * stride).collect())
}

/// Sample, compose and encode the mosaic of `video`.
pub fn build<F: FrameSourcePort + ?Sized>(
    source: &mut F,
    video: &Path,
    n: u32,
    cell: Resolution,
    quality: u8,
) -> Result<Mosaic, MosaicError> {
    let total = source.frame_count(video)?;
    let frames = sample_indices(total, n)?;
    debug!("Mosaic: {} of {} frames, stride {}", n, total, total / u64::from(n));

    let images = frames
        .iter()
        .map(|&idx| source.frame_at(video, idx))
        .collect::<Result<Vec<_>, _>>()?;

    let side = grid_side(n);
    let canvas = compose(&images, side, cell);
    Ok(Mosaic {
        jpeg: encode_jpeg(&canvas, quality)?,
        side,
        frames,
    })
}

/// Paste `images`, each resized to `cell`, row-major onto a `side×side` grid.
pub fn compose(images: &[RgbImage], side: u32, cell: Resolution) -> RgbImage {
    let mut canvas = RgbImage::new(cell.width * side, cell.height * side);
    for (i, img) in images.iter().take((side * side) as usize).enumerate() {
        let i = i as u32;
        let (row, col) = (i / side, i % side);
        let thumb = fit(img, cell);
        imageops::replace(
            &mut canvas,
            &thumb,
            i64::from(col * cell.width),
            i64::from(row * cell.height),
        );
    }
    canvas
}

/// Load a still from disk and shrink it to `cell` for attaching.
pub fn preview_from_file(path: &Path, cell: Resolution, quality: u8) -> Result<Vec<u8>, MosaicError> {
    let img = image::open(path)?.to_rgb8();
    encode_jpeg(&fit(&img, cell), quality)
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, MosaicError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

fn fit(img: &RgbImage, cell: Resolution) -> RgbImage {
    if img.dimensions() == (cell.width, cell.height) {
        img.clone()
    } else {
        imageops::resize(img, cell.width, cell.height, FilterType::Triangle)
    }
}
