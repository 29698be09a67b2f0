//! Raw motion-vector records as emitted by the H.264 encoder.
//!
//! The encoder produces one record per 16×16 macroblock, plus one extra
//! column per row, for every encoded frame:
//!
//! ```text
//!  byte   0        1        2..3
//!        ┌────────┬────────┬──────────────┐
//!        │ x: i8  │ y: i8  │ sad: u16 LE  │
//!        └────────┴────────┴──────────────┘
//! ```
//!
//! A `w×h` recording therefore yields `(⌈w/16⌉ + 1) × ⌈h/16⌉` records
//! (4 bytes each) per frame.

use crate::config::Resolution;

/// Size of one vector record in bytes.
pub const RECORD_LEN: usize = 4;

/// Macroblock edge length in pixels.
pub const MACROBLOCK: u32 = 16;

/// Magnitudes are clipped to this value.
pub const MAGNITUDE_SENTINEL: u16 = 255;

/// One macroblock's motion vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionVector {
    pub x: i8,
    pub y: i8,
    /// Sum of absolute differences for the block.
    pub sad: u16,
}

impl MotionVector {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y, sad: 0 }
    }

    /// `sqrt(x² + y²)`, clipped to [`MAGNITUDE_SENTINEL`].
    pub fn magnitude(&self) -> u16 {
        let x = i32::from(self.x);
        let y = i32::from(self.y);
        let mag = f64::from(x * x + y * y).sqrt() as u16;
        mag.min(MAGNITUDE_SENTINEL)
    }

    fn from_record(rec: &[u8]) -> Self {
        Self {
            x: rec[0] as i8,
            y: rec[1] as i8,
            sad: u16::from_le_bytes([rec[2], rec[3]]),
        }
    }
}

/// Grid dimensions of the vector array for a recording resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorGrid {
    pub cols: usize,
    pub rows: usize,
}

impl VectorGrid {
    pub fn for_resolution(res: Resolution) -> Self {
        Self {
            cols: res.width.div_ceil(MACROBLOCK) as usize + 1,
            rows: res.height.div_ceil(MACROBLOCK) as usize,
        }
    }

    /// Number of records in one frame.
    pub fn records(&self) -> usize {
        self.cols * self.rows
    }

    /// Number of bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.records() * RECORD_LEN
    }
}

/// The decoded vectors of one encoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MotionFrame {
    pub vectors: Vec<MotionVector>,
}

impl MotionFrame {
    pub fn new(vectors: Vec<MotionVector>) -> Self {
        Self { vectors }
    }

    /// Decode one frame's worth of records.
    ///
    /// Returns `None` when `bytes` is not exactly one frame for `grid`.
    pub fn decode(bytes: &[u8], grid: VectorGrid) -> Option<Self> {
        if bytes.len() != grid.frame_len() {
            return None;
        }
        let vectors = bytes
            .chunks_exact(RECORD_LEN)
            .map(MotionVector::from_record)
            .collect();
        Some(Self { vectors })
    }

    /// Iterator over every block magnitude.
    pub fn magnitudes(&self) -> impl Iterator<Item = u16> + '_ {
        self.vectors.iter().map(MotionVector::magnitude)
    }
}
