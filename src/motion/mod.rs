//! Motion vector analyzer.
//!
//! Runs once per encoded frame while a recording is active, on whatever
//! thread the camera adapter reads the encoder's vector stream from.
//! The only state it shares with the capture controller is the
//! [`MotionTally`], which is all atomics, so `observe` never blocks the
//! encoder pipeline.
//!
//! ```text
//!  encoder ──vectors──▶ MotionAnalyzer::observe ──▶ MotionTally
//!                                                       │
//!                         capture controller ◀──reads───┘
//! ```

pub mod vectors;

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::MotionConfig;
pub use vectors::{MotionFrame, MotionVector, VectorGrid};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Per-frame verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    Motion,
    Noise,
}

/// Thresholds applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionThresholds {
    /// A block counts as moving when its magnitude is strictly above this.
    pub magnitude_min: u16,
    /// A frame is motion when strictly more blocks than this are moving.
    pub vectors_min: u32,
}

impl From<&MotionConfig> for MotionThresholds {
    fn from(c: &MotionConfig) -> Self {
        Self {
            magnitude_min: c.magnitude_min,
            vectors_min: c.vectors_min,
        }
    }
}

/// Classify a frame against `thresholds`.
pub fn classify(frame: &MotionFrame, thresholds: MotionThresholds) -> FrameClass {
    let moving = frame
        .magnitudes()
        .filter(|&m| m > thresholds.magnitude_min)
        .count();
    if moving > thresholds.vectors_min as usize {
        FrameClass::Motion
    } else {
        FrameClass::Noise
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Rolling motion statistics for the current recording.
///
/// Written from the encoder thread, read by the capture controller.
#[derive(Debug, Default)]
pub struct MotionTally {
    motion_count: AtomicU32,
    /// Clock uptime of the last motion frame, in milliseconds.
    last_motion_ms: AtomicU64,
    frames_seen: AtomicU32,
}

impl MotionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the tally for a new recording started at `started_at`.
    ///
    /// The count is seeded with 1 so that the first check window does
    /// not fail on a recording that has not produced frames yet.
    pub fn reset(&self, started_at: Duration) {
        self.motion_count.store(1, Ordering::Release);
        self.last_motion_ms
            .store(started_at.as_millis() as u64, Ordering::Release);
        self.frames_seen.store(0, Ordering::Release);
    }

    pub fn record(&self, class: FrameClass, at: Duration) {
        self.frames_seen.fetch_add(1, Ordering::AcqRel);
        if class == FrameClass::Motion {
            self.last_motion_ms
                .store(at.as_millis() as u64, Ordering::Release);
            self.motion_count.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn motion_count(&self) -> u32 {
        self.motion_count.load(Ordering::Acquire)
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen.load(Ordering::Acquire)
    }

    pub fn last_motion(&self) -> Duration {
        Duration::from_millis(self.last_motion_ms.load(Ordering::Acquire))
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Handle given to the camera for the duration of one recording.
#[derive(Debug, Clone)]
pub struct MotionAnalyzer {
    thresholds: MotionThresholds,
    tally: Arc<MotionTally>,
}

impl MotionAnalyzer {
    pub fn new(thresholds: MotionThresholds, tally: Arc<MotionTally>) -> Self {
        Self { thresholds, tally }
    }

    /// Classify one frame observed at clock time `at` and update the tally.
    pub fn observe(&self, frame: &MotionFrame, at: Duration) -> FrameClass {
        let class = classify(frame, self.thresholds);
        self.tally.record(class, at);
        class
    }
}
