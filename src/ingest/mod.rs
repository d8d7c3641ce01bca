//! Media sources.
//!
//! This module provides the two ways a frame enters the pipeline:
//! - `load_image`: one still image decoded into a single `RasterFrame`
//! - `VideoSource`: a lazy, finite, non-restartable frame sequence from a
//!   video file (ffmpeg behind `ingest-file-ffmpeg`, plus a `stub://`
//!   synthetic source for tests)
//!
//! Sources produce tightly packed RGB24 frames and nothing else. Decoder
//! handles are scoped to one processing call and released on drop, on
//! every exit path.

mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;

pub use file::{VideoConfig, VideoSource};

use crate::frame::RasterFrame;
use crate::MediaError;

/// A lazy sequence of decoded frames.
///
/// Finite, consumed front to back, not restartable. `next_frame` returns
/// `Ok(None)` at exhaustion; a mid-stream decode failure is a terminal
/// `MediaError::LoadFailed`.
pub trait FrameSource {
    /// Best-effort frame count, used only for progress reporting.
    fn total_frames(&self) -> Option<u64>;

    /// Decode and return the next frame, or `None` once exhausted.
    fn next_frame(&mut self) -> Result<Option<RasterFrame>, MediaError>;
}

/// Load a still image as a single RGB24 frame.
pub fn load_image(path: &str) -> Result<RasterFrame, MediaError> {
    let decoded = image::open(path)
        .map_err(|e| MediaError::LoadFailed(format!("could not load image {}: {}", path, e)))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    RasterFrame::new(width, height, rgb.into_raw())
}
