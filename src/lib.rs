//! signlens - sign-language media detection core
//!
//! This crate drives a pretrained sign-language letter/gesture detector
//! across the frames of a media file and folds the per-frame outputs into
//! a deduplicated text summary plus per-frame bounding-box annotations.
//!
//! # Module Structure
//!
//! - `frame`: RGB24 raster frame container (`RasterFrame`)
//! - `detect`: detector adapter trait and backends (stub, tract)
//! - `ingest`: media sources (still images, video frame sequences)
//! - `aggregate`: the media aggregator (`process_image` / `process_video`)
//! - `config`: file + environment configuration for the CLI
//!
//! One call processes one file, synchronously, start to finish. Nothing is
//! retained between calls: each call owns its frame source, its detection
//! buffers, and its dedup state exclusively.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;

pub use aggregate::{AggregateResult, Annotations, FrameResult, MediaAggregator};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{BoundingBox, Detection, DetectionError, DetectorBackend, StubBackend};
pub use frame::RasterFrame;
pub use ingest::{load_image, FrameSource, VideoConfig, VideoSource};

/// Media kind for a single processing call.
///
/// Serialized lowercase, matching the `media_type` field the caller returns
/// to its clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Choose the processing path from a file extension.
    ///
    /// This is the dispatch the upload shell performs before calling the
    /// aggregator; anything outside the known extension lists is rejected
    /// rather than guessed at.
    pub fn from_path(path: &str) -> Result<Self, MediaError> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "gif" => Ok(MediaKind::Image),
            "mp4" | "avi" | "mov" | "mkv" => Ok(MediaKind::Video),
            _ => Err(MediaError::UnsupportedKind(format!(
                "unsupported file type: {}",
                path
            ))),
        }
    }
}

/// Terminal errors for a single media-processing call.
///
/// A failure is always distinguishable from "zero detections found": zero
/// detections is a successful result with an empty summary.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Path missing, unreadable, or undecodable. Not retried.
    #[error("failed to load media: {0}")]
    LoadFailed(String),
    /// Media kind not recognized. Dispatch normally happens above the
    /// aggregator, but an invalid kind is still rejected here.
    #[error("unsupported media kind: {0}")]
    UnsupportedKind(String),
    /// The detector adapter faulted. The whole call aborts; there is no
    /// per-frame skip-and-continue and no partial result.
    #[error("detection failed: {0}")]
    DetectionFailed(#[from] DetectionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_from_known_extensions() {
        for path in ["a.jpg", "b.JPEG", "c.png", "d.bmp", "e.gif"] {
            assert_eq!(MediaKind::from_path(path).unwrap(), MediaKind::Image);
        }
        for path in ["a.mp4", "b.AVI", "c.mov", "d.mkv"] {
            assert_eq!(MediaKind::from_path(path).unwrap(), MediaKind::Video);
        }
    }

    #[test]
    fn media_kind_rejects_unknown_extensions() {
        for path in ["notes.txt", "archive.tar.gz", "no_extension", "upload.webm"] {
            let err = MediaKind::from_path(path).unwrap_err();
            assert!(matches!(err, MediaError::UnsupportedKind(_)), "{}", path);
        }
    }

    #[test]
    fn media_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MediaKind::Image).unwrap(),
            "\"image\""
        );
        assert_eq!(
            serde_json::to_string(&MediaKind::Video).unwrap(),
            "\"video\""
        );
    }
}
