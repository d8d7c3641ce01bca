//! Video file frame source.
//!
//! `VideoSource` opens a local video file and yields its frames in decode
//! order. Two backends, mirroring how detection backends are selected:
//! - `stub://<frames>[@<w>x<h>]`: synthetic frames for tests, no codec
//! - anything else: FFmpeg decoding (feature `ingest-file-ffmpeg`)

use crate::frame::RasterFrame;
use crate::ingest::FrameSource;
use crate::MediaError;

const STUB_SCHEME: &str = "stub://";
const DEFAULT_STUB_WIDTH: u32 = 64;
const DEFAULT_STUB_HEIGHT: u32 = 48;

/// Configuration for a video file source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local file path, or a `stub://` spec for the synthetic source.
    pub path: String,
}

/// Frame sequence read from one video file.
pub struct VideoSource {
    backend: VideoBackend,
}

enum VideoBackend {
    Synthetic(SyntheticVideoSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(crate::ingest::file_ffmpeg::FfmpegVideoSource),
}

impl VideoSource {
    /// Open the file, failing with `MediaError::LoadFailed` when the path
    /// cannot be opened or has no decodable video track.
    pub fn open(config: VideoConfig) -> Result<Self, MediaError> {
        if config.path.starts_with(STUB_SCHEME) {
            let source = SyntheticVideoSource::parse(&config.path)?;
            log::info!("VideoSource: opened {} (synthetic)", config.path);
            return Ok(Self {
                backend: VideoBackend::Synthetic(source),
            });
        }
        #[cfg(feature = "ingest-file-ffmpeg")]
        {
            let source = crate::ingest::file_ffmpeg::FfmpegVideoSource::open(&config)
                .map_err(|e| MediaError::LoadFailed(format!("{:#}", e)))?;
            log::info!("VideoSource: opened {} (ffmpeg)", config.path);
            Ok(Self {
                backend: VideoBackend::Ffmpeg(source),
            })
        }
        #[cfg(not(feature = "ingest-file-ffmpeg"))]
        {
            Err(MediaError::LoadFailed(format!(
                "cannot open {}: video decoding requires the ingest-file-ffmpeg feature",
                config.path
            )))
        }
    }
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            VideoBackend::Synthetic(_) => "synthetic",
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(_) => "ffmpeg",
        };
        f.debug_struct("VideoSource").field("backend", &backend).finish()
    }
}

impl FrameSource for VideoSource {
    fn total_frames(&self) -> Option<u64> {
        match &self.backend {
            VideoBackend::Synthetic(source) => source.total_frames(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.total_frames(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<RasterFrame>, MediaError> {
        match &mut self.backend {
            VideoBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            VideoBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticVideoSource {
    total: u64,
    width: u32,
    height: u32,
    emitted: u64,
}

impl SyntheticVideoSource {
    /// Parse `stub://<frames>` or `stub://<frames>@<w>x<h>`.
    fn parse(spec: &str) -> Result<Self, MediaError> {
        let invalid = || {
            MediaError::LoadFailed(format!(
                "invalid stub video spec '{}', expected stub://<frames>[@<w>x<h>]",
                spec
            ))
        };
        let rest = spec.strip_prefix(STUB_SCHEME).ok_or_else(invalid)?;
        let (frames, dims) = match rest.split_once('@') {
            Some((frames, dims)) => (frames, Some(dims)),
            None => (rest, None),
        };
        let total: u64 = frames.parse().map_err(|_| invalid())?;
        let (width, height) = match dims {
            Some(dims) => {
                let (w, h) = dims.split_once('x').ok_or_else(invalid)?;
                (
                    w.parse().map_err(|_| invalid())?,
                    h.parse().map_err(|_| invalid())?,
                )
            }
            None => (DEFAULT_STUB_WIDTH, DEFAULT_STUB_HEIGHT),
        };
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self {
            total,
            width,
            height,
            emitted: 0,
        })
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total)
    }

    fn next_frame(&mut self) -> Result<Option<RasterFrame>, MediaError> {
        if self.emitted >= self.total {
            return Ok(None);
        }
        self.emitted += 1;
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        // Deterministic per-frame pattern so repeated runs are identical.
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.emitted) % 256) as u8;
        }
        Ok(Some(RasterFrame::new(self.width, self.height, pixels)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_source_yields_declared_frame_count() {
        let mut source = VideoSource::open(VideoConfig {
            path: "stub://3@8x4".to_string(),
        })
        .unwrap();
        assert_eq!(source.total_frames(), Some(3));

        let mut frames = 0;
        while let Some(frame) = source.next_frame().unwrap() {
            assert_eq!(frame.width(), 8);
            assert_eq!(frame.height(), 4);
            frames += 1;
        }
        assert_eq!(frames, 3);
        // Exhausted sources stay exhausted.
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn stub_source_defaults_dimensions() {
        let mut source = VideoSource::open(VideoConfig {
            path: "stub://1".to_string(),
        })
        .unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.width(), DEFAULT_STUB_WIDTH);
        assert_eq!(frame.height(), DEFAULT_STUB_HEIGHT);
    }

    #[test]
    fn stub_source_rejects_malformed_specs() {
        for spec in ["stub://", "stub://abc", "stub://2@10", "stub://2@0x4"] {
            let err = VideoSource::open(VideoConfig {
                path: spec.to_string(),
            })
            .unwrap_err();
            assert!(matches!(err, MediaError::LoadFailed(_)), "{}", spec);
        }
    }
}
