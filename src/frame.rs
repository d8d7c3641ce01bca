//! Raster frame container.
//!
//! Every source produces `RasterFrame` instances: tightly packed RGB24
//! pixels with the length invariant checked at construction, so detector
//! backends can rely on `pixels.len() == width * height * 3`.

use crate::MediaError;

const RGB_CHANNELS: usize = 3;

/// One decoded RGB24 frame.
#[derive(Clone, Debug)]
pub struct RasterFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterFrame {
    /// Build a frame from tightly packed RGB24 bytes.
    ///
    /// Fails with `MediaError::LoadFailed` when the buffer length does not
    /// match the declared dimensions; a frame that violates the invariant
    /// never reaches a detector.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, MediaError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(RGB_CHANNELS))
            .ok_or_else(|| {
                MediaError::LoadFailed(format!("frame dimensions {}x{} overflow", width, height))
            })?;
        if pixels.len() != expected {
            return Err(MediaError::LoadFailed(format!(
                "expected {} RGB bytes for a {}x{} frame, received {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed RGB24 pixel data, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_buffer() {
        let frame = RasterFrame::new(2, 2, vec![0u8; 12]).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.pixels().len(), 12);
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = RasterFrame::new(2, 2, vec![0u8; 11]).unwrap_err();
        assert!(matches!(err, MediaError::LoadFailed(_)));
    }

    #[test]
    fn rejects_dimension_overflow() {
        let err = RasterFrame::new(u32::MAX, u32::MAX, Vec::new()).unwrap_err();
        assert!(matches!(err, MediaError::LoadFailed(_)));
    }
}
