use thiserror::Error;

use crate::detect::result::Detection;
use crate::frame::RasterFrame;

/// Faults raised by a detector backend.
///
/// Either kind aborts the whole processing call; the aggregator never
/// skips a faulted frame and continues.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The frame handed to the backend was unusable (inconsistent with its
    /// declared dimensions, or incompatible with the model input).
    #[error("frame could not be decoded: {0}")]
    Decode(String),
    /// The recognition capability itself faulted (model I/O, inference).
    #[error("detector backend fault: {0}")]
    Backend(#[source] anyhow::Error),
}

/// Detector adapter trait.
///
/// Implementations wrap an externally trained detection capability: given
/// one decoded frame, return the recognized objects in model output order.
/// An empty vec is a valid "nothing recognized" result, not an error.
///
/// Backends are constructed once at process start and passed by reference
/// into the aggregator; there is no hidden process-wide model instance.
pub trait DetectorBackend {
    /// Backend identifier, for logs.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Pure with respect to the frame: no observable side effects beyond
    /// the externally fixed model weights.
    fn detect(&mut self, frame: &RasterFrame) -> Result<Vec<Detection>, DetectionError>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<(), DetectionError> {
        Ok(())
    }
}
