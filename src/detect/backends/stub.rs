use std::collections::VecDeque;

use crate::detect::backend::{DetectionError, DetectorBackend};
use crate::detect::result::Detection;
use crate::frame::RasterFrame;

/// Scripted backend for tests and model-less operation.
///
/// Each `detect` call pops the next scripted frame result; once the script
/// is exhausted (or with an empty script) every frame detects nothing.
pub struct StubBackend {
    script: VecDeque<Vec<Detection>>,
    calls: u64,
}

impl StubBackend {
    /// A stub that never detects anything.
    pub fn empty() -> Self {
        Self::with_script(Vec::new())
    }

    /// A stub that replays the given per-frame detections in order.
    pub fn with_script(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            script: frames.into(),
            calls: 0,
        }
    }

    /// Number of `detect` calls observed so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::empty()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &RasterFrame) -> Result<Vec<Detection>, DetectionError> {
        self.calls += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
