//! Frame-wise detection aggregation.
//!
//! This is the core of the crate: drive a detector backend across the
//! frames of one media file and fold the per-frame outputs into
//! - `summary_text`: a kind-dependent text reduction, and
//! - `annotations`: bounding-box records for client-side overlay drawing.
//!
//! Images run the detector once; the summary is the detected labels joined
//! with single spaces, in detector output order. Videos run the detector
//! per frame; each frame's labels are concatenated with no separator and
//! the summary is the concatenation of the *distinct* per-frame strings.
//! The dedup is deliberately string-level, not label-level: two frames
//! detecting the same classes in the same order collapse to one entry,
//! while a reordered or extended frame counts as a new one. This is a
//! coarse "scene text changed" signal, not a per-class histogram.
//!
//! A single linear pass; no state machine, no retries. The first fault
//! aborts the whole call.

use std::collections::HashSet;

use serde::Serialize;

use crate::detect::{Detection, DetectorBackend};
use crate::ingest::{load_image, FrameSource, VideoConfig, VideoSource};
use crate::{MediaError, MediaKind};

/// Progress side channel: `(current_frame, total_frames)`.
///
/// Invoked once per processed frame. Purely observational; it cannot
/// affect the result and its absence is never an error.
pub type ProgressFn = dyn FnMut(u64, Option<u64>);

/// The detections recorded for one video frame.
///
/// `frame_index` is the decoder-reported 1-based position; indices are
/// unique and increasing within one call, but not contiguous when frame
/// sampling is enabled. Serializes as `frame` plus a nested `annotations`
/// list, the per-frame record shape clients already consume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameResult {
    #[serde(rename = "frame")]
    pub frame_index: u64,
    #[serde(rename = "annotations")]
    pub detections: Vec<Detection>,
}

/// Kind-dependent annotation payload: flat detections for an image, one
/// `FrameResult` per processed frame for a video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Annotations {
    Image(Vec<Detection>),
    Video(Vec<FrameResult>),
}

/// The final output for one media file.
///
/// Serializes to the `text` / `annotations` / `media_type` fields the
/// caller returns to its clients. Constructed once per call and handed
/// back; nothing is retained.
#[derive(Clone, Debug, Serialize)]
pub struct AggregateResult {
    #[serde(rename = "text")]
    pub summary_text: String,
    pub annotations: Annotations,
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
}

/// Drives a detector backend across the frames of one media file.
///
/// Owns only per-call policy (frame sampling, progress reporting); all
/// per-call data lives on the stack of the processing method, so one
/// aggregator value can serve sequential calls.
pub struct MediaAggregator {
    frame_step: u64,
    progress: Option<Box<ProgressFn>>,
}

impl MediaAggregator {
    /// An aggregator that processes every frame and reports no progress.
    pub fn new() -> Self {
        Self {
            frame_step: 1,
            progress: None,
        }
    }

    /// Process every `frame_step`-th video frame (1 = every frame).
    /// Values below 1 are treated as 1.
    pub fn with_frame_step(mut self, frame_step: u64) -> Self {
        self.frame_step = frame_step.max(1);
        self
    }

    /// Install a progress callback, invoked per processed video frame.
    pub fn with_progress(mut self, progress: impl FnMut(u64, Option<u64>) + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Dispatch on an explicit media kind.
    pub fn process(
        &mut self,
        detector: &mut dyn DetectorBackend,
        path: &str,
        kind: MediaKind,
    ) -> Result<AggregateResult, MediaError> {
        match kind {
            MediaKind::Image => self.process_image(detector, path),
            MediaKind::Video => self.process_video(detector, path),
        }
    }

    /// Process a single still image.
    ///
    /// The summary is the detected class labels joined with single spaces
    /// in detector output order; annotations carry the same detections,
    /// flat and in order. Zero detections yield an empty summary and empty
    /// annotations, which is success.
    pub fn process_image(
        &mut self,
        detector: &mut dyn DetectorBackend,
        path: &str,
    ) -> Result<AggregateResult, MediaError> {
        let frame = load_image(path)?;
        let detections = detector.detect(&frame)?;

        let summary_text = detections
            .iter()
            .map(|detection| detection.class_label.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(AggregateResult {
            summary_text,
            annotations: Annotations::Image(detections),
            media_kind: MediaKind::Image,
        })
    }

    /// Process a video file frame by frame.
    pub fn process_video(
        &mut self,
        detector: &mut dyn DetectorBackend,
        path: &str,
    ) -> Result<AggregateResult, MediaError> {
        let source = VideoSource::open(VideoConfig {
            path: path.to_string(),
        })?;
        self.process_frames(detector, source)
    }

    /// Drive the detector across a frame sequence until exhaustion.
    ///
    /// Takes the source by value: it is released when this call returns,
    /// whether the stream completes, is empty, or a detector fault aborts
    /// the loop.
    pub fn process_frames<S: FrameSource>(
        &mut self,
        detector: &mut dyn DetectorBackend,
        mut source: S,
    ) -> Result<AggregateResult, MediaError> {
        let total_frames = source.total_frames();

        let mut annotations: Vec<FrameResult> = Vec::new();
        // Distinct per-frame label strings, first-occurrence order. The
        // set answers membership; the vec fixes the output order so the
        // summary is deterministic across runs.
        let mut seen: HashSet<String> = HashSet::new();
        let mut distinct: Vec<String> = Vec::new();
        let mut current_frame = 0u64;

        while let Some(frame) = source.next_frame()? {
            current_frame += 1;
            if current_frame % self.frame_step != 0 {
                continue;
            }

            let detections = detector.detect(&frame)?;

            let mut current_text = String::new();
            for detection in &detections {
                current_text.push_str(&detection.class_label);
            }

            // One record per processed frame, even with zero detections.
            annotations.push(FrameResult {
                frame_index: current_frame,
                detections,
            });

            if seen.insert(current_text.clone()) {
                distinct.push(current_text);
            }

            if let Some(progress) = self.progress.as_mut() {
                progress(current_frame, total_frames);
            }
        }

        Ok(AggregateResult {
            summary_text: distinct.concat(),
            annotations: Annotations::Video(annotations),
            media_kind: MediaKind::Video,
        })
    }
}

impl Default for MediaAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, StubBackend};

    fn detection(label: &str) -> Detection {
        Detection::new(label, BoundingBox::new(0, 0, 10, 10))
    }

    fn stub_video(frames: u64) -> VideoSource {
        VideoSource::open(VideoConfig {
            path: format!("stub://{}@8x4", frames),
        })
        .unwrap()
    }

    #[test]
    fn image_summary_joins_labels_with_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letters.png");
        image::RgbImage::new(16, 16).save(&path).unwrap();

        let a = Detection::new("A", BoundingBox::new(0, 0, 10, 10));
        let b = Detection::new("B", BoundingBox::new(5, 5, 15, 15));
        let mut backend = StubBackend::with_script(vec![vec![a.clone(), b.clone()]]);

        let result = MediaAggregator::new()
            .process_image(&mut backend, path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.summary_text, "A B");
        assert_eq!(result.annotations, Annotations::Image(vec![a, b]));
        assert_eq!(result.media_kind, MediaKind::Image);
    }

    #[test]
    fn image_with_no_detections_is_empty_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();

        let mut backend = StubBackend::empty();
        let result = MediaAggregator::new()
            .process_image(&mut backend, path.to_str().unwrap())
            .unwrap();

        assert_eq!(result.summary_text, "");
        assert_eq!(result.annotations, Annotations::Image(Vec::new()));
    }

    #[test]
    fn unreadable_image_fails_before_any_detection() {
        let mut backend = StubBackend::empty();
        let err = MediaAggregator::new()
            .process_image(&mut backend, "/nonexistent/letters.png")
            .unwrap_err();

        assert!(matches!(err, MediaError::LoadFailed(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn video_keeps_one_record_per_frame_and_dedups_summary() {
        // Frame 1 detects "A", frame 2 detects "A", frame 3 nothing.
        let mut backend = StubBackend::with_script(vec![
            vec![detection("A")],
            vec![detection("A")],
            vec![],
        ]);

        let result = MediaAggregator::new()
            .process_frames(&mut backend, stub_video(3))
            .unwrap();

        // "A" once, the empty string contributes nothing visible.
        assert_eq!(result.summary_text, "A");
        assert_eq!(result.media_kind, MediaKind::Video);
        let Annotations::Video(frames) = result.annotations else {
            panic!("expected video annotations");
        };
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].frame_index, 1);
        assert_eq!(frames[2].frame_index, 3);
        assert!(frames[2].detections.is_empty());
    }

    #[test]
    fn video_dedup_is_string_level_not_label_level() {
        // "AB" and "BA" carry the same labels but are distinct strings.
        let mut backend = StubBackend::with_script(vec![
            vec![detection("A"), detection("B")],
            vec![detection("B"), detection("A")],
            vec![detection("A"), detection("B")],
        ]);

        let result = MediaAggregator::new()
            .process_frames(&mut backend, stub_video(3))
            .unwrap();

        assert_eq!(result.summary_text, "ABBA");
    }

    #[test]
    fn empty_video_yields_empty_result() {
        let mut backend = StubBackend::empty();
        let result = MediaAggregator::new()
            .process_frames(&mut backend, stub_video(0))
            .unwrap();

        assert_eq!(result.summary_text, "");
        assert_eq!(result.annotations, Annotations::Video(Vec::new()));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn frame_step_samples_the_sequence() {
        let mut backend = StubBackend::with_script(vec![vec![detection("A")]]);

        let result = MediaAggregator::new()
            .with_frame_step(10)
            .process_frames(&mut backend, stub_video(10))
            .unwrap();

        assert_eq!(backend.calls(), 1);
        let Annotations::Video(frames) = result.annotations else {
            panic!("expected video annotations");
        };
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_index, 10);
    }

    #[test]
    fn unopenable_video_fails_without_frame_results() {
        let mut backend = StubBackend::empty();
        let err = MediaAggregator::new()
            .process_video(&mut backend, "stub://not-a-count")
            .unwrap_err();

        assert!(matches!(err, MediaError::LoadFailed(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn progress_reports_processed_frames_with_totals() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let updates: Rc<RefCell<Vec<(u64, Option<u64>)>>> = Rc::default();
        let sink = Rc::clone(&updates);

        let mut backend = StubBackend::empty();
        MediaAggregator::new()
            .with_frame_step(2)
            .with_progress(move |current, total| sink.borrow_mut().push((current, total)))
            .process_frames(&mut backend, stub_video(4))
            .unwrap();

        assert_eq!(&*updates.borrow(), &[(2, Some(4)), (4, Some(4))]);
    }

    #[test]
    fn rerunning_the_same_video_is_deterministic() {
        let script = || {
            StubBackend::with_script(vec![
                vec![detection("H")],
                vec![detection("I")],
                vec![detection("H")],
            ])
        };

        let first = MediaAggregator::new()
            .process_frames(&mut script(), stub_video(3))
            .unwrap();
        let second = MediaAggregator::new()
            .process_frames(&mut script(), stub_video(3))
            .unwrap();

        assert_eq!(first.summary_text, "HI");
        assert_eq!(first.summary_text, second.summary_text);
        assert_eq!(first.annotations, second.annotations);
    }

    #[test]
    fn image_result_serializes_with_the_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();

        let mut backend = StubBackend::with_script(vec![vec![detection("A")]]);
        let result = MediaAggregator::new()
            .process_image(&mut backend, path.to_str().unwrap())
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["text"], "A");
        assert_eq!(json["media_type"], "image");
        assert_eq!(json["annotations"][0]["class_label"], "A");
        assert_eq!(json["annotations"][0]["xmin"], 0);
    }

    #[test]
    fn video_result_serializes_with_the_wire_field_names() {
        let mut backend = StubBackend::with_script(vec![vec![detection("A")]]);
        let result = MediaAggregator::new()
            .process_frames(&mut backend, stub_video(1))
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["text"], "A");
        assert_eq!(json["media_type"], "video");
        assert_eq!(json["annotations"][0]["frame"], 1);
        assert_eq!(json["annotations"][0]["annotations"][0]["class_label"], "A");
    }

    #[test]
    fn rerunning_the_same_image_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();

        let script = || StubBackend::with_script(vec![vec![detection("H"), detection("I")]]);

        let first = MediaAggregator::new()
            .process_image(&mut script(), path.to_str().unwrap())
            .unwrap();
        let second = MediaAggregator::new()
            .process_image(&mut script(), path.to_str().unwrap())
            .unwrap();

        assert_eq!(first.summary_text, "H I");
        assert_eq!(first.summary_text, second.summary_text);
        assert_eq!(first.annotations, second.annotations);
    }
}
