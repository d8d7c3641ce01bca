use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_MODEL_WIDTH: u32 = 832;
const DEFAULT_MODEL_HEIGHT: u32 = 832;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.15;
const DEFAULT_IOU_THRESHOLD: f32 = 0.05;
const DEFAULT_FRAME_STEP: u64 = 10;

#[derive(Debug, Deserialize, Default)]
struct SignlensConfigFile {
    model: Option<ModelConfigFile>,
    video: Option<VideoConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    frame_step: Option<u64>,
}

/// Runtime configuration for the CLI.
///
/// Loaded from a JSON file named by `SIGNLENS_CONFIG`, then overridden by
/// environment variables, then validated. Defaults follow the pretrained
/// letter model: 832x832 input, confidence 0.15, IoU 0.05, every 10th
/// video frame.
#[derive(Debug, Clone)]
pub struct SignlensConfig {
    pub model: ModelSettings,
    pub frame_step: u64,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// ONNX model file; `None` selects the stub backend.
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Class label table, in model output order.
    pub labels: Vec<String>,
}

impl SignlensConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SIGNLENS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SignlensConfigFile) -> Self {
        let model = ModelSettings {
            path: file.model.as_ref().and_then(|model| model.path.clone()),
            width: file
                .model
                .as_ref()
                .and_then(|model| model.width)
                .unwrap_or(DEFAULT_MODEL_WIDTH),
            height: file
                .model
                .as_ref()
                .and_then(|model| model.height)
                .unwrap_or(DEFAULT_MODEL_HEIGHT),
            confidence_threshold: file
                .model
                .as_ref()
                .and_then(|model| model.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            iou_threshold: file
                .model
                .as_ref()
                .and_then(|model| model.iou_threshold)
                .unwrap_or(DEFAULT_IOU_THRESHOLD),
            labels: file
                .model
                .and_then(|model| model.labels)
                .unwrap_or_else(default_labels),
        };
        let frame_step = file
            .video
            .and_then(|video| video.frame_step)
            .unwrap_or(DEFAULT_FRAME_STEP);
        Self { model, frame_step }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("SIGNLENS_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = Some(PathBuf::from(path));
            }
        }
        if let Ok(step) = std::env::var("SIGNLENS_FRAME_STEP") {
            self.frame_step = step
                .parse()
                .map_err(|_| anyhow!("SIGNLENS_FRAME_STEP must be an integer frame count"))?;
        }
        if let Ok(threshold) = std::env::var("SIGNLENS_CONFIDENCE") {
            self.model.confidence_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("SIGNLENS_CONFIDENCE must be a number in 0..=1"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.frame_step == 0 {
            return Err(anyhow!("frame_step must be at least 1"));
        }
        if self.model.width == 0 || self.model.height == 0 {
            return Err(anyhow!("model input dimensions must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.model.confidence_threshold) {
            return Err(anyhow!("confidence threshold must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&self.model.iou_threshold) {
            return Err(anyhow!("IoU threshold must be within 0..=1"));
        }
        if self.model.labels.is_empty() {
            return Err(anyhow!("label table must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SignlensConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// The letters A-Z, the class table of the pretrained ASL letter model.
pub fn default_labels() -> Vec<String> {
    (b'A'..=b'Z').map(|c| (c as char).to_string()).collect()
}
