use serde::Serialize;

/// Axis-aligned pixel rectangle locating a detection within its frame.
///
/// Invariant: `xmin <= xmax`, `ymin <= ymax`, coordinates within frame
/// bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build a box from possibly unordered, possibly out-of-range corner
    /// coordinates, clamped to the frame bounds.
    ///
    /// Model outputs are float box centers/sizes; this is the single place
    /// where they are ordered and clamped into the pixel-space invariant.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32, width: u32, height: u32) -> Self {
        let clamp = |v: f32, max: u32| -> u32 {
            let max = max.saturating_sub(1) as f32;
            v.clamp(0.0, max).round() as u32
        };
        let (xmin, xmax) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (ymin, ymax) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            xmin: clamp(xmin, width),
            ymin: clamp(ymin, height),
            xmax: clamp(xmax, width),
            ymax: clamp(ymax, height),
        }
    }
}

/// One recognized object instance: a class label plus its bounding box.
///
/// Produced fresh by the detector adapter for each frame and owned by the
/// frame-level result that contains it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub class_label: String,
    #[serde(flatten)]
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(class_label: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            bounding_box,
        }
    }
}
