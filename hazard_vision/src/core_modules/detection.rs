// THEORY:
// Detections are the raw material of the engine: what the object detector claims
// to see in one frame. They are "dumb" data containers that live for exactly one
// frame. The detector itself is a black box behind the `Detector` trait, so the
// rest of the engine can be driven by a neural network in production and by a
// fixed list in tests.

use std::fmt;

use crate::core_modules::alert_record::write_quoted;
use crate::error::DetectorError;

/// An axis-aligned box in pixel coordinates, top-left `(x1, y1)` to
/// bottom-right `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

/// A single object reported by the detector for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The class name, e.g. `"person"`.
    pub label: String,
    /// The detector's confidence, expected in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    /// A confidence that is NaN, infinite or outside `[0, 1]` means the
    /// detector broke its contract for this object.
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence) && !self.label.is_empty()
    }
}

/// The black-box object detector.
pub trait Detector<F> {
    /// Runs the model on a frame. Must not modify the frame.
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, DetectorError>;
}

/// The labels of the hazardous objects in one frame, in detection order.
/// Duplicates are kept on purpose: each occurrence is scored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HazardSet(Vec<String>);

impl HazardSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, label: impl Into<String>) {
        self.0.push(label.into());
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_labels(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for HazardSet {
    fn from(labels: Vec<String>) -> Self {
        Self(labels)
    }
}

impl fmt::Display for HazardSet {
    /// Renders as `['person', 'truck']`, the sequence shape stored in the log.
    /// Labels are quoted and escaped by the log codec.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_quoted(f, label)?;
        }
        f.write_str("]")
    }
}
