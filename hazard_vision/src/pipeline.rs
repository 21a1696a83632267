// THEORY:
// The `pipeline` module is the per-frame heart of the engine. `FrameProcessor`
// takes one frame and the detector's findings for it, and runs the full stack:
// filtering, annotation, scoring, the status banner and, when warranted, a write
// to the alert log.
//
// It is deliberately stateless between frames. Everything it knows about the
// world is in the injected `RiskModel`, `Palette` and `AlertSink`, so the same
// processor can be driven by a live camera or by a unit test.

use tracing::{debug, trace, warn};

use crate::core_modules::alert_store::AlertSink;
use crate::core_modules::canvas::{Canvas, Color, FILLED, TextStyle};
use crate::core_modules::detection::{BoundingBox, Detection, HazardSet};
use crate::core_modules::palette::Palette;
use crate::core_modules::risk_model::{RiskAssessment, RiskModel};
use crate::error::CanvasError;

/// Detections below this confidence are invisible to every later stage.
pub const CONFIDENCE_THRESHOLD: f32 = 0.4;
/// Height of the status banner in pixels.
pub const BANNER_HEIGHT: i32 = 60;

const BOX_THICKNESS: i32 = 2;
const LABEL_OFFSET: i32 = 10;
const LABEL_STYLE: TextStyle = TextStyle { scale: 0.5, thickness: 2 };
const BANNER_STYLE: TextStyle = TextStyle { scale: 0.8, thickness: 2 };

/// What one processed frame amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    pub assessment: RiskAssessment,
    pub hazards: HazardSet,
    /// Whether the frame was handed to the alert sink.
    pub logged: bool,
    /// Whether any box, label or the banner failed to draw.
    pub degraded: bool,
}

pub struct FrameProcessor<A> {
    zone: String,
    risk_model: RiskModel,
    palette: Palette,
    sink: A,
}

impl<A: AlertSink> FrameProcessor<A> {
    pub fn new(zone: impl Into<String>, risk_model: RiskModel, palette: Palette, sink: A) -> Self {
        Self {
            zone: zone.into(),
            risk_model,
            palette,
            sink,
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    /// Annotates `frame` in place and returns the frame's risk. A drawing
    /// failure costs only that overlay: it is logged, the frame is marked
    /// degraded, and scoring and logging still run.
    pub fn process<C: Canvas>(&self, frame: &mut C, detections: &[Detection]) -> FrameOutcome {
        let mut hazards = HazardSet::new();
        let mut degraded = false;

        // Stage 1 & 2: Filter, then draw and collect hazards in detection order.
        for detection in detections {
            if !detection.is_well_formed() {
                debug!(label = %detection.label, confidence = detection.confidence, "skipping malformed detection");
                continue;
            }
            if detection.confidence < CONFIDENCE_THRESHOLD {
                trace!(label = %detection.label, confidence = detection.confidence, "below confidence threshold");
                continue;
            }

            if let Err(error) = self.draw_detection(frame, detection) {
                warn!(zone = %self.zone, label = %detection.label, %error, "failed to draw detection");
                degraded = true;
            }

            if self.risk_model.is_hazardous(&detection.label) {
                hazards.push(detection.label.clone());
            }
        }

        // Stage 3: Scoring
        let assessment = self.risk_model.score_and_classify(hazards.labels());

        // Stage 4: Status banner
        if let Err(error) = self.draw_banner(frame, &assessment, hazards.len()) {
            warn!(zone = %self.zone, %error, "failed to draw status banner");
            degraded = true;
        }

        // Stage 5: Noise-suppressed persistence
        let logged = assessment.level.is_alerting() && !hazards.is_empty();
        if logged {
            debug!(zone = %self.zone, score = assessment.score, level = %assessment.level, %hazards, "logging alert");
            self.sink.record_alert(&self.zone, &hazards, assessment);
        }

        FrameOutcome {
            assessment,
            hazards,
            logged,
            degraded,
        }
    }

    fn draw_detection<C: Canvas>(&self, frame: &mut C, detection: &Detection) -> Result<(), CanvasError> {
        let color = self.palette.object_color(&detection.label);
        let bbox = detection.bbox;
        frame.draw_rect(bbox, color, BOX_THICKNESS)?;
        frame.draw_text(&detection.label, (bbox.x1, bbox.y1 - LABEL_OFFSET), LABEL_STYLE, color)
    }

    /// Full-width banner in the level's color with centered white text. The
    /// centering is recomputed every frame since both widths vary.
    fn draw_banner<C: Canvas>(&self, frame: &mut C, assessment: &RiskAssessment, hazard_count: usize) -> Result<(), CanvasError> {
        let width = frame.width();
        let background = self.palette.banner_color(assessment.level);
        frame.draw_rect(BoundingBox::new(0, 0, width, BANNER_HEIGHT), background, FILLED)?;

        let text = banner_text(assessment, hazard_count);
        let size = frame.measure_text(&text, BANNER_STYLE)?;
        let x = (width - size.width) / 2;
        let y = (BANNER_HEIGHT + size.height) / 2 - 2;
        frame.draw_text(&text, (x, y), BANNER_STYLE, Color::WHITE)
    }
}

pub fn banner_text(assessment: &RiskAssessment, hazard_count: usize) -> String {
    format!("LEVEL: {}  |  HAZARDS: {hazard_count} OBJECT(S) DETECTED", assessment.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::canvas::TextSize;
    use crate::core_modules::risk_model::RiskLevel;
    use image::{Rgb, RgbImage};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        calls: RefCell<Vec<(String, Vec<String>, RiskAssessment)>>,
    }

    impl AlertSink for RecordingSink {
        fn record_alert(&self, zone: &str, hazards: &HazardSet, assessment: RiskAssessment) {
            self.calls
                .borrow_mut()
                .push((zone.to_string(), hazards.labels().to_vec(), assessment));
        }
    }

    /// Records text placement so centering can be checked.
    struct TextRecorder {
        width: i32,
        texts: Vec<(String, (i32, i32))>,
    }

    impl Canvas for TextRecorder {
        fn width(&self) -> i32 {
            self.width
        }
        fn height(&self) -> i32 {
            480
        }
        fn draw_rect(&mut self, _rect: BoundingBox, _color: Color, _thickness: i32) -> Result<(), CanvasError> {
            Ok(())
        }
        fn measure_text(&self, text: &str, _style: TextStyle) -> Result<TextSize, CanvasError> {
            Ok(TextSize {
                width: text.len() as i32 * 10,
                height: 20,
            })
        }
        fn draw_text(&mut self, text: &str, origin: (i32, i32), _style: TextStyle, _color: Color) -> Result<(), CanvasError> {
            self.texts.push((text.to_string(), origin));
            Ok(())
        }
    }

    /// Paints into an `RgbImage` but fails the listed `draw_rect` calls
    /// (0-based) and, optionally, every text draw.
    struct FailingCanvas {
        inner: RgbImage,
        rects_drawn: usize,
        fail_rects: Vec<usize>,
        fail_text: bool,
    }

    impl FailingCanvas {
        fn new(fail_rects: Vec<usize>, fail_text: bool) -> Self {
            Self {
                inner: RgbImage::new(320, 240),
                rects_drawn: 0,
                fail_rects,
                fail_text,
            }
        }
    }

    impl Canvas for FailingCanvas {
        fn width(&self) -> i32 {
            Canvas::width(&self.inner)
        }
        fn height(&self) -> i32 {
            Canvas::height(&self.inner)
        }
        fn draw_rect(&mut self, rect: BoundingBox, color: Color, thickness: i32) -> Result<(), CanvasError> {
            let call = self.rects_drawn;
            self.rects_drawn += 1;
            if self.fail_rects.contains(&call) {
                return Err(CanvasError("one bad box".into()));
            }
            self.inner.draw_rect(rect, color, thickness)
        }
        fn measure_text(&self, text: &str, style: TextStyle) -> Result<TextSize, CanvasError> {
            self.inner.measure_text(text, style)
        }
        fn draw_text(&mut self, text: &str, origin: (i32, i32), style: TextStyle, color: Color) -> Result<(), CanvasError> {
            if self.fail_text {
                return Err(CanvasError("no font".into()));
            }
            self.inner.draw_text(text, origin, style, color)
        }
    }

    fn processor() -> FrameProcessor<RecordingSink> {
        FrameProcessor::new("North Gate", RiskModel::default(), Palette::default(), RecordingSink::default())
    }

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(100, 100, 150, 200))
    }

    #[test]
    fn high_risk_frame_logs_once_in_detection_order() {
        let processor = processor();
        let mut frame = RgbImage::new(320, 240);
        let outcome = processor.process(
            &mut frame,
            &[det("person", 0.9), det("chair", 0.95), det("person", 0.8), det("truck", 0.7)],
        );

        assert_eq!(outcome.assessment, RiskAssessment { score: 12, level: RiskLevel::High });
        assert!(outcome.logged);
        let calls = processor.sink().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "North Gate");
        assert_eq!(calls[0].1, vec!["person", "person", "truck"]);
    }

    #[test]
    fn low_confidence_detection_is_invisible() {
        let processor = processor();
        let mut frame = RgbImage::new(320, 240);
        let outcome = processor.process(&mut frame, &[det("person", 0.39)]);

        assert_eq!(outcome.assessment, RiskAssessment { score: 0, level: RiskLevel::Low });
        assert!(outcome.hazards.is_empty());
        assert!(!outcome.logged);
        assert!(processor.sink().calls.borrow().is_empty());
        // No box outline was drawn where the person would have been.
        assert_eq!(frame.get_pixel(100, 150), &Rgb([0, 0, 0]));
    }

    #[test]
    fn low_risk_frames_are_not_logged() {
        let processor = processor();
        let mut frame = RgbImage::new(320, 240);
        let outcome = processor.process(&mut frame, &[det("cat", 0.9)]);
        assert_eq!(outcome.assessment.level, RiskLevel::Low);
        assert_eq!(outcome.hazards.len(), 1);
        assert!(!outcome.logged);
        assert!(processor.sink().calls.borrow().is_empty());
    }

    #[test]
    fn non_hazard_detections_never_log() {
        // Drawn on screen, but absent from the weight table.
        let processor = FrameProcessor::new(
            "Dock",
            RiskModel::new(Default::default()),
            Palette::default(),
            RecordingSink::default(),
        );
        let mut frame = RgbImage::new(320, 240);
        let outcome = processor.process(&mut frame, &[det("person", 0.9)]);
        assert!(outcome.hazards.is_empty());
        assert!(!outcome.logged);
    }

    #[test]
    fn malformed_detection_is_skipped() {
        let processor = processor();
        let mut frame = RgbImage::new(320, 240);
        let outcome = processor.process(&mut frame, &[det("person", f32::NAN), det("dog", 0.6)]);
        assert_eq!(outcome.hazards.labels().to_vec(), vec!["dog".to_string()]);
        assert_eq!(outcome.assessment.level, RiskLevel::Medium);
    }

    #[test]
    fn banner_and_boxes_are_painted() {
        let processor = processor();
        let mut frame = RgbImage::new(320, 240);
        let outcome = processor.process(&mut frame, &[det("person", 0.9), det("person", 0.9)]);
        assert!(!outcome.degraded);

        // HIGH banner is vivid red across the full width.
        assert_eq!(frame.get_pixel(0, 0), &Rgb([200, 0, 0]));
        assert_eq!(frame.get_pixel(319, BANNER_HEIGHT as u32), &Rgb([200, 0, 0]));
        assert_eq!(frame.get_pixel(160, BANNER_HEIGHT as u32 + 1), &Rgb([0, 0, 0]));
        // Person box outline in red, interior untouched.
        assert_eq!(frame.get_pixel(100, 150), &Rgb([255, 0, 0]));
        assert_eq!(frame.get_pixel(125, 150), &Rgb([0, 0, 0]));
    }

    #[test]
    fn banner_text_is_centered_for_any_width() {
        let processor = processor();
        for width in [640, 1920] {
            let mut canvas = TextRecorder { width, texts: Vec::new() };
            processor.process(&mut canvas, &[det("dog", 0.9)]);

            let (text, origin) = canvas.texts.last().expect("banner text").clone();
            assert_eq!(text, "LEVEL: MEDIUM  |  HAZARDS: 1 OBJECT(S) DETECTED");
            let text_width = text.len() as i32 * 10;
            assert_eq!(origin, ((width - text_width) / 2, (BANNER_HEIGHT + 20) / 2 - 2));
        }
    }

    #[test]
    fn labels_sit_above_their_box() {
        let processor = processor();
        let mut canvas = TextRecorder { width: 640, texts: Vec::new() };
        processor.process(&mut canvas, &[det("chair", 0.9)]);
        assert_eq!(canvas.texts[0], ("chair".to_string(), (100, 90)));
    }

    #[test]
    fn failed_box_costs_only_that_box() {
        let processor = processor();
        // The third rectangle is the truck's box.
        let mut canvas = FailingCanvas::new(vec![2], false);
        let outcome = processor.process(&mut canvas, &[det("person", 0.9), det("person", 0.9), det("truck", 0.9)]);

        assert!(outcome.degraded);
        assert_eq!(outcome.assessment, RiskAssessment { score: 12, level: RiskLevel::High });
        assert_eq!(outcome.hazards.len(), 3);
        assert!(outcome.logged);
        let calls = processor.sink().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["person", "person", "truck"]);
        // The banner after the failed box was still painted.
        assert_eq!(canvas.inner.get_pixel(0, 0), &Rgb([200, 0, 0]));
    }

    #[test]
    fn failed_banner_still_logs_the_alert() {
        let processor = processor();
        // Rectangles: the dog's box, then the banner.
        let mut canvas = FailingCanvas::new(vec![1], true);
        let outcome = processor.process(&mut canvas, &[det("dog", 0.9)]);

        assert!(outcome.degraded);
        assert_eq!(outcome.assessment.level, RiskLevel::Medium);
        assert!(outcome.logged);
        assert_eq!(processor.sink().calls.borrow().len(), 1);
    }
}
