// THEORY:
// This file is the main entry point for the `hazard_vision` library crate.
//
// The engine watches one camera feed per zone. For each frame it takes the
// detector's findings, scores the hazardous ones into a LOW/MEDIUM/HIGH risk,
// paints boxes and a status banner onto the frame, and writes MEDIUM and HIGH
// frames to an alert log partitioned by date and zone. The same log is read back
// for historical reports.
//
// The public surface is small: `pipeline::FrameProcessor` for one frame,
// `session::MonitoringSession` for a whole feed, and
// `core_modules::alert_store::AlertStore` for the log. Devices (video source,
// display, detector model, drawing surface) are traits, so the engine itself has
// no dependency on a particular vision library.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use core_modules::alert_record::AlertRecord;
pub use core_modules::alert_store::{AlertSink, AlertStore, PersistenceReporter, TracingReporter};
pub use core_modules::canvas::{Canvas, Color, TextSize, TextStyle};
pub use core_modules::detection::{BoundingBox, Detection, Detector, HazardSet};
pub use core_modules::palette::Palette;
pub use core_modules::risk_model::{RiskAssessment, RiskLevel, RiskModel};
pub use core_modules::zone_summary::ZoneSummary;
