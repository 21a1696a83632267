// THEORY:
// A `MonitoringSession` is one operator watching one zone. It owns the frame
// acquisition loop and the lifecycle of the devices around it:
//
//     CLOSED -> OPENING -> RUNNING -> CLOSED
//
// Key architectural principles:
// 1.  **Fail Fast on Open**: A source that cannot be opened ends the session
//     before any frame is processed, so no alert can be written.
// 2.  **Nothing Escapes**: `run` reports how the session ended instead of
//     returning an error. Open failures, read failures and display failures
//     are all ordinary outcomes for the caller.
// 3.  **Always Release**: Every way out of RUNNING ends the frame loop and falls
//     through to the same release of the source and close of the display.
// 4.  **One Bad Frame Is One Bad Frame**: A detector error is logged and the
//     loop moves on. Drawing errors never leave the frame processor. Either way
//     the frame is still shown.
// 5.  **Cooperative Stop**: The stop key is polled once per frame, after display.

use tracing::{info, warn};

use crate::core_modules::alert_store::AlertSink;
use crate::core_modules::canvas::Canvas;
use crate::core_modules::detection::Detector;
use crate::error::{DisplayError, SourceError};
use crate::pipeline::FrameProcessor;

/// A stream of frames. `Ok(None)` is the normal end of the stream.
pub trait VideoSource {
    type Frame;

    fn read_frame(&mut self) -> Result<Option<Self::Frame>, SourceError>;

    fn release(&mut self);
}

/// Where rendered frames go, and where the stop signal comes from.
pub trait DisplaySink<F> {
    fn show(&mut self, title: &str, frame: &F) -> Result<(), DisplayError>;

    /// Polls for the stop key without blocking beyond a frame's worth.
    fn poll_stop(&mut self) -> Result<bool, DisplayError>;

    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Running,
}

/// How a session came back to `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    SourceExhausted,
    StopRequested,
    OpenFailed(String),
    ReadFailed(String),
    DisplayFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_processed: u64,
    pub alerts_logged: u64,
    /// Frames whose detection failed or whose overlay was partly lost.
    pub frames_degraded: u64,
    pub end: SessionEnd,
}

pub struct MonitoringSession<D, K, A> {
    detector: D,
    display: K,
    processor: FrameProcessor<A>,
    state: SessionState,
}

impl<D, K, A: AlertSink> MonitoringSession<D, K, A> {
    pub fn new(detector: D, display: K, processor: FrameProcessor<A>) -> Self {
        Self {
            detector,
            display,
            processor,
            state: SessionState::Closed,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn processor(&self) -> &FrameProcessor<A> {
        &self.processor
    }

    pub fn window_title(&self) -> String {
        format!("HAZARD MONITORING - {}", self.processor.zone())
    }

    /// Opens `location` with `open` and monitors it until the stream ends,
    /// the stop key is pressed or a device fails.
    pub fn run<V, O>(&mut self, location: &str, open: O) -> SessionReport
    where
        O: FnOnce(&str) -> Result<V, SourceError>,
        V: VideoSource,
        V::Frame: Canvas,
        D: Detector<V::Frame>,
        K: DisplaySink<V::Frame>,
    {
        let zone = self.processor.zone().to_string();
        let mut report = SessionReport {
            frames_processed: 0,
            alerts_logged: 0,
            frames_degraded: 0,
            end: SessionEnd::SourceExhausted,
        };

        self.state = SessionState::Opening;
        let mut source = match open(location) {
            Ok(source) => source,
            Err(error) => {
                warn!(zone = %zone, location, %error, "cannot open video source");
                self.state = SessionState::Closed;
                report.end = SessionEnd::OpenFailed(error.to_string());
                return report;
            }
        };

        self.state = SessionState::Running;
        info!(zone = %zone, location, "monitoring started");
        let end = self.monitor(&mut source, &mut report);
        report.end = end;

        source.release();
        self.display.close();
        self.state = SessionState::Closed;
        info!(
            zone = %zone,
            frames = report.frames_processed,
            alerts = report.alerts_logged,
            end = ?report.end,
            "monitoring stopped"
        );
        report
    }

    fn monitor<V>(&mut self, source: &mut V, report: &mut SessionReport) -> SessionEnd
    where
        V: VideoSource,
        V::Frame: Canvas,
        D: Detector<V::Frame>,
        K: DisplaySink<V::Frame>,
    {
        let title = self.window_title();
        loop {
            let mut frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return SessionEnd::SourceExhausted,
                Err(error) => return SessionEnd::ReadFailed(error.to_string()),
            };

            match self.detector.detect(&frame) {
                Ok(detections) => {
                    let outcome = self.processor.process(&mut frame, &detections);
                    report.alerts_logged += u64::from(outcome.logged);
                    report.frames_degraded += u64::from(outcome.degraded);
                }
                Err(error) => {
                    warn!(frame = report.frames_processed, %error, "detection failed");
                    report.frames_degraded += 1;
                }
            }
            report.frames_processed += 1;

            if let Err(error) = self.display.show(&title, &frame) {
                return SessionEnd::DisplayFailed(error.to_string());
            }
            match self.display.poll_stop() {
                Ok(true) => return SessionEnd::StopRequested,
                Ok(false) => {}
                Err(error) => return SessionEnd::DisplayFailed(error.to_string()),
            }
        }
    }
}
