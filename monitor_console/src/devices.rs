// OpenCV-backed devices for a monitoring session: the capture that feeds it,
// the window it renders to and the optional recording of what was rendered.

use hazard_vision::error::{DisplayError, SourceError};
use hazard_vision::session::{DisplaySink, VideoSource};
use opencv::{
    core::{Mat, Size},
    highgui,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use tracing::{info, warn};

use crate::cv_frame::CvFrame;

const STOP_KEY: i32 = 'q' as i32;
const FALLBACK_FPS: f64 = 25.0;

pub struct CaptureSource {
    capture: VideoCapture,
    location: String,
}

impl CaptureSource {
    pub fn open(location: &str) -> Result<Self, SourceError> {
        let open_error = |reason: String| SourceError::Open {
            location: location.to_string(),
            reason,
        };
        let capture = VideoCapture::from_file(location, videoio::CAP_ANY).map_err(|e| open_error(e.to_string()))?;
        if !capture.is_opened().map_err(|e| open_error(e.to_string()))? {
            return Err(open_error("no decoder accepted the file".to_string()));
        }
        Ok(Self {
            capture,
            location: location.to_string(),
        })
    }

    pub fn frame_size(&self) -> Size {
        let width = self.capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let height = self.capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        Size::new(width as i32, height as i32)
    }

    pub fn fps(&self) -> f64 {
        match self.capture.get(videoio::CAP_PROP_FPS) {
            Ok(fps) if fps > 0.0 => fps,
            _ => FALLBACK_FPS,
        }
    }
}

impl VideoSource for CaptureSource {
    type Frame = CvFrame;

    fn read_frame(&mut self) -> Result<Option<CvFrame>, SourceError> {
        let mut frame = Mat::default();
        match self.capture.read(&mut frame) {
            Ok(true) if !frame.empty() => Ok(Some(CvFrame(frame))),
            Ok(_) => {
                info!(location = %self.location, "end of video stream");
                Ok(None)
            }
            Err(e) => Err(SourceError::Read(e.to_string())),
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!(location = %self.location, error = %e, "failed to release capture");
        }
    }
}

/// Shows frames in a highgui window and optionally records them. In headless
/// mode nothing is shown and the stop key is never seen.
pub struct WindowDisplay {
    headless: bool,
    window: Option<String>,
    recorder: Option<VideoWriter>,
}

impl WindowDisplay {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            window: None,
            recorder: None,
        }
    }

    /// Records every rendered frame to `path` as mp4v.
    pub fn record_to(mut self, path: &str, fps: f64, size: Size) -> Result<Self, DisplayError> {
        let display_error = |e: opencv::Error| DisplayError(e.to_string());
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v').map_err(display_error)?;
        let writer = VideoWriter::new(path, fourcc, fps, size, true).map_err(display_error)?;
        if !writer.is_opened().map_err(display_error)? {
            return Err(DisplayError(format!("cannot write recording to {path}")));
        }
        self.recorder = Some(writer);
        Ok(self)
    }
}

impl DisplaySink<CvFrame> for WindowDisplay {
    fn show(&mut self, title: &str, frame: &CvFrame) -> Result<(), DisplayError> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.write(&frame.0).map_err(|e| DisplayError(e.to_string()))?;
        }
        if self.headless {
            return Ok(());
        }
        if self.window.is_none() {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE).map_err(|e| DisplayError(e.to_string()))?;
            self.window = Some(title.to_string());
        }
        highgui::imshow(title, &frame.0).map_err(|e| DisplayError(e.to_string()))
    }

    fn poll_stop(&mut self) -> Result<bool, DisplayError> {
        if self.headless {
            return Ok(false);
        }
        let key = highgui::wait_key(1).map_err(|e| DisplayError(e.to_string()))?;
        Ok(key & 0xFF == STOP_KEY)
    }

    fn close(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.release() {
                warn!(error = %e, "failed to finalize recording");
            }
        }
        if let Some(window) = self.window.take() {
            if let Err(e) = highgui::destroy_window(&window) {
                warn!(window = %window, error = %e, "failed to close window");
            }
        }
    }
}
