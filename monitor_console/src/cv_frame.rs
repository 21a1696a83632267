use hazard_vision::{BoundingBox, Canvas, Color, TextSize, TextStyle};
use hazard_vision::error::CanvasError;
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
    prelude::*,
};

const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;

/// A decoded BGR frame from OpenCV.
pub struct CvFrame(pub Mat);

fn bgr(color: Color) -> Scalar {
    Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
}

fn canvas_error(e: opencv::Error) -> CanvasError {
    CanvasError(e.to_string())
}

impl Canvas for CvFrame {
    fn width(&self) -> i32 {
        self.0.cols()
    }

    fn height(&self) -> i32 {
        self.0.rows()
    }

    fn draw_rect(&mut self, rect: BoundingBox, color: Color, thickness: i32) -> Result<(), CanvasError> {
        let (top_left, bottom_right) = (Point::new(rect.x1, rect.y1), Point::new(rect.x2, rect.y2));
        imgproc::rectangle_points(&mut self.0, top_left, bottom_right, bgr(color), thickness, imgproc::LINE_8, 0)
            .map_err(canvas_error)
    }

    fn measure_text(&self, text: &str, style: TextStyle) -> Result<TextSize, CanvasError> {
        let mut baseline = 0;
        let size = imgproc::get_text_size(text, FONT, style.scale, style.thickness, &mut baseline).map_err(canvas_error)?;
        Ok(TextSize {
            width: size.width,
            height: size.height,
        })
    }

    fn draw_text(&mut self, text: &str, origin: (i32, i32), style: TextStyle, color: Color) -> Result<(), CanvasError> {
        imgproc::put_text(
            &mut self.0,
            text,
            Point::new(origin.0, origin.1),
            FONT,
            style.scale,
            bgr(color),
            style.thickness,
            imgproc::LINE_8,
            false,
        )
        .map_err(canvas_error)
    }
}
