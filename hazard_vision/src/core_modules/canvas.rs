// THEORY:
// The `Canvas` is the drawing surface the frame processor annotates. Keeping it
// behind a trait lets the same overlay logic paint an OpenCV `Mat` in the live
// console and a plain `image::RgbImage` buffer in headless runs and tests.
//
// The buffer implementation fills and outlines rectangles pixel by pixel. It has
// no font, so text is measured with fixed metrics close to OpenCV's Hershey
// simplex face and glyph drawing is a no-op.

use image::{Rgb, RgbImage};

use crate::core_modules::detection::BoundingBox;
use crate::error::CanvasError;

// Hershey simplex at scale 1.0 is roughly 22 px tall with ~20 px advance.
const BUFFER_GLYPH_ADVANCE: f64 = 20.0;
const BUFFER_GLYPH_HEIGHT: f64 = 22.0;

/// An RGB color. Backends with another channel order convert at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Font scale and stroke thickness for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub scale: f64,
    pub thickness: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSize {
    pub width: i32,
    pub height: i32,
}

/// Stroke thickness meaning "fill the shape".
pub const FILLED: i32 = -1;

pub trait Canvas {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// Draws a rectangle outline of `thickness` pixels, or fills it when
    /// `thickness` is `FILLED`. Both corners are inclusive: the rectangle
    /// covers columns `x1..=x2` and rows `y1..=y2`.
    fn draw_rect(&mut self, rect: BoundingBox, color: Color, thickness: i32) -> Result<(), CanvasError>;

    fn measure_text(&self, text: &str, style: TextStyle) -> Result<TextSize, CanvasError>;

    /// Draws `text` with its baseline-left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: (i32, i32), style: TextStyle, color: Color) -> Result<(), CanvasError>;
}

impl Canvas for RgbImage {
    fn width(&self) -> i32 {
        self.dimensions().0 as i32
    }

    fn height(&self) -> i32 {
        self.dimensions().1 as i32
    }

    fn draw_rect(&mut self, rect: BoundingBox, color: Color, thickness: i32) -> Result<(), CanvasError> {
        let pixel = Rgb([color.r, color.g, color.b]);
        let (w, h) = (Canvas::width(self), Canvas::height(self));
        let x_lo = rect.x1.min(rect.x2).max(0);
        let x_hi = rect.x1.max(rect.x2).min(w - 1);
        let y_lo = rect.y1.min(rect.y2).max(0);
        let y_hi = rect.y1.max(rect.y2).min(h - 1);
        if x_lo > x_hi || y_lo > y_hi {
            return Ok(());
        }

        let stroke = thickness.max(1);
        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                let on_edge = x - x_lo < stroke || x_hi - x < stroke || y - y_lo < stroke || y_hi - y < stroke;
                if thickness == FILLED || on_edge {
                    self.put_pixel(x as u32, y as u32, pixel);
                }
            }
        }
        Ok(())
    }

    fn measure_text(&self, text: &str, style: TextStyle) -> Result<TextSize, CanvasError> {
        let glyphs = text.chars().count() as f64;
        Ok(TextSize {
            width: (glyphs * BUFFER_GLYPH_ADVANCE * style.scale).round() as i32,
            height: (BUFFER_GLYPH_HEIGHT * style.scale).round() as i32,
        })
    }

    fn draw_text(&mut self, _text: &str, _origin: (i32, i32), _style: TextStyle, _color: Color) -> Result<(), CanvasError> {
        Ok(())
    }
}
