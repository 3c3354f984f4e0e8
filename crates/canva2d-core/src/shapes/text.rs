//! Text box shape.

use super::{SerializableColor, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.16;

/// A text box with a fixed wrapping width. The text color is the fill color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Position (top-left corner of the text box).
    pub position: Point,
    /// The text content.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Width of the text box.
    pub width: f64,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Text {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;
    /// Default text box width.
    pub const DEFAULT_WIDTH: f64 = 250.0;

    /// Create a new text box.
    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            font_size: Self::DEFAULT_FONT_SIZE,
            width: Self::DEFAULT_WIDTH,
            style: ShapeStyle {
                stroke_color: SerializableColor::black(),
                stroke_width: 0.0,
                fill_color: Some(SerializableColor::black()),
            },
        }
    }

    /// Approximate height: one line per explicit line break (at least one).
    pub fn height(&self) -> f64 {
        let lines = self.content.lines().count().max(1);
        lines as f64 * self.font_size * LINE_HEIGHT
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height()))
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
        let scale = affine.as_coeffs();
        self.width *= scale[0].abs();
        self.font_size *= scale[3].abs();
    }

    fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.width.is_finite()
            && self.font_size.is_finite()
            && self.height().is_finite()
    }
}
