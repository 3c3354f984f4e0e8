//! Freehand drawing shape.

use super::{ShapeId, ShapeStyle, ShapeTrait, SerializableColor};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freehand stroke (series of points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Freehand {
    pub(crate) id: ShapeId,
    /// Points in the freehand path.
    pub points: Vec<Point>,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Freehand {
    /// Start an empty stroke painted with the given brush.
    pub fn with_brush(color: SerializableColor, width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: Vec::new(),
            style: ShapeStyle::stroke_only(color, width),
        }
    }

    /// Add a point to the path. Consecutive duplicates are dropped.
    pub fn add_point(&mut self, point: Point) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl ShapeTrait for Freehand {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::ZERO;
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;

        for point in &self.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Rect::new(min_x, min_y, max_x, max_y)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.stroke_width / 2.0;
        if self.points.len() < 2 {
            return self
                .points
                .first()
                .is_some_and(|p| p.distance(point) <= reach);
        }

        // Check distance to each line segment
        self.points.windows(2).any(|window| {
            let (start, end) = (window[0], window[1]);
            let line_vec = end - start;
            let point_vec = point - start;

            let line_len_sq = line_vec.hypot2();
            if line_len_sq < f64::EPSILON {
                return start.distance(point) <= reach;
            }

            let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
            let projection = start + line_vec * t;
            projection.distance(point) <= reach
        })
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            *point = affine * *point;
        }
    }

    fn is_finite(&self) -> bool {
        self.style.stroke_width.is_finite() && self.points.iter().all(|p| p.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[Point]) -> Freehand {
        let mut freehand = Freehand::with_brush(SerializableColor::black(), 2.0);
        for &point in points {
            freehand.add_point(point);
        }
        freehand
    }

    #[test]
    fn test_brush_style() {
        let stroke = Freehand::with_brush(SerializableColor::new(1, 2, 3, 255), 3.0);
        assert!(stroke.is_empty());
        assert_eq!(stroke.style.fill_color, None);
        assert!((stroke.style.stroke_width - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_points_skips_duplicates() {
        let mut freehand = stroke(&[]);
        freehand.add_point(Point::new(0.0, 0.0));
        freehand.add_point(Point::new(0.0, 0.0));
        freehand.add_point(Point::new(10.0, 10.0));
        assert_eq!(freehand.len(), 2);
    }

    #[test]
    fn test_bounds() {
        let freehand = stroke(&[
            Point::new(0.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 100.0),
        ]);

        let bounds = freehand.bounds();
        assert!((bounds.x0).abs() < f64::EPSILON);
        assert!((bounds.y0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test() {
        let freehand = stroke(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);

        assert!(freehand.hit_test(Point::new(50.0, 0.0), 5.0));
        assert!(!freehand.hit_test(Point::new(50.0, 20.0), 5.0));
    }
}
