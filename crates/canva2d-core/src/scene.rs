//! Scene graph and its serialized snapshot.

use crate::shapes::{SerializableColor, Shape, ShapeId};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Serialized form of a [`SceneDocument`].
///
/// The persistence layer stores and returns it verbatim; only the scene
/// surface reads or writes its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty snapshots are treated the same as a missing one.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors converting between a scene and its snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Shape {0} has coordinates too large to store")]
    NonFinite(ShapeId),
}

/// Direction for a one-step z-order move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    /// Towards the front (painted later).
    Forward,
    /// Towards the back (painted earlier).
    Backward,
}

/// All objects on the canvas plus their paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Canvas background color.
    pub background: SerializableColor,
    /// All shapes in the scene, keyed by ID.
    shapes: HashMap<ShapeId, Shape>,
    /// Z-order of shapes (back to front). Holds every key of `shapes` exactly once.
    z_order: Vec<ShapeId>,
}

impl SceneDocument {
    /// Create an empty scene with the given background.
    pub fn new(background: SerializableColor) -> Self {
        Self {
            background,
            shapes: HashMap::new(),
            z_order: Vec::new(),
        }
    }

    /// Add a shape on top of the scene.
    pub fn add_shape(&mut self, shape: Shape) {
        let id = shape.id();
        if self.shapes.insert(id, shape).is_none() {
            self.z_order.push(id);
        }
    }

    /// Remove a shape from the scene.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let removed = self.shapes.remove(&id)?;
        self.z_order.retain(|&shape_id| shape_id != id);
        Some(removed)
    }

    /// Get a shape by ID.
    pub fn get_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    /// Get a mutable reference to a shape by ID.
    pub fn get_shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    /// Get shapes in z-order (back to front).
    pub fn shapes_ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// Shape IDs in z-order (back to front).
    pub fn z_order(&self) -> &[ShapeId] {
        &self.z_order
    }

    /// Paint index of a shape (0 = bottom).
    pub fn z_index(&self, id: ShapeId) -> Option<usize> {
        self.z_order.iter().position(|&shape_id| shape_id == id)
    }

    /// Move a shape one layer forward (towards front).
    /// Returns true if the shape was moved, false if already at front.
    pub fn bring_forward(&mut self, id: ShapeId) -> bool {
        if let Some(pos) = self.z_index(id) {
            if pos + 1 < self.z_order.len() {
                self.z_order.swap(pos, pos + 1);
                return true;
            }
        }
        false
    }

    /// Move a shape one layer backward (towards back).
    /// Returns true if the shape was moved, false if already at back.
    pub fn send_backward(&mut self, id: ShapeId) -> bool {
        if let Some(pos) = self.z_index(id) {
            if pos > 0 {
                self.z_order.swap(pos, pos - 1);
                return true;
            }
        }
        false
    }

    /// One-step move in the given direction.
    pub fn reorder(&mut self, id: ShapeId, direction: ReorderDirection) -> bool {
        match direction {
            ReorderDirection::Forward => self.bring_forward(id),
            ReorderDirection::Backward => self.send_backward(id),
        }
    }

    /// Find shapes at a point, front to back.
    pub fn shapes_at_point(&self, point: Point, tolerance: f64) -> Vec<ShapeId> {
        self.z_order
            .iter()
            .rev()
            .filter_map(|&id| {
                self.shapes
                    .get(&id)
                    .filter(|s| s.hit_test(point, tolerance))
                    .map(|_| id)
            })
            .collect()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Get the number of shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Serialize the scene. Non-finite numbers would be written as `null`
    /// and could not be read back, so such scenes are refused.
    pub fn to_snapshot(&self) -> Result<Snapshot, SnapshotError> {
        if let Some(shape) = self.shapes_ordered().find(|s| !s.is_finite()) {
            return Err(SnapshotError::NonFinite(shape.id()));
        }
        Ok(Snapshot(serde_json::to_string(self)?))
    }

    /// Deserialize a scene, rejecting snapshots whose z-order does not match
    /// their shape table.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let mut scene: Self = serde_json::from_str(snapshot.as_str())?;
        scene.repair_z_order();
        Ok(scene)
    }

    /// Drop dangling or duplicate z-order entries and append unordered shapes.
    fn repair_z_order(&mut self) {
        let mut seen = std::collections::HashSet::with_capacity(self.z_order.len());
        let shapes = &self.shapes;
        self.z_order
            .retain(|id| shapes.contains_key(id) && seen.insert(*id));
        let mut missing: Vec<ShapeId> = self
            .shapes
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        if !missing.is_empty() {
            log::warn!("Snapshot had {} shapes missing from z-order", missing.len());
            missing.sort();
            self.z_order.extend(missing);
        }
    }
}

#[cfg(test)]
pub(crate) fn assert_z_order_contiguous(scene: &SceneDocument) {
    let unique: std::collections::HashSet<_> = scene.z_order.iter().collect();
    assert_eq!(unique.len(), scene.z_order.len(), "duplicate z-order entries");
    assert_eq!(scene.z_order.len(), scene.shapes.len(), "z-order has gaps");
    for id in &scene.z_order {
        assert!(scene.shapes.contains_key(id), "dangling z-order entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Ellipse, Rectangle, ShapeTrait};

    fn scene() -> SceneDocument {
        SceneDocument::new(SerializableColor::white())
    }

    #[test]
    fn test_add_shape() {
        let mut doc = scene();
        let rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        let id = rect.id();

        doc.add_shape(rect.into());
        assert_eq!(doc.len(), 1);
        assert!(doc.get_shape(id).is_some());
        assert_eq!(doc.z_order(), &[id]);
    }

    #[test]
    fn test_add_same_id_twice_keeps_single_entry() {
        let mut doc = scene();
        let rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        doc.add_shape(rect.clone().into());
        doc.add_shape(rect.into());
        assert_z_order_contiguous(&doc);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_remove_shape() {
        let mut doc = scene();
        let rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        let id = rect.id();

        doc.add_shape(rect.into());
        assert!(doc.remove_shape(id).is_some());
        assert!(doc.is_empty());
        assert!(doc.z_order().is_empty());
        assert!(doc.remove_shape(id).is_none());
    }

    #[test]
    fn test_forward_backward_swap_neighbours() {
        let mut doc = scene();
        let ids: Vec<ShapeId> = (0..3)
            .map(|i| {
                let rect = Rectangle::new(Point::new(i as f64, 0.0), 10.0, 10.0);
                let id = rect.id();
                doc.add_shape(rect.into());
                id
            })
            .collect();

        assert!(doc.bring_forward(ids[0]));
        assert_eq!(doc.z_order(), &[ids[1], ids[0], ids[2]]);
        assert!(doc.send_backward(ids[2]));
        assert_eq!(doc.z_order(), &[ids[1], ids[2], ids[0]]);

        // Boundaries are no-ops
        assert!(!doc.send_backward(ids[1]));
        assert!(!doc.bring_forward(ids[0]));
        assert_z_order_contiguous(&doc);
    }

    #[test]
    fn test_z_order_stays_contiguous_under_random_edits() {
        let mut doc = scene();
        let mut ids: Vec<ShapeId> = Vec::new();
        let mut state: u32 = 0x2545_f491;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        for _ in 0..500 {
            let roll = next();
            match roll % 4 {
                0 | 1 => {
                    let rect = Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0);
                    ids.push(rect.id());
                    doc.add_shape(rect.into());
                }
                2 if !ids.is_empty() => {
                    let id = ids.remove(next() as usize % ids.len());
                    doc.remove_shape(id);
                }
                _ if !ids.is_empty() => {
                    let id = ids[next() as usize % ids.len()];
                    let direction = if roll % 8 < 4 {
                        ReorderDirection::Forward
                    } else {
                        ReorderDirection::Backward
                    };
                    doc.reorder(id, direction);
                }
                _ => {}
            }
            assert_z_order_contiguous(&doc);
        }
    }

    #[test]
    fn test_shapes_at_point_front_first() {
        let mut doc = scene();
        let mut rect1 = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        let mut rect2 = Rectangle::new(Point::new(50.0, 50.0), 100.0, 100.0);
        rect1.style.fill_color = Some(SerializableColor::black());
        rect2.style.fill_color = Some(SerializableColor::black());
        let id1 = rect1.id();
        let id2 = rect2.id();

        doc.add_shape(rect1.into());
        doc.add_shape(rect2.into());

        assert_eq!(doc.shapes_at_point(Point::new(75.0, 75.0), 0.0), vec![id2, id1]);
        assert_eq!(doc.shapes_at_point(Point::new(25.0, 25.0), 0.0), vec![id1]);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_order() {
        let mut doc = scene();
        let rect = Rectangle::new(Point::new(100.0, 100.0), 150.0, 100.0);
        let circle = Ellipse::circle(Point::new(210.0, 210.0), 60.0);
        let circle_id = circle.id();
        doc.add_shape(rect.into());
        doc.add_shape(circle.into());
        doc.send_backward(circle_id);

        let snapshot = doc.to_snapshot().unwrap();
        let restored = SceneDocument::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, doc);
        assert_eq!(restored.z_index(circle_id), Some(0));
    }

    #[test]
    fn test_from_snapshot_repairs_z_order() {
        let mut doc = scene();
        let rect = Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0);
        let id = rect.id();
        doc.add_shape(rect.into());

        let mut value = serde_json::to_value(&doc).unwrap();
        value["z_order"] = serde_json::json!([uuid::Uuid::new_v4(), id, id]);
        let snapshot = Snapshot::new(value.to_string());

        let restored = SceneDocument::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.z_order(), &[id]);
    }

    #[test]
    fn test_to_snapshot_refuses_non_finite_geometry() {
        let mut doc = scene();
        let rect = Rectangle::new(Point::new(100.0, 100.0), 150.0, 100.0);
        let mut circle = Ellipse::circle(Point::new(210.0, 210.0), 60.0);
        circle.transform(kurbo::Affine::scale(1e200) * kurbo::Affine::scale(1e200));
        let circle_id = circle.id();
        doc.add_shape(rect.into());
        doc.add_shape(circle.into());

        assert!(matches!(
            doc.to_snapshot(),
            Err(SnapshotError::NonFinite(id)) if id == circle_id
        ));
    }

    #[test]
    fn test_from_snapshot_rejects_garbage() {
        assert!(SceneDocument::from_snapshot(&Snapshot::new("not json")).is_err());
    }
}
