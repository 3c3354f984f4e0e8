//! Scene surface: the drawing area for one open document.
//!
//! The surface owns the scene graph, the active selection, the freehand
//! brush and pointer gestures. Every discrete mutation of the scene queues
//! exactly one [`SurfaceEvent`]; replacing the scene from a snapshot queues
//! none.

use crate::keyboard::{Key, KeyEvent};
use crate::scene::{ReorderDirection, SceneDocument, Snapshot, SnapshotError};
use crate::shapes::{
    Ellipse, Freehand, Rectangle, SerializableColor, Shape, ShapeId, ShapeKind, ShapeStyle,
    Text,
};
use kurbo::{Affine, Point, Vec2};
use thiserror::Error;

/// Canvas width in pixels.
pub const CANVAS_WIDTH: f64 = 1620.0;
/// Canvas height in pixels.
pub const CANVAS_HEIGHT: f64 = 500.0;
/// Canvas background color.
pub const CANVAS_BACKGROUND: SerializableColor = SerializableColor::new(0xf6, 0xf5, 0xf5, 0xff);

/// Pick tolerance for pointer hit-testing.
const HIT_TOLERANCE: f64 = 4.0;

/// Default placement of inserted shapes.
const RECT_ORIGIN: Point = Point::new(100.0, 100.0);
const RECT_WIDTH: f64 = 150.0;
const RECT_HEIGHT: f64 = 100.0;
const CIRCLE_ORIGIN: Point = Point::new(150.0, 150.0);
const CIRCLE_RADIUS: f64 = 60.0;
const TEXT_ORIGIN: Point = Point::new(200.0, 200.0);

/// Errors from surface operations.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface is not initialized")]
    NotInitialized,
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Fixed properties of a drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub width: f64,
    pub height: f64,
    pub background: SerializableColor,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            background: CANVAS_BACKGROUND,
        }
    }
}

/// Change notification, one per discrete scene mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    ObjectAdded(ShapeId),
    ObjectRemoved(ShapeId),
    ObjectModified(ShapeId),
}

/// Freehand brush used while draw mode is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: SerializableColor,
    pub width: f64,
}

/// Build the shape an "add" button inserts.
pub fn default_shape(kind: ShapeKind, fill: SerializableColor, text: &str) -> Shape {
    match kind {
        ShapeKind::Rectangle => {
            let mut rect = Rectangle::new(RECT_ORIGIN, RECT_WIDTH, RECT_HEIGHT);
            rect.style = ShapeStyle::filled(fill);
            rect.into()
        }
        ShapeKind::Ellipse => {
            let mut circle = Ellipse::circle_at(CIRCLE_ORIGIN, CIRCLE_RADIUS);
            circle.style = ShapeStyle::filled(fill);
            circle.into()
        }
        ShapeKind::Text => {
            let mut text = Text::new(TEXT_ORIGIN, text.to_string());
            text.style.fill_color = Some(fill);
            text.into()
        }
    }
}

/// Apply `affine` unless it would leave the shape with non-finite geometry.
fn transform_finite(shape: &mut Shape, affine: Affine) -> bool {
    let mut moved = shape.clone();
    moved.transform(affine);
    if !moved.is_finite() {
        return false;
    }
    *shape = moved;
    true
}

#[derive(Debug)]
struct Drag {
    id: ShapeId,
    last: Point,
    moved: bool,
}

#[derive(Debug)]
struct ActiveSurface {
    mount: String,
    config: SurfaceConfig,
    scene: SceneDocument,
    selection: Option<ShapeId>,
    brush: Option<Brush>,
    stroke: Option<Freehand>,
    drag: Option<Drag>,
    focused: bool,
    events: Vec<SurfaceEvent>,
    renders: u64,
}

impl ActiveSurface {
    fn new(mount: String, config: SurfaceConfig) -> Self {
        Self {
            mount,
            scene: SceneDocument::new(config.background),
            config,
            selection: None,
            brush: None,
            stroke: None,
            drag: None,
            focused: false,
            events: Vec::new(),
            renders: 0,
        }
    }

    fn emit(&mut self, event: SurfaceEvent) {
        self.events.push(event);
        self.renders += 1;
    }

    fn remove_selected(&mut self) -> Option<ShapeId> {
        let id = self.selection.take()?;
        self.drag = None;
        self.scene.remove_shape(id)?;
        self.emit(SurfaceEvent::ObjectRemoved(id));
        Some(id)
    }
}

/// Drawing surface for the currently open document.
#[derive(Debug, Default)]
pub struct SceneSurface {
    active: Option<ActiveSurface>,
}

impl SceneSurface {
    /// Create a surface with nothing mounted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a fresh, empty drawing area. A previously mounted area is
    /// disposed first, dropping its scene and any pending notifications.
    pub fn initialize(&mut self, mount: impl Into<String>, config: SurfaceConfig) {
        if self.active.is_some() {
            log::info!("Disposing existing surface before re-initializing");
            self.dispose();
        }
        let mount = mount.into();
        log::info!(
            "Surface initialized on {} ({}x{})",
            mount,
            config.width,
            config.height
        );
        self.active = Some(ActiveSurface::new(mount, config));
    }

    /// Tear down the mounted drawing area, if any.
    pub fn dispose(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!(
                "Surface on {} disposed ({} shapes, {} pending events)",
                active.mount,
                active.scene.len(),
                active.events.len()
            );
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    /// Mount point of the active drawing area.
    pub fn mount(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.mount.as_str())
    }

    pub fn config(&self) -> Option<&SurfaceConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    fn active(&self) -> SurfaceResult<&ActiveSurface> {
        self.active.as_ref().ok_or(SurfaceError::NotInitialized)
    }

    fn active_mut(&mut self) -> SurfaceResult<&mut ActiveSurface> {
        self.active.as_mut().ok_or(SurfaceError::NotInitialized)
    }

    /// The current scene graph.
    pub fn scene(&self) -> SurfaceResult<&SceneDocument> {
        self.active().map(|a| &a.scene)
    }

    /// The active selection.
    pub fn selection(&self) -> Option<ShapeId> {
        self.active.as_ref().and_then(|a| a.selection)
    }

    /// The selected shape.
    pub fn selected_shape(&self) -> Option<&Shape> {
        let active = self.active.as_ref()?;
        active.scene.get_shape(active.selection?)
    }

    /// Make a shape the active selection. Returns false if it does not exist.
    pub fn select(&mut self, id: ShapeId) -> SurfaceResult<bool> {
        let active = self.active_mut()?;
        if active.scene.get_shape(id).is_none() {
            return Ok(false);
        }
        active.selection = Some(id);
        Ok(true)
    }

    pub fn clear_selection(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.selection = None;
            active.drag = None;
        }
    }

    pub fn set_focus(&mut self, focused: bool) {
        if let Some(active) = self.active.as_mut() {
            active.focused = focused;
        }
    }

    pub fn is_focused(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.focused)
    }

    /// Number of re-renders requested since mount.
    pub fn render_count(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.renders)
    }

    /// Drain queued change notifications.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        self.active
            .as_mut()
            .map(|a| std::mem::take(&mut a.events))
            .unwrap_or_default()
    }

    /// Insert a new shape at its default position, select it and take focus.
    pub fn add_shape(
        &mut self,
        kind: ShapeKind,
        fill: SerializableColor,
        text: &str,
    ) -> SurfaceResult<ShapeId> {
        let active = self.active_mut()?;
        let shape = default_shape(kind, fill, text);
        let id = shape.id();
        log::debug!("Adding {} {}", shape.kind_name(), id);
        active.scene.add_shape(shape);
        active.selection = Some(id);
        active.focused = true;
        active.emit(SurfaceEvent::ObjectAdded(id));
        Ok(id)
    }

    /// Toggle freehand drawing. While enabled, pointer drags paint strokes.
    pub fn set_draw_mode(
        &mut self,
        enabled: bool,
        color: SerializableColor,
        stroke_width: f64,
    ) -> SurfaceResult<()> {
        let active = self.active_mut()?;
        if enabled {
            active.brush = Some(Brush {
                color,
                width: stroke_width,
            });
            active.drag = None;
        } else {
            active.brush = None;
            active.stroke = None;
        }
        Ok(())
    }

    pub fn brush(&self) -> Option<Brush> {
        self.active.as_ref().and_then(|a| a.brush)
    }

    pub fn is_draw_mode(&self) -> bool {
        self.brush().is_some()
    }

    /// Recolor the selection. Freehand strokes take the color on their stroke,
    /// other shapes on their fill. Returns false when nothing is selected.
    pub fn set_active_object_color(&mut self, color: SerializableColor) -> SurfaceResult<bool> {
        let active = self.active_mut()?;
        let Some(id) = active.selection else {
            return Ok(false);
        };
        let Some(shape) = active.scene.get_shape_mut(id) else {
            return Ok(false);
        };
        match shape {
            Shape::Freehand(stroke) => stroke.style.stroke_color = color,
            other => other.style_mut().fill_color = Some(color),
        }
        active.emit(SurfaceEvent::ObjectModified(id));
        Ok(true)
    }

    /// Remove the selection. Returns the removed shape's id.
    pub fn delete_active_object(&mut self) -> SurfaceResult<Option<ShapeId>> {
        Ok(self.active_mut()?.remove_selected())
    }

    /// Move the selection one step in z-order. Returns false if nothing is
    /// selected or it is already at the end in that direction.
    pub fn reorder_active_object(&mut self, direction: ReorderDirection) -> SurfaceResult<bool> {
        let active = self.active_mut()?;
        let Some(id) = active.selection else {
            return Ok(false);
        };
        if !active.scene.reorder(id, direction) {
            return Ok(false);
        }
        active.emit(SurfaceEvent::ObjectModified(id));
        Ok(true)
    }

    /// Resize the selection around its top-left corner. Returns false when
    /// nothing is selected or the result would overflow.
    pub fn scale_active_object(&mut self, sx: f64, sy: f64) -> SurfaceResult<bool> {
        let active = self.active_mut()?;
        let Some(id) = active.selection else {
            return Ok(false);
        };
        let Some(shape) = active.scene.get_shape_mut(id) else {
            return Ok(false);
        };
        let origin = shape.bounds().origin().to_vec2();
        let scale = Affine::translate(origin)
            * Affine::scale_non_uniform(sx.abs(), sy.abs())
            * Affine::translate(-origin);
        if !transform_finite(shape, scale) {
            log::warn!("Refusing to scale {} by ({}, {})", id, sx, sy);
            return Ok(false);
        }
        active.emit(SurfaceEvent::ObjectModified(id));
        Ok(true)
    }

    /// Serialize the current scene.
    pub fn to_snapshot(&self) -> SurfaceResult<Snapshot> {
        Ok(self.active()?.scene.to_snapshot()?)
    }

    /// Replace the scene with a snapshot's contents, then call `on_complete`.
    /// No change notifications are queued for the loaded objects.
    pub fn load_snapshot(
        &mut self,
        snapshot: &Snapshot,
        on_complete: impl FnOnce(&SceneDocument),
    ) -> SurfaceResult<()> {
        let active = self.active_mut()?;
        let scene = SceneDocument::from_snapshot(snapshot)?;
        active.config.background = scene.background;
        active.scene = scene;
        active.selection = None;
        active.drag = None;
        active.stroke = None;
        active.events.clear();
        active.renders += 1;
        on_complete(&active.scene);
        Ok(())
    }

    /// Pointer pressed on the surface.
    pub fn pointer_down(&mut self, point: Point) -> SurfaceResult<()> {
        let active = self.active_mut()?;
        if !point.is_finite() {
            log::warn!("Ignoring pointer at {:?}", point);
            return Ok(());
        }
        active.focused = true;

        if let Some(brush) = active.brush {
            let mut stroke = Freehand::with_brush(brush.color, brush.width);
            stroke.add_point(point);
            active.stroke = Some(stroke);
            return Ok(());
        }

        let hit = active
            .scene
            .shapes_at_point(point, HIT_TOLERANCE)
            .first()
            .copied();
        active.selection = hit;
        active.drag = hit.map(|id| Drag {
            id,
            last: point,
            moved: false,
        });
        Ok(())
    }

    /// Pointer moved while pressed.
    pub fn pointer_move(&mut self, point: Point) -> SurfaceResult<()> {
        let active = self.active_mut()?;

        if !point.is_finite() {
            log::warn!("Ignoring pointer at {:?}", point);
            return Ok(());
        }

        if let Some(stroke) = active.stroke.as_mut() {
            stroke.add_point(point);
            return Ok(());
        }

        if let Some(drag) = active.drag.as_mut() {
            let delta: Vec2 = point - drag.last;
            if delta.hypot2() > 0.0 {
                if let Some(shape) = active.scene.get_shape_mut(drag.id) {
                    if transform_finite(shape, Affine::translate(delta)) {
                        drag.moved = true;
                    } else {
                        log::warn!("Refusing to move {} to {:?}", drag.id, point);
                    }
                }
                drag.last = point;
            }
        }
        Ok(())
    }

    /// Pointer released. Commits a freehand stroke or finishes a drag.
    /// Returns the id of the shape that was added or moved.
    pub fn pointer_up(&mut self) -> SurfaceResult<Option<ShapeId>> {
        let active = self.active_mut()?;

        if let Some(stroke) = active.stroke.take() {
            if stroke.len() < 2 {
                return Ok(None);
            }
            let id = stroke.id;
            active.scene.add_shape(stroke.into());
            active.emit(SurfaceEvent::ObjectAdded(id));
            return Ok(Some(id));
        }

        match active.drag.take() {
            Some(drag) if drag.moved => {
                active.emit(SurfaceEvent::ObjectModified(drag.id));
                Ok(Some(drag.id))
            }
            _ => Ok(None),
        }
    }

    /// Keyboard affordances while focused: delete/backspace removes the
    /// selection, escape drops it. Returns true if the key was handled.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.focused {
            return false;
        }
        match event.key {
            key if key.is_delete() => active.remove_selected().is_some(),
            Key::Escape => {
                active.drag = None;
                active.stroke = None;
                active.selection.take().is_some()
            }
            _ => false,
        }
    }
}
