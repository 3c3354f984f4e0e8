//! Editor state controller for one open document.
//!
//! The controller owns the UI state of the editor screen (tool, fill color,
//! pending text, dirty and loading flags) and the [`SceneSurface`] it edits.
//! Store calls are not made here: the controller hands out a [`LoadTicket`]
//! or [`SaveTicket`], the caller runs the request, and the result comes back
//! through [`EditorController::complete_load`] / [`EditorController::complete_save`].

use crate::keyboard::{KeyListener, KeyboardHub};
use crate::scene::{ReorderDirection, Snapshot};
use crate::shapes::{SerializableColor, ShapeId, ShapeKind};
use crate::store::{DocumentId, StoreResult};
use crate::surface::{SceneSurface, SurfaceConfig, SurfaceResult};
use kurbo::Point;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Fill color a fresh editor starts with.
pub const DEFAULT_FILL: SerializableColor = SerializableColor::new(0xff, 0x6b, 0x6b, 0xff);
/// Text inserted by the text tool until the user edits it.
pub const DEFAULT_TEXT: &str = "Hello World";
/// Stroke width of the pen tool.
pub const PEN_WIDTH: f64 = 3.0;

/// Active tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    /// Freehand pen.
    Draw,
}

impl ToolMode {
    pub fn name(&self) -> &'static str {
        match self {
            ToolMode::Select => "select",
            ToolMode::Draw => "pen",
        }
    }
}

/// Coarse editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPhase {
    Loading,
    IdleClean,
    IdleDirty,
}

/// Transient UI state of the open document.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub tool: ToolMode,
    pub fill_color: SerializableColor,
    pub text_content: String,
    /// True when the scene differs from the last persisted snapshot.
    pub dirty: bool,
    /// True while the initial load is outstanding.
    pub loading: bool,
    /// Saves started but not yet completed.
    pub saving: usize,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            tool: ToolMode::Select,
            fill_color: DEFAULT_FILL,
            text_content: DEFAULT_TEXT.to_string(),
            dirty: false,
            loading: false,
            saving: 0,
        }
    }
}

impl EditorState {
    pub fn phase(&self) -> EditorPhase {
        if self.loading {
            EditorPhase::Loading
        } else if self.dirty {
            EditorPhase::IdleDirty
        } else {
            EditorPhase::IdleClean
        }
    }

    /// Any store call in flight (drives the loading indicator).
    pub fn is_busy(&self) -> bool {
        self.loading || self.saving > 0
    }
}

/// Messages for the user, shown as blocking alerts by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved,
    SaveFailed(String),
    CreateFailed(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::Saved)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Saved => f.write_str("Canvas saved successfully!"),
            Notice::SaveFailed(reason) => {
                write!(f, "Failed to save canvas ({reason}). Please try again.")
            }
            Notice::CreateFailed(reason) => {
                write!(f, "Failed to create new canvas ({reason}). Please try again.")
            }
        }
    }
}

/// Identifies one mount of an editor. Completions from an older mount are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An outstanding load issued at mount.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub generation: Generation,
    pub id: DocumentId,
}

/// An outstanding save with the snapshot to write.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub generation: Generation,
    pub id: DocumentId,
    pub snapshot: Snapshot,
    /// Scene revision the snapshot was taken at.
    revision: u64,
}

/// Controller for one mounted editor screen.
pub struct EditorController {
    id: DocumentId,
    generation: Generation,
    surface: Rc<RefCell<SceneSurface>>,
    listener: Option<KeyListener>,
    state: EditorState,
    /// Count of scene mutations since mount.
    revision: u64,
    notices: Vec<Notice>,
}

impl EditorController {
    /// Mount an editor for `id`: initialize its surface, attach its keyboard
    /// listener and enter the loading state. The returned ticket must be
    /// resolved with [`Self::complete_load`].
    pub fn mount(
        id: DocumentId,
        generation: Generation,
        keyboard: &KeyboardHub,
    ) -> (Self, LoadTicket) {
        log::info!("Mounting editor for {} ({})", id, generation);
        let surface = Rc::new(RefCell::new(SceneSurface::new()));
        surface
            .borrow_mut()
            .initialize(format!("canvas-{}", id), SurfaceConfig::default());

        let weak = Rc::downgrade(&surface);
        let listener = keyboard.register(move |event| {
            weak.upgrade()
                .is_some_and(|surface| surface.borrow_mut().handle_key(event))
        });

        let controller = Self {
            id: id.clone(),
            generation,
            surface,
            listener: Some(listener),
            state: EditorState {
                loading: true,
                ..EditorState::default()
            },
            revision: 0,
            notices: Vec::new(),
        };
        (controller, LoadTicket { generation, id })
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn phase(&self) -> EditorPhase {
        self.state.phase()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    pub fn surface(&self) -> Ref<'_, SceneSurface> {
        self.surface.borrow()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Apply the result of the mount-time load. Returns false if the ticket
    /// belongs to another mount.
    ///
    /// Failures fail open: they are logged and leave an empty, clean canvas.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: StoreResult<Option<Snapshot>>,
    ) -> bool {
        if ticket.generation != self.generation || !self.state.loading {
            log::debug!("Ignoring stale load for {} ({})", ticket.id, ticket.generation);
            return false;
        }

        match result {
            Ok(Some(snapshot)) => {
                let loaded = self.surface.borrow_mut().load_snapshot(&snapshot, |scene| {
                    log::info!("Loaded {} with {} shapes", ticket.id, scene.len());
                });
                if let Err(e) = loaded {
                    log::error!("Error loading canvas {}: {}", self.id, e);
                }
            }
            Ok(None) => log::info!("Canvas {} has no saved scene", self.id),
            Err(e) => log::error!("Error loading canvas {}: {}", self.id, e),
        }

        self.surface.borrow_mut().take_events();
        self.state.loading = false;
        self.state.dirty = false;
        true
    }

    /// Fold queued surface notifications into the dirty flag.
    /// Returns the number of notifications consumed.
    pub fn poll_events(&mut self) -> usize {
        let events = self.surface.borrow_mut().take_events();
        if !events.is_empty() {
            for event in &events {
                log::debug!("Scene changed: {:?}", event);
            }
            self.revision += events.len() as u64;
            self.state.dirty = true;
        }
        events.len()
    }

    /// Run a surface operation, logging programming errors, then pick up
    /// any change notifications it queued.
    fn with_surface<T>(
        &mut self,
        action: &str,
        op: impl FnOnce(&mut SceneSurface) -> SurfaceResult<T>,
    ) -> Option<T> {
        let result = op(&mut *self.surface.borrow_mut());
        self.poll_events();
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("{} failed: {}", action, e);
                None
            }
        }
    }

    fn ignore_while_loading(&self, action: &str) -> bool {
        if self.state.loading {
            log::warn!("Ignoring {} while canvas is loading", action);
        }
        self.state.loading
    }

    /// Switch tool. Never dirties the document.
    pub fn set_tool(&mut self, tool: ToolMode) {
        self.state.tool = tool;
        let color = self.state.fill_color;
        self.with_surface("set_tool", |s| {
            s.set_draw_mode(tool == ToolMode::Draw, color, PEN_WIDTH)
        });
    }

    /// Change the active color. The selection, if any, is recolored and the
    /// pen brush follows while drawing.
    pub fn set_color(&mut self, color: SerializableColor) {
        self.state.fill_color = color;
        if self.state.tool == ToolMode::Draw {
            self.with_surface("set_color", |s| s.set_draw_mode(true, color, PEN_WIDTH));
        }
        if self.ignore_while_loading("recolor") {
            return;
        }
        self.with_surface("set_color", |s| s.set_active_object_color(color));
    }

    /// Edit the content used by the text tool. Takes focus off the surface
    /// so editing keys do not reach the selection.
    pub fn set_text_content(&mut self, content: impl Into<String>) {
        self.state.text_content = content.into();
        self.surface.borrow_mut().set_focus(false);
    }

    /// Insert a shape and switch back to the select tool.
    pub fn add_shape(&mut self, kind: ShapeKind) -> Option<ShapeId> {
        if self.ignore_while_loading("add shape") {
            return None;
        }
        let fill = self.state.fill_color;
        let text = self.state.text_content.clone();
        let id = self.with_surface("add_shape", |s| s.add_shape(kind, fill, &text))?;
        self.set_tool(ToolMode::Select);
        Some(id)
    }

    /// Remove the selection.
    pub fn delete_selected(&mut self) -> Option<ShapeId> {
        if self.ignore_while_loading("delete") {
            return None;
        }
        self.with_surface("delete", |s| s.delete_active_object())
            .flatten()
    }

    /// Move the selection one step in z-order.
    pub fn reorder_selected(&mut self, direction: ReorderDirection) -> bool {
        if self.ignore_while_loading("reorder") {
            return false;
        }
        self.with_surface("reorder", |s| s.reorder_active_object(direction))
            .unwrap_or(false)
    }

    /// Resize the selection.
    pub fn scale_selected(&mut self, sx: f64, sy: f64) -> bool {
        if self.ignore_while_loading("resize") {
            return false;
        }
        self.with_surface("resize", |s| s.scale_active_object(sx, sy))
            .unwrap_or(false)
    }

    pub fn pointer_down(&mut self, point: Point) {
        if self.ignore_while_loading("pointer input") {
            return;
        }
        self.with_surface("pointer_down", |s| s.pointer_down(point));
    }

    pub fn pointer_move(&mut self, point: Point) {
        if self.state.loading {
            return;
        }
        self.with_surface("pointer_move", |s| s.pointer_move(point));
    }

    pub fn pointer_up(&mut self) -> Option<ShapeId> {
        if self.state.loading {
            return None;
        }
        self.with_surface("pointer_up", |s| s.pointer_up()).flatten()
    }

    /// Snapshot the scene for saving. Returns `None` while loading.
    pub fn begin_save(&mut self) -> Option<SaveTicket> {
        if self.ignore_while_loading("save") {
            return None;
        }
        let snapshot = match self.surface.borrow().to_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Error saving canvas {}: {}", self.id, e);
                self.notices.push(Notice::SaveFailed(e.to_string()));
                return None;
            }
        };
        self.state.saving += 1;
        Some(SaveTicket {
            generation: self.generation,
            id: self.id.clone(),
            snapshot,
            revision: self.revision,
        })
    }

    /// Apply the result of a save. Returns false if the ticket belongs to
    /// another mount.
    ///
    /// On success the document is clean unless it was edited after the
    /// snapshot was taken. On failure the dirty flag is left as it is.
    pub fn complete_save(&mut self, ticket: SaveTicket, result: StoreResult<()>) -> bool {
        if ticket.generation != self.generation {
            log::debug!("Ignoring stale save for {} ({})", ticket.id, ticket.generation);
            return false;
        }
        self.state.saving = self.state.saving.saturating_sub(1);

        match result {
            Ok(()) => {
                self.state.dirty = ticket.revision != self.revision;
                log::info!("Canvas {} saved", self.id);
                self.notices.push(Notice::Saved);
            }
            Err(e) => {
                log::error!("Error saving canvas {}: {}", self.id, e);
                self.notices.push(Notice::SaveFailed(e.to_string()));
            }
        }
        true
    }

    /// Tear down: the keyboard listener is detached before the surface is
    /// disposed.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for EditorController {
    fn drop(&mut self) {
        self.listener.take();
        self.surface.borrow_mut().dispose();
        log::info!("Unmounted editor for {} ({})", self.id, self.generation);
    }
}

impl fmt::Debug for EditorController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorController")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("revision", &self.revision)
            .finish()
    }
}
