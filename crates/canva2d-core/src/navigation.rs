//! Routes and the shell that maps them to a mounted editor.

use crate::editor::{EditorController, Generation, LoadTicket, Notice, SaveTicket};
use crate::keyboard::{KeyEvent, KeyboardHub};
use crate::scene::Snapshot;
use crate::store::{DocumentId, DocumentStore, StoreResult};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Route parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Unknown route: {0}")]
    Unknown(String),
    #[error("Invalid document id in route: {0:?}")]
    InvalidId(String),
}

/// A navigable location.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// `/`: offers creating a new document.
    #[default]
    Landing,
    /// `/canvas/{id}`: the editor for one document.
    Canvas(DocumentId),
}

impl Route {
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            Route::Landing => None,
            Route::Canvas(id) => Some(id),
        }
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().trim_end_matches('/');
        if path.is_empty() {
            return Ok(Route::Landing);
        }
        let raw = path
            .strip_prefix("/canvas/")
            .ok_or_else(|| RouteError::Unknown(s.to_string()))?;
        DocumentId::parse(raw)
            .map(Route::Canvas)
            .map_err(|_| RouteError::InvalidId(raw.to_string()))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Landing => f.write_str("/"),
            Route::Canvas(id) => write!(f, "/canvas/{}", id),
        }
    }
}

/// Owns the current route and at most one mounted editor.
///
/// Store completions are routed back through [`Self::complete_load`] and
/// [`Self::complete_save`], which drop anything issued by an earlier mount.
#[derive(Debug, Default)]
pub struct NavigationShell {
    keyboard: KeyboardHub,
    route: Route,
    editor: Option<EditorController>,
    generation: Generation,
    notices: Vec<Notice>,
}

impl NavigationShell {
    /// A shell on the landing route.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn keyboard(&self) -> &KeyboardHub {
        &self.keyboard
    }

    pub fn editor(&self) -> Option<&EditorController> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorController> {
        self.editor.as_mut()
    }

    /// Go to `route`. The current editor is unmounted before a new one is
    /// mounted; the returned ticket is the new editor's load.
    ///
    /// Navigating to the document already open is a no-op.
    pub fn navigate(&mut self, route: Route) -> Option<LoadTicket> {
        if self.editor.is_some() && route == self.route {
            return None;
        }
        log::info!("Navigating {} -> {}", self.route, route);

        if let Some(editor) = self.editor.take() {
            if editor.is_dirty() {
                log::warn!("Leaving {} with unsaved changes", editor.id());
            }
            editor.unmount();
        }

        self.route = route;
        let id = self.route.document_id()?.clone();
        self.generation = self.generation.next();
        let (editor, ticket) = EditorController::mount(id, self.generation, &self.keyboard);
        self.editor = Some(editor);
        Some(ticket)
    }

    fn active_editor(&mut self, generation: Generation) -> Option<&mut EditorController> {
        self.editor
            .as_mut()
            .filter(|editor| editor.generation() == generation)
    }

    /// Deliver a load result. Returns false if it was stale.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: StoreResult<Option<Snapshot>>,
    ) -> bool {
        match self.active_editor(ticket.generation) {
            Some(editor) => editor.complete_load(ticket, result),
            None => {
                log::debug!("Dropping load for unmounted {}", ticket.id);
                false
            }
        }
    }

    /// Deliver a save result. Returns false if it was stale.
    pub fn complete_save(&mut self, ticket: SaveTicket, result: StoreResult<()>) -> bool {
        match self.active_editor(ticket.generation) {
            Some(editor) => editor.complete_save(ticket, result),
            None => {
                if let Err(e) = &result {
                    log::error!("Save for unmounted {} failed: {}", ticket.id, e);
                }
                false
            }
        }
    }

    /// Window-level key press: dispatch to listeners, then fold any scene
    /// changes into the editor state.
    pub fn dispatch_key(&mut self, event: KeyEvent) -> bool {
        let consumed = self.keyboard.dispatch(event);
        if let Some(editor) = self.editor.as_mut() {
            editor.poll_events();
        }
        consumed
    }

    /// Notices from the shell and the mounted editor, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        let mut notices = std::mem::take(&mut self.notices);
        if let Some(editor) = self.editor.as_mut() {
            notices.extend(editor.take_notices());
        }
        notices
    }

    /// Navigate and, if an editor was mounted, run its load to completion.
    pub async fn open(&mut self, route: Route, store: &dyn DocumentStore) {
        if let Some(ticket) = self.navigate(route) {
            let result = store.load(&ticket.id).await;
            self.complete_load(ticket, result);
        }
    }

    /// Save the open document. Returns true if a save was attempted.
    pub async fn save(&mut self, store: &dyn DocumentStore) -> bool {
        let Some(ticket) = self.editor.as_mut().and_then(|e| e.begin_save()) else {
            return false;
        };
        let result = store.save(&ticket.id, &ticket.snapshot).await;
        self.complete_save(ticket, result)
    }

    /// Create a document and open it. On failure the current route is kept.
    pub async fn new_document(&mut self, store: &dyn DocumentStore) -> Option<DocumentId> {
        match store.create().await {
            Ok(id) => {
                log::info!("Created canvas {}", id);
                self.open(Route::Canvas(id.clone()), store).await;
                Some(id)
            }
            Err(e) => {
                log::error!("Error creating canvas: {}", e);
                self.notices.push(Notice::CreateFailed(e.to_string()));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorPhase;
    use crate::keyboard::Key;
    use crate::shapes::ShapeKind;
    use crate::store::{BoxFuture, Document, MemoryStore, StoreError};
    use kurbo::Point;
    use pollster::block_on;

    #[test]
    fn test_route_parsing() {
        assert_eq!("/".parse(), Ok(Route::Landing));
        assert_eq!("".parse(), Ok(Route::Landing));
        assert_eq!(
            "/canvas/abc123".parse(),
            Ok(Route::Canvas(DocumentId::parse("abc123").unwrap()))
        );
        assert_eq!(
            "/canvas/abc123/".parse::<Route>().unwrap().to_string(),
            "/canvas/abc123"
        );
        assert!(matches!(
            "/settings".parse::<Route>(),
            Err(RouteError::Unknown(_))
        ));
        assert!(matches!(
            "/canvas/a b".parse::<Route>(),
            Err(RouteError::InvalidId(_))
        ));
    }

    #[test]
    fn test_remount_keeps_single_listener() {
        let mut shell = NavigationShell::new();
        shell.navigate("/canvas/one".parse().unwrap());
        assert_eq!(shell.keyboard().listener_count(), 1);
        shell.navigate("/canvas/two".parse().unwrap());
        assert_eq!(shell.keyboard().listener_count(), 1);
        shell.navigate(Route::Landing);
        assert_eq!(shell.keyboard().listener_count(), 0);
        assert!(shell.editor().is_none());
    }

    #[test]
    fn test_same_route_does_not_remount() {
        let mut shell = NavigationShell::new();
        assert!(shell.navigate("/canvas/one".parse().unwrap()).is_some());
        let generation = shell.editor().unwrap().generation();
        assert!(shell.navigate("/canvas/one".parse().unwrap()).is_none());
        assert_eq!(shell.editor().unwrap().generation(), generation);
    }

    #[test]
    fn test_stale_load_is_ignored() {
        let mut shell = NavigationShell::new();
        let stale = shell.navigate("/canvas/one".parse().unwrap()).unwrap();
        let current = shell.navigate("/canvas/two".parse().unwrap()).unwrap();

        let mut scene = crate::scene::SceneDocument::new(crate::surface::CANVAS_BACKGROUND);
        scene.add_shape(crate::surface::default_shape(
            ShapeKind::Rectangle,
            crate::editor::DEFAULT_FILL,
            "",
        ));
        let snapshot = scene.to_snapshot().unwrap();

        assert!(!shell.complete_load(stale, Ok(Some(snapshot))));
        assert_eq!(shell.editor().unwrap().phase(), EditorPhase::Loading);

        assert!(shell.complete_load(current, Ok(None)));
        let editor = shell.editor().unwrap();
        assert_eq!(editor.phase(), EditorPhase::IdleClean);
        assert!(editor.surface().scene().unwrap().is_empty());
    }

    #[test]
    fn test_stale_save_does_not_touch_new_editor() {
        let store = MemoryStore::new();
        let mut shell = NavigationShell::new();
        block_on(shell.open("/canvas/one".parse().unwrap(), &store));
        shell.editor_mut().unwrap().add_shape(ShapeKind::Rectangle);
        let ticket = shell.editor_mut().unwrap().begin_save().unwrap();

        block_on(shell.open("/canvas/two".parse().unwrap(), &store));
        shell.editor_mut().unwrap().add_shape(ShapeKind::Ellipse);
        let result = block_on(store.save(&ticket.id, &ticket.snapshot));

        assert!(!shell.complete_save(ticket, result));
        assert!(shell.editor().unwrap().is_dirty());
        assert!(shell.take_notices().is_empty());
    }

    #[test]
    fn test_new_document_then_save_and_reopen() {
        let store = MemoryStore::new();
        let mut shell = NavigationShell::new();

        let id = block_on(shell.new_document(&store)).unwrap();
        assert_eq!(shell.route(), &Route::Canvas(id.clone()));
        assert_eq!(shell.editor().unwrap().phase(), EditorPhase::IdleClean);

        shell.editor_mut().unwrap().add_shape(ShapeKind::Rectangle);
        assert!(block_on(shell.save(&store)));
        assert_eq!(shell.take_notices(), vec![Notice::Saved]);

        block_on(shell.open(Route::Landing, &store));
        block_on(shell.open(Route::Canvas(id), &store));
        let editor = shell.editor().unwrap();
        assert!(!editor.is_dirty());
        assert_eq!(editor.surface().scene().unwrap().len(), 1);
    }

    #[test]
    fn test_create_failure_stays_put() {
        struct DownStore;

        impl DocumentStore for DownStore {
            fn create(&self) -> BoxFuture<'_, StoreResult<DocumentId>> {
                Box::pin(async { Err(StoreError::Transport("connection refused".into())) })
            }

            fn save<'a>(
                &'a self,
                _id: &'a DocumentId,
                _snapshot: &'a Snapshot,
            ) -> BoxFuture<'a, StoreResult<()>> {
                Box::pin(async { Err(StoreError::Transport("connection refused".into())) })
            }

            fn fetch<'a>(
                &'a self,
                _id: &'a DocumentId,
            ) -> BoxFuture<'a, StoreResult<Option<Document>>> {
                Box::pin(async { Err(StoreError::Transport("connection refused".into())) })
            }

            fn list(&self) -> BoxFuture<'_, StoreResult<Vec<DocumentId>>> {
                Box::pin(async { Ok(Vec::new()) })
            }
        }

        let mut shell = NavigationShell::new();
        assert!(block_on(shell.new_document(&DownStore)).is_none());
        assert_eq!(shell.route(), &Route::Landing);
        let notices = shell.take_notices();
        assert!(matches!(notices.as_slice(), [Notice::CreateFailed(_)]));
    }

    #[test]
    fn test_dispatch_key_marks_dirty() {
        let store = MemoryStore::new();
        let mut shell = NavigationShell::new();
        block_on(shell.open("/canvas/doc".parse().unwrap(), &store));

        let editor = shell.editor_mut().unwrap();
        editor.add_shape(ShapeKind::Rectangle);
        assert!(block_on(shell.save(&store)));
        assert!(!shell.editor().unwrap().is_dirty());

        let editor = shell.editor_mut().unwrap();
        editor.pointer_down(Point::new(120.0, 120.0));
        editor.pointer_up();
        assert!(shell.dispatch_key(KeyEvent::new(Key::Delete)));
        let editor = shell.editor().unwrap();
        assert!(editor.is_dirty());
        assert!(editor.surface().scene().unwrap().is_empty());
    }
}
