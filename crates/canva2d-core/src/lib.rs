//! Canva2D Core Library
//!
//! Scene model, drawing surface, editor state and document storage for the
//! Canva2D canvas editor.

pub mod editor;
pub mod keyboard;
pub mod navigation;
pub mod scene;
pub mod shapes;
pub mod store;
pub mod surface;

pub use editor::{
    EditorController, EditorPhase, EditorState, Generation, LoadTicket, Notice, SaveTicket,
    ToolMode,
};
pub use keyboard::{Key, KeyEvent, KeyListener, KeyboardHub};
pub use navigation::{NavigationShell, Route, RouteError};
pub use scene::{ReorderDirection, SceneDocument, Snapshot, SnapshotError};
pub use shapes::{SerializableColor, Shape, ShapeId, ShapeKind};
pub use store::{
    Document, DocumentId, DocumentStore, FileStore, HttpStore, MemoryStore, StoreBackend,
    StoreError, StoreResult,
};
pub use surface::{SceneSurface, SurfaceConfig, SurfaceError, SurfaceEvent};
