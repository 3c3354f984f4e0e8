//! Application shell: configuration, action handling and the input loop.

use crate::commands::CommandRegistry;
use crate::ui::{UiAction, parse_command, status_line};
use canva2d_core::editor::EditorController;
use canva2d_core::keyboard::KeyEvent;
use canva2d_core::navigation::{NavigationShell, Route, RouteError};
use canva2d_core::store::{DocumentStore, StoreBackend, StoreBackendError, StoreError};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid CANVA2D_STORE: {0}")]
    Config(#[from] StoreBackendError),
    #[error("Invalid CANVA2D_START: {0}")]
    Route(#[from] RouteError),
    #[error("Could not open document store: {0}")]
    Store(#[from] StoreError),
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Where documents are kept (`CANVA2D_STORE`).
    pub store: StoreBackend,
    /// Route opened at startup (`CANVA2D_START`).
    pub start: Route,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::File(None),
            start: Route::Landing,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(store) = lookup("CANVA2D_STORE") {
            config.store = store.parse()?;
        }
        if let Some(start) = lookup("CANVA2D_START") {
            config.start = start.parse()?;
        }
        Ok(config)
    }
}

/// Whether the input loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The terminal application.
pub struct App<W: Write = io::Stdout> {
    shell: NavigationShell,
    store: Arc<dyn DocumentStore>,
    out: W,
}

impl App<io::Stdout> {
    /// Open the configured store and write to stdout.
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::with_store(config.store.open()?, io::stdout()))
    }
}

impl<W: Write> App<W> {
    pub fn with_store(store: Arc<dyn DocumentStore>, out: W) -> Self {
        Self {
            shell: NavigationShell::new(),
            store,
            out,
        }
    }

    pub fn shell(&self) -> &NavigationShell {
        &self.shell
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Open the startup route and show where we are.
    pub async fn start(&mut self, route: Route) -> io::Result<()> {
        self.shell.open(route, self.store.as_ref()).await;
        self.show_status()
    }

    /// Parse and run one input line. Parse errors are reported, not returned.
    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match parse_command(line) {
            Ok(Some(action)) => self.handle_action(action).await,
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                writeln!(self.out, "{}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Run one action.
    pub async fn handle_action(&mut self, action: UiAction) -> io::Result<Flow> {
        log::debug!("Action: {:?}", action);
        match action {
            UiAction::Quit => {
                if self.shell.editor().is_some_and(|e| e.is_dirty()) {
                    writeln!(self.out, "Leaving with unsaved changes.")?;
                }
                return Ok(Flow::Quit);
            }
            UiAction::Help => {
                write!(self.out, "{}", CommandRegistry::help_text())?;
                return Ok(Flow::Continue);
            }
            UiAction::Status => {}
            UiAction::List => {
                self.list_documents().await?;
                return Ok(Flow::Continue);
            }
            UiAction::Save => {
                if self.shell.editor().is_none() {
                    return self.no_canvas();
                }
                self.shell.save(self.store.as_ref()).await;
            }
            UiAction::NewDocument => {
                self.shell.new_document(self.store.as_ref()).await;
            }
            UiAction::Open(route) => self.shell.open(route, self.store.as_ref()).await,
            UiAction::Home => self.shell.open(Route::Landing, self.store.as_ref()).await,
            UiAction::Key(key) => {
                self.shell.dispatch_key(KeyEvent::new(key));
            }
            editor_action => {
                let Some(editor) = self.shell.editor_mut() else {
                    return self.no_canvas();
                };
                apply_editor_action(editor, editor_action);
            }
        }
        self.flush_notices()?;
        self.show_status()?;
        Ok(Flow::Continue)
    }

    fn no_canvas(&mut self) -> io::Result<Flow> {
        writeln!(self.out, "No canvas open: use `new` or `open <id>`.")?;
        Ok(Flow::Continue)
    }

    fn show_status(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", status_line(&self.shell))
    }

    /// Print queued notices as alerts.
    fn flush_notices(&mut self) -> io::Result<()> {
        for notice in self.shell.take_notices() {
            let marker = if notice.is_error() { "!!" } else { "**" };
            writeln!(self.out, "{} {} {}", marker, notice, marker)?;
        }
        Ok(())
    }

    async fn list_documents(&mut self) -> io::Result<()> {
        match self.store.list().await {
            Ok(ids) if ids.is_empty() => writeln!(self.out, "No canvases yet."),
            Ok(ids) => {
                for id in ids {
                    writeln!(self.out, "  {}", Route::Canvas(id))?;
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Error listing canvases: {}", e);
                writeln!(self.out, "Failed to list canvases: {}", e)
            }
        }
    }
}

fn apply_editor_action(editor: &mut EditorController, action: UiAction) {
    match action {
        UiAction::SetTool(tool) => editor.set_tool(tool),
        UiAction::AddShape(kind) => {
            editor.add_shape(kind);
        }
        UiAction::SetColor(color) => editor.set_color(color),
        UiAction::SetTextContent(text) => editor.set_text_content(text),
        UiAction::DeleteSelected => {
            editor.delete_selected();
        }
        UiAction::Reorder(direction) => {
            editor.reorder_selected(direction);
        }
        UiAction::Scale(sx, sy) => {
            editor.scale_selected(sx, sy);
        }
        UiAction::PointerDown(point) => editor.pointer_down(point),
        UiAction::PointerMove(point) => editor.pointer_move(point),
        UiAction::PointerUp => {
            editor.pointer_up();
        }
        other => log::warn!("Not an editor action: {:?}", other),
    }
}

/// Run the interactive loop on stdin until `quit` or end of input.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let mut app = App::new(&config)?;
    writeln!(app.out, "Canva2D ({} store). Type `help` for commands.", config.store)?;
    app.start(config.start).await?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        write!(app.out, "> ")?;
        app.out.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        if app.handle_line(&line?).await? == Flow::Quit {
            break;
        }
    }
    log::info!("Exiting");
    Ok(())
}
