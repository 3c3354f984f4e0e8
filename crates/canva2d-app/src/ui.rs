//! Command parsing and the status line.

use crate::commands::CommandRegistry;
use canva2d_core::editor::{EditorPhase, ToolMode};
use canva2d_core::keyboard::Key;
use canva2d_core::navigation::{NavigationShell, Route, RouteError};
use canva2d_core::scene::ReorderDirection;
use canva2d_core::shapes::{ColorParseError, SerializableColor, ShapeKind};
use canva2d_core::store::DocumentId;
use kurbo::Point;
use thiserror::Error;

/// Actions that can be triggered from the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Change the current tool.
    SetTool(ToolMode),
    /// Insert a shape at its default position.
    AddShape(ShapeKind),
    /// Change fill color.
    SetColor(SerializableColor),
    /// Change the content used for new text boxes.
    SetTextContent(String),
    /// Delete the selection.
    DeleteSelected,
    /// Move the selection one step in z-order.
    Reorder(ReorderDirection),
    /// Resize the selection.
    Scale(f64, f64),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    /// A window-level key press.
    Key(Key),
    /// Save the open canvas.
    Save,
    /// Create a canvas and open it.
    NewDocument,
    /// Navigate to a route.
    Open(Route),
    /// Navigate to the landing page.
    Home,
    /// List stored canvases.
    List,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UiParseError {
    #[error("Unknown command {0:?} (type `help`)")]
    UnknownCommand(String),
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Invalid number {0:?}")]
    InvalidNumber(String),
    #[error("Unknown key {0:?}")]
    UnknownKey(String),
    #[error(transparent)]
    Color(#[from] ColorParseError),
    #[error(transparent)]
    Route(#[from] RouteError),
}

fn usage(name: &str) -> UiParseError {
    let text = CommandRegistry::find(name)
        .map(|c| c.format())
        .unwrap_or_else(|| name.to_string());
    UiParseError::Usage(text)
}

fn parse_number(raw: &str) -> Result<f64, UiParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| UiParseError::InvalidNumber(raw.to_string()))
}

fn parse_pair(name: &str, rest: &str) -> Result<(f64, f64), UiParseError> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((parse_number(a)?, parse_number(b)?)),
        _ => Err(usage(name)),
    }
}

/// Accept a full route or a bare document id.
fn parse_route(raw: &str) -> Result<Route, UiParseError> {
    if raw.starts_with('/') {
        return Ok(raw.parse::<Route>()?);
    }
    DocumentId::parse(raw)
        .map(Route::Canvas)
        .map_err(|_| UiParseError::Route(RouteError::InvalidId(raw.to_string())))
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<UiAction>, UiParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let name = name.to_ascii_lowercase();

    let no_args = |action: UiAction| {
        if rest.is_empty() {
            Ok(action)
        } else {
            Err(usage(&name))
        }
    };

    let action = match name.as_str() {
        "select" => no_args(UiAction::SetTool(ToolMode::Select))?,
        "pen" => no_args(UiAction::SetTool(ToolMode::Draw))?,
        "rect" => no_args(UiAction::AddShape(ShapeKind::Rectangle))?,
        "circle" => no_args(UiAction::AddShape(ShapeKind::Ellipse))?,
        "text" => no_args(UiAction::AddShape(ShapeKind::Text))?,
        "color" if !rest.is_empty() => UiAction::SetColor(rest.parse()?),
        "content" => UiAction::SetTextContent(rest.to_string()),
        "delete" => no_args(UiAction::DeleteSelected)?,
        "forward" => no_args(UiAction::Reorder(ReorderDirection::Forward))?,
        "backward" => no_args(UiAction::Reorder(ReorderDirection::Backward))?,
        "scale" => {
            let (sx, sy) = parse_pair(&name, rest)?;
            if sx <= 0.0 || sy <= 0.0 {
                return Err(usage(&name));
            }
            UiAction::Scale(sx, sy)
        }
        "down" => {
            let (x, y) = parse_pair(&name, rest)?;
            UiAction::PointerDown(Point::new(x, y))
        }
        "move" => {
            let (x, y) = parse_pair(&name, rest)?;
            UiAction::PointerMove(Point::new(x, y))
        }
        "up" => no_args(UiAction::PointerUp)?,
        "key" if !rest.is_empty() => UiAction::Key(
            Key::from_name(rest).ok_or_else(|| UiParseError::UnknownKey(rest.to_string()))?,
        ),
        "save" => no_args(UiAction::Save)?,
        "new" => no_args(UiAction::NewDocument)?,
        "open" if !rest.is_empty() => UiAction::Open(parse_route(rest)?),
        "home" => no_args(UiAction::Home)?,
        "list" => no_args(UiAction::List)?,
        "status" => no_args(UiAction::Status)?,
        "help" | "?" => UiAction::Help,
        "quit" | "exit" => UiAction::Quit,
        "color" | "key" | "open" => return Err(usage(&name)),
        _ => return Err(UiParseError::UnknownCommand(name.clone())),
    };
    Ok(Some(action))
}

/// One-line summary of the current screen.
pub fn status_line(shell: &NavigationShell) -> String {
    let Some(editor) = shell.editor() else {
        return format!("{}  Canva2D: type `new` to create a canvas", shell.route());
    };

    let state = editor.state();
    let indicator = match editor.phase() {
        EditorPhase::Loading => "Loading canvas data...",
        EditorPhase::IdleDirty => "● Unsaved",
        EditorPhase::IdleClean => "✓ Saved",
    };
    let surface = editor.surface();
    let shapes = surface.scene().map(|s| s.len()).unwrap_or(0);
    let selected = surface
        .selected_shape()
        .map(|s| s.kind_name())
        .unwrap_or("none");

    let mut line = format!(
        "{}  [{}]  tool: {}  color: {}  text: {:?}  shapes: {}  selected: {}",
        shell.route(),
        indicator,
        state.tool.name(),
        state.fill_color,
        state.text_content,
        shapes,
        selected,
    );
    if state.saving > 0 {
        line.push_str("  (saving...)");
    }
    line
}
