//! Canva2D Application
//!
//! Terminal shell for the Canva2D editor: typed commands stand in for the
//! toolbar, pointer and keyboard.

mod app;
mod commands;
mod ui;

pub use app::{App, AppConfig, AppError, Flow, run};
pub use commands::{Command, CommandRegistry};
pub use ui::{UiAction, UiParseError, parse_command, status_line};
