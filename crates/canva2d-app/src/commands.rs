//! Command registry and help text.

/// A typed command.
#[derive(Debug, Clone)]
pub struct Command {
    pub name: &'static str,
    pub args: &'static str,
    pub description: &'static str,
}

impl Command {
    pub const fn new(name: &'static str, args: &'static str, description: &'static str) -> Self {
        Self {
            name,
            args,
            description,
        }
    }

    /// Format the usage for display (e.g., "color <hex>").
    pub fn format(&self) -> String {
        if self.args.is_empty() {
            self.name.to_string()
        } else {
            format!("{} {}", self.name, self.args)
        }
    }
}

/// Registry of all commands.
pub struct CommandRegistry;

impl CommandRegistry {
    /// Get all registered commands.
    pub fn all() -> Vec<Command> {
        vec![
            Command::new("select", "", "Select tool"),
            Command::new("pen", "", "Freehand pen tool"),
            Command::new("rect", "", "Add rectangle"),
            Command::new("circle", "", "Add circle"),
            Command::new("text", "", "Add text box with the current text content"),
            Command::new("color", "<hex>", "Set fill color (recolors the selection)"),
            Command::new("content", "<text>", "Set the text content for new text boxes"),
            Command::new("delete", "", "Delete selected object"),
            Command::new("forward", "", "Bring selection forward"),
            Command::new("backward", "", "Send selection backward"),
            Command::new("scale", "<sx> <sy>", "Resize selection"),
            Command::new("down", "<x> <y>", "Press pointer on the canvas"),
            Command::new("move", "<x> <y>", "Drag pointer"),
            Command::new("up", "", "Release pointer"),
            Command::new("key", "<delete|backspace|escape>", "Press a key"),
            Command::new("save", "", "Save canvas"),
            Command::new("new", "", "Create new canvas"),
            Command::new("open", "<route|id>", "Open /canvas/{id} or /"),
            Command::new("home", "", "Go to the landing page"),
            Command::new("list", "", "List stored canvases"),
            Command::new("status", "", "Show editor status"),
            Command::new("help", "", "Show this help"),
            Command::new("quit", "", "Exit"),
        ]
    }

    /// Look up a command by name.
    pub fn find(name: &str) -> Option<Command> {
        Self::all().into_iter().find(|c| c.name == name)
    }

    /// Help text listing every command.
    pub fn help_text() -> String {
        let mut text = String::from("=== Commands ===\n");
        for command in Self::all() {
            text.push_str(&format!("  {:36} {}\n", command.format(), command.description));
        }
        text
    }
}
