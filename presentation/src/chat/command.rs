//! Slash commands of the chat REPL

/// A parsed `/command` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    History,
    Delete(String),
    Clear,
    Refresh,
    Retry,
    Dismiss,
    Rename(String),
    Quit,
    /// Recognized command with a missing argument
    Usage(&'static str),
    Unknown(String),
}

impl ReplCommand {
    /// Parse a line starting with `/`.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match name {
            "/help" | "/h" | "/?" => Self::Help,
            "/history" | "/messages" => Self::History,
            "/delete" | "/del" if arg.is_empty() => Self::Usage("/delete <message-id>"),
            "/delete" | "/del" => Self::Delete(arg.to_string()),
            "/clear" => Self::Clear,
            "/refresh" => Self::Refresh,
            "/retry" => Self::Retry,
            "/dismiss" => Self::Dismiss,
            "/rename" if arg.is_empty() => Self::Usage("/rename <name>"),
            "/rename" => Self::Rename(arg.to_string()),
            "/quit" | "/exit" | "/q" => Self::Quit,
            _ => Self::Unknown(name.to_string()),
        }
    }
}

pub(crate) const HELP: &[(&str, &str)] = &[
    ("/help, /h, /?", "Show this help"),
    ("/history", "Show messages with their ids"),
    ("/delete <id>", "Delete a message and the reply to it"),
    ("/clear", "Start a new, empty conversation"),
    ("/refresh", "Reload the conversation from disk"),
    ("/retry", "Load the model again after a failure"),
    ("/dismiss", "Dismiss the current error"),
    ("/rename <name>", "Rename the conversation"),
    ("/quit, /exit, /q", "Exit chat"),
];
