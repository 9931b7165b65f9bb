//! Presentation layer for pocketllm
//!
//! This crate contains the CLI definition, console formatting, the live
//! terminal observer and the interactive chat REPL.

pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::{ChatRepl, ReplCommand};
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::TerminalObserver;
