//! Interactive chat module
//!
//! Provides a readline-based chat interface over a
//! [`SessionController`](pocketllm_application::SessionController).

mod command;
mod repl;

pub use command::ReplCommand;
pub use repl::ChatRepl;
