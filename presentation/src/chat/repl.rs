//! REPL (Read-Eval-Print Loop) for interactive chat

use super::command::{HELP, ReplCommand};
use crate::ConsoleFormatter;
use colored::Colorize;
use pocketllm_application::{SessionController, SessionError, TurnOutcome};
use pocketllm_domain::ModelId;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Whether the loop keeps reading after a command
enum CommandResult {
    Continue,
    Exit,
}

/// Interactive chat REPL
pub struct ChatRepl {
    controller: Arc<SessionController>,
    model_id: ModelId,
    history_file: Option<PathBuf>,
}

impl ChatRepl {
    pub fn new(controller: Arc<SessionController>, model_id: ModelId) -> Self {
        Self {
            controller,
            model_id,
            history_file: None,
        }
    }

    /// Persist readline history to this file
    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_file = Some(path.into());
        self
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        if let Some(ref path) = self.history_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        match self.controller.open(&self.model_id).await {
            Ok(conversation) => println!("{}", ConsoleFormatter::welcome(&conversation)),
            Err(e) => {
                eprintln!("{}", ConsoleFormatter::error(&e.to_string()));
                return Ok(());
            }
        }

        loop {
            match rl.readline("you> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        match self.handle_command(ReplCommand::parse(line)).await {
                            CommandResult::Exit => break,
                            CommandResult::Continue => continue,
                        }
                    }

                    let _ = rl.add_history_entry(line);
                    self.process_message(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_file {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    async fn handle_command(&self, command: ReplCommand) -> CommandResult {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return CommandResult::Exit;
            }
            ReplCommand::Help => println!("{}", ConsoleFormatter::help(HELP)),
            ReplCommand::History => {
                println!("{}", ConsoleFormatter::history(&self.controller.messages()))
            }
            ReplCommand::Delete(message_id) => self.delete_message(&message_id).await,
            ReplCommand::Clear => match self.controller.clear_conversation().await {
                Ok(conversation) => println!(
                    "{}",
                    ConsoleFormatter::notice(&format!("Started {}", conversation.name))
                ),
                Err(e) => Self::print_error(&e),
            },
            ReplCommand::Refresh => {
                let Some(id) = self.controller.current_conversation_id() else {
                    Self::print_error(&SessionError::NoConversation);
                    return CommandResult::Continue;
                };
                match self.controller.refresh(&id).await {
                    Ok(conversation) => println!(
                        "{}",
                        ConsoleFormatter::notice(&format!(
                            "Reloaded {} ({} messages)",
                            conversation.name,
                            conversation.len()
                        ))
                    ),
                    Err(e) => Self::print_error(&e),
                }
            }
            ReplCommand::Retry => match self.controller.retry_load().await {
                Ok(()) => println!("{}", ConsoleFormatter::notice("Model ready")),
                Err(e) => Self::print_error(&e),
            },
            ReplCommand::Dismiss => self.controller.dismiss_error(),
            ReplCommand::Rename(name) => match self.controller.rename(&name).await {
                Ok(conversation) => println!(
                    "{}",
                    ConsoleFormatter::notice(&format!("Renamed to {}", conversation.name))
                ),
                Err(e) => Self::print_error(&e),
            },
            ReplCommand::Usage(usage) => println!("Usage: {}", usage),
            ReplCommand::Unknown(name) => {
                println!("Unknown command: {}", name);
                println!("Type /help for available commands");
            }
        }
        CommandResult::Continue
    }

    async fn delete_message(&self, message_id: &str) {
        let Some(conversation_id) = self.controller.current_conversation_id() else {
            Self::print_error(&SessionError::NoConversation);
            return;
        };
        match self
            .controller
            .delete_message(&conversation_id, message_id)
            .await
        {
            Ok(true) => println!("{}", ConsoleFormatter::notice("Message deleted")),
            Ok(false) => println!(
                "{}",
                "Only your own messages can be deleted (see /history for ids).".yellow()
            ),
            Err(e) => Self::print_error(&e),
        }
    }

    /// Send one message, cancelling the turn on Ctrl-C.
    async fn process_message(&self, content: &str) {
        let Some(conversation_id) = self.controller.current_conversation_id() else {
            Self::print_error(&SessionError::NoConversation);
            return;
        };

        let controller = self.controller.clone();
        let content = content.to_string();
        let mut turn =
            tokio::spawn(async move { controller.send_message(&conversation_id, &content).await });

        let result = tokio::select! {
            result = &mut turn => result,
            _ = tokio::signal::ctrl_c() => {
                debug!("Ctrl-C during generation");
                self.controller.cancel().await;
                turn.await
            }
        };
        Self::report(result);
    }

    fn report(result: Result<Result<TurnOutcome, SessionError>, JoinError>) {
        match result {
            Ok(Ok(TurnOutcome::Ignored)) => {
                debug!("Message ignored");
            }
            Ok(Ok(_)) => {}
            // Already shown through the observer
            Ok(Err(e)) => debug!(error = %e, "Turn failed"),
            Err(e) => {
                warn!("Chat turn panicked: {}", e);
                eprintln!("{}", ConsoleFormatter::error("the response task stopped unexpectedly"));
            }
        }
    }

    fn print_error(error: &SessionError) {
        eprintln!("{}", ConsoleFormatter::error(&error.to_string()));
    }
}
