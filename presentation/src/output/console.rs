//! Console output formatting for models, conversations and messages

use chrono::{Local, TimeZone};
use colored::Colorize;
use pocketllm_domain::core::string::preview;
use pocketllm_domain::{Conversation, DownloadedModel, Message, Role, Timestamp};

/// Formats session data for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Banner printed when a chat starts
    pub fn welcome(conversation: &Conversation) -> String {
        let line = "=".repeat(60);
        let mut output = format!(
            "{}\n{:^60}\n{}\n\n",
            line.cyan(),
            "pocketllm".bold(),
            line.cyan()
        );
        output.push_str(&format!(
            "{} {}\n",
            "Model:".cyan().bold(),
            conversation.model_id()
        ));
        output.push_str(&format!(
            "{} {} ({} messages)\n",
            "Conversation:".cyan().bold(),
            conversation.name,
            conversation.len()
        ));
        output.push_str(&format!(
            "\n{}\n",
            "Type /help for commands. Ctrl-C stops a response.".dimmed()
        ));
        output
    }

    pub fn help(commands: &[(&str, &str)]) -> String {
        let mut output = format!("\n{}\n", "Commands:".bold());
        for (usage, description) in commands {
            output.push_str(&format!("  {:<20} - {}\n", usage, description));
        }
        output
    }

    /// Messages with their ids, for `/history`
    pub fn history(messages: &[Message]) -> String {
        if messages.is_empty() {
            return format!("{}\n", "No messages yet.".dimmed());
        }
        messages
            .iter()
            .map(|message| {
                format!(
                    "{} {} {}\n{}\n",
                    Self::role_label(message.role),
                    format!("[{}]", message.id).dimmed(),
                    Self::timestamp(message.timestamp).dimmed(),
                    Self::indent(&message.content, "  ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn models(models: &[DownloadedModel]) -> String {
        if models.is_empty() {
            return format!(
                "{}\n",
                "No models registered. Add one with --add-model <PATH>.".yellow()
            );
        }
        let mut output = format!("{}\n", "Local models:".cyan().bold());
        for model in models {
            output.push_str(&format!(
                "  {:<40} {:>10}  {}\n",
                model.id.as_str().bold(),
                model.display_size(),
                model.local_path.display().to_string().dimmed()
            ));
        }
        output
    }

    pub fn conversations(conversations: &[Conversation]) -> String {
        if conversations.is_empty() {
            return format!("{}\n", "No conversations stored.".dimmed());
        }
        let mut output = format!("{}\n", "Conversations:".cyan().bold());
        for conversation in conversations {
            output.push_str(&format!(
                "  {} {}\n    {} | {} messages | updated {}\n",
                conversation.name.bold(),
                format!("[{}]", conversation.id).dimmed(),
                conversation.model_id(),
                conversation.len(),
                Self::timestamp(conversation.updated_at)
            ));
            if let Some(last) = conversation.messages().last() {
                output.push_str(&format!("    {}\n", preview(&last.content, 60).dimmed()));
            }
        }
        output
    }

    pub fn error(message: &str) -> String {
        format!("{} {}", "Error:".red().bold(), message)
    }

    pub fn notice(message: &str) -> String {
        format!("{} {}", "->".cyan(), message)
    }

    fn role_label(role: Role) -> String {
        match role {
            Role::User => "you".green().bold().to_string(),
            Role::Assistant => "assistant".yellow().bold().to_string(),
            Role::System => "system".magenta().bold().to_string(),
        }
    }

    fn timestamp(millis: Timestamp) -> String {
        Local
            .timestamp_millis_opt(millis)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| millis.to_string())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
