//! Live terminal rendering of a chat turn

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pocketllm_application::SessionObserver;
use pocketllm_domain::{GenerationState, ModelId};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct TurnDisplay {
    spinner: Option<ProgressBar>,
    /// The reply header has been printed and tokens are flowing
    streaming: bool,
}

/// Streams tokens to stdout and shows a spinner while the model loads
/// or before the first token arrives.
pub struct TerminalObserver {
    display: Mutex<TurnDisplay>,
    show_progress: bool,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self {
            display: Mutex::new(TurnDisplay::default()),
            show_progress: true,
        }
    }

    /// Disable spinners (tokens are still printed)
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn lock(&self) -> MutexGuard<'_, TurnDisplay> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn show_spinner(&self, message: String) {
        if !self.show_progress {
            return;
        }
        let mut display = self.lock();
        if display.streaming {
            return;
        }
        match display.spinner.as_ref() {
            Some(pb) => pb.set_message(message),
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb.set_message(message);
                pb.enable_steady_tick(Duration::from_millis(100));
                display.spinner = Some(pb);
            }
        }
    }

    fn clear_spinner(display: &mut TurnDisplay) {
        if let Some(pb) = display.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Close the turn's output. Returns whether any reply text was printed.
    fn end_turn(&self) -> bool {
        let mut display = self.lock();
        Self::clear_spinner(&mut display);
        std::mem::take(&mut display.streaming)
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for TerminalObserver {
    fn on_state_change(&self, state: GenerationState) {
        match state {
            GenerationState::Generating => self.show_spinner("Thinking...".to_string()),
            GenerationState::Completed => {
                if self.end_turn() {
                    println!();
                }
            }
            GenerationState::Cancelled => {
                if self.end_turn() {
                    println!(" {}", "[Response stopped by user]".dimmed());
                } else {
                    println!("{}", "Stopped.".dimmed());
                }
            }
            GenerationState::Failed => {
                if self.end_turn() {
                    println!();
                }
            }
            GenerationState::Idle => {}
        }
    }

    fn on_model_loading(&self, model_id: &ModelId) {
        self.show_spinner(format!("Loading {}...", model_id));
    }

    fn on_model_ready(&self, _model_id: &ModelId) {
        self.show_spinner("Thinking...".to_string());
    }

    fn on_token(&self, token: &str, _partial: &str) {
        let mut display = self.lock();
        if !display.streaming {
            Self::clear_spinner(&mut display);
            display.streaming = true;
            print!("{} ", "assistant>".yellow().bold());
        }
        print!("{}", token);
        let _ = std::io::stdout().flush();
    }

    fn on_error(&self, message: &str) {
        let mut display = self.lock();
        Self::clear_spinner(&mut display);
        eprintln!("{} {}", "Error:".red().bold(), message);
        eprintln!(
            "{}",
            "Use /retry to reload the model, /clear to start over or /dismiss.".dimmed()
        );
    }
}
