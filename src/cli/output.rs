//! CLI output formatting

use crate::execution::{OrchestratorEvent, SessionState};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use console::style;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Lines of captured subprocess output shown on failure
pub const CAPTURED_OUTPUT_LINES: usize = 40;

/// Spinner shown while waiting for a service
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an orchestrator event for display; `None` for silent events
pub fn format_event(event: &OrchestratorEvent) -> Option<String> {
    match event {
        OrchestratorEvent::StateEntered(state) => match state {
            SessionState::Provisioning => Some(format!("{} Starting local CI", ROCKET)),
            SessionState::Execute => Some(format!("{} {}", ROCKET, style("Executing task").bold())),
            SessionState::Teardown => Some(format!("{} Stopping containers", INFO)),
            SessionState::Failed => Some(format!("{} {}", CROSS, style("Stage failed").red())),
            SessionState::Done => Some(format!("{} {}", CHECK, style("Stage completed").green())),
            SessionState::Settle => None,
            other => Some(format!("{} {}", SPINNER, style(other).cyan())),
        },
        OrchestratorEvent::Pushing { image } => Some(format!("{} Uploading image {}", INFO, style(image).bold())),
        OrchestratorEvent::Persisting => Some(format!("{} Persisting containers", INFO)),
        OrchestratorEvent::CapturedOutput(output) => {
            Some(format!("{} Output:\n{}", INFO, format_output(output, CAPTURED_OUTPUT_LINES)))
        },
        OrchestratorEvent::TeardownFailed(message) => {
            Some(format!("{} Teardown failed: {}", WARN, style(message).dim()))
        }
        OrchestratorEvent::WaitingFor { .. }
        | OrchestratorEvent::Ready { .. }
        | OrchestratorEvent::Finished { .. } => None,
    }
}

/// Console handler: prints events and spins while waiting on endpoints
pub fn console_handler() -> impl Fn(&OrchestratorEvent) + Send + Sync + 'static {
    let active: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    move |event| {
        let mut active = active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match event {
            OrchestratorEvent::WaitingFor { endpoint } => {
                *active = Some(create_spinner(format!("Waiting for {}", endpoint)));
            }
            OrchestratorEvent::Ready { endpoint } => {
                if let Some(spinner) = active.take() {
                    spinner.finish_and_clear();
                }
                println!("{} {} is ready", CHECK, style(endpoint).dim());
            }
            other => {
                if let Some(spinner) = active.take() {
                    spinner.finish_and_clear();
                }
                if let Some(line) = format_event(other) {
                    println!("{}", line);
                }
            }
        }
    }
}

/// Format captured output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
