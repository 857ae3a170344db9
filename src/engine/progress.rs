//! Progress bar for apply

use blueprint::{Action, ActionOutcome, ActionStatus, ProgressCallback};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Reports apply progress on an indicatif bar.
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Self {
        let pb = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        Self { pb }
    }
}

impl ProgressCallback for BarProgress {
    fn on_start(&mut self, total: usize) {
        self.pb.set_length(total as u64);
    }

    fn on_action_start(&mut self, _index: usize, action: &Action) {
        self.pb.set_message(action.to_string());
    }

    fn on_action_complete(&mut self, _index: usize, outcome: &ActionOutcome) {
        let line = match &outcome.status {
            ActionStatus::Applied => format!("{} {} {}", "✓".green(), outcome.verb, outcome.urn),
            ActionStatus::Skipped { reason, .. } => {
                format!("{} {} {} {}", "⊘".dimmed(), outcome.verb, outcome.urn, format!("({reason})").dimmed())
            }
            ActionStatus::Failed { .. } => format!("{} {} {}", "✗".red(), outcome.verb, outcome.urn),
            ActionStatus::Aborted => format!("{} {} {}", "○".dimmed(), outcome.verb, outcome.urn),
        };
        self.pb.println(line);
        self.pb.inc(1);
    }

    fn on_finish(&mut self) {
        self.pb.finish_and_clear();
    }
}
