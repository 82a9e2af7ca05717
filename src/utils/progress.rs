use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Spinner shown while a pipeline stage waits on an external tool.
/// Hidden when stderr is not a terminal.
pub struct StageSpinner {
    bar: ProgressBar,
    started: Instant,
}

impl StageSpinner {
    pub fn start(message: &str, enabled: bool) -> Self {
        let bar = if enabled && console::Term::stderr().is_term() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::with_template("  {spinner:.green} [{elapsed}] {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            started: Instant::now(),
        }
    }

    /// Clears the spinner and returns how long the stage took.
    pub fn finish(self) -> Duration {
        self.bar.finish_and_clear();
        self.started.elapsed()
    }
}

impl Drop for StageSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
