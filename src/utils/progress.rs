//! Progress indicators for long-running capture operations.
//!
//! Wraps `indicatif` with consistent styling and automatic disabling in
//! non-interactive environments. The spinner is display-only: it never gates
//! completion and has no effect on phase ordering.
//!
//! # Environment Variables
//!
//! - `OPSCLONE_NO_PROGRESS`: set to any value to disable all indicators

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
        .expect("valid progress template")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// A spinner for indeterminate work with consistent opsclone styling.
///
/// When progress is disabled (`OPSCLONE_NO_PROGRESS`, quiet mode), this is a
/// hidden bar that silently ignores all operations.
#[derive(Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Create and start a spinner with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(msg.into());
        Self { inner: bar }
    }

    /// Update the message displayed alongside the spinner.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Stop the spinner and clear its line.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}
