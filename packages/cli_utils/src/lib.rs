#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the clinic map tools.
//!
//! Provides [`init_logger`], which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while spinners redraw, and
//! [`FetchSpinner`], the terminal rendering of a search's `fetching` flag.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Spinner shown while a clinic search is scheduled or running.
///
/// Mirrors a boolean flag: [`set_active`](Self::set_active) starts or
/// stops it, and repeated calls with the same value are no-ops.
#[derive(Debug)]
pub struct FetchSpinner {
    multi: MultiProgress,
    message: String,
    bar: Option<ProgressBar>,
}

impl FetchSpinner {
    /// Creates an idle spinner that will draw into `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        Self {
            multi: multi.clone(),
            message: message.to_string(),
            bar: None,
        }
    }

    /// Whether the spinner is currently drawn.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.bar.is_some()
    }

    /// Shows or hides the spinner.
    pub fn set_active(&mut self, active: bool) {
        match (active, self.bar.take()) {
            (true, None) => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.magenta} {msg} [{elapsed}]")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.set_message(self.message.clone());
                self.bar = Some(bar);
            }
            (false, Some(bar)) => {
                bar.finish_and_clear();
                self.multi.remove(&bar);
            }
            (_, bar) => self.bar = bar,
        }
    }

    /// Replaces the spinner message.
    pub fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
        if let Some(bar) = &self.bar {
            bar.set_message(self.message.clone());
        }
    }
}

impl Drop for FetchSpinner {
    fn drop(&mut self) {
        self.set_active(false);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while spinners redraw.
///
/// Returns the [`MultiProgress`] that all spinners must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
