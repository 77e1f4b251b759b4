//! Progress and status reporting.
//!
//! Sweeps report through a [`ProgressSink`]. The default sink, [`Updater`],
//! writes `tracing` events and optionally forwards them to a UI callback.
//! Reports are throttled to one per interval; phase boundaries (reset), 0 %,
//! 100 % and indeterminate updates always go through.

use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Default minimum time between two progress reports
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// UI hook receiving `(status, percent, reset)`; `percent` is `None` for
/// informational updates.
pub type StatusCallback = Box<dyn Fn(&str, Option<f64>, bool) + Send + Sync>;

/// Receiver of sweep status updates
pub trait ProgressSink: Send {
    /// Report progress at `position` out of `total` steps. A `None` position
    /// is an indeterminate update; `reset` starts a fresh status line.
    fn update_progress(&mut self, position: Option<usize>, total: usize, status: &str, reset: bool);

    /// Report a one-off status line
    fn update_info(&mut self, status: &str);

    fn update_debug(&mut self, message: &str) {
        debug!("{message}");
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn update_progress(&mut self, position: Option<usize>, total: usize, status: &str, reset: bool) {
        (**self).update_progress(position, total, status, reset);
    }

    fn update_info(&mut self, status: &str) {
        (**self).update_info(status);
    }

    fn update_debug(&mut self, message: &str) {
        (**self).update_debug(message);
    }
}

/// Percentage of completion for `position` out of `total` steps.
///
/// The last position (`total - 1`) maps to 100 %.
pub fn progress_percent(position: Option<usize>, total: usize) -> f64 {
    match position {
        None => 0.0,
        Some(position) if total > 1 => position as f64 / (total - 1) as f64 * 100.0,
        Some(position) if total == 1 => position as f64 * 100.0,
        Some(_) => 0.0,
    }
}

/// Progress line of one worker: elapsed time, then the percentage shifted
/// right by the worker index so concurrent workers form columns.
pub fn format_parallel_line(elapsed: Duration, index: usize, percent: f64) -> String {
    let seconds = elapsed.as_secs_f64();
    let pad = if seconds < 100.0 { "\t" } else { "" };
    format!(
        "{seconds:.3}s\t{pad}{}{percent:.2}%",
        "\t\t".repeat(index)
    )
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Serial,
    Parallel { index: usize, started: Instant },
}

/// Throttled [`ProgressSink`] backed by `tracing`.
///
/// In serial mode every report is logged and forwarded to the callback. In
/// parallel mode only progress lines are logged, prefixed with the worker's
/// elapsed time; info and debug lines are dropped.
pub struct Updater {
    mode: Mode,
    callback: Option<StatusCallback>,
    last_report: Option<Instant>,
    min_interval: Duration,
}

impl Default for Updater {
    fn default() -> Self {
        Self::new()
    }
}

impl Updater {
    /// Serial updater without callback
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::Serial,
            callback: None,
            last_report: None,
            min_interval: REPORT_INTERVAL,
        }
    }

    /// Serial updater forwarding to a UI callback
    #[must_use]
    pub fn with_callback(callback: StatusCallback) -> Self {
        Self {
            callback: Some(callback),
            ..Self::new()
        }
    }

    /// Updater for worker `index` of a parallel run started at `started`
    #[must_use]
    pub fn parallel(index: usize, started: Instant) -> Self {
        Self {
            mode: Mode::Parallel { index, started },
            ..Self::new()
        }
    }

    #[must_use]
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.mode, Mode::Parallel { .. })
    }

    fn notify(&self, status: &str, percent: Option<f64>, reset: bool) {
        if let Some(callback) = &self.callback {
            callback(status, percent, reset);
        }
    }
}

impl ProgressSink for Updater {
    fn update_progress(&mut self, position: Option<usize>, total: usize, status: &str, reset: bool) {
        let percent = progress_percent(position, total);
        let now = Instant::now();

        let due = self
            .last_report
            .is_none_or(|last| now.duration_since(last) > self.min_interval);
        let forced = reset || position.is_none() || percent == 0.0 || percent >= 100.0;
        if !due && !forced {
            return;
        }

        match self.mode {
            Mode::Parallel { index, started } => {
                if !reset {
                    info!("{}", format_parallel_line(now.duration_since(started), index, percent));
                }
            }
            Mode::Serial => {
                match position {
                    Some(_) => info!("{status}: Progress = {percent:.2}%"),
                    None => info!("{status}"),
                }
                self.notify(status, position.map(|_| percent), reset);
            }
        }
        self.last_report = Some(now);
    }

    fn update_info(&mut self, status: &str) {
        if let Mode::Serial = self.mode {
            info!("{status}");
            self.notify(status, None, true);
        }
    }

    fn update_debug(&mut self, message: &str) {
        if let Mode::Serial = self.mode {
            debug!("{message}");
        }
    }
}
