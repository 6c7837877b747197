//! Phase reporting on stderr.
//!
//! Each pass of a run is a [`Phase`]: an indicatif bar or spinner while it
//! runs, then one `[phase] summary` line when it ends. With `--log-only` the
//! bars stay hidden and counted phases print `[phase] n/total (pct%)` lines
//! instead, so output can be tailed or piped.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// `42.0s` under a minute, `3m07s` above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = d.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    }
}

/// Phase line on stderr, e.g. `[index] 412 entries extracted`.
pub fn log_phase(phase: &str, message: &str) {
    eprintln!("[{}] {}", phase, message);
}

/// Counter line for log-only output, due every `every` items and at the end.
fn counter_line(phase: &str, current: u64, total: u64, every: u64) -> Option<String> {
    if total == 0 || every == 0 || (current % every != 0 && current != total) {
        return None;
    }
    let pct = 100.0 * current as f64 / total as f64;
    Some(format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct))
}

/// One pass of a run, shown as a bar or spinner and closed with a summary.
pub struct Phase {
    name: &'static str,
    bar: ProgressBar,
    total: u64,
    every: u64,
}

impl Phase {
    /// Phase over `total` items, ticked once per item.
    pub fn counted(name: &'static str, total: u64, label: &str) -> Self {
        let bar = ProgressBar::new(total);
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            let style = ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
        }
        bar.set_message(label.to_string());
        Self {
            name,
            bar,
            total,
            every: (total / 20).max(1),
        }
    }

    /// Phase of unknown length, shown as a spinner.
    pub fn open(name: &'static str, label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            let style = ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        bar.set_message(label.to_string());
        Self {
            name,
            bar,
            total: 0,
            every: 0,
        }
    }

    /// Count one finished item. Safe to call from rayon workers.
    pub fn tick(&self) {
        self.bar.inc(1);
        if is_log_only() {
            if let Some(line) = counter_line(self.name, self.bar.position(), self.total, self.every) {
                eprintln!("{}", line);
            }
        }
    }

    /// Clear the bar and print the phase summary.
    pub fn finish(self, summary: &str) {
        self.bar.finish_and_clear();
        log_phase(self.name, summary);
    }
}
