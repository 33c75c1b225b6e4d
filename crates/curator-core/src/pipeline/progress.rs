//! Throughput and ETA bookkeeping. Reporting only; never gates an item.

use std::time::{Duration, Instant};

/// Estimated time left, extrapolated from the average time per finished item.
///
/// `None` until at least one item has finished.
pub fn eta(done: usize, total: usize, elapsed: Duration) -> Option<Duration> {
    if done == 0 {
        return None;
    }
    let remaining = total.saturating_sub(done);
    let per_item = elapsed.as_secs_f64() / done as f64;
    Some(Duration::from_secs_f64(per_item * remaining as f64))
}

/// Items per second.
pub fn throughput(done: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        done as f64 / secs
    } else {
        0.0
    }
}

/// Compact human duration: `42s`, `3m 05s`, `1h 02m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Running progress over one category's candidate list.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    total: usize,
    done: usize,
    started: Instant,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            started: Instant::now(),
        }
    }

    pub fn advance(&mut self, items: usize) {
        self.done = (self.done + items).min(self.total);
    }

    pub fn rate(&self) -> f64 {
        throughput(self.done, self.started.elapsed())
    }

    pub fn eta(&self) -> Option<Duration> {
        eta(self.done, self.total, self.started.elapsed())
    }

    /// `"40/100 (3.2/s, ETA 18s)"`
    pub fn status_line(&self) -> String {
        let eta = self
            .eta()
            .map(format_duration)
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "{}/{} ({:.1}/s, ETA {})",
            self.done,
            self.total,
            self.rate(),
            eta
        )
    }
}
