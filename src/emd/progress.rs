use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// A struct to track and log progress of a long-running sweep.
/// Ticks are atomic so every worker reports through the same counter.
pub struct Progress {
    total: usize,
    check: usize,
    ticks: AtomicUsize,
    begin: Instant,
}

impl Progress {
    /// report roughly n times over total ticks
    pub fn new(total: usize, n: usize) -> Self {
        let check = (total / n).max(1);
        Self {
            total,
            check,
            ticks: AtomicUsize::new(0),
            begin: Instant::now(),
        }
    }

    pub fn tick(&self) {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if ticks % self.check == 0 {
            let total_t = self.begin.elapsed();
            log::info!(
                "progress: {:8.0?} {:>10} {:6.2}%   mean {:6.0}/s",
                total_t,
                ticks,
                ticks as f64 / self.total as f64 * 100f64,
                ticks as f64 / total_t.as_secs_f64(),
            );
        }
    }
}
