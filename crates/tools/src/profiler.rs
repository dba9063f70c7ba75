use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling window of tick durations.
#[derive(Debug)]
pub struct TickProfiler {
    samples: VecDeque<Duration>,
    window: usize,
    total_ticks: u64,
}

impl TickProfiler {
    /// Keep at most `window` samples. A window of zero is treated as one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            total_ticks: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed);
        self.total_ticks += 1;
    }

    /// Run `f`, record how long it took, and pass its result through.
    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(start.elapsed());
        out
    }

    /// Samples currently in the window.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Every tick ever recorded, including those evicted from the window.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().min().copied().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.total_ticks = 0;
    }
}

impl std::fmt::Display for TickProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} avg={:?} min={:?} max={:?}",
            self.total_ticks,
            self.average(),
            self.min(),
            self.max()
        )
    }
}
