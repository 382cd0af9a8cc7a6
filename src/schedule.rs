use std::collections::VecDeque;
use std::time::Duration;

use log::info;

use crate::config::SplashConfig;

/// Bounded ring of recent per-frame render costs.
#[derive(Debug, Clone)]
pub struct PerformanceWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
    total: Duration,
}

impl PerformanceWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total: Duration::ZERO,
        }
    }

    pub fn push(&mut self, cost: Duration) {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.total = self.total.saturating_sub(evicted);
            }
        }
        self.samples.push_back(cost);
        self.total = self.total.saturating_add(cost);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).ok().filter(|count| *count > 0)?;
        Some(self.total / count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickTier {
    Fast,
    Slow,
}

/// Picks the next tick interval from the rolling render cost.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    window: PerformanceWindow,
    fast_interval: Duration,
    slow_interval: Duration,
    slow_threshold: Duration,
    min_samples: usize,
    tier: TickTier,
}

impl TickScheduler {
    pub fn new(
        fast_interval: Duration,
        slow_interval: Duration,
        slow_threshold: Duration,
        window: usize,
        min_samples: usize,
    ) -> Self {
        Self {
            window: PerformanceWindow::new(window),
            fast_interval,
            slow_interval,
            slow_threshold,
            min_samples,
            tier: TickTier::Fast,
        }
    }

    pub fn from_config(config: &SplashConfig) -> Self {
        Self::new(
            config.fast_interval(),
            config.slow_interval(),
            config.slow_frame_threshold(),
            config.perf_window,
            config.perf_min_samples,
        )
    }

    pub fn tier(&self) -> TickTier {
        self.tier
    }

    pub fn window(&self) -> &PerformanceWindow {
        &self.window
    }

    pub fn interval(&self) -> Duration {
        match self.tier {
            TickTier::Fast => self.fast_interval,
            TickTier::Slow => self.slow_interval,
        }
    }

    /// Records one frame's cost and returns the interval until the next tick.
    /// The tier only moves once the window holds `min_samples` samples.
    pub fn record(&mut self, cost: Duration) -> Duration {
        self.window.push(cost);
        if self.window.len() < self.min_samples {
            return self.interval();
        }
        let Some(average) = self.window.average() else {
            return self.interval();
        };

        let next = if average > self.slow_threshold {
            TickTier::Slow
        } else {
            TickTier::Fast
        };
        if next != self.tier {
            info!(
                "tick tier {:?} -> {:?} (avg frame cost {:.1}ms)",
                self.tier,
                next,
                average.as_secs_f64() * 1000.0
            );
            self.tier = next;
        }
        self.interval()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{PerformanceWindow, TickScheduler, TickTier};
    use crate::config::SplashConfig;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn window_evicts_oldest_sample() {
        let mut window = PerformanceWindow::new(3);
        assert_eq!(window.average(), None);
        for cost in [10, 20, 30, 60] {
            window.push(ms(cost));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), Some(ms(110) / 3));
    }

    #[test]
    fn all_slow_samples_select_slow_interval() {
        let mut scheduler = TickScheduler::from_config(&SplashConfig::default());
        let mut next = Duration::ZERO;
        for _ in 0..30 {
            next = scheduler.record(ms(80));
        }
        assert_eq!(scheduler.tier(), TickTier::Slow);
        assert_eq!(next, ms(66));
    }

    #[test]
    fn all_fast_samples_select_fast_interval() {
        let mut scheduler = TickScheduler::from_config(&SplashConfig::default());
        let mut next = Duration::ZERO;
        for _ in 0..30 {
            next = scheduler.record(ms(5));
        }
        assert_eq!(scheduler.tier(), TickTier::Fast);
        assert_eq!(next, ms(33));
    }

    #[test]
    fn tier_holds_until_enough_samples() {
        let mut scheduler = TickScheduler::new(ms(33), ms(66), ms(50), 30, 10);
        for _ in 0..9 {
            assert_eq!(scheduler.record(ms(200)), ms(33));
        }
        assert_eq!(scheduler.record(ms(200)), ms(66));
    }

    #[test]
    fn recovers_to_fast_once_window_drains() {
        let mut scheduler = TickScheduler::new(ms(33), ms(66), ms(50), 4, 2);
        for _ in 0..4 {
            scheduler.record(ms(100));
        }
        assert_eq!(scheduler.tier(), TickTier::Slow);
        for _ in 0..4 {
            scheduler.record(ms(1));
        }
        assert_eq!(scheduler.tier(), TickTier::Fast);
    }
}
