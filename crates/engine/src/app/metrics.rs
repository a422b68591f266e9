use std::time::{Duration, Instant};

/// Throughput over one logging window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    pub tick_time_ms: f32,
    pub simulated_seconds: f64,
}

/// Whole-run tick cost, returned with the loop report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSummary {
    pub windows: u32,
    pub mean_tick_time_ms: f32,
    pub peak_tick_time_ms: f32,
    /// Most recent closed window; `None` when the run ended inside the first.
    pub last_window: Option<LoopMetricsSnapshot>,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    window_start: Instant,
    interval: Duration,
    window_ticks: u32,
    window_tick_time: Duration,
    run_ticks: u64,
    run_tick_time: Duration,
    peak_tick_time: Duration,
    simulated_seconds: f64,
    windows: u32,
    last_window: Option<LoopMetricsSnapshot>,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    fn starting_at(window_start: Instant, interval: Duration) -> Self {
        Self {
            window_start,
            interval,
            window_ticks: 0,
            window_tick_time: Duration::ZERO,
            run_ticks: 0,
            run_tick_time: Duration::ZERO,
            peak_tick_time: Duration::ZERO,
            simulated_seconds: 0.0,
            windows: 0,
            last_window: None,
        }
    }

    pub(crate) fn record_tick(&mut self, tick_cost: Duration, dt_seconds: f32) {
        self.window_ticks = self.window_ticks.saturating_add(1);
        self.window_tick_time = self.window_tick_time.saturating_add(tick_cost);
        self.run_ticks = self.run_ticks.saturating_add(1);
        self.run_tick_time = self.run_tick_time.saturating_add(tick_cost);
        self.peak_tick_time = self.peak_tick_time.max(tick_cost);
        self.simulated_seconds += f64::from(dt_seconds);
    }

    /// Closes the current window once `interval` has elapsed.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = LoopMetricsSnapshot {
            tps: self.window_ticks as f32 / elapsed_seconds,
            tick_time_ms: mean_ms(self.window_tick_time, self.window_ticks as u64),
            simulated_seconds: self.simulated_seconds,
        };

        self.window_start = now;
        self.window_ticks = 0;
        self.window_tick_time = Duration::ZERO;
        self.windows = self.windows.saturating_add(1);
        self.last_window = Some(snapshot);

        Some(snapshot)
    }

    pub(crate) fn summary(&self) -> LoopMetricsSummary {
        LoopMetricsSummary {
            windows: self.windows,
            mean_tick_time_ms: mean_ms(self.run_tick_time, self.run_ticks),
            peak_tick_time_ms: self.peak_tick_time.as_secs_f32() * 1000.0,
            last_window: self.last_window,
        }
    }
}

fn mean_ms(total: Duration, ticks: u64) -> f32 {
    if ticks == 0 {
        0.0
    } else {
        (total.as_secs_f64() / ticks as f64 * 1000.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));

        for _ in 0..4 {
            accumulator.record_tick(Duration::from_millis(2), 0.5);
        }

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.tick_time_ms - 2.0).abs() < 0.001);
        assert!((snapshot.simulated_seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn simulated_seconds_keep_accumulating_across_windows() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::ZERO, 1.0);
        let _ = accumulator.maybe_snapshot(base + Duration::from_secs(1));
        accumulator.record_tick(Duration::ZERO, 1.0);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(3))
            .expect("snapshot");
        assert!((snapshot.simulated_seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::from_millis(1), 1.0 / 60.0);

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
        assert_eq!(accumulator.summary().windows, 0);
        assert_eq!(accumulator.summary().last_window, None);
    }

    #[test]
    fn summary_spans_every_window_and_keeps_the_peak() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::from_millis(1), 0.5);
        accumulator.record_tick(Duration::from_millis(3), 0.5);
        let first = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("first window");
        accumulator.record_tick(Duration::from_millis(8), 0.5);
        accumulator.record_tick(Duration::from_millis(4), 0.5);

        let summary = accumulator.summary();
        assert_eq!(summary.windows, 1);
        assert_eq!(summary.last_window, Some(first));
        assert!((summary.mean_tick_time_ms - 4.0).abs() < 0.001);
        assert!((summary.peak_tick_time_ms - 8.0).abs() < 0.001);

        let second = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second window");
        assert!((second.tick_time_ms - 6.0).abs() < 0.001);
        assert_eq!(accumulator.summary().windows, 2);
        assert_eq!(accumulator.summary().last_window, Some(second));
    }
}
