//! Emulation speed accounting
//!
//! The console feeds master clock ticks and completed frames into a
//! [`Collector`]; the host samples it between frames to display how fast
//! the emulation is running relative to real hardware.

use std::time::Duration;
use std::time::Instant;

use log::debug;

/// Rates measured over one collection window
#[derive(Debug)]
pub struct Metrics {
    pub recorded_time: Duration,
    pub master_clock_hz: u64,
    pub frames_per_second: u64,
}

/// Accumulates master clock ticks and finished frames, folding them into
/// rates on [`Collector::collect`]
pub struct Collector {
    window_start: Instant,
    master_clocks: u64,
    frames_completed: u64,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            master_clocks: 0,
            frames_completed: 0,
        }
    }

    pub fn observe_system_clocks(&mut self, clocks: u64) {
        self.master_clocks += clocks;
    }

    pub fn observe_frame_ready(&mut self) {
        self.frames_completed += 1;
    }

    /// Fold the counters observed since the last collection into rates
    /// and start a new window
    pub fn collect(&mut self) -> Metrics {
        let recorded_time = self.window_start.elapsed();
        // a sub-microsecond window would divide by zero
        let elapsed_micros = recorded_time.as_micros().max(1);

        let master_clock_hz =
            ((self.master_clocks as u128) * 1_000_000 / elapsed_micros) as u64;
        let frames_per_second =
            ((self.frames_completed as u128) * 1_000_000 / elapsed_micros) as u64;

        let metrics = Metrics {
            recorded_time,
            master_clock_hz,
            frames_per_second,
        };
        debug!("Metrics: {metrics:?}");

        self.window_start = Instant::now();
        self.master_clocks = 0;
        self.frames_completed = 0;

        metrics
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_folds_counters_and_resets() {
        let mut collector = Collector::new();
        collector.observe_system_clocks(89_001);
        collector.observe_frame_ready();

        let metrics = collector.collect();
        assert!(metrics.master_clock_hz > 0);
        assert!(metrics.frames_per_second > 0);

        assert_eq!(collector.master_clocks, 0);
        assert_eq!(collector.frames_completed, 0);
    }

    #[test]
    fn test_back_to_back_collections_do_not_panic() {
        let mut collector = Collector::new();

        // the second window can be shorter than a microsecond
        collector.collect();
        let metrics = collector.collect();

        assert_eq!(metrics.master_clock_hz, 0);
        assert_eq!(metrics.frames_per_second, 0);
    }

    #[test]
    fn test_observations_accumulate_within_a_window() {
        let mut collector = Collector::new();
        collector.observe_system_clocks(100);
        collector.observe_system_clocks(50);
        collector.observe_frame_ready();
        collector.observe_frame_ready();

        assert_eq!(collector.master_clocks, 150);
        assert_eq!(collector.frames_completed, 2);
    }
}
