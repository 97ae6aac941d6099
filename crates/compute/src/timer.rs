//! Lap timer for benchmark loops.

use std::time::{Duration, Instant};

/// Monotonic stopwatch that records laps.
///
/// `next_lap` closes the current lap and starts a new one, so a benchmark
/// loop calls it once per iteration; `restart` discards time spent since
/// the last lap (for example a host-to-device upload).
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    laps: Vec<Duration>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            laps: Vec::new(),
        }
    }

    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn next_lap(&mut self) -> Duration {
        let lap = self.start.elapsed();
        self.laps.push(lap);
        self.start = Instant::now();
        lap
    }

    pub fn laps(&self) -> &[Duration] {
        &self.laps
    }

    /// Mean lap time in seconds (0 with no laps).
    pub fn lap_avg(&self) -> f64 {
        if self.laps.is_empty() {
            return 0.0;
        }
        self.laps.iter().map(Duration::as_secs_f64).sum::<f64>() / self.laps.len() as f64
    }

    /// Population standard deviation of lap times in seconds.
    pub fn lap_std(&self) -> f64 {
        if self.laps.is_empty() {
            return 0.0;
        }
        let avg = self.lap_avg();
        let var = self
            .laps
            .iter()
            .map(|lap| {
                let d = lap.as_secs_f64() - avg;
                d * d
            })
            .sum::<f64>()
            / self.laps.len() as f64;
        var.sqrt()
    }
}
