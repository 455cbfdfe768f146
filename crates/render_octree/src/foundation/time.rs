//! Time measurement utilities

use std::time::{Duration, Instant};

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }
    
    /// Create a stopwatch that is already running
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }
    
    /// Start or resume the stopwatch
    pub fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }
    
    /// Stop the stopwatch, accumulating the running interval
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }
    
    /// Reset to zero and stop
    pub fn reset(&mut self) {
        self.start_time = None;
        self.elapsed = Duration::ZERO;
    }
    
    /// Check if the stopwatch is running
    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }
    
    /// Get the total elapsed time
    pub fn elapsed(&self) -> Duration {
        match self.start_time {
            Some(start) => self.elapsed + start.elapsed(),
            None => self.elapsed,
        }
    }
    
    /// Get elapsed time in whole microseconds
    pub fn elapsed_us(&self) -> u64 {
        u64::try_from(self.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
