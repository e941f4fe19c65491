//! Progress reporting for slicing runs.
//!
//! A slicing call reports once when bucketing is done and then as planes
//! are cut. Planes may be cut on several threads at once, so progress is
//! counted with atomics and callbacks are rate limited.
//!
//! There is no cancellation: a caller that loses interest simply drops the
//! result.
//!
//! # Example
//!
//! ```
//! use mesh_slicer::progress::{Progress, ProgressCallback};
//!
//! let callback: ProgressCallback = Box::new(|progress: &Progress| {
//!     println!("{}% {}", progress.percent(), progress.message);
//! });
//! # let _ = callback;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Progress information passed to callbacks.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Steps completed.
    pub current: u64,

    /// Total number of steps.
    pub total: u64,

    /// Human-readable message describing the current stage.
    pub message: String,

    /// Elapsed time since operation started.
    pub elapsed: Duration,

    /// Estimated time remaining (if available).
    pub estimated_remaining: Option<Duration>,
}

impl Progress {
    /// Create a new progress report.
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            elapsed: Duration::ZERO,
            estimated_remaining: None,
        }
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).min(1.0)
        }
    }

    /// Get progress as a percentage (0 to 100).
    #[inline]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    /// Check if the operation is complete.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// Callback function for progress reporting.
pub type ProgressCallback = Box<dyn Fn(&Progress) + Send + Sync>;

/// A thread-safe progress tracker for parallel operations.
#[derive(Debug)]
pub struct ProgressTracker {
    current: AtomicU64,
    total: u64,
    start_time: Instant,
    last_callback_time: Mutex<Option<Instant>>,
    callback_interval: Duration,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self::with_interval(total, Duration::from_millis(100))
    }

    /// Create a tracker with custom callback interval.
    pub fn with_interval(total: u64, interval: Duration) -> Self {
        Self {
            current: AtomicU64::new(0),
            total,
            start_time: Instant::now(),
            last_callback_time: Mutex::new(None),
            callback_interval: interval,
        }
    }

    /// Increment progress by one.
    #[inline]
    pub fn increment(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment progress by a specific amount.
    #[inline]
    pub fn increment_by(&self, amount: u64) {
        self.current.fetch_add(amount, Ordering::Relaxed);
    }

    /// Get the current progress value.
    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Get the total count.
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current() as f64 / self.total as f64).min(1.0)
        }
    }

    /// Get elapsed time.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Estimate remaining time based on current progress.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let current = self.current();
        if current == 0 {
            return None;
        }

        let rate = current as f64 / self.elapsed().as_secs_f64();
        if rate > 0.0 && rate.is_finite() {
            let remaining = self.total.saturating_sub(current) as f64 / rate;
            Some(Duration::from_secs_f64(remaining))
        } else {
            None
        }
    }

    /// Create a Progress snapshot.
    pub fn snapshot(&self, message: impl Into<String>) -> Progress {
        Progress {
            current: self.current(),
            total: self.total,
            message: message.into(),
            elapsed: self.elapsed(),
            estimated_remaining: self.estimated_remaining(),
        }
    }

    /// Call the callback if enough time has passed since the last call,
    /// or if the operation just completed.
    pub fn maybe_callback(&self, callback: Option<&ProgressCallback>, message: &str) {
        let Some(callback) = callback else {
            return;
        };

        let now = Instant::now();
        {
            let mut last = self
                .last_callback_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let due = match *last {
                Some(t) => now.duration_since(t) >= self.callback_interval,
                None => true,
            };
            if !due && self.current() < self.total {
                return;
            }
            *last = Some(now);
        }

        self.emit(callback, message);
    }

    /// Call the callback unconditionally, for stage boundaries.
    pub fn force_callback(&self, callback: Option<&ProgressCallback>, message: &str) {
        let Some(callback) = callback else {
            return;
        };
        *self
            .last_callback_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.emit(callback, message);
    }

    fn emit(&self, callback: &ProgressCallback, message: &str) {
        let progress = self.snapshot(message);
        debug!(
            target: "mesh_slicer::progress",
            current = progress.current,
            total = progress.total,
            percent = progress.percent(),
            stage = message,
            "Progress update"
        );
        callback(&progress);
    }
}

/// Arc-wrapped progress tracker for sharing across threads.
pub type SharedProgressTracker = Arc<ProgressTracker>;

/// Create a shared progress tracker.
pub fn shared_tracker(total: u64) -> SharedProgressTracker {
    Arc::new(ProgressTracker::new(total))
}
