//! Tracing extensions for slicing operations.
//!
//! Structured logging and timing built on the `tracing` ecosystem. The
//! library never installs a subscriber. Applications do, for example:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//!
//! // RUST_LOG=mesh_slicer=debug for per-stage output
//! ```
//!
//! # Targets
//!
//! - `mesh_slicer::timing`: operation start and elapsed time
//! - `mesh_slicer::slice`: per-plane events, including recovered anomalies
//! - `mesh_slicer::progress`: progress callbacks
//! - `mesh_slicer::perf`: fine-grained section timings at TRACE

use std::time::Instant;
use tracing::{Span, debug, info, trace, warn};

use crate::slice::{Slice, SliceStack};

/// A performance timer that logs duration on drop.
///
/// # Example
///
/// ```rust,ignore
/// use mesh_slicer::tracing_ext::OperationTimer;
///
/// fn expensive_operation(triangles: usize) {
///     let _timer = OperationTimer::with_context("expensive_operation", triangles);
///     // ... do work ...
/// } // Timer logs duration when dropped
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Create a timer with the input size attached.
    ///
    /// The plane count is not known until heights are planned; fill it in
    /// with [`OperationTimer::record_planes`].
    pub fn with_context(name: &'static str, triangle_count: usize) -> Self {
        let span = tracing::info_span!(
            "slice_operation",
            operation = name,
            triangles = triangle_count,
            planes = tracing::field::Empty
        );
        debug!(
            target: "mesh_slicer::timing",
            operation = name,
            triangles = triangle_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Attach the number of planned heights to the timer's span.
    pub fn record_planes(&self, plane_count: usize) {
        self.span.record("planes", plane_count);
    }

    /// Get the elapsed time.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Get the span for this timer.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();
        info!(
            target: "mesh_slicer::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed_ms),
            "Operation completed"
        );
    }
}

/// Log what one plane produced, at trace level.
pub fn log_slice_stats(slice: &Slice) {
    let d = &slice.diagnostics;
    trace!(
        target: "mesh_slicer::slice",
        z = format!("{:.4}", slice.z),
        triangles = d.triangles,
        raw_lines = d.raw_lines,
        lines = d.lines,
        closed = d.closed_paths,
        open_chains = d.open_chains,
        bridged = d.bridge_merges,
        tops = slice.tops.len(),
        "Slice built"
    );
}

/// Log a summary of a finished stack.
pub fn log_stack_summary(stack: &SliceStack) {
    let Some(stats) = stack.stats() else {
        debug!(target: "mesh_slicer::slice", "No slices produced");
        return;
    };

    info!(
        target: "mesh_slicer::slice",
        slices = stats.slice_count,
        empty = stats.empty_slices,
        max_area = format!("{:.4}", stats.max_area),
        max_islands = stats.max_islands,
        "Slicing summary"
    );
    if stats.open_polygons > 0 || stats.issues > 0 {
        warn!(
            target: "mesh_slicer::slice",
            open_polygons = stats.open_polygons,
            issues = stats.issues,
            "Slices contain recovered anomalies"
        );
    }
}

/// Log a performance-critical section.
///
/// Returns a guard that logs when dropped.
#[must_use]
pub fn log_perf_section(name: &'static str) -> impl Drop {
    struct PerfGuard {
        name: &'static str,
        start: Instant,
    }
    impl Drop for PerfGuard {
        fn drop(&mut self) {
            let elapsed = self.start.elapsed();
            trace!(
                target: "mesh_slicer::perf",
                section = self.name,
                elapsed_us = elapsed.as_micros(),
                "Performance section completed"
            );
        }
    }
    PerfGuard {
        name,
        start: Instant::now(),
    }
}
