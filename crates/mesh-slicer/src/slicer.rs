//! The slicing pipeline.
//!
//! For every planned height: intersect the nearby triangles, deduplicate
//! the line soup, reconstruct paths, bridge open chains and nest the
//! resulting polygons. Heights are grouped by bucket. Each bucket can be
//! processed on its own thread, and every plane gets a fresh
//! [`PointCache`], so nothing mutable is shared between workers.
//!
//! # Example
//!
//! ```
//! use mesh_slicer::{SliceParams, Triangle, TriangleSoup, slice_soup};
//! use nalgebra::Point3;
//!
//! // A tetrahedron standing on the XY plane.
//! let a = Point3::new(0.0, 0.0, 0.0);
//! let b = Point3::new(10.0, 0.0, 0.0);
//! let c = Point3::new(0.0, 10.0, 0.0);
//! let d = Point3::new(0.0, 0.0, 10.0);
//! let soup = TriangleSoup::from_triangles([
//!     Triangle::new(a, c, b),
//!     Triangle::new(a, b, d),
//!     Triangle::new(b, c, d),
//!     Triangle::new(c, a, d),
//! ])
//! .unwrap();
//!
//! let stack = slice_soup(&soup, &SliceParams::for_fdm(1.0)).unwrap();
//! assert_eq!(stack.len(), 10);
//! assert!(stack.iter().all(|s| s.tops.len() == 1));
//! ```

use rayon::prelude::*;
use tracing::{debug, info};

use crate::bridge::bridge_chains;
use crate::bucket::{Bucket, bucketize};
use crate::canon::PointCache;
use crate::dedup::dedup_lines;
use crate::error::{SliceError, SliceResult};
use crate::heights::{PlannedZ, ZFeatures, plan_heights};
use crate::intersect::intersect_plane;
use crate::nest::nest_polygons;
use crate::params::SliceParams;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::reconstruct::reconstruct_paths;
use crate::slice::{Slice, SliceDiagnostics, SliceStack};
use crate::tracing_ext::{OperationTimer, log_perf_section, log_slice_stats, log_stack_summary};
use crate::types::TriangleSoup;

/// A validated configuration ready to slice any number of soups.
#[derive(Debug, Clone)]
pub struct Slicer {
    params: SliceParams,
}

impl Slicer {
    /// Validate `params` and build a slicer.
    pub fn new(params: SliceParams) -> SliceResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SliceParams {
        &self.params
    }

    /// Slice a soup. See [`slice_soup`].
    pub fn slice(&self, soup: &TriangleSoup) -> SliceResult<SliceStack> {
        slice_soup(soup, &self.params)
    }

    /// Slice a soup with progress reporting. See [`slice_soup_with_progress`].
    pub fn slice_with_progress(
        &self,
        soup: &TriangleSoup,
        callback: Option<&ProgressCallback>,
    ) -> SliceResult<SliceStack> {
        slice_soup_with_progress(soup, &self.params, callback)
    }

    /// Cut a single plane. See [`slice_at`].
    pub fn slice_at(&self, soup: &TriangleSoup, z: f64) -> SliceResult<Slice> {
        slice_at(soup, z, &self.params)
    }
}

/// Slice a triangle soup into a stack of cross-sections.
///
/// An empty soup, or one with no Z extent, produces an empty stack.
///
/// # Errors
///
/// Returns [`SliceError::InvalidZRange`] when the effective range is empty
/// or inverted, and [`SliceError::InvalidParameter`] for bad parameters.
pub fn slice_soup(soup: &TriangleSoup, params: &SliceParams) -> SliceResult<SliceStack> {
    slice_soup_with_progress(soup, params, None)
}

/// Slice a triangle soup, reporting progress after bucketing and as
/// planes complete.
pub fn slice_soup_with_progress(
    soup: &TriangleSoup,
    params: &SliceParams,
    callback: Option<&ProgressCallback>,
) -> SliceResult<SliceStack> {
    params.validate()?;
    let timer = OperationTimer::with_context("slice_soup", soup.triangle_count());
    let _entered = timer.span().enter();

    let Some(features) = ZFeatures::from_soup(soup) else {
        debug!(target: "mesh_slicer::slice", "Empty soup, nothing to slice");
        return Ok(SliceStack::default());
    };
    if !(features.span() > 0.0) {
        debug!(
            target: "mesh_slicer::slice",
            z = features.z_min,
            "Soup has no Z extent, nothing to slice"
        );
        return Ok(SliceStack::default());
    }

    let z_min = params.z_min.unwrap_or(features.z_min);
    let z_max = params.z_max.unwrap_or(features.z_max);
    if !(z_min < z_max) {
        return Err(SliceError::invalid_z_range(z_min, z_max));
    }

    let heights = plan_heights(&features, z_min, z_max, params);
    timer.record_planes(heights.len());
    let buckets = bucketize(soup, &features, &heights, params);
    info!(
        target: "mesh_slicer::slice",
        triangles = soup.triangle_count(),
        planes = heights.len(),
        buckets = buckets.len(),
        z_min,
        z_max,
        "Slicing soup"
    );

    let tracker = ProgressTracker::new(heights.len() as u64 + 1);
    tracker.increment();
    tracker.force_callback(callback, "bucketing");

    let run = |bucket: &Bucket| -> Vec<Slice> {
        bucket
            .heights
            .iter()
            .map(|planned| {
                let slice = slice_plane(soup, &bucket.triangles, planned, params);
                tracker.increment();
                tracker.maybe_callback(callback, "slicing");
                slice
            })
            .collect()
    };

    let per_bucket: Vec<Vec<Slice>> = if params.parallel && buckets.len() > 1 {
        buckets.par_iter().map(run).collect()
    } else {
        buckets.iter().map(run).collect()
    };

    let slices: Vec<Slice> = per_bucket
        .into_iter()
        .flatten()
        .filter(|s| params.keep_empty || !s.is_empty())
        .collect();
    let stack = SliceStack::from_slices(slices);

    log_stack_summary(&stack);
    Ok(stack)
}

/// Cut the whole soup with a single plane at exactly `z`.
///
/// No flat avoidance is applied and the slice is unlinked.
pub fn slice_at(soup: &TriangleSoup, z: f64, params: &SliceParams) -> SliceResult<Slice> {
    params.validate()?;
    if !z.is_finite() {
        return Err(SliceError::invalid_parameter("z", z, "must be finite"));
    }
    let all: Vec<usize> = (0..soup.triangle_count()).collect();
    let planned = PlannedZ {
        z,
        height: 0.0,
        on_flat: false,
        on_line: false,
    };
    Ok(slice_plane(soup, &all, &planned, params))
}

/// Cut every height assigned to a bucket.
///
/// This is the unit of work for an external worker pool. Slices come back
/// unlinked; pass the merged results through [`SliceStack::from_slices`].
pub fn slice_bucket(soup: &TriangleSoup, bucket: &Bucket, params: &SliceParams) -> Vec<Slice> {
    bucket
        .heights
        .iter()
        .map(|planned| slice_plane(soup, &bucket.triangles, planned, params))
        .collect()
}

/// Run the full per-plane pipeline on the given triangles.
pub fn slice_plane(
    soup: &TriangleSoup,
    triangles: &[usize],
    planned: &PlannedZ,
    params: &SliceParams,
) -> Slice {
    let _perf = log_perf_section("slice_plane");
    let z = planned.z;
    let mut slice = Slice::new(z, planned.height);
    slice.on_flat = planned.on_flat;
    slice.on_line = planned.on_line;

    let mut cache = PointCache::with_capacity(triangles.len());
    let raw = intersect_plane(
        soup,
        triangles.iter().copied(),
        z,
        params,
        &mut cache,
        &mut slice.issues,
    );
    let raw_lines = raw.len();
    let lines = dedup_lines(raw, &cache, params.collinear_tolerance);

    let reconstruction = reconstruct_paths(&lines, &cache, z, params);
    slice.issues.extend(reconstruction.issues);
    let closed_paths = reconstruction.closed.len();
    let open_chains = reconstruction.open.len();

    let bridged = bridge_chains(reconstruction.open, z, params);
    slice.issues.extend(bridged.issues);

    let mut polygons = reconstruction.closed;
    polygons.extend(bridged.closed);
    polygons.extend(bridged.open);
    slice.tops = nest_polygons(polygons, params);

    slice.diagnostics = SliceDiagnostics {
        triangles: triangles.len(),
        raw_lines,
        lines: lines.len(),
        closed_paths,
        open_chains,
        bridge_merges: bridged.merges,
    };
    if params.retain_lines {
        slice.lines = Some(
            lines
                .iter()
                .map(|l| [cache.point(l.a), cache.point(l.b)])
                .collect(),
        );
    }

    log_slice_stats(&slice);
    slice
}
