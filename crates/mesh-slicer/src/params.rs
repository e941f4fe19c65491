//! Slicing configuration.
//!
//! [`SliceParams`] is the single immutable record threaded through every
//! stage of the pipeline. All tolerances live here; no stage reads global
//! state.
//!
//! # Example
//!
//! ```
//! use mesh_slicer::{NestMode, SliceParams, ZSpec};
//!
//! let params = SliceParams::for_fdm(0.2)
//!     .with_z_range(0.0, 12.0)
//!     .with_nest_mode(NestMode::Deep);
//!
//! assert!(matches!(params.z_spec, ZSpec::Step { .. }));
//! assert!(params.validate().is_ok());
//! ```

use crate::error::{SliceError, SliceResult};

/// How slice heights are chosen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ZSpec {
    /// Fixed layer height, first slice centred in the first layer.
    Step { inc: f64 },
    /// Caller-supplied heights.
    Explicit(Vec<f64>),
    /// Midpoints between the distinct vertex heights of the mesh.
    Auto,
    /// Variable layer heights for FDM. After a fixed first layer, each gap
    /// between distinct vertex heights is split into equal layers no
    /// thicker than `max`. Gaps thinner than `min` are skipped.
    Adaptive { max: f64, min: f64 },
    /// Exactly at every distinct vertex height, never nudged off flats.
    Features,
}

impl Default for ZSpec {
    fn default() -> Self {
        ZSpec::Step { inc: 0.2 }
    }
}

/// Which side of the plane a triangle's third vertex must be on for its
/// on-plane edge to be emitted.
///
/// Two triangles share every on-plane edge. Emitting the edge from only one
/// of them keeps the line soup free of ambiguous duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CoplanarEdgePolicy {
    /// Emit when the third vertex is below the plane (top-down slicing).
    #[default]
    Under,
    /// Emit when the third vertex is above the plane (bottom-up slicing).
    Over,
    /// Emit from both sides and let deduplication keep one.
    Both,
}

/// Nesting output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NestMode {
    /// Even depths are tops holding their odd-depth holes; islands inside
    /// holes become tops of their own.
    #[default]
    Flat,
    /// Depth-0 polygons are tops and the full containment tree is kept.
    Deep,
}

/// Rotation sense of a closed polygon in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Winding {
    Clockwise,
    #[default]
    CounterClockwise,
}

impl Winding {
    /// The opposite rotation sense.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Winding::Clockwise => Winding::CounterClockwise,
            Winding::CounterClockwise => Winding::Clockwise,
        }
    }
}

/// Parameters for slicing operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SliceParams {
    /// Lower bound of the sliced range. Defaults to the mesh minimum.
    pub z_min: Option<f64>,

    /// Upper bound of the sliced range. Defaults to the mesh maximum.
    pub z_max: Option<f64>,

    /// How slice heights are chosen.
    pub z_spec: ZSpec,

    /// Thickness of the first layer in step mode.
    pub first_layer_height: Option<f64>,

    /// Heights closer than this to the previous kept height are merged.
    pub min_step: f64,

    /// Vertices within this distance of the plane count as on it.
    pub precision_slice_z: f64,

    /// Grid used to snap line endpoints before path reconstruction.
    pub join_precision: f64,

    /// Cross-product threshold below which two lines are collinear.
    pub collinear_tolerance: f64,

    /// Distance below which polygon points are merged during cleaning.
    pub clean_tolerance: f64,

    /// Slack allowed on containment tests when nesting.
    pub nest_tolerance: f64,

    /// Which triangle emits a shared on-plane edge.
    pub coplanar_edge_policy: CoplanarEdgePolicy,

    /// Initial gap tolerance when bridging open chains.
    pub bridge_gap: f64,

    /// Gaps wider than this are never bridged.
    pub bridge_gap_max: f64,

    /// A merged chain whose ends are this close is closed.
    pub bridge_close: f64,

    /// Maximum number of tolerance escalations per slice.
    pub max_bridge_iterations: usize,

    /// Candidate path ceiling for one reconstruction search.
    pub max_paths: usize,

    /// Nesting output shape.
    pub nest_mode: NestMode,

    /// Open polygons may not acquire children.
    pub open_tops: bool,

    /// Winding of top polygons. Holes get the opposite.
    pub top_winding: Winding,

    /// Upper bound on the bucket count.
    pub bucket_max: usize,

    /// Fall back to one bucket if any bucket holds more than this share of
    /// all triangles.
    pub bucket_overflow_ratio: f64,

    /// Skip bucketing entirely.
    pub single_bucket: bool,

    /// Expected number of workers. Raises the bucket count so there is
    /// enough work to share.
    pub concurrency: Option<usize>,

    /// Slice buckets on the rayon thread pool.
    pub parallel: bool,

    /// Nudge heights that land exactly on a flat face or horizontal edge.
    pub avoid_flats: bool,

    /// Distance a height is moved up by flat avoidance.
    pub flat_offset: f64,

    /// Keep slices that produced no polygons.
    pub keep_empty: bool,

    /// Keep the deduplicated line soup on each slice for inspection.
    pub retain_lines: bool,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            z_min: None,
            z_max: None,
            z_spec: ZSpec::default(),
            first_layer_height: None,
            min_step: 0.0,
            precision_slice_z: 1e-4,
            join_precision: 1e-5,
            collinear_tolerance: 1e-4,
            clean_tolerance: 1e-4,
            nest_tolerance: 1e-4,
            coplanar_edge_policy: CoplanarEdgePolicy::Under,
            bridge_gap: 0.01,
            bridge_gap_max: 0.5,
            bridge_close: 0.1,
            max_bridge_iterations: 32,
            max_paths: 10_000,
            nest_mode: NestMode::Flat,
            open_tops: true,
            top_winding: Winding::CounterClockwise,
            bucket_max: 100,
            bucket_overflow_ratio: 0.75,
            single_bucket: false,
            concurrency: None,
            parallel: true,
            avoid_flats: true,
            flat_offset: 0.001,
            keep_empty: true,
            retain_lines: false,
        }
    }
}

impl SliceParams {
    /// Fixed layer height slicing for FDM printing.
    pub fn for_fdm(layer_height: f64) -> Self {
        Self {
            z_spec: ZSpec::Step { inc: layer_height },
            ..Default::default()
        }
    }

    /// Slices at every distinct feature height, for laser cutting of
    /// stacked sheets.
    pub fn for_laser() -> Self {
        Self {
            z_spec: ZSpec::Auto,
            ..Default::default()
        }
    }

    /// Top-down slicing with the full containment tree, for CAM roughing.
    pub fn for_cam(step: f64) -> Self {
        Self {
            z_spec: ZSpec::Step { inc: step },
            coplanar_edge_policy: CoplanarEdgePolicy::Under,
            nest_mode: NestMode::Deep,
            ..Default::default()
        }
    }

    /// Variable layer heights between `min` and `max` for FDM printing.
    pub fn for_adaptive_fdm(max: f64, min: f64) -> Self {
        Self {
            z_spec: ZSpec::Adaptive { max, min },
            ..Default::default()
        }
    }

    /// Slice at the given heights only.
    pub fn at_heights(heights: impl Into<Vec<f64>>) -> Self {
        Self {
            z_spec: ZSpec::Explicit(heights.into()),
            ..Default::default()
        }
    }

    pub fn with_z_range(mut self, z_min: f64, z_max: f64) -> Self {
        self.z_min = Some(z_min);
        self.z_max = Some(z_max);
        self
    }

    pub fn with_z_spec(mut self, z_spec: ZSpec) -> Self {
        self.z_spec = z_spec;
        self
    }

    pub fn with_first_layer_height(mut self, height: f64) -> Self {
        self.first_layer_height = Some(height);
        self
    }

    pub fn with_min_step(mut self, min_step: f64) -> Self {
        self.min_step = min_step;
        self
    }

    pub fn with_coplanar_edge_policy(mut self, policy: CoplanarEdgePolicy) -> Self {
        self.coplanar_edge_policy = policy;
        self
    }

    /// Set the initial and maximum bridging gap.
    pub fn with_bridge_gap(mut self, gap: f64, gap_max: f64) -> Self {
        self.bridge_gap = gap;
        self.bridge_gap_max = gap_max;
        self
    }

    pub fn with_nest_mode(mut self, mode: NestMode) -> Self {
        self.nest_mode = mode;
        self
    }

    pub fn with_top_winding(mut self, winding: Winding) -> Self {
        self.top_winding = winding;
        self
    }

    pub fn with_single_bucket(mut self, single: bool) -> Self {
        self.single_bucket = single;
        self
    }

    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_keep_empty(mut self, keep: bool) -> Self {
        self.keep_empty = keep;
        self
    }

    pub fn with_retain_lines(mut self, retain: bool) -> Self {
        self.retain_lines = retain;
        self
    }

    /// Check every field for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::InvalidZRange`] for an empty or inverted range
    /// and [`SliceError::InvalidParameter`] for any other bad value.
    pub fn validate(&self) -> SliceResult<()> {
        if let (Some(lo), Some(hi)) = (self.z_min, self.z_max) {
            if !(lo < hi) {
                return Err(SliceError::invalid_z_range(lo, hi));
            }
        }
        for (name, value) in [("z_min", self.z_min), ("z_max", self.z_max)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(SliceError::invalid_parameter(name, v, "must be finite"));
                }
            }
        }

        match &self.z_spec {
            ZSpec::Step { inc } => {
                if !(*inc > 0.0) || !inc.is_finite() {
                    return Err(SliceError::invalid_parameter(
                        "z_spec.inc",
                        *inc,
                        "must be positive",
                    ));
                }
            }
            ZSpec::Explicit(heights) => {
                if let Some(bad) = heights.iter().find(|z| !z.is_finite()) {
                    return Err(SliceError::invalid_parameter(
                        "z_spec.heights",
                        *bad,
                        "must be finite",
                    ));
                }
            }
            ZSpec::Adaptive { max, min } => {
                if !(*min > 0.0) || !min.is_finite() {
                    return Err(SliceError::invalid_parameter(
                        "z_spec.min",
                        *min,
                        "must be positive",
                    ));
                }
                if !(*max >= *min) || !max.is_finite() {
                    return Err(SliceError::invalid_parameter(
                        "z_spec.max",
                        *max,
                        "must be finite and not below z_spec.min",
                    ));
                }
            }
            ZSpec::Auto | ZSpec::Features => {}
        }

        if let Some(first) = self.first_layer_height {
            if !(first > 0.0) {
                return Err(SliceError::invalid_parameter(
                    "first_layer_height",
                    first,
                    "must be positive",
                ));
            }
        }

        let non_negative = [
            ("min_step", self.min_step),
            ("precision_slice_z", self.precision_slice_z),
            ("collinear_tolerance", self.collinear_tolerance),
            ("clean_tolerance", self.clean_tolerance),
            ("nest_tolerance", self.nest_tolerance),
            ("bridge_gap", self.bridge_gap),
            ("bridge_close", self.bridge_close),
            ("flat_offset", self.flat_offset),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(SliceError::invalid_parameter(
                    name,
                    value,
                    "must be finite and not negative",
                ));
            }
        }

        if !(self.join_precision > 0.0) || !self.join_precision.is_finite() {
            return Err(SliceError::invalid_parameter(
                "join_precision",
                self.join_precision,
                "must be positive",
            ));
        }
        if !(self.bridge_gap_max >= self.bridge_gap) {
            return Err(SliceError::invalid_parameter(
                "bridge_gap_max",
                self.bridge_gap_max,
                "must not be below bridge_gap",
            ));
        }
        if self.max_paths == 0 {
            return Err(SliceError::invalid_parameter(
                "max_paths",
                0.0,
                "must be at least 1",
            ));
        }
        if self.bucket_max == 0 {
            return Err(SliceError::invalid_parameter(
                "bucket_max",
                0.0,
                "must be at least 1",
            ));
        }
        if !(self.bucket_overflow_ratio > 0.0 && self.bucket_overflow_ratio <= 1.0) {
            return Err(SliceError::invalid_parameter(
                "bucket_overflow_ratio",
                self.bucket_overflow_ratio,
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Load parameters from a JSON string. Missing fields take defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize to JSON string.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
