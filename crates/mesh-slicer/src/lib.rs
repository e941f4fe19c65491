//! Triangle soup slicing into nested planar cross-sections.
//!
//! This crate turns an unstructured set of 3D triangles into an ordered stack
//! of horizontal slices, each holding closed polygons with outer/inner nesting.
//! It is the foundation for FDM toolpaths, CAM roughing and contouring, and
//! laser or resin layer generation. The input does not have to be a closed
//! manifold.
//!
//! # Pipeline
//!
//! For each requested height:
//!
//! 1. **Bucketing** ([`bucket`]): only triangles in the height's Z band are examined
//! 2. **Plane intersection** ([`intersect`]): triangles become a line soup
//! 3. **Deduplication** ([`dedup`]): interior and repeated lines are removed, collinear runs merged
//! 4. **Path reconstruction** ([`reconstruct`]): lines are walked into cycles and chains
//! 5. **Bridging** ([`bridge`]): open chains are joined across small gaps
//! 6. **Nesting** ([`nest`]): polygons are arranged into outers and holes with alternating winding
//!
//! Slices are then sorted by Z and linked to their neighbors in a [`SliceStack`].
//!
//! # Units and Tolerances
//!
//! The library is unit-agnostic, though defaults assume millimeters:
//!
//! - Vertices within 1e-4 of a plane count as on it
//! - Points are identified on a 1e-6 grid, and snapped to 1e-5 before paths are walked
//! - Open chains are bridged across gaps from 0.01 up to 0.5
//!
//! All of these live in [`SliceParams`].
//!
//! # Quick Start
//!
//! ```
//! use mesh_slicer::{SliceParams, TriangleSoup, slice_soup};
//! use nalgebra::Point3;
//!
//! // Two triangles of a vertical wall, as a flat point list.
//! let soup = TriangleSoup::from_points(vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(10.0, 0.0, 0.0),
//!     Point3::new(10.0, 0.0, 10.0),
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(10.0, 0.0, 10.0),
//!     Point3::new(0.0, 0.0, 10.0),
//! ])
//! .unwrap();
//!
//! let stack = slice_soup(&soup, &SliceParams::for_fdm(2.0)).unwrap();
//! for slice in &stack {
//!     // A lone wall cannot enclose anything: each slice holds one open polygon.
//!     assert_eq!(slice.open_count(), 1);
//! }
//! ```
//!
//! # Error Handling
//!
//! Only malformed input and bad parameters are errors ([`SliceError`]).
//! Everything that goes wrong while building a single slice is recovered
//! locally: the slice still comes back, with the problem logged and
//! recorded in [`Slice::issues`]. Chains that cannot be closed are kept
//! as polygons with `open` set, never dropped.
//!
//! # Concurrency
//!
//! Buckets share no mutable state. With [`SliceParams::parallel`] set the
//! crate slices them on the rayon pool. [`slice_bucket`] is also public so an
//! external pool can do the same, merging results with
//! [`SliceStack::from_slices`]. Output is identical either way.
//!
//! # Logging
//!
//! Events are emitted with `tracing` under `mesh_slicer::*` targets; see
//! [`tracing_ext`].

mod error;
mod params;
pub mod tracing_ext;
mod types;

#[cfg(test)]
mod edge_cases;

pub mod bridge;
pub mod bucket;
pub mod canon;
pub mod dedup;
pub mod heights;
pub mod intersect;
pub mod nest;
pub mod polygon;
pub mod progress;
pub mod reconstruct;
pub mod slice;
pub mod slicer;

// Re-export core types at crate root
pub use error::{ErrorCode, RecoverySuggestion, SliceError, SliceIssue, SliceResult};
pub use params::{CoplanarEdgePolicy, NestMode, SliceParams, Winding, ZSpec};
pub use types::{Triangle, TriangleSoup};

pub use polygon::{Bounds2, Polygon};
pub use slice::{Slice, SliceDiagnostics, SliceStack, StackStats};

// Pipeline entry points
pub use slicer::{Slicer, slice_at, slice_bucket, slice_soup, slice_soup_with_progress};

pub use bucket::Bucket;
pub use canon::{LineKey, PointCache, PointKey};
pub use heights::{PlannedZ, ZFeatures};
pub use progress::{Progress, ProgressCallback};
