//! Slices and the ordered slice stack.
//!
//! A [`Slice`] is the cross-section at one height: a forest of nested
//! polygons plus what happened while it was built. A [`SliceStack`] owns
//! the slices of one slicing call in ascending Z, each linked to its
//! neighbors by index.
//!
//! # Example
//!
//! ```
//! use mesh_slicer::{SliceParams, TriangleSoup, slice_soup};
//!
//! let stack = slice_soup(&TriangleSoup::new(), &SliceParams::default()).unwrap();
//! assert!(stack.is_empty());
//! ```

use nalgebra::Point3;

use crate::error::SliceIssue;
use crate::polygon::{Bounds2, Polygon};

/// Counters gathered while building one slice.
///
/// These describe the work done, not the result. `triangles` in particular
/// depends on how the soup was bucketed, so diagnostics take no part in
/// [`Slice`] equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceDiagnostics {
    /// Triangles examined for this plane, that is the size of its bucket.
    pub triangles: usize,
    /// Lines produced by the plane intersection.
    pub raw_lines: usize,
    /// Lines left after deduplication and merging.
    pub lines: usize,
    /// Cycles closed directly by path reconstruction.
    pub closed_paths: usize,
    /// Open chains handed to the bridger.
    pub open_chains: usize,
    /// Chain joins made by the bridger.
    pub bridge_merges: usize,
}

/// The cross-section at one height.
#[derive(Debug, Clone)]
pub struct Slice {
    /// Position in the stack, bottom first.
    pub index: usize,
    pub z: f64,
    /// Thickness of the layer this slice represents.
    pub height: f64,
    /// Top-level polygons with their nested inner polygons.
    pub tops: Vec<Polygon>,
    /// Index of the slice above, if any.
    pub up: Option<usize>,
    /// Index of the slice below, if any.
    pub down: Option<usize>,
    /// The requested height was moved off a flat face.
    pub on_flat: bool,
    /// The requested height was moved off a horizontal edge.
    pub on_line: bool,
    pub diagnostics: SliceDiagnostics,
    pub issues: Vec<SliceIssue>,
    /// Deduplicated line soup, kept when `retain_lines` is set.
    pub lines: Option<Vec<[Point3<f64>; 2]>>,
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.z == other.z
            && self.height == other.height
            && self.tops == other.tops
            && self.up == other.up
            && self.down == other.down
            && self.on_flat == other.on_flat
            && self.on_line == other.on_line
            && self.issues == other.issues
            && self.lines == other.lines
    }
}

impl Slice {
    /// An unlinked slice with no polygons.
    pub fn new(z: f64, height: f64) -> Self {
        Self {
            index: 0,
            z,
            height,
            tops: Vec::new(),
            up: None,
            down: None,
            on_flat: false,
            on_line: false,
            diagnostics: SliceDiagnostics::default(),
            issues: Vec::new(),
            lines: None,
        }
    }

    /// Whether the slice holds no polygons.
    pub fn is_empty(&self) -> bool {
        self.tops.is_empty()
    }

    /// Every polygon in the slice, parents before children.
    pub fn polygons(&self) -> Vec<&Polygon> {
        let mut out = Vec::new();
        for top in &self.tops {
            top.walk(&mut |p| out.push(p));
        }
        out
    }

    /// Total number of polygons including nested ones.
    pub fn polygon_count(&self) -> usize {
        self.tops.iter().map(Polygon::tree_size).sum()
    }

    /// Number of polygons left open by the bridger.
    pub fn open_count(&self) -> usize {
        self.polygons().iter().filter(|p| p.open).count()
    }

    /// Number of separate solid regions.
    pub fn island_count(&self) -> usize {
        self.tops.iter().filter(|p| !p.open).count()
    }

    /// Material area: tops minus their holes.
    pub fn area(&self) -> f64 {
        self.tops
            .iter()
            .filter(|p| !p.open)
            .map(Polygon::area_deep)
            .sum()
    }

    /// Total outline length of every polygon.
    pub fn perimeter(&self) -> f64 {
        self.polygons().iter().map(|p| p.perimeter()).sum()
    }

    /// XY bounds of all polygons, or `None` for an empty slice.
    pub fn bounds(&self) -> Option<Bounds2> {
        if self.tops.is_empty() {
            return None;
        }
        let mut bounds = Bounds2::empty();
        for top in &self.tops {
            let b = top.bounds();
            bounds.include(b.min_x, b.min_y);
            bounds.include(b.max_x, b.max_y);
        }
        Some(bounds)
    }
}

/// Summary over a whole stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StackStats {
    pub slice_count: usize,
    pub empty_slices: usize,
    /// Minimum area across all slices.
    pub min_area: f64,
    /// Maximum area across all slices.
    pub max_area: f64,
    /// Average area.
    pub avg_area: f64,
    /// Minimum perimeter.
    pub min_perimeter: f64,
    /// Maximum perimeter.
    pub max_perimeter: f64,
    /// Average perimeter.
    pub avg_perimeter: f64,
    /// Maximum island count.
    pub max_islands: usize,
    /// Index of the slice with the largest area.
    pub max_area_slice: usize,
    pub open_polygons: usize,
    pub issues: usize,
}

/// Slices of one slicing call, ascending in Z and linked up and down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceStack {
    slices: Vec<Slice>,
}

impl SliceStack {
    /// Sort slices by Z, number them and link neighbors.
    ///
    /// The result does not depend on the order the slices arrive in.
    pub fn from_slices(mut slices: Vec<Slice>) -> Self {
        slices.sort_by(|a, b| a.z.total_cmp(&b.z));
        let count = slices.len();
        for (index, slice) in slices.iter_mut().enumerate() {
            slice.index = index;
            slice.down = index.checked_sub(1);
            slice.up = if index + 1 < count {
                Some(index + 1)
            } else {
                None
            };
        }
        Self { slices }
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slice> {
        self.slices.get(index)
    }

    pub fn first(&self) -> Option<&Slice> {
        self.slices.first()
    }

    pub fn last(&self) -> Option<&Slice> {
        self.slices.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slice> {
        self.slices.iter()
    }

    pub fn as_slice(&self) -> &[Slice] {
        &self.slices
    }

    /// The slice above `slice`.
    pub fn above(&self, slice: &Slice) -> Option<&Slice> {
        slice.up.and_then(|i| self.slices.get(i))
    }

    /// The slice below `slice`.
    pub fn below(&self, slice: &Slice) -> Option<&Slice> {
        slice.down.and_then(|i| self.slices.get(i))
    }

    /// Slice closest to `z`.
    pub fn nearest(&self, z: f64) -> Option<&Slice> {
        self.slices
            .iter()
            .min_by(|a, b| (a.z - z).abs().total_cmp(&(b.z - z).abs()))
    }

    pub fn into_vec(self) -> Vec<Slice> {
        self.slices
    }

    /// Calculate summary statistics. Returns `None` for an empty stack.
    pub fn stats(&self) -> Option<StackStats> {
        if self.slices.is_empty() {
            return None;
        }

        let areas: Vec<f64> = self.slices.iter().map(Slice::area).collect();
        let perimeters: Vec<f64> = self.slices.iter().map(Slice::perimeter).collect();
        let n = self.slices.len() as f64;

        let (max_area_slice, max_area) = areas
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, a)| {
                if a > best.1 { (i, a) } else { best }
            });

        Some(StackStats {
            slice_count: self.slices.len(),
            empty_slices: self.slices.iter().filter(|s| s.is_empty()).count(),
            min_area: areas.iter().copied().fold(f64::INFINITY, f64::min),
            max_area,
            avg_area: areas.iter().sum::<f64>() / n,
            min_perimeter: perimeters.iter().copied().fold(f64::INFINITY, f64::min),
            max_perimeter: perimeters.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_perimeter: perimeters.iter().sum::<f64>() / n,
            max_islands: self
                .slices
                .iter()
                .map(Slice::island_count)
                .max()
                .unwrap_or(0),
            max_area_slice,
            open_polygons: self.slices.iter().map(Slice::open_count).sum(),
            issues: self.slices.iter().map(|s| s.issues.len()).sum(),
        })
    }
}

impl<'a> IntoIterator for &'a SliceStack {
    type Item = &'a Slice;
    type IntoIter = std::slice::Iter<'a, Slice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}

impl IntoIterator for SliceStack {
    type Item = Slice;
    type IntoIter = std::vec::IntoIter<Slice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.into_iter()
    }
}
