//! Plane intersection.
//!
//! Cuts each triangle with a horizontal plane and emits the resulting line
//! soup. Vertices within `precision_slice_z` of the plane are treated as on
//! it, which is what makes shared edges and touching vertices produce
//! shared canonical points.

use nalgebra::Point3;
use tracing::warn;

use crate::canon::{Line, PointCache};
use crate::error::SliceIssue;
use crate::params::{CoplanarEdgePolicy, SliceParams};
use crate::types::{Triangle, TriangleSoup};

/// Position of a vertex relative to the cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Under,
    Over,
    On,
}

/// Classify a height against the plane at `z`.
#[inline]
pub fn classify(vertex_z: f64, z: f64, epsilon: f64) -> Side {
    let delta = vertex_z - z;
    if delta.abs() < epsilon {
        Side::On
    } else if delta < 0.0 {
        Side::Under
    } else {
        Side::Over
    }
}

/// What a single triangle contributes to a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossing {
    /// The triangle does not cut the plane.
    None,
    /// A segment across the face, or an edge lying in the plane.
    Segment {
        a: Point3<f64>,
        b: Point3<f64>,
        edge: bool,
        coplanar: bool,
    },
    /// The triangle straddles the plane but fewer than two points resulted.
    Degenerate { points: usize },
}

/// Intersect one triangle with the plane at `z`.
///
/// Returned points always carry exactly `z` as their height.
pub fn intersect_triangle(
    triangle: &Triangle,
    z: f64,
    epsilon: f64,
    policy: CoplanarEdgePolicy,
) -> Crossing {
    let mut under: [Point3<f64>; 3] = [Point3::origin(); 3];
    let mut over: [Point3<f64>; 3] = [Point3::origin(); 3];
    let mut on: [Point3<f64>; 3] = [Point3::origin(); 3];
    let (mut nu, mut no, mut nn) = (0, 0, 0);

    for v in triangle.vertices() {
        match classify(v.z, z, epsilon) {
            Side::Under => {
                under[nu] = v;
                nu += 1;
            }
            Side::Over => {
                over[no] = v;
                no += 1;
            }
            Side::On => {
                on[nn] = v;
                nn += 1;
            }
        }
    }

    match (nu, no, nn) {
        (3, _, _) | (_, 3, _) | (_, _, 3) => Crossing::None,
        (_, _, 2) => {
            let emit = match policy {
                CoplanarEdgePolicy::Under => nu == 1,
                CoplanarEdgePolicy::Over => no == 1,
                CoplanarEdgePolicy::Both => true,
            };
            if emit {
                // The edge lies in the plane but the face does not, so the
                // line is an edge and not part of a coplanar face.
                Crossing::Segment {
                    a: at_z(on[0], z),
                    b: at_z(on[1], z),
                    edge: true,
                    coplanar: false,
                }
            } else {
                Crossing::None
            }
        }
        (0, _, 1) | (_, 0, 1) => Crossing::None,
        _ => {
            let mut points: [Point3<f64>; 2] = [Point3::origin(); 2];
            let mut count = 0;
            for o in &over[..no] {
                for u in &under[..nu] {
                    if count < 2 {
                        points[count] = interpolate(o, u, z);
                    }
                    count += 1;
                }
            }
            if count == 1 && nn == 1 {
                points[1] = at_z(on[0], z);
                count = 2;
            }
            // Every case reaching here has an under and an over vertex, so
            // finite input always yields two points.
            if count < 2 {
                Crossing::Degenerate { points: count }
            } else {
                Crossing::Segment {
                    a: points[0],
                    b: points[1],
                    edge: false,
                    coplanar: false,
                }
            }
        }
    }
}

/// Intersect the listed triangles of a soup with the plane at `z`.
///
/// Endpoints are interned in `cache`, so the returned lines reference
/// shared points. Segments whose endpoints collapse onto one canonical
/// point are dropped.
pub fn intersect_plane(
    soup: &TriangleSoup,
    triangles: impl IntoIterator<Item = usize>,
    z: f64,
    params: &SliceParams,
    cache: &mut PointCache,
    issues: &mut Vec<SliceIssue>,
) -> Vec<Line> {
    let mut lines = Vec::new();

    for index in triangles {
        let Some(triangle) = soup.triangle(index) else {
            continue;
        };
        let crossing = intersect_triangle(
            &triangle,
            z,
            params.precision_slice_z,
            params.coplanar_edge_policy,
        );
        record_crossing(crossing, index, z, cache, &mut lines, issues);
    }

    lines
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Add one triangle's crossing to the line soup, or to the issues when it
/// produced no usable segment.
fn record_crossing(
    crossing: Crossing,
    index: usize,
    z: f64,
    cache: &mut PointCache,
    lines: &mut Vec<Line>,
    issues: &mut Vec<SliceIssue>,
) {
    match crossing {
        Crossing::None => {}
        Crossing::Segment {
            a,
            b,
            edge,
            coplanar,
        } => {
            let ia = cache.intern(a);
            let ib = cache.intern(b);
            if let Some(line) = cache.line(ia, ib, edge, coplanar) {
                lines.push(line);
            }
        }
        Crossing::Degenerate { points } => {
            warn!(
                target: "mesh_slicer::slice",
                z,
                triangle = index,
                points,
                "Triangle crosses plane without a usable segment"
            );
            issues.push(SliceIssue::InvalidIntersection {
                z,
                triangle_index: index,
                points,
            });
        }
    }
}

#[inline]
fn at_z(p: Point3<f64>, z: f64) -> Point3<f64> {
    Point3::new(p.x, p.y, z)
}

/// Point where the segment from `over` to `under` crosses `z`.
#[inline]
fn interpolate(over: &Point3<f64>, under: &Point3<f64>, z: f64) -> Point3<f64> {
    let t = (z - over.z) / (under.z - over.z);
    Point3::new(
        over.x + (under.x - over.x) * t,
        over.y + (under.y - over.y) * t,
        z,
    )
}
