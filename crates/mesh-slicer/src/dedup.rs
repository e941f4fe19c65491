//! Line soup deduplication and collinear merging.
//!
//! A segment produced twice at the same place lies between two faces of
//! the solid, so it is interior and both copies are removed. The exception
//! is a segment flagged as a genuine triangle edge, which survives once.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::trace;

use crate::canon::{Line, PointCache, PointId};

/// Deduplicate a plane's line soup and merge collinear runs.
///
/// The result is sorted by line key.
pub fn dedup_lines(mut lines: Vec<Line>, cache: &PointCache, collinear_tolerance: f64) -> Vec<Line> {
    let input = lines.len();
    cull_duplicates(&mut lines);
    let culled = lines.len();
    let mut lines = merge_collinear(lines, cache, collinear_tolerance);
    let merged = lines.len();
    cull_duplicates(&mut lines);

    trace!(
        target: "mesh_slicer::slice",
        input,
        after_cull = culled,
        after_merge = merged,
        output = lines.len(),
        "Line soup deduplicated"
    );
    lines
}

/// Sort by key and resolve every run of equal keys.
///
/// A run of one survives. A longer run keeps its first edge line, or
/// disappears entirely when none of its lines is an edge.
pub fn cull_duplicates(lines: &mut Vec<Line>) {
    lines.sort_by(|a, b| a.key.cmp(&b.key));

    let mut kept = Vec::with_capacity(lines.len());
    let mut start = 0;
    while start < lines.len() {
        let key = lines[start].key;
        let mut end = start + 1;
        while end < lines.len() && lines[end].key == key {
            end += 1;
        }
        let run = &lines[start..end];
        if run.len() == 1 {
            kept.push(run[0]);
        } else if let Some(edge) = run.iter().find(|l| l.edge) {
            kept.push(*edge);
        }
        start = end;
    }
    *lines = kept;
}

/// Replace pairs of collinear lines meeting at a degree-2 point with one
/// line spanning their far endpoints.
///
/// Points are visited in the order they first appear in `lines`, and the
/// adjacency is updated as merges happen, so a run of any length collapses
/// in one call.
pub fn merge_collinear(lines: Vec<Line>, cache: &PointCache, tolerance: f64) -> Vec<Line> {
    let mut slots: Vec<Option<Line>> = lines.into_iter().map(Some).collect();
    let mut incident: HashMap<PointId, Vec<usize>> = HashMap::new();
    let mut order: Vec<PointId> = Vec::new();

    for (index, line) in slots.iter().enumerate() {
        let Some(line) = line else { continue };
        for p in [line.a, line.b] {
            let list = incident.entry(p).or_default();
            if list.is_empty() {
                order.push(p);
            }
            list.push(index);
        }
    }

    for p in order {
        let Some(list) = incident.get(&p) else {
            continue;
        };
        let &[first, second] = list.as_slice() else {
            continue;
        };
        let (Some(l1), Some(l2)) = (slots[first], slots[second]) else {
            continue;
        };
        let (Some(o1), Some(o2)) = (l1.other(p), l2.other(p)) else {
            continue;
        };
        if o1 == o2 {
            continue;
        }
        let (pp, p1, p2) = (cache.point(p), cache.point(o1), cache.point(o2));
        if !is_collinear(&p1, &pp, &p2, tolerance) {
            continue;
        }
        let Some(merged) = cache.line(o1, o2, l1.edge || l2.edge, l1.coplanar && l2.coplanar)
        else {
            continue;
        };

        slots[first] = None;
        slots[second] = None;
        let index = slots.len();
        slots.push(Some(merged));

        incident.remove(&p);
        replace_incident(&mut incident, o1, first, index);
        replace_incident(&mut incident, o2, second, index);
    }

    slots.into_iter().flatten().collect()
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Whether `mid` lies on the segment between `a` and `b`.
///
/// Collinearity uses the absolute cross product. Requiring `mid` to sit
/// between the ends stops a fold-back (`a` and `b` on the same side) from
/// being merged into a shorter line.
fn is_collinear(a: &Point3<f64>, mid: &Point3<f64>, b: &Point3<f64>, tolerance: f64) -> bool {
    let d1 = mid.xy() - a.xy();
    let d2 = b.xy() - mid.xy();
    let cross = d2.y * d1.x - d2.x * d1.y;
    cross.abs() < tolerance && d1.dot(&d2) > 0.0
}

fn replace_incident(
    incident: &mut HashMap<PointId, Vec<usize>>,
    point: PointId,
    old: usize,
    new: usize,
) {
    if let Some(list) = incident.get_mut(&point) {
        for slot in list.iter_mut() {
            if *slot == old {
                *slot = new;
            }
        }
    }
}
