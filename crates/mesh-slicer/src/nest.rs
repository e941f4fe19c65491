//! Polygon nesting.
//!
//! Polygons are sorted by area, smallest first, and each is assigned to the
//! first larger polygon that contains it. Parents are always strictly later
//! in that order, so the parent relation cannot form a cycle.

use tracing::trace;

use crate::params::{NestMode, SliceParams, Winding};
use crate::polygon::Polygon;

/// Nest a slice's polygons and normalize their winding.
///
/// Returns the top-level polygons in input order. In [`NestMode::Flat`],
/// tops are the even-depth polygons and each holds its odd-depth holes
/// with no further nesting. In [`NestMode::Deep`], tops are the depth-0
/// polygons and the full containment tree is kept.
pub fn nest_polygons(polygons: Vec<Polygon>, params: &SliceParams) -> Vec<Polygon> {
    let n = polygons.len();
    if n == 0 {
        return Vec::new();
    }

    let areas: Vec<f64> = polygons.iter().map(Polygon::area).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| areas[a].total_cmp(&areas[b]));

    // parent[i] indexes into `order`, always greater than i.
    let mut parent: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let child = &polygons[order[i]];
        for j in (i + 1)..n {
            let candidate = &polygons[order[j]];
            if params.open_tops && candidate.open {
                continue;
            }
            if child.is_inside(candidate, params.nest_tolerance) {
                parent[i] = Some(j);
                break;
            }
        }
    }

    let mut depth = vec![0usize; n];
    for i in (0..n).rev() {
        if let Some(p) = parent[i] {
            depth[i] = depth[p] + 1;
        }
    }

    let mut slots: Vec<Option<Polygon>> = polygons.into_iter().map(Some).collect();
    for (i, &source) in order.iter().enumerate() {
        if let Some(poly) = slots[source].as_mut() {
            poly.depth = depth[i];
            poly.inner.clear();
        }
    }

    // Children are smaller, so every child is moved before its parent.
    let mut is_top = vec![false; n];
    for i in 0..n {
        let attach_to = match (params.nest_mode, parent[i]) {
            (_, None) => None,
            (NestMode::Flat, Some(_)) if depth[i] % 2 == 0 => None,
            (_, Some(p)) => Some(p),
        };
        match attach_to {
            None => is_top[order[i]] = true,
            Some(p) => {
                if let Some(child) = slots[order[i]].take() {
                    if let Some(parent_poly) = slots[order[p]].as_mut() {
                        parent_poly.inner.push(child);
                    }
                }
            }
        }
    }

    let mut tops: Vec<Polygon> = slots
        .into_iter()
        .enumerate()
        .filter(|(index, _)| is_top[*index])
        .filter_map(|(_, poly)| poly)
        .collect();

    for top in &mut tops {
        apply_winding(top, params.top_winding);
    }

    trace!(
        target: "mesh_slicer::slice",
        polygons = n,
        tops = tops.len(),
        "Polygons nested"
    );
    tops
}

/// Set `winding` on a polygon and the opposite on its children, recursively.
pub fn apply_winding(polygon: &mut Polygon, winding: Winding) {
    polygon.set_winding(winding);
    for child in &mut polygon.inner {
        apply_winding(child, winding.opposite());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon {
        Polygon::new(vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x0 + size, y0, 0.0),
            Point3::new(x0 + size, y0 + size, 0.0),
            Point3::new(x0, y0 + size, 0.0),
        ])
    }

    #[test]
    fn test_hole_nested_with_opposite_winding() {
        let tops = nest_polygons(
            vec![square(5.0, 5.0, 10.0), square(0.0, 0.0, 20.0)],
            &SliceParams::default(),
        );
        assert_eq!(tops.len(), 1);
        let top = &tops[0];
        assert_eq!(top.depth, 0);
        assert_eq!(top.inner.len(), 1);
        assert_eq!(top.inner[0].depth, 1);
        assert_eq!(top.winding(), Winding::CounterClockwise);
        assert_eq!(top.inner[0].winding(), Winding::Clockwise);
        assert!((top.area_deep() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_mode_promotes_islands() {
        let tops = nest_polygons(
            vec![
                square(0.0, 0.0, 30.0),
                square(5.0, 5.0, 20.0),
                square(10.0, 10.0, 10.0),
            ],
            &SliceParams::default(),
        );
        assert_eq!(tops.len(), 2);
        let outer = tops.iter().find(|t| t.depth == 0).unwrap();
        let island = tops.iter().find(|t| t.depth == 2).unwrap();
        assert_eq!(outer.inner.len(), 1);
        assert!(outer.inner[0].inner.is_empty());
        assert!(island.inner.is_empty());
        assert_eq!(island.winding(), Winding::CounterClockwise);
    }

    #[test]
    fn test_deep_mode_keeps_tree() {
        let params = SliceParams::default().with_nest_mode(NestMode::Deep);
        let tops = nest_polygons(
            vec![
                square(10.0, 10.0, 10.0),
                square(0.0, 0.0, 30.0),
                square(5.0, 5.0, 20.0),
            ],
            &params,
        );
        assert_eq!(tops.len(), 1);
        let top = &tops[0];
        assert_eq!(top.tree_size(), 3);
        let hole = &top.inner[0];
        let island = &hole.inner[0];
        assert_eq!(island.depth, 2);
        assert_eq!(hole.winding(), Winding::Clockwise);
        assert_eq!(island.winding(), Winding::CounterClockwise);
    }

    #[test]
    fn test_disjoint_polygons_stay_separate() {
        let tops = nest_polygons(
            vec![square(0.0, 0.0, 5.0), square(10.0, 0.0, 5.0)],
            &SliceParams::default(),
        );
        assert_eq!(tops.len(), 2);
        assert!(tops.iter().all(|t| t.inner.is_empty() && t.depth == 0));
        // Input order is kept.
        assert_eq!(tops[0].points[0].x, 0.0);
    }

    #[test]
    fn test_open_polygon_cannot_hold_children() {
        let mut open = square(0.0, 0.0, 20.0);
        open.open = true;
        let tops = nest_polygons(vec![open.clone(), square(5.0, 5.0, 5.0)], &SliceParams::default());
        assert_eq!(tops.len(), 2);

        let params = SliceParams {
            open_tops: false,
            ..Default::default()
        };
        let tops = nest_polygons(vec![open, square(5.0, 5.0, 5.0)], &params);
        assert_eq!(tops.len(), 1);
    }

    #[test]
    fn test_top_winding_configurable() {
        let params = SliceParams::default().with_top_winding(Winding::Clockwise);
        let tops = nest_polygons(vec![square(0.0, 0.0, 20.0), square(5.0, 5.0, 5.0)], &params);
        assert!(tops[0].is_clockwise());
        assert!(!tops[0].inner[0].is_clockwise());
    }
}
