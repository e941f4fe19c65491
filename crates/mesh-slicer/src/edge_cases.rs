//! Edge case tests for slicing robustness.
//!
//! Unusual inputs the pipeline has to survive: empty and flat soups,
//! non-manifold contact, duplicated faces, open meshes and planes that
//! land exactly on horizontal faces.

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use crate::error::{ErrorCode, SliceIssue};
    use crate::params::{CoplanarEdgePolicy, NestMode, SliceParams};
    use crate::slicer::{slice_at, slice_soup};
    use crate::types::{Triangle, TriangleSoup};

    /// Axis-aligned box faces, two triangles per face, outward winding.
    fn box_faces(min: [f64; 3], max: [f64; 3]) -> Vec<Triangle> {
        let c = |x: usize, y: usize, z: usize| {
            Point3::new(
                if x == 0 { min[0] } else { max[0] },
                if y == 0 { min[1] } else { max[1] },
                if z == 0 { min[2] } else { max[2] },
            )
        };
        let quads = [
            [c(0, 0, 0), c(0, 1, 0), c(1, 1, 0), c(1, 0, 0)], // bottom
            [c(0, 0, 1), c(1, 0, 1), c(1, 1, 1), c(0, 1, 1)], // top
            [c(0, 0, 0), c(1, 0, 0), c(1, 0, 1), c(0, 0, 1)], // -y
            [c(1, 1, 0), c(0, 1, 0), c(0, 1, 1), c(1, 1, 1)], // +y
            [c(0, 1, 0), c(0, 0, 0), c(0, 0, 1), c(0, 1, 1)], // -x
            [c(1, 0, 0), c(1, 1, 0), c(1, 1, 1), c(1, 0, 1)], // +x
        ];
        quads
            .iter()
            .flat_map(|q| [Triangle::new(q[0], q[1], q[2]), Triangle::new(q[0], q[2], q[3])])
            .collect()
    }

    fn soup_of(triangles: Vec<Triangle>) -> TriangleSoup {
        TriangleSoup::from_triangles(triangles).unwrap()
    }

    // ==================== Input Tests ====================

    #[test]
    fn test_empty_soup_gives_empty_stack() {
        let stack = slice_soup(&TriangleSoup::new(), &SliceParams::default()).unwrap();
        assert!(stack.is_empty());
        assert!(stack.stats().is_none());
    }

    #[test]
    fn test_require_triangles() {
        let err = TriangleSoup::new().require_triangles().unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyInput);
        assert!(soup_of(box_faces([0.0; 3], [1.0; 3])).require_triangles().is_ok());
    }

    #[test]
    fn test_nan_coordinate_rejected() {
        let err = TriangleSoup::from_coords(&[
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
            f64::NAN,
            0.0,
            1.0,
            1.0,
        ])
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCoordinate);
        assert!(err.to_string().contains("point 1"));
    }

    #[test]
    fn test_infinite_coordinate_rejected() {
        let mut soup = TriangleSoup::new();
        let err = soup
            .push(Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(f64::INFINITY, 0.0, 0.0),
                Point3::new(0.0, 1.0, 1.0),
            ))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCoordinate);
        assert!(soup.is_empty());
    }

    #[test]
    fn test_partial_triangle_rejected() {
        let err = TriangleSoup::from_coords(&[0.0; 12]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedInput);
    }

    #[test]
    fn test_flat_soup_gives_empty_stack() {
        let soup = soup_of(vec![Triangle::new(
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(5.0, 0.0, 3.0),
            Point3::new(0.0, 5.0, 3.0),
        )]);
        let stack = slice_soup(&soup, &SliceParams::default()).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_range_outside_mesh_gives_empty_slices() {
        let soup = soup_of(box_faces([0.0; 3], [10.0; 3]));
        let params = SliceParams::for_fdm(1.0).with_z_range(20.0, 25.0);
        let stack = slice_soup(&soup, &params).unwrap();
        assert_eq!(stack.len(), 5);
        assert!(stack.iter().all(|s| s.is_empty()));

        let stack = slice_soup(&soup, &params.with_keep_empty(false)).unwrap();
        assert!(stack.is_empty());
    }

    // ==================== Topology Tests ====================

    #[test]
    fn test_shared_face_cancels() {
        // Two boxes side by side: the wall between them is interior.
        let mut triangles = box_faces([0.0; 3], [10.0; 3]);
        triangles.extend(box_faces([10.0, 0.0, 0.0], [20.0, 10.0, 10.0]));
        let slice = slice_at(&soup_of(triangles), 5.0, &SliceParams::default()).unwrap();

        assert_eq!(slice.tops.len(), 1);
        let top = &slice.tops[0];
        assert_eq!(top.len(), 4);
        assert!((top.perimeter() - 60.0).abs() < 1e-6);
        assert!((top.area() - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_manifold_corner_contact() {
        // Two boxes touching along a vertical edge: the section is a
        // figure-eight through one shared point.
        let mut triangles = box_faces([0.0; 3], [10.0; 3]);
        triangles.extend(box_faces([10.0, 10.0, 0.0], [20.0, 20.0, 10.0]));
        let slice = slice_at(&soup_of(triangles), 5.0, &SliceParams::default()).unwrap();

        assert_eq!(slice.tops.len(), 2);
        assert!(slice.tops.iter().all(|p| !p.open && p.inner.is_empty()));
        assert!((slice.area() - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicated_faces_do_not_panic() {
        let once = box_faces([0.0; 3], [10.0; 3]);
        let mut twice = once.clone();
        twice.extend(once);
        let soup = soup_of(twice);

        let stack = slice_soup(&soup, &SliceParams::for_fdm(2.0)).unwrap();
        assert_eq!(stack.len(), 5);
        // Every wall segment now appears twice and is treated as interior.
        assert!(stack.iter().all(|s| s.tops.is_empty()));
    }

    #[test]
    fn test_open_mesh_keeps_open_polygon() {
        // Drop the +y wall.
        let mut triangles = box_faces([0.0; 3], [10.0; 3]);
        triangles.drain(6..8);
        let soup = soup_of(triangles);

        let slice = slice_at(&soup, 5.0, &SliceParams::default()).unwrap();
        assert_eq!(slice.tops.len(), 1);
        assert!(slice.tops[0].open);
        assert_eq!(slice.open_count(), 1);
        assert_eq!(slice.island_count(), 0);
        assert!(slice.issues.iter().any(|issue| matches!(
            issue,
            SliceIssue::UnclosedChain { gap, .. } if (*gap - 10.0).abs() < 1e-6
        )));

        // A generous gap ceiling closes it.
        let params = SliceParams::default().with_bridge_gap(0.01, 20.0);
        let slice = slice_at(&soup, 5.0, &params).unwrap();
        assert_eq!(slice.tops.len(), 1);
        assert!(!slice.tops[0].open);
        assert!((slice.area() - 100.0).abs() < 1e-6);
        assert!(slice.issues.is_empty());
    }

    #[test]
    fn test_open_polygon_takes_no_children() {
        // An open U around a closed box.
        let mut triangles = box_faces([0.0; 3], [10.0; 3]);
        triangles.drain(6..8);
        triangles.extend(box_faces([3.0, 3.0, 0.0], [6.0, 6.0, 10.0]));
        let soup = soup_of(triangles);

        let slice = slice_at(&soup, 5.0, &SliceParams::default()).unwrap();
        assert_eq!(slice.tops.len(), 2);
        assert!(slice.tops.iter().all(|p| p.inner.is_empty()));
    }

    #[test]
    fn test_nested_boxes_deep_mode() {
        // Three concentric walls: outer box, hole, island.
        let mut triangles = box_faces([0.0; 3], [30.0, 30.0, 10.0]);
        triangles.extend(box_faces([5.0, 5.0, 0.0], [25.0, 25.0, 10.0]));
        triangles.extend(box_faces([10.0, 10.0, 0.0], [20.0, 20.0, 10.0]));
        let soup = soup_of(triangles);

        let flat = slice_at(&soup, 5.0, &SliceParams::default()).unwrap();
        assert_eq!(flat.tops.len(), 2);
        assert_eq!(flat.polygon_count(), 3);

        let deep = slice_at(
            &soup,
            5.0,
            &SliceParams::default().with_nest_mode(NestMode::Deep),
        )
        .unwrap();
        assert_eq!(deep.tops.len(), 1);
        assert_eq!(deep.tops[0].inner[0].inner.len(), 1);
        assert_eq!(deep.tops[0].inner[0].inner[0].depth, 2);
    }

    // ==================== Coplanar Edge Tests ====================

    #[test]
    fn test_coplanar_policy_at_bottom_face() {
        let soup = soup_of(box_faces([0.0; 3], [10.0; 3]));

        let under = SliceParams::default().with_coplanar_edge_policy(CoplanarEdgePolicy::Under);
        assert!(slice_at(&soup, 0.0, &under).unwrap().is_empty());

        for policy in [CoplanarEdgePolicy::Over, CoplanarEdgePolicy::Both] {
            let params = SliceParams::default().with_coplanar_edge_policy(policy);
            let slice = slice_at(&soup, 0.0, &params).unwrap();
            assert_eq!(slice.tops.len(), 1, "{policy:?}");
            assert!((slice.area() - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_coplanar_policy_at_top_face() {
        let soup = soup_of(box_faces([0.0; 3], [10.0; 3]));

        let over = SliceParams::default().with_coplanar_edge_policy(CoplanarEdgePolicy::Over);
        assert!(slice_at(&soup, 10.0, &over).unwrap().is_empty());

        for policy in [CoplanarEdgePolicy::Under, CoplanarEdgePolicy::Both] {
            let params = SliceParams::default().with_coplanar_edge_policy(policy);
            let slice = slice_at(&soup, 10.0, &params).unwrap();
            assert_eq!(slice.tops.len(), 1, "{policy:?}");
            assert!(slice.tops.iter().all(|p| p.len() == 4));
        }
    }

    #[test]
    fn test_plane_on_ledge_is_nudged() {
        // A step: 10x10 base to z=5, 5x10 tower to z=10. The base top is a
        // flat face at z=5.
        let mut triangles = box_faces([0.0; 3], [10.0, 10.0, 5.0]);
        triangles.extend(box_faces([0.0, 0.0, 5.0], [5.0, 10.0, 10.0]));
        let soup = soup_of(triangles);

        let stack = slice_soup(&soup, &SliceParams::at_heights(vec![5.0])).unwrap();
        assert_eq!(stack.len(), 1);
        let slice = stack.first().unwrap();
        assert!(slice.on_flat);
        assert!((slice.z - 5.001).abs() < 1e-12);
        assert!((slice.area() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_sliver_triangles() {
        // Nearly vertical slivers with sub-precision width.
        let soup = soup_of(vec![
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1e-9, 0.0, 0.0),
                Point3::new(0.0, 0.0, 10.0),
            ),
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 10.0),
                Point3::new(0.0, 0.0, 5.0),
            ),
        ]);
        let stack = slice_soup(&soup, &SliceParams::for_fdm(1.0)).unwrap();
        assert_eq!(stack.len(), 10);
        assert!(stack.iter().all(|s| s.tops.is_empty()));
    }
}
