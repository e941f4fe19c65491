//! Triangle soup input types.

use nalgebra::{Point3, Vector3};

use crate::error::{SliceError, SliceResult};

/// A single triangle with its three corner positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Corners as an array, in input order.
    #[inline]
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Compute the unnormalized normal (cross product of edges).
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Compute the triangle area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Area of the triangle's projection onto the XY plane.
    #[inline]
    pub fn projected_area(&self) -> f64 {
        self.normal_unnormalized().z.abs() * 0.5
    }

    /// Lowest and highest Z of the three corners.
    #[inline]
    pub fn z_range(&self) -> (f64, f64) {
        let lo = self.v0.z.min(self.v1.z).min(self.v2.z);
        let hi = self.v0.z.max(self.v1.z).max(self.v2.z);
        (lo, hi)
    }

    /// Sum of the absolute Z deltas along the three edges.
    ///
    /// Used as the per-triangle span estimate when sizing buckets.
    #[inline]
    pub fn z_delta_sum(&self) -> f64 {
        (self.v0.z - self.v1.z).abs() + (self.v1.z - self.v2.z).abs() + (self.v2.z - self.v0.z).abs()
    }
}

/// An unstructured collection of triangles.
///
/// Stored as a flat point array grouped in triples, with no connectivity.
/// Coordinates are unit-agnostic, though millimeters are typical.
#[derive(Debug, Clone, Default)]
pub struct TriangleSoup {
    points: Vec<Point3<f64>>,
}

impl TriangleSoup {
    /// Create an empty soup.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a soup from a flat point array.
    ///
    /// # Errors
    ///
    /// Returns [`SliceError::MalformedInput`] when the point count is not a
    /// multiple of three, and [`SliceError::InvalidCoordinate`] when any
    /// coordinate is NaN or infinite.
    pub fn from_points(points: Vec<Point3<f64>>) -> SliceResult<Self> {
        if points.len() % 3 != 0 {
            return Err(SliceError::malformed_input(points.len()));
        }
        for (index, p) in points.iter().enumerate() {
            for (name, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
                if !value.is_finite() {
                    return Err(SliceError::invalid_coordinate(index, name, value));
                }
            }
        }
        Ok(Self { points })
    }

    /// Build a soup from a flat `[x, y, z, x, y, z, ...]` coordinate array.
    pub fn from_coords(coords: &[f64]) -> SliceResult<Self> {
        if coords.len() % 9 != 0 {
            return Err(SliceError::malformed_input(coords.len() / 3));
        }
        let points = coords
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Self::from_points(points)
    }

    /// Build a soup from triangles.
    pub fn from_triangles<I>(triangles: I) -> SliceResult<Self>
    where
        I: IntoIterator<Item = Triangle>,
    {
        let points = triangles
            .into_iter()
            .flat_map(|t| t.vertices())
            .collect();
        Self::from_points(points)
    }

    /// Expand an indexed mesh into a soup.
    ///
    /// Faces that reference a missing vertex are rejected as malformed.
    pub fn from_indexed(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> SliceResult<Self> {
        let mut points = Vec::with_capacity(faces.len() * 3);
        for face in faces {
            for &idx in face {
                let p = vertices
                    .get(idx as usize)
                    .ok_or_else(|| SliceError::malformed_input(faces.len() * 3))?;
                points.push(*p);
            }
        }
        Self::from_points(points)
    }

    /// Append one triangle.
    pub fn push(&mut self, triangle: Triangle) -> SliceResult<()> {
        let base = self.points.len();
        for (offset, p) in triangle.vertices().iter().enumerate() {
            for (name, value) in [("x", p.x), ("y", p.y), ("z", p.z)] {
                if !value.is_finite() {
                    return Err(SliceError::invalid_coordinate(base + offset, name, value));
                }
            }
        }
        self.points.extend(triangle.vertices());
        Ok(())
    }

    /// The flat point array.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.points.len() / 3
    }

    /// Check if the soup holds no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fail with [`SliceError::EmptyInput`] when there is nothing to slice.
    ///
    /// Slicing itself accepts an empty soup and returns an empty stack; this
    /// is for callers that treat missing geometry as an error.
    pub fn require_triangles(&self) -> SliceResult<()> {
        if self.is_empty() {
            Err(SliceError::EmptyInput)
        } else {
            Ok(())
        }
    }

    /// Get a specific triangle by index.
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        let base = index.checked_mul(3)?;
        let p = self.points.get(base..base + 3)?;
        Some(Triangle::new(p[0], p[1], p[2]))
    }

    /// Iterate over triangles.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.points
            .chunks_exact(3)
            .map(|p| Triangle::new(p[0], p[1], p[2]))
    }

    /// Compute the axis-aligned bounding box.
    /// Returns (min_corner, max_corner) or None if the soup is empty.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;

        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 2.0),
        )
    }

    #[test]
    fn test_triangle_z_helpers() {
        let tri = unit_triangle();
        assert_eq!(tri.z_range(), (0.0, 2.0));
        assert!((tri.z_delta_sum() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_projected_area() {
        let flat = Triangle::new(
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(2.0, 0.0, 3.0),
            Point3::new(0.0, 2.0, 3.0),
        );
        assert!((flat.projected_area() - 2.0).abs() < 1e-12);
        assert!((flat.area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_points_rejects_partial_triangle() {
        let points = vec![Point3::origin(); 4];
        let err = TriangleSoup::from_points(points).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::MalformedInput);
    }

    #[test]
    fn test_from_points_rejects_nan() {
        let mut points = vec![Point3::origin(); 3];
        points[2].y = f64::NAN;
        match TriangleSoup::from_points(points) {
            Err(SliceError::InvalidCoordinate {
                point_index,
                coordinate,
                ..
            }) => {
                assert_eq!(point_index, 2);
                assert_eq!(coordinate, "y");
            }
            other => panic!("expected coordinate error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_indexed() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let soup = TriangleSoup::from_indexed(&vertices, &[[0, 1, 2], [2, 1, 0]]).unwrap();
        assert_eq!(soup.triangle_count(), 2);
        assert_eq!(soup.triangle(1).unwrap().v0, vertices[2]);
        assert!(soup.triangle(2).is_none());

        assert!(TriangleSoup::from_indexed(&vertices, &[[0, 1, 9]]).is_err());
    }

    #[test]
    fn test_bounds() {
        let soup = TriangleSoup::from_triangles([unit_triangle()]).unwrap();
        let (min, max) = soup.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 2.0));
        assert!(TriangleSoup::new().bounds().is_none());
    }

    #[test]
    fn test_from_coords() {
        let soup = TriangleSoup::from_coords(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]).unwrap();
        assert_eq!(soup.triangle_count(), 1);
        assert!(TriangleSoup::from_coords(&[0.0; 6]).is_err());
    }
}
