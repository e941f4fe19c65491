//! Z bucketing.
//!
//! Splits the soup into horizontal bands so that cutting a plane only
//! looks at triangles near it. Buckets reference triangles by index. A
//! triangle spanning several bands is listed in each of them, and every
//! planned height belongs to exactly one bucket. Bucketing never changes
//! the output. When it would not help, everything goes into a single
//! bucket.

use tracing::debug;

use crate::heights::{PlannedZ, ZFeatures};
use crate::params::SliceParams;
use crate::types::TriangleSoup;

/// A horizontal band of the soup and the heights cut inside it.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub index: usize,
    pub z_lo: f64,
    pub z_hi: f64,
    /// Indices of triangles that reach into the band.
    pub triangles: Vec<usize>,
    pub heights: Vec<PlannedZ>,
}

/// Number of buckets to use for a soup.
///
/// Derived from how many average-sized triangles fit in the total height,
/// raised to the concurrency hint, and capped by `bucket_max`.
pub fn bucket_count(features: &ZFeatures, params: &SliceParams) -> usize {
    if params.single_bucket {
        return 1;
    }
    let span = features.span();
    let average = features.average_span();
    if !(span > 0.0) || !(average > 0.0) || !span.is_finite() {
        return 1;
    }
    let estimate = (span / average).round().max(1.0);
    let mut count = if estimate >= params.bucket_max as f64 {
        params.bucket_max
    } else {
        estimate as usize
    };
    if let Some(workers) = params.concurrency {
        count = count.max(workers);
    }
    count.clamp(1, params.bucket_max)
}

/// Partition the soup and the planned heights into buckets.
pub fn bucketize(
    soup: &TriangleSoup,
    features: &ZFeatures,
    heights: &[PlannedZ],
    params: &SliceParams,
) -> Vec<Bucket> {
    let count = bucket_count(features, params);
    if count > 1 {
        if let Some(buckets) = partition(soup, features, heights, count, params) {
            return buckets;
        }
    }
    vec![single_bucket(soup, features, heights)]
}

/// One bucket holding every triangle and every height.
pub fn single_bucket(soup: &TriangleSoup, features: &ZFeatures, heights: &[PlannedZ]) -> Bucket {
    Bucket {
        index: 0,
        z_lo: features.z_min,
        z_hi: features.z_max,
        triangles: (0..soup.triangle_count()).collect(),
        heights: heights.to_vec(),
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn partition(
    soup: &TriangleSoup,
    features: &ZFeatures,
    heights: &[PlannedZ],
    count: usize,
    params: &SliceParams,
) -> Option<Vec<Bucket>> {
    let z_min = features.z_min;
    let width = features.span() / count as f64;
    let slot = |z: f64| -> usize {
        let k = ((z - z_min) / width).floor();
        if k <= 0.0 {
            0
        } else {
            (k as usize).min(count - 1)
        }
    };

    let mut buckets: Vec<Bucket> = (0..count)
        .map(|index| Bucket {
            index,
            z_lo: z_min + width * index as f64,
            z_hi: z_min + width * (index + 1) as f64,
            ..Default::default()
        })
        .collect();

    // Widen by the on-plane epsilon so a triangle that only touches a
    // plane is still seen by that plane's bucket.
    let margin = params.precision_slice_z;
    for (index, tri) in soup.triangles().enumerate() {
        let (lo, hi) = tri.z_range();
        for bucket in &mut buckets[slot(lo - margin)..=slot(hi + margin)] {
            bucket.triangles.push(index);
        }
    }

    let total = soup.triangle_count();
    let limit = params.bucket_overflow_ratio * total as f64;
    if let Some(full) = buckets.iter().find(|b| b.triangles.len() as f64 > limit) {
        debug!(
            target: "mesh_slicer::slice",
            bucket = full.index,
            triangles = full.triangles.len(),
            total,
            "Bucket overflow, falling back to a single bucket"
        );
        return None;
    }

    for planned in heights {
        buckets[slot(planned.z)].heights.push(*planned);
    }

    debug!(
        target: "mesh_slicer::slice",
        buckets = count,
        width,
        "Triangles bucketed"
    );
    Some(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Triangle;
    use nalgebra::Point3;

    /// A tall strip of thin triangles stacked along Z.
    fn ladder(rungs: usize) -> TriangleSoup {
        let mut tris = Vec::new();
        for i in 0..rungs {
            let z0 = i as f64;
            let z1 = z0 + 1.0;
            tris.push(Triangle::new(
                Point3::new(0.0, 0.0, z0),
                Point3::new(1.0, 0.0, z0),
                Point3::new(0.0, 0.0, z1),
            ));
            tris.push(Triangle::new(
                Point3::new(1.0, 0.0, z0),
                Point3::new(1.0, 0.0, z1),
                Point3::new(0.0, 0.0, z1),
            ));
        }
        TriangleSoup::from_triangles(tris).unwrap()
    }

    fn planned(z: f64) -> PlannedZ {
        PlannedZ {
            z,
            height: 1.0,
            on_flat: false,
            on_line: false,
        }
    }

    #[test]
    fn test_count_follows_triangle_span() {
        let soup = ladder(20);
        let features = ZFeatures::from_soup(&soup).unwrap();
        // Each triangle spans 2 in delta sum, over a height of 20.
        assert_eq!(bucket_count(&features, &SliceParams::default()), 10);

        let capped = SliceParams {
            bucket_max: 4,
            ..Default::default()
        };
        assert_eq!(bucket_count(&features, &capped), 4);

        let single = SliceParams::default().with_single_bucket(true);
        assert_eq!(bucket_count(&features, &single), 1);
    }

    #[test]
    fn test_concurrency_raises_count() {
        let soup = ladder(2);
        let features = ZFeatures::from_soup(&soup).unwrap();
        assert_eq!(bucket_count(&features, &SliceParams::default()), 1);
        let params = SliceParams::default().with_concurrency(8);
        assert_eq!(bucket_count(&features, &params), 8);
    }

    #[test]
    fn test_every_height_sees_its_triangles() {
        let soup = ladder(20);
        let features = ZFeatures::from_soup(&soup).unwrap();
        let heights: Vec<PlannedZ> = (0..40).map(|i| planned(i as f64 * 0.5)).collect();
        let buckets = bucketize(&soup, &features, &heights, &SliceParams::default());
        assert!(buckets.len() > 1);

        let assigned: usize = buckets.iter().map(|b| b.heights.len()).sum();
        assert_eq!(assigned, heights.len());

        for bucket in &buckets {
            for h in &bucket.heights {
                for (index, tri) in soup.triangles().enumerate() {
                    let (lo, hi) = tri.z_range();
                    if lo <= h.z + 1e-4 && hi >= h.z - 1e-4 {
                        assert!(bucket.triangles.contains(&index));
                    }
                }
            }
        }
    }

    #[test]
    fn test_overflow_falls_back() {
        // One triangle spanning the full height and many short ones at the
        // bottom: every bucket holds the tall triangle, the bottom one
        // holds nearly everything.
        let mut tris = vec![Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 100.0),
        )];
        for i in 0..50 {
            let x = i as f64;
            tris.push(Triangle::new(
                Point3::new(x, 5.0, 0.0),
                Point3::new(x + 1.0, 5.0, 0.0),
                Point3::new(x, 6.0, 0.01),
            ));
        }
        let soup = TriangleSoup::from_triangles(tris).unwrap();
        let features = ZFeatures::from_soup(&soup).unwrap();
        let params = SliceParams::default().with_concurrency(4);
        let buckets = bucketize(&soup, &features, &[planned(50.0)], &params);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].triangles.len(), 51);
        assert_eq!(buckets[0].heights.len(), 1);
    }

    #[test]
    fn test_flat_soup_uses_one_bucket() {
        let soup = TriangleSoup::from_triangles([Triangle::new(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        )])
        .unwrap();
        let features = ZFeatures::from_soup(&soup).unwrap();
        let buckets = bucketize(&soup, &features, &[], &SliceParams::default());
        assert_eq!(buckets.len(), 1);
    }
}
