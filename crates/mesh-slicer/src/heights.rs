//! Slice height planning.
//!
//! [`ZFeatures`] gathers the height statistics of a soup in one pass:
//! the per-triangle Z span used to size buckets, the distinct vertex
//! heights used by auto mode, and the heights of flat faces and
//! horizontal edges. [`plan_heights`] turns a [`ZSpec`] into the list of
//! planes to cut, nudging any plane that would land exactly on a flat face.

use hashbrown::HashMap;

use crate::params::{SliceParams, ZSpec};
use crate::types::TriangleSoup;

/// Resolution of feature height keys (five decimal places).
const Z_KEY_SCALE: f64 = 1e5;

/// Quantize a height for feature lookups.
#[inline]
pub fn z_key(z: f64) -> i64 {
    (z * Z_KEY_SCALE).round() as i64
}

/// Height statistics of a triangle soup.
#[derive(Debug, Clone, Default)]
pub struct ZFeatures {
    pub z_min: f64,
    pub z_max: f64,
    /// Sum over triangles of the absolute Z deltas along their edges.
    pub delta_sum: f64,
    pub triangle_count: usize,
    /// Distinct vertex heights, ascending.
    pub distinct: Vec<f64>,
    /// Projected area of horizontal triangles per height key, excluding
    /// the bottom of the soup.
    pub flats: HashMap<i64, f64>,
    /// Number of horizontal edges of non-flat triangles per height key.
    pub lines: HashMap<i64, usize>,
}

impl ZFeatures {
    /// Scan a soup. Returns `None` for an empty soup.
    pub fn from_soup(soup: &TriangleSoup) -> Option<Self> {
        let (min, max) = soup.bounds()?;
        let bottom = z_key(min.z);
        let mut features = ZFeatures {
            z_min: min.z,
            z_max: max.z,
            triangle_count: soup.triangle_count(),
            ..Default::default()
        };

        let mut distinct: HashMap<i64, f64> = HashMap::new();
        for tri in soup.triangles() {
            features.delta_sum += tri.z_delta_sum();

            let keys = [z_key(tri.v0.z), z_key(tri.v1.z), z_key(tri.v2.z)];
            for (key, v) in keys.iter().zip(tri.vertices()) {
                distinct.entry(*key).or_insert(v.z);
            }

            if keys[0] == keys[1] && keys[1] == keys[2] {
                if keys[0] != bottom {
                    *features.flats.entry(keys[0]).or_insert(0.0) += tri.projected_area();
                }
            } else {
                for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                    if keys[a] == keys[b] {
                        *features.lines.entry(keys[a]).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut heights: Vec<(i64, f64)> = distinct.into_iter().collect();
        heights.sort_by_key(|(key, _)| *key);
        features.distinct = heights.into_iter().map(|(_, z)| z).collect();
        Some(features)
    }

    /// Total Z extent.
    pub fn span(&self) -> f64 {
        self.z_max - self.z_min
    }

    /// Average per-triangle Z span estimate.
    pub fn average_span(&self) -> f64 {
        if self.triangle_count == 0 {
            0.0
        } else {
            self.delta_sum / self.triangle_count as f64
        }
    }

    /// Whether a flat face sits at `z`.
    pub fn is_flat(&self, z: f64) -> bool {
        self.flats.contains_key(&z_key(z))
    }

    /// Whether a horizontal edge sits at `z`.
    pub fn is_line(&self, z: f64) -> bool {
        self.lines.contains_key(&z_key(z))
    }
}

/// One plane to cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedZ {
    pub z: f64,
    /// Thickness of the layer this plane represents.
    pub height: f64,
    /// The requested height coincided with a flat face.
    pub on_flat: bool,
    /// The requested height coincided with a horizontal edge.
    pub on_line: bool,
}

/// Choose the planes to cut within `[z_min, z_max]`.
///
/// Heights are ascending and unique.
pub fn plan_heights(
    features: &ZFeatures,
    z_min: f64,
    z_max: f64,
    params: &SliceParams,
) -> Vec<PlannedZ> {
    let raw: Vec<(f64, f64)> = match &params.z_spec {
        ZSpec::Step { inc } => step_heights(z_min, z_max, *inc, params.first_layer_height),
        ZSpec::Explicit(list) => explicit_heights(list, z_min, z_max, params.min_step),
        ZSpec::Auto => auto_heights(&features.distinct, z_min, z_max, params.min_step),
        ZSpec::Adaptive { max, min } => adaptive_heights(
            &features.distinct,
            z_min,
            z_max,
            *max,
            *min,
            params.first_layer_height,
        ),
        ZSpec::Features => feature_heights(&features.distinct, z_min, z_max),
    };
    // Feature planes are meant to land on flats.
    let nudge = params.avoid_flats && !matches!(params.z_spec, ZSpec::Features);

    raw.into_iter()
        .map(|(z, height)| {
            let on_flat = features.is_flat(z);
            let on_line = features.is_line(z);
            let z = if nudge && (on_flat || on_line) {
                z + params.flat_offset
            } else {
                z
            };
            PlannedZ {
                z,
                height,
                on_flat,
                on_line,
            }
        })
        .collect()
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn step_heights(z_min: f64, z_max: f64, inc: f64, first: Option<f64>) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    if !(inc > 0.0) {
        return out;
    }
    let mut base = z_min;
    if let Some(first) = first {
        let z = z_min + first / 2.0;
        if z < z_max {
            out.push((z, first));
        }
        base = z_min + first;
    }
    // Index-based stepping keeps rounding error from accumulating.
    let mut i = 0usize;
    loop {
        let z = base + inc * (i as f64 + 0.5);
        if z >= z_max {
            break;
        }
        out.push((z, inc));
        i += 1;
    }
    out
}

fn explicit_heights(list: &[f64], z_min: f64, z_max: f64, min_step: f64) -> Vec<(f64, f64)> {
    let mut sorted: Vec<f64> = list
        .iter()
        .copied()
        .filter(|z| z.is_finite() && *z >= z_min && *z <= z_max)
        .collect();
    sorted.sort_by(f64::total_cmp);
    let merged = merge_close(&sorted, min_step);

    let mut prev = z_min;
    merged
        .into_iter()
        .map(|z| {
            let height = z - prev;
            prev = z;
            (z, height)
        })
        .collect()
}

fn auto_heights(distinct: &[f64], z_min: f64, z_max: f64, min_step: f64) -> Vec<(f64, f64)> {
    let within: Vec<f64> = distinct
        .iter()
        .copied()
        .filter(|z| *z >= z_min && *z <= z_max)
        .collect();
    let merged = merge_close(&within, min_step);
    merged
        .windows(2)
        .map(|w| ((w[0] + w[1]) / 2.0, w[1] - w[0]))
        .collect()
}

fn adaptive_heights(
    distinct: &[f64],
    z_min: f64,
    z_max: f64,
    max: f64,
    min: f64,
    first: Option<f64>,
) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    if !(max > 0.0 && min > 0.0) {
        return out;
    }
    let first = first.unwrap_or(max);
    if z_min + first / 2.0 >= z_max {
        return out;
    }
    out.push((z_min + first / 2.0, first));

    let mut pos = z_min + first;
    for &next in distinct.iter().filter(|z| **z <= z_max) {
        if pos >= z_max {
            break;
        }
        if pos >= next {
            continue;
        }
        let delta = next - pos;
        // Too thin to print on its own; folded into the following gap.
        if delta < min {
            continue;
        }
        let div_min = (delta / min).floor();
        let mut div_max = (delta / max).floor();
        let layers = if div_max >= 1.0 && div_max <= div_min {
            if delta % max > 0.01 {
                div_max += 1.0;
            }
            div_max as usize
        } else {
            1
        };
        let step = delta / layers as f64;
        for i in 0..layers {
            out.push((pos + step * (i as f64 + 0.5), step));
        }
        pos = next;
    }
    out
}

fn feature_heights(distinct: &[f64], z_min: f64, z_max: f64) -> Vec<(f64, f64)> {
    let mut prev = z_min;
    distinct
        .iter()
        .copied()
        .filter(|z| *z >= z_min && *z <= z_max)
        .map(|z| {
            let height = z - prev;
            prev = z;
            (z, height)
        })
        .collect()
}

/// Drop values closer than `min_step` to the previous kept value, and exact
/// repeats at the key resolution.
fn merge_close(sorted: &[f64], min_step: f64) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::with_capacity(sorted.len());
    for &z in sorted {
        match out.last() {
            Some(&last) if z_key(z) == z_key(last) || z - last < min_step => {}
            _ => out.push(z),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Triangle;
    use nalgebra::Point3;

    fn stepped_soup() -> TriangleSoup {
        // A sloped face from z=0 to z=4 plus a flat ledge at z=2.
        TriangleSoup::from_triangles([
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(0.0, 4.0, 4.0),
            ),
            Triangle::new(
                Point3::new(0.0, 0.0, 2.0),
                Point3::new(2.0, 0.0, 2.0),
                Point3::new(0.0, 2.0, 2.0),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_features() {
        let features = ZFeatures::from_soup(&stepped_soup()).unwrap();
        assert_eq!(features.z_min, 0.0);
        assert_eq!(features.z_max, 4.0);
        assert_eq!(features.distinct, vec![0.0, 2.0, 4.0]);
        assert!(features.is_flat(2.0));
        assert!(!features.is_flat(0.0));
        assert!(features.is_line(0.0));
        assert!((features.delta_sum - 8.0).abs() < 1e-12);
        assert!((features.average_span() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_soup_has_no_features() {
        assert!(ZFeatures::from_soup(&TriangleSoup::new()).is_none());
    }

    #[test]
    fn test_step_heights() {
        let features = ZFeatures::from_soup(&stepped_soup()).unwrap();
        let params = SliceParams::for_fdm(1.0);
        let planned = plan_heights(&features, 0.0, 4.0, &params);
        let zs: Vec<f64> = planned.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![0.5, 1.5, 2.5, 3.5]);
        assert!(planned.iter().all(|p| p.height == 1.0 && !p.on_flat));
    }

    #[test]
    fn test_first_layer() {
        let features = ZFeatures::from_soup(&stepped_soup()).unwrap();
        let params = SliceParams::for_fdm(1.0).with_first_layer_height(0.4);
        let planned = plan_heights(&features, 0.0, 4.0, &params);
        assert!((planned[0].z - 0.2).abs() < 1e-12);
        assert!((planned[0].height - 0.4).abs() < 1e-12);
        assert!((planned[1].z - 0.9).abs() < 1e-12);
        assert_eq!(planned.len(), 5);
    }

    #[test]
    fn test_flat_avoidance() {
        let features = ZFeatures::from_soup(&stepped_soup()).unwrap();
        let params = SliceParams::at_heights(vec![2.0, 1.0]);
        let planned = plan_heights(&features, 0.0, 4.0, &params);
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].z, 1.0);
        assert!((planned[0].height - 1.0).abs() < 1e-12);
        assert!(planned[1].on_flat);
        assert!((planned[1].z - 2.001).abs() < 1e-12);

        let params = SliceParams {
            avoid_flats: false,
            ..SliceParams::at_heights(vec![2.0])
        };
        let planned = plan_heights(&features, 0.0, 4.0, &params);
        assert_eq!(planned[0].z, 2.0);
        assert!(planned[0].on_flat);
    }

    #[test]
    fn test_auto_heights() {
        let features = ZFeatures::from_soup(&stepped_soup()).unwrap();
        let planned = plan_heights(&features, 0.0, 4.0, &SliceParams::for_laser());
        let zs: Vec<f64> = planned.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![1.0, 3.0]);
        assert!(planned.iter().all(|p| p.height == 2.0));
    }

    #[test]
    fn test_adaptive_heights() {
        // Distinct heights 0, 1.3, 1.35, 2 and 4.
        let soup = TriangleSoup::from_triangles([
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 1.3),
                Point3::new(0.0, 4.0, 4.0),
            ),
            Triangle::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.35),
                Point3::new(0.0, 1.0, 2.0),
            ),
        ])
        .unwrap();
        let features = ZFeatures::from_soup(&soup).unwrap();
        let params = SliceParams::for_adaptive_fdm(1.0, 0.2).with_first_layer_height(0.5);
        let planned = plan_heights(&features, 0.0, 4.0, &params);

        let expected = [(0.25, 0.5), (0.9, 0.8), (1.65, 0.7), (2.5, 1.0), (3.5, 1.0)];
        assert_eq!(planned.len(), expected.len());
        for (p, (z, height)) in planned.iter().zip(expected) {
            assert!((p.z - z).abs() < 1e-9, "z {} vs {}", p.z, z);
            assert!((p.height - height).abs() < 1e-9);
        }
    }

    #[test]
    fn test_adaptive_splits_uneven_gap() {
        // One gap of 2.7 above a 0.5 first layer: 3 layers of 0.9.
        let soup = TriangleSoup::from_triangles([Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.5),
            Point3::new(0.0, 4.0, 3.2),
        )])
        .unwrap();
        let features = ZFeatures::from_soup(&soup).unwrap();
        let params = SliceParams::for_adaptive_fdm(1.0, 0.2).with_first_layer_height(0.5);
        let planned = plan_heights(&features, 0.0, 3.2, &params);

        assert_eq!(planned.len(), 4);
        for (p, z) in planned[1..].iter().zip([0.95, 1.85, 2.75]) {
            assert!((p.z - z).abs() < 1e-9);
            assert!((p.height - 0.9).abs() < 1e-9);
        }
    }

    #[test]
    fn test_feature_heights_keep_flats() {
        let features = ZFeatures::from_soup(&stepped_soup()).unwrap();
        let params = SliceParams::default().with_z_spec(ZSpec::Features);
        let planned = plan_heights(&features, 0.0, 4.0, &params);

        let zs: Vec<f64> = planned.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![0.0, 2.0, 4.0]);
        assert!(planned[1].on_flat);
        assert_eq!(planned[2].height, 2.0);
    }

    #[test]
    fn test_min_step_merges() {
        assert_eq!(merge_close(&[0.0, 0.05, 0.2, 0.21, 1.0], 0.1), vec![0.0, 0.2, 1.0]);
        assert_eq!(merge_close(&[1.0, 1.0, 2.0], 0.0), vec![1.0, 2.0]);
    }
}
