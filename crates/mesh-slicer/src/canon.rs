//! Canonical point and line identity.
//!
//! Points are quantized to a fixed grid and interned in a [`PointCache`],
//! so geometry shared between triangles collapses to a shared [`PointId`].
//! Lines are undirected: their key orders the two endpoint keys, so a
//! segment and its reversal compare equal.
//!
//! A cache lives for exactly one plane-intersection call. Nothing in it is
//! shared between planes or buckets, which is what lets buckets be sliced
//! concurrently.

use hashbrown::HashMap;
use nalgebra::Point3;

/// Quantization scale for point keys (six decimal places).
pub const KEY_SCALE: f64 = 1e6;

/// Quantized coordinates used for point equality and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey([i64; 3]);

impl PointKey {
    /// Key a point at the default six-decimal resolution.
    #[inline]
    pub fn new(p: &Point3<f64>) -> Self {
        Self::with_scale(p, KEY_SCALE)
    }

    /// Key a point on a grid of `1 / scale`.
    #[inline]
    pub fn with_scale(p: &Point3<f64>, scale: f64) -> Self {
        Self([
            (p.x * scale).round() as i64,
            (p.y * scale).round() as i64,
            (p.z * scale).round() as i64,
        ])
    }

    /// The raw quantized coordinates.
    #[inline]
    pub fn coords(&self) -> [i64; 3] {
        self.0
    }
}

/// Order-independent key of an undirected segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey(PointKey, PointKey);

impl LineKey {
    /// Build the key from two endpoint keys in either order.
    #[inline]
    pub fn new(a: PointKey, b: PointKey) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    /// The lower and higher endpoint keys.
    #[inline]
    pub fn endpoints(&self) -> (PointKey, PointKey) {
        (self.0, self.1)
    }
}

/// Handle to a point interned in a [`PointCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

impl PointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena mapping point keys to a single authoritative point.
///
/// The first point interned under a key is the one every later lookup
/// resolves to.
#[derive(Debug, Clone, Default)]
pub struct PointCache {
    ids: HashMap<PointKey, PointId>,
    points: Vec<Point3<f64>>,
    keys: Vec<PointKey>,
}

impl PointCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with room for `capacity` distinct points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashMap::with_capacity(capacity),
            points: Vec::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
        }
    }

    /// Return the id for `p`, adding it if no point shares its key.
    pub fn intern(&mut self, p: Point3<f64>) -> PointId {
        let key = PointKey::new(&p);
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = PointId(self.points.len() as u32);
        self.ids.insert(key, id);
        self.points.push(p);
        self.keys.push(key);
        id
    }

    #[inline]
    pub fn point(&self, id: PointId) -> Point3<f64> {
        self.points[id.index()]
    }

    #[inline]
    pub fn key(&self, id: PointId) -> PointKey {
        self.keys[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build a line between two interned points.
    ///
    /// Endpoints are stored in key order. Returns `None` when both ids are
    /// the same point, since a zero-length line carries no contour.
    pub fn line(&self, a: PointId, b: PointId, edge: bool, coplanar: bool) -> Option<Line> {
        if a == b {
            return None;
        }
        let (ka, kb) = (self.key(a), self.key(b));
        let (a, b) = if ka <= kb { (a, b) } else { (b, a) };
        Some(Line {
            a,
            b,
            key: LineKey::new(ka, kb),
            edge,
            coplanar,
        })
    }
}

/// An undirected segment of a plane's line soup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// Endpoint with the lower key.
    pub a: PointId,
    /// Endpoint with the higher key.
    pub b: PointId,
    pub key: LineKey,
    /// Lies along a genuine triangle edge rather than across a face.
    pub edge: bool,
    /// Part of a face lying in the cutting plane. Plane intersection drops
    /// such faces, so intersected lines never set it.
    pub coplanar: bool,
}

impl Line {
    /// The endpoint opposite `p`, if `p` is an endpoint.
    #[inline]
    pub fn other(&self, p: PointId) -> Option<PointId> {
        if p == self.a {
            Some(self.b)
        } else if p == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Segment length.
    pub fn length(&self, cache: &PointCache) -> f64 {
        (cache.point(self.b) - cache.point(self.a)).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_key_quantizes() {
        let a = PointKey::new(&Point3::new(1.0, 2.0, 3.0));
        let b = PointKey::new(&Point3::new(1.000_000_2, 2.0, 3.0));
        let c = PointKey::new(&Point3::new(1.000_01, 2.0, 3.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_line_key_symmetry() {
        let mut cache = PointCache::new();
        let p = cache.intern(Point3::new(0.0, 0.0, 1.0));
        let q = cache.intern(Point3::new(3.0, -1.0, 1.0));
        let forward = cache.line(p, q, false, false).unwrap();
        let reverse = cache.line(q, p, false, false).unwrap();
        assert_eq!(forward.key, reverse.key);
        assert_eq!((forward.a, forward.b), (reverse.a, reverse.b));
    }

    #[test]
    fn test_intern_shares_identity() {
        let mut cache = PointCache::new();
        let a = cache.intern(Point3::new(0.5, 0.5, 2.0));
        let b = cache.intern(Point3::new(0.500_000_1, 0.5, 2.0));
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.point(b), Point3::new(0.5, 0.5, 2.0));
        let c = cache.intern(Point3::new(9.0, 0.5, 2.0));
        assert_ne!(a, c);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.key(c), PointKey::new(&Point3::new(9.0, 0.5, 2.0)));
    }

    #[test]
    fn test_zero_length_line_rejected() {
        let mut cache = PointCache::new();
        let a = cache.intern(Point3::new(1.0, 1.0, 1.0));
        assert!(cache.line(a, a, true, false).is_none());
    }

    #[test]
    fn test_line_other_endpoint() {
        let mut cache = PointCache::new();
        let a = cache.intern(Point3::new(0.0, 0.0, 0.0));
        let b = cache.intern(Point3::new(0.0, 4.0, 0.0));
        let c = cache.intern(Point3::new(1.0, 4.0, 0.0));
        let line = cache.line(a, b, false, false).unwrap();
        assert_eq!(line.other(a), Some(b));
        assert_eq!(line.other(b), Some(a));
        assert_eq!(line.other(c), None);
        assert!((line.length(&cache) - 4.0).abs() < 1e-12);
    }
}
