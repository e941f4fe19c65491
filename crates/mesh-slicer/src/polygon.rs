//! Planar polygons produced by slicing.
//!
//! Points keep their full 3D position (all share the slice Z), but every
//! geometric predicate here works in the XY plane.

use nalgebra::Point3;

use crate::params::Winding;

/// Axis-aligned bounds of a polygon in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds2 {
    /// Empty bounds that any point will expand.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Grow to include a point.
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Width (X extent).
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height (Y extent).
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Whether `other` fits inside these bounds grown by `tolerance`.
    pub fn contains(&self, other: &Bounds2, tolerance: f64) -> bool {
        other.min_x >= self.min_x - tolerance
            && other.min_y >= self.min_y - tolerance
            && other.max_x <= self.max_x + tolerance
            && other.max_y <= self.max_y + tolerance
    }
}

/// A polygon in one slice.
///
/// Closed polygons imply an edge from the last point back to the first.
/// Open polygons are chains the bridger could not close.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point3<f64>>,
    pub open: bool,
    /// Polygons directly contained by this one.
    pub inner: Vec<Polygon>,
    /// Nesting level. Zero for outermost polygons.
    pub depth: usize,
}

impl Polygon {
    /// Create a closed polygon.
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            open: false,
            inner: Vec::new(),
            depth: 0,
        }
    }

    /// Create an open polygon.
    pub fn new_open(points: Vec<Point3<f64>>) -> Self {
        Self {
            open: true,
            ..Self::new(points)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over edges as point pairs, including the closing edge when
    /// the polygon is closed.
    pub fn edges(&self) -> impl Iterator<Item = (Point3<f64>, Point3<f64>)> + '_ {
        let n = self.points.len();
        let count = if self.open || n < 2 { n.saturating_sub(1) } else { n };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace sum `Σ (x2 - x1)(y2 + y1)` over the closed outline.
    ///
    /// Positive for clockwise polygons. Open polygons are measured as if closed.
    pub fn area2(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += (b.x - a.x) * (b.y + a.y);
        }
        sum
    }

    /// Signed area, positive for counter-clockwise polygons.
    pub fn signed_area(&self) -> f64 {
        -self.area2() / 2.0
    }

    /// Unsigned area of the outline.
    pub fn area(&self) -> f64 {
        self.area2().abs() / 2.0
    }

    /// Area with the nested polygons taken into account.
    ///
    /// Holes subtract and islands inside holes add back.
    pub fn area_deep(&self) -> f64 {
        self.area() - self.inner.iter().map(Polygon::area_deep).sum::<f64>()
    }

    /// Length of the outline, including the closing edge when closed.
    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| (b - a).xy().norm()).sum()
    }

    pub fn is_clockwise(&self) -> bool {
        self.area2() > 0.0
    }

    pub fn winding(&self) -> Winding {
        if self.is_clockwise() {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }

    /// Reverse the point order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Reverse the point order if it does not match `winding`.
    pub fn set_winding(&mut self, winding: Winding) {
        if self.points.len() >= 3 && self.winding() != winding {
            self.reverse();
        }
    }

    pub fn bounds(&self) -> Bounds2 {
        let mut bounds = Bounds2::empty();
        for p in &self.points {
            bounds.include(p.x, p.y);
        }
        bounds
    }

    /// Even-odd point containment in the XY plane.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > y) != (pj.y > y) {
                let cross_x = (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x;
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Distance from a point to the nearest edge.
    pub fn distance_to_boundary(&self, x: f64, y: f64) -> f64 {
        self.edges()
            .map(|(a, b)| segment_distance(x, y, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Whether every point of `self` lies inside `outer` or within
    /// `tolerance` of its boundary.
    pub fn is_inside(&self, outer: &Polygon, tolerance: f64) -> bool {
        if self.points.is_empty() || outer.points.len() < 3 {
            return false;
        }
        if !outer.bounds().contains(&self.bounds(), tolerance) {
            return false;
        }
        self.points.iter().all(|p| {
            outer.contains_point(p.x, p.y) || outer.distance_to_boundary(p.x, p.y) <= tolerance
        })
    }

    /// Remove repeated and collinear points.
    ///
    /// Points closer than `tolerance` to their predecessor are dropped, as
    /// are points whose neighbours span a cross product below `tolerance`.
    /// Open polygons keep both end points.
    pub fn clean(&mut self, tolerance: f64) {
        let mut points: Vec<Point3<f64>> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if let Some(last) = points.last() {
                if (p - last).xy().norm() <= tolerance {
                    continue;
                }
            }
            points.push(p);
        }
        if !self.open {
            while points.len() > 1 {
                let (first, last) = (points[0], points[points.len() - 1]);
                if (last - first).xy().norm() <= tolerance {
                    points.pop();
                } else {
                    break;
                }
            }
        }

        loop {
            let n = points.len();
            if n < 3 {
                break;
            }
            let (start, end) = if self.open { (1, n - 1) } else { (0, n) };
            let collinear = (start..end).find(|&i| {
                let prev = points[(i + n - 1) % n];
                let next = points[(i + 1) % n];
                cross2(&prev, &points[i], &next).abs() < tolerance
            });
            match collinear {
                Some(i) => {
                    points.remove(i);
                }
                None => break,
            }
        }
        self.points = points;
    }

    /// Move this polygon and all nested polygons into a flat list,
    /// parents before children.
    pub fn flatten(mut self) -> Vec<Polygon> {
        let inner = std::mem::take(&mut self.inner);
        let mut out = vec![self];
        for child in inner {
            out.extend(child.flatten());
        }
        out
    }

    /// Visit this polygon and all nested polygons, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Polygon)) {
        visit(self);
        for child in &self.inner {
            child.walk(visit);
        }
    }

    /// Number of polygons in this tree, including self.
    pub fn tree_size(&self) -> usize {
        1 + self.inner.iter().map(Polygon::tree_size).sum::<usize>()
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Z component of `(b - a) × (c - b)`.
#[inline]
fn cross2(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

fn segment_distance(x: f64, y: f64, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((x - a.x) * dx + (y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (px, py) = (a.x + t * dx, a.y + t * dy);
    ((x - px).powi(2) + (y - py).powi(2)).sqrt()
}
