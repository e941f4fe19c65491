//! Bridging of open chains.
//!
//! Meshes that are not watertight leave chains with dangling ends. The
//! bridger repeatedly joins the globally closest pair of chain ends that lies
//! within the current gap tolerance. When nothing is close enough, the
//! tolerance grows to the smallest gap seen, up to `bridge_gap_max` and for
//! at most `max_bridge_iterations` escalations. Whatever is still open at
//! that point is returned as open polygons.

use nalgebra::Point3;
use tracing::{debug, warn};

use crate::error::SliceIssue;
use crate::params::SliceParams;
use crate::polygon::Polygon;

/// Result of [`bridge_chains`].
#[derive(Debug, Default)]
pub struct BridgeOutcome {
    pub closed: Vec<Polygon>,
    pub open: Vec<Polygon>,
    /// Number of chain-to-chain joins performed.
    pub merges: usize,
    pub issues: Vec<SliceIssue>,
}

/// Which ends of two chains face each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    /// The chain's own head and tail.
    Itself,
    TailHead,
    TailTail,
    HeadTail,
    HeadHead,
}

#[derive(Debug, Clone, Copy)]
struct Gap {
    distance: f64,
    i: usize,
    j: usize,
    join: Join,
}

/// Join open chains into closed polygons where the gaps allow it.
pub fn bridge_chains(chains: Vec<Vec<Point3<f64>>>, z: f64, params: &SliceParams) -> BridgeOutcome {
    let mut out = BridgeOutcome::default();
    let mut live: Vec<Option<Vec<Point3<f64>>>> = chains
        .into_iter()
        .filter(|c| c.len() >= 2)
        .map(Some)
        .collect();

    let mut tolerance = params.bridge_gap;
    let mut escalations = 0;

    while let Some(gap) = closest_gap(&live) {
        if gap.distance > tolerance {
            escalations += 1;
            if gap.distance > params.bridge_gap_max || escalations > params.max_bridge_iterations {
                break;
            }
            debug!(
                target: "mesh_slicer::slice",
                z,
                from = tolerance,
                to = gap.distance,
                "Escalating bridge tolerance"
            );
            tolerance = gap.distance;
            continue;
        }

        if gap.join == Join::Itself {
            if let Some(chain) = live[gap.i].take() {
                close_chain(chain, params, &mut out);
            }
            continue;
        }

        let (Some(a), Some(b)) = (live[gap.i].take(), live[gap.j].take()) else {
            continue;
        };
        let merged = join_chains(a, b, gap.join, params.join_precision);
        out.merges += 1;

        let ends = end_gap(&merged);
        if merged.len() >= 3 && ends <= params.bridge_close {
            close_chain(merged, params, &mut out);
        } else {
            live[gap.i] = Some(merged);
        }
    }

    for chain in live.into_iter().flatten() {
        let gap = end_gap(&chain);
        warn!(
            target: "mesh_slicer::slice",
            z,
            points = chain.len(),
            gap,
            "Chain left open after bridging"
        );
        out.issues.push(SliceIssue::UnclosedChain {
            z,
            points: chain.len(),
            gap,
        });
        let mut polygon = Polygon::new_open(chain);
        polygon.clean(params.clean_tolerance);
        out.open.push(polygon);
    }

    out
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (b - a).xy().norm()
}

fn end_gap(chain: &[Point3<f64>]) -> f64 {
    match (chain.first(), chain.last()) {
        (Some(h), Some(t)) => distance(h, t),
        _ => f64::INFINITY,
    }
}

/// Closest pair of ends over all live chains. Ties keep the first found.
fn closest_gap(live: &[Option<Vec<Point3<f64>>>]) -> Option<Gap> {
    let mut best: Option<Gap> = None;
    let mut consider = |gap: Gap| match best {
        Some(b) if gap.distance >= b.distance => {}
        _ => best = Some(gap),
    };

    for (i, a) in live.iter().enumerate() {
        let Some(a) = a else { continue };
        let (Some(ah), Some(at)) = (a.first(), a.last()) else {
            continue;
        };
        if a.len() >= 3 {
            consider(Gap {
                distance: distance(ah, at),
                i,
                j: i,
                join: Join::Itself,
            });
        }
        for (j, b) in live.iter().enumerate().skip(i + 1) {
            let Some(b) = b else { continue };
            let (Some(bh), Some(bt)) = (b.first(), b.last()) else {
                continue;
            };
            for (join, p, q) in [
                (Join::TailHead, at, bh),
                (Join::TailTail, at, bt),
                (Join::HeadTail, ah, bt),
                (Join::HeadHead, ah, bh),
            ] {
                consider(Gap {
                    distance: distance(p, q),
                    i,
                    j,
                    join,
                });
            }
        }
    }
    best
}

/// Concatenate two chains so the facing ends meet.
fn join_chains(
    mut a: Vec<Point3<f64>>,
    mut b: Vec<Point3<f64>>,
    join: Join,
    precision: f64,
) -> Vec<Point3<f64>> {
    let (mut first, second) = match join {
        Join::TailHead | Join::Itself => (a, b),
        Join::TailTail => {
            b.reverse();
            (a, b)
        }
        Join::HeadTail => (b, a),
        Join::HeadHead => {
            a.reverse();
            (a, b)
        }
    };
    let skip = match (first.last(), second.first()) {
        (Some(p), Some(q)) if distance(p, q) <= precision => 1,
        _ => 0,
    };
    first.extend(second.into_iter().skip(skip));
    first
}

fn close_chain(mut chain: Vec<Point3<f64>>, params: &SliceParams, out: &mut BridgeOutcome) {
    if chain.len() > 1 && end_gap(&chain) <= params.join_precision {
        chain.pop();
    }
    let mut polygon = Polygon::new(chain);
    polygon.clean(params.clean_tolerance);
    if polygon.len() >= 3 {
        out.closed.push(polygon);
    } else {
        polygon.open = true;
        out.open.push(polygon);
    }
}
