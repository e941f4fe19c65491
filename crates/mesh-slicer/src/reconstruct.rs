//! Path reconstruction.
//!
//! Turns a deduplicated line soup into closed polygons and open chains.
//!
//! Line endpoints are first snapped onto a coarser grid (`join_precision`)
//! and become graph nodes. Searches start from dangling ends, then from
//! simple chain points, then from junctions. A search walks unused edges
//! depth-first. At a fork every continuation is explored on its own branch,
//! and each branch carries its own copy of the path and visited set, so a
//! branch that is not chosen leaves nothing behind to roll back. Only the
//! edges of the selected candidate are consumed.
//!
//! Selection per search:
//! - if any branch closed a cycle, the closed cycle with the greatest
//!   perimeter wins (first discovered on ties)
//! - otherwise the longest open chain is taken and handed to the bridger

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{trace, warn};

use crate::canon::{KEY_SCALE, Line, PointCache, PointKey};
use crate::error::SliceIssue;
use crate::params::SliceParams;
use crate::polygon::Polygon;

type NodeId = usize;
type EdgeId = usize;

/// Output of [`reconstruct_paths`].
#[derive(Debug, Default)]
pub struct Reconstruction {
    /// Cycles, cleaned, with at least three points.
    pub closed: Vec<Polygon>,
    /// Chains that end at a dangling point, in discovery order.
    pub open: Vec<Vec<Point3<f64>>>,
    /// Searches that hit the candidate ceiling.
    pub issues: Vec<SliceIssue>,
}

/// Point adjacency graph over snapped line endpoints.
#[derive(Debug, Default)]
pub struct PathGraph {
    points: Vec<Point3<f64>>,
    /// Per node, `(neighbor, edge)` in line order.
    links: Vec<Vec<(NodeId, EdgeId)>>,
    edges: Vec<(NodeId, NodeId)>,
}

impl PathGraph {
    /// Build the graph, snapping endpoints to `join_precision`.
    ///
    /// Lines that collapse to a point or repeat an existing edge after
    /// snapping are skipped.
    pub fn build(lines: &[Line], cache: &PointCache, join_precision: f64) -> Self {
        let scale = (1.0 / join_precision).min(KEY_SCALE);
        let mut ids: HashMap<PointKey, NodeId> = HashMap::with_capacity(lines.len());
        let mut seen: HashMap<(NodeId, NodeId), EdgeId> = HashMap::with_capacity(lines.len());
        let mut graph = PathGraph::default();

        for line in lines {
            let mut node = |p: Point3<f64>| -> NodeId {
                *ids.entry(PointKey::with_scale(&p, scale)).or_insert_with(|| {
                    graph.points.push(p);
                    graph.links.push(Vec::new());
                    graph.points.len() - 1
                })
            };
            let a = node(cache.point(line.a));
            let b = node(cache.point(line.b));
            if a == b {
                continue;
            }
            let pair = (a.min(b), a.max(b));
            if seen.contains_key(&pair) {
                continue;
            }
            let edge = graph.edges.len();
            seen.insert(pair, edge);
            graph.edges.push(pair);
            graph.links[a].push((b, edge));
            graph.links[b].push((a, edge));
        }
        graph
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges at `node` not yet consumed.
    fn live_degree(&self, node: NodeId, used: &[bool]) -> usize {
        self.links[node].iter().filter(|(_, e)| !used[*e]).count()
    }

    fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        (self.points[b] - self.points[a]).xy().norm()
    }
}

/// A partial walk. Cloned whenever the walk forks.
#[derive(Debug, Clone)]
struct Branch {
    path: Vec<NodeId>,
    edges: Vec<EdgeId>,
    /// Position of each node in `path`.
    on_path: HashMap<NodeId, usize>,
    length: f64,
}

impl Branch {
    fn start(node: NodeId) -> Self {
        let mut on_path = HashMap::new();
        on_path.insert(node, 0);
        Self {
            path: vec![node],
            edges: Vec::new(),
            on_path,
            length: 0.0,
        }
    }

    fn extend(&mut self, graph: &PathGraph, next: NodeId, edge: EdgeId) {
        let at = self.path[self.path.len() - 1];
        self.length += graph.distance(at, next);
        self.on_path.insert(next, self.path.len());
        self.path.push(next);
        self.edges.push(edge);
    }
}

#[derive(Debug)]
struct Candidate {
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    length: f64,
    closed: bool,
}

/// Everything one search found.
struct Search {
    closed: Vec<Candidate>,
    open: Vec<Candidate>,
    capped: bool,
}

impl Search {
    fn count(&self) -> usize {
        self.closed.len() + self.open.len()
    }

    /// Pick the winning candidate. Ties keep the earliest discovered.
    fn select(self) -> Option<Candidate> {
        let pool = if self.closed.is_empty() {
            self.open
        } else {
            self.closed
        };
        let mut best: Option<Candidate> = None;
        for candidate in pool {
            match &best {
                Some(b) if candidate.length <= b.length => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}

/// Recover polygons and open chains from a deduplicated line soup.
pub fn reconstruct_paths(
    lines: &[Line],
    cache: &PointCache,
    z: f64,
    params: &SliceParams,
) -> Reconstruction {
    let graph = PathGraph::build(lines, cache, params.join_precision);
    let mut used = vec![false; graph.edge_count()];
    let mut out = Reconstruction::default();

    // Seed classes in order: dangling ends, chain points, junctions.
    let seed_classes: [fn(usize) -> bool; 3] = [|d| d == 1, |d| d == 2, |d| d > 2];

    loop {
        let mut consumed = false;
        for class in seed_classes {
            for seed in 0..graph.node_count() {
                let degree = graph.live_degree(seed, &used);
                if degree == 0 || !class(degree) {
                    continue;
                }
                let Some(mut chosen) = run_search(&graph, &used, seed, z, params, &mut out) else {
                    continue;
                };
                // An open walk from the middle of a chain only covers one
                // side. Walk again from the dangling end it found.
                if !chosen.closed && degree >= 2 {
                    if let Some(&end) = chosen.nodes.last() {
                        if let Some(full) = run_search(&graph, &used, end, z, params, &mut out) {
                            chosen = full;
                        }
                    }
                }
                for &e in &chosen.edges {
                    used[e] = true;
                }
                consumed = true;
                emit(&graph, chosen, params, &mut out);
            }
        }
        if !consumed {
            break;
        }
    }

    trace!(
        target: "mesh_slicer::slice",
        z,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        closed = out.closed.len(),
        open = out.open.len(),
        "Paths reconstructed"
    );
    out
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn run_search(
    graph: &PathGraph,
    used: &[bool],
    seed: NodeId,
    z: f64,
    params: &SliceParams,
    out: &mut Reconstruction,
) -> Option<Candidate> {
    let search = search_from(graph, used, seed, params.max_paths);
    if search.capped {
        warn!(
            target: "mesh_slicer::slice",
            z,
            paths = search.count(),
            lines = graph.edge_count(),
            "Path search hit candidate ceiling, using best result so far"
        );
        out.issues.push(SliceIssue::ExcessivePaths {
            z,
            paths: search.count(),
            lines: graph.edge_count(),
        });
    }
    search.select()
}

/// Depth-first exploration of every continuation from `seed`.
fn search_from(graph: &PathGraph, used: &[bool], seed: NodeId, max_paths: usize) -> Search {
    let mut search = Search {
        closed: Vec::new(),
        open: Vec::new(),
        capped: false,
    };
    let mut stack = vec![Branch::start(seed)];

    while let Some(mut branch) = stack.pop() {
        if search.count() >= max_paths {
            search.capped = true;
            break;
        }

        loop {
            let at = branch.path[branch.path.len() - 1];
            let prev = branch.path.len().checked_sub(2).map(|i| branch.path[i]);

            let mut next: Vec<(NodeId, EdgeId)> = Vec::new();
            let mut closed_here = false;
            for &(to, edge) in &graph.links[at] {
                if used[edge] || Some(to) == prev {
                    continue;
                }
                if let Some(&pos) = branch.on_path.get(&to) {
                    let nodes = branch.path[pos..].to_vec();
                    let mut edges = branch.edges[pos..].to_vec();
                    edges.push(edge);
                    let mut length = graph.distance(at, to);
                    for w in nodes.windows(2) {
                        length += graph.distance(w[0], w[1]);
                    }
                    closed_here = true;
                    search.closed.push(Candidate {
                        nodes,
                        edges,
                        length,
                        closed: true,
                    });
                } else {
                    next.push((to, edge));
                }
            }

            // A chain point seed is walked one way only; the other way
            // closes the same cycle.
            if branch.path.len() == 1 && next.len() == 2 {
                next.truncate(1);
            }

            match next.len() {
                0 => {
                    if !closed_here && branch.path.len() >= 2 {
                        search.open.push(Candidate {
                            nodes: branch.path,
                            edges: branch.edges,
                            length: branch.length,
                            closed: false,
                        });
                    }
                    break;
                }
                1 => {
                    let (to, edge) = next[0];
                    branch.extend(graph, to, edge);
                }
                _ => {
                    // Siblings go on the stack in reverse so the first
                    // continuation is explored first.
                    for &(to, edge) in next[1..].iter().rev() {
                        let mut fork = branch.clone();
                        fork.extend(graph, to, edge);
                        stack.push(fork);
                    }
                    let (to, edge) = next[0];
                    branch.extend(graph, to, edge);
                }
            }

            if search.count() >= max_paths {
                search.capped = true;
                break;
            }
        }

        if search.capped {
            break;
        }
    }

    search
}

fn emit(graph: &PathGraph, chosen: Candidate, params: &SliceParams, out: &mut Reconstruction) {
    let points: Vec<Point3<f64>> = chosen.nodes.iter().map(|&n| graph.points[n]).collect();
    if chosen.closed {
        let mut polygon = Polygon::new(points);
        polygon.clean(params.clean_tolerance);
        if polygon.len() >= 3 {
            out.closed.push(polygon);
        }
    } else {
        out.open.push(points);
    }
}
