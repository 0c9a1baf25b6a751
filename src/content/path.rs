//! Polygon graph used to merge and thin out filled paths
//!
//! Every `m ... l ... h` run becomes a closed cycle of vertices. Vertices live
//! in one arena and point at their neighbours by index, so splicing two
//! cycles together or dropping a vertex is a matter of rewriting indices.

use std::fmt::Write as _;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use super::matrix::Number;

type KeyF64 = OrderedFloat<f64>;

/// Path construction operator a vertex was drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOp {
    MoveTo,
    LineTo,
}

impl PathOp {
    pub fn from_operator(operator: &str) -> Option<Self> {
        match operator {
            "m" => Some(PathOp::MoveTo),
            "l" => Some(PathOp::LineTo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathOp::MoveTo => "m",
            PathOp::LineTo => "l",
        }
    }
}

/// One point of a path run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathNode {
    pub x: f64,
    pub y: f64,
    pub op: PathOp,
}

impl PathNode {
    pub fn new(x: f64, y: f64, op: PathOp) -> Self {
        Self { x, y, op }
    }

    /// Build from the `x y` operands of an `m` or `l` operator
    pub fn from_operands(operands: &[&str], op: PathOp) -> Option<Self> {
        match operands {
            [x, y] => Some(Self::new(x.parse().ok()?, y.parse().ok()?, op)),
            _ => None,
        }
    }

    fn write_as(&self, op: PathOp, out: &mut String) {
        let _ = write!(out, "{} {} {} ", Number(self.x), Number(self.y), op.as_str());
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    node: PathNode,
    prev: usize,
    next: usize,
    live: bool,
}

/// A set of closed polygons sharing one fill colour
#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    vertices: Vec<Vertex>,
}

impl PathGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run as a closed cycle, the last point joining the first
    ///
    /// Runs of fewer than two points are ignored.
    pub fn add_run(&mut self, run: &[PathNode]) {
        let n = run.len();
        if n < 2 {
            return;
        }

        let base = self.vertices.len();
        for (i, node) in run.iter().enumerate() {
            self.vertices.push(Vertex {
                node: *node,
                prev: base + (i + n - 1) % n,
                next: base + (i + 1) % n,
                live: true,
            });
        }
    }

    /// Number of live vertices
    pub fn len(&self) -> usize {
        self.vertices.iter().filter(|v| v.live).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live cycles as point lists, each starting from its lowest-index vertex
    #[cfg(test)]
    fn cycles(&self) -> Vec<Vec<(f64, f64)>> {
        let mut cycles = Vec::new();
        self.walk_cycles(|cycle| {
            cycles.push(cycle.iter().map(|&i| (self.vertices[i].node.x, self.vertices[i].node.y)).collect())
        });
        cycles
    }

    /// Merge fragments that share an edge, then drop collinear vertices
    pub fn optimize(&mut self) -> &mut Self {
        self.reconnect_coincident();
        self.remove_collinear();
        self
    }

    /// Emit every cycle as `m`/`l`/`h`, then a single `B`
    ///
    /// Nothing is written when fewer than two vertices remain.
    pub fn write_fill(&self, out: &mut String) {
        if self.len() < 2 {
            return;
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }

        self.walk_cycles(|cycle| {
            for (k, &i) in cycle.iter().enumerate() {
                let op = if k == 0 { PathOp::MoveTo } else { PathOp::LineTo };
                self.vertices[i].node.write_as(op, out);
            }
            out.push_str("h\n");
        });
        out.push_str("B\n");
    }

    fn walk_cycles<F: FnMut(&[usize])>(&self, mut visit: F) {
        let mut visited = vec![false; self.vertices.len()];
        let mut cycle = Vec::new();

        for start in 0..self.vertices.len() {
            if !self.vertices[start].live || visited[start] {
                continue;
            }

            cycle.clear();
            let mut i = start;
            while !visited[i] {
                visited[i] = true;
                cycle.push(i);
                i = self.vertices[i].next;
            }
            visit(&cycle);
        }
    }

    fn connect(&mut self, from: usize, to: usize) {
        self.vertices[from].next = to;
        self.vertices[to].prev = from;
    }

    fn same_point(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.vertices[a].node, &self.vertices[b].node);
        a.x == b.x && a.y == b.y
    }

    /// Splice the cycles through coincident vertices `a` and `b` when `a`'s
    /// successor sits where `b`'s predecessor does
    fn reconnect(&mut self, a: usize, b: usize) -> bool {
        let a_next = self.vertices[a].next;
        let b_prev = self.vertices[b].prev;
        if !self.same_point(a_next, b_prev) {
            return false;
        }
        self.connect(b_prev, a_next);
        self.connect(a, b);
        true
    }

    fn reconnect_coincident(&mut self) {
        let mut buckets: IndexMap<KeyF64, IndexMap<KeyF64, Vec<usize>>> = IndexMap::new();
        for (i, v) in self.vertices.iter().enumerate().filter(|(_, v)| v.live) {
            buckets
                .entry(OrderedFloat(v.node.y))
                .or_default()
                .entry(OrderedFloat(v.node.x))
                .or_default()
                .push(i);
        }

        for row in buckets.values_mut() {
            for bucket in row.values_mut() {
                while let Some(n1) = bucket.pop() {
                    for &n2 in bucket.iter() {
                        if self.reconnect(n1, n2) {
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Exact test: a vertex goes when `(prev - v) x (next - v)` is zero
    fn remove_collinear(&mut self) {
        for i in 0..self.vertices.len() {
            if !self.vertices[i].live {
                continue;
            }

            let Vertex { node, prev, next, .. } = self.vertices[i];
            let p = self.vertices[prev].node;
            let n = self.vertices[next].node;
            let (d1x, d1y) = (p.x - node.x, p.y - node.y);
            let (d2x, d2y) = (n.x - node.x, n.y - node.y);

            if d1x * d2y == d2x * d1y {
                self.connect(prev, next);
                self.vertices[i].live = false;
            }
        }
    }
}

/// Emit a run as an open polyline, each point with its own operator
///
/// Nothing is written for an empty run.
pub fn write_stroke(run: &[PathNode], close: bool, out: &mut String) {
    if run.is_empty() {
        return;
    }
    for node in run {
        node.write_as(node.op, out);
    }
    if close {
        out.push_str("h ");
    }
    out.push_str("S\n");
}
