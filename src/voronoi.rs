//! Build the Voronoi side of the dual graph from delaunator output.
//!
//! Each Delaunay triangle becomes one Voronoi node at its circumcenter
//! (centroid when the triangle is degenerate). Nodes are held in an arena
//! and addressed by stable index; simplification later appends synthetic
//! nodes and moves positions, but never invalidates an index.

use log::warn;

use crate::affiliation::Affiliation;
use crate::geometry::{circumcenter, Point};
use crate::poisson::MapPoint;

/// Sentinel value for "no reference" (like null).
pub const NONE: usize = usize::MAX;

/// One input point of the triangulation: position, affiliation, and the
/// triangles incident to it (appended during graph construction, never
/// removed).
#[derive(Debug, Clone)]
pub struct Vertex {
    pub pos: Point,
    pub affiliation: Affiliation,
    /// Indices of the triangles this vertex belongs to.
    pub triangles: Vec<usize>,
}

impl Vertex {
    fn new(point: &MapPoint) -> Self {
        Self {
            pos: point.pos,
            affiliation: point.affiliation.clone(),
            triangles: Vec::new(),
        }
    }
}

/// A Voronoi node: the dual of one Delaunay triangle.
#[derive(Debug, Clone)]
pub struct VoronoiNode {
    /// Index in the nodes array.
    pub index: usize,
    /// Circumcenter of the triangle, or its centroid when degenerate.
    pub pos: Point,
    /// The triangle's vertex indices, CCW. All `NONE` for synthetic nodes
    /// appended by simplification.
    pub vertices: [usize; 3],
    /// Adjacent node indices (triangles sharing two vertices).
    pub neighbors: Vec<usize>,
}

impl VoronoiNode {
    fn new(index: usize, pos: Point, vertices: [usize; 3]) -> Self {
        Self {
            index,
            pos,
            vertices,
            neighbors: Vec::new(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.vertices[0] == NONE
    }
}

/// Arena of vertices and Voronoi nodes for one pipeline pass.
#[derive(Debug, Clone, Default)]
pub struct VoronoiGraph {
    pub vertices: Vec<Vertex>,
    pub nodes: Vec<VoronoiNode>,
    /// How many triangles needed the centroid fallback.
    pub degenerate_triangles: usize,
}

impl VoronoiGraph {
    #[inline]
    pub fn node_pos(&self, id: usize) -> Point {
        self.nodes[id].pos
    }

    #[inline]
    pub fn set_node_pos(&mut self, id: usize, pos: Point) {
        self.nodes[id].pos = pos;
    }

    #[inline]
    pub fn vertex_pos(&self, id: usize) -> Point {
        self.vertices[id].pos
    }

    /// Append a synthetic node (no backing triangle). Returns its id.
    pub fn add_node(&mut self, pos: Point) -> usize {
        let id = self.nodes.len();
        self.nodes.push(VoronoiNode::new(id, pos, [NONE, NONE, NONE]));
        id
    }

    /// Distinct affiliations among a node's three vertices.
    pub fn node_affiliations(&self, id: usize) -> Vec<&Affiliation> {
        let mut out: Vec<&Affiliation> = Vec::with_capacity(3);
        for &v in &self.nodes[id].vertices {
            if v == NONE {
                continue;
            }
            let aff = &self.vertices[v].affiliation;
            if !out.contains(&aff) {
                out.push(aff);
            }
        }
        out
    }
}

/// Build the Voronoi node arena from input points and a flat triangle index
/// array (groups of three vertex indices, any winding).
pub fn build_voronoi_graph(points: &[MapPoint], triangles: &[usize]) -> VoronoiGraph {
    let mut graph = VoronoiGraph {
        vertices: points.iter().map(Vertex::new).collect(),
        nodes: Vec::with_capacity(triangles.len() / 3),
        degenerate_triangles: 0,
    };

    // Pass 1: one node per triangle, vertex incidence lists as we go.
    let num_triangles = triangles.len() / 3;
    for t in 0..num_triangles {
        let mut tri = [
            triangles[3 * t],
            triangles[3 * t + 1],
            triangles[3 * t + 2],
        ];

        // Normalize winding to CCW so later left-of-line tests agree.
        let a = graph.vertices[tri[0]].pos;
        let b = graph.vertices[tri[1]].pos;
        let c = graph.vertices[tri[2]].pos;
        if (b - a).cross(&(c - a)) < 0.0 {
            tri.swap(1, 2);
        }

        let (pos, degenerate) = circumcenter(&a, &b, &c);
        if degenerate {
            graph.degenerate_triangles += 1;
        }

        for &v in &tri {
            graph.vertices[v].triangles.push(t);
        }
        graph.nodes.push(VoronoiNode::new(t, pos, tri));
    }

    if graph.degenerate_triangles > 0 {
        warn!(
            "{} degenerate (collinear) triangles fell back to centroid nodes",
            graph.degenerate_triangles
        );
    }

    // Pass 2: node adjacency. Two triangles are neighbors iff they share
    // exactly two vertices, so it suffices to intersect each vertex's
    // incidence list with its two siblings' lists.
    for t in 0..num_triangles {
        let tri = graph.nodes[t].vertices;
        let mut neighbors: Vec<usize> = Vec::with_capacity(3);
        for i in 0..3 {
            let va = &graph.vertices[tri[i]].triangles;
            let vb = &graph.vertices[tri[(i + 1) % 3]].triangles;
            for &other in va {
                if other != t && vb.contains(&other) && !neighbors.contains(&other) {
                    neighbors.push(other);
                }
            }
        }
        graph.nodes[t].neighbors = neighbors;
    }

    graph
}
