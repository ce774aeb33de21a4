//! Border edge extraction.
//!
//! Walks adjacent Voronoi node pairs and keeps the ones that separate two
//! differently-affiliated vertices. Each kept edge records a `closeness`
//! metric: the minimum distance from either generating vertex to the line
//! through the edge's endpoints. Low closeness means the triangulation
//! barely constrains the edge, which later passes use to decide what is
//! safe to prune, relax, or merge.

use std::collections::HashMap;

use crate::affiliation::{pair_is_disinterested, pair_key, Affiliation};
use crate::geometry::{distance_to_line, side_of, Point};
use crate::voronoi::VoronoiGraph;

/// Stable identifier of a border edge. Ids survive splices and splits;
/// a new id is only minted for genuinely new edges.
pub type EdgeId = u64;

/// Mints edge ids. Threaded through every pass that creates edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeIdGen {
    next: EdgeId,
}

impl EdgeIdGen {
    pub fn next_id(&mut self) -> EdgeId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Cubic-Bezier handles around an edge's endpoints, populated late for
/// smooth rendering. `n1_out` and `n2_in` shape this edge; the `_in`/`_out`
/// twins belong to the neighboring edges' curves through the same nodes.
#[derive(Debug, Clone, Copy)]
pub struct EdgeControls {
    pub n1_in: Point,
    pub n1_out: Point,
    pub n2_in: Point,
    pub n2_out: Point,
}

impl EdgeControls {
    fn reversed(self) -> Self {
        Self {
            n1_in: self.n2_out,
            n1_out: self.n2_in,
            n2_in: self.n1_out,
            n2_out: self.n1_in,
        }
    }
}

/// One directed border edge between two Voronoi nodes.
#[derive(Debug, Clone)]
pub struct BorderEdge {
    pub id: EdgeId,
    /// Endpoint node ids (arena indices into the graph).
    pub n1: usize,
    pub n2: usize,
    /// The two shared vertices whose differing affiliations generated this
    /// edge. `v1` carries `aff1`, `v2` carries `aff2`.
    pub v1: usize,
    pub v2: usize,
    pub aff1: Affiliation,
    pub aff2: Affiliation,
    /// Which affiliation lies left/right of the directed n1->n2 line.
    /// Derived once loop orientation is fixed.
    pub left_affiliation: Option<Affiliation>,
    pub right_affiliation: Option<Affiliation>,
    pub length: f64,
    pub closeness: f64,
    pub controls: Option<EdgeControls>,
}

impl BorderEdge {
    pub fn new(
        id: EdgeId,
        n1: usize,
        n2: usize,
        v1: usize,
        v2: usize,
        graph: &VoronoiGraph,
    ) -> Self {
        let mut edge = Self {
            id,
            n1,
            n2,
            v1,
            v2,
            aff1: graph.vertices[v1].affiliation.clone(),
            aff2: graph.vertices[v2].affiliation.clone(),
            left_affiliation: None,
            right_affiliation: None,
            length: 0.0,
            closeness: 0.0,
            controls: None,
        };
        edge.recompute(graph);
        edge
    }

    /// Re-derive `length` and `closeness` from current node positions.
    /// Must be called after any endpoint moves or is replaced.
    pub fn recompute(&mut self, graph: &VoronoiGraph) {
        let a = graph.node_pos(self.n1);
        let b = graph.node_pos(self.n2);
        self.length = a.distance(&b);
        let d1 = distance_to_line(&a, &b, &graph.vertex_pos(self.v1));
        let d2 = distance_to_line(&a, &b, &graph.vertex_pos(self.v2));
        self.closeness = d1.min(d2);
    }

    /// Flip the edge direction, swapping everything that is orientation
    /// dependent.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.n1, &mut self.n2);
        std::mem::swap(&mut self.v1, &mut self.v2);
        std::mem::swap(&mut self.aff1, &mut self.aff2);
        std::mem::swap(&mut self.left_affiliation, &mut self.right_affiliation);
        if let Some(controls) = self.controls {
            self.controls = Some(controls.reversed());
        }
    }

    /// Determine which generating affiliation lies on which side of the
    /// directed n1->n2 line (screen orientation).
    pub fn derive_sides(&mut self, graph: &VoronoiGraph) {
        let a = graph.node_pos(self.n1);
        let b = graph.node_pos(self.n2);
        if side_of(&a, &b, &graph.vertex_pos(self.v1)) > 0.0 {
            self.right_affiliation = Some(self.aff1.clone());
            self.left_affiliation = Some(self.aff2.clone());
        } else {
            self.right_affiliation = Some(self.aff2.clone());
            self.left_affiliation = Some(self.aff1.clone());
        }
    }

    /// Sorted affiliation-pair bucket key.
    pub fn pair_key(&self) -> String {
        pair_key(&self.aff1, &self.aff2)
    }

    /// True when exactly one side of this edge belongs to the given
    /// faction-level affiliation. Edges with the faction on both sides are
    /// internal hierarchy borders, not part of its territory boundary.
    pub fn bounds_faction(&self, aff: &Affiliation, level: usize) -> bool {
        self.aff1.matches_at_level(aff, level) != self.aff2.matches_at_level(aff, level)
    }
}

/// Registry of three-way junction nodes: nodes whose triangle touches three
/// or more distinct affiliations. Simplification must never move or
/// eliminate them; the registry tracks which edges currently meet at each
/// junction so edge splices can keep it consistent.
#[derive(Debug, Clone, Default)]
pub struct ThreeWayRegistry {
    map: HashMap<usize, Vec<EdgeId>>,
}

impl ThreeWayRegistry {
    pub fn mark(&mut self, node: usize) {
        self.map.entry(node).or_default();
    }

    pub fn is_three_way(&self, node: usize) -> bool {
        self.map.contains_key(&node)
    }

    pub fn touch(&mut self, node: usize, edge: EdgeId) {
        if let Some(edges) = self.map.get_mut(&node) {
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }

    /// Replace every occurrence of `old` with `new` (edge absorbed another
    /// edge or was renamed by a splice).
    pub fn replace_edge(&mut self, old: EdgeId, new: EdgeId) {
        for edges in self.map.values_mut() {
            for e in edges.iter_mut() {
                if *e == old {
                    *e = new;
                }
            }
            edges.dedup();
        }
    }

    /// Replace `old` with two child edges produced by a split, keeping
    /// whichever children actually touch each registered node.
    pub fn replace_edge_with_split(&mut self, old: EdgeId, children: [&BorderEdge; 2]) {
        for (&node, edges) in self.map.iter_mut() {
            if let Some(slot) = edges.iter().position(|&e| e == old) {
                edges.remove(slot);
                for child in children {
                    if (child.n1 == node || child.n2 == node) && !edges.contains(&child.id) {
                        edges.push(child.id);
                    }
                }
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.map.keys().copied()
    }

    pub fn edges_at(&self, node: usize) -> Option<&[EdgeId]> {
        self.map.get(&node).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Everything the extractor produces for one pass.
#[derive(Debug, Clone, Default)]
pub struct BorderEdgeMap {
    /// Raw border edges bucketed by sorted affiliation-pair key.
    pub edges: HashMap<String, Vec<BorderEdge>>,
    /// Border node ids per affiliation key (debug/visualization export).
    pub border_nodes: HashMap<String, Vec<usize>>,
    /// Three-way junction registry.
    pub three_way: ThreeWayRegistry,
    /// Id source for all later edge-creating passes.
    pub id_gen: EdgeIdGen,
}

impl BorderEdgeMap {
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

/// Extract border edges from the Voronoi graph.
pub fn extract_border_edges(graph: &VoronoiGraph) -> BorderEdgeMap {
    let mut out = BorderEdgeMap::default();

    // Classify nodes by how many distinct affiliations touch them.
    // Synthetic nodes have no backing triangle and no affiliations.
    for node in &graph.nodes {
        if node.is_synthetic() {
            continue;
        }
        let affs = graph.node_affiliations(node.index);
        if affs.len() < 2 {
            continue;
        }
        for aff in &affs {
            out.border_nodes
                .entry(aff.key())
                .or_default()
                .push(node.index);
        }
        if affs.len() > 2 {
            out.three_way.mark(node.index);
        }
    }

    // Walk neighbor pairs once (smaller index side only).
    for node in &graph.nodes {
        for &neighbor in &node.neighbors {
            if neighbor <= node.index {
                continue;
            }
            let shared = shared_vertices(graph, node.index, neighbor);
            let Some((v1, v2)) = shared else { continue };

            let aff1 = &graph.vertices[v1].affiliation;
            let aff2 = &graph.vertices[v2].affiliation;
            if aff1 == aff2 || pair_is_disinterested(aff1, aff2) {
                continue;
            }

            let edge = BorderEdge::new(
                out.id_gen.next_id(),
                node.index,
                neighbor,
                v1,
                v2,
                graph,
            );
            out.three_way.touch(edge.n1, edge.id);
            out.three_way.touch(edge.n2, edge.id);
            out.edges.entry(edge.pair_key()).or_default().push(edge);
        }
    }

    out
}

/// The two vertices shared by a pair of adjacent triangles.
fn shared_vertices(graph: &VoronoiGraph, a: usize, b: usize) -> Option<(usize, usize)> {
    let va = graph.nodes[a].vertices;
    let vb = graph.nodes[b].vertices;
    let mut shared = [0usize; 2];
    let mut count = 0;
    for &v in &va {
        if vb.contains(&v) {
            if count == 2 {
                return None;
            }
            shared[count] = v;
            count += 1;
        }
    }
    (count == 2).then_some((shared[0], shared[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poisson::MapPoint;
    use crate::voronoi::build_voronoi_graph;

    fn two_faction_graph() -> VoronoiGraph {
        let points = vec![
            MapPoint::new(Point::new(0.0, 0.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(10.0, 0.0), Affiliation::faction("LC")),
            MapPoint::new(Point::new(5.0, 8.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(15.0, 8.0), Affiliation::faction("LC")),
        ];
        build_voronoi_graph(&points, &[0, 1, 2, 1, 3, 2])
    }

    #[test]
    fn test_extracts_border_between_factions() {
        let graph = two_faction_graph();
        let out = extract_border_edges(&graph);
        assert_eq!(out.edge_count(), 1);
        let edges = out.edges.get("FS___LC").expect("pair bucket");
        let edge = &edges[0];
        // The shared vertices of the two triangles are 1 (LC) and 2 (FS).
        assert_eq!((edge.v1.min(edge.v2), edge.v1.max(edge.v2)), (1, 2));
        assert!(edge.closeness > 0.0);
        assert!(edge.length > 0.0);
    }

    #[test]
    fn test_sentinel_pair_emits_nothing() {
        let points = vec![
            MapPoint::new(Point::new(0.0, 0.0), Affiliation::unclaimed()),
            MapPoint::new(Point::new(10.0, 0.0), Affiliation::independent()),
            MapPoint::new(Point::new(5.0, 8.0), Affiliation::unclaimed()),
            MapPoint::new(Point::new(15.0, 8.0), Affiliation::independent()),
        ];
        let graph = build_voronoi_graph(&points, &[0, 1, 2, 1, 3, 2]);
        let out = extract_border_edges(&graph);
        assert_eq!(out.edge_count(), 0);
    }

    #[test]
    fn test_same_affiliation_pair_emits_nothing() {
        let points = vec![
            MapPoint::new(Point::new(0.0, 0.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(10.0, 0.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(5.0, 8.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(15.0, 8.0), Affiliation::faction("FS")),
        ];
        let graph = build_voronoi_graph(&points, &[0, 1, 2, 1, 3, 2]);
        let out = extract_border_edges(&graph);
        assert_eq!(out.edge_count(), 0);
    }

    #[test]
    fn test_synthetic_nodes_ignored_by_extraction() {
        let mut graph = two_faction_graph();
        graph.add_node(Point::new(50.0, 50.0));
        assert!(graph.nodes[2].is_synthetic());
        let out = extract_border_edges(&graph);
        assert_eq!(out.edge_count(), 1);
        assert!(!out.three_way.is_three_way(2));
    }

    #[test]
    fn test_bounds_faction_rejects_internal_borders() {
        let points = vec![
            MapPoint::new(Point::new(0.0, 0.0), Affiliation::faction("FS.Crucis")),
            MapPoint::new(Point::new(10.0, 0.0), Affiliation::faction("FS.Draconis")),
            MapPoint::new(Point::new(5.0, 8.0), Affiliation::faction("LC")),
        ];
        let graph = build_voronoi_graph(&points, &[0, 1, 2]);
        let mut ids = EdgeIdGen::default();
        let internal = BorderEdge::new(ids.next_id(), 0, 0, 0, 1, &graph);
        let external = BorderEdge::new(ids.next_id(), 0, 0, 0, 2, &graph);
        let fs = Affiliation::faction("FS");
        // Both sides are FS at level 0: an internal hierarchy border.
        assert!(!internal.bounds_faction(&fs, 0));
        assert!(internal.bounds_faction(&fs, 1));
        assert!(external.bounds_faction(&fs, 0));
        assert!(!external.bounds_faction(&Affiliation::faction("DC"), 0));
    }

    #[test]
    fn test_three_way_node_registered() {
        let points = vec![
            MapPoint::new(Point::new(0.0, 0.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(10.0, 0.0), Affiliation::faction("LC")),
            MapPoint::new(Point::new(5.0, 8.0), Affiliation::faction("DC")),
            MapPoint::new(Point::new(15.0, 8.0), Affiliation::faction("LC")),
        ];
        let graph = build_voronoi_graph(&points, &[0, 1, 2, 1, 3, 2]);
        let out = extract_border_edges(&graph);
        // Triangle 0 touches FS, LC, DC.
        assert!(out.three_way.is_three_way(0));
        assert!(!out.three_way.is_three_way(1));
        // The DC/LC edge between the triangles touches the junction.
        assert_eq!(out.three_way.edges_at(0).map(<[EdgeId]>::len), Some(1));
    }

    #[test]
    fn test_border_node_buckets() {
        let graph = two_faction_graph();
        let out = extract_border_edges(&graph);
        assert!(out.border_nodes.get("FS").is_some());
        assert!(out.border_nodes.get("LC").is_some());
        // Both triangles touch both factions.
        assert_eq!(out.border_nodes["FS"].len(), 2);
        assert_eq!(out.border_nodes["LC"].len(), 2);
    }

    #[test]
    fn test_derive_sides_picks_generating_vertex_side() {
        let graph = two_faction_graph();
        let mut out = extract_border_edges(&graph);
        let edge = &mut out.edges.get_mut("FS___LC").unwrap()[0];
        edge.derive_sides(&graph);
        let left = edge.left_affiliation.clone().unwrap();
        let right = edge.right_affiliation.clone().unwrap();
        assert_ne!(left, right);
        // Reversing swaps the sides.
        edge.reverse();
        assert_eq!(edge.left_affiliation, Some(right));
        assert_eq!(edge.right_affiliation, Some(left));
    }

    #[test]
    fn test_reverse_swaps_controls() {
        let graph = two_faction_graph();
        let mut out = extract_border_edges(&graph);
        let edge = &mut out.edges.get_mut("FS___LC").unwrap()[0];
        edge.controls = Some(EdgeControls {
            n1_in: Point::new(0.0, 1.0),
            n1_out: Point::new(0.0, 2.0),
            n2_in: Point::new(0.0, 3.0),
            n2_out: Point::new(0.0, 4.0),
        });
        edge.reverse();
        let c = edge.controls.unwrap();
        assert_eq!(c.n1_in, Point::new(0.0, 4.0));
        assert_eq!(c.n1_out, Point::new(0.0, 3.0));
        assert_eq!(c.n2_in, Point::new(0.0, 2.0));
        assert_eq!(c.n2_out, Point::new(0.0, 1.0));
    }
}
