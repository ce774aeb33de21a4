//! Section simplification.
//!
//! Four ordered passes clean up the jitter the underlying triangulation
//! leaves in border sections: prune sub-threshold edges, relax interior
//! nodes toward their neighbors' line, merge near-collinear edge pairs,
//! and split edges the triangulation barely constrains. Order matters:
//! later passes depend on the `length`/`closeness` values earlier ones
//! re-derive.
//!
//! All passes are best-effort geometric cleanup. They return modification
//! counts for logging and never fail; three-way junction nodes are
//! immovable throughout.

use log::debug;

use crate::config::BorderConfig;
use crate::edges::{BorderEdge, EdgeIdGen, ThreeWayRegistry};
use crate::geometry::{distance_to_line, nearest_point_on_line};
use crate::sections::BorderSection;
use crate::voronoi::VoronoiGraph;

/// Modification counts from one simplification run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifyStats {
    pub pruned: usize,
    pub relaxed: usize,
    pub merged: usize,
    pub subdivided: usize,
}

impl SimplifyStats {
    pub fn total(&self) -> usize {
        self.pruned + self.relaxed + self.merged + self.subdivided
    }
}

/// Index of the edge before `i`, honoring loop wraparound.
fn prev_idx(section: &BorderSection, i: usize) -> Option<usize> {
    if i > 0 {
        Some(i - 1)
    } else if section.is_loop {
        Some(section.edges.len() - 1)
    } else {
        None
    }
}

/// Index of the edge after `i`, honoring loop wraparound.
fn next_idx(section: &BorderSection, i: usize) -> Option<usize> {
    if i + 1 < section.edges.len() {
        Some(i + 1)
    } else if section.is_loop {
        Some(0)
    } else {
        None
    }
}

/// Remove edges shorter than the prune threshold.
///
/// An edge survives when removing it would eliminate a genuine three-way
/// junction (both endpoints are junctions) or when either neighbor's
/// closeness/length ratio is too weak to absorb the removed span. Removal
/// collapses the edge to its midpoint, or to a junction endpoint when
/// exactly one end is a junction, re-deriving the absorbing edges and
/// re-pointing the registry at a survivor.
pub fn prune_short_edges(
    section: &mut BorderSection,
    graph: &mut VoronoiGraph,
    registry: &mut ThreeWayRegistry,
    config: &BorderConfig,
) -> usize {
    let mut pruned = 0;
    let mut i = 0;
    while i < section.edges.len() {
        // Loops below three edges and chains below two cannot lose another.
        let min_edges = if section.is_loop { 4 } else { 3 };
        if section.edges.len() < min_edges {
            break;
        }

        let edge = &section.edges[i];
        if edge.length >= config.prune_length_threshold {
            i += 1;
            continue;
        }

        let n1_junction = registry.is_three_way(edge.n1);
        let n2_junction = registry.is_three_way(edge.n2);
        if n1_junction && n2_junction {
            // Collapsing would fuse two genuine junctions.
            i += 1;
            continue;
        }

        let (Some(prev), Some(next)) = (prev_idx(section, i), next_idx(section, i))
        else {
            i += 1;
            continue;
        };
        let ratio_ok = |e: &BorderEdge| {
            e.length > 0.0 && e.closeness / e.length > config.prune_closeness_ratio_floor
        };
        if !ratio_ok(&section.edges[prev]) || !ratio_ok(&section.edges[next]) {
            i += 1;
            continue;
        }

        // Pick the survivor node and where it ends up.
        let (survivor, target) = if n1_junction {
            (edge.n1, graph.node_pos(edge.n1))
        } else if n2_junction {
            (edge.n2, graph.node_pos(edge.n2))
        } else {
            let mid = graph
                .node_pos(edge.n1)
                .midpoint(&graph.node_pos(edge.n2));
            (edge.n1, mid)
        };

        let removed_id = edge.id;
        graph.set_node_pos(survivor, target);

        section.edges[prev].n2 = survivor;
        section.edges[next].n1 = survivor;
        let absorber_id = section.edges[prev].id;
        section.edges.remove(i);

        // Re-derive the edges that absorbed the removed node, and keep the
        // junction registry pointing at a surviving edge.
        let prev = if prev > i { prev - 1 } else { prev };
        let next = if next > i { next - 1 } else { next };
        section.edges[prev].recompute(graph);
        section.edges[next].recompute(graph);
        registry.replace_edge(removed_id, absorber_id);

        section.update_loop_flag();
        pruned += 1;
        // Do not advance: the edge now at `i` has new geometry.
    }
    pruned
}

/// Move each interior shared node toward its nearest point on the line
/// between its neighbor nodes. The step is `min(closeness, cap) * tension`
/// of the way there, using the lower closeness of the two edges meeting at
/// the node. Junction nodes never move.
pub fn relax(
    section: &mut BorderSection,
    graph: &mut VoronoiGraph,
    registry: &ThreeWayRegistry,
    config: &BorderConfig,
) -> usize {
    let mut moved = 0;
    let count = section.edges.len();
    if count < 2 {
        return 0;
    }

    for i in 0..count {
        let Some(next) = next_idx(section, i) else { continue };
        if next == i {
            continue;
        }
        let shared = section.edges[i].n2;
        if registry.is_three_way(shared) {
            continue;
        }

        let anchor_a = graph.node_pos(section.edges[i].n1);
        let anchor_b = graph.node_pos(section.edges[next].n2);
        let pos = graph.node_pos(shared);
        let target = nearest_point_on_line(&anchor_a, &anchor_b, &pos);

        let closeness = section.edges[i]
            .closeness
            .min(section.edges[next].closeness)
            .min(config.relax_closeness_cap);
        let step = (closeness * config.relax_tension).min(1.0);
        if step <= 0.0 {
            continue;
        }

        let relaxed = pos.lerp(&target, step);
        if relaxed.distance(&pos) < 1e-12 {
            continue;
        }
        graph.set_node_pos(shared, relaxed);
        section.edges[i].recompute(graph);
        section.edges[next].recompute(graph);
        moved += 1;
    }
    moved
}

/// Merge consecutive near-collinear edge pairs into single edges.
///
/// A pair merges when the combined closeness clears the floor, each edge's
/// closeness/length ratio clears the floor, and the shared node deviates
/// from the outer-endpoint line by less than the absolute tolerance or
/// less than the relative tolerance of the combined length. Junction
/// midpoints and over-long results are skipped. Idempotent on sections it
/// has already cleaned.
pub fn merge_straight_edges(
    section: &mut BorderSection,
    graph: &VoronoiGraph,
    registry: &mut ThreeWayRegistry,
    config: &BorderConfig,
) -> usize {
    let mut merged = 0;
    let mut i = 0;
    while i + 1 < section.edges.len() {
        let a = &section.edges[i];
        let b = &section.edges[i + 1];
        let shared = a.n2;

        if registry.is_three_way(shared) {
            i += 1;
            continue;
        }
        if a.closeness + b.closeness <= config.straight_merge_closeness_floor {
            i += 1;
            continue;
        }
        let ratio_ok = |e: &BorderEdge| {
            e.length > 0.0 && e.closeness / e.length > config.prune_closeness_ratio_floor
        };
        if !ratio_ok(a) || !ratio_ok(b) {
            i += 1;
            continue;
        }

        let start = graph.node_pos(a.n1);
        let end = graph.node_pos(b.n2);
        let combined = a.length + b.length;
        if start.distance(&end) > config.max_merged_edge_length {
            i += 1;
            continue;
        }
        let deviation = distance_to_line(&start, &end, &graph.node_pos(shared));
        if deviation >= config.straight_merge_abs_tolerance
            && deviation >= combined * config.straight_merge_rel_tolerance
        {
            i += 1;
            continue;
        }

        let absorbed = section.edges.remove(i + 1);
        let keeper = &mut section.edges[i];
        keeper.n2 = absorbed.n2;
        keeper.recompute(graph);
        registry.replace_edge(absorbed.id, keeper.id);
        merged += 1;
        // Stay at i: the grown edge may merge with its new neighbor.
    }
    merged
}

/// Split edges whose length exceeds `closeness * ratio` at their midpoint.
///
/// Such edges are geometrically unreliable: the generating vertices sit so
/// close to the edge line that the triangulation barely constrains where
/// the border runs. The children inherit the affiliation pair and
/// generating vertices and re-derive their own length/closeness; registry
/// entries held under the parent id move to the touching children.
pub fn subdivide_dangerous_edges(
    section: &mut BorderSection,
    graph: &mut VoronoiGraph,
    registry: &mut ThreeWayRegistry,
    ids: &mut EdgeIdGen,
    config: &BorderConfig,
) -> usize {
    let mut subdivided = 0;
    let mut i = 0;
    while i < section.edges.len() {
        let edge = &section.edges[i];
        if edge.length < 1e-9
            || edge.length <= edge.closeness * config.dangerous_length_ratio
        {
            i += 1;
            continue;
        }

        let mid_pos = graph
            .node_pos(edge.n1)
            .midpoint(&graph.node_pos(edge.n2));
        let mid = graph.add_node(mid_pos);

        let parent = section.edges[i].clone();
        let mut first = BorderEdge::new(ids.next_id(), parent.n1, mid, parent.v1, parent.v2, graph);
        let mut second = BorderEdge::new(ids.next_id(), mid, parent.n2, parent.v1, parent.v2, graph);
        first.aff1 = parent.aff1.clone();
        first.aff2 = parent.aff2.clone();
        second.aff1 = parent.aff1.clone();
        second.aff2 = parent.aff2.clone();
        first.left_affiliation = parent.left_affiliation.clone();
        first.right_affiliation = parent.right_affiliation.clone();
        second.left_affiliation = parent.left_affiliation.clone();
        second.right_affiliation = parent.right_affiliation.clone();

        registry.replace_edge_with_split(parent.id, [&first, &second]);

        section.edges[i] = first;
        section.edges.insert(i + 1, second);
        subdivided += 1;
        // Skip both children; one split per parent edge per pass.
        i += 2;
    }
    subdivided
}

/// Run the four passes in order over one section.
pub fn simplify_section(
    section: &mut BorderSection,
    graph: &mut VoronoiGraph,
    registry: &mut ThreeWayRegistry,
    ids: &mut EdgeIdGen,
    config: &BorderConfig,
) -> SimplifyStats {
    let stats = SimplifyStats {
        pruned: prune_short_edges(section, graph, registry, config),
        relaxed: relax(section, graph, registry, config),
        merged: merge_straight_edges(section, graph, registry, config),
        subdivided: subdivide_dangerous_edges(section, graph, registry, ids, config),
    };
    debug_assert!(section.is_continuous());
    stats
}

/// Simplify every section, logging the aggregate counts.
pub fn simplify_sections(
    sections: &mut [BorderSection],
    graph: &mut VoronoiGraph,
    registry: &mut ThreeWayRegistry,
    ids: &mut EdgeIdGen,
    config: &BorderConfig,
) -> SimplifyStats {
    let mut total = SimplifyStats::default();
    for section in sections.iter_mut() {
        let stats = simplify_section(section, graph, registry, ids, config);
        total.pruned += stats.pruned;
        total.relaxed += stats.relaxed;
        total.merged += stats.merged;
        total.subdivided += stats.subdivided;
    }
    debug!(
        "simplified {} sections: {} pruned, {} relaxed, {} merged, {} subdivided",
        sections.len(),
        total.pruned,
        total.relaxed,
        total.merged,
        total.subdivided
    );
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affiliation::Affiliation;
    use crate::geometry::Point;
    use crate::poisson::MapPoint;
    use crate::voronoi::build_voronoi_graph;

    /// Graph with an FS vertex below and an LC vertex above the x axis, so
    /// horizontal edges get a comfortable closeness, plus synthetic nodes.
    fn fixture(node_positions: &[(f64, f64)]) -> VoronoiGraph {
        let points = vec![
            MapPoint::new(Point::new(5.0, -5.0), Affiliation::faction("FS")),
            MapPoint::new(Point::new(5.0, 5.0), Affiliation::faction("LC")),
        ];
        let mut graph = build_voronoi_graph(&points, &[]);
        for &(x, y) in node_positions {
            graph.add_node(Point::new(x, y));
        }
        graph
    }

    fn chain(graph: &VoronoiGraph, ids: &mut EdgeIdGen, nodes: &[usize]) -> BorderSection {
        let edges = nodes
            .windows(2)
            .map(|w| BorderEdge::new(ids.next_id(), w[0], w[1], 0, 1, graph))
            .collect();
        BorderSection::from_edges(edges)
    }

    #[test]
    fn test_prune_collapses_short_edge_to_midpoint() {
        let graph = &mut fixture(&[(0.0, 0.0), (10.0, 0.0), (11.0, 0.5), (21.0, 0.5)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        let mut section = chain(graph, &mut ids, &[0, 1, 2, 3]);
        let config = BorderConfig::default();

        let pruned = prune_short_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(pruned, 1);
        assert_eq!(section.edges.len(), 2);
        assert!(section.is_continuous());
        // The survivor sits at the removed edge's midpoint.
        let joint = graph.node_pos(section.edges[0].n2);
        assert!((joint.x - 10.5).abs() < 1e-9);
        assert!((joint.y - 0.25).abs() < 1e-9);
        // Absorbing edges were re-derived, not left stale.
        let expected = graph.node_pos(section.edges[0].n1).distance(&joint);
        assert!((section.edges[0].length - expected).abs() < 1e-9);
    }

    #[test]
    fn test_prune_never_fuses_two_junctions() {
        let graph = &mut fixture(&[(0.0, 0.0), (10.0, 0.0), (11.0, 0.5), (21.0, 0.5)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        registry.mark(1);
        registry.mark(2);
        let mut section = chain(graph, &mut ids, &[0, 1, 2, 3]);
        let config = BorderConfig::default();

        let pruned = prune_short_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(pruned, 0);
        assert_eq!(section.edges.len(), 3);
    }

    #[test]
    fn test_prune_collapses_to_single_junction_endpoint() {
        let graph = &mut fixture(&[(0.0, 0.0), (10.0, 0.0), (11.0, 0.5), (21.0, 0.5)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        registry.mark(2);
        let mut section = chain(graph, &mut ids, &[0, 1, 2, 3]);
        let middle_id = section.edges[1].id;
        registry.touch(2, middle_id);
        let config = BorderConfig::default();

        let pruned = prune_short_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(pruned, 1);
        // Junction node 2 survives in place.
        assert_eq!(section.edges[0].n2, 2);
        let pos = graph.node_pos(2);
        assert!((pos.x - 11.0).abs() < 1e-9);
        assert!((pos.y - 0.5).abs() < 1e-9);
        // Registry now points at the surviving edge.
        let tracked = registry.edges_at(2).unwrap();
        assert!(!tracked.contains(&middle_id));
        assert!(tracked.contains(&section.edges[0].id));
    }

    #[test]
    fn test_relax_pulls_interior_node_toward_line() {
        let graph = &mut fixture(&[(0.0, 0.0), (5.0, 3.0), (10.0, 0.0)]);
        let mut ids = EdgeIdGen::default();
        let registry = ThreeWayRegistry::default();
        let mut section = chain(graph, &mut ids, &[0, 1, 2]);
        let config = BorderConfig::default();

        let moved = relax(&mut section, graph, &registry, &config);
        assert_eq!(moved, 1);
        // Closeness clears the cap, so the node moves tension (0.4) of the
        // way to the line y = 0.
        let pos = graph.node_pos(1);
        assert!((pos.y - 1.8).abs() < 1e-9);
        assert!((pos.x - 5.0).abs() < 1e-9);
        // Edge metrics track the move.
        assert!((section.edges[0].length - Point::new(0.0, 0.0).distance(&pos)).abs() < 1e-9);
    }

    #[test]
    fn test_relax_never_moves_junction() {
        let graph = &mut fixture(&[(0.0, 0.0), (5.0, 3.0), (10.0, 0.0)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        registry.mark(1);
        let mut section = chain(graph, &mut ids, &[0, 1, 2]);
        let config = BorderConfig::default();

        let moved = relax(&mut section, graph, &registry, &config);
        assert_eq!(moved, 0);
        assert_eq!(graph.node_pos(1), Point::new(5.0, 3.0));
    }

    #[test]
    fn test_merge_straight_edges_and_idempotence() {
        let graph = &mut fixture(&[(0.0, 0.0), (5.0, 0.01), (10.0, 0.0)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        let mut section = chain(graph, &mut ids, &[0, 1, 2]);
        let config = BorderConfig::default();

        let merged = merge_straight_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(merged, 1);
        assert_eq!(section.edges.len(), 1);
        assert!((section.edges[0].length - 10.0).abs() < 1e-6);

        // Second run on the already-clean section merges nothing.
        let again = merge_straight_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(again, 0);
    }

    #[test]
    fn test_merge_skips_junction_midpoint() {
        let graph = &mut fixture(&[(0.0, 0.0), (5.0, 0.01), (10.0, 0.0)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        registry.mark(1);
        let mut section = chain(graph, &mut ids, &[0, 1, 2]);
        let config = BorderConfig::default();

        let merged = merge_straight_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(merged, 0);
        assert_eq!(section.edges.len(), 2);
    }

    #[test]
    fn test_merge_skips_real_corner() {
        let graph = &mut fixture(&[(0.0, 0.0), (5.0, 4.0), (10.0, 0.0)]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        let mut section = chain(graph, &mut ids, &[0, 1, 2]);
        let config = BorderConfig::default();

        // Deviation of 4 units exceeds both tolerances.
        let merged = merge_straight_edges(&mut section, graph, &mut registry, &config);
        assert_eq!(merged, 0);
    }

    #[test]
    fn test_subdivide_dangerous_edge() {
        // Edge of length 1 whose generating vertices give closeness 0.05:
        // ratio 20 exceeds the threshold of 10.
        let points = vec![
            MapPoint::new(Point::new(0.5, 0.05), Affiliation::faction("FS")),
            MapPoint::new(Point::new(0.5, -5.0), Affiliation::faction("LC")),
        ];
        let mut graph = build_voronoi_graph(&points, &[]);
        graph.add_node(Point::new(0.0, 0.0));
        graph.add_node(Point::new(1.0, 0.0));
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        let mut section =
            BorderSection::from_edge(BorderEdge::new(ids.next_id(), 0, 1, 0, 1, &graph));
        assert!((section.edges[0].closeness - 0.05).abs() < 1e-9);
        let config = BorderConfig::default();

        let split =
            subdivide_dangerous_edges(&mut section, &mut graph, &mut registry, &mut ids, &config);
        assert_eq!(split, 1);
        assert_eq!(section.edges.len(), 2);
        assert!(section.is_continuous());
        for child in &section.edges {
            assert!((child.length - 0.5).abs() < 1e-9);
            // Closeness is re-derived against the child's own endpoints.
            assert!((child.closeness - 0.05).abs() < 1e-9);
            assert_eq!(child.aff1, Affiliation::faction("FS"));
            assert_eq!(child.aff2, Affiliation::faction("LC"));
        }
        // The shared midpoint is a fresh node at the split point.
        let mid = graph.node_pos(section.edges[0].n2);
        assert!((mid.x - 0.5).abs() < 1e-9);
        assert!((mid.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_subdivide_reregisters_split_edges() {
        let points = vec![
            MapPoint::new(Point::new(0.5, 0.05), Affiliation::faction("FS")),
            MapPoint::new(Point::new(0.5, -5.0), Affiliation::faction("LC")),
        ];
        let mut graph = build_voronoi_graph(&points, &[]);
        graph.add_node(Point::new(0.0, 0.0));
        graph.add_node(Point::new(1.0, 0.0));
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        let mut section =
            BorderSection::from_edge(BorderEdge::new(ids.next_id(), 0, 1, 0, 1, &graph));
        let parent_id = section.edges[0].id;
        registry.mark(0);
        registry.touch(0, parent_id);
        let config = BorderConfig::default();

        subdivide_dangerous_edges(&mut section, &mut graph, &mut registry, &mut ids, &config);
        let tracked = registry.edges_at(0).unwrap();
        assert!(!tracked.contains(&parent_id));
        // Only the child actually touching the junction node replaces it.
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0], section.edges[0].id);
    }

    #[test]
    fn test_three_way_node_survives_full_simplification() {
        let graph = &mut fixture(&[
            (0.0, 0.0),
            (4.0, 2.0),
            (5.0, 2.2),
            (9.0, 0.0),
            (14.0, 0.0),
        ]);
        let mut ids = EdgeIdGen::default();
        let mut registry = ThreeWayRegistry::default();
        registry.mark(2);
        let mut section = chain(graph, &mut ids, &[0, 1, 2, 3, 4]);
        for edge in &section.edges {
            registry.touch(2, edge.id);
        }
        let junction_pos = graph.node_pos(2);
        let config = BorderConfig::default();

        simplify_section(&mut section, graph, &mut registry, &mut ids, &config);
        assert!(section.is_continuous());
        // The junction still exists in the chain and never moved.
        assert_eq!(graph.node_pos(2), junction_pos);
        assert!(section
            .edges
            .iter()
            .any(|e| e.n1 == 2 || e.n2 == 2));
        assert!(registry.is_three_way(2));
    }
}
