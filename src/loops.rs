//! Closed per-faction border loops.
//!
//! The loop generator re-splits merged sections back into single
//! affiliation-pair pieces, stitches each faction's pieces into closed
//! loops, fixes a clockwise orientation, and derives which affiliation
//! lies inside and outside each loop. The separator then offsets every
//! loop into its own territory so adjacent factions' borders do not
//! coincide when drawn.
//!
//! Orientation conventions are screen-like (y grows downward): a positive
//! cross product at the pivot edge means clockwise as drawn, and a
//! clockwise loop has its interior on the right of travel.

use std::collections::{BTreeSet, HashMap};

use log::warn;

use crate::affiliation::{Affiliation, FactionId};
use crate::config::BorderConfig;
use crate::edges::EdgeControls;
use crate::geometry::{cross_at, Point};
use crate::sections::{stitch_sections, BorderSection, Convergence};
use crate::voronoi::VoronoiGraph;

/// A border section known to be closed, clockwise, and annotated with the
/// affiliations immediately inside and outside of it.
#[derive(Debug, Clone)]
pub struct BorderEdgeLoop {
    pub section: BorderSection,
    pub inner_affiliation: Affiliation,
    pub outer_affiliation: Affiliation,
    /// Index of the edge whose second node is lexicographically minimal;
    /// that node lies on the convex hull, making it a stable pivot for
    /// orientation tests.
    pub min_edge_idx: usize,
    pub length: f64,
}

/// Closed loops per top-level faction, longest (primary territory) first.
pub type FactionLoops = HashMap<FactionId, Vec<BorderEdgeLoop>>;

/// Undo hierarchical merging: cut sections into pieces that each cover
/// exactly one affiliation pair.
pub fn split_to_single_pairs(sections: Vec<BorderSection>) -> Vec<BorderSection> {
    let mut out = Vec::new();
    for section in sections {
        if section.edges.is_empty() {
            continue;
        }

        let mut edges = section.edges;
        if section.is_loop {
            // Rotate a pair boundary to position 0 so no run wraps around.
            let len = edges.len();
            let break_at = (0..len).find(|&k| {
                edges[k].pair_key() != edges[(k + len - 1) % len].pair_key()
            });
            match break_at {
                Some(k) => edges.rotate_left(k),
                None => {
                    // Uniform loop: already a single pair.
                    out.push(BorderSection::from_edges(edges));
                    continue;
                }
            }
        }

        let mut run: Vec<crate::edges::BorderEdge> = Vec::new();
        for edge in edges {
            if let Some(last) = run.last() {
                if last.pair_key() != edge.pair_key() {
                    out.push(BorderSection::from_edges(std::mem::take(&mut run)));
                }
            }
            run.push(edge);
        }
        if !run.is_empty() {
            out.push(BorderSection::from_edges(run));
        }
    }
    out
}

/// Give a loop its own private copies of every node so per-faction offsets
/// never contaminate another faction's rendition of the same border.
fn privatize_nodes(section: &mut BorderSection, graph: &mut VoronoiGraph) {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    for edge in &mut section.edges {
        let n1 = *remap
            .entry(edge.n1)
            .or_insert_with(|| graph.add_node(graph.node_pos(edge.n1)));
        edge.n1 = n1;
    }
    for edge in &mut section.edges {
        let n2 = *remap
            .entry(edge.n2)
            .or_insert_with(|| graph.add_node(graph.node_pos(edge.n2)));
        edge.n2 = n2;
    }
}

/// Index of the edge whose second node is lexicographically minimal.
fn find_min_edge_idx(section: &BorderSection, graph: &VoronoiGraph) -> usize {
    let mut best = 0;
    for i in 1..section.edges.len() {
        let candidate = graph.node_pos(section.edges[i].n2);
        let current = graph.node_pos(section.edges[best].n2);
        if candidate.lex_cmp(&current) == std::cmp::Ordering::Less {
            best = i;
        }
    }
    best
}

/// Turn a closed section into an oriented, annotated loop.
fn finish_loop(
    mut section: BorderSection,
    graph: &mut VoronoiGraph,
) -> BorderEdgeLoop {
    privatize_nodes(&mut section, graph);
    for edge in &mut section.edges {
        edge.recompute(graph);
        edge.derive_sides(graph);
    }

    let mut min_edge_idx = find_min_edge_idx(&section, graph);
    let pivot = &section.edges[min_edge_idx];
    let after = &section.edges[(min_edge_idx + 1) % section.edges.len()];
    let turn = cross_at(
        &graph.node_pos(pivot.n1),
        &graph.node_pos(pivot.n2),
        &graph.node_pos(after.n2),
    );
    if turn < 0.0 {
        // Counter-clockwise as drawn: flip the whole chain.
        section.reverse();
        min_edge_idx = find_min_edge_idx(&section, graph);
    }

    let inner_affiliation = section.edges[0]
        .right_affiliation
        .clone()
        .unwrap_or_else(Affiliation::unclaimed);
    let outer_affiliation = section.edges[0]
        .left_affiliation
        .clone()
        .unwrap_or_else(Affiliation::unclaimed);
    let length = section.total_length();

    let mut lp = BorderEdgeLoop {
        section,
        inner_affiliation,
        outer_affiliation,
        min_edge_idx,
        length,
    };
    assign_control_points(&mut lp, graph);
    lp
}

/// Stitch every faction's single-pair sections into closed loops.
///
/// Each border section between two factions takes part in both factions'
/// loops. Open fragments left after stitching are logged and dropped.
pub fn build_loops(
    sections: &[BorderSection],
    graph: &mut VoronoiGraph,
    config: &BorderConfig,
) -> (FactionLoops, Convergence) {
    let mut factions: BTreeSet<FactionId> = BTreeSet::new();
    for section in sections {
        let (a, b) = section.affiliations();
        for aff in [a, b] {
            if let Some(id) = aff.faction_id() {
                factions.insert(FactionId::new(id.top_level()));
            }
        }
    }

    let mut out: FactionLoops = HashMap::new();
    let mut convergence = Convergence {
        converged: true,
        iterations: 0,
    };

    for faction in factions {
        let aff = Affiliation::faction(faction.as_str());
        let mut mine: Vec<BorderSection> = sections
            .iter()
            .filter(|s| s.edges[0].bounds_faction(&aff, 0))
            .cloned()
            .collect();
        if mine.is_empty() {
            continue;
        }

        let result = stitch_sections(&mut mine, config.max_merge_iterations);
        if !result.converged {
            warn!(
                "loop stitching for {} hit the iteration ceiling with {} sections left",
                faction,
                mine.len()
            );
        }
        convergence.combine(result);

        let mut loops: Vec<BorderEdgeLoop> = Vec::new();
        for mut section in mine {
            if !section.is_loop && section.edges.len() > 1 {
                // Stitching matches node ids, but simplification can mint
                // duplicate nodes at the same position; weld such endpoints
                // so the closure survives.
                let gap = graph
                    .node_pos(section.node1())
                    .distance(&graph.node_pos(section.node2()));
                if gap <= config.coord_epsilon {
                    let n1 = section.node1();
                    let last = section.edges.len() - 1;
                    section.edges[last].n2 = n1;
                    section.update_loop_flag();
                }
            }
            if !section.is_loop {
                warn!(
                    "dropping open border fragment for {} ({} edges)",
                    faction,
                    section.edges.len()
                );
                continue;
            }
            loops.push(finish_loop(section, graph));
        }

        // Longest loop first: the faction's primary territory, then
        // islands and enclaves.
        loops.sort_by(|a, b| {
            b.length
                .partial_cmp(&a.length)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out.insert(faction, loops);
    }

    (out, convergence)
}

/// Catmull-Rom style Bezier handles at every loop node, for smooth
/// rendering. The tangent at a node follows the chord between its two
/// neighbor nodes; handle lengths are a third of each adjacent edge.
pub fn assign_control_points(lp: &mut BorderEdgeLoop, graph: &VoronoiGraph) {
    let count = lp.section.edges.len();
    if count < 2 {
        return;
    }

    for edge in &mut lp.section.edges {
        let p1 = graph.node_pos(edge.n1);
        let p2 = graph.node_pos(edge.n2);
        edge.controls = Some(EdgeControls {
            n1_in: p1,
            n1_out: p1,
            n2_in: p2,
            n2_out: p2,
        });
    }

    for i in 0..count {
        let j = (i + 1) % count;
        let node = graph.node_pos(lp.section.edges[i].n2);
        let before = graph.node_pos(lp.section.edges[i].n1);
        let after = graph.node_pos(lp.section.edges[j].n2);
        let tangent = (after - before).normalize();

        let in_handle = node - tangent * (lp.section.edges[i].length / 3.0);
        let out_handle = node + tangent * (lp.section.edges[j].length / 3.0);

        if let Some(controls) = &mut lp.section.edges[i].controls {
            controls.n2_in = in_handle;
            controls.n2_out = out_handle;
        }
        if let Some(controls) = &mut lp.section.edges[j].controls {
            controls.n1_in = in_handle;
            controls.n1_out = out_handle;
        }
    }
}

/// Offset every loop along its local normals so adjacent factions' loops
/// do not coincide.
///
/// Directions are computed from a frozen copy of the pre-offset positions,
/// so the offset at one node never contaminates the next. The offset is
/// positive (into the loop's own territory) when the loop's inner
/// affiliation belongs to the faction being processed, negative otherwise.
pub fn separate_loops(
    loops: &mut FactionLoops,
    graph: &mut VoronoiGraph,
    config: &BorderConfig,
) {
    for (faction, faction_loops) in loops.iter_mut() {
        let aff = Affiliation::faction(faction.as_str());
        for lp in faction_loops.iter_mut() {
            let tension = if lp.inner_affiliation.matches_at_level(&aff, 0) {
                config.separation_tension
            } else {
                -config.separation_tension
            };

            let frozen: HashMap<usize, Point> = lp
                .section
                .edges
                .iter()
                .flat_map(|e| [e.n1, e.n2])
                .map(|n| (n, graph.node_pos(n)))
                .collect();

            let count = lp.section.edges.len();
            for i in 0..count {
                let j = (i + 1) % count;
                let node = lp.section.edges[i].n2;

                let dir_in =
                    (frozen[&lp.section.edges[i].n2] - frozen[&lp.section.edges[i].n1])
                        .normalize()
                        .right_perp();
                let dir_out =
                    (frozen[&lp.section.edges[j].n2] - frozen[&lp.section.edges[j].n1])
                        .normalize()
                        .right_perp();
                let offset = (dir_in + dir_out).normalize() * tension;
                if offset == Point::ZERO {
                    continue;
                }

                graph.set_node_pos(node, frozen[&node] + offset);
                if let Some(controls) = &mut lp.section.edges[i].controls {
                    controls.n2_in = controls.n2_in + offset;
                    controls.n2_out = controls.n2_out + offset;
                }
                if let Some(controls) = &mut lp.section.edges[j].controls {
                    controls.n1_in = controls.n1_in + offset;
                    controls.n1_out = controls.n1_out + offset;
                }
            }

            for edge in &mut lp.section.edges {
                edge.recompute(graph);
            }
            lp.length = lp.section.total_length();
        }
    }
}
