//! Salient bridging for disconnected same-faction territory.
//!
//! A faction whose territory triangulates into several disjoint loops gets
//! thin "land bridges": synthetic points laid along the shortest line from
//! each island to the nearest same-faction border, which are then pinned
//! into the sampler and the whole pipeline re-runs once. The second
//! triangulation connects the territory through the bridge.

use log::debug;

use crate::affiliation::Affiliation;
use crate::config::BorderConfig;
use crate::geometry::{nearest_point_on_segment, Point};
use crate::loops::{BorderEdgeLoop, FactionLoops};
use crate::voronoi::VoronoiGraph;

/// A synthetic bridge point. Ephemeral: it only exists to seed the second
/// triangulation pass.
#[derive(Debug, Clone)]
pub struct SalientPoint {
    pub pos: Point,
    pub affiliation: Affiliation,
}

/// Nearest point on any edge of `target` to any node of `island`, with its
/// distance.
fn nearest_approach(
    island: &BorderEdgeLoop,
    target: &BorderEdgeLoop,
    graph: &VoronoiGraph,
) -> Option<(Point, Point, f64)> {
    let mut best: Option<(Point, Point, f64)> = None;
    for island_edge in &island.section.edges {
        let from = graph.node_pos(island_edge.n2);
        for target_edge in &target.section.edges {
            let a = graph.node_pos(target_edge.n1);
            let b = graph.node_pos(target_edge.n2);
            let candidate = nearest_point_on_segment(&a, &b, &from);
            let dist = from.distance(&candidate);
            if best.as_ref().map_or(true, |(_, _, d)| dist < *d) {
                best = Some((from, candidate, dist));
            }
        }
    }
    best
}

/// Detect same-faction islands and synthesize bridge points toward their
/// nearest mainland border.
///
/// Only non-primary loops are considered, and only when they are not an
/// enclave of a different faction (their outside is sentinel territory).
/// One bridge per island, to the single nearest approach within the
/// configured maximum distance.
pub fn connect_salients(
    loops: &FactionLoops,
    graph: &VoronoiGraph,
    config: &BorderConfig,
) -> Vec<SalientPoint> {
    let mut out = Vec::new();

    for (faction, faction_loops) in loops {
        let faction_aff = Affiliation::faction(faction.as_str());
        for (idx, island) in faction_loops.iter().enumerate().skip(1) {
            // An island whose outside belongs to another faction is an
            // enclave; bridging it would cut through foreign territory.
            if island.outer_affiliation.claimed()
                && !island.outer_affiliation.matches_at_level(&faction_aff, 0)
            {
                continue;
            }

            let mut best: Option<(Point, Point, f64)> = None;
            for (other_idx, other) in faction_loops.iter().enumerate() {
                if other_idx == idx {
                    continue;
                }
                if let Some(approach) = nearest_approach(island, other, graph) {
                    if best.as_ref().map_or(true, |(_, _, d)| approach.2 < *d) {
                        best = Some(approach);
                    }
                }
            }

            let Some((from, to, dist)) = best else { continue };
            if dist > config.salient_max_distance {
                continue;
            }

            // The island's full inner affiliation disambiguates
            // hierarchical sub-affiliations.
            let affiliation = if island.inner_affiliation.claimed() {
                island.inner_affiliation.clone()
            } else {
                faction_aff.clone()
            };

            let before = out.len();
            if dist < config.salient_step {
                // Sub-step gap: the bridge is just its two endpoints.
                out.push(SalientPoint {
                    pos: from,
                    affiliation: affiliation.clone(),
                });
                if dist > config.coord_epsilon {
                    out.push(SalientPoint {
                        pos: to,
                        affiliation,
                    });
                }
            } else {
                let steps = (dist / config.salient_step).floor() as usize;
                let direction = (to - from) / dist;
                for k in 0..=steps {
                    out.push(SalientPoint {
                        pos: from + direction * (k as f64 * config.salient_step),
                        affiliation: affiliation.clone(),
                    });
                }
            }
            debug!(
                "bridging island of {} across {:.1} units with {} points",
                faction,
                dist,
                out.len() - before
            );
        }
    }

    out
}
