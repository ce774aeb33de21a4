//! Star-map faction border generator.
//!
//! Turns a set of affiliated star systems into smooth, closed, per-faction
//! border loops:
//! - Poisson-disc noise fills the space between systems
//! - a Delaunay triangulation and its Voronoi dual locate the borders
//! - edges between differing affiliations are stitched into sections,
//!   merged across the hierarchy, and simplified
//! - each faction gets clockwise loops with inner/outer annotations and
//!   Bezier control points
//! - disconnected same-faction islands are bridged by re-triangulating once
//!   with synthetic salient points pinned
//!
//! Arena-based data structures throughout (no Rc<RefCell<T>>): vertices,
//! Voronoi nodes, and edges are addressed by stable indices.

pub mod affiliation;
pub mod config;
pub mod edges;
pub mod faction;
pub mod geometry;
pub mod loops;
pub mod poisson;
pub mod salient;
pub mod sections;
pub mod simplify;
pub mod voronoi;

use std::collections::HashMap;

use log::{debug, info};

pub use affiliation::{Affiliation, FactionId, Territory};
pub use config::BorderConfig;
pub use edges::{BorderEdge, BorderEdgeMap, ThreeWayRegistry};
pub use faction::{Faction, FactionRegistry};
pub use geometry::{BoundingBox, Point};
pub use loops::{BorderEdgeLoop, FactionLoops};
pub use poisson::{MapPoint, PoissonSampler};
pub use salient::SalientPoint;
pub use sections::{BorderSection, Convergence};
pub use simplify::SimplifyStats;
pub use voronoi::VoronoiGraph;

use edges::extract_border_edges;
use loops::{build_loops, separate_loops, split_to_single_pairs};
use salient::connect_salients;
use sections::{build_sections, merge_sections};
use simplify::simplify_sections;
use voronoi::build_voronoi_graph;

/// Everything one triangulate-extract-simplify-loop pass produces.
///
/// The intermediate stages are kept for debugging and visualization; the
/// loops are the payload.
#[derive(Debug, Default)]
pub struct PassOutput {
    pub graph: VoronoiGraph,
    /// Flat Delaunay triangle index array (groups of three).
    pub triangles: Vec<usize>,
    /// Unstitched border edges by affiliation-pair key, as extracted.
    pub raw_edges: HashMap<String, Vec<BorderEdge>>,
    /// Border node ids per affiliation key.
    pub border_nodes: HashMap<String, Vec<usize>>,
    pub three_way: ThreeWayRegistry,
    /// Simplified single-pair sections, loop input.
    pub sections: Vec<BorderSection>,
    pub loops: FactionLoops,
    /// Bridge points emitted for disconnected same-faction islands.
    pub salients: Vec<SalientPoint>,
    pub stats: SimplifyStats,
    pub convergence: Convergence,
}

/// Final output of border generation.
#[derive(Debug)]
pub struct BorderResult {
    /// Closed clockwise loops per top-level faction, longest first.
    pub loops: FactionLoops,
    /// Node arena the loops index into.
    pub graph: VoronoiGraph,
    /// Debug/visualization exports from the final pass.
    pub triangles: Vec<usize>,
    pub raw_edges: HashMap<String, Vec<BorderEdge>>,
    pub border_nodes: HashMap<String, Vec<usize>>,
    pub three_way: ThreeWayRegistry,
    pub stats: SimplifyStats,
    pub convergence: Convergence,
    /// 1 when the map had no islands to bridge, 2 otherwise.
    pub passes: u32,
}

/// Run one full pass over an aggregate point set.
pub fn run_pass(points: &[MapPoint], config: &BorderConfig) -> PassOutput {
    if points.len() < 3 {
        return PassOutput {
            convergence: Convergence {
                converged: true,
                iterations: 0,
            },
            ..Default::default()
        };
    }

    // Step 1: triangulate.
    let sites: Vec<delaunator::Point> = points.iter().map(|p| p.pos.into()).collect();
    let triangulation = delaunator::triangulate(&sites);

    // Step 2: Voronoi dual.
    let mut graph = build_voronoi_graph(points, &triangulation.triangles);

    // Step 3: border edges.
    let BorderEdgeMap {
        edges,
        border_nodes,
        mut three_way,
        mut id_gen,
    } = extract_border_edges(&graph);
    let raw_edges = edges.clone();

    // Step 4: stitch and merge sections.
    let (mut sections, mut convergence) =
        build_sections(edges, config.max_merge_iterations);
    convergence.combine(merge_sections(
        &mut sections,
        config.hierarchy_level,
        config.max_merge_iterations,
    ));

    // Step 5: simplify.
    let stats = simplify_sections(
        &mut sections,
        &mut graph,
        &mut three_way,
        &mut id_gen,
        config,
    );

    // Step 6: per-faction loops.
    let pieces = split_to_single_pairs(sections);
    let (loops, loop_convergence) = build_loops(&pieces, &mut graph, config);
    convergence.combine(loop_convergence);

    // Step 7: island bridges for the next pass, if any.
    let salients = connect_salients(&loops, &graph, config);

    PassOutput {
        graph,
        triangles: triangulation.triangles,
        raw_edges,
        border_nodes,
        three_way,
        sections: pieces,
        loops,
        salients,
        stats,
        convergence,
    }
}

/// Generate faction borders for a set of star systems.
///
/// Runs one full pass, and exactly one more when the first pass found
/// disconnected same-faction islands to bridge: the salient points join the
/// systems as pinned triangulation input and the whole pipeline re-runs.
/// The second pass's salients, if any, are not acted on again.
pub fn generate_borders(
    systems: &[MapPoint],
    registry: &FactionRegistry,
    config: &BorderConfig,
) -> BorderResult {
    let mut sampler = PoissonSampler::new(config);
    sampler.replace_reserved_points(systems.to_vec());

    let mut pass = run_pass(sampler.points(), config);
    let mut passes = 1;

    if !pass.salients.is_empty() {
        info!(
            "{} salient bridge points; re-triangulating",
            pass.salients.len()
        );
        let mut reserved = systems.to_vec();
        reserved.extend(
            pass.salients
                .iter()
                .map(|s| MapPoint::new(s.pos, s.affiliation.clone())),
        );
        sampler.replace_reserved_points(reserved);
        pass = run_pass(sampler.points(), config);
        passes = 2;
    }

    separate_loops(&mut pass.loops, &mut pass.graph, config);

    for (faction, faction_loops) in &pass.loops {
        debug!(
            "{} ({}): {} loops",
            registry.get_or_placeholder(faction).name,
            faction,
            faction_loops.len()
        );
    }

    BorderResult {
        loops: pass.loops,
        graph: pass.graph,
        triangles: pass.triangles,
        raw_edges: pass.raw_edges,
        border_nodes: pass.border_nodes,
        three_way: pass.three_way,
        stats: pass.stats,
        convergence: pass.convergence,
        passes,
    }
}
