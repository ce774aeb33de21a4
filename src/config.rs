//! Unified configuration for border generation.
//!
//! All tunable parameters across all pipeline stages are centralized here.
//! Several thresholds are inherited from hand-calibrated map output and have
//! no documented derivation; they are named fields so callers can override
//! them.

use crate::geometry::BoundingBox;

/// Complete configuration for one border-generation run.
#[derive(Debug, Clone)]
pub struct BorderConfig {
    // ===== Background noise sampling =====
    /// Bounding box for the map.
    pub bounds: BoundingBox,
    /// Minimum spacing between Poisson-disc noise points.
    pub noise_radius: f64,
    /// Candidates tried per active sample before retiring it (Bridson's k).
    pub noise_candidates: u32,
    /// Random seed for the noise field.
    pub seed: u64,

    // ===== Section stitching =====
    /// Affiliation hierarchy depth borders are drawn at: 0 merges around
    /// top-level factions, 1 keeps sub-affiliation borders, and so on.
    pub hierarchy_level: usize,
    /// Iteration ceiling for the fixed-point merge loops. Hitting it is
    /// logged and the partial result kept.
    pub max_merge_iterations: u32,
    /// Coordinate tolerance for endpoint and closure comparisons.
    pub coord_epsilon: f64,

    // ===== Simplification =====
    /// Edges shorter than this are candidates for pruning.
    pub prune_length_threshold: f64,
    /// Neighbor closeness/length ratio floor below which pruning is unsafe.
    pub prune_closeness_ratio_floor: f64,
    /// Fraction of the way an interior node moves toward the line between
    /// its neighbors per relax pass.
    pub relax_tension: f64,
    /// Cap applied to edge closeness before it scales the relax step.
    pub relax_closeness_cap: f64,
    /// Combined closeness floor for merging two consecutive edges.
    pub straight_merge_closeness_floor: f64,
    /// Absolute midpoint deviation tolerance for a straight merge.
    pub straight_merge_abs_tolerance: f64,
    /// Relative (per unit length) midpoint deviation tolerance.
    pub straight_merge_rel_tolerance: f64,
    /// Sanity bound: merges producing edges longer than this are skipped.
    pub max_merged_edge_length: f64,
    /// Edges with length > closeness * ratio are split at their midpoint.
    pub dangerous_length_ratio: f64,

    // ===== Loop separation =====
    /// Offset magnitude applied along summed edge normals so adjacent
    /// factions' loops do not coincide.
    pub separation_tension: f64,

    // ===== Salient bridging =====
    /// Maximum island-to-mainland distance that still gets a land bridge.
    pub salient_max_distance: f64,
    /// Spacing of synthetic bridge points along the connecting segment.
    pub salient_step: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            // Sampling
            bounds: BoundingBox::new(-600.0, -600.0, 600.0, 600.0),
            noise_radius: 30.0,
            noise_candidates: 30,
            seed: 12345,

            // Stitching
            hierarchy_level: 0,
            max_merge_iterations: 10_000,
            coord_epsilon: 1e-6,

            // Simplification - calibrated against real map output,
            // flagged for re-tuning
            prune_length_threshold: 4.2,
            prune_closeness_ratio_floor: 0.075,
            relax_tension: 0.4,
            relax_closeness_cap: 1.0,
            straight_merge_closeness_floor: 0.075,
            straight_merge_abs_tolerance: 3.0,
            straight_merge_rel_tolerance: 0.05,
            max_merged_edge_length: 500.0,
            dangerous_length_ratio: 10.0,

            // Separation
            separation_tension: 0.3,

            // Salients
            salient_max_distance: 27.5,
            salient_step: 2.0,
        }
    }
}

impl BorderConfig {
    /// Create config with custom seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, ..Default::default() }
    }

    /// Create a smaller, denser config for faster testing.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            bounds: BoundingBox::new(-100.0, -100.0, 100.0, 100.0),
            noise_radius: 10.0,
            seed,
            ..Default::default()
        }
    }

    /// Deterministic u64 seed from a seed string (FNV-1a, stable across
    /// platforms).
    pub fn seed_from_str(seed: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in seed.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}
