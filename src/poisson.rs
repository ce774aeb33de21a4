//! Background noise point generation.
//!
//! Bridson-style Poisson-disc sampling fills the map with evenly spaced
//! filler points so the Delaunay triangulation is well conditioned far from
//! any star system. Reserved points (systems, salient bridge points) are
//! pinned first and suppress noise in their neighborhood; generated filler
//! points carry the unclaimed affiliation.
//!
//! Deterministic: the same seed and reserved set always produce the same
//! aggregate point list.

use std::collections::HashMap;

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::affiliation::Affiliation;
use crate::config::BorderConfig;
use crate::geometry::{BoundingBox, Point};

/// One input point for the triangulation: a position plus the affiliation
/// of whoever controls it.
#[derive(Debug, Clone)]
pub struct MapPoint {
    pub pos: Point,
    pub affiliation: Affiliation,
}

impl MapPoint {
    pub fn new(pos: Point, affiliation: Affiliation) -> Self {
        Self { pos, affiliation }
    }

    pub fn unclaimed(pos: Point) -> Self {
        Self {
            pos,
            affiliation: Affiliation::unclaimed(),
        }
    }
}

/// Poisson-disc sampler with externally pinned points.
#[derive(Debug, Clone)]
pub struct PoissonSampler {
    bounds: BoundingBox,
    radius: f64,
    candidates: u32,
    seed: u64,
    reserved: Vec<MapPoint>,
    points: Vec<MapPoint>,
}

impl PoissonSampler {
    pub fn new(config: &BorderConfig) -> Self {
        let mut sampler = Self {
            bounds: config.bounds,
            radius: config.noise_radius,
            candidates: config.noise_candidates,
            seed: config.seed,
            reserved: Vec::new(),
            points: Vec::new(),
        };
        sampler.regenerate();
        sampler
    }

    /// Replace the pinned point set and re-aggregate noise around it.
    /// Regeneration restarts from the seed, so the result is deterministic
    /// regardless of how many times the reserved set changed.
    pub fn replace_reserved_points(&mut self, points: Vec<MapPoint>) {
        self.reserved = points;
        self.regenerate();
    }

    /// The aggregate point set: reserved points first, then noise.
    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    fn regenerate(&mut self) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let cell_size = self.radius / std::f64::consts::SQRT_2;
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();

        let cell_of = |p: &Point| -> (i64, i64) {
            (
                (p.x / cell_size).floor() as i64,
                (p.y / cell_size).floor() as i64,
            )
        };

        let mut points: Vec<MapPoint> = Vec::new();
        let mut active: Vec<usize> = Vec::new();

        // Reserved points go in first. They may violate the disc spacing
        // among themselves (systems sit where they sit), so the grid keeps
        // a list per cell.
        for reserved in &self.reserved {
            let idx = points.len();
            grid.entry(cell_of(&reserved.pos)).or_default().push(idx);
            points.push(reserved.clone());
            active.push(idx);
        }

        // Noise spacing is only enforced against generated points and
        // reserved points, never between two reserved points.
        let fits = |grid: &HashMap<(i64, i64), Vec<usize>>,
                    points: &[MapPoint],
                    candidate: &Point| {
            let (cx, cy) = cell_of(candidate);
            for gx in (cx - 2)..=(cx + 2) {
                for gy in (cy - 2)..=(cy + 2) {
                    if let Some(indices) = grid.get(&(gx, gy)) {
                        for &i in indices {
                            if points[i].pos.distance(candidate) < self.radius {
                                return false;
                            }
                        }
                    }
                }
            }
            true
        };

        // Seed the field when there is nothing to grow from.
        if active.is_empty() {
            let p = Point::new(
                rng.gen_range(self.bounds.min.x..self.bounds.max.x),
                rng.gen_range(self.bounds.min.y..self.bounds.max.y),
            );
            grid.entry(cell_of(&p)).or_default().push(0);
            points.push(MapPoint::unclaimed(p));
            active.push(0);
        }

        while !active.is_empty() {
            let slot = rng.gen_range(0..active.len());
            let base = points[active[slot]].pos;
            let mut placed = false;

            for _ in 0..self.candidates {
                let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                let dist = rng.gen_range(self.radius..self.radius * 2.0);
                let candidate = Point::new(
                    base.x + angle.cos() * dist,
                    base.y + angle.sin() * dist,
                );
                if !self.bounds.contains(&candidate) {
                    continue;
                }
                if fits(&grid, &points, &candidate) {
                    let idx = points.len();
                    grid.entry(cell_of(&candidate)).or_default().push(idx);
                    points.push(MapPoint::unclaimed(candidate));
                    active.push(idx);
                    placed = true;
                    break;
                }
            }

            if !placed {
                active.swap_remove(slot);
            }
        }

        self.points = points;
    }
}
