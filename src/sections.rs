//! Border sections: maximal polylines stitched from individual edges.
//!
//! The builder groups raw border edges by affiliation pair and greedily
//! splices chains at shared endpoints until nothing merges. The merger then
//! combines single-pair sections across a hierarchy level into sections
//! that track one primary affiliation, which is what makes regional
//! (sub-faction) borders possible.
//!
//! Both are fixed-point loops with an iteration ceiling; hitting the
//! ceiling is a logged degradation, never an error.

use log::warn;

use crate::affiliation::Affiliation;
use crate::edges::BorderEdge;

/// Outcome of a bounded fixed-point loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Convergence {
    pub converged: bool,
    pub iterations: u32,
}

impl Convergence {
    pub fn combine(&mut self, other: Convergence) {
        self.converged &= other.converged;
        self.iterations += other.iterations;
    }
}

/// An ordered, directed chain of border edges.
///
/// Invariant: `edges[i].n2 == edges[i + 1].n1` for all interior i, and the
/// wraparound holds when `is_loop`.
#[derive(Debug, Clone)]
pub struct BorderSection {
    pub edges: Vec<BorderEdge>,
    pub is_loop: bool,
    /// The affiliation this section was merged around, once the merger has
    /// fixed it. Single-pair sections leave it unset.
    pub primary_affiliation: Option<Affiliation>,
}

impl BorderSection {
    pub fn from_edge(edge: BorderEdge) -> Self {
        Self {
            edges: vec![edge],
            is_loop: false,
            primary_affiliation: None,
        }
    }

    pub fn from_edges(edges: Vec<BorderEdge>) -> Self {
        let mut section = Self {
            edges,
            is_loop: false,
            primary_affiliation: None,
        };
        section.update_loop_flag();
        section
    }

    /// First endpoint node id.
    pub fn node1(&self) -> usize {
        self.edges[0].n1
    }

    /// Last endpoint node id.
    pub fn node2(&self) -> usize {
        self.edges[self.edges.len() - 1].n2
    }

    pub fn total_length(&self) -> f64 {
        self.edges.iter().map(|e| e.length).sum()
    }

    /// The two affiliations of the leading edge. For single-pair sections
    /// this covers the whole chain.
    pub fn affiliations(&self) -> (&Affiliation, &Affiliation) {
        (&self.edges[0].aff1, &self.edges[0].aff2)
    }

    /// True when either side of the leading edge is sentinel territory.
    pub fn borders_sentinel(&self) -> bool {
        let (a, b) = self.affiliations();
        !a.claimed() || !b.claimed()
    }

    pub fn update_loop_flag(&mut self) {
        self.is_loop = self.edges.len() > 1 && self.node1() == self.node2();
    }

    /// Reverse the chain in place, flipping every edge.
    pub fn reverse(&mut self) {
        self.edges.reverse();
        for edge in &mut self.edges {
            edge.reverse();
        }
    }

    /// Append `other` to this section's tail. Caller guarantees
    /// `self.node2() == other.node1()`.
    fn append(&mut self, mut other: BorderSection) {
        debug_assert_eq!(self.node2(), other.node1());
        self.edges.append(&mut other.edges);
        self.update_loop_flag();
    }

    /// Chain-continuity check used by tests and debug assertions.
    pub fn is_continuous(&self) -> bool {
        self.edges
            .windows(2)
            .all(|pair| pair[0].n2 == pair[1].n1)
            && (!self.is_loop || self.node1() == self.node2())
    }
}

/// Try to splice `b` onto `a` at a shared endpoint, reversing `b` as
/// needed. Returns `b` unchanged when no endpoints coincide.
fn try_splice(a: &mut BorderSection, mut b: BorderSection) -> Option<BorderSection> {
    if a.node2() == b.node1() {
        a.append(b);
        return None;
    }
    if a.node2() == b.node2() {
        b.reverse();
        a.append(b);
        return None;
    }
    if a.node1() == b.node2() {
        std::mem::swap(a, &mut b);
        a.append(b);
        return None;
    }
    if a.node1() == b.node1() {
        b.reverse();
        std::mem::swap(a, &mut b);
        a.append(b);
        return None;
    }
    Some(b)
}

/// Greedily stitch sections at shared endpoints until a fixed point.
///
/// Loops are finished sections and take no further part in matching.
pub fn stitch_sections(
    sections: &mut Vec<BorderSection>,
    max_iterations: u32,
) -> Convergence {
    let mut iterations = 0;
    loop {
        if iterations >= max_iterations {
            return Convergence {
                converged: false,
                iterations,
            };
        }
        iterations += 1;

        let mut merged_any = false;
        let mut i = 0;
        while i < sections.len() {
            if sections[i].is_loop {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < sections.len() {
                if sections[j].is_loop {
                    j += 1;
                    continue;
                }
                let candidate = sections.swap_remove(j);
                match try_splice(&mut sections[i], candidate) {
                    None => {
                        merged_any = true;
                        // A splice may have closed this section into a
                        // loop; absorbing anything further would run past
                        // the closure point and re-open it.
                        if sections[i].is_loop {
                            break;
                        }
                        // Restart the inner scan; the merged section has
                        // new endpoints.
                        j = i + 1;
                    }
                    Some(unmerged) => {
                        // Undo the swap_remove: put the candidate back at j
                        // and the displaced section back at the end.
                        sections.push(unmerged);
                        let last = sections.len() - 1;
                        sections.swap(j, last);
                        j += 1;
                    }
                }
            }
            i += 1;
        }

        if !merged_any {
            return Convergence {
                converged: true,
                iterations,
            };
        }
    }
}

/// Build maximal single-pair sections from the extractor's edge buckets.
pub fn build_sections(
    edge_map: std::collections::HashMap<String, Vec<BorderEdge>>,
    max_iterations: u32,
) -> (Vec<BorderSection>, Convergence) {
    let mut out = Vec::new();
    let mut convergence = Convergence {
        converged: true,
        iterations: 0,
    };

    let mut keys: Vec<String> = edge_map.keys().cloned().collect();
    keys.sort();

    let mut edge_map = edge_map;
    for key in keys {
        let edges = edge_map.remove(&key).unwrap_or_default();
        let mut sections: Vec<BorderSection> =
            edges.into_iter().map(BorderSection::from_edge).collect();
        let result = stitch_sections(&mut sections, max_iterations);
        if !result.converged {
            warn!(
                "section stitching for {} hit the iteration ceiling with {} sections left",
                key,
                sections.len()
            );
        }
        convergence.combine(result);
        out.extend(sections);
    }

    (out, convergence)
}

/// The claimed affiliation two sections share at `level`, honoring an
/// already-fixed primary on either side.
fn shared_affiliation(
    a: &BorderSection,
    b: &BorderSection,
    level: usize,
) -> Option<Affiliation> {
    let a_affs = [a.affiliations().0.clone(), a.affiliations().1.clone()];
    let b_affs = [b.affiliations().0.clone(), b.affiliations().1.clone()];

    for aff in &a_affs {
        if !aff.claimed() {
            continue;
        }
        if !b_affs.iter().any(|other| other.matches_at_level(aff, level)) {
            continue;
        }
        let candidate = level_affiliation(aff, level);
        if let Some(primary) = &a.primary_affiliation {
            if *primary != candidate {
                continue;
            }
        }
        if let Some(primary) = &b.primary_affiliation {
            if *primary != candidate {
                continue;
            }
        }
        return Some(candidate);
    }
    None
}

/// An affiliation reduced to its identity at the given hierarchy level.
fn level_affiliation(aff: &Affiliation, level: usize) -> Affiliation {
    match aff.faction_id() {
        Some(id) => Affiliation::faction(id.truncated(level)),
        None => aff.clone(),
    }
}

/// Merge single-pair sections across one hierarchy level.
///
/// Sections bordering sentinel territory merge last; larger sections merge
/// first. Every merge fixes (or confirms) the growing section's primary
/// affiliation.
pub fn merge_sections(
    sections: &mut Vec<BorderSection>,
    level: usize,
    max_iterations: u32,
) -> Convergence {
    // Sort priority: claimed-claimed borders first, then by size.
    sections.sort_by(|a, b| {
        a.borders_sentinel()
            .cmp(&b.borders_sentinel())
            .then(b.edges.len().cmp(&a.edges.len()))
    });

    let mut iterations = 0;
    loop {
        if iterations >= max_iterations {
            warn!(
                "section merge at level {} hit the iteration ceiling with {} sections",
                level,
                sections.len()
            );
            return Convergence {
                converged: false,
                iterations,
            };
        }
        iterations += 1;

        let mut merged_any = false;
        let mut i = 0;
        while i < sections.len() {
            if sections[i].is_loop {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < sections.len() {
                if sections[j].is_loop {
                    j += 1;
                    continue;
                }
                let Some(primary) = shared_affiliation(&sections[i], &sections[j], level)
                else {
                    j += 1;
                    continue;
                };
                let candidate = sections.remove(j);
                match try_splice(&mut sections[i], candidate) {
                    None => {
                        sections[i].primary_affiliation = Some(primary);
                        merged_any = true;
                        // Same guard as stitching: a freshly closed loop
                        // must stop absorbing neighbors.
                        if sections[i].is_loop {
                            break;
                        }
                        j = i + 1;
                    }
                    Some(unmerged) => {
                        sections.insert(j, unmerged);
                        j += 1;
                    }
                }
            }
            i += 1;
        }

        if !merged_any {
            return Convergence {
                converged: true,
                iterations,
            };
        }
    }
}
