//! Affiliation model: who controls a point or region.
//!
//! Raw map data encodes ownership as a comma-joined token
//! (`"FS"`, `"LC.TamarPact,D:FC"`, `"I"`, `""`). This module parses that
//! token once into a tagged structure so the geometry passes never touch
//! string encodings, and so the sentinel "nobody interesting" cases are
//! exhaustive match arms instead of string comparisons.

use std::cmp::Ordering;
use std::fmt;

/// Identifier of a faction. Dot-separated segments encode the affiliation
/// hierarchy: `"FS"` is the top-level faction, `"FS.CrucisMarch"` a level-1
/// sub-affiliation, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactionId(pub String);

impl FactionId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id truncated to `level + 1` hierarchy segments.
    /// `"FS.CrucisMarch".truncated(0) == "FS"`.
    pub fn truncated(&self, level: usize) -> &str {
        let mut end = self.0.len();
        for (count, (idx, _)) in self.0.match_indices('.').enumerate() {
            if count == level {
                end = idx;
                break;
            }
        }
        &self.0[..end]
    }

    /// Top-level faction id (level 0 truncation).
    pub fn top_level(&self) -> &str {
        self.truncated(0)
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The controlling territory of a point: a faction, or one of the two
/// sentinel states that never generate borders between each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Territory {
    /// Background noise filler; nobody claims this space.
    Unclaimed,
    /// Independent worlds; owned, but by no map-level faction.
    Independent,
    /// A faction (possibly a hierarchical sub-affiliation).
    Faction(FactionId),
}

impl Territory {
    /// True for a real faction claim (not a sentinel).
    pub fn claimed(&self) -> bool {
        matches!(self, Territory::Faction(_))
    }

    pub fn faction_id(&self) -> Option<&FactionId> {
        match self {
            Territory::Faction(id) => Some(id),
            _ => None,
        }
    }
}

/// Full affiliation of a point: the primary territory plus the disputed /
/// hidden modifiers the raw data may carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Affiliation {
    pub territory: Territory,
    /// Other factions contesting this territory, if any.
    pub disputed_with: Option<Vec<FactionId>>,
    /// Faction whose territory visually occludes this one, if any.
    pub hidden_behind: Option<FactionId>,
}

impl Affiliation {
    pub fn unclaimed() -> Self {
        Self {
            territory: Territory::Unclaimed,
            disputed_with: None,
            hidden_behind: None,
        }
    }

    pub fn independent() -> Self {
        Self {
            territory: Territory::Independent,
            disputed_with: None,
            hidden_behind: None,
        }
    }

    pub fn faction<S: Into<String>>(id: S) -> Self {
        Self {
            territory: Territory::Faction(FactionId::new(id)),
            disputed_with: None,
            hidden_behind: None,
        }
    }

    /// Parse the raw comma-joined data token. Total: any input yields an
    /// affiliation.
    ///
    /// Grammar: the first token is the primary (`""` -> Unclaimed,
    /// `I`/`independent` -> Independent, anything else a faction id);
    /// `D:<id>` tokens accumulate into `disputed_with`; `H:<id>` sets
    /// `hidden_behind`.
    pub fn parse(raw: &str) -> Self {
        let mut tokens = raw.split(',').map(str::trim);
        let primary = tokens.next().unwrap_or("");

        let territory = match primary {
            "" | "A" | "abandoned" | "empty" => Territory::Unclaimed,
            "I" | "independent" => Territory::Independent,
            id => Territory::Faction(FactionId::new(id)),
        };

        let mut disputed: Vec<FactionId> = Vec::new();
        let mut hidden = None;
        for token in tokens {
            if let Some(id) = token.strip_prefix("D:") {
                disputed.push(FactionId::new(id));
            } else if let Some(id) = token.strip_prefix("H:") {
                hidden = Some(FactionId::new(id));
            } else if !token.is_empty() {
                // Unknown modifier shapes degrade to a dispute entry rather
                // than being dropped silently.
                disputed.push(FactionId::new(token));
            }
        }

        Self {
            territory,
            disputed_with: if disputed.is_empty() { None } else { Some(disputed) },
            hidden_behind: hidden,
        }
    }

    /// True for a real faction claim (not a sentinel).
    pub fn claimed(&self) -> bool {
        self.territory.claimed()
    }

    pub fn faction_id(&self) -> Option<&FactionId> {
        self.territory.faction_id()
    }

    /// Canonical string form, also the "resolved full affiliation string"
    /// salient points carry.
    pub fn key(&self) -> String {
        let mut out = match &self.territory {
            Territory::Unclaimed => String::new(),
            Territory::Independent => "I".to_string(),
            Territory::Faction(id) => id.0.clone(),
        };
        if let Some(disputed) = &self.disputed_with {
            for id in disputed {
                out.push_str(",D:");
                out.push_str(&id.0);
            }
        }
        if let Some(hidden) = &self.hidden_behind {
            out.push_str(",H:");
            out.push_str(&hidden.0);
        }
        out
    }

    /// True when both affiliations resolve to the same faction at the given
    /// hierarchy level. Sentinels only match themselves exactly.
    pub fn matches_at_level(&self, other: &Affiliation, level: usize) -> bool {
        match (&self.territory, &other.territory) {
            (Territory::Faction(a), Territory::Faction(b)) => {
                a.truncated(level) == b.truncated(level)
            }
            (a, b) => a == b,
        }
    }

    /// Stable ordering, used to normalize affiliation pairs.
    pub fn cmp_key(&self, other: &Affiliation) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Affiliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.territory {
            Territory::Unclaimed => f.write_str("(unclaimed)"),
            Territory::Independent => f.write_str("(independent)"),
            Territory::Faction(id) => f.write_str(&id.0),
        }
    }
}

/// True iff neither side of a candidate border is a claimed faction; such
/// a pair never generates a border edge.
pub fn pair_is_disinterested(a: &Affiliation, b: &Affiliation) -> bool {
    match (&a.territory, &b.territory) {
        (Territory::Faction(_), _) | (_, Territory::Faction(_)) => false,
        _ => true,
    }
}

/// Sorted `A___B` bucket key for a pair of differing affiliations.
pub fn pair_key(a: &Affiliation, b: &Affiliation) -> String {
    let (ka, kb) = (a.key(), b.key());
    if ka <= kb {
        format!("{}___{}", ka, kb)
    } else {
        format!("{}___{}", kb, ka)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_faction() {
        let aff = Affiliation::parse("FS");
        assert_eq!(aff.territory, Territory::Faction(FactionId::new("FS")));
        assert!(aff.disputed_with.is_none());
        assert!(aff.hidden_behind.is_none());
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(Affiliation::parse("").territory, Territory::Unclaimed);
        assert_eq!(Affiliation::parse("A").territory, Territory::Unclaimed);
        assert_eq!(Affiliation::parse("I").territory, Territory::Independent);
        assert_eq!(
            Affiliation::parse("independent").territory,
            Territory::Independent
        );
    }

    #[test]
    fn test_parse_modifiers() {
        let aff = Affiliation::parse("LC.TamarPact,D:FC,H:DC");
        assert_eq!(
            aff.territory,
            Territory::Faction(FactionId::new("LC.TamarPact"))
        );
        assert_eq!(aff.disputed_with, Some(vec![FactionId::new("FC")]));
        assert_eq!(aff.hidden_behind, Some(FactionId::new("DC")));
        // Round-trips through the canonical key
        assert_eq!(Affiliation::parse(&aff.key()), aff);
    }

    #[test]
    fn test_hierarchy_truncation() {
        let id = FactionId::new("FS.CrucisMarch.Kentares");
        assert_eq!(id.truncated(0), "FS");
        assert_eq!(id.truncated(1), "FS.CrucisMarch");
        assert_eq!(id.truncated(5), "FS.CrucisMarch.Kentares");
    }

    #[test]
    fn test_matches_at_level() {
        let a = Affiliation::faction("FS.CrucisMarch");
        let b = Affiliation::faction("FS.DraconisMarch");
        assert!(a.matches_at_level(&b, 0));
        assert!(!a.matches_at_level(&b, 1));
        assert!(!a.matches_at_level(&Affiliation::independent(), 0));
        assert!(Affiliation::unclaimed()
            .matches_at_level(&Affiliation::unclaimed(), 0));
    }

    #[test]
    fn test_disinterested_pair() {
        let empty = Affiliation::unclaimed();
        let indy = Affiliation::independent();
        let fs = Affiliation::faction("FS");
        assert!(pair_is_disinterested(&empty, &indy));
        assert!(pair_is_disinterested(&empty, &empty));
        assert!(!pair_is_disinterested(&fs, &empty));
        assert!(!pair_is_disinterested(&fs, &indy));
    }

    #[test]
    fn test_pair_key_is_sorted() {
        let a = Affiliation::faction("LC");
        let b = Affiliation::faction("FS");
        assert_eq!(pair_key(&a, &b), pair_key(&b, &a));
        assert_eq!(pair_key(&a, &b), "FS___LC");
    }
}
