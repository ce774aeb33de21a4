//! Faction metadata registry.
//!
//! Display names and colors live here; geometry never consults this module.
//! Unknown affiliation keys are tolerated with a logged placeholder so
//! downstream labeling and rendering can proceed.

use std::collections::HashMap;

use log::warn;

use crate::affiliation::FactionId;

/// Display metadata for one faction.
#[derive(Debug, Clone)]
pub struct Faction {
    pub id: FactionId,
    /// Human-readable name ("Federated Suns").
    pub name: String,
    /// Render color as a CSS-style hex string ("#f3c314").
    pub color: String,
}

impl Faction {
    pub fn new<S: Into<String>>(id: S, name: S, color: S) -> Self {
        Self {
            id: FactionId::new(id.into()),
            name: name.into(),
            color: color.into(),
        }
    }

    /// Placeholder record substituted for unknown ids.
    fn placeholder(id: &FactionId) -> Self {
        Self {
            id: id.clone(),
            name: format!("Unknown ({})", id),
            color: "#888888".to_string(),
        }
    }
}

/// Lookup table from faction id to metadata.
#[derive(Debug, Clone, Default)]
pub struct FactionRegistry {
    factions: HashMap<FactionId, Faction>,
}

impl FactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, faction: Faction) {
        self.factions.insert(faction.id.clone(), faction);
    }

    pub fn get(&self, id: &FactionId) -> Option<&Faction> {
        self.factions.get(id)
    }

    /// Metadata for `id`, or a logged placeholder when the data never
    /// declared the faction. Never fails; sub-affiliations fall back to
    /// their top-level faction before the placeholder.
    pub fn get_or_placeholder(&self, id: &FactionId) -> Faction {
        if let Some(f) = self.factions.get(id) {
            return f.clone();
        }
        let top = FactionId::new(id.top_level());
        if let Some(f) = self.factions.get(&top) {
            return f.clone();
        }
        warn!("no metadata for faction {}, substituting placeholder", id);
        Faction::placeholder(id)
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_faction_lookup() {
        let mut registry = FactionRegistry::new();
        registry.insert(Faction::new("FS", "Federated Suns", "#f3c314"));
        let f = registry.get_or_placeholder(&FactionId::new("FS"));
        assert_eq!(f.name, "Federated Suns");
    }

    #[test]
    fn test_sub_affiliation_falls_back_to_top_level() {
        let mut registry = FactionRegistry::new();
        registry.insert(Faction::new("FS", "Federated Suns", "#f3c314"));
        let f = registry.get_or_placeholder(&FactionId::new("FS.CrucisMarch"));
        assert_eq!(f.name, "Federated Suns");
    }

    #[test]
    fn test_unknown_faction_gets_placeholder() {
        let registry = FactionRegistry::new();
        let f = registry.get_or_placeholder(&FactionId::new("XX"));
        assert!(f.name.contains("Unknown"));
        assert_eq!(f.color, "#888888");
    }
}
