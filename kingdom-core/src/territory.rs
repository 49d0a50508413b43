//! Claimed territory, worksites and the derived production cache.
//!
//! The cache is never authoritative. Every mutation that can change a hex's
//! yield drops it, and [`Territory::calculate_production`] rebuilds it on the
//! next read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::constants::{
    BOG_MINE_ORE, FARMSTEAD_HILLS_FOOD, FARMSTEAD_PLAINS_FOOD, LOGGING_CAMP_LUMBER, MINE_ORE,
    QUARRY_STONE, SPECIAL_TRAIT_BONUS,
};
use crate::error::ValidationError;
use crate::resources::{ResourceKind, ResourceLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Plains,
    Forest,
    Hills,
    Mountains,
    Swamp,
    Desert,
    Water,
}

impl Terrain {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plains => "plains",
            Self::Forest => "forest",
            Self::Hills => "hills",
            Self::Mountains => "mountains",
            Self::Swamp => "swamp",
            Self::Desert => "desert",
            Self::Water => "water",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksiteKind {
    Farmstead,
    LoggingCamp,
    Mine,
    Quarry,
    BogMine,
}

impl WorksiteKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Farmstead => "Farmstead",
            Self::LoggingCamp => "Logging Camp",
            Self::Mine => "Mine",
            Self::Quarry => "Quarry",
            Self::BogMine => "Bog Mine",
        }
    }

    /// The worksite actually built when `self` is requested on `terrain`.
    ///
    /// Returns `None` when the terrain does not allow it. A mine requested on
    /// swamp becomes a bog mine.
    #[must_use]
    pub const fn resolve_for(self, terrain: Terrain) -> Option<Self> {
        match (self, terrain) {
            (Self::Farmstead, Terrain::Plains | Terrain::Hills)
            | (Self::LoggingCamp, Terrain::Forest)
            | (Self::Mine, Terrain::Mountains | Terrain::Hills)
            | (Self::Quarry, Terrain::Hills | Terrain::Mountains) => Some(self),
            (Self::Mine | Self::BogMine, Terrain::Swamp) => Some(Self::BogMine),
            _ => None,
        }
    }

    /// Base yield on the given terrain, before the special-trait bonus.
    #[must_use]
    pub const fn base_yield(self, terrain: Terrain) -> Option<(ResourceKind, u32)> {
        match (self, terrain) {
            (Self::Farmstead, Terrain::Plains) => Some((ResourceKind::Food, FARMSTEAD_PLAINS_FOOD)),
            (Self::Farmstead, Terrain::Hills) => Some((ResourceKind::Food, FARMSTEAD_HILLS_FOOD)),
            (Self::LoggingCamp, Terrain::Forest) => {
                Some((ResourceKind::Lumber, LOGGING_CAMP_LUMBER))
            }
            (Self::Mine, Terrain::Mountains | Terrain::Hills) => Some((ResourceKind::Ore, MINE_ORE)),
            (Self::BogMine, Terrain::Swamp) => Some((ResourceKind::Ore, BOG_MINE_ORE)),
            (Self::Quarry, Terrain::Hills | Terrain::Mountains) => {
                Some((ResourceKind::Stone, QUARRY_STONE))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksite {
    pub kind: WorksiteKind,
}

/// Who holds a hex or leads an army.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOwner {
    PlayerKingdom,
    Faction(String),
    #[default]
    Neutral,
}

impl ClaimOwner {
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self, Self::PlayerKingdom)
    }
}

/// A claimed map cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex {
    pub id: String,
    pub terrain: Terrain,
    #[serde(default)]
    pub worksite: Option<Worksite>,
    #[serde(default)]
    pub has_special_trait: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "player_owned")]
    pub claimed_by: ClaimOwner,
    #[serde(default)]
    pub has_road: bool,
}

/// Hexes without an owner belong to the kingdom, matching [`Hex::new`].
const fn player_owned() -> ClaimOwner {
    ClaimOwner::PlayerKingdom
}

impl Hex {
    #[must_use]
    pub fn new(id: impl Into<String>, terrain: Terrain) -> Self {
        Self {
            id: id.into(),
            terrain,
            worksite: None,
            has_special_trait: false,
            name: None,
            claimed_by: ClaimOwner::PlayerKingdom,
            has_road: false,
        }
    }

    #[must_use]
    pub fn with_worksite(mut self, kind: WorksiteKind) -> Self {
        self.worksite = kind
            .resolve_for(self.terrain)
            .map(|kind| Worksite { kind });
        self
    }

    #[must_use]
    pub const fn with_special_trait(mut self) -> Self {
        self.has_special_trait = true;
        self
    }

    /// Resource and amount this hex yields per turn, if any.
    #[must_use]
    pub fn production(&self) -> Option<(ResourceKind, u32)> {
        let worksite = self.worksite?;
        let (kind, base) = worksite.kind.base_yield(self.terrain)?;
        let bonus = if self.has_special_trait {
            SPECIAL_TRAIT_BONUS
        } else {
            0
        };
        Some((kind, base + bonus))
    }
}

/// Read-only projection handed to the map layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexView {
    pub id: String,
    pub terrain: Terrain,
    pub worksite: Option<WorksiteKind>,
    pub claimed_by: ClaimOwner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexProduction {
    pub hex_id: String,
    pub kind: ResourceKind,
    pub amount: u32,
}

/// Derived production totals plus a per-hex breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductionCache {
    pub totals: ResourceLedger,
    pub per_hex: Vec<HexProduction>,
    computed: bool,
}

impl ProductionCache {
    fn compute(hexes: &[Hex]) -> Self {
        let mut totals = ResourceLedger::new();
        let mut per_hex = Vec::new();
        for hex in hexes {
            if let Some((kind, amount)) = hex.production() {
                totals.add(kind, amount);
                per_hex.push(HexProduction {
                    hex_id: hex.id.clone(),
                    kind,
                    amount,
                });
            }
        }
        Self {
            totals,
            per_hex,
            computed: true,
        }
    }

    #[must_use]
    pub const fn is_computed(&self) -> bool {
        self.computed
    }
}

/// Ordered collection of hexes claimed by the kingdom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Territory {
    #[serde(default)]
    hexes: Vec<Hex>,
    #[serde(default)]
    revision: u64,
    #[serde(skip)]
    cache: ProductionCache,
}

// The cache is derived, so two territories with the same cells are equal
// regardless of whether either has been read yet.
impl PartialEq for Territory {
    fn eq(&self, other: &Self) -> bool {
        self.hexes == other.hexes && self.revision == other.revision
    }
}

impl Eq for Territory {}

impl Territory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_hexes(hexes: Vec<Hex>) -> Self {
        let mut territory = Self::new();
        territory.replace_all(hexes);
        territory
    }

    #[must_use]
    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Hex> {
        self.hexes.iter().find(|hex| hex.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of claimed hexes; the kingdom's size.
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.hexes.len()
    }

    fn touch(&mut self) {
        self.revision = self.revision.saturating_add(1);
        self.cache = ProductionCache::default();
    }

    fn hex_mut(&mut self, id: &str) -> Result<&mut Hex, ValidationError> {
        self.hexes
            .iter_mut()
            .find(|hex| hex.id == id)
            .ok_or_else(|| ValidationError::HexNotClaimed(id.to_string()))
    }

    /// Claim a hex for the kingdom. An existing hex with the same id is replaced.
    pub fn claim(&mut self, mut hex: Hex) {
        hex.claimed_by = ClaimOwner::PlayerKingdom;
        if let Some(worksite) = hex.worksite {
            hex.worksite = worksite
                .kind
                .resolve_for(hex.terrain)
                .map(|kind| Worksite { kind });
        }
        if let Some(existing) = self.hexes.iter_mut().find(|h| h.id == hex.id) {
            *existing = hex;
        } else {
            self.hexes.push(hex);
        }
        self.touch();
    }

    /// Release a hex. Returns the removed hex when it was claimed.
    pub fn unclaim(&mut self, id: &str) -> Option<Hex> {
        let idx = self.hexes.iter().position(|hex| hex.id == id)?;
        let removed = self.hexes.remove(idx);
        self.touch();
        Some(removed)
    }

    /// Place a worksite, returning the kind actually built.
    ///
    /// # Errors
    ///
    /// Rejects unknown hexes and terrain the worksite cannot stand on. The hex
    /// is left unchanged on rejection.
    pub fn place_worksite(
        &mut self,
        id: &str,
        kind: WorksiteKind,
    ) -> Result<WorksiteKind, ValidationError> {
        let hex = self.hex_mut(id)?;
        let Some(resolved) = kind.resolve_for(hex.terrain) else {
            log::debug!("rejected {} on {} ({id})", kind.label(), hex.terrain.label());
            return Err(ValidationError::WorksiteTerrain {
                kind,
                terrain: hex.terrain,
            });
        };
        hex.worksite = Some(Worksite { kind: resolved });
        self.touch();
        Ok(resolved)
    }

    /// Remove a worksite. Returns the removed kind, if any.
    ///
    /// # Errors
    ///
    /// Rejects unknown hexes.
    pub fn remove_worksite(&mut self, id: &str) -> Result<Option<WorksiteKind>, ValidationError> {
        let hex = self.hex_mut(id)?;
        let removed = hex.worksite.take().map(|site| site.kind);
        if removed.is_some() {
            self.touch();
        }
        Ok(removed)
    }

    /// Change a hex's terrain. A worksite the new terrain cannot hold is
    /// re-resolved (mine to bog mine on swamp) or removed.
    ///
    /// # Errors
    ///
    /// Rejects unknown hexes.
    pub fn set_terrain(&mut self, id: &str, terrain: Terrain) -> Result<(), ValidationError> {
        let hex = self.hex_mut(id)?;
        hex.terrain = terrain;
        if let Some(site) = hex.worksite {
            let base = match site.kind {
                WorksiteKind::BogMine => WorksiteKind::Mine,
                other => other,
            };
            hex.worksite = base.resolve_for(terrain).map(|kind| Worksite { kind });
        }
        self.touch();
        Ok(())
    }

    /// # Errors
    ///
    /// Rejects unknown hexes.
    pub fn set_special_trait(&mut self, id: &str, value: bool) -> Result<(), ValidationError> {
        let hex = self.hex_mut(id)?;
        hex.has_special_trait = value;
        self.touch();
        Ok(())
    }

    /// Replace every cell at once. Cells held by anyone but the kingdom are
    /// dropped so the kingdom's size always matches the list length.
    pub fn replace_all(&mut self, hexes: Vec<Hex>) {
        self.hexes = hexes
            .into_iter()
            .filter(|hex| hex.claimed_by.is_player())
            .collect();
        self.touch();
    }

    /// Production totals, rebuilt first if the cache has been invalidated.
    pub fn calculate_production(&mut self) -> &ProductionCache {
        if !self.cache.is_computed() {
            self.recompute_production();
        }
        &self.cache
    }

    /// Unconditionally rebuild the production cache.
    pub fn recompute_production(&mut self) {
        self.cache = ProductionCache::compute(&self.hexes);
    }

    /// Cached production without recomputing; `None` while invalidated.
    #[must_use]
    pub fn cached_production(&self) -> Option<&ProductionCache> {
        self.cache.is_computed().then_some(&self.cache)
    }

    #[must_use]
    pub fn worksite_counts(&self) -> BTreeMap<WorksiteKind, u32> {
        let mut counts = BTreeMap::new();
        for site in self.hexes.iter().filter_map(|hex| hex.worksite) {
            *counts.entry(site.kind).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<HexView> {
        self.hexes
            .iter()
            .map(|hex| HexView {
                id: hex.id.clone(),
                terrain: hex.terrain,
                worksite: hex.worksite.map(|site| site.kind),
                claimed_by: hex.claimed_by.clone(),
            })
            .collect()
    }

    /// Content hash of the claimed cells, independent of revision.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        let bytes = serde_json::to_vec(&self.hexes).unwrap_or_default();
        hasher.write(&bytes);
        hasher.finish()
    }
}
