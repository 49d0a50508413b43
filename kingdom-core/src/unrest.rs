//! Unrest tiers and the incident table.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::OnceLock;

use crate::checks::{DegreeOfSuccess, OutcomeEffects};
use crate::config::KingdomConfig;
use crate::constants::{UNREST_TIER_DISCONTENT, UNREST_TIER_REBELLION, UNREST_TIER_TURMOIL};
use crate::numbers::clamp_probability;
use crate::state::KingdomState;

const DEFAULT_INCIDENT_DATA: &str = include_str!("../data/incidents.json");

/// Skill list stored inline for the common case of a handful of options.
pub type SkillList = SmallVec<[String; 4]>;

/// Unrest bands. Higher tiers roll for incidents and penalize checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrestTier {
    Stable,
    Discontent,
    Turmoil,
    Rebellion,
}

impl UnrestTier {
    #[must_use]
    pub const fn from_unrest(unrest: u32) -> Self {
        if unrest >= UNREST_TIER_REBELLION {
            Self::Rebellion
        } else if unrest >= UNREST_TIER_TURMOIL {
            Self::Turmoil
        } else if unrest >= UNREST_TIER_DISCONTENT {
            Self::Discontent
        } else {
            Self::Stable
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Stable => 0,
            Self::Discontent => 1,
            Self::Turmoil => 2,
            Self::Rebellion => 3,
        }
    }

    /// Check penalty applied to kingdom skill checks.
    #[must_use]
    pub const fn penalty(self) -> i32 {
        match self {
            Self::Stable => 0,
            Self::Discontent => -1,
            Self::Turmoil => -2,
            Self::Rebellion => -3,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Discontent => "Discontent",
            Self::Turmoil => "Turmoil",
            Self::Rebellion => "Rebellion",
        }
    }
}

impl fmt::Display for UnrestTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[must_use]
pub const fn get_unrest_tier(unrest: u32) -> u8 {
    UnrestTier::from_unrest(unrest).index()
}

#[must_use]
pub const fn get_unrest_penalty(unrest: u32) -> i32 {
    UnrestTier::from_unrest(unrest).penalty()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IncidentOutcome {
    pub message: String,
    #[serde(default)]
    pub effects: OutcomeEffects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDef {
    pub id: String,
    pub name: String,
    pub tier: u8,
    #[serde(default)]
    pub description: String,
    /// Display only; selection is uniform within a tier.
    #[serde(default)]
    pub percentile_min: u8,
    #[serde(default)]
    pub percentile_max: u8,
    #[serde(default)]
    pub skills: SkillList,
    pub success: IncidentOutcome,
    pub failure: IncidentOutcome,
    pub critical_failure: IncidentOutcome,
}

impl IncidentDef {
    /// Outcome branch for a check result. Critical success shares the success branch.
    #[must_use]
    pub const fn outcome_for(&self, degree: DegreeOfSuccess) -> &IncidentOutcome {
        match degree {
            DegreeOfSuccess::CriticalSuccess | DegreeOfSuccess::Success => &self.success,
            DegreeOfSuccess::Failure => &self.failure,
            DegreeOfSuccess::CriticalFailure => &self.critical_failure,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentCatalog {
    #[serde(default)]
    pub incidents: Vec<IncidentDef>,
}

impl IncidentCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_INCIDENT_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn from_incidents(incidents: Vec<IncidentDef>) -> Self {
        Self { incidents }
    }

    /// Incidents belonging to `tier`, in table order.
    pub fn tier(&self, tier: u8) -> impl Iterator<Item = &IncidentDef> + '_ {
        self.incidents.iter().filter(move |def| def.tier == tier)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&IncidentDef> {
        self.incidents.iter().find(|def| def.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

#[must_use]
pub fn incident_catalog() -> &'static IncidentCatalog {
    static CATALOG: OnceLock<IncidentCatalog> = OnceLock::new();
    CATALOG.get_or_init(IncidentCatalog::load_from_static)
}

/// Roll for an incident at `tier`.
///
/// Tier 0 never rolls. Otherwise a draw below the tier's no-incident chance
/// yields nothing, and any other draw picks uniformly from the tier table.
pub fn roll_for_incident<'a, R>(
    tier: u8,
    catalog: &'a IncidentCatalog,
    cfg: &KingdomConfig,
    rng: &mut R,
) -> Option<&'a IncidentDef>
where
    R: Rng + ?Sized,
{
    if tier == 0 {
        return None;
    }
    let chance = clamp_probability(cfg.no_incident_chance_for(tier));
    if rng.r#gen::<f32>() < chance {
        return None;
    }
    let table: SmallVec<[&IncidentDef; 8]> = catalog.tier(tier).collect();
    if table.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..table.len());
    table.get(idx).copied()
}

/// Unrest gained during the Unrest phase, broken down by source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnrestBreakdown {
    pub war: u32,
    pub size: u32,
}

impl UnrestBreakdown {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.war.saturating_add(self.size)
    }
}

/// Passive unrest sources for the turn.
#[must_use]
pub fn calculate_turn_unrest(state: &KingdomState, cfg: &KingdomConfig) -> UnrestBreakdown {
    let war = if state.at_war { cfg.war_unrest } else { 0 };
    let size = u32::try_from(state.size()).unwrap_or(u32::MAX);
    let reached = cfg
        .size_unrest_thresholds
        .iter()
        .filter(|threshold| size >= **threshold)
        .count();
    UnrestBreakdown {
        war,
        size: u32::try_from(reached).unwrap_or(u32::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn tier_boundaries() {
        for (unrest, tier) in [(0, 0), (2, 0), (3, 1), (5, 1), (6, 2), (8, 2), (9, 3), (40, 3)] {
            assert_eq!(get_unrest_tier(unrest), tier, "unrest {unrest}");
        }
        assert_eq!(get_unrest_penalty(7), -2);
        assert_eq!(UnrestTier::from_unrest(9).label(), "Rebellion");
    }

    #[test]
    fn static_catalog_covers_every_tier() {
        let catalog = incident_catalog();
        for tier in 1..=3 {
            assert!(catalog.tier(tier).count() >= 5, "tier {tier}");
        }
        assert_eq!(catalog.tier(0).count(), 0);
        for def in &catalog.incidents {
            assert!(def.percentile_min <= def.percentile_max, "{}", def.id);
            assert!(!def.skills.is_empty(), "{}", def.id);
        }
    }

    #[test]
    fn stable_kingdoms_never_roll() {
        let mut rng = SmallRng::seed_from_u64(3);
        let cfg = KingdomConfig::default();
        for _ in 0..200 {
            assert!(roll_for_incident(0, incident_catalog(), &cfg, &mut rng).is_none());
        }
    }

    #[test]
    fn certain_no_incident_chance_blocks_rolls() {
        let mut rng = SmallRng::seed_from_u64(5);
        let cfg = KingdomConfig {
            no_incident_chance: [1.0, 1.0, 1.0],
            ..KingdomConfig::default()
        };
        for tier in 1..=3 {
            assert!(roll_for_incident(tier, incident_catalog(), &cfg, &mut rng).is_none());
        }
    }

    #[test]
    fn zero_no_incident_chance_always_picks_from_tier() {
        let mut rng = SmallRng::seed_from_u64(8);
        let cfg = KingdomConfig {
            no_incident_chance: [0.0, 0.0, 0.0],
            ..KingdomConfig::default()
        };
        for _ in 0..50 {
            let def = roll_for_incident(2, incident_catalog(), &cfg, &mut rng).unwrap();
            assert_eq!(def.tier, 2);
        }
    }

    #[test]
    fn empty_tier_table_yields_nothing() {
        let mut rng = SmallRng::seed_from_u64(1);
        let cfg = KingdomConfig {
            no_incident_chance: [0.0, 0.0, 0.0],
            ..KingdomConfig::default()
        };
        let empty = IncidentCatalog::default();
        assert!(roll_for_incident(1, &empty, &cfg, &mut rng).is_none());
    }

    #[test]
    fn critical_success_uses_success_branch() {
        let def = incident_catalog().tier(1).next().unwrap();
        assert_eq!(
            def.outcome_for(DegreeOfSuccess::CriticalSuccess),
            def.outcome_for(DegreeOfSuccess::Success)
        );
        assert_eq!(def.outcome_for(DegreeOfSuccess::CriticalFailure), &def.critical_failure);
    }
}
