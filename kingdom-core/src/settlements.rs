//! Settlements, armies and the upkeep arithmetic between them.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{SETTLEMENT_ARMY_SUPPORT, SETTLEMENT_FOOD_CONSUMPTION};
use crate::error::ValidationError;
use crate::territory::ClaimOwner;

/// Ordered settlement size. Consumption and support derive from the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SettlementTier {
    #[default]
    Village,
    Town,
    City,
    Metropolis,
}

impl SettlementTier {
    const fn index(self) -> usize {
        match self {
            Self::Village => 0,
            Self::Town => 1,
            Self::City => 2,
            Self::Metropolis => 3,
        }
    }

    #[must_use]
    pub const fn food_consumption(self) -> u32 {
        SETTLEMENT_FOOD_CONSUMPTION[self.index()]
    }

    #[must_use]
    pub const fn army_support(self) -> u32 {
        SETTLEMENT_ARMY_SUPPORT[self.index()]
    }

    #[must_use]
    pub const fn promote(self) -> Self {
        match self {
            Self::Village => Self::Town,
            Self::Town => Self::City,
            Self::City | Self::Metropolis => Self::Metropolis,
        }
    }

    #[must_use]
    pub const fn demote(self) -> Self {
        match self {
            Self::Village | Self::Town => Self::Village,
            Self::City => Self::Town,
            Self::Metropolis => Self::City,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Village => "Village",
            Self::Town => "Town",
            Self::City => "City",
            Self::Metropolis => "Metropolis",
        }
    }
}

impl fmt::Display for SettlementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tier: SettlementTier,
    #[serde(default)]
    pub structure_ids: Vec<String>,
    #[serde(default)]
    pub connected_by_road: bool,
    #[serde(default)]
    pub hex_id: Option<String>,
}

impl Settlement {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, tier: SettlementTier) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            structure_ids: Vec::new(),
            connected_by_road: false,
            hex_id: None,
        }
    }

    #[must_use]
    pub fn has_structure(&self, structure_id: &str) -> bool {
        self.structure_ids.iter().any(|id| id == structure_id)
    }
}

/// Equipment upgrades; each may be applied to an army once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentUpgrade {
    Armor,
    Runes,
    Weapons,
    Potions,
}

impl EquipmentUpgrade {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Armor => "armor",
            Self::Runes => "runes",
            Self::Weapons => "weapons",
            Self::Potions => "potions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EquipmentUpgrades {
    #[serde(default)]
    pub armor: bool,
    #[serde(default)]
    pub runes: bool,
    #[serde(default)]
    pub weapons: bool,
    #[serde(default)]
    pub potions: bool,
}

impl EquipmentUpgrades {
    const fn slot_mut(&mut self, upgrade: EquipmentUpgrade) -> &mut bool {
        match upgrade {
            EquipmentUpgrade::Armor => &mut self.armor,
            EquipmentUpgrade::Runes => &mut self.runes,
            EquipmentUpgrade::Weapons => &mut self.weapons,
            EquipmentUpgrade::Potions => &mut self.potions,
        }
    }

    #[must_use]
    pub const fn has(&self, upgrade: EquipmentUpgrade) -> bool {
        match upgrade {
            EquipmentUpgrade::Armor => self.armor,
            EquipmentUpgrade::Runes => self.runes,
            EquipmentUpgrade::Weapons => self.weapons,
            EquipmentUpgrade::Potions => self.potions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ArmySupport {
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub settlement_id: Option<String>,
    #[serde(default)]
    pub turns_unsupported: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Army {
    pub id: String,
    pub name: String,
    #[serde(default = "default_army_level")]
    pub level: u8,
    #[serde(default)]
    pub led_by: ClaimOwner,
    #[serde(default)]
    pub supported_by: ClaimOwner,
    #[serde(default)]
    pub support: ArmySupport,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub equipment: EquipmentUpgrades,
    #[serde(default)]
    pub exempt_from_upkeep: bool,
}

const fn default_army_level() -> u8 {
    1
}

impl Army {
    /// A kingdom-led army supported by the kingdom.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, level: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
            led_by: ClaimOwner::PlayerKingdom,
            supported_by: ClaimOwner::PlayerKingdom,
            support: ArmySupport::default(),
            actor_id: None,
            equipment: EquipmentUpgrades::default(),
            exempt_from_upkeep: false,
        }
    }

    /// Food this army draws each turn.
    #[must_use]
    pub const fn food_upkeep(&self) -> u32 {
        if self.exempt_from_upkeep { 0 } else { 1 }
    }

    /// Actor backing this army, required for checks made on its behalf.
    ///
    /// # Errors
    ///
    /// Returns [`crate::KingdomError::MissingActor`] when none is linked.
    pub fn require_actor(&self) -> Result<&str, crate::KingdomError> {
        self.actor_id
            .as_deref()
            .ok_or_else(|| crate::KingdomError::MissingActor(self.name.clone()))
    }

    /// Apply an equipment upgrade.
    ///
    /// # Errors
    ///
    /// Rejects an upgrade already applied to this army.
    pub fn apply_equipment(&mut self, upgrade: EquipmentUpgrade) -> Result<(), ValidationError> {
        let slot = self.equipment.slot_mut(upgrade);
        if *slot {
            return Err(ValidationError::UpgradeAlreadyApplied {
                army: self.name.clone(),
                upgrade: upgrade.label().to_string(),
            });
        }
        *slot = true;
        Ok(())
    }
}

/// Food the kingdom must pay this turn: settlement tiers plus one per
/// non-exempt army.
#[must_use]
pub fn total_food_consumption(settlements: &[Settlement], armies: &[Army]) -> u32 {
    let settlement_food = settlements
        .iter()
        .map(|s| s.tier.food_consumption())
        .fold(0_u32, u32::saturating_add);
    armies
        .iter()
        .map(Army::food_upkeep)
        .fold(settlement_food, u32::saturating_add)
}

#[must_use]
pub fn total_army_support(settlements: &[Settlement]) -> u32 {
    settlements
        .iter()
        .map(|s| s.tier.army_support())
        .fold(0, u32::saturating_add)
}

/// Distribute armies over settlement support capacity.
///
/// Exempt armies never occupy a slot and are always supported. An army keeps
/// its current settlement while that settlement has room; the rest fill open
/// slots in settlement order. Returns the number left unsupported.
pub fn assign_army_support(settlements: &[Settlement], armies: &mut [Army]) -> u32 {
    let mut remaining: BTreeMap<&str, u32> = settlements
        .iter()
        .map(|s| (s.id.as_str(), s.tier.army_support()))
        .collect();
    let mut waiting = Vec::new();

    for (idx, army) in armies.iter_mut().enumerate() {
        if army.exempt_from_upkeep {
            army.support.supported = true;
            army.support.settlement_id = None;
            continue;
        }
        let kept = army
            .support
            .settlement_id
            .as_deref()
            .and_then(|id| remaining.get_mut(id))
            .filter(|slots| **slots > 0)
            .map(|slots| *slots -= 1)
            .is_some();
        if kept {
            army.support.supported = true;
        } else {
            waiting.push(idx);
        }
    }

    let mut unsupported = 0;
    for idx in waiting {
        let army = &mut armies[idx];
        let open = settlements
            .iter()
            .find(|s| remaining.get(s.id.as_str()).copied().unwrap_or(0) > 0);
        if let Some(settlement) = open {
            if let Some(slots) = remaining.get_mut(settlement.id.as_str()) {
                *slots -= 1;
            }
            army.support.supported = true;
            army.support.settlement_id = Some(settlement.id.clone());
        } else {
            army.support.supported = false;
            army.support.settlement_id = None;
            unsupported += 1;
        }
    }
    unsupported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn village_and_city_totals() {
        let settlements = vec![
            Settlement::new("s1", "Oleg's", SettlementTier::Village),
            Settlement::new("s2", "Restov", SettlementTier::City),
        ];
        assert_eq!(total_food_consumption(&settlements, &[]), 9);
        assert_eq!(total_army_support(&settlements), 4);
    }

    #[test]
    fn exempt_armies_eat_nothing() {
        let settlements = vec![Settlement::new("s1", "Tatzlford", SettlementTier::Town)];
        let mut allied = Army::new("a2", "Allied Lancers", 2);
        allied.exempt_from_upkeep = true;
        let armies = vec![Army::new("a1", "Militia", 1), allied];
        assert_eq!(total_food_consumption(&settlements, &armies), 5);
    }

    #[test]
    fn tier_steps_clamp() {
        assert_eq!(SettlementTier::Metropolis.promote(), SettlementTier::Metropolis);
        assert_eq!(SettlementTier::Village.demote(), SettlementTier::Village);
        assert_eq!(SettlementTier::Town.promote(), SettlementTier::City);
    }

    #[test]
    fn support_overflow_marks_unsupported() {
        let settlements = vec![Settlement::new("s1", "Varnhold", SettlementTier::Village)];
        let mut armies = vec![Army::new("a1", "First", 1), Army::new("a2", "Second", 1)];
        let unsupported = assign_army_support(&settlements, &mut armies);
        assert_eq!(unsupported, 1);
        assert!(armies[0].support.supported);
        assert_eq!(armies[0].support.settlement_id.as_deref(), Some("s1"));
        assert!(!armies[1].support.supported);
    }

    #[test]
    fn support_keeps_existing_assignment() {
        let settlements = vec![
            Settlement::new("s1", "North", SettlementTier::Village),
            Settlement::new("s2", "South", SettlementTier::Village),
        ];
        let mut first = Army::new("a1", "First", 1);
        let mut second = Army::new("a2", "Second", 1);
        second.support.settlement_id = Some("s1".into());
        first.support.settlement_id = None;
        let mut armies = vec![first, second];
        assert_eq!(assign_army_support(&settlements, &mut armies), 0);
        assert_eq!(armies[1].support.settlement_id.as_deref(), Some("s1"));
        assert_eq!(armies[0].support.settlement_id.as_deref(), Some("s2"));
    }

    #[test]
    fn equipment_applies_once() {
        let mut army = Army::new("a1", "Guard", 3);
        army.apply_equipment(EquipmentUpgrade::Runes).unwrap();
        assert!(army.equipment.has(EquipmentUpgrade::Runes));
        assert!(matches!(
            army.apply_equipment(EquipmentUpgrade::Runes),
            Err(ValidationError::UpgradeAlreadyApplied { .. })
        ));
    }

    #[test]
    fn missing_actor_is_an_error() {
        let army = Army::new("a1", "Scouts", 1);
        assert!(matches!(
            army.require_actor(),
            Err(crate::KingdomError::MissingActor(name)) if name == "Scouts"
        ));
    }
}
