//! The kingdom aggregate and its rules.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::checks::OutcomeEffects;
use crate::config::KingdomConfig;
use crate::constants::{
    LOG_BUILD_COMPLETED, LOG_FAME_GAINED, LOG_FOOD_SHORTAGE, LOG_MODIFIER_EXPIRED,
    LOG_MODIFIERS_APPLIED, LOG_RESOURCES_COLLECTED, LOG_SETTLEMENTS_FED, LOG_TURN_STARTED,
};
use crate::error::{CommandError, KingdomError, ValidationError};
use crate::events::{ContinuousEvent, EventCheck};
use crate::factions::{Attitude, Faction, generate_faction_color};
use crate::modifiers::{KingdomModifier, tick_modifiers};
use crate::resources::{ResourceCost, ResourceKind, ResourceLedger};
use crate::settlements::{
    Army, EquipmentUpgrade, Settlement, SettlementTier, assign_army_support, total_army_support,
    total_food_consumption,
};
use crate::territory::{Hex, Territory};
use crate::turn::{PhaseAdvance, TurnTracker};
use crate::unrest::UnrestTier;

/// A structure under construction and what has been paid toward it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProject {
    pub id: String,
    pub structure_id: String,
    pub settlement_id: String,
    pub cost: ResourceCost,
    #[serde(default)]
    pub invested: ResourceCost,
}

impl BuildProject {
    #[must_use]
    pub fn remaining(&self) -> ResourceCost {
        self.cost.remaining_after(&self.invested)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedBuild {
    pub project_id: String,
    pub structure_id: String,
    pub settlement_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingdomState {
    pub name: String,
    #[serde(default)]
    pub resources: ResourceLedger,
    #[serde(default)]
    pub territory: Territory,
    #[serde(default)]
    pub settlements: Vec<Settlement>,
    #[serde(default)]
    pub armies: Vec<Army>,
    #[serde(default)]
    pub factions: Vec<Faction>,
    #[serde(default)]
    pub build_queue: Vec<BuildProject>,
    #[serde(default)]
    pub modifiers: Vec<KingdomModifier>,
    #[serde(default)]
    pub current_event: Option<String>,
    #[serde(default)]
    pub continuous_events: Vec<ContinuousEvent>,
    #[serde(default)]
    pub event_dc: EventCheck,
    #[serde(default)]
    pub unrest: u32,
    #[serde(default)]
    pub imprisoned_unrest: u32,
    #[serde(default)]
    pub fame: u32,
    #[serde(default)]
    pub at_war: bool,
    #[serde(default)]
    pub turn: TurnTracker,
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default)]
    next_id: u32,
}

impl Default for KingdomState {
    fn default() -> Self {
        Self::new("New Kingdom", Vec::new(), &KingdomConfig::default())
    }
}

impl KingdomState {
    #[must_use]
    pub fn new(name: impl Into<String>, players: Vec<String>, cfg: &KingdomConfig) -> Self {
        Self {
            name: name.into(),
            resources: cfg.starting_resources,
            territory: Territory::new(),
            settlements: Vec::new(),
            armies: Vec::new(),
            factions: Vec::new(),
            build_queue: Vec::new(),
            modifiers: Vec::new(),
            current_event: None,
            continuous_events: Vec::new(),
            event_dc: EventCheck::from_config(cfg),
            unrest: 0,
            imprisoned_unrest: 0,
            fame: 0,
            at_war: false,
            turn: TurnTracker::new(&players),
            players,
            log: Vec::new(),
            next_id: 0,
        }
    }

    fn mint_id(&mut self, prefix: &str) -> String {
        self.next_id = self.next_id.saturating_add(1);
        format!("{prefix}-{}", self.next_id)
    }

    /// Rebuild derived caches after deserialization.
    #[must_use]
    pub fn rehydrate(mut self) -> Self {
        self.refresh_caches();
        self
    }

    pub(crate) fn refresh_caches(&mut self) {
        self.territory.recompute_production();
        for player in &self.players {
            self.turn
                .player_actions
                .entry(player.clone())
                .or_default();
        }
    }

    /// Restore a fresh kingdom, keeping only the name and the players.
    pub fn reset(&mut self) {
        self.reset_with(&KingdomConfig::default());
    }

    pub fn reset_with(&mut self, cfg: &KingdomConfig) {
        let name = std::mem::take(&mut self.name);
        let players = std::mem::take(&mut self.players);
        *self = Self::new(name, players, cfg);
    }

    /// Number of hexes the kingdom holds.
    #[must_use]
    pub fn size(&self) -> usize {
        self.territory.claimed_count()
    }

    // Resources ---------------------------------------------------------------

    /// Add this turn's worksite production to the ledger.
    pub fn collect_resources(&mut self) -> ResourceLedger {
        let totals = self.territory.calculate_production().totals;
        self.resources.absorb(&totals);
        self.log.push(String::from(LOG_RESOURCES_COLLECTED));
        totals
    }

    #[must_use]
    pub fn total_food_consumption(&self) -> u32 {
        total_food_consumption(&self.settlements, &self.armies)
    }

    /// Feed settlements and armies. Any food that cannot be paid becomes
    /// unrest; returns that shortage.
    pub fn process_food_consumption(&mut self) -> u32 {
        let need = self.total_food_consumption();
        let shortage = self.resources.subtract(ResourceKind::Food, need);
        if shortage > 0 {
            self.add_unrest(shortage);
            self.log.push(String::from(LOG_FOOD_SHORTAGE));
        } else {
            self.log.push(String::from(LOG_SETTLEMENTS_FED));
        }
        shortage
    }

    pub fn clear_non_storable_resources(&mut self) {
        self.resources.clear_non_storable();
    }

    // Unrest and fame ---------------------------------------------------------

    pub const fn add_unrest(&mut self, amount: u32) {
        self.unrest = self.unrest.saturating_add(amount);
    }

    pub const fn reduce_unrest(&mut self, amount: u32) {
        self.unrest = self.unrest.saturating_sub(amount);
    }

    /// Move unrest into the imprisoned pool. Returns the amount moved.
    pub fn imprison_unrest(&mut self, amount: u32) -> u32 {
        let moved = amount.min(self.unrest);
        self.unrest -= moved;
        self.imprisoned_unrest = self.imprisoned_unrest.saturating_add(moved);
        moved
    }

    /// Return imprisoned unrest to the general pool. Returns the amount moved.
    pub fn release_imprisoned(&mut self, amount: u32) -> u32 {
        let moved = amount.min(self.imprisoned_unrest);
        self.imprisoned_unrest -= moved;
        self.unrest = self.unrest.saturating_add(moved);
        moved
    }

    /// Tier from active unrest; imprisoned unrest never counts.
    #[must_use]
    pub const fn unrest_tier(&self) -> UnrestTier {
        UnrestTier::from_unrest(self.unrest)
    }

    /// DC for kingdom checks: the control DC raised by the unrest penalty.
    #[must_use]
    pub const fn check_dc(&self, cfg: &KingdomConfig) -> i32 {
        cfg.control_dc - self.unrest_tier().penalty()
    }

    pub fn gain_fame(&mut self, amount: u32) {
        self.fame = self.fame.saturating_add(amount);
        self.log.push(String::from(LOG_FAME_GAINED));
    }

    /// Apply signed deltas. Every counter floors at zero.
    pub fn apply_effects(&mut self, effects: &OutcomeEffects) {
        for kind in ResourceKind::ALL {
            self.resources.apply_delta(kind, effects.resource_delta(kind));
        }
        self.unrest = apply_signed(self.unrest, effects.unrest);
        self.fame = apply_signed(self.fame, effects.fame);
    }

    /// Apply every active modifier's effects once. Returns how many applied.
    pub fn apply_modifiers(&mut self) -> usize {
        let effects: Vec<OutcomeEffects> = self.modifiers.iter().map(|m| m.effects).collect();
        for effect in &effects {
            self.apply_effects(effect);
        }
        if !effects.is_empty() {
            self.log.push(String::from(LOG_MODIFIERS_APPLIED));
        }
        effects.len()
    }

    #[must_use]
    pub fn has_active_modifiers(&self) -> bool {
        !self.modifiers.is_empty()
    }

    pub fn add_modifier(&mut self, modifier: KingdomModifier) {
        self.modifiers.retain(|existing| existing.id != modifier.id);
        self.modifiers.push(modifier);
    }

    // Turn flow ---------------------------------------------------------------

    /// Move to the next phase, running the end-of-turn reset after Upkeep.
    pub fn advance_phase(&mut self) -> PhaseAdvance {
        let from = self.turn.phase;
        if !self.turn.step_phase() {
            return PhaseAdvance::Advanced {
                from,
                to: self.turn.phase,
            };
        }
        self.turn.reset_for_new_turn(&self.players);
        self.clear_non_storable_resources();
        let expired = tick_modifiers(&mut self.modifiers);
        if !expired.is_empty() {
            self.log.push(String::from(LOG_MODIFIER_EXPIRED));
        }
        self.current_event = None;
        self.log.push(String::from(LOG_TURN_STARTED));
        log::info!("{} begins turn {}", self.name, self.turn.turn);
        PhaseAdvance::TurnEnded {
            turn: self.turn.turn,
            expired_modifiers: expired,
        }
    }

    /// Drop a continuous event from the active list.
    pub fn resolve_continuous_event(&mut self, event_id: &str) -> Option<ContinuousEvent> {
        let idx = self
            .continuous_events
            .iter()
            .position(|event| event.event_id == event_id)?;
        Some(self.continuous_events.remove(idx))
    }

    pub(crate) fn track_continuous_event(&mut self, event_id: &str, name: &str) {
        if self
            .continuous_events
            .iter()
            .any(|event| event.event_id == event_id)
        {
            return;
        }
        self.continuous_events.push(ContinuousEvent {
            event_id: event_id.to_string(),
            name: name.to_string(),
            since_turn: self.turn.turn,
        });
    }

    // Territory ---------------------------------------------------------------

    /// Atomically replace territory and settlements, then rebuild the cache.
    pub fn replace_realm(&mut self, hexes: Vec<Hex>, settlements: Vec<Settlement>) {
        self.territory.replace_all(hexes);
        self.settlements = settlements;
        self.drop_orphaned_builds();
        self.release_orphaned_armies();
        self.territory.recompute_production();
    }

    /// Drop queued projects whose settlement no longer exists.
    pub(crate) fn drop_orphaned_builds(&mut self) {
        let settlements = &self.settlements;
        self.build_queue
            .retain(|project| settlements.iter().any(|s| s.id == project.settlement_id));
    }

    pub(crate) fn release_orphaned_armies(&mut self) {
        let settlements = &self.settlements;
        for army in &mut self.armies {
            let orphaned = army
                .support
                .settlement_id
                .as_deref()
                .is_some_and(|id| !settlements.iter().any(|s| s.id == id));
            if orphaned {
                army.support.settlement_id = None;
                army.support.supported = false;
            }
        }
    }

    // Settlements and armies --------------------------------------------------

    #[must_use]
    pub fn settlement(&self, id: &str) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.id == id)
    }

    /// Found a village. Returns the new settlement id.
    ///
    /// # Errors
    ///
    /// Rejects a duplicate name or a hex the kingdom does not hold.
    pub fn found_settlement(
        &mut self,
        name: &str,
        hex_id: Option<&str>,
    ) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Precondition(String::from(
                "a settlement needs a name",
            )));
        }
        if self
            .settlements
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
        {
            return Err(ValidationError::DuplicateSettlement(name.to_string()));
        }
        if let Some(hex) = hex_id
            && !self.territory.contains(hex)
        {
            return Err(ValidationError::HexNotClaimed(hex.to_string()));
        }
        let id = self.mint_id("settlement");
        let mut settlement = Settlement::new(id.clone(), name, SettlementTier::Village);
        settlement.hex_id = hex_id.map(str::to_string);
        self.settlements.push(settlement);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`KingdomError::UnknownSettlement`] for an unknown id.
    pub fn set_settlement_tier(
        &mut self,
        id: &str,
        tier: SettlementTier,
    ) -> Result<(), KingdomError> {
        let settlement = self
            .settlements
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| KingdomError::UnknownSettlement(id.to_string()))?;
        settlement.tier = tier;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`KingdomError::UnknownSettlement`] for an unknown id.
    pub fn remove_settlement(&mut self, id: &str) -> Result<Settlement, KingdomError> {
        let idx = self
            .settlements
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| KingdomError::UnknownSettlement(id.to_string()))?;
        let removed = self.settlements.remove(idx);
        self.build_queue.retain(|project| project.settlement_id != id);
        self.release_orphaned_armies();
        Ok(removed)
    }

    /// Raise a kingdom army. Returns the new army id.
    pub fn recruit_army(&mut self, name: &str, level: u8) -> String {
        let id = self.mint_id("army");
        self.armies.push(Army::new(id.clone(), name, level));
        id
    }

    /// # Errors
    ///
    /// Returns [`KingdomError::UnknownArmy`] for an unknown id.
    pub fn disband_army(&mut self, id: &str) -> Result<Army, KingdomError> {
        let idx = self
            .armies
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| KingdomError::UnknownArmy(id.to_string()))?;
        Ok(self.armies.remove(idx))
    }

    /// # Errors
    ///
    /// Fails for an unknown army or an upgrade it already carries.
    pub fn apply_army_equipment(
        &mut self,
        army_id: &str,
        upgrade: EquipmentUpgrade,
    ) -> Result<(), CommandError> {
        let army = self
            .armies
            .iter_mut()
            .find(|a| a.id == army_id)
            .ok_or_else(|| KingdomError::UnknownArmy(army_id.to_string()))?;
        army.apply_equipment(upgrade)?;
        Ok(())
    }

    #[must_use]
    pub fn total_army_support(&self) -> u32 {
        total_army_support(&self.settlements)
    }

    /// Reassign armies to settlement support slots. Returns the unsupported count.
    pub fn assign_army_support(&mut self) -> u32 {
        assign_army_support(&self.settlements, &mut self.armies)
    }

    /// Age unsupported armies by a turn and reset supported ones.
    pub fn tick_unsupported_armies(&mut self) -> u32 {
        let mut unsupported = 0;
        for army in &mut self.armies {
            if army.support.supported {
                army.support.turns_unsupported = 0;
            } else {
                army.support.turns_unsupported = army.support.turns_unsupported.saturating_add(1);
                unsupported += 1;
            }
        }
        unsupported
    }

    // Factions ----------------------------------------------------------------

    /// Register a faction with a distinct color. Returns its id.
    pub fn add_faction<R>(&mut self, name: &str, rng: &mut R) -> String
    where
        R: Rng + ?Sized,
    {
        let existing: Vec<String> = self.factions.iter().map(|f| f.color.clone()).collect();
        let color = generate_faction_color(&existing, rng);
        let id = self.mint_id("faction");
        self.factions.push(Faction::new(id.clone(), name, color));
        id
    }

    /// Shift a faction's attitude, clamped at the ends of the scale.
    ///
    /// # Errors
    ///
    /// Returns [`KingdomError::UnknownFaction`] for an unknown id.
    pub fn adjust_faction_attitude(&mut self, id: &str, steps: i8) -> Result<Attitude, KingdomError> {
        let faction = self
            .factions
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| KingdomError::UnknownFaction(id.to_string()))?;
        faction.attitude = faction.attitude.adjust(steps);
        Ok(faction.attitude)
    }

    // Build queue -------------------------------------------------------------

    /// Queue a structure for a settlement. Returns the project id.
    ///
    /// # Errors
    ///
    /// Returns [`KingdomError::UnknownSettlement`] for an unknown settlement.
    pub fn queue_build(
        &mut self,
        structure_id: &str,
        settlement_id: &str,
        cost: ResourceCost,
    ) -> Result<String, KingdomError> {
        if self.settlement(settlement_id).is_none() {
            return Err(KingdomError::UnknownSettlement(settlement_id.to_string()));
        }
        let id = self.mint_id("build");
        self.build_queue.push(BuildProject {
            id: id.clone(),
            structure_id: structure_id.to_string(),
            settlement_id: settlement_id.to_string(),
            cost,
            invested: ResourceCost::new(),
        });
        Ok(id)
    }

    /// Pay toward a project, capped at what it still needs. Returns the
    /// number of resource units taken from the ledger.
    ///
    /// # Errors
    ///
    /// Rejects unknown projects and offers the ledger cannot cover.
    pub fn invest_in_build(
        &mut self,
        project_id: &str,
        offer: &ResourceCost,
    ) -> Result<u32, ValidationError> {
        let project = self
            .build_queue
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| {
                ValidationError::Precondition(format!("no build project `{project_id}`"))
            })?;
        let payment = offer.capped_by(&project.remaining());
        self.resources.spend(&payment)?;
        project.invested.accumulate(&payment);
        Ok(payment.iter().fold(0_u32, |acc, (_, v)| acc.saturating_add(v)))
    }

    /// # Errors
    ///
    /// Returns [`KingdomError::UnknownProject`] for an unknown id.
    pub fn cancel_build(&mut self, project_id: &str) -> Result<BuildProject, KingdomError> {
        let idx = self
            .build_queue
            .iter()
            .position(|p| p.id == project_id)
            .ok_or_else(|| KingdomError::UnknownProject(project_id.to_string()))?;
        Ok(self.build_queue.remove(idx))
    }

    /// Finish every fully funded project, adding its structure to the target
    /// settlement.
    pub fn process_build_queue(&mut self) -> Vec<CompletedBuild> {
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.build_queue)
            .into_iter()
            .partition(BuildProject::is_complete);
        self.build_queue = pending;
        let mut completed = Vec::with_capacity(done.len());
        for project in done {
            if let Some(settlement) = self
                .settlements
                .iter_mut()
                .find(|s| s.id == project.settlement_id)
                && !settlement.has_structure(&project.structure_id)
            {
                settlement.structure_ids.push(project.structure_id.clone());
            }
            self.log.push(String::from(LOG_BUILD_COMPLETED));
            completed.push(CompletedBuild {
                project_id: project.id,
                structure_id: project.structure_id,
                settlement_id: project.settlement_id,
            });
        }
        completed
    }
}

fn apply_signed(value: u32, delta: i32) -> u32 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}
