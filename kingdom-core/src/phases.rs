//! Phase-scoped runners for the kingdom turn.
//!
//! Each wrapper borrows the aggregate for one phase, refuses to run while the
//! phase is locked, and marks its steps on the turn tracker as they finish.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::checks::{DegreeOfSuccess, OutcomeEffects, SkillCheck};
use crate::config::KingdomConfig;
use crate::constants::{
    LOG_ARMIES_UNSUPPORTED, LOG_EVENT_CONTINUOUS, LOG_EVENT_NONE, LOG_EVENT_RESOLVED,
    LOG_EVENT_TRIGGERED, LOG_INCIDENT_NONE, LOG_INCIDENT_RESOLVED, LOG_INCIDENT_TRIGGERED,
    LOG_UNREST_CALCULATED,
};
use crate::error::{KingdomError, PhaseError, ValidationError};
use crate::events::{EventCatalog, EventDef, EventResolution, get_random_event, resolve_event};
use crate::resources::ResourceLedger;
use crate::state::{CompletedBuild, KingdomState};
use crate::turn::{AutoCompleteContext, EventRollRecord, IncidentRoll, PhaseStep, TurnPhase};
use crate::unrest::{IncidentCatalog, IncidentDef, UnrestBreakdown, calculate_turn_unrest, roll_for_incident};

fn ensure_unlocked(state: &KingdomState, phase: TurnPhase) -> Result<(), ValidationError> {
    if state.turn.can_operate_phase(phase) {
        Ok(())
    } else {
        log::debug!(
            "{} is locked while the kingdom is in {}",
            phase.label(),
            state.turn.phase.label()
        );
        Err(ValidationError::PhaseLocked(phase))
    }
}

fn ensure_step_open(state: &KingdomState, step: PhaseStep) -> Result<(), ValidationError> {
    ensure_unlocked(state, step.phase())?;
    if state.turn.is_step_completed(step) {
        log::debug!("{} already ran on turn {}", step.as_str(), state.turn.turn);
        return Err(ValidationError::AlreadyUsedThisTurn(step.as_str().to_string()));
    }
    Ok(())
}

fn mark(state: &mut KingdomState, step: PhaseStep) {
    let ctx = AutoCompleteContext {
        has_active_modifiers: state.has_active_modifiers(),
        incident_triggered: state.turn.current_incident_id.is_some(),
        event_triggered: state.current_event.is_some(),
    };
    state.turn.mark_phase_step_completed(step, ctx);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusReport {
    pub fame_gained: u32,
    pub modifiers_applied: usize,
}

pub struct StatusPhase<'a> {
    state: &'a mut KingdomState,
    cfg: &'a KingdomConfig,
}

impl<'a> StatusPhase<'a> {
    pub const fn new(state: &'a mut KingdomState, cfg: &'a KingdomConfig) -> Self {
        Self { state, cfg }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Status cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn gain_fame(&mut self) -> Result<u32, ValidationError> {
        ensure_step_open(self.state, PhaseStep::GainFame)?;
        let amount = self.cfg.fame_per_turn;
        self.state.gain_fame(amount);
        mark(self.state, PhaseStep::GainFame);
        Ok(amount)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Status cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn apply_modifiers(&mut self) -> Result<usize, ValidationError> {
        ensure_step_open(self.state, PhaseStep::ApplyModifiers)?;
        let applied = self.state.apply_modifiers();
        mark(self.state, PhaseStep::ApplyModifiers);
        Ok(applied)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Status cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn run(&mut self) -> Result<StatusReport, ValidationError> {
        let fame_gained = self.gain_fame()?;
        let modifiers_applied = if self.state.turn.is_step_completed(PhaseStep::ApplyModifiers) {
            0
        } else {
            self.apply_modifiers()?
        };
        Ok(StatusReport {
            fame_gained,
            modifiers_applied,
        })
    }
}

pub struct ResourcesPhase<'a> {
    state: &'a mut KingdomState,
}

impl<'a> ResourcesPhase<'a> {
    pub const fn new(state: &'a mut KingdomState) -> Self {
        Self { state }
    }

    /// Collect worksite production into the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Resources cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn collect(&mut self) -> Result<ResourceLedger, ValidationError> {
        ensure_step_open(self.state, PhaseStep::CollectResources)?;
        let gained = self.state.collect_resources();
        mark(self.state, PhaseStep::CollectResources);
        Ok(gained)
    }
}

/// How a pending incident was handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentResolution {
    pub incident_id: String,
    pub skill: String,
    pub degree: DegreeOfSuccess,
    pub message: String,
    pub effects: OutcomeEffects,
}

pub struct UnrestPhase<'a> {
    state: &'a mut KingdomState,
    cfg: &'a KingdomConfig,
}

impl<'a> UnrestPhase<'a> {
    pub const fn new(state: &'a mut KingdomState, cfg: &'a KingdomConfig) -> Self {
        Self { state, cfg }
    }

    /// Add this turn's passive unrest.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Unrest cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn calculate_unrest(&mut self) -> Result<UnrestBreakdown, ValidationError> {
        ensure_step_open(self.state, PhaseStep::CalculateUnrest)?;
        let breakdown = calculate_turn_unrest(self.state, self.cfg);
        self.state.add_unrest(breakdown.total());
        self.state.log.push(String::from(LOG_UNREST_CALCULATED));
        mark(self.state, PhaseStep::CalculateUnrest);
        Ok(breakdown)
    }

    /// Roll the incident table for the current unrest tier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Unrest cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn check_incident<'c, R>(
        &mut self,
        catalog: &'c IncidentCatalog,
        rng: &mut R,
    ) -> Result<Option<&'c IncidentDef>, ValidationError>
    where
        R: Rng + ?Sized,
    {
        ensure_step_open(self.state, PhaseStep::CheckIncident)?;
        let tier = self.state.unrest_tier().index();
        let incident = roll_for_incident(tier, catalog, self.cfg, rng);
        let incident_id = incident.map(|def| def.id.clone());
        self.state.turn.current_incident_id.clone_from(&incident_id);
        self.state.turn.last_incident_roll = Some(IncidentRoll { tier, incident_id });
        self.state.log.push(String::from(if incident.is_some() {
            LOG_INCIDENT_TRIGGERED
        } else {
            LOG_INCIDENT_NONE
        }));
        mark(self.state, PhaseStep::CheckIncident);
        Ok(incident)
    }

    /// Resolve the pending incident with a skill check.
    ///
    /// `skill` defaults to the incident's first listed skill.
    ///
    /// # Errors
    ///
    /// Fails when the phase is locked, when no incident is pending, or when
    /// the checker has no actor to roll for.
    pub fn resolve_incident<C>(
        &mut self,
        catalog: &IncidentCatalog,
        checker: &mut C,
        skill: Option<&str>,
    ) -> Result<IncidentResolution, PhaseError>
    where
        C: SkillCheck + ?Sized,
    {
        ensure_unlocked(self.state, TurnPhase::Unrest)?;
        let def = self
            .state
            .turn
            .current_incident_id
            .as_deref()
            .and_then(|id| catalog.get(id))
            .ok_or(KingdomError::NothingToResolve("incident"))?;
        let skill = skill
            .or_else(|| def.skills.first().map(String::as_str))
            .unwrap_or("diplomacy");
        let dc = self.state.check_dc(self.cfg);
        let report = checker.check(skill, dc)?;
        let degree = DegreeOfSuccess::from_roll(report.total, dc);
        let outcome = def.outcome_for(degree);
        self.state.apply_effects(&outcome.effects);
        self.state.turn.current_incident_id = None;
        self.state.log.push(String::from(LOG_INCIDENT_RESOLVED));
        mark(self.state, PhaseStep::ResolveIncident);
        Ok(IncidentResolution {
            incident_id: def.id.clone(),
            skill: skill.to_string(),
            degree,
            message: outcome.message.clone(),
            effects: outcome.effects,
        })
    }
}

pub struct EventsPhase<'a> {
    state: &'a mut KingdomState,
    cfg: &'a KingdomConfig,
}

impl<'a> EventsPhase<'a> {
    pub const fn new(state: &'a mut KingdomState, cfg: &'a KingdomConfig) -> Self {
        Self { state, cfg }
    }

    /// Roll against the event DC and, on a hit, draw an event.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Events cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn check_event<'c, R>(
        &mut self,
        catalog: &'c EventCatalog,
        rng: &mut R,
    ) -> Result<Option<&'c EventDef>, ValidationError>
    where
        R: Rng + ?Sized,
    {
        ensure_step_open(self.state, PhaseStep::CheckEvent)?;
        let roll = self.state.event_dc.roll_for_event(self.cfg, rng);
        self.state.turn.last_event_roll = Some(EventRollRecord {
            roll: roll.roll,
            dc: roll.dc,
        });
        let event = if roll.triggered {
            get_random_event(catalog, rng)
        } else {
            None
        };
        let event_id = event.map(|def| def.id.clone());
        self.state.turn.current_event_id.clone_from(&event_id);
        self.state.current_event = event_id;
        self.state.log.push(String::from(if event.is_some() {
            LOG_EVENT_TRIGGERED
        } else {
            LOG_EVENT_NONE
        }));
        mark(self.state, PhaseStep::CheckEvent);
        Ok(event)
    }

    /// Resolve the current event with a skill check and track it if it lingers.
    ///
    /// # Errors
    ///
    /// Fails when the phase is locked, when no event is pending, or when the
    /// checker has no actor to roll for.
    pub fn resolve_current_event<C>(
        &mut self,
        catalog: &EventCatalog,
        checker: &mut C,
        skill: Option<&str>,
    ) -> Result<EventResolution, PhaseError>
    where
        C: SkillCheck + ?Sized,
    {
        ensure_unlocked(self.state, TurnPhase::Events)?;
        let def = self
            .state
            .current_event
            .as_deref()
            .and_then(|id| catalog.get(id))
            .ok_or(KingdomError::NothingToResolve("event"))?;
        let skill = skill.unwrap_or_else(|| def.primary_skill());
        let dc = self.state.check_dc(self.cfg);
        let report = checker.check(skill, dc)?;
        let resolution = resolve_event(def, skill, report, dc);
        self.state.apply_effects(&resolution.effects);
        if resolution.persists {
            self.state.track_continuous_event(&def.id, &def.name);
            self.state.log.push(String::from(LOG_EVENT_CONTINUOUS));
        } else if def.is_continuous {
            let _ = self.state.resolve_continuous_event(&def.id);
        }
        self.state.current_event = None;
        self.state.log.push(String::from(LOG_EVENT_RESOLVED));
        mark(self.state, PhaseStep::ResolveEvent);
        Ok(resolution)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UpkeepReport {
    pub food_shortage: u32,
    pub unsupported_armies: u32,
    pub unrest_from_armies: u32,
    pub completed_builds: Vec<CompletedBuild>,
}

pub struct UpkeepPhase<'a> {
    state: &'a mut KingdomState,
    cfg: &'a KingdomConfig,
}

impl<'a> UpkeepPhase<'a> {
    pub const fn new(state: &'a mut KingdomState, cfg: &'a KingdomConfig) -> Self {
        Self { state, cfg }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Upkeep cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn feed_settlements(&mut self) -> Result<u32, ValidationError> {
        ensure_step_open(self.state, PhaseStep::FeedSettlements)?;
        let shortage = self.state.process_food_consumption();
        mark(self.state, PhaseStep::FeedSettlements);
        Ok(shortage)
    }

    /// Assign support, age unsupported armies and charge their unrest.
    /// Returns the unsupported count and the unrest added.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Upkeep cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn support_military(&mut self) -> Result<(u32, u32), ValidationError> {
        ensure_step_open(self.state, PhaseStep::SupportMilitary)?;
        self.state.assign_army_support();
        let unsupported = self.state.tick_unsupported_armies();
        let unrest = unsupported.saturating_mul(self.cfg.unsupported_army_unrest);
        if unsupported > 0 {
            self.state.add_unrest(unrest);
            self.state.log.push(String::from(LOG_ARMIES_UNSUPPORTED));
        }
        mark(self.state, PhaseStep::SupportMilitary);
        Ok((unsupported, unrest))
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Upkeep cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn process_builds(&mut self) -> Result<Vec<CompletedBuild>, ValidationError> {
        ensure_step_open(self.state, PhaseStep::ProcessBuilds)?;
        let completed = self.state.process_build_queue();
        mark(self.state, PhaseStep::ProcessBuilds);
        Ok(completed)
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Upkeep cannot be operated,
    /// or [`ValidationError::AlreadyUsedThisTurn`] when the step already ran.
    pub fn run(&mut self) -> Result<UpkeepReport, ValidationError> {
        let food_shortage = self.feed_settlements()?;
        let (unsupported_armies, unrest_from_armies) = self.support_military()?;
        let completed_builds = self.process_builds()?;
        Ok(UpkeepReport {
            food_shortage,
            unsupported_armies,
            unrest_from_armies,
            completed_builds,
        })
    }
}
