use serde::{Deserialize, Serialize};

use crate::checks::SkillCheck;
use crate::config::KingdomConfig;
use crate::error::{PhaseError, ValidationError};
use crate::events::{EventCatalog, EventResolution, event_catalog};
use crate::phases::{
    EventsPhase, IncidentResolution, ResourcesPhase, StatusPhase, StatusReport, UnrestPhase,
    UpkeepPhase, UpkeepReport,
};
use crate::resources::ResourceLedger;
use crate::rng::KingdomRng;
use crate::state::KingdomState;
use crate::turn::{EventRollRecord, PhaseAdvance, TurnPhase};
use crate::unrest::{IncidentCatalog, UnrestBreakdown, UnrestTier, incident_catalog};

/// Result of the Unrest phase table roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrestCheck {
    pub breakdown: UnrestBreakdown,
    pub incident_id: Option<String>,
}

/// Everything that happened over one full turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u32,
    pub status: StatusReport,
    pub resources_gained: ResourceLedger,
    pub unrest: UnrestCheck,
    pub incident: Option<IncidentResolution>,
    pub event_roll: Option<EventRollRecord>,
    pub event: Option<EventResolution>,
    pub upkeep: UpkeepReport,
    pub unrest_after: u32,
    pub tier_after: UnrestTier,
}

/// High-level session binding a kingdom to its RNG streams, rules config and
/// table catalogs.
#[derive(Debug, Clone)]
pub struct KingdomSession {
    state: KingdomState,
    rng: KingdomRng,
    cfg: KingdomConfig,
    incidents: &'static IncidentCatalog,
    events: &'static EventCatalog,
}

impl KingdomSession {
    #[must_use]
    pub fn new(state: KingdomState, cfg: KingdomConfig, seed: u64) -> Self {
        Self {
            state,
            rng: KingdomRng::from_user_seed(seed),
            cfg,
            incidents: incident_catalog(),
            events: event_catalog(),
        }
    }

    /// Swap in alternate tables.
    #[must_use]
    pub fn with_catalogs(
        mut self,
        incidents: &'static IncidentCatalog,
        events: &'static EventCatalog,
    ) -> Self {
        self.incidents = incidents;
        self.events = events;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &KingdomState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &KingdomConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn rng(&self) -> &KingdomRng {
        &self.rng
    }

    /// Apply a closure to the mutable kingdom.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut KingdomState) -> R) -> R {
        f(&mut self.state)
    }

    /// Deterministically reseed every stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = KingdomRng::from_user_seed(seed);
    }

    #[must_use]
    pub fn into_state(self) -> KingdomState {
        self.state
    }

    /// Register a faction, drawing its color from the faction stream.
    pub fn add_faction(&mut self, name: &str) -> String {
        self.state.add_faction(name, self.rng.faction())
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Status cannot be operated.
    pub fn run_status(&mut self) -> Result<StatusReport, ValidationError> {
        StatusPhase::new(&mut self.state, &self.cfg).run()
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Resources cannot be operated.
    pub fn run_resources(&mut self) -> Result<ResourceLedger, ValidationError> {
        ResourcesPhase::new(&mut self.state).collect()
    }

    /// Calculate unrest and roll for an incident.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Unrest cannot be operated.
    pub fn run_unrest(&mut self) -> Result<UnrestCheck, ValidationError> {
        let mut phase = UnrestPhase::new(&mut self.state, &self.cfg);
        let breakdown = phase.calculate_unrest()?;
        let incident = phase.check_incident(self.incidents, self.rng.incident())?;
        Ok(UnrestCheck {
            breakdown,
            incident_id: incident.map(|def| def.id.clone()),
        })
    }

    /// # Errors
    ///
    /// Fails when the phase is locked, nothing is pending or the checker fails.
    pub fn resolve_incident<C>(
        &mut self,
        checker: &mut C,
        skill: Option<&str>,
    ) -> Result<IncidentResolution, PhaseError>
    where
        C: SkillCheck + ?Sized,
    {
        UnrestPhase::new(&mut self.state, &self.cfg).resolve_incident(self.incidents, checker, skill)
    }

    /// Roll for an event. Returns the drawn event id, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Events cannot be operated.
    pub fn run_events(&mut self) -> Result<Option<String>, ValidationError> {
        let event = EventsPhase::new(&mut self.state, &self.cfg)
            .check_event(self.events, self.rng.event())?;
        Ok(event.map(|def| def.id.clone()))
    }

    /// # Errors
    ///
    /// Fails when the phase is locked, nothing is pending or the checker fails.
    pub fn resolve_current_event<C>(
        &mut self,
        checker: &mut C,
        skill: Option<&str>,
    ) -> Result<EventResolution, PhaseError>
    where
        C: SkillCheck + ?Sized,
    {
        EventsPhase::new(&mut self.state, &self.cfg).resolve_current_event(
            self.events,
            checker,
            skill,
        )
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::PhaseLocked`] when Upkeep cannot be operated.
    pub fn run_upkeep(&mut self) -> Result<UpkeepReport, ValidationError> {
        UpkeepPhase::new(&mut self.state, &self.cfg).run()
    }

    pub fn advance_phase(&mut self) -> PhaseAdvance {
        self.state.advance_phase()
    }

    /// Play every phase of one turn, resolving incidents and events with
    /// `checker`, and roll over into the next turn.
    ///
    /// # Errors
    ///
    /// Fails when the kingdom is not at the start of a turn, or when a check
    /// cannot be made.
    pub fn play_turn<C>(&mut self, checker: &mut C) -> Result<TurnReport, PhaseError>
    where
        C: SkillCheck + ?Sized,
    {
        if self.state.turn.phase != TurnPhase::Status {
            return Err(ValidationError::Precondition(format!(
                "a full turn starts in {}, not {}",
                TurnPhase::Status,
                self.state.turn.phase
            ))
            .into());
        }
        let turn = self.state.turn.turn;

        let status = self.run_status()?;
        self.advance_phase();

        let resources_gained = self.run_resources()?;
        self.advance_phase();

        let unrest = self.run_unrest()?;
        let incident = if unrest.incident_id.is_some() {
            Some(self.resolve_incident(checker, None)?)
        } else {
            None
        };
        self.advance_phase();

        let event_id = self.run_events()?;
        let event_roll = self.state.turn.last_event_roll;
        let event = if event_id.is_some() {
            Some(self.resolve_current_event(checker, None)?)
        } else {
            None
        };
        self.advance_phase();

        // Actions belong to the players; nothing to run here.
        self.advance_phase();

        let upkeep = self.run_upkeep()?;
        let unrest_after = self.state.unrest;
        let tier_after = self.state.unrest_tier();
        self.advance_phase();

        Ok(TurnReport {
            turn,
            status,
            resources_gained,
            unrest,
            incident,
            event_roll,
            event,
            upkeep,
            unrest_after,
            tier_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckReport;
    use crate::error::KingdomError;
    use crate::territory::{Hex, Terrain, WorksiteKind};

    fn steady(_skill: &str, dc: i32) -> Result<CheckReport, KingdomError> {
        Ok(CheckReport::from_total(dc + 2, dc))
    }

    fn session(seed: u64) -> KingdomSession {
        let mut state = KingdomState::new("Tuskwater", vec!["Aria".into()], &KingdomConfig::default());
        state
            .territory
            .claim(Hex::new("h1", Terrain::Plains).with_worksite(WorksiteKind::Farmstead));
        state.found_settlement("Tatzlford", Some("h1")).unwrap();
        KingdomSession::new(state, KingdomConfig::default(), seed)
    }

    #[test]
    fn play_turn_rolls_over() {
        let mut session = session(77);
        let report = session.play_turn(&mut steady).unwrap();
        assert_eq!(report.turn, 1);
        assert_eq!(report.resources_gained.get(crate::ResourceKind::Food), 2);
        assert_eq!(report.upkeep.food_shortage, 0);
        assert_eq!(session.state().turn.turn, 2);
        assert_eq!(session.state().turn.phase, TurnPhase::Status);
    }

    #[test]
    fn same_seed_same_turns() {
        let mut a = session(5);
        let mut b = session(5);
        for _ in 0..6 {
            let left = a.play_turn(&mut steady).unwrap();
            let right = b.play_turn(&mut steady).unwrap();
            assert_eq!(left, right);
        }
        assert_eq!(a.into_state(), b.into_state());
    }

    #[test]
    fn play_turn_requires_turn_start() {
        let mut session = session(1);
        session.run_status().unwrap();
        session.advance_phase();
        assert!(matches!(
            session.play_turn(&mut steady),
            Err(PhaseError::Validation(ValidationError::Precondition(_)))
        ));
    }

    #[test]
    fn missing_actor_surfaces_from_checker() {
        let cfg = KingdomConfig {
            no_incident_chance: [0.0, 0.0, 0.0],
            ..KingdomConfig::default()
        };
        let mut state = KingdomState::new("Pitax", Vec::new(), &cfg);
        state.unrest = 4;
        let mut session = KingdomSession::new(state, cfg, 3);
        let mut absent = |_skill: &str, _dc: i32| -> Result<CheckReport, KingdomError> {
            Err(KingdomError::MissingActor("ruler".into()))
        };
        let err = session.play_turn(&mut absent).unwrap_err();
        assert_eq!(err, PhaseError::Kingdom(KingdomError::MissingActor("ruler".into())));
    }

    #[test]
    fn reseed_restarts_streams() {
        let mut session = session(9);
        session.add_faction("Swordlords");
        assert!(session.rng().draws() > 0);
        session.reseed(9);
        assert_eq!(session.rng().draws(), 0);
        let name = session.with_state_mut(|state| {
            state.name.push_str(" Reach");
            state.name.clone()
        });
        assert_eq!(name, "Tuskwater Reach");
    }
}
