//! Kingdom event table and the DC pity timer.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::checks::{CheckReport, DegreeOfSuccess, OutcomeEffects};
use crate::config::KingdomConfig;
use crate::constants::{EVENT_DC_START, EVENT_DIE_SIDES, GENERIC_OUTCOME_MESSAGE};
use crate::unrest::SkillList;

const DEFAULT_EVENT_DATA: &str = include_str!("../data/events.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventOutcome {
    pub message: String,
    #[serde(default)]
    pub effects: OutcomeEffects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: SkillList,
    /// Continuous events linger until a success ends them.
    #[serde(default)]
    pub is_continuous: bool,
    #[serde(default)]
    pub critical_success: Option<EventOutcome>,
    #[serde(default)]
    pub success: Option<EventOutcome>,
    #[serde(default)]
    pub failure: Option<EventOutcome>,
    #[serde(default)]
    pub critical_failure: Option<EventOutcome>,
}

impl EventDef {
    #[must_use]
    pub const fn outcome_for(&self, degree: DegreeOfSuccess) -> Option<&EventOutcome> {
        match degree {
            DegreeOfSuccess::CriticalSuccess => self.critical_success.as_ref(),
            DegreeOfSuccess::Success => self.success.as_ref(),
            DegreeOfSuccess::Failure => self.failure.as_ref(),
            DegreeOfSuccess::CriticalFailure => self.critical_failure.as_ref(),
        }
    }

    /// Default skill offered when the host does not pick one.
    #[must_use]
    pub fn primary_skill(&self) -> &str {
        self.skills.first().map_or("diplomacy", String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCatalog {
    #[serde(default)]
    pub events: Vec<EventDef>,
}

impl EventCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_EVENT_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn from_events(events: Vec<EventDef>) -> Self {
        Self { events }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&EventDef> {
        self.events.iter().find(|def| def.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[must_use]
pub fn event_catalog() -> &'static EventCatalog {
    static CATALOG: OnceLock<EventCatalog> = OnceLock::new();
    CATALOG.get_or_init(EventCatalog::load_from_static)
}

/// Event-check DC carried between turns.
///
/// Every quiet turn lowers the DC, so an event becomes steadily more likely
/// until one fires and the DC resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCheck {
    pub dc: u8,
}

impl Default for EventCheck {
    fn default() -> Self {
        Self { dc: EVENT_DC_START }
    }
}

impl EventCheck {
    #[must_use]
    pub const fn new(dc: u8) -> Self {
        Self { dc }
    }

    #[must_use]
    pub const fn from_config(cfg: &KingdomConfig) -> Self {
        Self {
            dc: cfg.event_dc_start,
        }
    }

    /// Roll a d20 against the current DC and update it.
    pub fn check_for_event<R>(&mut self, cfg: &KingdomConfig, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        self.roll_for_event(cfg, rng).triggered
    }

    /// Same as [`Self::check_for_event`] but reports the die and DC used.
    pub fn roll_for_event<R>(&mut self, cfg: &KingdomConfig, rng: &mut R) -> EventRoll
    where
        R: Rng + ?Sized,
    {
        let roll = rng.gen_range(1..=EVENT_DIE_SIDES);
        let dc = self.dc;
        let triggered = self.apply_roll(roll, cfg);
        EventRoll { roll, dc, triggered }
    }

    /// Apply a known d20 result.
    pub fn apply_roll(&mut self, roll: u8, cfg: &KingdomConfig) -> bool {
        if roll >= self.dc {
            self.dc = cfg.event_dc_start;
            true
        } else {
            self.dc = self
                .dc
                .saturating_sub(cfg.event_dc_step)
                .max(cfg.event_dc_floor);
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRoll {
    pub roll: u8,
    pub dc: u8,
    pub triggered: bool,
}

/// Pick an event uniformly from the catalog.
pub fn get_random_event<'a, R>(catalog: &'a EventCatalog, rng: &mut R) -> Option<&'a EventDef>
where
    R: Rng + ?Sized,
{
    if catalog.events.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..catalog.events.len());
    catalog.events.get(idx)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResolution {
    pub event_id: String,
    pub skill: String,
    pub degree: DegreeOfSuccess,
    pub total: i32,
    pub dc: i32,
    pub message: String,
    pub effects: OutcomeEffects,
    /// True when a continuous event stays active after this resolution.
    pub persists: bool,
}

/// Map a check result onto the event's outcome branch.
///
/// The degree is graded from `check_result.total` against `dc`; the degree the
/// executor reported is not trusted.
#[must_use]
pub fn resolve_event(
    event: &EventDef,
    skill: &str,
    check_result: CheckReport,
    dc: i32,
) -> EventResolution {
    let degree = DegreeOfSuccess::from_roll(check_result.total, dc);
    let (message, effects) = event.outcome_for(degree).map_or_else(
        || (GENERIC_OUTCOME_MESSAGE.to_string(), OutcomeEffects::default()),
        |outcome| (outcome.message.clone(), outcome.effects),
    );
    EventResolution {
        event_id: event.id.clone(),
        skill: skill.to_string(),
        degree,
        total: check_result.total,
        dc,
        message,
        effects,
        persists: event.is_continuous && !degree.is_success(),
    }
}

/// A continuous event still affecting the kingdom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousEvent {
    pub event_id: String,
    pub name: String,
    pub since_turn: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand::rngs::mock::StepRng;

    #[test]
    fn static_catalog_is_populated() {
        let catalog = event_catalog();
        assert!(catalog.len() >= 40);
        assert!(catalog.events.iter().any(|def| def.is_continuous));
        for def in &catalog.events {
            assert!(!def.skills.is_empty(), "{}", def.id);
        }
    }

    #[test]
    fn dc_steps_down_to_floor_then_resets() {
        let cfg = KingdomConfig::default();
        let mut check = EventCheck::from_config(&cfg);
        // A zeroed mock stream always rolls a natural 1.
        let mut rng = StepRng::new(0, 0);
        let mut seen = vec![check.dc];
        for _ in 0..3 {
            assert!(!check.check_for_event(&cfg, &mut rng));
            seen.push(check.dc);
        }
        assert_eq!(seen, vec![16, 11, 6, 6]);
        assert!(check.apply_roll(6, &cfg));
        assert_eq!(check.dc, 16);
    }

    #[test]
    fn seeded_rolls_stay_in_die_range() {
        let cfg = KingdomConfig::default();
        let mut check = EventCheck::default();
        let mut rng = SmallRng::seed_from_u64(21);
        for _ in 0..100 {
            let roll = check.roll_for_event(&cfg, &mut rng);
            assert!((1..=20).contains(&roll.roll));
            assert!(check.dc >= cfg.event_dc_floor && check.dc <= cfg.event_dc_start);
        }
    }

    #[test]
    fn random_event_from_empty_catalog_is_none() {
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(get_random_event(&EventCatalog::default(), &mut rng).is_none());
        assert!(get_random_event(event_catalog(), &mut rng).is_some());
    }

    #[test]
    fn missing_branch_falls_back_to_generic_message() {
        let def = EventDef {
            id: "quiet".into(),
            name: "Quiet".into(),
            description: String::new(),
            skills: SkillList::new(),
            is_continuous: true,
            critical_success: None,
            success: Some(EventOutcome {
                message: "Done.".into(),
                effects: OutcomeEffects::default(),
            }),
            failure: None,
            critical_failure: None,
        };
        let fail = resolve_event(&def, "society", CheckReport::from_total(10, 15), 15);
        assert_eq!(fail.message, GENERIC_OUTCOME_MESSAGE);
        assert!(fail.persists);
        let pass = resolve_event(&def, "society", CheckReport::from_total(16, 15), 15);
        assert_eq!(pass.message, "Done.");
        assert!(!pass.persists);
    }

    #[test]
    fn degree_is_graded_against_the_dc() {
        let def = &event_catalog().events[0];
        let lopsided = CheckReport {
            total: 30,
            degree: DegreeOfSuccess::Failure,
        };
        let resolution = resolve_event(def, "industry", lopsided, 15);
        assert_eq!(resolution.degree, DegreeOfSuccess::CriticalSuccess);
        assert_eq!(resolution.total, 30);
        assert!(!resolution.persists);

        let flattered = CheckReport {
            total: 4,
            degree: DegreeOfSuccess::CriticalSuccess,
        };
        let resolution = resolve_event(def, "industry", flattered, 15);
        assert_eq!(resolution.degree, DegreeOfSuccess::CriticalFailure);
        assert_eq!(resolution.persists, def.is_continuous);
    }
}
