//! Turn and phase state machine.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::constants::PLAYER_ACTIONS_PER_TURN;
use crate::error::ValidationError;

/// The six ordered phases of a kingdom turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    #[default]
    Status,
    Resources,
    Unrest,
    Events,
    Actions,
    Upkeep,
}

impl TurnPhase {
    pub const ALL: [Self; 6] = [
        Self::Status,
        Self::Resources,
        Self::Unrest,
        Self::Events,
        Self::Actions,
        Self::Upkeep,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Status => 0,
            Self::Resources => 1,
            Self::Unrest => 2,
            Self::Events => 3,
            Self::Actions => 4,
            Self::Upkeep => 5,
        }
    }

    /// Following phase, or `None` after Upkeep.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Status => Some(Self::Resources),
            Self::Resources => Some(Self::Unrest),
            Self::Unrest => Some(Self::Events),
            Self::Events => Some(Self::Actions),
            Self::Actions => Some(Self::Upkeep),
            Self::Upkeep => None,
        }
    }

    #[must_use]
    pub const fn required_steps(self) -> &'static [PhaseStep] {
        match self {
            Self::Status => &[PhaseStep::GainFame, PhaseStep::ApplyModifiers],
            Self::Resources => &[PhaseStep::CollectResources],
            Self::Unrest => &[
                PhaseStep::CalculateUnrest,
                PhaseStep::CheckIncident,
                PhaseStep::ResolveIncident,
            ],
            Self::Events => &[PhaseStep::CheckEvent, PhaseStep::ResolveEvent],
            Self::Actions => &[],
            Self::Upkeep => &[
                PhaseStep::FeedSettlements,
                PhaseStep::SupportMilitary,
                PhaseStep::ProcessBuilds,
            ],
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Status => "Kingdom Status",
            Self::Resources => "Resources",
            Self::Unrest => "Unrest",
            Self::Events => "Events",
            Self::Actions => "Actions",
            Self::Upkeep => "Upkeep",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Required step identifiers, one set per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseStep {
    GainFame,
    ApplyModifiers,
    CollectResources,
    CalculateUnrest,
    CheckIncident,
    ResolveIncident,
    CheckEvent,
    ResolveEvent,
    FeedSettlements,
    SupportMilitary,
    ProcessBuilds,
}

impl PhaseStep {
    pub const ALL: [Self; 11] = [
        Self::GainFame,
        Self::ApplyModifiers,
        Self::CollectResources,
        Self::CalculateUnrest,
        Self::CheckIncident,
        Self::ResolveIncident,
        Self::CheckEvent,
        Self::ResolveEvent,
        Self::FeedSettlements,
        Self::SupportMilitary,
        Self::ProcessBuilds,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GainFame => "gain-fame",
            Self::ApplyModifiers => "apply-modifiers",
            Self::CollectResources => "collect-resources",
            Self::CalculateUnrest => "calculate-unrest",
            Self::CheckIncident => "check-incident",
            Self::ResolveIncident => "resolve-incident",
            Self::CheckEvent => "check-event",
            Self::ResolveEvent => "resolve-event",
            Self::FeedSettlements => "feed-settlements",
            Self::SupportMilitary => "support-military",
            Self::ProcessBuilds => "process-builds",
        }
    }

    #[must_use]
    pub const fn phase(self) -> TurnPhase {
        match self {
            Self::GainFame | Self::ApplyModifiers => TurnPhase::Status,
            Self::CollectResources => TurnPhase::Resources,
            Self::CalculateUnrest | Self::CheckIncident | Self::ResolveIncident => {
                TurnPhase::Unrest
            }
            Self::CheckEvent | Self::ResolveEvent => TurnPhase::Events,
            Self::FeedSettlements | Self::SupportMilitary | Self::ProcessBuilds => {
                TurnPhase::Upkeep
            }
        }
    }
}

impl fmt::Display for PhaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseStep {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Facts the auto-complete rules need when a step is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoCompleteContext {
    pub has_active_modifiers: bool,
    pub incident_triggered: bool,
    pub event_triggered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerActions {
    pub spent: u8,
    pub max: u8,
}

impl Default for PlayerActions {
    fn default() -> Self {
        Self {
            spent: 0,
            max: PLAYER_ACTIONS_PER_TURN,
        }
    }
}

impl PlayerActions {
    #[must_use]
    pub const fn remaining(&self) -> u8 {
        self.max.saturating_sub(self.spent)
    }
}

/// Outcome of the last incident check this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRoll {
    pub tier: u8,
    pub incident_id: Option<String>,
}

/// Outcome of the last event d20 this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRollRecord {
    pub roll: u8,
    pub dc: u8,
}

/// Result of [`crate::KingdomState::advance_phase`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseAdvance {
    Advanced { from: TurnPhase, to: TurnPhase },
    TurnEnded { turn: u32, expired_modifiers: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTracker {
    pub turn: u32,
    pub phase: TurnPhase,
    #[serde(default)]
    pub steps_completed: BTreeMap<PhaseStep, bool>,
    #[serde(default)]
    pub phases_completed: BTreeSet<TurnPhase>,
    #[serde(default)]
    pub once_per_turn: BTreeSet<String>,
    #[serde(default)]
    pub current_event_id: Option<String>,
    #[serde(default)]
    pub current_incident_id: Option<String>,
    #[serde(default)]
    pub last_event_roll: Option<EventRollRecord>,
    #[serde(default)]
    pub last_incident_roll: Option<IncidentRoll>,
    #[serde(default)]
    pub player_actions: BTreeMap<String, PlayerActions>,
}

impl Default for TurnTracker {
    fn default() -> Self {
        Self {
            turn: 1,
            phase: TurnPhase::Status,
            steps_completed: BTreeMap::new(),
            phases_completed: BTreeSet::new(),
            once_per_turn: BTreeSet::new(),
            current_event_id: None,
            current_incident_id: None,
            last_event_roll: None,
            last_incident_roll: None,
            player_actions: BTreeMap::new(),
        }
    }
}

impl TurnTracker {
    #[must_use]
    pub fn new(players: &[String]) -> Self {
        let mut tracker = Self::default();
        tracker.init_player_actions(players);
        tracker
    }

    #[must_use]
    pub fn is_step_completed(&self, step: PhaseStep) -> bool {
        self.steps_completed.get(&step).copied().unwrap_or(false)
    }

    /// A phase is complete once marked, or when every required step is done.
    #[must_use]
    pub fn is_phase_complete(&self, phase: TurnPhase) -> bool {
        self.phases_completed.contains(&phase)
            || phase
                .required_steps()
                .iter()
                .all(|step| self.is_step_completed(*step))
    }

    /// Revisiting reached phases is always allowed; moving ahead requires
    /// every earlier phase to be complete.
    #[must_use]
    pub fn can_operate_phase(&self, target: TurnPhase) -> bool {
        target <= self.phase
            || TurnPhase::ALL
                .iter()
                .take(target.index())
                .all(|phase| self.is_phase_complete(*phase))
    }

    /// Record a step, run the auto-complete rules, then mark the current
    /// phase complete when its requirements are met.
    pub fn mark_phase_step_completed(&mut self, step: PhaseStep, ctx: AutoCompleteContext) {
        self.steps_completed.insert(step, true);
        match step {
            PhaseStep::GainFame if !ctx.has_active_modifiers => {
                self.steps_completed.insert(PhaseStep::ApplyModifiers, true);
            }
            PhaseStep::CheckIncident if !ctx.incident_triggered => {
                self.steps_completed.insert(PhaseStep::ResolveIncident, true);
            }
            PhaseStep::CheckEvent if !ctx.event_triggered => {
                self.steps_completed.insert(PhaseStep::ResolveEvent, true);
            }
            _ => {}
        }
        let current = self.phase;
        if current
            .required_steps()
            .iter()
            .all(|required| self.is_step_completed(*required))
        {
            self.phases_completed.insert(current);
        }
    }

    /// Claim a once-per-turn action.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AlreadyUsedThisTurn`] when the action was
    /// already taken this turn.
    pub fn use_once_per_turn(&mut self, action: &str) -> Result<(), ValidationError> {
        if self.once_per_turn.insert(action.to_string()) {
            Ok(())
        } else {
            Err(ValidationError::AlreadyUsedThisTurn(action.to_string()))
        }
    }

    /// Spend one action for `player`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoActionsLeft`] when the player has spent
    /// their allotment, or a precondition error for an unknown player.
    pub fn spend_player_action(&mut self, player: &str) -> Result<(), ValidationError> {
        let Some(actions) = self.player_actions.get_mut(player) else {
            return Err(ValidationError::Precondition(format!(
                "{player} is not a ruler of this kingdom"
            )));
        };
        if actions.remaining() == 0 {
            return Err(ValidationError::NoActionsLeft {
                player: player.to_string(),
            });
        }
        actions.spent = actions.spent.saturating_add(1);
        Ok(())
    }

    /// Move to the next phase. Returns true when the turn rolled over.
    pub(crate) fn step_phase(&mut self) -> bool {
        if let Some(next) = self.phase.next() {
            self.phase = next;
            false
        } else {
            self.turn = self.turn.saturating_add(1);
            self.phase = TurnPhase::Status;
            true
        }
    }

    /// Clear per-turn tracking and give every player a fresh allotment.
    pub fn reset_for_new_turn(&mut self, players: &[String]) {
        self.steps_completed.clear();
        self.phases_completed.clear();
        self.once_per_turn.clear();
        self.current_event_id = None;
        self.current_incident_id = None;
        self.last_event_roll = None;
        self.last_incident_roll = None;
        self.init_player_actions(players);
    }

    fn init_player_actions(&mut self, players: &[String]) {
        self.player_actions = players
            .iter()
            .map(|player| (player.clone(), PlayerActions::default()))
            .collect();
    }
}
