//! Undoable kingdom commands.
//!
//! A command is checked with [`KingdomCommand::validate`] and only then
//! applied. `apply` takes a [`Validated`] token that only [`execute`] can
//! mint, so a command cannot be applied without passing validation first.
use serde::{Deserialize, Serialize};

use crate::config::KingdomConfig;
use crate::error::{CommandError, KingdomError, ValidationError};
use crate::factions::Attitude;
use crate::state::KingdomState;
use crate::territory::{Hex, WorksiteKind};

/// Proof that `validate` succeeded for the current state.
#[derive(Debug)]
pub struct Validated(());

/// Deep copy of a kingdom taken before a command mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(KingdomState);

impl Snapshot {
    #[must_use]
    pub fn capture(state: &KingdomState) -> Self {
        Self(state.clone())
    }

    /// Overwrite `state` with the captured copy. Restoring twice is harmless.
    pub fn restore(&self, state: &mut KingdomState) {
        state.clone_from(&self.0);
    }

    #[must_use]
    pub const fn state(&self) -> &KingdomState {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: String,
    pub message: String,
    /// Id of anything the command created.
    #[serde(default)]
    pub created_id: Option<String>,
}

impl CommandOutcome {
    fn new(command: &str, message: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            message: message.into(),
            created_id: None,
        }
    }

    fn with_id(mut self, id: String) -> Self {
        self.created_id = Some(id);
        self
    }
}

pub trait KingdomCommand {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns the reason the command cannot run against `state`.
    fn validate(&self, state: &KingdomState) -> Result<(), CommandError>;

    /// # Errors
    ///
    /// Returns an error if the mutation fails; `state` is left unchanged.
    fn apply(
        &mut self,
        state: &mut KingdomState,
        proof: Validated,
    ) -> Result<CommandOutcome, CommandError>;

    /// # Errors
    ///
    /// Returns [`CommandError::NotApplied`] when there is nothing to undo.
    fn undo(&mut self, state: &mut KingdomState) -> Result<(), CommandError>;
}

/// Validate and then apply a command.
///
/// # Errors
///
/// Returns the validation failure without touching `state`, or the apply
/// failure.
pub fn execute<C>(command: &mut C, state: &mut KingdomState) -> Result<CommandOutcome, CommandError>
where
    C: KingdomCommand + ?Sized,
{
    if let Err(err) = command.validate(state) {
        log::debug!("{} rejected: {err}", command.name());
        return Err(err);
    }
    command.apply(state, Validated(()))
}

fn restore_snapshot(
    name: &'static str,
    snapshot: &mut Option<Snapshot>,
    state: &mut KingdomState,
) -> Result<(), CommandError> {
    let snapshot = snapshot.take().ok_or(CommandError::NotApplied(name))?;
    snapshot.restore(state);
    Ok(())
}

/// Restore a fresh kingdom, keeping its name and players.
#[derive(Debug, Clone, Default)]
pub struct ResetKingdom {
    cfg: KingdomConfig,
    snapshot: Option<Snapshot>,
}

impl ResetKingdom {
    #[must_use]
    pub fn new(cfg: KingdomConfig) -> Self {
        Self {
            cfg,
            snapshot: None,
        }
    }
}

impl KingdomCommand for ResetKingdom {
    fn name(&self) -> &'static str {
        "reset-kingdom"
    }

    fn validate(&self, _state: &KingdomState) -> Result<(), CommandError> {
        self.cfg
            .validate()
            .map_err(|err| ValidationError::Precondition(err.to_string()).into())
    }

    fn apply(
        &mut self,
        state: &mut KingdomState,
        _proof: Validated,
    ) -> Result<CommandOutcome, CommandError> {
        self.snapshot = Some(Snapshot::capture(state));
        state.reset_with(&self.cfg);
        Ok(CommandOutcome::new(
            self.name(),
            format!("{} has been reset", state.name),
        ))
    }

    fn undo(&mut self, state: &mut KingdomState) -> Result<(), CommandError> {
        restore_snapshot(self.name(), &mut self.snapshot, state)
    }
}

#[derive(Debug, Clone)]
pub struct ClaimHex {
    hex: Hex,
    snapshot: Option<Snapshot>,
}

impl ClaimHex {
    #[must_use]
    pub const fn new(hex: Hex) -> Self {
        Self {
            hex,
            snapshot: None,
        }
    }
}

impl KingdomCommand for ClaimHex {
    fn name(&self) -> &'static str {
        "claim-hex"
    }

    fn validate(&self, state: &KingdomState) -> Result<(), CommandError> {
        if self.hex.id.trim().is_empty() {
            return Err(ValidationError::Precondition(String::from("a hex needs an id")).into());
        }
        if state.territory.contains(&self.hex.id) {
            return Err(ValidationError::Precondition(format!(
                "{} is already claimed",
                self.hex.id
            ))
            .into());
        }
        Ok(())
    }

    fn apply(
        &mut self,
        state: &mut KingdomState,
        _proof: Validated,
    ) -> Result<CommandOutcome, CommandError> {
        self.snapshot = Some(Snapshot::capture(state));
        state.territory.claim(self.hex.clone());
        Ok(
            CommandOutcome::new(self.name(), format!("claimed {}", self.hex.id))
                .with_id(self.hex.id.clone()),
        )
    }

    fn undo(&mut self, state: &mut KingdomState) -> Result<(), CommandError> {
        restore_snapshot(self.name(), &mut self.snapshot, state)
    }
}

#[derive(Debug, Clone)]
pub struct PlaceWorksite {
    hex_id: String,
    kind: WorksiteKind,
    snapshot: Option<Snapshot>,
}

impl PlaceWorksite {
    #[must_use]
    pub fn new(hex_id: impl Into<String>, kind: WorksiteKind) -> Self {
        Self {
            hex_id: hex_id.into(),
            kind,
            snapshot: None,
        }
    }
}

impl KingdomCommand for PlaceWorksite {
    fn name(&self) -> &'static str {
        "place-worksite"
    }

    fn validate(&self, state: &KingdomState) -> Result<(), CommandError> {
        let hex = state
            .territory
            .get(&self.hex_id)
            .ok_or_else(|| ValidationError::HexNotClaimed(self.hex_id.clone()))?;
        if self.kind.resolve_for(hex.terrain).is_none() {
            return Err(ValidationError::WorksiteTerrain {
                kind: self.kind,
                terrain: hex.terrain,
            }
            .into());
        }
        Ok(())
    }

    fn apply(
        &mut self,
        state: &mut KingdomState,
        _proof: Validated,
    ) -> Result<CommandOutcome, CommandError> {
        let snapshot = Snapshot::capture(state);
        let built = state.territory.place_worksite(&self.hex_id, self.kind)?;
        self.snapshot = Some(snapshot);
        Ok(CommandOutcome::new(
            self.name(),
            format!("built a {} on {}", built.label(), self.hex_id),
        ))
    }

    fn undo(&mut self, state: &mut KingdomState) -> Result<(), CommandError> {
        restore_snapshot(self.name(), &mut self.snapshot, state)
    }
}

/// Shift a faction's attitude by whole steps, clamped at the ends.
#[derive(Debug, Clone)]
pub struct AdjustFactionAttitude {
    faction_id: String,
    steps: i8,
    previous: Option<Attitude>,
}

impl AdjustFactionAttitude {
    #[must_use]
    pub fn new(faction_id: impl Into<String>, steps: i8) -> Self {
        Self {
            faction_id: faction_id.into(),
            steps,
            previous: None,
        }
    }
}

impl KingdomCommand for AdjustFactionAttitude {
    fn name(&self) -> &'static str {
        "adjust-faction-attitude"
    }

    fn validate(&self, state: &KingdomState) -> Result<(), CommandError> {
        if !state.factions.iter().any(|f| f.id == self.faction_id) {
            return Err(KingdomError::UnknownFaction(self.faction_id.clone()).into());
        }
        if self.steps == 0 {
            return Err(ValidationError::Precondition(String::from(
                "an attitude change needs at least one step",
            ))
            .into());
        }
        Ok(())
    }

    fn apply(
        &mut self,
        state: &mut KingdomState,
        _proof: Validated,
    ) -> Result<CommandOutcome, CommandError> {
        let previous = state
            .factions
            .iter()
            .find(|f| f.id == self.faction_id)
            .map(|f| f.attitude)
            .ok_or_else(|| KingdomError::UnknownFaction(self.faction_id.clone()))?;
        let attitude = state.adjust_faction_attitude(&self.faction_id, self.steps)?;
        self.previous = Some(previous);
        Ok(CommandOutcome::new(
            self.name(),
            format!("{} is now {}", self.faction_id, attitude.label()),
        ))
    }

    fn undo(&mut self, state: &mut KingdomState) -> Result<(), CommandError> {
        let previous = self.previous.take().ok_or(CommandError::NotApplied(self.name()))?;
        let faction = state
            .factions
            .iter_mut()
            .find(|f| f.id == self.faction_id)
            .ok_or_else(|| KingdomError::UnknownFaction(self.faction_id.clone()))?;
        faction.attitude = previous;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FoundSettlement {
    name: String,
    hex_id: Option<String>,
    snapshot: Option<Snapshot>,
}

impl FoundSettlement {
    #[must_use]
    pub fn new(name: impl Into<String>, hex_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            hex_id,
            snapshot: None,
        }
    }
}

impl KingdomCommand for FoundSettlement {
    fn name(&self) -> &'static str {
        "found-settlement"
    }

    fn validate(&self, state: &KingdomState) -> Result<(), CommandError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Precondition(String::from("a settlement needs a name")).into());
        }
        if state
            .settlements
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
        {
            return Err(ValidationError::DuplicateSettlement(name.to_string()).into());
        }
        if let Some(hex) = self.hex_id.as_deref()
            && !state.territory.contains(hex)
        {
            return Err(ValidationError::HexNotClaimed(hex.to_string()).into());
        }
        Ok(())
    }

    fn apply(
        &mut self,
        state: &mut KingdomState,
        _proof: Validated,
    ) -> Result<CommandOutcome, CommandError> {
        let snapshot = Snapshot::capture(state);
        let id = state.found_settlement(&self.name, self.hex_id.as_deref())?;
        self.snapshot = Some(snapshot);
        Ok(CommandOutcome::new(self.name(), format!("founded {}", self.name.trim())).with_id(id))
    }

    fn undo(&mut self, state: &mut KingdomState) -> Result<(), CommandError> {
        restore_snapshot(self.name(), &mut self.snapshot, state)
    }
}

/// Undo stack of applied commands.
#[derive(Default)]
pub struct CommandHistory {
    applied: Vec<Box<dyn KingdomCommand>>,
}

impl CommandHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a command and keep it for undo when it succeeds.
    ///
    /// # Errors
    ///
    /// Returns the command's validation or apply failure; nothing is recorded.
    pub fn execute(
        &mut self,
        mut command: Box<dyn KingdomCommand>,
        state: &mut KingdomState,
    ) -> Result<CommandOutcome, CommandError> {
        let outcome = execute(command.as_mut(), state)?;
        self.applied.push(command);
        Ok(outcome)
    }

    /// Undo the most recent command. Returns its name, or `None` when the
    /// stack is empty.
    ///
    /// # Errors
    ///
    /// Returns the undo failure; the command stays on the stack.
    pub fn undo_last(&mut self, state: &mut KingdomState) -> Result<Option<&'static str>, CommandError> {
        let Some(mut command) = self.applied.pop() else {
            return Ok(None);
        };
        let name = command.name();
        if let Err(err) = command.undo(state) {
            self.applied.push(command);
            return Err(err);
        }
        Ok(Some(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.applied.iter().map(|c| c.name()).collect();
        f.debug_struct("CommandHistory").field("applied", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceKind;
    use crate::territory::Terrain;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn kingdom() -> KingdomState {
        let mut state = KingdomState::new("Stolen Lands", vec!["Aria".into()], &KingdomConfig::default());
        state.territory.claim(Hex::new("s1", Terrain::Mountains));
        state.found_settlement("Oleg's", Some("s1")).unwrap();
        state.resources.set(ResourceKind::Gold, 12);
        state.add_unrest(4);
        state.fame = 3;
        let mut rng = SmallRng::seed_from_u64(1);
        state.add_faction("Lizardfolk", &mut rng);
        state
    }

    #[test]
    fn reset_then_undo_restores_everything() {
        let mut state = kingdom();
        let before = state.clone();
        let mut reset = ResetKingdom::default();
        execute(&mut reset, &mut state).unwrap();
        assert_eq!(state.unrest, 0);
        assert!(state.settlements.is_empty());
        assert_eq!(state.name, "Stolen Lands");
        reset.undo(&mut state).unwrap();
        assert_eq!(state, before);
        assert_eq!(reset.undo(&mut state), Err(CommandError::NotApplied("reset-kingdom")));
    }

    #[test]
    fn snapshot_restore_is_idempotent() {
        let mut state = kingdom();
        let snapshot = Snapshot::capture(&state);
        state.reset();
        snapshot.restore(&mut state);
        snapshot.restore(&mut state);
        assert_eq!(&state, snapshot.state());
    }

    #[test]
    fn failed_validation_never_applies() {
        let mut state = kingdom();
        let before = state.clone();
        let mut logging = PlaceWorksite::new("s1", WorksiteKind::LoggingCamp);
        let err = execute(&mut logging, &mut state).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Validation(ValidationError::WorksiteTerrain { .. })
        ));
        assert_eq!(state, before);
        assert!(matches!(logging.undo(&mut state), Err(CommandError::NotApplied(_))));
    }

    #[test]
    fn history_unwinds_in_reverse() {
        let mut state = kingdom();
        let before = state.clone();
        let faction = state.factions[0].id.clone();
        let mut history = CommandHistory::new();
        history
            .execute(Box::new(ClaimHex::new(Hex::new("s2", Terrain::Hills))), &mut state)
            .unwrap();
        history
            .execute(Box::new(PlaceWorksite::new("s2", WorksiteKind::Quarry)), &mut state)
            .unwrap();
        let founded = history
            .execute(
                Box::new(FoundSettlement::new("Tazlford", Some("s2".into()))),
                &mut state,
            )
            .unwrap();
        assert!(founded.created_id.is_some());
        history
            .execute(Box::new(AdjustFactionAttitude::new(faction, 9)), &mut state)
            .unwrap();
        assert_eq!(state.factions[0].attitude, Attitude::Helpful);
        assert_eq!(history.len(), 4);

        assert!(
            history
                .execute(Box::new(FoundSettlement::new("oleg's", None)), &mut state)
                .is_err()
        );
        assert_eq!(history.len(), 4);

        while history.undo_last(&mut state).unwrap().is_some() {}
        assert!(history.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_faction_is_a_kingdom_error() {
        let mut state = kingdom();
        let mut adjust = AdjustFactionAttitude::new("faction-99", 1);
        assert_eq!(
            execute(&mut adjust, &mut state),
            Err(CommandError::Kingdom(KingdomError::UnknownFaction("faction-99".into())))
        );
    }
}
