//! Error taxonomy for the kingdom engine.
//!
//! Expected "nothing happened" outcomes (no incident, no event) are `Option`
//! returns and never reach these types.

use thiserror::Error;

use crate::territory::{Terrain, WorksiteKind};
use crate::turn::TurnPhase;

/// Missing-dependency and programmer-error failures.
///
/// Callers are expected to surface these through a notification sink; the
/// engine never retries them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KingdomError {
    #[error("no actor is linked for `{0}`")]
    MissingActor(String),
    #[error("unknown settlement `{0}`")]
    UnknownSettlement(String),
    #[error("unknown army `{0}`")]
    UnknownArmy(String),
    #[error("unknown faction `{0}`")]
    UnknownFaction(String),
    #[error("unknown hex `{0}`")]
    UnknownHex(String),
    #[error("unknown build project `{0}`")]
    UnknownProject(String),
    #[error("no pending {0} to resolve")]
    NothingToResolve(&'static str),
}

/// User-facing rejections. The `Display` text is the warning shown to players.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{} cannot be built on {}", .kind.label(), .terrain.label())]
    WorksiteTerrain {
        kind: WorksiteKind,
        terrain: Terrain,
    },
    #[error("hex `{0}` is not claimed by the kingdom")]
    HexNotClaimed(String),
    #[error("a settlement named `{0}` already exists")]
    DuplicateSettlement(String),
    #[error("the kingdom cannot afford this ({0})")]
    Unaffordable(String),
    #[error("`{0}` has already been used this turn")]
    AlreadyUsedThisTurn(String),
    #[error("{player} has no actions left this turn")]
    NoActionsLeft { player: String },
    #[error("{upgrade} has already been applied to {army}")]
    UpgradeAlreadyApplied { army: String, upgrade: String },
    #[error("{} cannot be operated until earlier phases are complete", .0.label())]
    PhaseLocked(TurnPhase),
    #[error("{0}")]
    Precondition(String),
}

/// Failures raised by the command layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Kingdom(#[from] KingdomError),
    #[error("command `{0}` has not been applied")]
    NotApplied(&'static str),
}

/// Failures raised while running a phase step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Kingdom(#[from] KingdomError),
}

/// Errors raised when rules configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("event DC floor {floor} exceeds starting DC {start}")]
    EventDcFloor { floor: u8, start: u8 },
    #[error("size unrest thresholds must be strictly increasing")]
    SizeThresholdOrder,
}

/// Failures raised while encoding, decoding or storing a kingdom.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("kingdom document could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("kingdom document could not be parsed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("storage backend failed: {0}")]
    Backend(String),
}
