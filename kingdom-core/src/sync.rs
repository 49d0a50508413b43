//! Boundary with the map editor and territory sync.
//!
//! The renderer and editor tools live outside this crate. They hand the
//! engine either a whole realm at once or a single edit, and get the
//! validated result back.
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::settlements::Settlement;
use crate::state::KingdomState;
use crate::territory::{Hex, Terrain, WorksiteKind};

/// Complete map state pushed by the sync service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmSnapshot {
    #[serde(default)]
    pub hexes: Vec<Hex>,
    #[serde(default)]
    pub settlements: Vec<Settlement>,
}

impl RealmSnapshot {
    #[must_use]
    pub fn capture(state: &KingdomState) -> Self {
        Self {
            hexes: state.territory.hexes().to_vec(),
            settlements: state.settlements.clone(),
        }
    }
}

/// Replace territory and settlements in one step.
///
/// Cells not held by the kingdom are dropped, armies supported by a removed
/// settlement lose their assignment and production is recomputed before this
/// returns.
pub fn apply_realm_snapshot(state: &mut KingdomState, snapshot: RealmSnapshot) {
    let RealmSnapshot { hexes, settlements } = snapshot;
    state.replace_realm(hexes, settlements);
}

/// A single editor operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MapEdit {
    Claim { hex: Hex },
    Unclaim { id: String },
    PlaceWorksite { id: String, kind: WorksiteKind },
    RemoveWorksite { id: String },
    SetTerrain { id: String, terrain: Terrain },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapEditOutcome {
    Claimed { id: String },
    Unclaimed { id: String },
    /// Records the kind actually built, which differs from the request for
    /// mines placed on swamp.
    WorksitePlaced { id: String, kind: WorksiteKind },
    WorksiteRemoved {
        id: String,
        kind: Option<WorksiteKind>,
    },
    TerrainChanged {
        id: String,
        worksite: Option<WorksiteKind>,
    },
}

/// Validate and apply one edit. A rejected edit leaves the kingdom unchanged.
///
/// # Errors
///
/// Returns the user-facing [`ValidationError`] for unknown hexes, unclaiming
/// a hex a settlement stands on, or a worksite the terrain cannot hold.
pub fn apply_map_edit(
    state: &mut KingdomState,
    edit: MapEdit,
) -> Result<MapEditOutcome, ValidationError> {
    match edit {
        MapEdit::Claim { hex } => {
            let id = hex.id.clone();
            if id.trim().is_empty() {
                return Err(ValidationError::Precondition(String::from(
                    "a hex needs an id",
                )));
            }
            state.territory.claim(hex);
            Ok(MapEditOutcome::Claimed { id })
        }
        MapEdit::Unclaim { id } => {
            if !state.territory.contains(&id) {
                return Err(ValidationError::HexNotClaimed(id));
            }
            if let Some(settlement) = state
                .settlements
                .iter()
                .find(|s| s.hex_id.as_deref() == Some(id.as_str()))
            {
                return Err(ValidationError::Precondition(format!(
                    "{} stands on {id}",
                    settlement.name
                )));
            }
            state.territory.unclaim(&id);
            Ok(MapEditOutcome::Unclaimed { id })
        }
        MapEdit::PlaceWorksite { id, kind } => {
            let kind = state.territory.place_worksite(&id, kind)?;
            Ok(MapEditOutcome::WorksitePlaced { id, kind })
        }
        MapEdit::RemoveWorksite { id } => {
            let kind = state.territory.remove_worksite(&id)?;
            Ok(MapEditOutcome::WorksiteRemoved { id, kind })
        }
        MapEdit::SetTerrain { id, terrain } => {
            state.territory.set_terrain(&id, terrain)?;
            let worksite = state
                .territory
                .get(&id)
                .and_then(|hex| hex.worksite)
                .map(|site| site.kind);
            Ok(MapEditOutcome::TerrainChanged { id, worksite })
        }
    }
}
