//! Kingdom Rules Engine
//!
//! Platform-agnostic rules for running a tabletop kingdom turn by turn:
//! resources, territory production, settlements and armies, unrest and
//! incidents, the event table, undoable commands and the persistence
//! boundary. Rendering, map editing and host actors stay outside this crate.

pub mod checks;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod factions;
pub mod modifiers;
pub mod numbers;
pub mod persistence;
pub mod phases;
pub mod resources;
pub mod rng;
pub mod session;
pub mod settlements;
pub mod state;
pub mod store;
pub mod sync;
pub mod territory;
pub mod turn;
pub mod unrest;

// Re-export commonly used types
pub use checks::{CheckReport, DegreeOfSuccess, OutcomeEffects, SkillCheck};
pub use commands::{
    AdjustFactionAttitude, ClaimHex, CommandHistory, CommandOutcome, FoundSettlement,
    KingdomCommand, PlaceWorksite, ResetKingdom, Snapshot, execute,
};
pub use config::KingdomConfig;
pub use error::{
    CommandError, ConfigError, KingdomError, PersistenceError, PhaseError, ValidationError,
};
pub use events::{
    ContinuousEvent, EventCatalog, EventCheck, EventDef, EventResolution, event_catalog,
    get_random_event, resolve_event,
};
pub use factions::{Attitude, Faction, ProgressClock};
pub use modifiers::{KingdomModifier, PERMANENT};
pub use persistence::{
    KingdomStorage, LogNotifier, MemoryStorage, Notifier, SaveDocument, from_json, migrate,
    to_json,
};
pub use phases::{
    EventsPhase, IncidentResolution, ResourcesPhase, StatusPhase, StatusReport, UnrestPhase,
    UpkeepPhase, UpkeepReport,
};
pub use resources::{ResourceCost, ResourceKind, ResourceLedger};
pub use rng::{CountingRng, KingdomRng};
pub use session::{KingdomSession, TurnReport, UnrestCheck};
pub use settlements::{Army, EquipmentUpgrade, Settlement, SettlementTier};
pub use state::{BuildProject, CompletedBuild, KingdomState};
pub use store::{KingdomStore, RemoteMerge, SaveDebouncer, SaveOutcome, SubscriptionId};
pub use sync::{MapEdit, MapEditOutcome, RealmSnapshot, apply_map_edit, apply_realm_snapshot};
pub use territory::{ClaimOwner, Hex, HexView, ProductionCache, Terrain, Territory, WorksiteKind};
pub use turn::{PhaseAdvance, PhaseStep, TurnPhase, TurnTracker};
pub use unrest::{
    IncidentCatalog, IncidentDef, UnrestBreakdown, UnrestTier, calculate_turn_unrest,
    get_unrest_tier, incident_catalog, roll_for_incident,
};

/// Entry point binding rules configuration to a storage backend.
pub struct KingdomEngine<S>
where
    S: KingdomStorage,
{
    cfg: KingdomConfig,
    storage: S,
}

impl<S> KingdomEngine<S>
where
    S: KingdomStorage,
{
    /// Create an engine with the default rules.
    pub fn new(storage: S) -> Self {
        Self {
            cfg: KingdomConfig::default(),
            storage,
        }
    }

    /// Create an engine with custom rules.
    ///
    /// # Errors
    ///
    /// Returns the first violated config invariant.
    pub fn with_config(cfg: KingdomConfig, storage: S) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self { cfg, storage })
    }

    #[must_use]
    pub const fn config(&self) -> &KingdomConfig {
        &self.cfg
    }

    /// Create a new kingdom with no players yet.
    #[must_use]
    pub fn create_kingdom(&self, name: &str, seed: u64) -> KingdomState {
        self.create_session(name, Vec::new(), seed).into_state()
    }

    /// Construct a session around a fresh kingdom.
    #[must_use]
    pub fn create_session(&self, name: &str, players: Vec<String>, seed: u64) -> KingdomSession {
        let state = KingdomState::new(name, players, &self.cfg);
        KingdomSession::new(state, self.cfg.clone(), seed)
    }

    /// Resume a saved kingdom in a new session.
    #[must_use]
    pub fn resume_session(&self, state: KingdomState, seed: u64) -> KingdomSession {
        KingdomSession::new(state.rehydrate(), self.cfg.clone(), seed)
    }

    /// Save a kingdom
    ///
    /// # Errors
    ///
    /// Returns an error if the kingdom cannot be saved.
    pub fn save_kingdom(&self, save_name: &str, kingdom: &KingdomState) -> Result<(), S::Error> {
        self.storage.save_kingdom(save_name, kingdom)
    }

    /// Load a kingdom
    ///
    /// # Errors
    ///
    /// Returns an error if the kingdom cannot be loaded.
    pub fn load_kingdom(&self, save_name: &str) -> Result<Option<KingdomState>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let loaded = self.storage.load_kingdom(save_name).map_err(Into::into)?;
        Ok(loaded.map(KingdomState::rehydrate))
    }

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_kingdom(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_kingdom(save_name)
    }

    /// Hand the storage to a reactive store for an open kingdom, debounced
    /// by the configured save window.
    #[must_use]
    pub fn into_store<N: Notifier>(
        self,
        state: KingdomState,
        notifier: N,
        save_name: &str,
    ) -> KingdomStore<S, N> {
        let delay = self.cfg.save_debounce();
        KingdomStore::new(state.rehydrate(), self.storage, notifier, save_name, delay)
    }

    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedStorage {
        saves: Rc<RefCell<HashMap<String, KingdomState>>>,
    }

    impl KingdomStorage for SharedStorage {
        type Error = Infallible;

        fn save_kingdom(&self, save_name: &str, kingdom: &KingdomState) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(save_name.to_string(), kingdom.clone());
            Ok(())
        }

        fn load_kingdom(&self, save_name: &str) -> Result<Option<KingdomState>, Self::Error> {
            Ok(self.saves.borrow().get(save_name).cloned())
        }

        fn delete_kingdom(&self, save_name: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(save_name);
            Ok(())
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_state() {
        let engine = KingdomEngine::new(SharedStorage::default());
        let mut session = engine.create_session("Brevoy", vec!["Aria".into()], 0xABCD);
        session.with_state_mut(|state| {
            state.territory.claim(Hex::new("b1", Terrain::Forest).with_worksite(WorksiteKind::LoggingCamp));
            state.fame = 5;
        });
        let snapshot = session.into_state();
        engine.save_kingdom("slot-one", &snapshot).unwrap();

        let loaded = engine.load_kingdom("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded.fame, 5);
        let cache = loaded.territory.cached_production().unwrap();
        assert_eq!(cache.totals.get(ResourceKind::Lumber), 2);
        assert!(engine.load_kingdom("missing-slot").unwrap().is_none());

        engine.delete_kingdom("slot-one").unwrap();
        assert!(engine.load_kingdom("slot-one").unwrap().is_none());
    }

    #[test]
    fn create_kingdom_starts_at_turn_one() {
        let engine = KingdomEngine::new(MemoryStorage::new());
        let state = engine.create_kingdom("Issia", 7);
        assert_eq!(state.turn.turn, 1);
        assert_eq!(state.turn.phase, TurnPhase::Status);
        assert_eq!(state.size(), 0);
    }

    #[test]
    fn store_uses_configured_debounce() {
        let cfg = KingdomConfig {
            save_debounce_ms: 40,
            ..KingdomConfig::default()
        };
        let engine = KingdomEngine::with_config(cfg, SharedStorage::default()).unwrap();
        let state = engine.create_kingdom("Mivon", 3);
        let store = engine.into_store(state, LogNotifier, "slot");
        assert_eq!(store.debouncer().delay, std::time::Duration::from_millis(40));
        assert!(!store.is_dirty());
    }

    #[test]
    fn invalid_rules_are_rejected() {
        let cfg = KingdomConfig {
            event_dc_floor: 20,
            ..KingdomConfig::default()
        };
        assert!(KingdomEngine::with_config(cfg, MemoryStorage::new()).is_err());
    }
}
