//! Save documents and the storage and notification boundaries.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::constants::SAVE_VERSION;
use crate::error::PersistenceError;
use crate::state::KingdomState;

/// Versioned wrapper written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub version: u32,
    pub kingdom: KingdomState,
}

impl SaveDocument {
    #[must_use]
    pub const fn current(kingdom: KingdomState) -> Self {
        Self {
            version: SAVE_VERSION,
            kingdom,
        }
    }
}

#[derive(Serialize)]
struct SaveDocumentRef<'a> {
    version: u32,
    kingdom: &'a KingdomState,
}

/// Encode a kingdom as a current-version save document.
///
/// # Errors
///
/// Returns [`PersistenceError::Serialize`] if encoding fails.
pub fn to_json(state: &KingdomState) -> Result<String, PersistenceError> {
    serde_json::to_string(&SaveDocumentRef {
        version: SAVE_VERSION,
        kingdom: state,
    })
    .map_err(PersistenceError::Serialize)
}

/// Decode a save, migrate it and rebuild derived caches.
///
/// Documents written before versioning (a bare kingdom object) are read as
/// version 0.
///
/// # Errors
///
/// Returns [`PersistenceError::Parse`] for malformed input.
pub fn from_json(json: &str) -> Result<KingdomState, PersistenceError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(PersistenceError::Parse)?;
    let versioned = value.get("version").is_some() && value.get("kingdom").is_some();
    let doc = if versioned {
        serde_json::from_value::<SaveDocument>(value).map_err(PersistenceError::Parse)?
    } else {
        SaveDocument {
            version: 0,
            kingdom: serde_json::from_value(value).map_err(PersistenceError::Parse)?,
        }
    };
    Ok(migrate(doc).kingdom.rehydrate())
}

/// Bring a document up to [`SAVE_VERSION`].
///
/// No field layout has changed between versions yet, so older documents are
/// only restamped. Newer documents are accepted as-is.
#[must_use]
pub fn migrate(mut doc: SaveDocument) -> SaveDocument {
    match doc.version.cmp(&SAVE_VERSION) {
        std::cmp::Ordering::Less => {
            log::debug!(
                "migrating kingdom save from version {} to {SAVE_VERSION}",
                doc.version
            );
            doc.version = SAVE_VERSION;
        }
        std::cmp::Ordering::Greater => {
            log::warn!(
                "kingdom save version {} is newer than {SAVE_VERSION}; loading anyway",
                doc.version
            );
        }
        std::cmp::Ordering::Equal => {}
    }
    doc
}

/// Trait for abstracting kingdom save/load operations.
/// Host-specific implementations provide this.
pub trait KingdomStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the kingdom cannot be saved.
    fn save_kingdom(&self, save_name: &str, kingdom: &KingdomState) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the kingdom cannot be loaded.
    fn load_kingdom(&self, save_name: &str) -> Result<Option<KingdomState>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_kingdom(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// User-facing notification sink.
pub trait Notifier {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that forwards to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }

    fn error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// In-process storage holding encoded save documents.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saves: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw document stored under `save_name`.
    #[must_use]
    pub fn raw(&self, save_name: &str) -> Option<String> {
        self.saves.borrow().get(save_name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.saves.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saves.borrow().is_empty()
    }
}

impl KingdomStorage for MemoryStorage {
    type Error = PersistenceError;

    fn save_kingdom(&self, save_name: &str, kingdom: &KingdomState) -> Result<(), Self::Error> {
        let json = to_json(kingdom)?;
        self.saves.borrow_mut().insert(save_name.to_string(), json);
        Ok(())
    }

    fn load_kingdom(&self, save_name: &str) -> Result<Option<KingdomState>, Self::Error> {
        self.saves
            .borrow()
            .get(save_name)
            .map(String::as_str)
            .map(from_json)
            .transpose()
    }

    fn delete_kingdom(&self, save_name: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(save_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KingdomConfig;
    use crate::territory::{Hex, Terrain, WorksiteKind};

    fn sample() -> KingdomState {
        let mut state = KingdomState::new("Varnhold", vec!["Aria".into()], &KingdomConfig::default());
        state
            .territory
            .claim(Hex::new("h1", Terrain::Hills).with_worksite(WorksiteKind::Quarry));
        state.add_unrest(2);
        state
    }

    #[test]
    fn documents_carry_the_current_version() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], SAVE_VERSION);
        assert_eq!(value["kingdom"]["name"], "Varnhold");
    }

    #[test]
    fn loading_rebuilds_the_production_cache() {
        let loaded = from_json(&to_json(&sample()).unwrap()).unwrap();
        assert_eq!(loaded, sample());
        let cache = loaded.territory.cached_production().unwrap();
        assert_eq!(cache.totals.get(crate::ResourceKind::Stone), 1);
    }

    #[test]
    fn migrate_restamps_old_and_keeps_new() {
        let old = migrate(SaveDocument {
            version: 1,
            kingdom: sample(),
        });
        assert_eq!(old.version, SAVE_VERSION);
        let newer = migrate(SaveDocument {
            version: SAVE_VERSION + 4,
            kingdom: sample(),
        });
        assert_eq!(newer.version, SAVE_VERSION + 4);
    }

    #[test]
    fn bare_kingdom_documents_load() {
        let bare = serde_json::to_string(&sample()).unwrap();
        assert_eq!(from_json(&bare).unwrap(), sample());
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        assert!(matches!(from_json("{not json"), Err(PersistenceError::Parse(_))));
    }

    #[test]
    fn memory_storage_round_trips() {
        let storage = MemoryStorage::new();
        storage.save_kingdom("slot-1", &sample()).unwrap();
        assert_eq!(storage.load_kingdom("slot-1").unwrap(), Some(sample()));
        storage.delete_kingdom("slot-1").unwrap();
        assert!(storage.load_kingdom("slot-1").unwrap().is_none());
        assert!(storage.is_empty());
    }
}
