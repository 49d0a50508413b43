//! Reactive kingdom store.
//!
//! Mutations are applied synchronously and fanned out to subscribers once per
//! update. Saving is debounced: every change restarts the window and the host
//! calls [`KingdomStore::poll_save`] from its own clock. A failed save leaves
//! the in-memory state untouched and the store dirty, so the next poll
//! retries.
use std::time::{Duration, Instant};

use crate::persistence::{KingdomStorage, Notifier};
use crate::state::KingdomState;

/// Handle returned by [`KingdomStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&KingdomState)>;

/// Trailing-edge debounce window for saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveDebouncer {
    pub delay: Duration,
    pub last_change: Option<Instant>,
}

impl SaveDebouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_change: None,
        }
    }

    /// Record a change, restarting the window.
    pub const fn touch(&mut self, now: Instant) {
        self.last_change = Some(now);
    }

    /// Whether the window opened by the last change has elapsed.
    #[must_use]
    pub fn due(&self, now: Instant) -> bool {
        self.last_change
            .is_some_and(|changed| now.saturating_duration_since(changed) >= self.delay)
    }

    pub const fn clear(&mut self) {
        self.last_change = None;
    }
}

/// What a save attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing has changed since the last successful save.
    Clean,
    /// Changes are pending but the debounce window is still open.
    Pending,
    Saved,
    /// The backend failed; the message was passed to the notifier.
    Failed(String),
}

/// How [`KingdomStore::apply_remote`] merged an incoming kingdom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteMerge {
    Replaced,
    /// The incoming territory was stale; local hexes and settlements were kept.
    KeptLocalTerritory,
}

pub struct KingdomStore<S, N>
where
    S: KingdomStorage,
    N: Notifier,
{
    state: KingdomState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    debounce: SaveDebouncer,
    storage: S,
    notifier: N,
    save_name: String,
    dirty: bool,
}

impl<S, N> KingdomStore<S, N>
where
    S: KingdomStorage,
    N: Notifier,
{
    pub fn new(
        state: KingdomState,
        storage: S,
        notifier: N,
        save_name: impl Into<String>,
        delay: Duration,
    ) -> Self {
        Self {
            state,
            subscribers: Vec::new(),
            next_subscription: 0,
            debounce: SaveDebouncer::new(delay),
            storage,
            notifier,
            save_name: save_name.into(),
            dirty: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &KingdomState {
        &self.state
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn debouncer(&self) -> &SaveDebouncer {
        &self.debounce
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, subscriber));
        id
    }

    /// Returns `false` when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self) {
        let state = &self.state;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(state);
        }
    }

    /// Apply a mutation, notify subscribers once and schedule a save.
    pub fn update<R>(&mut self, mutator: impl FnOnce(&mut KingdomState) -> R) -> R {
        self.update_at(Instant::now(), mutator)
    }

    /// [`update`](Self::update) with an explicit clock reading.
    pub fn update_at<R>(
        &mut self,
        now: Instant,
        mutator: impl FnOnce(&mut KingdomState) -> R,
    ) -> R {
        let result = mutator(&mut self.state);
        self.notify();
        self.debounce.touch(now);
        self.dirty = true;
        result
    }

    /// Save if the debounce window has elapsed since the last change.
    pub fn poll_save(&mut self, now: Instant) -> SaveOutcome {
        if !self.dirty {
            return SaveOutcome::Clean;
        }
        if !self.debounce.due(now) {
            return SaveOutcome::Pending;
        }
        self.save_now()
    }

    /// Save immediately, bypassing the debounce window.
    pub fn save_now(&mut self) -> SaveOutcome {
        match self.storage.save_kingdom(&self.save_name, &self.state) {
            Ok(()) => {
                self.dirty = false;
                self.debounce.clear();
                SaveOutcome::Saved
            }
            Err(err) => {
                let message = format!("Failed to save {}: {err}", self.state.name);
                log::error!("{message}");
                self.notifier.error(&message);
                SaveOutcome::Failed(message)
            }
        }
    }

    /// Replace the local kingdom with one received from another client.
    ///
    /// Territory is only taken from `incoming` when it is at least as fresh
    /// as the local copy: a local map with a higher revision and different
    /// content survives, together with its settlements. Remote updates are
    /// never saved back.
    pub fn apply_remote(&mut self, incoming: KingdomState) -> RemoteMerge {
        let mut merged = incoming;
        let local = &self.state.territory;
        let keep_local = local.revision() > merged.territory.revision()
            && local.fingerprint() != merged.territory.fingerprint();
        let merge = if keep_local {
            log::info!(
                "keeping local territory for {} (revision {} over {})",
                self.state.name,
                local.revision(),
                merged.territory.revision()
            );
            merged.territory = self.state.territory.clone();
            merged.settlements = self.state.settlements.clone();
            merged.drop_orphaned_builds();
            merged.release_orphaned_armies();
            RemoteMerge::KeptLocalTerritory
        } else {
            log::debug!("accepted remote kingdom {}", merged.name);
            RemoteMerge::Replaced
        };
        self.state = merged.rehydrate();
        self.notify();
        merge
    }

    #[must_use]
    pub fn into_state(self) -> KingdomState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{LogNotifier, MemoryStorage};
    use crate::territory::{Hex, Terrain};
    use std::cell::Cell;
    use std::rc::Rc;

    fn store() -> KingdomStore<MemoryStorage, LogNotifier> {
        KingdomStore::new(
            KingdomState::new("Restov", Vec::new(), &crate::KingdomConfig::default()),
            MemoryStorage::new(),
            LogNotifier,
            "slot",
            Duration::from_millis(1000),
        )
    }

    #[test]
    fn debouncer_waits_for_quiet_window() {
        let start = Instant::now();
        let mut debounce = SaveDebouncer::new(Duration::from_millis(500));
        assert!(!debounce.due(start));
        debounce.touch(start);
        assert!(!debounce.due(start + Duration::from_millis(499)));
        debounce.touch(start + Duration::from_millis(400));
        assert!(!debounce.due(start + Duration::from_millis(600)));
        assert!(debounce.due(start + Duration::from_millis(900)));
    }

    #[test]
    fn update_notifies_each_subscriber_once() {
        let mut store = store();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let id = store.subscribe(Box::new(move |_| counter.set(counter.get() + 1)));
        let fame = store.update(|state| {
            state.fame += 2;
            state.fame
        });
        assert_eq!(fame, 2);
        assert_eq!(seen.get(), 1);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.update(|state| state.fame += 1);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn bursts_coalesce_into_one_save() {
        let mut store = store();
        let start = Instant::now();
        for offset in 0..5 {
            store.update_at(start + Duration::from_millis(offset * 100), |state| {
                state.add_unrest(1);
            });
        }
        assert_eq!(store.poll_save(start + Duration::from_millis(1000)), SaveOutcome::Pending);
        assert_eq!(store.poll_save(start + Duration::from_millis(1400)), SaveOutcome::Saved);
        assert_eq!(store.poll_save(start + Duration::from_millis(5000)), SaveOutcome::Clean);
        assert_eq!(store.storage().len(), 1);
    }

    #[test]
    fn remote_replaces_when_not_stale() {
        let mut store = store();
        let mut incoming = store.state().clone();
        incoming.territory.claim(Hex::new("r1", Terrain::Forest));
        incoming.unrest = 3;
        assert_eq!(store.apply_remote(incoming), RemoteMerge::Replaced);
        assert_eq!(store.state().unrest, 3);
        assert!(store.state().territory.contains("r1"));
        assert!(!store.is_dirty());
    }

    #[test]
    fn stale_remote_territory_is_ignored() {
        let mut store = store();
        store.update(|state| {
            state.territory.claim(Hex::new("l1", Terrain::Plains));
            state.territory.claim(Hex::new("l2", Terrain::Hills));
        });
        let mut incoming = KingdomState::new("Restov", Vec::new(), &crate::KingdomConfig::default());
        incoming.territory.claim(Hex::new("r1", Terrain::Forest));
        incoming.fame = 4;
        let outpost = incoming.found_settlement("Outpost", Some("r1")).unwrap();
        incoming.recruit_army("Outriders", 1);
        assert_eq!(incoming.assign_army_support(), 0);
        incoming
            .queue_build("palisade", &outpost, crate::ResourceCost::new())
            .unwrap();
        assert_eq!(store.apply_remote(incoming), RemoteMerge::KeptLocalTerritory);
        assert_eq!(store.state().fame, 4);
        assert!(store.state().territory.contains("l2"));
        assert!(!store.state().territory.contains("r1"));
        assert!(store.state().territory.cached_production().is_some());
        assert!(store.state().settlement(&outpost).is_none());
        let army = &store.state().armies[0];
        assert!(!army.support.supported);
        assert!(army.support.settlement_id.is_none());
        assert!(store.state().build_queue.is_empty());
    }
}
