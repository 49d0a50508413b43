//! Kingdom resource ledger.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Closed set of resources tracked by the kingdom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Gold,
    Food,
    Lumber,
    Stone,
    Ore,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [Self::Gold, Self::Food, Self::Lumber, Self::Stone, Self::Ore];

    /// Storable resources survive the end of a turn; the rest are zeroed.
    #[must_use]
    pub const fn is_storable(self) -> bool {
        matches!(self, Self::Gold | Self::Food)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Food => "food",
            Self::Lumber => "lumber",
            Self::Stone => "stone",
            Self::Ore => "ore",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Gold => 0,
            Self::Food => 1,
            Self::Lumber => 2,
            Self::Stone => 3,
            Self::Ore => 4,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gold" => Ok(Self::Gold),
            "food" => Ok(Self::Food),
            "lumber" => Ok(Self::Lumber),
            "stone" => Ok(Self::Stone),
            "ore" => Ok(Self::Ore),
            _ => Err(()),
        }
    }
}

/// Enum-indexed quantities, never negative.
///
/// Serializes as a flat `{ "gold": 3, "food": 1, ... }` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ResourceKind, u32>",
    into = "BTreeMap<ResourceKind, u32>"
)]
pub struct ResourceLedger {
    slots: [u32; 5],
}

impl ResourceLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: [0; 5] }
    }

    /// Build a ledger from `(kind, amount)` pairs. Repeated kinds accumulate.
    #[must_use]
    pub fn from_pairs(pairs: &[(ResourceKind, u32)]) -> Self {
        let mut ledger = Self::new();
        for (kind, amount) in pairs {
            ledger.add(*kind, *amount);
        }
        ledger
    }

    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u32 {
        self.slots[kind.index()]
    }

    pub const fn set(&mut self, kind: ResourceKind, amount: u32) {
        self.slots[kind.index()] = amount;
    }

    pub const fn add(&mut self, kind: ResourceKind, amount: u32) {
        let slot = &mut self.slots[kind.index()];
        *slot = slot.saturating_add(amount);
    }

    /// Subtract with a floor at zero, returning the part that could not be paid.
    pub fn subtract(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let slot = &mut self.slots[kind.index()];
        let shortfall = amount.saturating_sub(*slot);
        *slot = slot.saturating_sub(amount);
        shortfall
    }

    /// Apply a signed delta, flooring at zero.
    pub fn apply_delta(&mut self, kind: ResourceKind, delta: i32) {
        if delta >= 0 {
            self.add(kind, delta.unsigned_abs());
        } else {
            let _ = self.subtract(kind, delta.unsigned_abs());
        }
    }

    /// Add every quantity of `other` into this ledger.
    pub fn absorb(&mut self, other: &Self) {
        for kind in ResourceKind::ALL {
            self.add(kind, other.get(kind));
        }
    }

    #[must_use]
    pub fn can_afford(&self, cost: &ResourceCost) -> bool {
        cost.iter().all(|(kind, amount)| self.get(kind) >= amount)
    }

    /// Pay a cost in full or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Unaffordable`] when any resource falls short.
    pub fn spend(&mut self, cost: &ResourceCost) -> Result<(), ValidationError> {
        if !self.can_afford(cost) {
            return Err(ValidationError::Unaffordable(cost.to_string()));
        }
        for (kind, amount) in cost.iter() {
            let _ = self.subtract(kind, amount);
        }
        Ok(())
    }

    /// Zero every non-storable resource. Idempotent.
    pub fn clear_non_storable(&mut self) {
        for kind in ResourceKind::ALL {
            if !kind.is_storable() {
                self.set(kind, 0);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        ResourceKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.slots.iter().fold(0_u32, |acc, v| acc.saturating_add(*v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|v| *v == 0)
    }
}

impl From<BTreeMap<ResourceKind, u32>> for ResourceLedger {
    fn from(map: BTreeMap<ResourceKind, u32>) -> Self {
        let mut ledger = Self::new();
        for (kind, amount) in map {
            ledger.set(kind, amount);
        }
        ledger
    }
}

impl From<ResourceLedger> for BTreeMap<ResourceKind, u32> {
    fn from(ledger: ResourceLedger) -> Self {
        ledger.iter().collect()
    }
}

/// Sparse resource bag used for costs and investments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCost(BTreeMap<ResourceKind, u32>);

impl ResourceCost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, kind: ResourceKind, amount: u32) -> Self {
        self.insert(kind, amount);
        self
    }

    pub fn insert(&mut self, kind: ResourceKind, amount: u32) {
        if amount == 0 {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, amount);
        }
    }

    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.0.iter().map(|(kind, amount)| (*kind, *amount))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Per-kind remainder of `self` after `paid`, never below zero.
    #[must_use]
    pub fn remaining_after(&self, paid: &Self) -> Self {
        let mut remaining = Self::new();
        for (kind, amount) in self.iter() {
            remaining.insert(kind, amount.saturating_sub(paid.get(kind)));
        }
        remaining
    }

    /// Cap each entry of `self` at the matching entry of `limit`.
    #[must_use]
    pub fn capped_by(&self, limit: &Self) -> Self {
        let mut capped = Self::new();
        for (kind, amount) in self.iter() {
            capped.insert(kind, amount.min(limit.get(kind)));
        }
        capped
    }

    pub fn accumulate(&mut self, other: &Self) {
        for (kind, amount) in other.iter() {
            let current = self.get(kind);
            self.insert(kind, current.saturating_add(amount));
        }
    }
}

impl fmt::Display for ResourceCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("nothing");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(kind, amount)| format!("{amount} {kind}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
