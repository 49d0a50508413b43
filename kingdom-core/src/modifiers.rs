//! Named, timed effects applied during the Status phase.
use serde::{Deserialize, Serialize};

use crate::checks::OutcomeEffects;

/// Duration marker for modifiers that never expire.
pub const PERMANENT: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingdomModifier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source: String,
    /// Remaining turns; [`PERMANENT`] never expires.
    pub duration: i32,
    #[serde(default)]
    pub effects: OutcomeEffects,
}

impl KingdomModifier {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: String::new(),
            duration,
            effects: OutcomeEffects::default(),
        }
    }

    #[must_use]
    pub const fn with_effects(mut self, effects: OutcomeEffects) -> Self {
        self.effects = effects;
        self
    }

    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.duration == PERMANENT
    }
}

/// Advance modifier durations by one turn.
///
/// Modifiers at exactly one turn remaining expire and are removed; other
/// positive durations count down; permanent modifiers are untouched. Returns
/// the ids that expired.
pub fn tick_modifiers(modifiers: &mut Vec<KingdomModifier>) -> Vec<String> {
    let mut expired = Vec::new();
    modifiers.retain_mut(|modifier| {
        if modifier.duration == 1 {
            expired.push(modifier.id.clone());
            return false;
        }
        if modifier.duration > 1 {
            modifier.duration -= 1;
        }
        true
    });
    expired
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_expires_last_turn_and_counts_down() {
        let mut modifiers = vec![
            KingdomModifier::new("drought", "Drought", 1),
            KingdomModifier::new("festival", "Festival", 3),
            KingdomModifier::new("charter", "Royal Charter", PERMANENT),
        ];
        let expired = tick_modifiers(&mut modifiers);
        assert_eq!(expired, vec!["drought".to_string()]);
        assert_eq!(modifiers.len(), 2);
        assert_eq!(modifiers[0].duration, 2);
        assert!(modifiers[1].is_permanent());
    }
}
