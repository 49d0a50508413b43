//! Degree-of-success bucketing, outcome effects and the skill-check boundary.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::CRITICAL_MARGIN;
use crate::error::KingdomError;
use crate::resources::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DegreeOfSuccess {
    CriticalSuccess,
    Success,
    Failure,
    CriticalFailure,
}

impl DegreeOfSuccess {
    /// Bucket a check total against a DC.
    #[must_use]
    pub const fn from_roll(total: i32, dc: i32) -> Self {
        if total >= dc + CRITICAL_MARGIN {
            Self::CriticalSuccess
        } else if total <= dc - CRITICAL_MARGIN {
            Self::CriticalFailure
        } else if total >= dc {
            Self::Success
        } else {
            Self::Failure
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CriticalSuccess => "criticalSuccess",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::CriticalFailure => "criticalFailure",
        }
    }
}

impl fmt::Display for DegreeOfSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed kingdom deltas carried by an outcome or modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutcomeEffects {
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub food: i32,
    #[serde(default)]
    pub lumber: i32,
    #[serde(default)]
    pub stone: i32,
    #[serde(default)]
    pub ore: i32,
    #[serde(default)]
    pub unrest: i32,
    #[serde(default)]
    pub fame: i32,
}

impl OutcomeEffects {
    #[must_use]
    pub const fn resource_delta(&self, kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Food => self.food,
            ResourceKind::Lumber => self.lumber,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.gold == 0
            && self.food == 0
            && self.lumber == 0
            && self.stone == 0
            && self.ore == 0
            && self.unrest == 0
            && self.fame == 0
    }
}

/// Result reported by the external check executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub total: i32,
    pub degree: DegreeOfSuccess,
}

impl CheckReport {
    #[must_use]
    pub const fn from_total(total: i32, dc: i32) -> Self {
        Self {
            total,
            degree: DegreeOfSuccess::from_roll(total, dc),
        }
    }
}

/// Skill-check executor supplied by the host.
///
/// The engine never rolls player checks itself; it asks for a check against a
/// DC and receives the total and degree of success.
pub trait SkillCheck {
    /// Perform `skill` against `dc`.
    ///
    /// # Errors
    ///
    /// Returns [`KingdomError::MissingActor`] when no actor backs the check.
    fn check(&mut self, skill: &str, dc: i32) -> Result<CheckReport, KingdomError>;
}

impl<F> SkillCheck for F
where
    F: FnMut(&str, i32) -> Result<CheckReport, KingdomError>,
{
    fn check(&mut self, skill: &str, dc: i32) -> Result<CheckReport, KingdomError> {
        self(skill, dc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_boundaries() {
        assert_eq!(DegreeOfSuccess::from_roll(25, 15), DegreeOfSuccess::CriticalSuccess);
        assert_eq!(DegreeOfSuccess::from_roll(24, 15), DegreeOfSuccess::Success);
        assert_eq!(DegreeOfSuccess::from_roll(15, 15), DegreeOfSuccess::Success);
        assert_eq!(DegreeOfSuccess::from_roll(14, 15), DegreeOfSuccess::Failure);
        assert_eq!(DegreeOfSuccess::from_roll(6, 15), DegreeOfSuccess::Failure);
        assert_eq!(DegreeOfSuccess::from_roll(5, 15), DegreeOfSuccess::CriticalFailure);
    }

    #[test]
    fn closures_are_checkers() {
        let mut fixed = |_skill: &str, dc: i32| -> Result<CheckReport, KingdomError> {
            Ok(CheckReport::from_total(dc + 1, dc))
        };
        let report = fixed.check("diplomacy", 14).unwrap();
        assert_eq!(report.degree, DegreeOfSuccess::Success);
    }

    #[test]
    fn effects_serialize_sparse_input() {
        let effects: OutcomeEffects = serde_json::from_str(r#"{"gold": -2, "unrest": 1}"#).unwrap();
        assert_eq!(effects.resource_delta(ResourceKind::Gold), -2);
        assert_eq!(effects.unrest, 1);
        assert!(!effects.is_empty());
        assert!(OutcomeEffects::default().is_empty());
    }
}
