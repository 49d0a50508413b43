//! Table-adjustable rules configuration.
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONTROL_DC, EVENT_DC_FLOOR, EVENT_DC_START, EVENT_DC_STEP, FAME_PER_TURN, NO_INCIDENT_CHANCE_TIER_1,
    NO_INCIDENT_CHANCE_TIER_2, NO_INCIDENT_CHANCE_TIER_3, SAVE_DEBOUNCE_MS,
    SIZE_UNREST_THRESHOLDS, UNSUPPORTED_ARMY_UNREST, WAR_UNREST,
};
use crate::error::ConfigError;
use crate::resources::ResourceLedger;

/// Rules knobs a table may override. Missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KingdomConfig {
    #[serde(default = "KingdomConfig::default_event_dc_start")]
    pub event_dc_start: u8,
    #[serde(default = "KingdomConfig::default_event_dc_step")]
    pub event_dc_step: u8,
    #[serde(default = "KingdomConfig::default_event_dc_floor")]
    pub event_dc_floor: u8,
    /// Chance of "no incident" for tiers 1, 2 and 3.
    #[serde(default = "KingdomConfig::default_no_incident_chance")]
    pub no_incident_chance: [f32; 3],
    /// Base DC for incident and event checks before the unrest penalty.
    #[serde(default = "KingdomConfig::default_control_dc")]
    pub control_dc: i32,
    #[serde(default = "KingdomConfig::default_fame_per_turn")]
    pub fame_per_turn: u32,
    #[serde(default = "KingdomConfig::default_war_unrest")]
    pub war_unrest: u32,
    #[serde(default = "KingdomConfig::default_size_unrest_thresholds")]
    pub size_unrest_thresholds: Vec<u32>,
    #[serde(default = "KingdomConfig::default_unsupported_army_unrest")]
    pub unsupported_army_unrest: u32,
    #[serde(default = "KingdomConfig::default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    #[serde(default)]
    pub starting_resources: ResourceLedger,
}

impl KingdomConfig {
    const fn default_event_dc_start() -> u8 {
        EVENT_DC_START
    }

    const fn default_event_dc_step() -> u8 {
        EVENT_DC_STEP
    }

    const fn default_event_dc_floor() -> u8 {
        EVENT_DC_FLOOR
    }

    const fn default_no_incident_chance() -> [f32; 3] {
        [
            NO_INCIDENT_CHANCE_TIER_1,
            NO_INCIDENT_CHANCE_TIER_2,
            NO_INCIDENT_CHANCE_TIER_3,
        ]
    }

    const fn default_control_dc() -> i32 {
        CONTROL_DC
    }

    const fn default_fame_per_turn() -> u32 {
        FAME_PER_TURN
    }

    const fn default_war_unrest() -> u32 {
        WAR_UNREST
    }

    fn default_size_unrest_thresholds() -> Vec<u32> {
        SIZE_UNREST_THRESHOLDS.to_vec()
    }

    const fn default_unsupported_army_unrest() -> u32 {
        UNSUPPORTED_ARMY_UNREST
    }

    const fn default_save_debounce_ms() -> u64 {
        SAVE_DEBOUNCE_MS
    }

    /// Parse a config from JSON, filling gaps with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub const fn save_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.save_debounce_ms)
    }

    /// No-incident chance for an unrest tier; tier 0 never rolls.
    #[must_use]
    pub fn no_incident_chance_for(&self, tier: u8) -> f32 {
        match tier {
            1..=3 => self.no_incident_chance[usize::from(tier - 1)],
            _ => 1.0,
        }
    }

    /// Check every invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_dc_floor > self.event_dc_start {
            return Err(ConfigError::EventDcFloor {
                floor: self.event_dc_floor,
                start: self.event_dc_start,
            });
        }
        if self.event_dc_start > 20 {
            return Err(ConfigError::RangeViolation {
                field: "event_dc_start",
                min: 1.0,
                max: 20.0,
                value: f32::from(self.event_dc_start),
            });
        }
        if !(1..=40).contains(&self.control_dc) {
            return Err(ConfigError::RangeViolation {
                field: "control_dc",
                min: 1.0,
                max: 40.0,
                value: f32::from(i16::try_from(self.control_dc).unwrap_or(i16::MAX)),
            });
        }
        for chance in self.no_incident_chance {
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::RangeViolation {
                    field: "no_incident_chance",
                    min: 0.0,
                    max: 1.0,
                    value: chance,
                });
            }
        }
        if self
            .size_unrest_thresholds
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(ConfigError::SizeThresholdOrder);
        }
        Ok(())
    }
}

impl Default for KingdomConfig {
    fn default() -> Self {
        Self {
            event_dc_start: Self::default_event_dc_start(),
            event_dc_step: Self::default_event_dc_step(),
            event_dc_floor: Self::default_event_dc_floor(),
            no_incident_chance: Self::default_no_incident_chance(),
            control_dc: Self::default_control_dc(),
            fame_per_turn: Self::default_fame_per_turn(),
            war_unrest: Self::default_war_unrest(),
            size_unrest_thresholds: Self::default_size_unrest_thresholds(),
            unsupported_army_unrest: Self::default_unsupported_army_unrest(),
            save_debounce_ms: Self::default_save_debounce_ms(),
            starting_resources: ResourceLedger::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let cfg = KingdomConfig::from_json("{}").expect("deserialize");
        assert_eq!(cfg, KingdomConfig::default());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn rejects_floor_above_start() {
        let cfg = KingdomConfig {
            event_dc_floor: 18,
            ..KingdomConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::EventDcFloor { floor: 18, start: 16 })
        ));
    }

    #[test]
    fn rejects_out_of_range_chance() {
        let cfg = KingdomConfig {
            no_incident_chance: [0.2, 1.4, 0.1],
            ..KingdomConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation { field, .. }) if field == "no_incident_chance"
        ));
    }

    #[test]
    fn rejects_unsorted_thresholds() {
        let cfg = KingdomConfig {
            size_unrest_thresholds: vec![10, 10, 50],
            ..KingdomConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::SizeThresholdOrder));
    }

    #[test]
    fn tier_chances_resolve() {
        let cfg = KingdomConfig::default();
        assert!((cfg.no_incident_chance_for(1) - 0.20).abs() < f32::EPSILON);
        assert!((cfg.no_incident_chance_for(3) - 0.10).abs() < f32::EPSILON);
        assert!((cfg.no_incident_chance_for(0) - 1.0).abs() < f32::EPSILON);
    }
}
