//! Centralized rules and tuning constants for the kingdom engine.
//!
//! These values define the deterministic math for the turn cycle. Values a
//! table can override live in [`crate::config::KingdomConfig`]; everything
//! here is fixed by the rules.

// Log keys -----------------------------------------------------------------
pub(crate) const LOG_TURN_STARTED: &str = "log.turn.started";
pub(crate) const LOG_FAME_GAINED: &str = "log.status.fame";
pub(crate) const LOG_MODIFIERS_APPLIED: &str = "log.status.modifiers";
pub(crate) const LOG_MODIFIER_EXPIRED: &str = "log.status.modifier-expired";
pub(crate) const LOG_RESOURCES_COLLECTED: &str = "log.resources.collected";
pub(crate) const LOG_UNREST_CALCULATED: &str = "log.unrest.calculated";
pub(crate) const LOG_INCIDENT_NONE: &str = "log.incident.none";
pub(crate) const LOG_INCIDENT_TRIGGERED: &str = "log.incident.triggered";
pub(crate) const LOG_INCIDENT_RESOLVED: &str = "log.incident.resolved";
pub(crate) const LOG_EVENT_NONE: &str = "log.event.none";
pub(crate) const LOG_EVENT_TRIGGERED: &str = "log.event.triggered";
pub(crate) const LOG_EVENT_RESOLVED: &str = "log.event.resolved";
pub(crate) const LOG_EVENT_CONTINUOUS: &str = "log.event.continuous";
pub(crate) const LOG_FOOD_SHORTAGE: &str = "log.upkeep.food-shortage";
pub(crate) const LOG_SETTLEMENTS_FED: &str = "log.upkeep.fed";
pub(crate) const LOG_ARMIES_UNSUPPORTED: &str = "log.upkeep.armies-unsupported";
pub(crate) const LOG_BUILD_COMPLETED: &str = "log.upkeep.build-completed";

// Event table ---------------------------------------------------------------
pub const EVENT_DC_START: u8 = 16;
pub const EVENT_DC_STEP: u8 = 5;
pub const EVENT_DC_FLOOR: u8 = 6;
pub const EVENT_DIE_SIDES: u8 = 20;
pub const GENERIC_OUTCOME_MESSAGE: &str = "The kingdom weathers the matter without lasting change.";

// Degree of success ---------------------------------------------------------
pub const CRITICAL_MARGIN: i32 = 10;
pub const CONTROL_DC: i32 = 15;

// Unrest tiers ---------------------------------------------------------------
pub const UNREST_TIER_DISCONTENT: u32 = 3;
pub const UNREST_TIER_TURMOIL: u32 = 6;
pub const UNREST_TIER_REBELLION: u32 = 9;
pub const NO_INCIDENT_CHANCE_TIER_1: f32 = 0.20;
pub const NO_INCIDENT_CHANCE_TIER_2: f32 = 0.15;
pub const NO_INCIDENT_CHANCE_TIER_3: f32 = 0.10;

// Settlement tier tables (Village, Town, City, Metropolis) -------------------
pub const SETTLEMENT_FOOD_CONSUMPTION: [u32; 4] = [1, 4, 8, 12];
pub const SETTLEMENT_ARMY_SUPPORT: [u32; 4] = [1, 2, 3, 4];

// Worksite yields -----------------------------------------------------------
pub const FARMSTEAD_PLAINS_FOOD: u32 = 2;
pub const FARMSTEAD_HILLS_FOOD: u32 = 1;
pub const LOGGING_CAMP_LUMBER: u32 = 2;
pub const MINE_ORE: u32 = 1;
pub const BOG_MINE_ORE: u32 = 1;
pub const QUARRY_STONE: u32 = 1;
pub const SPECIAL_TRAIT_BONUS: u32 = 1;

// Kingdom defaults -----------------------------------------------------------
pub const FAME_PER_TURN: u32 = 1;
pub const WAR_UNREST: u32 = 1;
pub const UNSUPPORTED_ARMY_UNREST: u32 = 1;
pub const SIZE_UNREST_THRESHOLDS: [u32; 4] = [10, 25, 50, 100];
pub const PLAYER_ACTIONS_PER_TURN: u8 = 1;
pub const DEFAULT_CLOCK_MAX: u8 = 4;

// Persistence ---------------------------------------------------------------
pub const SAVE_VERSION: u32 = 3;
pub const SAVE_DEBOUNCE_MS: u64 = 1_000;

// Faction colors -------------------------------------------------------------
pub(crate) const GOLDEN_ANGLE_DEGREES: f64 = 137.507_764;
pub(crate) const FACTION_COLOR_SATURATION: f64 = 0.65;
pub(crate) const FACTION_COLOR_LIGHTNESS: f64 = 0.50;
pub(crate) const FACTION_COLOR_MIN_HUE_GAP: f64 = 24.0;
pub(crate) const FACTION_COLOR_ATTEMPTS: u32 = 12;
