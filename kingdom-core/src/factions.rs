//! External factions and their standing with the kingdom.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLOCK_MAX, FACTION_COLOR_ATTEMPTS, FACTION_COLOR_LIGHTNESS, FACTION_COLOR_MIN_HUE_GAP,
    FACTION_COLOR_SATURATION, GOLDEN_ANGLE_DEGREES,
};
use crate::numbers::{round_f64_to_u8, wrap_degrees};

/// Five-step ordered attitude toward the kingdom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Attitude {
    Hostile,
    Unfriendly,
    #[default]
    Indifferent,
    Friendly,
    Helpful,
}

impl Attitude {
    pub const ORDER: [Self; 5] = [
        Self::Hostile,
        Self::Unfriendly,
        Self::Indifferent,
        Self::Friendly,
        Self::Helpful,
    ];

    const fn rank(self) -> i16 {
        match self {
            Self::Hostile => 0,
            Self::Unfriendly => 1,
            Self::Indifferent => 2,
            Self::Friendly => 3,
            Self::Helpful => 4,
        }
    }

    /// Move `steps` along the ordering, clamped at Hostile and Helpful.
    #[must_use]
    pub fn adjust(self, steps: i8) -> Self {
        let target = (self.rank() + i16::from(steps)).clamp(0, 4);
        let idx = usize::try_from(target).unwrap_or(0);
        Self::ORDER[idx]
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hostile => "Hostile",
            Self::Unfriendly => "Unfriendly",
            Self::Indifferent => "Indifferent",
            Self::Friendly => "Friendly",
            Self::Helpful => "Helpful",
        }
    }
}

/// Bounded progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressClock {
    pub current: u8,
    pub max: u8,
}

impl Default for ProgressClock {
    fn default() -> Self {
        Self {
            current: 0,
            max: DEFAULT_CLOCK_MAX,
        }
    }
}

impl ProgressClock {
    #[must_use]
    pub const fn new(max: u8) -> Self {
        Self { current: 0, max }
    }

    /// Advance, saturating at `max`. Returns true once the clock is full.
    pub fn advance(&mut self, segments: u8) -> bool {
        self.current = self.current.saturating_add(segments).min(self.max);
        self.is_complete()
    }

    pub fn rewind(&mut self, segments: u8) {
        self.current = self.current.saturating_sub(segments);
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current >= self.max
    }

    pub const fn reset(&mut self) {
        self.current = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attitude: Attitude,
    pub color: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub clock: ProgressClock,
    #[serde(default)]
    pub allies: Vec<String>,
    #[serde(default)]
    pub enemies: Vec<String>,
    #[serde(default)]
    pub provinces: Vec<String>,
}

impl Faction {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attitude: Attitude::default(),
            color: color.into(),
            goal: String::new(),
            notes: String::new(),
            clock: ProgressClock::default(),
            allies: Vec::new(),
            enemies: Vec::new(),
            provinces: Vec::new(),
        }
    }
}

/// Pick a display color whose hue sits clear of every existing color.
///
/// Hues walk the golden angle from a random start; when every attempt lands
/// too close to an existing hue the last candidate is used anyway.
pub fn generate_faction_color<R>(existing: &[String], rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let taken: Vec<f64> = existing.iter().filter_map(|c| hue_of(c)).collect();
    let start = rng.gen_range(0.0..360.0);
    let mut hue = start;
    for attempt in 0..FACTION_COLOR_ATTEMPTS {
        hue = wrap_degrees(start + GOLDEN_ANGLE_DEGREES * f64::from(attempt));
        let clear = taken
            .iter()
            .all(|other| hue_distance(hue, *other) >= FACTION_COLOR_MIN_HUE_GAP);
        if clear {
            break;
        }
    }
    hsl_to_hex(hue, FACTION_COLOR_SATURATION, FACTION_COLOR_LIGHTNESS)
}

fn hue_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    diff.min(360.0 - diff)
}

fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector {
        s if s < 1.0 => (chroma, x, 0.0),
        s if s < 2.0 => (x, chroma, 0.0),
        s if s < 3.0 => (0.0, chroma, x),
        s if s < 4.0 => (0.0, x, chroma),
        s if s < 5.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| round_f64_to_u8((v + m) * 255.0);
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}

fn hue_of(color: &str) -> Option<f64> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let parse = |range: std::ops::Range<usize>| {
        u8::from_str_radix(hex.get(range)?, 16)
            .ok()
            .map(|v| f64::from(v) / 255.0)
    };
    let (r, g, b) = (parse(0..2)?, parse(2..4)?, parse(4..6)?);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta <= f64::EPSILON {
        return None;
    }
    let hue = if (max - r).abs() <= f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() <= f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    Some(wrap_degrees(hue))
}
