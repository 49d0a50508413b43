use kingdom_core::{CheckReport, KingdomError, SkillCheck};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Seeded stand-in for the table: a d20 plus a flat skill modifier.
pub struct RollingChecker {
    rng: ChaCha20Rng,
    modifier: i32,
    checks_made: u32,
}

impl RollingChecker {
    #[must_use]
    pub fn new(seed: u64, modifier: i32) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            modifier,
            checks_made: 0,
        }
    }

    #[must_use]
    pub const fn checks_made(&self) -> u32 {
        self.checks_made
    }
}

impl SkillCheck for RollingChecker {
    fn check(&mut self, skill: &str, dc: i32) -> Result<CheckReport, KingdomError> {
        let die: i32 = self.rng.gen_range(1..=20);
        let total = die + self.modifier;
        self.checks_made += 1;
        let report = CheckReport::from_total(total, dc);
        log::debug!("{skill}: rolled {die}{:+} = {total} vs DC {dc} ({:?})", self.modifier, report.degree);
        Ok(report)
    }
}
