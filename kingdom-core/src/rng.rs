//! Seeded random streams for incident, event and faction draws.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

/// Independent deterministic streams derived from one user seed.
///
/// Each concern draws from its own stream so that, for example, adding a
/// faction never shifts the event dice of later turns.
#[derive(Debug, Clone)]
pub struct KingdomRng {
    seed: u64,
    incident: CountingRng<SmallRng>,
    event: CountingRng<SmallRng>,
    faction: CountingRng<SmallRng>,
}

impl KingdomRng {
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            incident: CountingRng::new(derive_stream_seed(seed, b"incident")),
            event: CountingRng::new(derive_stream_seed(seed, b"event")),
            faction: CountingRng::new(derive_stream_seed(seed, b"faction")),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream used for incident no-incident and selection rolls.
    pub const fn incident(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.incident
    }

    /// Stream used for the event d20 and event selection.
    pub const fn event(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.event
    }

    /// Stream used for faction colors.
    pub const fn faction(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.faction
    }

    /// Total draws across every stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.incident
            .draws()
            .saturating_add(self.event.draws())
            .saturating_add(self.faction.draws())
    }
}

/// RNG wrapper that counts draw calls.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// First eight bytes of HMAC-SHA256 over `domain_tag`, keyed by the seed.
/// Returns the seed unchanged if the key is rejected.
fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
