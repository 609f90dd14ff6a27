use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Deterministic random source for a run.
///
/// A master seed derives one independent `ChaCha8Rng` per named stream, so
/// terrain generation, weather, population seeding, and behavior each draw
/// from their own sequence. Stream identity depends only on the master seed
/// and the name, never on the order streams are first requested.
pub struct RngManager {
    master_seed: u64,
    streams: HashMap<&'static str, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master_seed: seed,
            streams: HashMap::new(),
        }
    }

    pub fn stream(&mut self, name: &'static str) -> &mut ChaCha8Rng {
        let seed = derive_seed(self.master_seed, name);
        self.streams
            .entry(name)
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(seed))
    }
}

fn derive_seed(master: u64, name: &str) -> u64 {
    // FNV-1a over the stream name, folded into the master seed and run
    // through a splitmix64 finalizer for avalanche.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut mixed = master ^ hash;
    mixed = mixed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    mixed ^ (mixed >> 31)
}
