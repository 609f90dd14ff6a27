use anyhow::Result;
use rand_chacha::ChaCha8Rng;

use crate::engine::{System, SystemContext};
use crate::world::World;

/// End-of-tick cleanup: prune the dead, promote newborns into the registry,
/// refresh the census. Must run after [`crate::systems::BehaviorSystem`].
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &'static str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        world.finish_tick();
        Ok(())
    }
}
