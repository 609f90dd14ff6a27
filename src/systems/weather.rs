use anyhow::Result;
use rand_chacha::ChaCha8Rng;

use crate::engine::{System, SystemContext};
use crate::world::World;

/// Advances the rain process once per tick, before any entity acts.
pub struct WeatherSystem;

impl WeatherSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WeatherSystem {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn run(&mut self, _ctx: &SystemContext, world: &mut World, rng: &mut ChaCha8Rng) -> Result<()> {
        world.field_mut().advance_weather(rng);
        Ok(())
    }
}
