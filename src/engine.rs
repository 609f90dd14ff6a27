use std::path::PathBuf;

use anyhow::Result;
use rand_chacha::ChaCha8Rng;

use crate::rng::RngManager;
use crate::snapshot::SnapshotWriter;
use crate::systems::{BehaviorSystem, BookkeepingSystem, WeatherSystem};
use crate::world::World;

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// Builder preloaded with the canonical tick order: weather, behavior,
    /// bookkeeping.
    pub fn standard(settings: EngineSettings) -> Self {
        Self::new(settings)
            .with_system(WeatherSystem::new())
            .with_system(BehaviorSystem::new())
            .with_system(BookkeepingSystem::new())
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    /// Re-seed the world: wipe entities, regrow terrain, repopulate, zero
    /// the clock. Uses the engine's own rng streams, so an engine and a
    /// scenario sharing a seed produce the same starting world.
    pub fn reset(&mut self, world: &mut World) {
        world.clear();
        world.regenerate_terrain(self.rng.stream("terrain"));
        world.populate(self.rng.stream("populate"));
        tracing::debug!(population = world.census().total(), "world reset");
    }

    /// Advance the world by exactly one tick.
    pub fn step(&mut self, world: &mut World) -> Result<TickSummary> {
        world.advance_tick();
        let tick = world.tick();
        for system in &mut self.systems {
            let ctx = SystemContext {
                tick,
                scenario_name: &self.settings.scenario_name,
            };
            let rng = self.rng.stream(system.name());
            system.run(&ctx, world, rng)?;
        }
        let snapshot_path = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        let summary = TickSummary {
            tick,
            population: world.census().total(),
            viable: world.is_viable(),
            snapshot_path,
        };
        tracing::debug!(
            tick = summary.tick,
            population = summary.population,
            "tick complete"
        );
        Ok(summary)
    }

    /// Step up to `ticks` times, stopping early once the world is no longer
    /// viable. Returns the number of ticks actually run.
    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<u64> {
        let mut completed = 0;
        for _ in 0..ticks {
            if !world.is_viable() {
                tracing::warn!(tick = world.tick(), "ecosystem no longer viable, stopping");
                break;
            }
            self.step(world)?;
            completed += 1;
        }
        Ok(completed)
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &'static str;
    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut ChaCha8Rng) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct TickSummary {
    pub tick: u64,
    pub population: u64,
    pub viable: bool,
    pub snapshot_path: Option<PathBuf>,
}
