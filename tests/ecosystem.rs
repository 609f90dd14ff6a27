use std::path::PathBuf;

use savanna::engine::{EngineBuilder, EngineSettings};
use savanna::entity::EntitySeed;
use savanna::field::Location;
use savanna::scenario::{Scenario, ScenarioLoader, SpeciesConfig};
use savanna::species::{Category, SpreadPolicy};
use savanna::world::Cohort;

fn build_engine(name: &str, seed: u64) -> savanna::Engine {
    EngineBuilder::standard(EngineSettings {
        scenario_name: name.into(),
        seed,
        snapshot_interval_ticks: 0,
        snapshot_dir: PathBuf::from("snapshots_ecosystem_tests"),
    })
    .build()
}

/// With a spread probability of one and no grazers, a single plant must
/// claim at least one new cell per tick until the patch is full.
#[test]
fn plants_overrun_an_empty_patch() {
    let mut scenario = Scenario::savanna();
    scenario.name = "moss".into();
    scenario.grid.depth = 10;
    scenario.grid.width = 10;
    scenario.terrain.base_probability = -1.0;
    scenario.species = vec![SpeciesConfig {
        name: "moss".into(),
        category: Category::Plant,
        max_litter_size: 5,
        spread: Some(SpreadPolicy {
            base: 1.0,
            water_bonus: 0.0,
            rain_bonus: 0.0,
        }),
        ..SpeciesConfig::default()
    }];

    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.seed);
    let moss = world.species().lookup("moss").unwrap();
    world.spawn(
        EntitySeed::newborn(moss, Category::Plant, false, 0),
        Location::new(5, 5),
        Cohort::Founder,
    );

    for _ in 0..30 {
        engine.step(&mut world).unwrap();
    }
    assert!(world.census().count(moss) >= 31, "growth lags the one-per-tick floor");

    for _ in 0..90 {
        engine.step(&mut world).unwrap();
    }
    assert_eq!(world.census().count(moss), 100, "the patch should be saturated");
}

/// Regression band for the small prey-plus-predator fixture: grass stays
/// abundant, the grazers persist, and the animal population never exceeds
/// the cell count.
#[test]
fn the_watering_hole_stays_in_its_band() {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/watering_hole.yaml")
        .unwrap();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.seed);

    let ran = engine.run(&mut world, 200).unwrap();
    assert_eq!(ran, 200, "the fixture must stay viable for the whole run");

    let grass = world.species().lookup("grass").unwrap();
    let antelope = world.species().lookup("antelope").unwrap();
    let lion = world.species().lookup("lion").unwrap();

    assert!(world.is_viable());
    assert!(
        world.census().count(grass) >= 50,
        "fast regrowth keeps grass abundant, got {}",
        world.census().count(grass)
    );
    assert!(world.census().count(antelope) >= 1, "the grazers persist");

    let animals = world.census().count(antelope) + world.census().count(lion);
    let cells = u64::from(world.field().depth()) * u64::from(world.field().width());
    assert!(animals <= cells, "one animal per cell at most");
    assert_eq!(
        world.census().total(),
        world.census().count(grass) + animals,
        "census components add up"
    );
}

/// The default savanna should comfortably survive its first simulated
/// stretch without the bookkeeping drifting.
#[test]
fn the_default_savanna_survives_its_opening() {
    let scenario = Scenario::savanna();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.seed);

    let ran = engine.run(&mut world, 100).unwrap();
    assert_eq!(ran, 100);
    assert!(world.is_viable());

    let by_species: u64 = world
        .species()
        .iter()
        .map(|(id, _)| world.census().count(id))
        .sum();
    assert_eq!(by_species, world.census().total(), "census components add up");
}
