use std::collections::HashSet;
use std::path::PathBuf;

use savanna::engine::{EngineBuilder, EngineSettings};
use savanna::field::Location;
use savanna::scenario::ScenarioLoader;
use savanna::species::Category;
use savanna::World;

fn build_engine(name: &str, seed: u64) -> savanna::Engine {
    EngineBuilder::standard(EngineSettings {
        scenario_name: name.into(),
        seed,
        snapshot_interval_ticks: 0,
        snapshot_dir: PathBuf::from("snapshots_invariant_tests"),
    })
    .build()
}

/// Every cell holds at most one animal and one plant, every slot points at
/// an alive entity standing on that cell, and every registered entity is
/// backed by its slot.
fn check_consistency(world: &World) {
    let mut seen_animals = HashSet::new();
    let mut seen_plants = HashSet::new();
    for row in 0..world.field().depth() {
        for col in 0..world.field().width() {
            let loc = Location::new(row, col);
            if let Some(id) = world.field().animal_at(loc) {
                assert!(seen_animals.insert(id), "animal {:?} occupies two cells", id);
                let entity = world.entity(id).expect("slot points at a registered entity");
                assert!(entity.alive);
                assert_ne!(entity.category, Category::Plant);
                assert_eq!(entity.location, Some(loc));
            }
            if let Some(id) = world.field().plant_at(loc) {
                assert!(seen_plants.insert(id), "plant {:?} occupies two cells", id);
                let entity = world.entity(id).expect("slot points at a registered entity");
                assert!(entity.alive);
                assert_eq!(entity.category, Category::Plant);
                assert_eq!(entity.location, Some(loc));
            }
        }
    }

    let registry = world.entity_ids();
    assert_eq!(registry.len() as u64, world.census().total());
    for id in registry {
        let entity = world.entity(id).expect("registry entries are registered");
        assert!(entity.alive, "registry holds only the living after a tick");
        let loc = entity.location.expect("alive entities have a location");
        let slot = match entity.category {
            Category::Plant => world.field().plant_at(loc),
            _ => world.field().animal_at(loc),
        };
        assert_eq!(slot, Some(id), "entity and field disagree about {:?}", id);
    }
}

#[test]
fn grid_exclusivity_holds_over_a_long_randomized_run() {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/watering_hole.yaml")
        .unwrap();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.seed);

    check_consistency(&world);
    for _ in 0..300 {
        engine.step(&mut world).unwrap();
        check_consistency(&world);
    }
}

#[test]
fn the_default_savanna_keeps_its_books_straight() {
    let scenario = savanna::Scenario::savanna();
    let mut world = scenario.build_world().unwrap();
    let mut engine = build_engine(&scenario.name, scenario.seed);

    engine.run(&mut world, 50).unwrap();
    check_consistency(&world);
    assert!(world.is_viable());
}
