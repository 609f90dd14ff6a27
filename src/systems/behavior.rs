use anyhow::{bail, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::engine::{System, SystemContext};
use crate::entity::{Entity, EntitySeed};
use crate::field::Location;
use crate::species::{Activity, Category, SpeciesTable, MAX_SICK_TICKS};
use crate::world::{Cohort, World};

/// Runs every live entity's act policy once per tick, in registry order.
///
/// There is no snapshot isolation: a kill or move made by one entity is
/// visible to every entity acting after it in the same tick. Newborns go to
/// the nursery and start acting next tick.
pub struct BehaviorSystem;

impl BehaviorSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BehaviorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BehaviorSystem {
    fn name(&self) -> &'static str {
        "behavior"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut ChaCha8Rng) -> Result<()> {
        let species = world.species().clone();
        for id in world.entity_ids() {
            let Some(entity) = world.entity(id) else {
                continue;
            };
            // Eaten earlier this tick.
            if !entity.alive {
                continue;
            }
            match entity.category {
                Category::Plant => plant_act(world, &species, entity, rng),
                _ => animal_act(world, &species, entity, ctx.tick, rng)?,
            }
        }
        Ok(())
    }
}

/// Plants only spread. The chance rises near water and while it rains; the
/// seedlings take adjacent land cells that hold no plant yet.
fn plant_act(world: &mut World, species: &SpeciesTable, plant: Entity, rng: &mut impl Rng) {
    let policy = species.policy(plant.species);
    let Some(origin) = plant.location else {
        return;
    };
    let Some(spread) = policy.spread else {
        return;
    };
    let mut probability = spread.base;
    if world.field().is_water_near(origin) {
        probability += spread.water_bonus;
    }
    if world.field().is_raining() {
        probability += spread.rain_bonus;
    }
    if !rng.gen_bool(probability.clamp(0.0, 1.0)) {
        return;
    }
    let births = rng.gen_range(1..=policy.max_litter_size) as usize;
    let sites = world.field().plantable_adjacent(origin, rng);
    for site in sites.into_iter().take(births) {
        let seed = EntitySeed::newborn(plant.species, Category::Plant, false, 0);
        world.spawn(seed, site, Cohort::Newborn);
    }
}

/// One animal's turn: lifecycle clocks, breeding, infection, then the
/// day/night-gated feed-or-move step.
fn animal_act(
    world: &mut World,
    species: &SpeciesTable,
    mut entity: Entity,
    tick: u64,
    rng: &mut impl Rng,
) -> Result<()> {
    let policy = species.policy(entity.species);

    // The three clocks run every tick, asleep or not.
    entity.age += 1;
    if entity.age > policy.max_age {
        world.update(entity);
        world.kill(entity.id);
        return Ok(());
    }
    entity.food -= 1;
    if entity.food <= 0 {
        world.update(entity);
        world.kill(entity.id);
        return Ok(());
    }
    if entity.sick {
        entity.sick_ticks += 1;
        if entity.sick_ticks > MAX_SICK_TICKS {
            world.update(entity);
            world.kill(entity.id);
            return Ok(());
        }
    }
    world.update(entity);

    give_birth(world, species, &entity, rng);

    if !entity.sick {
        check_infection(world, policy.infection_probability, &mut entity, rng);
        world.update(entity);
    }

    let daytime = world.field().is_daytime(tick);
    let active = match policy.activity {
        Activity::Diurnal => daytime,
        Activity::Nocturnal => !daytime,
    };
    if !active {
        return Ok(());
    }

    let destination = match find_food(world, species, &mut entity, rng)? {
        Some(found) => Some(found),
        None => {
            let origin = entity.location.expect("live entity has a location");
            world
                .field()
                .free_habitat_adjacent(origin, policy.habitat, rng)
                .into_iter()
                .next()
        }
    };
    world.update(entity);
    match destination {
        Some(loc) => world.relocate(entity.id, loc),
        // Overcrowding.
        None => world.kill(entity.id),
    }
    Ok(())
}

/// Breeding-age females roll once per tick. Species with `mate_required`
/// first need an alive male of their kind on an adjacent cell. The litter
/// takes free adjacent cells of the parent's habitat, as many as are left.
fn give_birth(world: &mut World, species: &SpeciesTable, parent: &Entity, rng: &mut impl Rng) {
    let policy = species.policy(parent.species);
    if parent.male || parent.age < policy.breeding_age {
        return;
    }
    let Some(origin) = parent.location else {
        return;
    };
    if policy.mate_required && !mate_nearby(world, parent, origin, rng) {
        return;
    }
    if rng.gen::<f64>() > policy.breeding_probability {
        return;
    }
    let births = rng.gen_range(1..=policy.max_litter_size) as usize;
    let sites = world.field().free_habitat_adjacent(origin, policy.habitat, rng);
    for site in sites.into_iter().take(births) {
        let seed = EntitySeed::newborn(
            parent.species,
            parent.category,
            rng.gen(),
            policy.newborn_food,
        );
        world.spawn(seed, site, Cohort::Newborn);
    }
}

fn mate_nearby(world: &World, parent: &Entity, origin: Location, rng: &mut impl Rng) -> bool {
    for loc in world.field().adjacent_locations(origin, rng) {
        let Some(other_id) = world.field().animal_at(loc) else {
            continue;
        };
        let Some(other) = world.entity(other_id) else {
            continue;
        };
        if other.alive && other.species == parent.species && other.male {
            return true;
        }
    }
    false
}

/// One roll against the first alive sick neighbor, then stop. The
/// probability belongs to the susceptible animal, not the carrier.
fn check_infection(world: &World, probability: f64, entity: &mut Entity, rng: &mut impl Rng) {
    let Some(origin) = entity.location else {
        return;
    };
    for loc in world.field().adjacent_locations(origin, rng) {
        let Some(other_id) = world.field().animal_at(loc) else {
            continue;
        };
        let Some(other) = world.entity(other_id) else {
            continue;
        };
        if other.alive && other.sick {
            if rng.gen::<f64>() < probability {
                entity.sick = true;
            }
            return;
        }
    }
}

/// Scan the shuffled neighbors for the first edible occupant. On a hit the
/// food dies, the eater's food level rises by the diet value, and the
/// vacated cell becomes the eater's destination.
///
/// A neighbor of an edible category that is missing from the diet table is
/// a misconfigured policy and fails loudly rather than being skipped.
fn find_food(
    world: &mut World,
    species: &SpeciesTable,
    entity: &mut Entity,
    rng: &mut impl Rng,
) -> Result<Option<Location>> {
    let policy = species.policy(entity.species);
    if entity.food > policy.max_food {
        return Ok(None);
    }
    let Some(origin) = entity.location else {
        return Ok(None);
    };
    for loc in world.field().adjacent_locations(origin, rng) {
        if policy.category.hunts() {
            if let Some(prey) = world.field().animal_at(loc).and_then(|id| world.entity(id)) {
                if prey.alive && prey.category == Category::Herbivore {
                    let Some(value) = species.food_value(entity.species, prey.species) else {
                        bail!(
                            "{} cannot eat {}",
                            policy.name,
                            species.policy(prey.species).name
                        );
                    };
                    world.kill(prey.id);
                    entity.food += value;
                    return Ok(Some(loc));
                }
            }
        }
        if policy.category.grazes() {
            if let Some(plant) = world.field().plant_at(loc).and_then(|id| world.entity(id)) {
                if plant.alive {
                    // Grazing contact can pass sickness on even when the
                    // plant ends up not being eaten.
                    if !entity.sick
                        && policy.grazing_infection > 0.0
                        && rng.gen::<f64>() < policy.grazing_infection
                    {
                        entity.sick = true;
                    }
                    if world.field().animal_at(loc).is_none() {
                        let Some(value) = species.food_value(entity.species, plant.species) else {
                            bail!(
                                "{} cannot eat {}",
                                policy.name,
                                species.policy(plant.species).name
                            );
                        };
                        world.kill(plant.id);
                        entity.food += value;
                        return Ok(Some(loc));
                    }
                }
            }
        }
    }
    Ok(None)
}
