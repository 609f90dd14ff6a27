use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntitySeed};
use crate::field::{Field, Location, Terrain};
use crate::species::{Category, SpeciesId, SpeciesTable, MAX_SICK_TICKS};
use crate::terrain::{self, TerrainSettings};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateSettings {
    /// Chance that a founder animal starts out sick.
    pub initial_sick_probability: f64,
}

impl Default for PopulateSettings {
    fn default() -> Self {
        Self {
            initial_sick_probability: 0.1,
        }
    }
}

/// Whether a spawned entity joins the acting registry now or at the next
/// tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cohort {
    /// Seeded at reset; acts from the first tick.
    Founder,
    /// Born mid-tick; occupies its cell immediately but only starts acting
    /// next tick, so the registry is never grown during iteration.
    Newborn,
}

#[derive(Debug, Clone, Default)]
pub struct Census {
    counts: Vec<u64>,
    total: u64,
}

impl Census {
    pub fn count(&self, species: SpeciesId) -> u64 {
        self.counts.get(species.raw()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub terrain: Terrain,
    pub animal: Option<String>,
    pub plant: bool,
}

/// The per-tick render surface consumed by external views: one entry per
/// cell in row-major order, plus population counts and weather.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub raining: bool,
    pub depth: u32,
    pub width: u32,
    pub population: u64,
    pub counts: BTreeMap<String, u64>,
    pub cells: Vec<CellSnapshot>,
}

/// Owns the field and the live-entity registry.
///
/// Registry iteration order is insertion order; entity ids are allocated
/// monotonically. All placement changes go through [`World::spawn`],
/// [`World::kill`] and [`World::relocate`], which keep an entity's stored
/// location and the field slots consistent in one step.
pub struct World {
    field: Field,
    species: SpeciesTable,
    terrain: TerrainSettings,
    populate: PopulateSettings,
    entities: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
    nursery: Vec<EntityId>,
    next_entity: u64,
    tick: u64,
    census: Census,
}

impl World {
    pub fn new(
        field: Field,
        species: SpeciesTable,
        terrain: TerrainSettings,
        populate: PopulateSettings,
    ) -> Self {
        let census = Census {
            counts: vec![0; species.len()],
            total: 0,
        };
        Self {
            field,
            species,
            terrain,
            populate,
            entities: HashMap::new(),
            order: Vec::new(),
            nursery: Vec::new(),
            next_entity: 0,
            tick: 0,
            census,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    pub fn census(&self) -> &Census {
        &self.census
    }

    /// At least one live entity remains. Finer thresholds are the
    /// consumer's call, not the engine's.
    pub fn is_viable(&self) -> bool {
        self.census.total > 0
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    /// Registry ids in acting order for the current tick.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.order.clone()
    }

    /// Write back a locally mutated copy of an entity.
    pub fn update(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn spawn(&mut self, seed: EntitySeed, loc: Location, cohort: Cohort) -> EntityId {
        let id = self.allocate();
        let entity = Entity {
            id,
            species: seed.species,
            category: seed.category,
            alive: true,
            male: seed.male,
            age: seed.age,
            food: seed.food,
            sick: seed.sick,
            sick_ticks: seed.sick_ticks,
            location: Some(loc),
        };
        match entity.category {
            Category::Plant => self.field.place_plant(id, loc),
            _ => self.field.place_animal(id, loc),
        }
        self.entities.insert(id, entity);
        match cohort {
            Cohort::Founder => self.order.push(id),
            Cohort::Newborn => self.nursery.push(id),
        }
        id
    }

    /// Mark an entity dead and release its cell slot. Irreversible.
    pub fn kill(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if !entity.alive {
            return;
        }
        entity.alive = false;
        let location = entity.location.take();
        let category = entity.category;
        if let Some(loc) = location {
            match category {
                Category::Plant => self.field.clear_plant(loc),
                _ => self.field.clear_animal(loc),
            }
        }
    }

    /// Move an entity to a new cell, clearing its old slot first.
    pub fn relocate(&mut self, id: EntityId, to: Location) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let from = entity.location.replace(to);
        let category = entity.category;
        match category {
            Category::Plant => {
                if let Some(loc) = from {
                    self.field.clear_plant(loc);
                }
                self.field.place_plant(id, to);
            }
            _ => {
                if let Some(loc) = from {
                    self.field.clear_animal(loc);
                }
                self.field.place_animal(id, to);
            }
        }
    }

    /// Promote this tick's newborns, drop dead entities from the registry,
    /// and refresh the census. Runs once per tick after all entities acted.
    /// Newborns merge first: one can be eaten in the very tick it was born.
    pub fn finish_tick(&mut self) {
        self.order.append(&mut self.nursery);
        let entities = &self.entities;
        self.order.retain(|id| entities[id].alive);
        self.entities.retain(|_, entity| entity.alive);
        self.refresh_census();
    }

    pub fn refresh_census(&mut self) {
        let mut counts = vec![0_u64; self.species.len()];
        let mut total = 0;
        for entity in self.entities.values() {
            if entity.alive {
                counts[entity.species.raw()] += 1;
                total += 1;
            }
        }
        self.census = Census { counts, total };
    }

    /// Remove every entity and occupant slot and zero the clock. Terrain is
    /// left for [`World::regenerate_terrain`].
    pub fn clear(&mut self) {
        self.entities.clear();
        self.order.clear();
        self.nursery.clear();
        self.field.clear_occupants();
        self.tick = 0;
        self.refresh_census();
    }

    pub fn regenerate_terrain(&mut self, rng: &mut impl Rng) {
        terrain::generate(&mut self.field, self.terrain, rng);
    }

    /// Seed the field cell by cell. Species are tried in table order on
    /// terrain they inhabit; the first creation-probability success claims
    /// the cell's animal slot. Plant species roll independently for the
    /// plant slot. Founders get a random age, partial food, and a chance of
    /// starting sick partway through the illness.
    pub fn populate(&mut self, rng: &mut impl Rng) {
        let species = self.species.clone();
        let sick_probability = self.populate.initial_sick_probability;
        for row in 0..self.field.depth() {
            for col in 0..self.field.width() {
                let loc = Location::new(row, col);
                let terrain = self.field.terrain_at(loc);
                for (id, policy) in species.iter() {
                    if policy.category == Category::Plant {
                        if terrain == Terrain::Land
                            && self.field.plant_at(loc).is_none()
                            && rng.gen_bool(policy.creation_probability)
                        {
                            let seed = EntitySeed::newborn(id, policy.category, false, 0);
                            self.spawn(seed, loc, Cohort::Founder);
                        }
                        continue;
                    }
                    if self.field.animal_at(loc).is_some() || policy.habitat != terrain {
                        continue;
                    }
                    if rng.gen_bool(policy.creation_probability) {
                        let mut seed = EntitySeed::newborn(
                            id,
                            policy.category,
                            rng.gen(),
                            rng.gen_range(1..=policy.newborn_food.max(1)),
                        );
                        seed.age = rng.gen_range(0..policy.max_age.max(1));
                        seed.sick = rng.gen_bool(sick_probability);
                        if seed.sick {
                            seed.sick_ticks = rng.gen_range(0..MAX_SICK_TICKS);
                        }
                        self.spawn(seed, loc, Cohort::Founder);
                    }
                }
            }
        }
        self.refresh_census();
    }

    pub fn render_snapshot(&self, scenario: &str) -> WorldSnapshot {
        let mut counts = BTreeMap::new();
        for (id, policy) in self.species.iter() {
            counts.insert(policy.name.clone(), self.census.count(id));
        }
        let mut cells = Vec::with_capacity((self.field.depth() * self.field.width()) as usize);
        for row in 0..self.field.depth() {
            for col in 0..self.field.width() {
                let loc = Location::new(row, col);
                let animal = self
                    .field
                    .animal_at(loc)
                    .and_then(|id| self.entities.get(&id))
                    .map(|entity| self.species.policy(entity.species).name.clone());
                cells.push(CellSnapshot {
                    terrain: self.field.terrain_at(loc),
                    animal,
                    plant: self.field.plant_at(loc).is_some(),
                });
            }
        }
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            raining: self.field.is_raining(),
            depth: self.field.depth(),
            width: self.field.width(),
            population: self.census.total(),
            counts,
            cells,
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;
        id
    }
}
