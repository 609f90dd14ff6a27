use serde::{Deserialize, Serialize};

use crate::field::Location;
use crate::species::{Category, SpeciesId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Mutable lifecycle state of one creature or plant. Species parameters live
/// in the shared policy table; this record holds only what changes per tick.
///
/// An entity is alive iff `alive` is set and `location` points at the cell
/// whose slot references it. `World::kill` maintains both sides in one step.
#[derive(Debug, Clone, Copy)]
pub struct Entity {
    pub id: EntityId,
    pub species: SpeciesId,
    pub category: Category,
    pub alive: bool,
    pub male: bool,
    pub age: u32,
    pub food: i32,
    pub sick: bool,
    pub sick_ticks: u32,
    pub location: Option<Location>,
}

/// Initial state for an entity about to be placed on the field. The world
/// assigns the id and location at spawn time.
#[derive(Debug, Clone, Copy)]
pub struct EntitySeed {
    pub species: SpeciesId,
    pub category: Category,
    pub male: bool,
    pub age: u32,
    pub food: i32,
    pub sick: bool,
    pub sick_ticks: u32,
}

impl EntitySeed {
    /// A healthy newborn: age zero, the species' starting food level.
    pub fn newborn(species: SpeciesId, category: Category, male: bool, food: i32) -> Self {
        Self {
            species,
            category,
            male,
            age: 0,
            food,
            sick: false,
            sick_ticks: 0,
        }
    }
}
