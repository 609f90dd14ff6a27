use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::field::Terrain;

/// Sickness is fatal once an animal has carried it for this many ticks,
/// regardless of species.
pub const MAX_SICK_TICKS: u32 = 1000;

/// Index into the run's species table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(usize);

impl SpeciesId {
    pub fn raw(self) -> usize {
        self.0
    }
}

/// Broad behavioral class of an entity. Edibility checks compare these tags
/// by equality rather than narrowing on concrete species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Plant,
    Herbivore,
    Carnivore,
    Omnivore,
}

impl Category {
    /// Does this category take live animals as food?
    pub fn hunts(self) -> bool {
        matches!(self, Category::Carnivore | Category::Omnivore)
    }

    /// Does this category take plants as food?
    pub fn grazes(self) -> bool {
        matches!(self, Category::Herbivore | Category::Omnivore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    #[default]
    Diurnal,
    Nocturnal,
}

/// Reproduction parameters for plant species. Probability is evaluated per
/// tick as `base + water_bonus (water nearby) + rain_bonus (raining)`,
/// clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadPolicy {
    pub base: f64,
    pub water_bonus: f64,
    pub rain_bonus: f64,
}

impl Default for SpreadPolicy {
    fn default() -> Self {
        Self {
            base: 0.04,
            water_bonus: 0.10,
            rain_bonus: 0.10,
        }
    }
}

/// Immutable parameter bundle for one species. A single copy is shared by
/// every individual; adding a species to a run means adding one of these to
/// the table, never new lifecycle code.
#[derive(Debug, Clone)]
pub struct SpeciesPolicy {
    pub name: String,
    pub category: Category,
    pub habitat: Terrain,
    pub activity: Activity,
    pub creation_probability: f64,
    pub breeding_age: u32,
    pub max_age: u32,
    pub breeding_probability: f64,
    pub max_litter_size: u32,
    pub mate_required: bool,
    /// Above this food level the feeding scan is skipped for the tick.
    pub max_food: i32,
    pub newborn_food: i32,
    /// Chance of catching sickness from the first sick neighbor found.
    pub infection_probability: f64,
    /// Chance of turning sick on contact with a plant while grazing.
    pub grazing_infection: f64,
    /// Food granted per eaten species. A kill outside this table is a
    /// configuration error, not a zero.
    pub diet: HashMap<SpeciesId, i32>,
    /// Present for plant species only.
    pub spread: Option<SpreadPolicy>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    policies: Vec<SpeciesPolicy>,
}

impl SpeciesTable {
    pub fn new(policies: Vec<SpeciesPolicy>) -> Self {
        Self { policies }
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn policy(&self, id: SpeciesId) -> &SpeciesPolicy {
        &self.policies[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<SpeciesId> {
        self.policies
            .iter()
            .position(|p| p.name == name)
            .map(SpeciesId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &SpeciesPolicy)> {
        self.policies
            .iter()
            .enumerate()
            .map(|(index, policy)| (SpeciesId(index), policy))
    }

    pub fn food_value(&self, eater: SpeciesId, eaten: SpeciesId) -> Option<i32> {
        self.policy(eater).diet.get(&eaten).copied()
    }

    pub(crate) fn id_at(index: usize) -> SpeciesId {
        SpeciesId(index)
    }
}
