use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Water counts as "near" a cell within this Chebyshev distance.
const WATER_NEAR_RADIUS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: u32,
    pub col: u32,
}

impl Location {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Land,
    Water,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    terrain: Terrain,
    animal: Option<EntityId>,
    plant: Option<EntityId>,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSettings {
    pub depth: u32,
    pub width: u32,
    pub ticks_per_day: u64,
    pub daytime_fraction: f64,
    pub rain_probability: f64,
    pub max_rain_ticks: u32,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            depth: 80,
            width: 120,
            ticks_per_day: 1440,
            daytime_fraction: 0.65,
            rain_probability: 0.2,
            max_rain_ticks: 50,
        }
    }
}

/// Rectangular grid of cells, the single source of spatial truth.
///
/// Each cell carries a terrain tag plus two occupant slots, one animal and
/// one plant. Slots hold entity ids; the registry owns entity state. The
/// field also carries the global weather state and the day clock since both
/// are queried through spatial context.
pub struct Field {
    settings: FieldSettings,
    cells: Vec<Cell>,
    raining: bool,
    rain_ticks_left: u32,
}

impl Field {
    pub fn new(settings: FieldSettings) -> Self {
        let cells = vec![Cell::default(); (settings.depth * settings.width) as usize];
        Self {
            settings,
            cells,
            raining: false,
            rain_ticks_left: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.settings.depth
    }

    pub fn width(&self) -> u32 {
        self.settings.width
    }

    fn index(&self, loc: Location) -> usize {
        debug_assert!(loc.row < self.depth() && loc.col < self.width());
        (loc.row * self.width() + loc.col) as usize
    }

    pub fn terrain_at(&self, loc: Location) -> Terrain {
        self.cells[self.index(loc)].terrain
    }

    pub fn set_terrain(&mut self, loc: Location, terrain: Terrain) {
        let index = self.index(loc);
        self.cells[index].terrain = terrain;
    }

    pub fn animal_at(&self, loc: Location) -> Option<EntityId> {
        self.cells[self.index(loc)].animal
    }

    pub fn plant_at(&self, loc: Location) -> Option<EntityId> {
        self.cells[self.index(loc)].plant
    }

    /// Occupy the animal slot at `loc`. An existing occupant reference is
    /// overwritten; the caller must have killed it first or it becomes
    /// unreachable while still registered.
    pub fn place_animal(&mut self, id: EntityId, loc: Location) {
        let index = self.index(loc);
        self.cells[index].animal = Some(id);
    }

    /// Occupy the plant slot at `loc`. Same overwrite contract as
    /// [`Field::place_animal`].
    pub fn place_plant(&mut self, id: EntityId, loc: Location) {
        let index = self.index(loc);
        self.cells[index].plant = Some(id);
    }

    pub fn clear_animal(&mut self, loc: Location) {
        let index = self.index(loc);
        self.cells[index].animal = None;
    }

    pub fn clear_plant(&mut self, loc: Location) {
        let index = self.index(loc);
        self.cells[index].plant = None;
    }

    /// Empty every occupant slot, leaving terrain in place.
    pub fn clear_occupants(&mut self) {
        for cell in &mut self.cells {
            cell.animal = None;
            cell.plant = None;
        }
    }

    /// The up-to-8 in-bounds Moore neighbors of `loc`, freshly shuffled.
    ///
    /// The shuffle is load-bearing: every first-match scan (feeding,
    /// infection, birth sites) walks this list, so a fixed order would bias
    /// outcomes toward one direction.
    pub fn adjacent_locations(&self, loc: Location, rng: &mut impl Rng) -> Vec<Location> {
        let mut locations = Vec::with_capacity(8);
        let (row, col) = (loc.row as i64, loc.col as i64);
        for row_offset in -1..=1 {
            for col_offset in -1..=1 {
                if row_offset == 0 && col_offset == 0 {
                    continue;
                }
                let (next_row, next_col) = (row + row_offset, col + col_offset);
                if next_row >= 0
                    && next_row < self.depth() as i64
                    && next_col >= 0
                    && next_col < self.width() as i64
                {
                    locations.push(Location::new(next_row as u32, next_col as u32));
                }
            }
        }
        locations.shuffle(rng);
        locations
    }

    /// Shuffled adjacent cells whose animal slot is empty.
    pub fn free_adjacent(&self, loc: Location, rng: &mut impl Rng) -> Vec<Location> {
        let mut free = self.adjacent_locations(loc, rng);
        free.retain(|next| self.animal_at(*next).is_none());
        free
    }

    /// Shuffled adjacent cells with an empty animal slot on the given
    /// terrain. Covers both land movers and water movers.
    pub fn free_habitat_adjacent(
        &self,
        loc: Location,
        habitat: Terrain,
        rng: &mut impl Rng,
    ) -> Vec<Location> {
        let mut free = self.adjacent_locations(loc, rng);
        free.retain(|next| self.animal_at(*next).is_none() && self.terrain_at(*next) == habitat);
        free
    }

    /// Shuffled adjacent land cells not yet holding a plant. Used for plant
    /// spread; the animal slot is ignored since animals walk over plants.
    pub fn plantable_adjacent(&self, loc: Location, rng: &mut impl Rng) -> Vec<Location> {
        let mut free = self.adjacent_locations(loc, rng);
        free.retain(|next| {
            self.plant_at(*next).is_none() && self.terrain_at(*next) == Terrain::Land
        });
        free
    }

    /// True if any water cell lies within Chebyshev distance
    /// [`WATER_NEAR_RADIUS`] of `loc`.
    pub fn is_water_near(&self, loc: Location) -> bool {
        let (row, col) = (loc.row as i64, loc.col as i64);
        for next_row in row - WATER_NEAR_RADIUS..=row + WATER_NEAR_RADIUS {
            if next_row < 0 || next_row >= self.depth() as i64 {
                continue;
            }
            for next_col in col - WATER_NEAR_RADIUS..=col + WATER_NEAR_RADIUS {
                if next_col < 0 || next_col >= self.width() as i64 {
                    continue;
                }
                let next = Location::new(next_row as u32, next_col as u32);
                if self.terrain_at(next) == Terrain::Water {
                    return true;
                }
            }
        }
        false
    }

    /// The first `daytime_fraction` of every day is daylight.
    pub fn is_daytime(&self, tick: u64) -> bool {
        let ticks_per_day = self.settings.ticks_per_day;
        let daylight = (ticks_per_day as f64 * self.settings.daytime_fraction).floor() as u64;
        tick % ticks_per_day < daylight
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    /// Two-state rain process: while raining, count down to dry; while dry,
    /// start a shower with `rain_probability` and draw its duration.
    pub fn advance_weather(&mut self, rng: &mut impl Rng) {
        if self.raining {
            self.rain_ticks_left = self.rain_ticks_left.saturating_sub(1);
            self.raining = self.rain_ticks_left > 0;
        } else if rng.gen_bool(self.settings.rain_probability) {
            self.raining = true;
            self.rain_ticks_left = rng.gen_range(0..self.settings.max_rain_ticks.max(1));
        }
    }
}
