use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::field::{Field, FieldSettings, Terrain};
use crate::rng::RngManager;
use crate::species::{Activity, Category, SpeciesPolicy, SpeciesTable, SpreadPolicy};
use crate::terrain::TerrainSettings;
use crate::world::{PopulateSettings, World};

pub const DEFAULT_DEPTH: u32 = 80;
pub const DEFAULT_WIDTH: u32 = 120;

const DAY: u32 = 1440;
const GRASS_FOOD: i32 = DAY as i32 / 10;
const ZEBRA_FOOD: i32 = DAY as i32 / 2;
const ANTELOPE_FOOD: i32 = DAY as i32 * 3 / 4;
const GIRAFFE_FOOD: i32 = DAY as i32;

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_depth() -> i64 {
    DEFAULT_DEPTH as i64
}

fn default_width() -> i64 {
    DEFAULT_WIDTH as i64
}

fn default_ticks_per_day() -> u64 {
    DAY as u64
}

fn default_daytime_fraction() -> f64 {
    0.65
}

fn default_rain_probability() -> f64 {
    0.2
}

fn default_max_rain_ticks() -> u32 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub terrain: TerrainSettings,
    #[serde(default)]
    pub population: PopulateSettings,
    #[serde(default = "default_species")]
    pub species: Vec<SpeciesConfig>,
}

/// Grid dimensions stay signed so a scenario can hand in nonsense; the
/// builder recovers with the defaults instead of failing the run.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_depth")]
    pub depth: i64,
    #[serde(default = "default_width")]
    pub width: i64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            width: default_width(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_ticks_per_day")]
    pub ticks_per_day: u64,
    #[serde(default = "default_daytime_fraction")]
    pub daytime_fraction: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ticks_per_day: default_ticks_per_day(),
            daytime_fraction: default_daytime_fraction(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_rain_probability")]
    pub rain_probability: f64,
    #[serde(default = "default_max_rain_ticks")]
    pub max_rain_ticks: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            rain_probability: default_rain_probability(),
            max_rain_ticks: default_max_rain_ticks(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeciesConfig {
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
    pub max_food: i32,
    pub newborn_food: i32,
    pub infection_probability: f64,
    pub grazing_infection: f64,
    pub diet: BTreeMap<String, i32>,
    pub spread: Option<SpreadPolicy>,
}

impl Default for SpeciesConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: Category::Herbivore,
            habitat: Terrain::Land,
            activity: Activity::Diurnal,
            creation_probability: 0.0,
            breeding_age: 0,
            max_age: 0,
            breeding_probability: 0.0,
            max_litter_size: 1,
            mate_required: false,
            max_food: 0,
            newborn_food: 0,
            infection_probability: 0.0,
            grazing_infection: 0.0,
            diet: BTreeMap::new(),
            spread: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario must define at least one species")]
    NoSpecies,
    #[error("species at index {0} has no name")]
    UnnamedSpecies(usize),
    #[error("species '{0}' defined more than once")]
    DuplicateSpecies(String),
    #[error("species '{eater}' lists unknown diet entry '{eaten}'")]
    UnknownDietSpecies { eater: String, eaten: String },
    #[error("species '{species}': {field} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange {
        species: String,
        field: &'static str,
        value: f64,
    },
    #[error("species '{0}': max_litter_size must be at least 1")]
    EmptyLitter(String),
    #[error("species '{0}': animals need max_age, max_food and newborn_food above zero")]
    IncompleteAnimal(String),
    #[error("species '{0}': plant species need a spread policy")]
    MissingSpread(String),
    #[error("clock: ticks_per_day must be at least 1")]
    BadTicksPerDay,
    #[error("clock: daytime_fraction must be within (0, 1], got {0}")]
    BadDaytimeFraction(f64),
    #[error("weather: rain_probability must be within [0, 1], got {0}")]
    BadRainProbability(f64),
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// The built-in default world: the full savanna species mix on an
    /// 80x120 grid.
    pub fn savanna() -> Self {
        Self {
            name: "savanna".to_string(),
            description: Some("Closed savanna ecosystem with the default species mix".to_string()),
            seed: 42,
            ticks: None,
            snapshot_interval_ticks: default_snapshot_interval_ticks(),
            grid: GridConfig::default(),
            clock: ClockConfig::default(),
            weather: WeatherConfig::default(),
            terrain: TerrainSettings::default(),
            population: PopulateSettings::default(),
            species: default_species(),
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.clock.ticks_per_day == 0 {
            return Err(ScenarioError::BadTicksPerDay);
        }
        if !(self.clock.daytime_fraction > 0.0 && self.clock.daytime_fraction <= 1.0) {
            return Err(ScenarioError::BadDaytimeFraction(self.clock.daytime_fraction));
        }
        if !(0.0..=1.0).contains(&self.weather.rain_probability) {
            return Err(ScenarioError::BadRainProbability(
                self.weather.rain_probability,
            ));
        }
        if self.species.is_empty() {
            return Err(ScenarioError::NoSpecies);
        }

        let mut known = Vec::new();
        for (index, species) in self.species.iter().enumerate() {
            if species.name.is_empty() {
                return Err(ScenarioError::UnnamedSpecies(index));
            }
            if known.contains(&species.name.as_str()) {
                return Err(ScenarioError::DuplicateSpecies(species.name.clone()));
            }
            known.push(species.name.as_str());
        }

        for species in &self.species {
            let probabilities = [
                ("creation_probability", species.creation_probability),
                ("breeding_probability", species.breeding_probability),
                ("infection_probability", species.infection_probability),
                ("grazing_infection", species.grazing_infection),
            ];
            for (field, value) in probabilities {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ScenarioError::ProbabilityOutOfRange {
                        species: species.name.clone(),
                        field,
                        value,
                    });
                }
            }
            if species.max_litter_size == 0 {
                return Err(ScenarioError::EmptyLitter(species.name.clone()));
            }
            match species.category {
                Category::Plant => {
                    if species.spread.is_none() {
                        return Err(ScenarioError::MissingSpread(species.name.clone()));
                    }
                }
                _ => {
                    if species.max_age == 0 || species.max_food <= 0 || species.newborn_food <= 0 {
                        return Err(ScenarioError::IncompleteAnimal(species.name.clone()));
                    }
                }
            }
            for eaten in species.diet.keys() {
                if !known.contains(&eaten.as_str()) {
                    return Err(ScenarioError::UnknownDietSpecies {
                        eater: species.name.clone(),
                        eaten: eaten.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Construct and seed a world from this scenario. Terrain and founders
    /// are drawn from rng streams derived from the scenario seed, so the
    /// same scenario always builds the same world.
    pub fn build_world(&self) -> Result<World> {
        self.validate()?;
        let (depth, width) = self.dimensions();
        let field = Field::new(FieldSettings {
            depth,
            width,
            ticks_per_day: self.clock.ticks_per_day,
            daytime_fraction: self.clock.daytime_fraction,
            rain_probability: self.weather.rain_probability,
            max_rain_ticks: self.weather.max_rain_ticks,
        });
        let mut world = World::new(field, self.species_table(), self.terrain, self.population);
        let mut rng = RngManager::new(self.seed);
        world.regenerate_terrain(rng.stream("terrain"));
        world.populate(rng.stream("populate"));
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(1000)
    }

    fn dimensions(&self) -> (u32, u32) {
        if self.grid.depth <= 0 || self.grid.width <= 0 {
            tracing::warn!(
                depth = self.grid.depth,
                width = self.grid.width,
                "non-positive grid dimensions, using defaults"
            );
            (DEFAULT_DEPTH, DEFAULT_WIDTH)
        } else {
            (self.grid.depth as u32, self.grid.width as u32)
        }
    }

    fn species_table(&self) -> SpeciesTable {
        let find = |name: &str| {
            self.species
                .iter()
                .position(|species| species.name == name)
                .expect("diet names are validated")
        };
        let mut policies = Vec::with_capacity(self.species.len());
        for config in &self.species {
            let mut diet = HashMap::new();
            for (eaten, value) in &config.diet {
                diet.insert(SpeciesTable::id_at(find(eaten)), *value);
            }
            policies.push(SpeciesPolicy {
                name: config.name.clone(),
                category: config.category,
                habitat: config.habitat,
                activity: config.activity,
                creation_probability: config.creation_probability,
                breeding_age: config.breeding_age,
                max_age: config.max_age,
                breeding_probability: config.breeding_probability,
                max_litter_size: config.max_litter_size,
                mate_required: config.mate_required,
                max_food: config.max_food,
                newborn_food: config.newborn_food,
                infection_probability: config.infection_probability,
                grazing_infection: config.grazing_infection,
                diet,
                spread: config.spread,
            });
        }
        SpeciesTable::new(policies)
    }
}

fn default_species() -> Vec<SpeciesConfig> {
    let prey_diet = BTreeMap::from([
        ("antelope".to_string(), ANTELOPE_FOOD),
        ("giraffe".to_string(), GIRAFFE_FOOD),
        ("zebra".to_string(), ZEBRA_FOOD),
    ]);
    let mut hippo_diet = prey_diet.clone();
    hippo_diet.insert("grass".to_string(), GRASS_FOOD);

    vec![
        SpeciesConfig {
            name: "grass".to_string(),
            category: Category::Plant,
            creation_probability: 0.08,
            max_litter_size: 5,
            spread: Some(SpreadPolicy::default()),
            ..SpeciesConfig::default()
        },
        SpeciesConfig {
            name: "antelope".to_string(),
            creation_probability: 0.08,
            breeding_age: DAY,
            max_age: 40 * DAY,
            breeding_probability: 0.6,
            max_litter_size: 2,
            mate_required: true,
            max_food: DAY as i32,
            newborn_food: GRASS_FOOD,
            infection_probability: 0.0001,
            grazing_infection: 0.08,
            diet: BTreeMap::from([("grass".to_string(), GRASS_FOOD)]),
            ..SpeciesConfig::default()
        },
        SpeciesConfig {
            name: "zebra".to_string(),
            creation_probability: 0.08,
            breeding_age: DAY,
            max_age: 40 * DAY,
            breeding_probability: 0.10,
            max_litter_size: 1,
            mate_required: true,
            max_food: DAY as i32,
            newborn_food: GRASS_FOOD,
            infection_probability: 0.002,
            grazing_infection: 0.08,
            diet: BTreeMap::from([("grass".to_string(), GRASS_FOOD)]),
            ..SpeciesConfig::default()
        },
        SpeciesConfig {
            name: "giraffe".to_string(),
            creation_probability: 0.04,
            breeding_age: 2 * DAY,
            max_age: 40 * DAY,
            breeding_probability: 0.15,
            max_litter_size: 2,
            mate_required: true,
            max_food: DAY as i32,
            newborn_food: GRASS_FOOD,
            infection_probability: 0.0006,
            diet: BTreeMap::from([("grass".to_string(), GRASS_FOOD)]),
            ..SpeciesConfig::default()
        },
        SpeciesConfig {
            name: "lion".to_string(),
            category: Category::Carnivore,
            activity: Activity::Nocturnal,
            creation_probability: 0.02,
            breeding_age: 15 * DAY,
            max_age: 150 * DAY,
            breeding_probability: 0.08,
            max_litter_size: 2,
            max_food: 2 * DAY as i32,
            newborn_food: ANTELOPE_FOOD,
            infection_probability: 0.07,
            diet: prey_diet.clone(),
            ..SpeciesConfig::default()
        },
        SpeciesConfig {
            name: "crocodile".to_string(),
            category: Category::Carnivore,
            habitat: Terrain::Water,
            creation_probability: 0.02,
            breeding_age: 2 * DAY,
            max_age: 40 * DAY,
            breeding_probability: 0.5,
            max_litter_size: 10,
            mate_required: true,
            max_food: 2 * DAY as i32,
            newborn_food: GIRAFFE_FOOD,
            infection_probability: 0.0015,
            diet: prey_diet,
            ..SpeciesConfig::default()
        },
        SpeciesConfig {
            name: "hippo".to_string(),
            category: Category::Omnivore,
            habitat: Terrain::Water,
            creation_probability: 0.01,
            breeding_age: 15 * DAY,
            max_age: 400 * DAY,
            breeding_probability: 0.05,
            max_litter_size: 1,
            max_food: 2 * DAY as i32,
            newborn_food: ANTELOPE_FOOD,
            infection_probability: 0.5,
            diet: hippo_diet,
            ..SpeciesConfig::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savanna_defaults_validate() {
        let scenario = Scenario::savanna();
        scenario.validate().unwrap();
        assert_eq!(scenario.species.len(), 7);
        assert_eq!(scenario.grid.depth, 80);
        assert_eq!(scenario.grid.width, 120);
    }

    #[test]
    fn yaml_overrides_fall_back_to_defaults() {
        let doc = r#"
name: tiny
seed: 9
grid:
  depth: 12
  width: 16
"#;
        let scenario: Scenario = serde_yaml::from_str(doc).unwrap();
        scenario.validate().unwrap();
        assert_eq!(scenario.grid.depth, 12);
        assert_eq!(scenario.clock.ticks_per_day, 1440);
        assert_eq!(scenario.species.len(), 7);
        assert_eq!(scenario.snapshot_interval_ticks, 30);
    }

    #[test]
    fn nonpositive_dimensions_use_defaults() {
        let mut scenario = Scenario::savanna();
        scenario.grid.depth = -5;
        scenario.grid.width = 0;
        let world = scenario.build_world().unwrap();
        assert_eq!(world.field().depth(), DEFAULT_DEPTH);
        assert_eq!(world.field().width(), DEFAULT_WIDTH);
    }

    #[test]
    fn duplicate_species_are_rejected() {
        let mut scenario = Scenario::savanna();
        let mut copy = scenario.species[1].clone();
        copy.diet = BTreeMap::new();
        scenario.species.push(copy);
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::DuplicateSpecies(name)) if name == "antelope"
        ));
    }

    #[test]
    fn unknown_diet_entries_are_rejected() {
        let mut scenario = Scenario::savanna();
        scenario.species[4]
            .diet
            .insert("unicorn".to_string(), 100);
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::UnknownDietSpecies { eater, eaten })
                if eater == "lion" && eaten == "unicorn"
        ));
    }

    #[test]
    fn out_of_range_probabilities_are_rejected() {
        let mut scenario = Scenario::savanna();
        scenario.species[1].breeding_probability = 1.5;
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::ProbabilityOutOfRange { field, .. })
                if field == "breeding_probability"
        ));
    }

    #[test]
    fn plants_require_a_spread_policy() {
        let mut scenario = Scenario::savanna();
        scenario.species[0].spread = None;
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::MissingSpread(name)) if name == "grass"
        ));
    }

    #[test]
    fn same_seed_builds_identical_worlds() {
        let scenario = Scenario::savanna();
        let a = scenario.build_world().unwrap();
        let b = scenario.build_world().unwrap();
        assert_eq!(a.census().total(), b.census().total());
        for (id, _) in a.species().iter() {
            assert_eq!(a.census().count(id), b.census().count(id));
        }
    }
}
