use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::field::{Field, Location, Terrain};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub base_probability: f64,
    pub water_weight: f64,
    pub land_weight: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            base_probability: 0.1,
            water_weight: 0.15,
            land_weight: 0.01,
        }
    }
}

/// Assign land or water to every cell in one row-major sweep.
///
/// Each cell's water probability is a linear function of the terrain already
/// assigned next to it: row 0 samples the cell to its left, later rows the
/// up-to-3 cells directly above. The sweep never reads a cell that has not
/// been assigned yet, which is what makes water cluster into bodies without
/// a smoothing pass.
pub fn generate(field: &mut Field, settings: TerrainSettings, rng: &mut impl Rng) {
    for row in 0..field.depth() {
        for col in 0..field.width() {
            let loc = Location::new(row, col);
            // The raw formula can leave [0, 1] at extremes; clamp before
            // sampling rather than relying on the comparison saturating.
            let probability = water_probability(field, settings, loc).clamp(0.0, 1.0);
            let terrain = if rng.gen_bool(probability) {
                Terrain::Water
            } else {
                Terrain::Land
            };
            field.set_terrain(loc, terrain);
        }
    }
}

fn water_probability(field: &Field, settings: TerrainSettings, loc: Location) -> f64 {
    if loc.row == 0 && loc.col == 0 {
        return settings.base_probability;
    }
    let mut water = 0;
    let mut land = 0;
    let mut tally = |terrain: Terrain| match terrain {
        Terrain::Water => water += 1,
        Terrain::Land => land += 1,
    };
    if loc.row == 0 {
        tally(field.terrain_at(Location::new(0, loc.col - 1)));
    } else {
        let col = loc.col as i64;
        for next_col in col - 1..=col + 1 {
            if next_col >= 0 && next_col < field.width() as i64 {
                tally(field.terrain_at(Location::new(loc.row - 1, next_col as u32)));
            }
        }
    }
    settings.base_probability + settings.water_weight * f64::from(water)
        - settings.land_weight * f64::from(land)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSettings;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn field(depth: u32, width: u32) -> Field {
        Field::new(FieldSettings {
            depth,
            width,
            ..FieldSettings::default()
        })
    }

    #[test]
    fn corner_cell_uses_the_base_probability() {
        let field = field(4, 4);
        let settings = TerrainSettings::default();
        let p = water_probability(&field, settings, Location::new(0, 0));
        assert_eq!(p, settings.base_probability);
    }

    #[test]
    fn probability_is_clamped_before_sampling() {
        // An out-of-range base would make gen_bool panic without the clamp.
        let mut high = field(6, 6);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        generate(
            &mut high,
            TerrainSettings {
                base_probability: 5.0,
                ..TerrainSettings::default()
            },
            &mut rng,
        );
        for row in 0..6 {
            for col in 0..6 {
                assert_eq!(high.terrain_at(Location::new(row, col)), Terrain::Water);
            }
        }

        let mut low = field(6, 6);
        generate(
            &mut low,
            TerrainSettings {
                base_probability: -5.0,
                ..TerrainSettings::default()
            },
            &mut rng,
        );
        for row in 0..6 {
            for col in 0..6 {
                assert_eq!(low.terrain_at(Location::new(row, col)), Terrain::Land);
            }
        }
    }

    #[test]
    fn row_zero_counts_only_the_left_neighbor() {
        let mut f = field(4, 4);
        let settings = TerrainSettings::default();
        f.set_terrain(Location::new(0, 0), Terrain::Water);
        let p = water_probability(&f, settings, Location::new(0, 1));
        assert_eq!(p, settings.base_probability + settings.water_weight);
    }

    #[test]
    fn later_rows_count_the_three_cells_above() {
        let mut f = field(4, 4);
        let settings = TerrainSettings::default();
        f.set_terrain(Location::new(0, 0), Terrain::Water);
        f.set_terrain(Location::new(0, 1), Terrain::Water);
        f.set_terrain(Location::new(0, 2), Terrain::Land);
        let p = water_probability(&f, settings, Location::new(1, 1));
        assert_eq!(
            p,
            settings.base_probability + 2.0 * settings.water_weight - settings.land_weight
        );
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let settings = TerrainSettings::default();
        let mut a = field(12, 12);
        let mut b = field(12, 12);
        generate(&mut a, settings, &mut ChaCha8Rng::seed_from_u64(9));
        generate(&mut b, settings, &mut ChaCha8Rng::seed_from_u64(9));
        for row in 0..12 {
            for col in 0..12 {
                let loc = Location::new(row, col);
                assert_eq!(a.terrain_at(loc), b.terrain_at(loc));
            }
        }
    }
}
