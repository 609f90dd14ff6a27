use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::world::{World, WorldSnapshot};

/// Writes the render surface to disk at a fixed tick interval, one JSON
/// file per snapshot under `<dir>/<scenario>/tick_NNNNNN.json`. An interval
/// of zero disables writing.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval_ticks: u64,
}

#[derive(Serialize)]
struct SnapshotEnvelope<'a> {
    written_at: String,
    #[serde(flatten)]
    world: &'a WorldSnapshot,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval_ticks: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval_ticks,
        }
    }

    pub fn maybe_write(&self, world: &World, scenario: &str) -> Result<Option<PathBuf>> {
        let tick = world.tick();
        if self.interval_ticks == 0 || tick == 0 || tick % self.interval_ticks != 0 {
            return Ok(None);
        }
        self.write(world, scenario).map(Some)
    }

    pub fn write(&self, world: &World, scenario: &str) -> Result<PathBuf> {
        let snapshot = world.render_snapshot(scenario);
        let envelope = SnapshotEnvelope {
            written_at: chrono::Utc::now().to_rfc3339(),
            world: &snapshot,
        };
        let dir = self.dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        let path = dir.join(format!("tick_{:06}.json", world.tick()));
        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    #[test]
    fn interval_gates_writes() {
        let scenario = Scenario::savanna();
        let mut world = scenario.build_world().unwrap();
        let temp = tempfile::tempdir().unwrap();

        let disabled = SnapshotWriter::new(temp.path(), 0);
        assert!(disabled.maybe_write(&world, "savanna").unwrap().is_none());

        let writer = SnapshotWriter::new(temp.path(), 2);
        assert!(writer.maybe_write(&world, "savanna").unwrap().is_none());
        world.advance_tick();
        assert!(writer.maybe_write(&world, "savanna").unwrap().is_none());
        world.advance_tick();
        let path = writer
            .maybe_write(&world, "savanna")
            .unwrap()
            .expect("tick 2 matches the interval");
        assert!(path.ends_with("savanna/tick_000002.json"));
        let data = fs::read_to_string(path).unwrap();
        assert!(data.contains("\"scenario\": \"savanna\""));
    }
}
