use crate::{CycleDataSource, CycleMapError, RawCycleData, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a tracker snapshot exported as JSON.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    label: String,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("json:{}", path.display());
        Self { path, label }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CycleDataSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch(&self) -> Result<RawCycleData> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            CycleMapError::Source(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let raw = RawCycleData::from_json_str(&content)?;
        debug!(
            source = %self.label,
            cycles = raw.cycles.len(),
            initiatives = raw.initiatives.len(),
            roadmap_items = raw.roadmap_items.len(),
            release_items = raw.release_items.len(),
            "Fetched snapshot"
        );
        Ok(raw)
    }
}

/// In-memory record set.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    data: RawCycleData,
}

impl StaticSource {
    pub fn new(data: RawCycleData) -> Self {
        Self { data }
    }
}

impl CycleDataSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self) -> Result<RawCycleData> {
        Ok(self.data.clone())
    }
}
