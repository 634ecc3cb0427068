use crate::filter::{apply_filters, FilteredCycleData};
use crate::options::FilterOptions;
use crate::structure::StructureBuilder;
use crate::view_filters::ViewFilterManager;
use crate::views::{ViewProjection, ViewProjector};
use cyclemap_core::{
    Cycle, CycleDataSource, FilterCriteria, NestedCycleData, PipelineConfig, RawCycleData, Result,
};
use rayon::prelude::*;
use tracing::{info, instrument};

/// Built hierarchy plus the cycles it was built with.
///
/// Filtering never mutates the base hierarchy; every filter call returns a
/// new tree, so one pipeline can serve many concurrent readers.
#[derive(Debug, Clone)]
pub struct CyclePipeline {
    builder: StructureBuilder,
    cycles: Vec<Cycle>,
    base: NestedCycleData,
}

impl CyclePipeline {
    pub fn new(raw: &RawCycleData, config: &PipelineConfig) -> Self {
        let builder = StructureBuilder::new(config);
        let base = builder.build(raw);
        Self {
            builder,
            cycles: raw.cycles.clone(),
            base,
        }
    }

    #[instrument(skip_all, fields(source = source.name()))]
    pub fn from_source(source: &dyn CycleDataSource, config: &PipelineConfig) -> Result<Self> {
        let raw = source.fetch()?;
        let pipeline = Self::new(&raw, config);
        info!(
            initiatives = pipeline.base.initiatives.len(),
            cycles = pipeline.cycles.len(),
            "Loaded cycle data"
        );
        Ok(pipeline)
    }

    /// Rebuild from a fresh snapshot.
    pub fn refresh(&mut self, raw: &RawCycleData) {
        self.base = self.builder.build(raw);
        self.cycles = raw.cycles.clone();
    }

    pub fn refresh_from(&mut self, source: &dyn CycleDataSource) -> Result<()> {
        let raw = source.fetch()?;
        self.refresh(&raw);
        Ok(())
    }

    pub fn base(&self) -> &NestedCycleData {
        &self.base
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn filtered(&self, criteria: &FilterCriteria) -> FilteredCycleData {
        apply_filters(&self.base, criteria)
    }

    /// Evaluate several criteria sets against the same base in parallel.
    /// Results come back in input order.
    pub fn filter_many(&self, criteria: &[FilterCriteria]) -> Vec<FilteredCycleData> {
        criteria
            .par_iter()
            .map(|criteria| apply_filters(&self.base, criteria))
            .collect()
    }

    /// Project the manager's current view with its active filters.
    pub fn project(&self, manager: &ViewFilterManager) -> ViewProjection {
        ViewProjector::new(&self.base, &self.cycles)
            .project(manager.current_view(), &manager.get_active_filters())
    }

    pub fn options(&self) -> FilterOptions {
        FilterOptions::collect(&self.base, &self.cycles)
    }
}
