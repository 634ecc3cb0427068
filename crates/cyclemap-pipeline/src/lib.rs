pub mod filter;
pub mod options;
pub mod pipeline;
pub mod progress;
pub mod structure;
pub mod view_filters;
pub mod views;

pub use filter::{
    apply_filters, filter_by_cycle, filter_initiatives, FilterMetadata, FilteredCycleData,
    ReleaseItemFilter,
};
pub use options::FilterOptions;
pub use pipeline::CyclePipeline;
pub use progress::{aggregate_progress, calculate_progress, percentage, round_weeks};
pub use structure::StructureBuilder;
pub use view_filters::{
    FilterKey, FilterScope, FilterUpdate, ViewFilterCriteria, ViewFilterError, ViewFilterManager,
    ViewKind,
};
pub use views::{
    order_cycles, select_active_cycle, CycleOverview, TimelineView, ViewProjection, ViewProjector,
};
