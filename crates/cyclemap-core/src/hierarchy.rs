use crate::{ReleaseItem, RoadmapItem};
use serde::{Deserialize, Serialize};

/// Effort and completion counters for a set of release items.
///
/// Week counters are raw sums (rounded to two decimals); the percentage
/// fields are always derived from the counters of the same level, never
/// averaged across children.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMetrics {
    pub weeks: f64,
    pub weeks_done: f64,
    pub weeks_in_progress: f64,
    pub weeks_todo: f64,
    pub weeks_not_to_do: f64,
    pub weeks_cancelled: f64,
    pub weeks_postponed: f64,
    pub item_count: usize,
    pub item_done_count: usize,
    pub progress: u8,
    pub progress_with_in_progress: u8,
    pub progress_by_items: u8,
    pub percentage_not_to_do: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapItemWithProgress {
    #[serde(flatten)]
    pub item: RoadmapItem,
    pub release_items: Vec<ReleaseItem>,
    pub progress: ProgressMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiativeWithProgress {
    pub id: String,
    pub name: String,
    pub roadmap_items: Vec<RoadmapItemWithProgress>,
    pub progress: ProgressMetrics,
}

impl InitiativeWithProgress {
    pub fn release_items(&self) -> impl Iterator<Item = &ReleaseItem> {
        self.roadmap_items
            .iter()
            .flat_map(|roadmap_item| roadmap_item.release_items.iter())
    }
}

/// Initiative → roadmap item → release item hierarchy, largest effort first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedCycleData {
    pub initiatives: Vec<InitiativeWithProgress>,
}

impl NestedCycleData {
    pub fn is_empty(&self) -> bool {
        self.initiatives.is_empty()
    }

    pub fn roadmap_items(&self) -> impl Iterator<Item = &RoadmapItemWithProgress> {
        self.initiatives
            .iter()
            .flat_map(|initiative| initiative.roadmap_items.iter())
    }

    pub fn release_items(&self) -> impl Iterator<Item = &ReleaseItem> {
        self.roadmap_items()
            .flat_map(|roadmap_item| roadmap_item.release_items.iter())
    }

    pub fn roadmap_item_count(&self) -> usize {
        self.roadmap_items().count()
    }

    pub fn release_item_count(&self) -> usize {
        self.release_items().count()
    }
}
