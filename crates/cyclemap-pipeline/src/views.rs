//! Read models for the two views.

use crate::filter::{apply_filters, filter_by_cycle, FilterMetadata, FilteredCycleData};
use crate::view_filters::ViewKind;
use cyclemap_core::{
    Cycle, CycleState, FilterCriteria, InitiativeWithProgress, NestedCycleData,
    RoadmapItemWithProgress,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Roadmap timeline: every cycle in order, plus the filtered hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    pub ordered_cycles: Vec<Cycle>,
    pub active_cycle: Option<Cycle>,
    pub initiatives: Vec<InitiativeWithProgress>,
    pub roadmap_items: Vec<RoadmapItemWithProgress>,
    pub metadata: FilterMetadata,
}

/// One cycle and the work scheduled in it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOverview {
    pub cycle: Option<Cycle>,
    pub initiatives: Vec<InitiativeWithProgress>,
    pub metadata: FilterMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "kebab-case")]
pub enum ViewProjection {
    Roadmap(TimelineView),
    CycleOverview(CycleOverview),
}

impl ViewProjection {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewProjection::Roadmap(_) => ViewKind::Roadmap,
            ViewProjection::CycleOverview(_) => ViewKind::CycleOverview,
        }
    }

    pub fn initiatives(&self) -> &[InitiativeWithProgress] {
        match self {
            ViewProjection::Roadmap(view) => &view.initiatives,
            ViewProjection::CycleOverview(view) => &view.initiatives,
        }
    }
}

/// Cycles by start date; undated cycles go last, ties break on name.
pub fn order_cycles(cycles: &[Cycle]) -> Vec<Cycle> {
    let mut ordered = cycles.to_vec();
    ordered.sort_by(|a, b| match (a.start, b.start) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
    ordered
}

/// The cycle a timeline should focus on: the first active cycle, else the
/// next future one, else the most recent.
pub fn select_active_cycle(ordered: &[Cycle]) -> Option<&Cycle> {
    ordered
        .iter()
        .find(|cycle| cycle.state == CycleState::Active)
        .or_else(|| {
            ordered
                .iter()
                .find(|cycle| cycle.state == CycleState::Future)
        })
        .or_else(|| ordered.last())
}

pub struct ViewProjector<'a> {
    data: &'a NestedCycleData,
    cycles: &'a [Cycle],
}

impl<'a> ViewProjector<'a> {
    pub fn new(data: &'a NestedCycleData, cycles: &'a [Cycle]) -> Self {
        Self { data, cycles }
    }

    pub fn project(&self, view: ViewKind, criteria: &FilterCriteria) -> ViewProjection {
        match view {
            ViewKind::Roadmap => ViewProjection::Roadmap(self.timeline(criteria)),
            ViewKind::CycleOverview => {
                ViewProjection::CycleOverview(self.cycle_overview(criteria))
            }
        }
    }

    pub fn timeline(&self, criteria: &FilterCriteria) -> TimelineView {
        let ordered_cycles = order_cycles(self.cycles);
        let active_cycle = select_active_cycle(&ordered_cycles).cloned();
        let FilteredCycleData { data, metadata } = apply_filters(self.data, criteria);
        let roadmap_items = data.roadmap_items().cloned().collect();

        TimelineView {
            ordered_cycles,
            active_cycle,
            initiatives: data.initiatives,
            roadmap_items,
            metadata,
        }
    }

    /// Overview of the cycle named by `criteria.cycle`. Without a cycle the
    /// overview is empty.
    pub fn cycle_overview(&self, criteria: &FilterCriteria) -> CycleOverview {
        let filtered = match &criteria.cycle {
            Some(_) => apply_filters(self.data, criteria),
            None => filter_by_cycle(self.data, None),
        };
        let cycle = criteria.cycle.as_ref().and_then(|selected| {
            self.cycles
                .iter()
                .find(|cycle| cycle.id == selected.id.trim())
                .cloned()
        });

        CycleOverview {
            cycle,
            initiatives: filtered.data.initiatives,
            metadata: filtered.metadata,
        }
    }
}
