//! Cascading filters over the initiative hierarchy.
//!
//! Release items are matched against every active criterion (AND across
//! criteria, OR across the values of one criterion). A roadmap item
//! survives while it keeps at least one release item, an initiative while it
//! keeps at least one roadmap item, and every survivor gets its metrics
//! recomputed from what survived.

use crate::progress::{aggregate_progress, calculate_progress};
use crate::structure::sort_by_weeks;
use cyclemap_core::{
    FilterCriteria, InitiativeWithProgress, NestedCycleData, ReleaseItem,
    RoadmapItemWithProgress, Selection,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMetadata {
    pub total_initiatives: usize,
    pub total_roadmap_items: usize,
    pub total_release_items: usize,
}

impl FilterMetadata {
    pub fn of(data: &NestedCycleData) -> Self {
        Self {
            total_initiatives: data.initiatives.len(),
            total_roadmap_items: data.roadmap_item_count(),
            total_release_items: data.release_item_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredCycleData {
    #[serde(flatten)]
    pub data: NestedCycleData,
    pub metadata: FilterMetadata,
}

impl FilteredCycleData {
    pub fn new(data: NestedCycleData) -> Self {
        let metadata = FilterMetadata::of(&data);
        Self { data, metadata }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn initiatives(&self) -> &[InitiativeWithProgress] {
        &self.data.initiatives
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Release-item criteria compiled once per filter call.
#[derive(Debug, Clone, Default)]
pub struct ReleaseItemFilter<'a> {
    area: Option<String>,
    stages: Option<HashSet<&'a str>>,
    assignees: Option<HashSet<&'a str>>,
    cycle: Option<&'a str>,
}

impl<'a> ReleaseItemFilter<'a> {
    pub fn from_criteria(criteria: &'a FilterCriteria) -> Self {
        Self {
            area: criteria.active_area().map(str::to_lowercase),
            stages: criteria
                .active_stages()
                .map(|ids| ids.into_iter().collect()),
            assignees: criteria
                .active_assignees()
                .map(|ids| ids.into_iter().collect()),
            cycle: criteria.cycle.as_ref().map(|cycle| cycle.id.trim()),
        }
    }

    pub fn is_inert(&self) -> bool {
        self.area.is_none()
            && self.stages.is_none()
            && self.assignees.is_none()
            && self.cycle.is_none()
    }

    pub fn matches(&self, item: &ReleaseItem) -> bool {
        if let Some(area) = &self.area {
            if !item
                .area_ids
                .iter()
                .any(|candidate| candidate.trim().to_lowercase() == *area)
            {
                return false;
            }
        }

        if let Some(stages) = &self.stages {
            match item.stage.as_deref() {
                Some(stage) if stages.contains(stage) => {}
                _ => return false,
            }
        }

        if let Some(assignees) = &self.assignees {
            match &item.assignee {
                Some(assignee) if assignees.contains(assignee.id.as_str()) => {}
                _ => return false,
            }
        }

        if let Some(cycle) = self.cycle {
            let in_cycle = item.cycle_id.as_deref() == Some(cycle)
                || item.cycle.as_ref().is_some_and(|c| c.id == cycle);
            if !in_cycle {
                return false;
            }
        }

        true
    }
}

/// A cycle selection that cannot scope anything: blank or the `"all"` sentinel.
fn is_unusable_cycle(cycle: &Selection) -> bool {
    cycle.is_blank() || cycle.is_all()
}

/// Apply `criteria` to `data`, returning a freshly built hierarchy.
///
/// The initiative criterion is applied first, at initiative level; the
/// release-item criteria are then cascaded bottom-up. Inert criteria leave
/// the hierarchy untouched.
pub fn apply_filters(data: &NestedCycleData, criteria: &FilterCriteria) -> FilteredCycleData {
    if let Some(cycle) = &criteria.cycle {
        if is_unusable_cycle(cycle) {
            warn!(
                cycle = %cycle.id,
                "Cycle filter requires a concrete cycle id; returning an empty result"
            );
            return FilteredCycleData::empty();
        }
    }

    let scoped = match criteria.active_initiatives() {
        Some(ids) => filter_initiatives(data, &ids),
        None => data.clone(),
    };

    let release_filter = ReleaseItemFilter::from_criteria(criteria);
    if release_filter.is_inert() {
        return FilteredCycleData::new(scoped);
    }

    let result = cascade(&scoped, &release_filter);
    debug!(
        initiatives = result.metadata.total_initiatives,
        roadmap_items = result.metadata.total_roadmap_items,
        release_items = result.metadata.total_release_items,
        "Applied filters"
    );
    result
}

/// Scope `data` to one cycle. A missing, blank or `"all"` cycle is a
/// caller error: it is logged and yields an empty result.
pub fn filter_by_cycle(data: &NestedCycleData, cycle: Option<&str>) -> FilteredCycleData {
    match cycle {
        Some(cycle) => apply_filters(data, &FilterCriteria::default().with_cycle(cycle)),
        None => {
            warn!("Cycle filter called without a cycle; returning an empty result");
            FilteredCycleData::empty()
        }
    }
}

/// Keep the initiatives whose id is selected. Surviving initiatives are
/// kept as they are; nothing below them changes.
pub fn filter_initiatives(data: &NestedCycleData, ids: &[&str]) -> NestedCycleData {
    let selected: HashSet<&str> = ids.iter().copied().collect();
    NestedCycleData {
        initiatives: data
            .initiatives
            .iter()
            .filter(|initiative| selected.contains(initiative.id.as_str()))
            .cloned()
            .collect(),
    }
}

fn cascade(data: &NestedCycleData, filter: &ReleaseItemFilter<'_>) -> FilteredCycleData {
    let mut initiatives: Vec<InitiativeWithProgress> = data
        .initiatives
        .iter()
        .filter_map(|initiative| filter_initiative(initiative, filter))
        .collect();
    sort_by_weeks(&mut initiatives);

    FilteredCycleData::new(NestedCycleData { initiatives })
}

fn filter_initiative(
    initiative: &InitiativeWithProgress,
    filter: &ReleaseItemFilter<'_>,
) -> Option<InitiativeWithProgress> {
    let roadmap_items: Vec<RoadmapItemWithProgress> = initiative
        .roadmap_items
        .iter()
        .filter_map(|roadmap_item| filter_roadmap_item(roadmap_item, filter))
        .collect();

    if roadmap_items.is_empty() {
        return None;
    }

    Some(InitiativeWithProgress {
        id: initiative.id.clone(),
        name: initiative.name.clone(),
        progress: aggregate_progress(roadmap_items.iter().map(|r| &r.progress)),
        roadmap_items,
    })
}

fn filter_roadmap_item(
    roadmap_item: &RoadmapItemWithProgress,
    filter: &ReleaseItemFilter<'_>,
) -> Option<RoadmapItemWithProgress> {
    let release_items: Vec<ReleaseItem> = roadmap_item
        .release_items
        .iter()
        .filter(|item| filter.matches(item))
        .cloned()
        .collect();

    if release_items.is_empty() {
        return None;
    }

    Some(RoadmapItemWithProgress {
        item: roadmap_item.item.clone(),
        progress: calculate_progress(&release_items),
        release_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclemap_core::{Assignee, CycleRef, ReleaseStatus};

    fn item() -> ReleaseItem {
        ReleaseItem::new("x", 1.0, ReleaseStatus::Todo)
            .with_areas(["Frontend", "Mobile"])
            .with_stage("pilot")
            .with_assignee(Assignee::new("u1", "Ada"))
            .with_cycle("c1")
    }

    #[test]
    fn test_area_matches_case_insensitively() {
        let criteria = FilterCriteria::default().with_area("FRONTEND");
        assert!(ReleaseItemFilter::from_criteria(&criteria).matches(&item()));

        let criteria = FilterCriteria::default().with_area("backend");
        assert!(!ReleaseItemFilter::from_criteria(&criteria).matches(&item()));
    }

    #[test]
    fn test_values_within_criterion_are_ored() {
        let criteria = FilterCriteria::default().with_stages(["scale", "pilot"]);
        assert!(ReleaseItemFilter::from_criteria(&criteria).matches(&item()));
    }

    #[test]
    fn test_criteria_are_anded() {
        let criteria = FilterCriteria::default()
            .with_stages(["pilot"])
            .with_assignees(["u2"]);
        assert!(!ReleaseItemFilter::from_criteria(&criteria).matches(&item()));

        let criteria = FilterCriteria::default()
            .with_stages(["pilot"])
            .with_assignees(["u1"])
            .with_cycle("c1");
        assert!(ReleaseItemFilter::from_criteria(&criteria).matches(&item()));
    }

    #[test]
    fn test_missing_fields_do_not_match_active_criteria() {
        let bare = ReleaseItem::new("y", 1.0, ReleaseStatus::Todo);
        for criteria in [
            FilterCriteria::default().with_area("frontend"),
            FilterCriteria::default().with_stages(["pilot"]),
            FilterCriteria::default().with_assignees(["u1"]),
            FilterCriteria::default().with_cycle("c1"),
        ] {
            assert!(!ReleaseItemFilter::from_criteria(&criteria).matches(&bare));
        }
    }

    #[test]
    fn test_cycle_matches_attached_cycle() {
        let mut attached = ReleaseItem::new("z", 1.0, ReleaseStatus::Todo);
        attached.cycle = Some(CycleRef::placeholder("c7"));
        let criteria = FilterCriteria::default().with_cycle("c7");
        assert!(ReleaseItemFilter::from_criteria(&criteria).matches(&attached));
    }

    #[test]
    fn test_inert_filter() {
        let criteria = FilterCriteria::default()
            .with_area("all")
            .with_stages(Vec::<Selection>::new());
        assert!(ReleaseItemFilter::from_criteria(&criteria).is_inert());
    }
}
