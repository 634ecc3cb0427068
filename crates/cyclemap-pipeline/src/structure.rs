use crate::progress::{aggregate_progress, calculate_progress};
use cyclemap_core::{
    Cycle, CycleRef, InitiativeWithProgress, NestedCycleData, PipelineConfig, RawCycleData,
    ReleaseItem, RoadmapItemWithProgress,
};
use std::collections::HashMap;
use tracing::debug;

/// Groups flat tracker records into initiatives → roadmap items → release
/// items and attaches progress metrics at every level.
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    unassigned_id: String,
    unassigned_name: String,
}

impl Default for StructureBuilder {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

struct InitiativeGroup {
    id: String,
    name: String,
    roadmap_items: Vec<RoadmapItemWithProgress>,
}

impl StructureBuilder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            unassigned_id: config.unassigned_initiative_id.clone(),
            unassigned_name: config.unassigned_initiative_name.clone(),
        }
    }

    /// Build the hierarchy from scratch. Initiatives are ordered by total
    /// weeks, largest first; equal totals keep the order in which their
    /// first roadmap item appeared.
    pub fn build(&self, raw: &RawCycleData) -> NestedCycleData {
        let cycles: HashMap<&str, &Cycle> = raw
            .cycles
            .iter()
            .map(|cycle| (cycle.id.as_str(), cycle))
            .collect();
        let initiative_names: HashMap<&str, &str> = raw
            .initiatives
            .iter()
            .map(|initiative| (initiative.id.as_str(), initiative.name.as_str()))
            .collect();

        let mut release_items_by_roadmap: HashMap<&str, Vec<&ReleaseItem>> = HashMap::new();
        for release_item in &raw.release_items {
            if let Some(roadmap_item_id) = release_item.roadmap_item_id.as_deref() {
                release_items_by_roadmap
                    .entry(roadmap_item_id)
                    .or_default()
                    .push(release_item);
            }
        }

        let mut groups: Vec<InitiativeGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut attached = 0usize;

        for roadmap_item in &raw.roadmap_items {
            let release_items: Vec<ReleaseItem> = release_items_by_roadmap
                .get(roadmap_item.id.as_str())
                .map(|items| {
                    items
                        .iter()
                        .map(|item| attach_cycle(item, &cycles))
                        .collect()
                })
                .unwrap_or_default();
            attached += release_items.len();

            let progress = calculate_progress(&release_items);
            let initiative_id = roadmap_item
                .initiative_id
                .clone()
                .unwrap_or_else(|| self.unassigned_id.clone());

            let mut item = roadmap_item.clone();
            item.initiative_id = Some(initiative_id.clone());

            let index = match group_index.get(&initiative_id) {
                Some(&index) => index,
                None => {
                    let name = self.initiative_name(
                        &initiative_id,
                        &initiative_names,
                        roadmap_item.initiative.as_deref(),
                    );
                    groups.push(InitiativeGroup {
                        id: initiative_id.clone(),
                        name,
                        roadmap_items: Vec::new(),
                    });
                    group_index.insert(initiative_id, groups.len() - 1);
                    groups.len() - 1
                }
            };

            groups[index].roadmap_items.push(RoadmapItemWithProgress {
                item,
                release_items,
                progress,
            });
        }

        let orphaned = raw.release_items.len().saturating_sub(attached);
        if orphaned > 0 {
            debug!(
                orphaned,
                "Release items without a matching roadmap item were left out"
            );
        }

        let mut initiatives: Vec<InitiativeWithProgress> = groups
            .into_iter()
            .map(|group| InitiativeWithProgress {
                progress: aggregate_progress(group.roadmap_items.iter().map(|r| &r.progress)),
                id: group.id,
                name: group.name,
                roadmap_items: group.roadmap_items,
            })
            .collect();
        sort_by_weeks(&mut initiatives);

        debug!(
            initiatives = initiatives.len(),
            roadmap_items = raw.roadmap_items.len(),
            release_items = attached,
            "Built cycle hierarchy"
        );

        NestedCycleData { initiatives }
    }

    fn initiative_name(
        &self,
        initiative_id: &str,
        names: &HashMap<&str, &str>,
        denormalized: Option<&str>,
    ) -> String {
        if let Some(name) = names.get(initiative_id).filter(|name| !name.is_empty()) {
            return name.to_string();
        }
        if let Some(name) = denormalized.filter(|name| !name.trim().is_empty()) {
            return name.to_string();
        }
        if initiative_id == self.unassigned_id {
            return self.unassigned_name.clone();
        }
        initiative_id.to_string()
    }
}

/// Largest effort first; ties keep their current relative order.
pub(crate) fn sort_by_weeks(initiatives: &mut [InitiativeWithProgress]) {
    initiatives.sort_by(|a, b| b.progress.weeks.total_cmp(&a.progress.weeks));
}

fn attach_cycle(item: &ReleaseItem, cycles: &HashMap<&str, &Cycle>) -> ReleaseItem {
    let mut item = item.clone();
    item.cycle = item.cycle_id.as_deref().map(|cycle_id| {
        cycles
            .get(cycle_id)
            .map(|cycle| cycle.to_ref())
            .unwrap_or_else(|| CycleRef::placeholder(cycle_id))
    });
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclemap_core::{CycleState, Initiative, ReleaseStatus, RoadmapItem};

    fn raw_fixture() -> RawCycleData {
        RawCycleData {
            cycles: vec![Cycle::new("c1", "Cycle One", CycleState::Active)],
            initiatives: vec![
                Initiative::new("small", "Small bets"),
                Initiative::new("big", "Big bets"),
            ],
            roadmap_items: vec![
                RoadmapItem::new("r1", "Tiny").with_initiative("small"),
                RoadmapItem::new("r2", "Huge").with_initiative("big"),
                RoadmapItem::new("r3", "Loose end"),
            ],
            release_items: vec![
                ReleaseItem::new("a", 1.0, ReleaseStatus::Done)
                    .with_roadmap_item("r1")
                    .with_cycle("c1"),
                ReleaseItem::new("b", 5.0, ReleaseStatus::InProgress)
                    .with_roadmap_item("r2")
                    .with_cycle("c9"),
                ReleaseItem::new("c", 3.0, ReleaseStatus::Todo).with_roadmap_item("r2"),
                ReleaseItem::new("d", 2.0, ReleaseStatus::Todo).with_roadmap_item("r3"),
                ReleaseItem::new("e", 8.0, ReleaseStatus::Todo).with_roadmap_item("ghost"),
            ],
        }
    }

    #[test]
    fn test_initiatives_sorted_by_weeks_descending() {
        let nested = StructureBuilder::default().build(&raw_fixture());
        let ids: Vec<&str> = nested.initiatives.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["big", "unassigned", "small"]);
        assert_eq!(nested.initiatives[0].progress.weeks, 8.0);
    }

    #[test]
    fn test_missing_initiative_defaults_to_unassigned() {
        let nested = StructureBuilder::default().build(&raw_fixture());
        let unassigned = nested
            .initiatives
            .iter()
            .find(|i| i.id == "unassigned")
            .unwrap();
        assert_eq!(unassigned.name, "Unassigned");
        assert_eq!(
            unassigned.roadmap_items[0].item.initiative_id.as_deref(),
            Some("unassigned")
        );
    }

    #[test]
    fn test_unassigned_pair_is_configurable() {
        let config = PipelineConfig {
            unassigned_initiative_id: "none".to_string(),
            unassigned_initiative_name: "No initiative".to_string(),
            ..PipelineConfig::default()
        };
        let nested = StructureBuilder::new(&config).build(&raw_fixture());
        assert!(nested
            .initiatives
            .iter()
            .any(|i| i.id == "none" && i.name == "No initiative"));
    }

    #[test]
    fn test_cycles_attached_with_placeholder_fallback() {
        let nested = StructureBuilder::default().build(&raw_fixture());
        let cycles: HashMap<&str, Option<&CycleRef>> = nested
            .release_items()
            .map(|item| (item.id.as_str(), item.cycle.as_ref()))
            .collect();

        assert_eq!(cycles["a"].unwrap().name, "Cycle One");
        assert_eq!(cycles["b"].unwrap(), &CycleRef::placeholder("c9"));
        assert_eq!(cycles["b"].unwrap().name, "Cycle c9");
        assert!(cycles["c"].is_none());
    }

    #[test]
    fn test_orphaned_release_items_are_dropped() {
        let nested = StructureBuilder::default().build(&raw_fixture());
        assert_eq!(nested.release_item_count(), 4);
        assert!(nested.release_items().all(|item| item.id != "e"));
    }

    #[test]
    fn test_initiative_counters_are_sums_of_roadmap_items() {
        let mut raw = raw_fixture();
        raw.roadmap_items
            .push(RoadmapItem::new("r4", "Second big").with_initiative("big"));
        raw.release_items.push(
            ReleaseItem::new("f", 2.0, ReleaseStatus::Done).with_roadmap_item("r4"),
        );

        let nested = StructureBuilder::default().build(&raw);
        let big = &nested.initiatives[0];
        let summed: f64 = big.roadmap_items.iter().map(|r| r.progress.weeks).sum();

        assert_eq!(big.progress.weeks, summed);
        assert_eq!(big.progress.weeks, 10.0);
        assert_eq!(big.progress.weeks_done, 2.0);
        assert_eq!(big.progress.progress, 20);
        assert_eq!(big.progress.item_count, 3);
    }

    #[test]
    fn test_roadmap_item_without_release_items_has_zero_metrics() {
        let mut raw = raw_fixture();
        raw.roadmap_items
            .push(RoadmapItem::new("r5", "Not started").with_initiative("small"));

        let nested = StructureBuilder::default().build(&raw);
        let empty = nested
            .roadmap_items()
            .find(|r| r.item.id == "r5")
            .unwrap();
        assert!(empty.release_items.is_empty());
        assert_eq!(empty.progress.progress, 0);
    }

    #[test]
    fn test_empty_input_builds_empty_hierarchy() {
        let nested = StructureBuilder::default().build(&RawCycleData::default());
        assert!(nested.is_empty());
    }

    #[test]
    fn test_initiative_name_falls_back_to_denormalized_name() {
        let mut raw = raw_fixture();
        let mut roadmap_item = RoadmapItem::new("r6", "Partner").with_initiative("partners");
        roadmap_item.initiative = Some("Partnerships".to_string());
        raw.roadmap_items.push(roadmap_item);

        let nested = StructureBuilder::default().build(&raw);
        let partners = nested
            .initiatives
            .iter()
            .find(|i| i.id == "partners")
            .unwrap();
        assert_eq!(partners.name, "Partnerships");
    }
}
