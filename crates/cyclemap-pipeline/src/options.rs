use cyclemap_core::{Cycle, NestedCycleData, Selection};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Choices offered by the filter controls, derived from the data.
///
/// Areas and stages are sorted by value; initiatives, assignees and cycles
/// by display name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub areas: Vec<String>,
    pub initiatives: Vec<Selection>,
    pub stages: Vec<String>,
    pub assignees: Vec<Selection>,
    pub cycles: Vec<Selection>,
}

impl FilterOptions {
    pub fn collect(data: &NestedCycleData, cycles: &[Cycle]) -> Self {
        let mut areas = BTreeSet::new();
        let mut stages = BTreeSet::new();
        let mut assignees: BTreeMap<&str, &str> = BTreeMap::new();

        for item in data.release_items() {
            areas.extend(
                item.area_ids
                    .iter()
                    .map(|area| area.trim().to_lowercase())
                    .filter(|area| !area.is_empty()),
            );
            if let Some(stage) = item.stage.as_deref().map(str::trim) {
                if !stage.is_empty() {
                    stages.insert(stage.to_string());
                }
            }
            if let Some(assignee) = &item.assignee {
                assignees
                    .entry(assignee.id.as_str())
                    .or_insert(assignee.name.as_str());
            }
        }

        let initiatives = by_name(
            data.initiatives
                .iter()
                .map(|initiative| (initiative.id.as_str(), initiative.name.as_str())),
        );
        let cycles = by_name(cycles.iter().map(|cycle| (cycle.id.as_str(), cycle.name.as_str())));

        Self {
            areas: areas.into_iter().collect(),
            initiatives,
            stages: stages.into_iter().collect(),
            assignees: by_name(assignees),
            cycles,
        }
    }
}

fn by_name<'a, I>(entries: I) -> Vec<Selection>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let unique: BTreeMap<&str, &str> = entries.into_iter().collect();
    let mut selections: Vec<Selection> = unique
        .into_iter()
        .map(|(id, name)| Selection::named(id, name))
        .collect();
    selections.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    selections
}
