use crate::serde_helpers::{lenient_id, lenient_list, lenient_option};
use serde::{Deserialize, Serialize};

/// Value a filter control uses to mean "no restriction".
pub const ALL_SENTINEL: &str = "all";

/// One selected value of a filter control.
///
/// Controls send either a bare id or an `{id, name}` option record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SelectionRepr")]
pub struct Selection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Id(String),
    Number(serde_json::Number),
    Record {
        #[serde(deserialize_with = "lenient_id::deserialize")]
        id: String,
        #[serde(default, deserialize_with = "lenient_option::deserialize")]
        name: Option<String>,
    },
}

impl From<SelectionRepr> for Selection {
    fn from(repr: SelectionRepr) -> Self {
        match repr {
            SelectionRepr::Id(id) => Selection { id, name: None },
            SelectionRepr::Number(n) => Selection {
                id: n.to_string(),
                name: None,
            },
            SelectionRepr::Record { id, name } => Selection { id, name },
        }
    }
}

impl Selection {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    pub fn all() -> Self {
        Self::id(ALL_SENTINEL)
    }

    pub fn is_all(&self) -> bool {
        self.id.trim().eq_ignore_ascii_case(ALL_SENTINEL)
    }

    pub fn is_blank(&self) -> bool {
        self.id.trim().is_empty()
    }
}

impl From<&str> for Selection {
    fn from(id: &str) -> Self {
        Selection::id(id)
    }
}

impl From<String> for Selection {
    fn from(id: String) -> Self {
        Selection::id(id)
    }
}

/// Criteria applied by the filter engine.
///
/// Every field is optional. `cycle` differs from the rest: leaving it out
/// means the caller does not scope by cycle, while supplying an empty or
/// `"all"` cycle is a caller error that yields an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub area: Option<Selection>,
    #[serde(
        default,
        deserialize_with = "lenient_list::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub initiatives: Option<Vec<Selection>>,
    #[serde(
        default,
        deserialize_with = "lenient_list::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub stages: Option<Vec<Selection>>,
    #[serde(
        default,
        deserialize_with = "lenient_list::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignees: Option<Vec<Selection>>,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub cycle: Option<Selection>,
}

impl FilterCriteria {
    pub fn with_area(mut self, area: impl Into<Selection>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_initiatives<I, S>(mut self, initiatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        self.initiatives = Some(initiatives.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_stages<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        self.stages = Some(stages.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_assignees<I, S>(mut self, assignees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selection>,
    {
        self.assignees = Some(assignees.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_cycle(mut self, cycle: impl Into<Selection>) -> Self {
        self.cycle = Some(cycle.into());
        self
    }

    /// Area to match, or `None` when the criterion is inert.
    pub fn active_area(&self) -> Option<&str> {
        self.area
            .as_ref()
            .filter(|area| !area.is_all() && !area.is_blank())
            .map(|area| area.id.trim())
    }

    pub fn active_initiatives(&self) -> Option<Vec<&str>> {
        active_ids(self.initiatives.as_deref())
    }

    pub fn active_stages(&self) -> Option<Vec<&str>> {
        active_ids(self.stages.as_deref())
    }

    pub fn active_assignees(&self) -> Option<Vec<&str>> {
        active_ids(self.assignees.as_deref())
    }

    /// True when no criterion narrows anything, including cycle scoping.
    pub fn is_inert(&self) -> bool {
        self.active_area().is_none()
            && self.active_initiatives().is_none()
            && self.active_stages().is_none()
            && self.active_assignees().is_none()
            && self.cycle.is_none()
    }

    /// Overlay `specific` on top of `common`, key by key.
    pub fn merged(common: &FilterCriteria, specific: &FilterCriteria) -> FilterCriteria {
        FilterCriteria {
            area: specific.area.clone().or_else(|| common.area.clone()),
            initiatives: specific
                .initiatives
                .clone()
                .or_else(|| common.initiatives.clone()),
            stages: specific.stages.clone().or_else(|| common.stages.clone()),
            assignees: specific
                .assignees
                .clone()
                .or_else(|| common.assignees.clone()),
            cycle: specific.cycle.clone().or_else(|| common.cycle.clone()),
        }
    }
}

/// Ids of a multi-select criterion, or `None` if it is absent, empty, or
/// includes the `"all"` sentinel.
fn active_ids(values: Option<&[Selection]>) -> Option<Vec<&str>> {
    let values = values?;
    if values.iter().any(Selection::is_all) {
        return None;
    }
    let ids: Vec<&str> = values
        .iter()
        .filter(|selection| !selection.is_blank())
        .map(|selection| selection.id.as_str())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_accepts_ids_and_records() {
        let criteria: FilterCriteria = serde_json::from_value(json!({
            "area": "frontend",
            "initiatives": [{ "id": "i1", "name": "Growth" }, 7],
            "stages": ["pilot"]
        }))
        .unwrap();

        assert_eq!(criteria.active_area(), Some("frontend"));
        assert_eq!(criteria.active_initiatives(), Some(vec!["i1", "7"]));
        assert_eq!(criteria.active_stages(), Some(vec!["pilot"]));
        assert_eq!(criteria.active_assignees(), None);
    }

    #[test]
    fn test_list_fields_accept_single_values() {
        let criteria: FilterCriteria = serde_json::from_value(json!({
            "stages": "pilot",
            "area": "frontend",
            "assignees": 42
        }))
        .unwrap();
        assert_eq!(criteria.active_stages(), Some(vec!["pilot"]));
        assert_eq!(criteria.active_assignees(), Some(vec!["42"]));
        assert_eq!(criteria.active_area(), Some("frontend"));

        let criteria: FilterCriteria =
            serde_json::from_value(json!({ "initiatives": { "id": "all" } })).unwrap();
        assert_eq!(criteria.initiatives, Some(vec![Selection::all()]));
        assert!(criteria.is_inert());
    }

    #[test]
    fn test_malformed_fields_are_ignored() {
        let criteria: FilterCriteria = serde_json::from_value(json!({
            "stages": true,
            "initiatives": { "name": "no id" },
            "area": true,
            "cycle": null,
            "assignees": ["u1", false]
        }))
        .unwrap();
        assert_eq!(criteria.stages, None);
        assert_eq!(criteria.initiatives, None);
        assert_eq!(criteria.area, None);
        assert_eq!(criteria.cycle, None);
        assert_eq!(criteria.active_assignees(), Some(vec!["u1"]));
    }

    #[test]
    fn test_all_sentinel_makes_criterion_inert() {
        let criteria = FilterCriteria::default()
            .with_area("all")
            .with_initiatives([Selection::all(), Selection::id("i1")])
            .with_stages(Vec::<Selection>::new());

        assert_eq!(criteria.active_area(), None);
        assert_eq!(criteria.active_initiatives(), None);
        assert_eq!(criteria.active_stages(), None);
        assert!(criteria.is_inert());
    }

    #[test]
    fn test_cycle_presence_is_not_inert() {
        let criteria = FilterCriteria::default().with_cycle("");
        assert!(!criteria.is_inert());
    }

    #[test]
    fn test_merge_prefers_specific_values() {
        let common = FilterCriteria::default()
            .with_area("frontend")
            .with_initiatives(["i1"]);
        let specific = FilterCriteria::default()
            .with_area("backend")
            .with_stages(["pilot"]);

        let merged = FilterCriteria::merged(&common, &specific);
        assert_eq!(merged.active_area(), Some("backend"));
        assert_eq!(merged.active_initiatives(), Some(vec!["i1"]));
        assert_eq!(merged.active_stages(), Some(vec!["pilot"]));
    }
}
