use crate::serde_helpers::{
    effort_weeks, lenient_date, lenient_id, lenient_option, lenient_string, lenient_vec,
    optional_id, scalar_text,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum CycleState {
    Active,
    Closed,
    #[default]
    Future,
    Completed,
    Other(String),
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Active => "active",
            CycleState::Closed => "closed",
            CycleState::Future => "future",
            CycleState::Completed => "completed",
            CycleState::Other(s) => s.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl CycleState {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" | "current" => CycleState::Active,
            "closed" => CycleState::Closed,
            "future" | "upcoming" | "planned" => CycleState::Future,
            "completed" | "complete" => CycleState::Completed,
            _ => CycleState::Other(raw.to_string()),
        }
    }
}

impl FromStr for CycleState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CycleState::normalize(s))
    }
}

impl From<Value> for CycleState {
    fn from(raw: Value) -> Self {
        scalar_text(raw)
            .map(|s| CycleState::normalize(&s))
            .unwrap_or_default()
    }
}

impl From<CycleState> for String {
    fn from(state: CycleState) -> Self {
        state.to_string()
    }
}

/// Canonical release-item status.
///
/// Parsing is case-insensitive, trims whitespace and folds common tracker
/// synonyms. Unrecognized values are kept verbatim in `Other` and count as
/// neither done nor in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum ReleaseStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Postponed,
    Cancelled,
    Replanned,
    Other(String),
}

impl ReleaseStatus {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "todo" | "to do" | "to-do" | "backlog" | "open" | "planned" | "not started" => {
                ReleaseStatus::Todo
            }
            "inprogress" | "in progress" | "in-progress" | "in_progress" | "wip" | "doing"
            | "started" | "in review" => ReleaseStatus::InProgress,
            "done" | "completed" | "complete" | "closed" | "released" | "shipped" => {
                ReleaseStatus::Done
            }
            "postponed" | "deferred" | "on hold" | "on-hold" => ReleaseStatus::Postponed,
            "cancelled" | "canceled" | "won't do" | "wont do" | "wontdo" => {
                ReleaseStatus::Cancelled
            }
            "replanned" | "re-planned" => ReleaseStatus::Replanned,
            _ => ReleaseStatus::Other(raw.to_string()),
        }
    }

    /// Whether the item's effort counts towards a cycle's planned weeks.
    pub fn counts_towards_effort(&self) -> bool {
        !matches!(self, ReleaseStatus::Replanned)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReleaseStatus::Todo => "todo",
            ReleaseStatus::InProgress => "inprogress",
            ReleaseStatus::Done => "done",
            ReleaseStatus::Postponed => "postponed",
            ReleaseStatus::Cancelled => "cancelled",
            ReleaseStatus::Replanned => "replanned",
            ReleaseStatus::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ReleaseStatus::normalize(s))
    }
}

impl From<Value> for ReleaseStatus {
    fn from(raw: Value) -> Self {
        scalar_text(raw)
            .map(|s| ReleaseStatus::normalize(&s))
            .unwrap_or_default()
    }
}

impl From<ReleaseStatus> for String {
    fn from(status: ReleaseStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_date::deserialize")]
    pub start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date::deserialize")]
    pub end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date::deserialize")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub state: CycleState,
}

impl Cycle {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: CycleState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start: None,
            end: None,
            delivery_date: None,
            state,
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_delivery_date(mut self, delivery_date: NaiveDate) -> Self {
        self.delivery_date = Some(delivery_date);
        self
    }

    pub fn to_ref(&self) -> CycleRef {
        CycleRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Cycle label attached to each release item once the hierarchy is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleRef {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub name: String,
}

impl CycleRef {
    /// Label used when a release item points at a cycle the source did not return.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Cycle {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub name: String,
}

impl Initiative {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "AssigneeRepr")]
pub struct Assignee {
    pub id: String,
    pub name: String,
}

/// Trackers send either a bare display name or a user record.
#[derive(Deserialize)]
#[serde(untagged)]
enum AssigneeRepr {
    Name(String),
    Id(serde_json::Number),
    Record {
        #[serde(default, deserialize_with = "optional_id::deserialize")]
        id: Option<String>,
        #[serde(
            default,
            alias = "displayName",
            deserialize_with = "lenient_string::deserialize"
        )]
        name: String,
    },
}

impl From<AssigneeRepr> for Assignee {
    fn from(repr: AssigneeRepr) -> Self {
        match repr {
            AssigneeRepr::Name(name) => Assignee {
                id: name.clone(),
                name,
            },
            AssigneeRepr::Id(id) => Assignee {
                id: id.to_string(),
                name: id.to_string(),
            },
            AssigneeRepr::Record { id, name } => Assignee {
                id: id.unwrap_or_else(|| name.clone()),
                name,
            },
        }
    }
}

impl Assignee {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default, deserialize_with = "optional_id::deserialize")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapItem {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub area: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub theme: Option<String>,
    #[serde(default, deserialize_with = "optional_id::deserialize")]
    pub initiative_id: Option<String>,
    /// Initiative name as denormalized by some trackers; used when the
    /// initiative itself is missing from the payload.
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub initiative: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec::deserialize")]
    pub validations: Vec<Validation>,
}

impl RoadmapItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            area: None,
            theme: None,
            initiative_id: None,
            initiative: None,
            url: None,
            validations: Vec::new(),
        }
    }

    pub fn with_initiative(mut self, initiative_id: impl Into<String>) -> Self {
        self.initiative_id = Some(initiative_id.into());
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseItem {
    #[serde(deserialize_with = "lenient_id::deserialize")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_id::deserialize")]
    pub ticket_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string::deserialize")]
    pub name: String,
    #[serde(default, deserialize_with = "effort_weeks::deserialize")]
    pub effort: f64,
    #[serde(default, deserialize_with = "lenient_vec::deserialize")]
    pub area_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec::deserialize")]
    pub teams: Vec<String>,
    #[serde(default)]
    pub status: ReleaseStatus,
    #[serde(default, deserialize_with = "optional_id::deserialize")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_option::deserialize")]
    pub assignee: Option<Assignee>,
    #[serde(default, deserialize_with = "optional_id::deserialize")]
    pub cycle_id: Option<String>,
    #[serde(default, deserialize_with = "optional_id::deserialize")]
    pub roadmap_item_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub cycle: Option<CycleRef>,
}

impl ReleaseItem {
    pub fn new(id: impl Into<String>, effort: f64, status: ReleaseStatus) -> Self {
        Self {
            id: id.into(),
            ticket_id: None,
            name: String::new(),
            effort,
            area_ids: Vec::new(),
            teams: Vec::new(),
            status,
            stage: None,
            assignee: None,
            cycle_id: None,
            roadmap_item_id: None,
            url: None,
            cycle: None,
        }
    }

    pub fn with_roadmap_item(mut self, roadmap_item_id: impl Into<String>) -> Self {
        self.roadmap_item_id = Some(roadmap_item_id.into());
        self
    }

    pub fn with_cycle(mut self, cycle_id: impl Into<String>) -> Self {
        self.cycle_id = Some(cycle_id.into());
        self
    }

    pub fn with_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.area_ids = areas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_assignee(mut self, assignee: Assignee) -> Self {
        self.assignee = Some(assignee);
        self
    }
}

/// Flat record set as returned by the data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCycleData {
    #[serde(default, deserialize_with = "lenient_vec::deserialize")]
    pub cycles: Vec<Cycle>,
    #[serde(default, alias = "objectives", deserialize_with = "lenient_vec::deserialize")]
    pub initiatives: Vec<Initiative>,
    #[serde(default, deserialize_with = "lenient_vec::deserialize")]
    pub roadmap_items: Vec<RoadmapItem>,
    #[serde(default, alias = "cycleItems", deserialize_with = "lenient_vec::deserialize")]
    pub release_items: Vec<ReleaseItem>,
}

impl RawCycleData {
    /// Decode a tracker payload. A payload that is not a JSON object at all
    /// is the data source's problem and is reported as an error; anything
    /// below the top level degrades instead.
    pub fn from_json_str(payload: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            Value::Null => Ok(Self::default()),
            other => Err(crate::CycleMapError::Source(format!(
                "expected a JSON object with cycle collections, got {}",
                match other {
                    Value::Array(_) => "an array",
                    _ => "a scalar",
                }
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
            && self.initiatives.is_empty()
            && self.roadmap_items.is_empty()
            && self.release_items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_synonyms() {
        assert_eq!(ReleaseStatus::normalize(" In Progress "), ReleaseStatus::InProgress);
        assert_eq!(ReleaseStatus::normalize("WIP"), ReleaseStatus::InProgress);
        assert_eq!(ReleaseStatus::normalize("Canceled"), ReleaseStatus::Cancelled);
        assert_eq!(ReleaseStatus::normalize("DONE"), ReleaseStatus::Done);
        assert_eq!(ReleaseStatus::normalize("re-planned"), ReleaseStatus::Replanned);
    }

    #[test]
    fn test_unknown_status_passes_through() {
        let status = ReleaseStatus::normalize("Blocked");
        assert_eq!(status, ReleaseStatus::Other("Blocked".to_string()));
        assert_eq!(status.to_string(), "Blocked");
        assert!(status.counts_towards_effort());
    }

    #[test]
    fn test_status_serializes_canonically() {
        let value = serde_json::to_value(ReleaseStatus::normalize("in progress")).unwrap();
        assert_eq!(value, json!("inprogress"));
    }

    #[test]
    fn test_cycle_state_parsing() {
        assert_eq!("Active".parse::<CycleState>().unwrap(), CycleState::Active);
        assert_eq!(
            "archived".parse::<CycleState>().unwrap(),
            CycleState::Other("archived".to_string())
        );
    }

    #[test]
    fn test_missing_status_and_state_default() {
        let item: ReleaseItem =
            serde_json::from_value(json!({ "id": "a", "status": null })).unwrap();
        assert_eq!(item.status, ReleaseStatus::Todo);
        let cycle: Cycle = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert_eq!(cycle.state, CycleState::Future);
        assert_eq!(cycle.id, "1");
    }

    #[test]
    fn test_assignee_accepts_name_or_record() {
        let by_name: Assignee = serde_json::from_value(json!("Ada")).unwrap();
        assert_eq!(by_name, Assignee::new("Ada", "Ada"));
        let record: Assignee =
            serde_json::from_value(json!({ "id": 9, "name": "Grace" })).unwrap();
        assert_eq!(record, Assignee::new("9", "Grace"));
    }

    #[test]
    fn test_null_names_keep_records() {
        let raw = RawCycleData::from_value(json!({
            "cycles": [{ "id": "c1", "name": null, "state": "active" }],
            "initiatives": [{ "id": "i1", "name": null }],
            "roadmapItems": [{ "id": "r1", "name": null, "area": null, "theme": 4 }],
            "releaseItems": [{ "id": "t1", "name": null, "effort": 3, "status": "done" }]
        }))
        .unwrap();

        assert_eq!(raw.cycles[0].name, "");
        assert_eq!(raw.cycles[0].state, CycleState::Active);
        assert_eq!(raw.initiatives[0].name, "");
        assert_eq!(raw.roadmap_items[0].name, "");
        assert_eq!(raw.roadmap_items[0].area, None);
        assert_eq!(raw.roadmap_items[0].theme, None);
        assert_eq!(raw.release_items[0].name, "");
        assert_eq!(raw.release_items[0].effort, 3.0);
    }

    #[test]
    fn test_scalar_names_are_rendered() {
        let item: ReleaseItem =
            serde_json::from_value(json!({ "id": "t1", "name": 2024, "effort": 1 })).unwrap();
        assert_eq!(item.name, "2024");
        let initiative: Initiative =
            serde_json::from_value(json!({ "id": "i1", "name": { "en": "Grow" } })).unwrap();
        assert_eq!(initiative.name, "");
    }

    #[test]
    fn test_numeric_status_and_state_pass_through() {
        let item: ReleaseItem =
            serde_json::from_value(json!({ "id": "t1", "effort": 2, "status": 3 })).unwrap();
        assert_eq!(item.status, ReleaseStatus::Other("3".to_string()));
        assert!(item.status.counts_towards_effort());

        let cycle: Cycle = serde_json::from_value(json!({ "id": "c1", "state": 1 })).unwrap();
        assert_eq!(cycle.state, CycleState::Other("1".to_string()));
        let cycle: Cycle = serde_json::from_value(json!({ "id": "c1", "state": [] })).unwrap();
        assert_eq!(cycle.state, CycleState::Future);
    }

    #[test]
    fn test_numeric_assignee_becomes_id() {
        let item: ReleaseItem =
            serde_json::from_value(json!({ "id": "t1", "assignee": 42 })).unwrap();
        assert_eq!(item.assignee, Some(Assignee::new("42", "42")));
    }

    #[test]
    fn test_odd_assignee_is_dropped_not_the_record() {
        let raw = RawCycleData::from_value(json!({
            "releaseItems": [
                { "id": "t1", "effort": 2, "assignee": true },
                { "id": "t2", "effort": 1, "assignee": null, "cycle": "c1" }
            ]
        }))
        .unwrap();

        assert_eq!(raw.release_items.len(), 2);
        assert_eq!(raw.release_items[0].assignee, None);
        assert_eq!(raw.release_items[1].assignee, None);
        assert_eq!(raw.release_items[1].cycle, None);
    }

    #[test]
    fn test_placeholder_cycle_label() {
        let cycle = CycleRef::placeholder("42");
        assert_eq!(cycle.name, "Cycle 42");
    }

    #[test]
    fn test_raw_data_degrades_malformed_collections() {
        let raw = RawCycleData::from_value(json!({
            "cycles": null,
            "initiatives": "nope",
            "roadmapItems": [{ "id": "r1", "name": "Search" }],
            "releaseItems": [
                { "id": 7, "effort": "2", "status": "Done", "roadmapItemId": "r1" },
                { "effort": 1 }
            ]
        }))
        .unwrap();

        assert!(raw.cycles.is_empty());
        assert!(raw.initiatives.is_empty());
        assert_eq!(raw.roadmap_items.len(), 1);
        assert_eq!(raw.release_items.len(), 1);
        assert_eq!(raw.release_items[0].id, "7");
        assert_eq!(raw.release_items[0].effort, 2.0);
        assert_eq!(raw.release_items[0].status, ReleaseStatus::Done);
    }

    #[test]
    fn test_raw_data_accepts_aliases() {
        let raw = RawCycleData::from_value(json!({
            "objectives": [{ "id": "o1", "name": "Grow" }],
            "cycleItems": [{ "id": "c1" }]
        }))
        .unwrap();
        assert_eq!(raw.initiatives.len(), 1);
        assert_eq!(raw.release_items.len(), 1);
    }

    #[test]
    fn test_raw_data_rejects_non_object_payload() {
        assert!(RawCycleData::from_value(json!([1, 2, 3])).is_err());
        assert!(RawCycleData::from_value(Value::Null).unwrap().is_empty());
    }
}
