//! Per-view filter state.
//!
//! Filters live in three buckets: common filters shared by every view, and
//! one bucket per view. Which bucket a key belongs to is fixed by
//! [`FilterKey::scope`]; switching views never clears anything.

use cyclemap_core::{FilterCriteria, PipelineConfig, Selection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    /// Timeline across cycles
    #[default]
    Roadmap,
    /// Single-cycle overview
    CycleOverview,
}

impl ViewKind {
    pub const ALL: [ViewKind; 2] = [ViewKind::Roadmap, ViewKind::CycleOverview];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Roadmap => "roadmap",
            ViewKind::CycleOverview => "cycle-overview",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = ViewFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "roadmap" | "timeline" => Ok(ViewKind::Roadmap),
            "cycle-overview" | "cycle_overview" | "overview" => Ok(ViewKind::CycleOverview),
            other => Err(ViewFilterError::UnknownView(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Area,
    Initiatives,
    Stages,
    Assignees,
    Cycle,
}

/// Where a filter key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    Common,
    ViewSpecific(&'static [ViewKind]),
}

impl FilterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Area => "area",
            FilterKey::Initiatives => "initiatives",
            FilterKey::Stages => "stages",
            FilterKey::Assignees => "assignees",
            FilterKey::Cycle => "cycle",
        }
    }

    pub fn scope(&self) -> FilterScope {
        match self {
            FilterKey::Area | FilterKey::Initiatives => FilterScope::Common,
            FilterKey::Stages | FilterKey::Assignees => FilterScope::ViewSpecific(&ViewKind::ALL),
            FilterKey::Cycle => FilterScope::ViewSpecific(&[ViewKind::CycleOverview]),
        }
    }

    pub fn is_allowed_in(&self, view: ViewKind) -> bool {
        match self.scope() {
            FilterScope::Common => true,
            FilterScope::ViewSpecific(views) => views.contains(&view),
        }
    }

    fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            FilterKey::Initiatives | FilterKey::Stages | FilterKey::Assignees
        )
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = ViewFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "area" => Ok(FilterKey::Area),
            "initiatives" | "initiative" => Ok(FilterKey::Initiatives),
            "stages" | "stage" => Ok(FilterKey::Stages),
            "assignees" | "assignee" => Ok(FilterKey::Assignees),
            "cycle" => Ok(FilterKey::Cycle),
            other => Err(ViewFilterError::UnknownKey(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewFilterError {
    #[error("Unknown filter key: {0}")]
    UnknownKey(String),

    #[error("Filter '{key}' is not available in the {view} view")]
    KeyNotAllowed { key: FilterKey, view: ViewKind },

    #[error("Invalid value for filter '{key}': {reason}")]
    InvalidValue { key: FilterKey, reason: String },

    #[error("Unknown view: {0}")]
    UnknownView(String),
}

/// A single filter change. `None` removes the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Area(Option<Selection>),
    Initiatives(Option<Vec<Selection>>),
    Stages(Option<Vec<Selection>>),
    Assignees(Option<Vec<Selection>>),
    Cycle(Option<Selection>),
}

impl FilterUpdate {
    pub fn key(&self) -> FilterKey {
        match self {
            FilterUpdate::Area(_) => FilterKey::Area,
            FilterUpdate::Initiatives(_) => FilterKey::Initiatives,
            FilterUpdate::Stages(_) => FilterKey::Stages,
            FilterUpdate::Assignees(_) => FilterKey::Assignees,
            FilterUpdate::Cycle(_) => FilterKey::Cycle,
        }
    }

    /// Decode an update sent by a filter control. `null` clears the key; a
    /// single value is accepted where a list is expected.
    pub fn from_json(key: &str, value: Value) -> Result<Self, ViewFilterError> {
        let key: FilterKey = key.parse()?;
        if value.is_null() {
            return Ok(Self::cleared(key));
        }

        let value = match value {
            Value::Array(_) => value,
            single if key.is_multi_valued() => Value::Array(vec![single]),
            single => single,
        };
        let invalid = |e: serde_json::Error| ViewFilterError::InvalidValue {
            key,
            reason: e.to_string(),
        };

        Ok(match key {
            FilterKey::Area => {
                FilterUpdate::Area(Some(serde_json::from_value(value).map_err(invalid)?))
            }
            FilterKey::Initiatives => {
                FilterUpdate::Initiatives(Some(serde_json::from_value(value).map_err(invalid)?))
            }
            FilterKey::Stages => {
                FilterUpdate::Stages(Some(serde_json::from_value(value).map_err(invalid)?))
            }
            FilterKey::Assignees => {
                FilterUpdate::Assignees(Some(serde_json::from_value(value).map_err(invalid)?))
            }
            FilterKey::Cycle => {
                FilterUpdate::Cycle(Some(serde_json::from_value(value).map_err(invalid)?))
            }
        })
    }

    pub fn cleared(key: FilterKey) -> Self {
        match key {
            FilterKey::Area => FilterUpdate::Area(None),
            FilterKey::Initiatives => FilterUpdate::Initiatives(None),
            FilterKey::Stages => FilterUpdate::Stages(None),
            FilterKey::Assignees => FilterUpdate::Assignees(None),
            FilterKey::Cycle => FilterUpdate::Cycle(None),
        }
    }

    fn apply_to(self, bucket: &mut FilterCriteria) {
        match self {
            FilterUpdate::Area(value) => bucket.area = value,
            FilterUpdate::Initiatives(value) => bucket.initiatives = value,
            FilterUpdate::Stages(value) => bucket.stages = value,
            FilterUpdate::Assignees(value) => bucket.assignees = value,
            FilterUpdate::Cycle(value) => bucket.cycle = value,
        }
    }
}

/// Stored filter buckets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewFilterCriteria {
    pub common: FilterCriteria,
    pub roadmap: FilterCriteria,
    pub cycle_overview: FilterCriteria,
}

impl ViewFilterCriteria {
    pub fn view(&self, view: ViewKind) -> &FilterCriteria {
        match view {
            ViewKind::Roadmap => &self.roadmap,
            ViewKind::CycleOverview => &self.cycle_overview,
        }
    }

    fn view_mut(&mut self, view: ViewKind) -> &mut FilterCriteria {
        match view {
            ViewKind::Roadmap => &mut self.roadmap,
            ViewKind::CycleOverview => &mut self.cycle_overview,
        }
    }
}

/// Filter state for one UI instance. Construct one per consumer.
#[derive(Debug, Clone, Default)]
pub struct ViewFilterManager {
    current: ViewKind,
    filters: ViewFilterCriteria,
}

impl ViewFilterManager {
    pub fn new(initial: ViewKind) -> Self {
        Self {
            current: initial,
            filters: ViewFilterCriteria::default(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ViewFilterError> {
        Ok(Self::new(config.default_view.parse()?))
    }

    pub fn current_view(&self) -> ViewKind {
        self.current
    }

    pub fn criteria(&self) -> &ViewFilterCriteria {
        &self.filters
    }

    /// Make `view` active and return its merged filters.
    pub fn switch_view(&mut self, view: ViewKind) -> FilterCriteria {
        debug!(from = %self.current, to = %view, "Switching view");
        self.current = view;
        self.get_active_filters()
    }

    /// Store `update` in the bucket its key belongs to.
    ///
    /// View-specific keys go to the active view's bucket and are rejected
    /// when the active view does not support them.
    pub fn update_filter(
        &mut self,
        update: FilterUpdate,
    ) -> Result<FilterCriteria, ViewFilterError> {
        let key = update.key();
        if !key.is_allowed_in(self.current) {
            return Err(ViewFilterError::KeyNotAllowed {
                key,
                view: self.current,
            });
        }
        match key.scope() {
            FilterScope::Common => update.apply_to(&mut self.filters.common),
            FilterScope::ViewSpecific(_) => update.apply_to(self.filters.view_mut(self.current)),
        }
        debug!(key = %key, view = %self.current, "Updated filter");
        Ok(self.get_active_filters())
    }

    pub fn update_filter_json(
        &mut self,
        key: &str,
        value: Value,
    ) -> Result<FilterCriteria, ViewFilterError> {
        let update = FilterUpdate::from_json(key, value)?;
        self.update_filter(update)
    }

    /// Clear one view's bucket; common filters and other views are kept.
    pub fn reset_view_specific_filters(&mut self, view: ViewKind) -> FilterCriteria {
        *self.filters.view_mut(view) = FilterCriteria::default();
        self.get_active_filters()
    }

    /// Common filters overlaid with the active view's filters.
    pub fn get_active_filters(&self) -> FilterCriteria {
        FilterCriteria::merged(&self.filters.common, self.filters.view(self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_view_is_roadmap() {
        let manager = ViewFilterManager::default();
        assert_eq!(manager.current_view(), ViewKind::Roadmap);
        assert_eq!(manager.get_active_filters(), FilterCriteria::default());
    }

    #[test]
    fn test_common_filter_survives_view_switch() {
        let mut manager = ViewFilterManager::default();
        manager
            .update_filter(FilterUpdate::Area(Some(Selection::id("frontend"))))
            .unwrap();

        let active = manager.switch_view(ViewKind::CycleOverview);
        assert_eq!(active.active_area(), Some("frontend"));
        assert_eq!(
            manager.get_active_filters().active_area(),
            Some("frontend")
        );
    }

    #[test]
    fn test_view_specific_filters_are_isolated() {
        let mut manager = ViewFilterManager::new(ViewKind::Roadmap);
        manager
            .update_filter(FilterUpdate::Stages(Some(vec![Selection::id("pilot")])))
            .unwrap();

        let overview = manager.switch_view(ViewKind::CycleOverview);
        assert_eq!(overview.active_stages(), None);

        let roadmap = manager.switch_view(ViewKind::Roadmap);
        assert_eq!(roadmap.active_stages(), Some(vec!["pilot"]));
    }

    #[test]
    fn test_cycle_key_rejected_in_roadmap_view() {
        let mut manager = ViewFilterManager::new(ViewKind::Roadmap);
        let result = manager.update_filter(FilterUpdate::Cycle(Some(Selection::id("c1"))));
        assert_eq!(
            result,
            Err(ViewFilterError::KeyNotAllowed {
                key: FilterKey::Cycle,
                view: ViewKind::Roadmap,
            })
        );
        assert_eq!(manager.criteria(), &ViewFilterCriteria::default());
    }

    #[test]
    fn test_key_permissions_per_view() {
        for view in ViewKind::ALL {
            assert!(FilterKey::Area.is_allowed_in(view));
            assert!(FilterKey::Initiatives.is_allowed_in(view));
            assert!(FilterKey::Stages.is_allowed_in(view));
            assert!(FilterKey::Assignees.is_allowed_in(view));
        }
        assert!(FilterKey::Cycle.is_allowed_in(ViewKind::CycleOverview));
        assert!(!FilterKey::Cycle.is_allowed_in(ViewKind::Roadmap));

        let mut manager = ViewFilterManager::new(ViewKind::CycleOverview);
        let active = manager
            .update_filter(FilterUpdate::Cycle(Some(Selection::id("c1"))))
            .unwrap();
        assert_eq!(active.cycle, Some(Selection::id("c1")));
    }

    #[test]
    fn test_none_removes_key() {
        let mut manager = ViewFilterManager::default();
        manager
            .update_filter(FilterUpdate::Area(Some(Selection::id("frontend"))))
            .unwrap();
        let active = manager.update_filter(FilterUpdate::Area(None)).unwrap();
        assert!(active.area.is_none());
    }

    #[test]
    fn test_reset_only_touches_one_view() {
        let mut manager = ViewFilterManager::new(ViewKind::CycleOverview);
        manager
            .update_filter(FilterUpdate::Cycle(Some(Selection::id("c1"))))
            .unwrap();
        manager
            .update_filter(FilterUpdate::Initiatives(Some(vec![Selection::id("i1")])))
            .unwrap();
        manager.switch_view(ViewKind::Roadmap);
        manager
            .update_filter(FilterUpdate::Assignees(Some(vec![Selection::id("u1")])))
            .unwrap();

        let active = manager.reset_view_specific_filters(ViewKind::CycleOverview);
        assert_eq!(active.active_assignees(), Some(vec!["u1"]));
        assert_eq!(active.active_initiatives(), Some(vec!["i1"]));
        assert!(manager.criteria().cycle_overview.cycle.is_none());
    }

    #[test]
    fn test_json_updates() {
        let mut manager = ViewFilterManager::new(ViewKind::CycleOverview);
        manager.update_filter_json("cycle", json!("c2")).unwrap();
        manager
            .update_filter_json("stages", json!({ "id": "scale", "name": "Scale" }))
            .unwrap();
        let active = manager.update_filter_json("initiatives", json!(["i1", "i2"])).unwrap();

        assert_eq!(active.cycle, Some(Selection::id("c2")));
        assert_eq!(active.active_stages(), Some(vec!["scale"]));
        assert_eq!(active.active_initiatives(), Some(vec!["i1", "i2"]));

        let cleared = manager.update_filter_json("cycle", Value::Null).unwrap();
        assert!(cleared.cycle.is_none());
    }

    #[test]
    fn test_json_rejects_unknown_key_and_bad_value() {
        let mut manager = ViewFilterManager::default();
        assert_eq!(
            manager.update_filter_json("priority", json!("high")),
            Err(ViewFilterError::UnknownKey("priority".to_string()))
        );
        assert!(matches!(
            manager.update_filter_json("area", json!(true)),
            Err(ViewFilterError::InvalidValue { key: FilterKey::Area, .. })
        ));
    }

    #[test]
    fn test_from_config_uses_default_view() {
        let config = PipelineConfig {
            default_view: "cycle-overview".to_string(),
            ..PipelineConfig::default()
        };
        let manager = ViewFilterManager::from_config(&config).unwrap();
        assert_eq!(manager.current_view(), ViewKind::CycleOverview);
    }

    #[test]
    fn test_managers_do_not_share_state() {
        let mut first = ViewFilterManager::default();
        let second = ViewFilterManager::default();
        first
            .update_filter(FilterUpdate::Area(Some(Selection::id("frontend"))))
            .unwrap();
        assert!(second.get_active_filters().area.is_none());
    }
}
