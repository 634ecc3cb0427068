//! Effort and completion metrics.
//!
//! Metrics are computed from raw week counters. A parent level is built by
//! summing its children's counters and recomputing the percentages from the
//! sums, so a parent never averages its children's percentages.
//!
//! Week counters are rounded at every level. For efforts with more than two
//! decimals a parent's weeks can differ from a flat calculation over all of
//! its release items by the accumulated rounding of its children.

use cyclemap_core::{ProgressMetrics, ReleaseItem, ReleaseStatus};

/// Round a week counter to two decimals.
pub fn round_weeks(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// Integer percentage of `part` over `whole`, clamped to `0..=100`.
/// A zero (or negative) denominator yields 0.
pub fn percentage(part: f64, whole: f64) -> u8 {
    if !whole.is_finite() || whole <= 0.0 || !part.is_finite() {
        return 0;
    }
    (part / whole * 100.0).round().clamp(0.0, 100.0) as u8
}

fn count_percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    percentage(part as f64, whole as f64)
}

/// Metrics for one set of release items.
pub fn calculate_progress<'a, I>(items: I) -> ProgressMetrics
where
    I: IntoIterator<Item = &'a ReleaseItem>,
{
    let counters = items
        .into_iter()
        .fold(ProgressMetrics::default(), |mut counters, item| {
            add_item(&mut counters, item);
            counters
        });
    finalize(counters)
}

/// Metrics for a parent, from its children's metrics.
pub fn aggregate_progress<'a, I>(children: I) -> ProgressMetrics
where
    I: IntoIterator<Item = &'a ProgressMetrics>,
{
    let counters = children
        .into_iter()
        .fold(ProgressMetrics::default(), |mut acc, child| {
            acc.weeks += child.weeks;
            acc.weeks_done += child.weeks_done;
            acc.weeks_in_progress += child.weeks_in_progress;
            acc.weeks_todo += child.weeks_todo;
            acc.weeks_cancelled += child.weeks_cancelled;
            acc.weeks_postponed += child.weeks_postponed;
            acc.item_count += child.item_count;
            acc.item_done_count += child.item_done_count;
            acc
        });
    finalize(counters)
}

fn add_item(counters: &mut ProgressMetrics, item: &ReleaseItem) {
    let effort = item.effort;
    counters.item_count += 1;

    if item.status.counts_towards_effort() {
        counters.weeks += effort;
    }

    match item.status {
        ReleaseStatus::Done => {
            counters.weeks_done += effort;
            counters.item_done_count += 1;
        }
        ReleaseStatus::InProgress => counters.weeks_in_progress += effort,
        ReleaseStatus::Todo => counters.weeks_todo += effort,
        ReleaseStatus::Postponed => counters.weeks_postponed += effort,
        ReleaseStatus::Cancelled => counters.weeks_cancelled += effort,
        ReleaseStatus::Replanned | ReleaseStatus::Other(_) => {}
    }
}

/// Round the counters and derive every percentage from them.
fn finalize(counters: ProgressMetrics) -> ProgressMetrics {
    let weeks = round_weeks(counters.weeks);
    let weeks_done = round_weeks(counters.weeks_done);
    let weeks_in_progress = round_weeks(counters.weeks_in_progress);
    let weeks_cancelled = round_weeks(counters.weeks_cancelled);
    let weeks_postponed = round_weeks(counters.weeks_postponed);
    let weeks_not_to_do = weeks_postponed + weeks_cancelled;

    ProgressMetrics {
        weeks,
        weeks_done,
        weeks_in_progress,
        weeks_todo: round_weeks(counters.weeks_todo),
        weeks_not_to_do,
        weeks_cancelled,
        weeks_postponed,
        item_count: counters.item_count,
        item_done_count: counters.item_done_count,
        progress: percentage(weeks_done, weeks),
        progress_with_in_progress: percentage(weeks_done + weeks_in_progress, weeks),
        progress_by_items: count_percentage(counters.item_done_count, counters.item_count),
        percentage_not_to_do: percentage(weeks_not_to_do, weeks),
    }
}
