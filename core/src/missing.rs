//! Missing-event detector.
//!
//! Projects an expected calendar from the first observed date, stepping
//! one classified period (in calendar months) from each projected date,
//! up to the last observed date. Month-end clipping carries forward:
//! Jan 31 → Feb 28 → Mar 28. An expected date is missing when no
//! observed date lies within the tolerance window.

use crate::{config::MissingConfig, schedule::ScheduleInference};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEventSet {
    /// Every projected date, ascending.
    pub expected: Vec<NaiveDate>,
    /// Projected dates with no observed match, ascending.
    pub missing: Vec<NaiveDate>,
}

impl MissingEventSet {
    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Detect missing events. `dates` need not be sorted.
/// No-op for non-periodic schedules or fewer than two dates.
pub fn detect_missing(
    dates: &[NaiveDate],
    schedule: &ScheduleInference,
    config: &MissingConfig,
) -> MissingEventSet {
    let Some(period) = schedule.label.period_months() else {
        return MissingEventSet::default();
    };
    if dates.len() < 2 {
        return MissingEventSet::default();
    }

    let mut sorted = dates.to_vec();
    sorted.sort();
    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    let expected = project_calendar(first, last, period);
    let missing = expected
        .iter()
        .copied()
        .filter(|exp| !has_match(&sorted, *exp, config.tolerance_days))
        .collect();

    MissingEventSet { expected, missing }
}

/// `first`, then one period after each projected date, while ≤ `last`.
pub fn project_calendar(first: NaiveDate, last: NaiveDate, period_months: u32) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    if period_months == 0 {
        return out;
    }
    let mut current = Some(first);
    while let Some(date) = current.filter(|d| *d <= last) {
        out.push(date);
        current = date.checked_add_months(Months::new(period_months));
    }
    out
}

/// True if any of the sorted `observed` dates is within ±`tolerance` days.
fn has_match(observed: &[NaiveDate], expected: NaiveDate, tolerance: i64) -> bool {
    observed
        .iter()
        .any(|d| (*d - expected).num_days().abs() <= tolerance)
}
