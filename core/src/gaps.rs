//! Temporal gap analyzer: turns a payment date sequence into day-gaps.
//!
//! Input is never assumed sorted. Unparseable dates are dropped.
//! Fewer than two valid dates yield an empty gap set.

use crate::ingest::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day-gaps between consecutive sorted dates. Length = valid dates - 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSet {
    gaps: Vec<i64>,
}

impl GapSet {
    /// Build from dates that may have failed to parse.
    pub fn from_optional(dates: &[Option<NaiveDate>]) -> Self {
        let valid: Vec<NaiveDate> = dates.iter().flatten().copied().collect();
        Self::from_dates(&valid)
    }

    /// Build from raw ledger text, dropping anything that does not parse.
    pub fn from_text<S: AsRef<str>>(dates: &[S]) -> Self {
        let parsed: Vec<Option<NaiveDate>> = dates.iter().map(|d| parse_date(d.as_ref())).collect();
        Self::from_optional(&parsed)
    }

    pub fn from_dates(dates: &[NaiveDate]) -> Self {
        if dates.len() < 2 {
            return Self::default();
        }
        let mut sorted = dates.to_vec();
        sorted.sort();
        let gaps = sorted
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .collect();
        Self { gaps }
    }

    /// Wrap precomputed gaps. Negative values are clamped to zero.
    pub fn from_gaps(gaps: Vec<i64>) -> Self {
        Self {
            gaps: gaps.into_iter().map(|g| g.max(0)).collect(),
        }
    }

    pub fn gaps(&self) -> &[i64] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.gaps.is_empty() {
            return None;
        }
        Some(self.gaps.iter().sum::<i64>() as f64 / self.gaps.len() as f64)
    }

    /// Share of gaps matching `pred`, 0 for an empty set.
    pub fn fraction(&self, pred: impl Fn(i64) -> bool) -> f64 {
        if self.gaps.is_empty() {
            return 0.0;
        }
        self.gaps.iter().filter(|g| pred(**g)).count() as f64 / self.gaps.len() as f64
    }

    /// Gap counts keyed by whole months (`gap / 30`, ties to even).
    pub fn month_histogram(&self) -> BTreeMap<i64, usize> {
        let mut hist = BTreeMap::new();
        for g in &self.gaps {
            let months = (*g as f64 / 30.0).round_ties_even() as i64;
            *hist.entry(months).or_insert(0) += 1;
        }
        hist
    }
}
