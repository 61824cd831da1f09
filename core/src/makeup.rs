//! Makeup-event detector: large payments that may cover missed ones.
//!
//! A payment is a makeup candidate when its amount exceeds
//! `ratio_threshold × mean dated amount` and at least one missing date falls
//! strictly before it, no more than `lookback_days` earlier. Advisory
//! only: the missing set is never changed.

use crate::{config::MakeupConfig, missing::MissingEventSet, types::PaymentEvent};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeupEvent {
    pub date: NaiveDate,
    pub amount: f64,
    pub ratio_to_mean: f64,
    /// Missing dates this payment may offset, ascending.
    pub candidate_missing_dates: Vec<NaiveDate>,
}

pub fn detect_makeup(
    events: &[PaymentEvent],
    missing: &MissingEventSet,
    config: &MakeupConfig,
) -> Vec<MakeupEvent> {
    if missing.is_empty() {
        return Vec::new();
    }

    // Undated payments take no part, not even in the mean.
    let mut dated: Vec<(NaiveDate, f64)> = events
        .iter()
        .filter_map(|e| Some((e.date?, e.amount?)))
        .filter(|(_, a)| a.is_finite())
        .collect();
    if dated.is_empty() {
        return Vec::new();
    }
    let mean = dated.iter().map(|(_, a)| a).sum::<f64>() / dated.len() as f64;
    if !mean.is_finite() || mean <= 0.0 {
        return Vec::new();
    }
    dated.sort_by_key(|(d, _)| *d);

    let threshold = mean * config.ratio_threshold;
    dated
        .into_iter()
        .filter(|(_, amount)| *amount > threshold)
        .filter_map(|(date, amount)| {
            let candidates: Vec<NaiveDate> = missing
                .missing
                .iter()
                .copied()
                .filter(|md| {
                    let days_before = (date - *md).num_days();
                    days_before > 0 && days_before <= config.lookback_days
                })
                .collect();
            (!candidates.is_empty()).then(|| MakeupEvent {
                date,
                amount,
                ratio_to_mean: amount / mean,
                candidate_missing_dates: candidates,
            })
        })
        .collect()
}
