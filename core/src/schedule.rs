//! Schedule classifier: infers payment cadence from a gap set.
//!
//! Each gap is bucketed as near-monthly, near-quarterly, or a double
//! period (one skipped payment). Double gaps earn partial credit:
//!   score = single_fraction + credit · double_fraction
//! The higher score wins and becomes the confidence. A winning score
//! below the irregular threshold relabels the result `Irregular`.

use crate::{config::ScheduleConfig, gaps::GapSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleLabel {
    Monthly,
    Quarterly,
    Irregular,
    Unknown,
}

impl ScheduleLabel {
    /// True for labels a projection calendar can be built from.
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::Monthly | Self::Quarterly)
    }

    /// Calendar months between expected payments.
    pub fn period_months(&self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::Irregular | Self::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Irregular => "Irregular",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInference {
    pub label: ScheduleLabel,
    /// In [0, 1].
    pub confidence: f64,
    pub mean_gap: Option<f64>,
    pub monthly_fraction: f64,
    pub quarterly_fraction: f64,
    /// Gap counts in whole months.
    pub gap_months: BTreeMap<i64, usize>,
}

impl ScheduleInference {
    pub fn unknown() -> Self {
        Self {
            label: ScheduleLabel::Unknown,
            confidence: 0.0,
            mean_gap: None,
            monthly_fraction: 0.0,
            quarterly_fraction: 0.0,
            gap_months: BTreeMap::new(),
        }
    }
}

/// Classify a gap set. Needs at least `min_events - 1` gaps (never fewer than 2).
pub fn classify_schedule(gaps: &GapSet, config: &ScheduleConfig) -> ScheduleInference {
    let min_gaps = config.min_events.saturating_sub(1).max(2);
    if gaps.len() < min_gaps {
        return ScheduleInference::unknown();
    }
    let Some(mean_gap) = gaps.mean() else {
        return ScheduleInference::unknown();
    };

    let monthly_fraction = gaps.fraction(|g| config.monthly_window.contains(g));
    let quarterly_fraction = gaps.fraction(|g| config.quarterly_window.contains(g));
    let double_monthly = gaps.fraction(|g| config.double_monthly_window.contains(g));
    let double_quarterly = gaps.fraction(|g| config.double_quarterly_window.contains(g));

    let monthly_score = monthly_fraction + config.double_gap_credit * double_monthly;
    let quarterly_score = quarterly_fraction + config.double_gap_credit * double_quarterly;

    // Ties go to Quarterly; both zero ends up Irregular anyway.
    let (mut label, confidence) = if monthly_score > quarterly_score {
        (ScheduleLabel::Monthly, monthly_score)
    } else {
        (ScheduleLabel::Quarterly, quarterly_score)
    };
    if confidence < config.irregular_threshold {
        label = ScheduleLabel::Irregular;
    }

    ScheduleInference {
        label,
        confidence: confidence.clamp(0.0, 1.0),
        mean_gap: Some(mean_gap),
        monthly_fraction,
        quarterly_fraction,
        gap_months: gaps.month_histogram(),
    }
}
