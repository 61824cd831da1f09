//! Fee structure classifier: flat amount vs percentage of basis.
//!
//! Consistency is judged by coefficient of variation (population
//! standard deviation / mean). With fewer than `min_basis_pairs`
//! positive-basis pairs, only the amounts are judged. Otherwise the
//! per-payment rate (amount / basis) is judged first, and when neither
//! rate tier holds, whichever of amount CV and rate CV is lower wins at
//! reduced confidence.
//!
//! Any mean ≤ 0 or non-finite statistic resolves to `Unknown`.

use crate::config::FeeConfig;
use serde::{Deserialize, Serialize};

const HIGH_CONFIDENCE: f64 = 0.9;
const MEDIUM_CONFIDENCE: f64 = 0.7;
const FALLBACK_CONFIDENCE: f64 = 0.6;
const VARIABLE_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeLabel {
    Flat,
    LikelyFlat,
    Percentage,
    LikelyPercentage,
    Variable,
    Unknown,
}

impl FeeLabel {
    pub fn is_flat_family(&self) -> bool {
        matches!(self, Self::Flat | Self::LikelyFlat)
    }

    pub fn is_percentage_family(&self) -> bool {
        matches!(self, Self::Percentage | Self::LikelyPercentage)
    }

    /// True when the label carries enough evidence to compare against
    /// a recorded fee model.
    pub fn is_conclusive(&self) -> bool {
        self.is_flat_family() || self.is_percentage_family()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::LikelyFlat => "Likely Flat",
            Self::Percentage => "Percentage",
            Self::LikelyPercentage => "Likely Percentage",
            Self::Variable => "Variable",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consistency {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeInference {
    pub label: FeeLabel,
    /// In [0, 1].
    pub confidence: f64,
    /// Mean amount for flat labels, mean rate for percentage labels.
    pub inferred_value: Option<f64>,
    /// The CV that decided the label.
    pub cv: Option<f64>,
    pub consistency: Option<Consistency>,
}

impl FeeInference {
    pub fn unknown() -> Self {
        Self {
            label: FeeLabel::Unknown,
            confidence: 0.0,
            inferred_value: None,
            cv: None,
            consistency: None,
        }
    }

    fn decided(
        label: FeeLabel,
        confidence: f64,
        inferred_value: Option<f64>,
        cv: f64,
        consistency: Consistency,
    ) -> Self {
        Self {
            label,
            confidence,
            inferred_value,
            cv: Some(cv),
            consistency: Some(consistency),
        }
    }
}

/// Mean and coefficient of variation of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub mean: f64,
    pub cv: f64,
}

/// Population mean/CV. `None` when empty, mean ≤ 0, or anything non-finite.
pub fn spread(values: &[f64]) -> Option<Spread> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if !mean.is_finite() || mean <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;
    cv.is_finite().then_some(Spread { mean, cv })
}

/// Classify the fee model of one entity.
///
/// `amounts` and `basis_values` are positionally paired; a missing
/// amount drops that position from both.
pub fn classify_fee(
    amounts: &[Option<f64>],
    basis_values: &[Option<f64>],
    config: &FeeConfig,
) -> FeeInference {
    let clean: Vec<f64> = amounts
        .iter()
        .flatten()
        .copied()
        .filter(|a| a.is_finite())
        .collect();
    if clean.len() < config.min_amounts.max(2) {
        return FeeInference::unknown();
    }

    let pairs: Vec<(f64, f64)> = amounts
        .iter()
        .zip(basis_values)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() && *b > 0.0 => Some((*a, *b)),
            _ => None,
        })
        .collect();

    if pairs.len() < config.min_basis_pairs.max(2) {
        classify_by_amount(&clean, config)
    } else {
        classify_by_rate(&clean, &pairs, config)
    }
}

fn classify_by_amount(amounts: &[f64], config: &FeeConfig) -> FeeInference {
    let Some(s) = spread(amounts) else {
        return FeeInference::unknown();
    };

    if s.cv < config.flat_cv {
        FeeInference::decided(FeeLabel::Flat, HIGH_CONFIDENCE, Some(s.mean), s.cv, Consistency::High)
    } else if s.cv < config.likely_flat_cv {
        FeeInference::decided(
            FeeLabel::LikelyFlat,
            MEDIUM_CONFIDENCE,
            Some(s.mean),
            s.cv,
            Consistency::Medium,
        )
    } else {
        FeeInference::decided(FeeLabel::Variable, VARIABLE_CONFIDENCE, None, s.cv, Consistency::Low)
    }
}

fn classify_by_rate(amounts: &[f64], pairs: &[(f64, f64)], config: &FeeConfig) -> FeeInference {
    let rates: Vec<f64> = pairs.iter().map(|(a, b)| a / b).collect();
    let Some(rate) = spread(&rates) else {
        return FeeInference::unknown();
    };

    if rate.cv < config.percentage_cv {
        return FeeInference::decided(
            FeeLabel::Percentage,
            HIGH_CONFIDENCE,
            Some(rate.mean),
            rate.cv,
            Consistency::High,
        );
    }
    if rate.cv < config.likely_percentage_cv {
        return FeeInference::decided(
            FeeLabel::LikelyPercentage,
            MEDIUM_CONFIDENCE,
            Some(rate.mean),
            rate.cv,
            Consistency::Medium,
        );
    }

    let Some(amount) = spread(amounts) else {
        return FeeInference::unknown();
    };
    if amount.cv < rate.cv {
        FeeInference::decided(
            FeeLabel::LikelyFlat,
            FALLBACK_CONFIDENCE,
            Some(amount.mean),
            amount.cv,
            Consistency::Medium,
        )
    } else {
        FeeInference::decided(
            FeeLabel::LikelyPercentage,
            FALLBACK_CONFIDENCE,
            Some(rate.mean),
            rate.cv,
            Consistency::Medium,
        )
    }
}
