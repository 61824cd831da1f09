use crate::error::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};

// ── Gap windows ────────────────────────────────────────────────────

/// Inclusive range of day-gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub min: i64,
    pub max: i64,
}

impl DayWindow {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, days: i64) -> bool {
        self.min <= days && days <= self.max
    }
}

// ── Schedule classifier ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fewer valid events than this → Unknown.
    pub min_events: usize,
    pub monthly_window: DayWindow,
    pub quarterly_window: DayWindow,
    /// One silently skipped monthly period.
    pub double_monthly_window: DayWindow,
    /// One silently skipped quarterly period.
    pub double_quarterly_window: DayWindow,
    /// Credit a double-period gap earns toward its cadence score.
    pub double_gap_credit: f64,
    /// Best score below this → Irregular.
    pub irregular_threshold: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_events: 3,
            monthly_window: DayWindow::new(25, 35),
            quarterly_window: DayWindow::new(85, 95),
            double_monthly_window: DayWindow::new(55, 65),
            double_quarterly_window: DayWindow::new(175, 185),
            double_gap_credit: 0.5,
            irregular_threshold: 0.3,
        }
    }
}

// ── Fee structure classifier ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub min_amounts: usize,
    /// Pairs with a positive basis needed before rates are considered.
    pub min_basis_pairs: usize,
    pub flat_cv: f64,
    pub likely_flat_cv: f64,
    pub percentage_cv: f64,
    pub likely_percentage_cv: f64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            min_amounts: 2,
            min_basis_pairs: 2,
            flat_cv: 0.05,
            likely_flat_cv: 0.15,
            percentage_cv: 0.10,
            likely_percentage_cv: 0.25,
        }
    }
}

// ── Missing / makeup detectors ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingConfig {
    /// ± days within which an observed date satisfies an expected one.
    pub tolerance_days: i64,
}

impl Default for MissingConfig {
    fn default() -> Self {
        Self { tolerance_days: 15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeupConfig {
    /// Amount must exceed this multiple of the entity mean.
    pub ratio_threshold: f64,
    /// Missing dates at most this many days before the payment qualify.
    pub lookback_days: i64,
}

impl Default for MakeupConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: 1.8,
            lookback_days: 60,
        }
    }
}

// ── Aggregation / report ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Entities with at least this many missing events are called out.
    pub significant_missing_count: usize,
    /// Cap on dates listed per entity in text reports.
    pub max_dates_listed: usize,
    /// Cap on entity names listed per critical-issue group.
    pub max_entities_listed: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            significant_missing_count: 3,
            max_dates_listed: 5,
            max_entities_listed: 5,
        }
    }
}

// ── Root ───────────────────────────────────────────────────────────

/// Every tunable of an audit run. Immutable once handed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub schedule: ScheduleConfig,
    pub fee: FeeConfig,
    pub missing: MissingConfig,
    pub makeup: MakeupConfig,
    pub report: ReportConfig,
}

impl AuditConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AuditConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AuditResult<()> {
        let s = &self.schedule;
        for (name, w) in [
            ("monthly_window", s.monthly_window),
            ("quarterly_window", s.quarterly_window),
            ("double_monthly_window", s.double_monthly_window),
            ("double_quarterly_window", s.double_quarterly_window),
        ] {
            if w.min < 0 || w.min > w.max {
                return Err(invalid(format!(
                    "schedule.{name} must satisfy 0 <= min <= max (got {}..{})",
                    w.min, w.max
                )));
            }
        }
        if s.min_events < 3 {
            return Err(invalid("schedule.min_events must be at least 3".into()));
        }
        if !(0.0..=1.0).contains(&s.double_gap_credit) {
            return Err(invalid("schedule.double_gap_credit must lie in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&s.irregular_threshold) {
            return Err(invalid("schedule.irregular_threshold must lie in [0, 1]".into()));
        }

        let f = &self.fee;
        if f.min_amounts < 2 || f.min_basis_pairs < 2 {
            return Err(invalid("fee.min_amounts and fee.min_basis_pairs must be at least 2".into()));
        }
        if !(f.flat_cv > 0.0 && f.flat_cv <= f.likely_flat_cv) {
            return Err(invalid("fee: require 0 < flat_cv <= likely_flat_cv".into()));
        }
        if !(f.percentage_cv > 0.0 && f.percentage_cv <= f.likely_percentage_cv) {
            return Err(invalid(
                "fee: require 0 < percentage_cv <= likely_percentage_cv".into(),
            ));
        }

        if self.missing.tolerance_days < 0 {
            return Err(invalid("missing.tolerance_days must be non-negative".into()));
        }
        if self.makeup.ratio_threshold <= 0.0 || self.makeup.lookback_days <= 0 {
            return Err(invalid(
                "makeup.ratio_threshold and makeup.lookback_days must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> AuditError {
    AuditError::InvalidConfig { reason }
}
