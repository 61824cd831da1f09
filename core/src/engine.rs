//! The audit engine: one stateless pass per entity.
//!
//! PIPELINE (fixed order, per entity):
//!   1. Gap analyzer        dates → GapSet
//!   2. Schedule classifier GapSet → ScheduleInference
//!   3. Fee classifier      (amount, basis) → FeeInference
//!   4. Missing detector    dates + schedule → MissingEventSet
//!   5. Makeup detector     events + missing → MakeupEvent list
//!   6. Reconciliation      inferences vs recorded → Finding
//!
//! RULES:
//!   - Histories are read once per run, before any analysis.
//!   - No state survives between entities or between runs.
//!   - A provider failure skips that entity only.

use crate::{
    config::AuditConfig,
    error::AuditResult,
    fee::classify_fee,
    gaps::GapSet,
    makeup::detect_makeup,
    missing::detect_missing,
    provider::{DataProvider, EntityLoad},
    reconcile::{reconcile, Finding},
    schedule::classify_schedule,
    summary::{aggregate, sort_findings, AggregateSummary},
    types::{EntityHistory, EntityRecord},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// An entity the provider could not supply.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntity {
    pub entity: EntityRecord,
    pub reason: String,
}

pub type EntityOutcome = Result<Finding, SkippedEntity>;

/// Sorted findings plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub findings: Vec<Finding>,
    pub summary: AggregateSummary,
}

pub struct AuditEngine {
    config: AuditConfig,
}

impl AuditEngine {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Analyze one history. Pure: same history, same finding.
    pub fn analyze(&self, history: &EntityHistory) -> Finding {
        let entity = history.entity.clone();
        if history.events.is_empty() {
            log::debug!("entity={} no payments", entity.key);
            return Finding::no_payments(entity);
        }

        let dates = history.valid_dates();
        let gaps = GapSet::from_dates(&dates);
        let schedule = classify_schedule(&gaps, &self.config.schedule);

        let amounts: Vec<Option<f64>> = history.events.iter().map(|e| e.amount).collect();
        let basis: Vec<Option<f64>> = history.events.iter().map(|e| e.basis_value).collect();
        let fee = classify_fee(&amounts, &basis, &self.config.fee);

        let missing = detect_missing(&dates, &schedule, &self.config.missing);
        let makeup = detect_makeup(&history.events, &missing, &self.config.makeup);

        log::debug!(
            "entity={} events={} schedule={:?}({:.2}) fee={:?}({:.2}) missing={} makeup={}",
            entity.key,
            history.events.len(),
            schedule.label,
            schedule.confidence,
            fee.label,
            fee.confidence,
            missing.len(),
            makeup.len()
        );

        reconcile(
            entity,
            history.events.len(),
            &dates,
            schedule,
            fee,
            missing,
            makeup,
        )
    }

    /// Analyze one provider load, turning a fetch failure into a skip.
    pub fn analyze_load(&self, load: EntityLoad) -> EntityOutcome {
        match load.events {
            Ok(events) => Ok(self.analyze(&EntityHistory::new(load.entity, events))),
            Err(e) => Err(SkippedEntity {
                entity: load.entity,
                reason: e.to_string(),
            }),
        }
    }

    /// Analyze every load in parallel, then sort and aggregate.
    pub fn analyze_all(&self, loads: Vec<EntityLoad>) -> AuditOutcome {
        let outcomes: Vec<EntityOutcome> = loads
            .into_par_iter()
            .map(|load| self.analyze_load(load))
            .collect();

        let mut findings: Vec<Finding> = outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|skip| {
                    log::warn!("entity={} skipped: {}", skip.entity.key, skip.reason);
                    Finding::no_data(skip.entity, skip.reason)
                })
            })
            .collect();

        sort_findings(&mut findings);
        let summary = aggregate(&findings, &self.config.report);

        log::info!(
            "audit complete: {} entities, {} skipped, {} schedule / {} fee mismatches, {} missing",
            summary.total_entities,
            summary.skipped_entities,
            summary.schedule_mismatch_count,
            summary.fee_mismatch_count,
            summary.total_missing
        );

        AuditOutcome { findings, summary }
    }

    /// Full run: one bulk read from the provider, then analysis.
    pub fn run<P: DataProvider + ?Sized>(&self, provider: &P) -> AuditResult<AuditOutcome> {
        let loads = provider.load_histories()?;
        Ok(self.analyze_all(loads))
    }
}
