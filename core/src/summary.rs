//! Cross-entity aggregation and severity ordering of findings.

use crate::{config::ReportConfig, reconcile::Finding, types::EntityKey};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Reference to an entity in a summary list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub key: EntityKey,
    pub label: String,
}

impl EntityRef {
    fn of(f: &Finding) -> Self {
        Self {
            key: f.entity.key,
            label: f.entity.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTally {
    pub entity: EntityRef,
    pub missing: usize,
}

/// Run-level totals. Skipped entities appear only in `skipped_entities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub total_entities: usize,
    pub skipped_entities: usize,
    pub schedule_mismatch_count: usize,
    pub schedule_mismatches: Vec<EntityRef>,
    pub fee_mismatch_count: usize,
    pub fee_mismatches: Vec<EntityRef>,
    pub entities_with_missing: usize,
    pub total_missing: usize,
    pub entities_with_makeup: usize,
    /// Entities at or above the significant-missing threshold, ordered
    /// like the findings.
    pub significant_missing: Vec<MissingTally>,
}

/// Fold findings into a summary. Expects findings already sorted.
pub fn aggregate(findings: &[Finding], config: &ReportConfig) -> AggregateSummary {
    let mut summary = AggregateSummary::default();

    for f in findings {
        if !f.is_counted() {
            summary.skipped_entities += 1;
            continue;
        }
        summary.total_entities += 1;

        if f.schedule_mismatch {
            summary.schedule_mismatch_count += 1;
            summary.schedule_mismatches.push(EntityRef::of(f));
        }
        if f.fee_mismatch {
            summary.fee_mismatch_count += 1;
            summary.fee_mismatches.push(EntityRef::of(f));
        }

        let missing = f.missing_count();
        if missing > 0 {
            summary.entities_with_missing += 1;
            summary.total_missing += missing;
        }
        if missing > 0 && missing >= config.significant_missing_count {
            summary.significant_missing.push(MissingTally {
                entity: EntityRef::of(f),
                missing,
            });
        }
        if f.has_makeup() {
            summary.entities_with_makeup += 1;
        }
    }

    summary
}

/// Severity order: any mismatch first, then any missing event, then by
/// label. Entity key breaks remaining ties.
pub fn severity_order(a: &Finding, b: &Finding) -> Ordering {
    b.has_mismatch()
        .cmp(&a.has_mismatch())
        .then_with(|| (b.missing_count() > 0).cmp(&(a.missing_count() > 0)))
        .then_with(|| a.entity.label.cmp(&b.entity.label))
        .then_with(|| a.entity.key.cmp(&b.entity.key))
}

pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(severity_order);
}
