//! Integration tests for reconciliation and aggregation.
//!
//! Tests verify:
//! 1. Conclusive inferences that contradict the record are mismatches
//! 2. Inconclusive inferences and unset records never mismatch
//! 3. Findings sort by severity, then label
//! 4. Provider failures skip one entity and stay out of the totals

use chrono::{Months, NaiveDate};
use feeaudit_core::{
    config::ReportConfig,
    fee::FeeLabel,
    reconcile::{fee_mismatch, schedule_mismatch, FindingStatus},
    schedule::ScheduleLabel,
    summary::aggregate,
    types::{EntityKey, EntityRecord, PaymentEvent, RecordedFeeModel, RecordedSchedule},
    AuditConfig, AuditEngine, MemoryProvider,
};

// ── Helpers ──────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn entity(id: i64, label: &str, schedule: RecordedSchedule, fee: RecordedFeeModel) -> EntityRecord {
    EntityRecord {
        key: EntityKey::new(id, id * 10),
        label: label.into(),
        provider_name: Some("Voya".into()),
        recorded_schedule: schedule,
        recorded_fee_model: fee,
        recorded_rate: None,
    }
}

/// `n` payments of `amount` every `step` months from Jan 2022, skipping `skip`.
fn series(n: u32, step: u32, amount: f64, skip: &[u32]) -> Vec<PaymentEvent> {
    (0..n)
        .filter(|k| !skip.contains(k))
        .map(|k| {
            let date = d(2022, 1, 10) + Months::new(k * step);
            PaymentEvent::new(date, amount, None)
        })
        .collect()
}

fn engine() -> AuditEngine {
    AuditEngine::new(AuditConfig::default())
}

// ── Mismatch rules ───────────────────────────────────────────────

#[test]
fn monthly_history_recorded_quarterly_is_a_schedule_mismatch() {
    let provider = MemoryProvider::new().with_entity(
        entity(1, "Cedar Law Group", RecordedSchedule::Quarterly, RecordedFeeModel::Flat),
        series(12, 1, 400.0, &[]),
    );
    let outcome = engine().run(&provider).unwrap();
    let f = &outcome.findings[0];
    assert_eq!(f.schedule.label, ScheduleLabel::Monthly);
    assert!(f.schedule_mismatch);
    assert!(!f.fee_mismatch);
    assert_eq!(outcome.summary.schedule_mismatch_count, 1);
}

#[test]
fn flat_history_recorded_percentage_is_a_fee_mismatch() {
    let provider = MemoryProvider::new().with_entity(
        entity(1, "Cedar Law Group", RecordedSchedule::Monthly, RecordedFeeModel::Percentage),
        series(12, 1, 400.0, &[]),
    );
    let f = &engine().run(&provider).unwrap().findings[0];
    assert_eq!(f.fee.label, FeeLabel::Flat);
    assert!(f.fee_mismatch);
    assert!(!f.schedule_mismatch);
}

#[test]
fn likely_tiers_still_mismatch() {
    assert!(fee_mismatch(FeeLabel::LikelyFlat, RecordedFeeModel::Percentage));
    assert!(fee_mismatch(FeeLabel::LikelyPercentage, RecordedFeeModel::Flat));
    assert!(!fee_mismatch(FeeLabel::LikelyFlat, RecordedFeeModel::Flat));
}

#[test]
fn inconclusive_inferences_never_mismatch() {
    for recorded in [RecordedSchedule::Monthly, RecordedSchedule::Quarterly] {
        assert!(!schedule_mismatch(ScheduleLabel::Irregular, recorded));
        assert!(!schedule_mismatch(ScheduleLabel::Unknown, recorded));
    }
    for recorded in [RecordedFeeModel::Flat, RecordedFeeModel::Percentage] {
        assert!(!fee_mismatch(FeeLabel::Variable, recorded));
        assert!(!fee_mismatch(FeeLabel::Unknown, recorded));
    }
}

#[test]
fn unset_record_never_mismatches() {
    for label in [
        FeeLabel::Flat,
        FeeLabel::LikelyFlat,
        FeeLabel::Percentage,
        FeeLabel::LikelyPercentage,
        FeeLabel::Variable,
        FeeLabel::Unknown,
    ] {
        assert!(!fee_mismatch(label, RecordedFeeModel::Unset), "{label:?}");
    }
    for label in [ScheduleLabel::Monthly, ScheduleLabel::Quarterly] {
        assert!(!schedule_mismatch(label, RecordedSchedule::Unset));
    }
}

#[test]
fn matching_rate_yields_near_zero_deviation() {
    let mut e = entity(1, "Summit Realty Co", RecordedSchedule::Quarterly, RecordedFeeModel::Percentage);
    e.recorded_rate = Some(0.0025);
    let events = vec![
        PaymentEvent::new(d(2023, 1, 15), 250.0, Some(100_000.0)),
        PaymentEvent::new(d(2023, 4, 15), 300.0, Some(120_000.0)),
        PaymentEvent::new(d(2023, 7, 15), 375.0, Some(150_000.0)),
    ];
    let provider = MemoryProvider::new().with_entity(e, events);
    let f = &engine().run(&provider).unwrap().findings[0];

    assert_eq!(f.fee.label, FeeLabel::Percentage);
    assert!(!f.fee_mismatch);
    let rc = f.rate_comparison.as_ref().expect("rate comparison");
    assert!(rc.relative_delta.unwrap().abs() < 1e-9);
}

// ── Ordering and aggregation ─────────────────────────────────────

#[test]
fn findings_sort_by_severity_then_label() {
    let provider = MemoryProvider::new()
        .with_entity(
            entity(1, "Zeta Printing Inc", RecordedSchedule::Quarterly, RecordedFeeModel::Flat),
            series(12, 1, 300.0, &[]),
        )
        .with_entity(
            entity(2, "Alpha Medical Co", RecordedSchedule::Monthly, RecordedFeeModel::Flat),
            series(12, 1, 300.0, &[]),
        )
        .with_entity(
            entity(3, "Beta Logistics LLC", RecordedSchedule::Monthly, RecordedFeeModel::Flat),
            series(12, 1, 300.0, &[5]),
        )
        .with_entity(
            entity(4, "Gamma Dental Group", RecordedSchedule::Quarterly, RecordedFeeModel::Flat),
            series(12, 1, 300.0, &[]),
        );

    let outcome = engine().run(&provider).unwrap();
    let labels: Vec<&str> = outcome
        .findings
        .iter()
        .map(|f| f.entity.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec!["Gamma Dental Group", "Zeta Printing Inc", "Beta Logistics LLC", "Alpha Medical Co"]
    );
    assert_eq!(outcome.summary.total_entities, 4);
    assert_eq!(outcome.summary.schedule_mismatch_count, 2);
    assert_eq!(outcome.summary.entities_with_missing, 1);
    assert_eq!(outcome.summary.total_missing, 1);
}

#[test]
fn provider_failure_skips_only_that_entity() {
    let broken = entity(2, "Broken Co", RecordedSchedule::Monthly, RecordedFeeModel::Flat);
    let provider = MemoryProvider::new()
        .with_entity(
            entity(1, "Healthy Co", RecordedSchedule::Monthly, RecordedFeeModel::Flat),
            series(6, 1, 250.0, &[]),
        )
        .with_entity(broken.clone(), series(6, 1, 250.0, &[]))
        .with_failure(broken.key);

    let outcome = engine().run(&provider).unwrap();
    assert_eq!(outcome.findings.len(), 2);
    assert_eq!(outcome.summary.total_entities, 1);
    assert_eq!(outcome.summary.skipped_entities, 1);

    let skipped = outcome
        .findings
        .iter()
        .find(|f| f.entity.key == broken.key)
        .unwrap();
    assert!(matches!(skipped.status, FindingStatus::NoData { .. }));
    assert!(!skipped.has_mismatch());
}

#[test]
fn entity_without_payments_is_counted_but_clean() {
    let provider = MemoryProvider::new().with_entity(
        entity(1, "Empty Co", RecordedSchedule::Monthly, RecordedFeeModel::Flat),
        Vec::new(),
    );
    let outcome = engine().run(&provider).unwrap();
    let f = &outcome.findings[0];
    assert_eq!(f.status, FindingStatus::NoPayments);
    assert_eq!(f.event_count, 0);
    assert_eq!(outcome.summary.total_entities, 1);
    assert_eq!(outcome.summary.total_missing, 0);
}

#[test]
fn significant_missing_lists_entities_at_threshold() {
    let provider = MemoryProvider::new()
        .with_entity(
            entity(1, "Three Gaps Co", RecordedSchedule::Monthly, RecordedFeeModel::Flat),
            series(24, 1, 300.0, &[3, 9, 15]),
        )
        .with_entity(
            entity(2, "One Gap Co", RecordedSchedule::Monthly, RecordedFeeModel::Flat),
            series(24, 1, 300.0, &[10]),
        );
    let outcome = engine().run(&provider).unwrap();
    let sig = &outcome.summary.significant_missing;
    assert_eq!(sig.len(), 1);
    assert_eq!(sig[0].entity.label, "Three Gaps Co");
    assert_eq!(sig[0].missing, 3);
    assert_eq!(outcome.summary.total_missing, 4);
}

#[test]
fn aggregate_of_nothing_is_zero() {
    let summary = aggregate(&[], &ReportConfig::default());
    assert_eq!(summary.total_entities, 0);
    assert!(summary.schedule_mismatches.is_empty());
}
