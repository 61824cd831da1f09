//! Integration tests for report rendering and emission.

use chrono::{Months, NaiveDate};
use feeaudit_core::{
    config::ReportConfig,
    report::{emit, fmt_currency, fmt_percentage, list_dates},
    types::{EntityKey, EntityRecord, PaymentEvent, RecordedFeeModel, RecordedSchedule},
    AuditConfig, AuditEngine, AuditError, AuditReport, MemoryProvider, ReportFormat,
};

// ── Helpers ──────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn entity(id: i64, label: &str, schedule: RecordedSchedule) -> EntityRecord {
    EntityRecord {
        key: EntityKey::new(id, id),
        label: label.into(),
        provider_name: Some("Ascensus".into()),
        recorded_schedule: schedule,
        recorded_fee_model: RecordedFeeModel::Flat,
        recorded_rate: Some(300.0),
    }
}

fn monthly(n: u32) -> Vec<PaymentEvent> {
    (0..n)
        .map(|k| PaymentEvent::new(d(2022, 1, 10) + Months::new(k), 300.0, None))
        .collect()
}

fn sample_report() -> AuditReport {
    let provider = MemoryProvider::new()
        .with_entity(entity(1, "Keystone Law Partners", RecordedSchedule::Quarterly), monthly(12))
        .with_entity(entity(2, "Pioneer Realty Inc", RecordedSchedule::Monthly), Vec::new());
    let config = AuditConfig::default();
    let outcome = AuditEngine::new(config.clone()).run(&provider).unwrap();
    AuditReport::new(outcome, config.report)
}

// ── Renderings ───────────────────────────────────────────────────

#[test]
fn text_report_describes_mismatches_and_empty_entities() {
    let text = sample_report().render_text();
    assert!(text.contains("Total Entities Analyzed: 2"));
    assert!(text.contains("CLIENT: Keystone Law Partners (ID: 1)"));
    assert!(text.contains("** MISMATCH DETECTED: Data suggests Monthly, record says Quarterly"));
    assert!(text.contains("Inferred Amount: $300.00"));
    assert!(text.contains("STATUS: No payments found for this entity."));
}

#[test]
fn table_report_lists_critical_issues() {
    let table = sample_report().render_table();
    assert!(table.contains("CRITICAL ISSUES"));
    assert!(table.contains("Schedule mismatches (1): Keystone Law Partners"));
    assert!(table.contains("no payments"));
}

#[test]
fn json_report_carries_run_metadata() {
    let report = sample_report();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert!(json["run_id"].as_str().unwrap().starts_with("audit-"));
    assert_eq!(json["findings"].as_array().unwrap().len(), 2);
    assert_eq!(json["summary"]["total_entities"], 2);
    assert_eq!(json["findings"][0]["schedule_mismatch"], true);
    assert_eq!(json["findings"][1]["status"]["status"], "no_payments");
}

#[test]
fn long_date_lists_are_truncated() {
    let dates: Vec<NaiveDate> = (1..=7).map(|m| d(2023, m, 1)).collect();
    let listed = list_dates(&dates, ReportConfig::default().max_dates_listed);
    assert_eq!(
        listed,
        "2023-01-01, 2023-02-01, 2023-03-01, 2023-04-01, 2023-05-01 (plus 2 more)"
    );
    assert_eq!(list_dates(&dates[..2], 5), "2023-01-01, 2023-02-01");
}

#[test]
fn money_and_rates_format_for_humans() {
    assert_eq!(fmt_currency(1234.5), "$1,234.50");
    assert_eq!(fmt_currency(1_000_000.0), "$1,000,000.00");
    assert_eq!(fmt_currency(12.0), "$12.00");
    assert_eq!(fmt_percentage(0.0025), "0.250%");
}

#[test]
fn report_format_parses_case_insensitively() {
    assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
    assert_eq!("table".parse::<ReportFormat>().unwrap(), ReportFormat::Table);
    assert!(matches!(
        "xml".parse::<ReportFormat>(),
        Err(AuditError::InvalidConfig { .. })
    ));
}

// ── Emission ─────────────────────────────────────────────────────

#[test]
fn emit_writes_the_rendered_report() {
    let report = sample_report();
    let path = std::env::temp_dir().join(format!("fee-audit-{}.txt", uuid::Uuid::new_v4()));
    let path = path.to_str().unwrap().to_string();

    emit(&report, ReportFormat::Table, &path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, report.render_table());
    std::fs::remove_file(&path).ok();
}

#[test]
fn unwritable_path_is_a_report_emission_error() {
    let report = sample_report();
    let path = std::env::temp_dir()
        .join(format!("missing-dir-{}", uuid::Uuid::new_v4()))
        .join("report.txt");
    let err = emit(&report, ReportFormat::Text, path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, AuditError::ReportEmission { .. }), "{err}");
}
