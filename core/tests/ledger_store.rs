//! Integration tests for the SQLite ledger store and its ingest seam.

use feeaudit_core::{
    provider::DataProvider,
    reconcile::FindingStatus,
    store::{LedgerStore, NewContract, NewPayment},
    synth::{generate_ledger, seed_store},
    types::{RecordedFeeModel, RecordedSchedule},
    AuditConfig, AuditEngine,
};
use rusqlite::types::Value;

// ── Helpers ──────────────────────────────────────────────────────

fn store() -> LedgerStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let s = LedgerStore::in_memory().expect("in-memory store");
    s.migrate().expect("migration");
    s
}

fn contract(client_id: i64, schedule: &str, fee_type: Option<&str>) -> NewContract {
    NewContract {
        client_id,
        provider_name: Some("Empower".into()),
        payment_schedule: Some(schedule.into()),
        fee_type: fee_type.map(Into::into),
        flat_rate: Some(400.0),
        ..NewContract::default()
    }
}

fn pay(client_id: i64, contract_id: i64, date: &str, fee: f64) -> NewPayment {
    NewPayment {
        client_id,
        contract_id,
        received_date: date.into(),
        actual_fee: fee,
        total_assets: None,
    }
}

// ── Schema ───────────────────────────────────────────────────────

#[test]
fn migrate_is_idempotent() {
    let s = store();
    s.migrate().expect("second migration");
    assert_eq!(s.current_payment_count().unwrap(), 0);
}

#[test]
fn file_backed_ledger_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("fee-audit-{}.db", uuid::Uuid::new_v4()));
    let path = path.to_str().unwrap().to_string();
    {
        let s = LedgerStore::open(&path).expect("open file ledger");
        s.migrate().unwrap();
        let c = s.insert_client("Durable Co").unwrap();
        let k = s.insert_contract(&contract(c, "monthly", Some("flat"))).unwrap();
        s.insert_payment(&pay(c, k, "2023-01-15", 400.0)).unwrap();
    }
    let s = LedgerStore::open(&path).expect("reopen file ledger");
    assert_eq!(s.current_payment_count().unwrap(), 1);
    drop(s);
    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{path}{suffix}")).ok();
    }
}

#[test]
fn memory_uri_opens() {
    let s = LedgerStore::open(":memory:").expect("open :memory:");
    s.migrate().unwrap();
    assert_eq!(s.current_payment_count().unwrap(), 0);
}

// ── Listing ──────────────────────────────────────────────────────

#[test]
fn entities_list_alphabetically_with_parsed_settings() {
    let s = store();
    let zeta = s.insert_client("Zeta Co").unwrap();
    let alpha = s.insert_client("Alpha Co").unwrap();
    s.insert_contract(&contract(zeta, "Quarterly", Some("PERCENTAGE"))).unwrap();
    s.insert_contract(&contract(alpha, "monthly", Some("Flat"))).unwrap();

    let entities = s.list_active_entities().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].label, "Alpha Co");
    assert_eq!(entities[0].recorded_schedule, RecordedSchedule::Monthly);
    assert_eq!(entities[0].recorded_fee_model, RecordedFeeModel::Flat);
    assert_eq!(entities[0].recorded_rate, Some(400.0));
    assert_eq!(entities[1].recorded_schedule, RecordedSchedule::Quarterly);
    assert_eq!(entities[1].recorded_fee_model, RecordedFeeModel::Percentage);
    // Percentage contract without a percent rate.
    assert_eq!(entities[1].recorded_rate, None);
}

#[test]
fn unknown_recorded_values_are_unset() {
    let s = store();
    let c = s.insert_client("Odd Co").unwrap();
    s.insert_contract(&contract(c, "annually", None)).unwrap();
    let e = &s.list_active_entities().unwrap()[0];
    assert_eq!(e.recorded_schedule, RecordedSchedule::Unset);
    assert_eq!(e.recorded_fee_model, RecordedFeeModel::Unset);
}

#[test]
fn deactivated_contract_is_not_audited() {
    let s = store();
    let c = s.insert_client("Gone Co").unwrap();
    let k = s.insert_contract(&contract(c, "monthly", Some("flat"))).unwrap();
    s.deactivate_contract(k).unwrap();
    assert!(s.list_active_entities().unwrap().is_empty());
}

// ── Payments ─────────────────────────────────────────────────────

#[test]
fn retired_payments_are_invisible() {
    let s = store();
    let c = s.insert_client("Retire Co").unwrap();
    let k = s.insert_contract(&contract(c, "monthly", Some("flat"))).unwrap();
    let keep = s.insert_payment(&pay(c, k, "2023-01-15", 400.0)).unwrap();
    let retired = s.insert_payment(&pay(c, k, "2023-02-15", 400.0)).unwrap();
    s.retire_payment(retired).unwrap();

    assert_eq!(s.current_payment_count().unwrap(), 1);
    let key = s.list_active_entities().unwrap()[0].key;
    let events = s.get_events(key).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payment_id, Some(keep));
}

#[test]
fn malformed_fields_become_none() {
    let s = store();
    let c = s.insert_client("Legacy Co").unwrap();
    let k = s.insert_contract(&contract(c, "monthly", Some("flat"))).unwrap();
    s.insert_payment_raw(c, k, Value::Text("N/A".into()), Value::Text("abc".into()), Value::Null)
        .unwrap();
    s.insert_payment_raw(
        c,
        k,
        Value::Text("02/15/2023".into()),
        Value::Text("400.00".into()),
        Value::Text("-".into()),
    )
    .unwrap();
    s.insert_payment_raw(c, k, Value::Text("2023-03-15".into()), Value::Integer(400), Value::Real(1e5))
        .unwrap();

    let key = s.list_active_entities().unwrap()[0].key;
    let events = s.get_events(key).unwrap();
    assert_eq!(events.len(), 3);

    let undated: Vec<_> = events.iter().filter(|e| e.date.is_none()).collect();
    assert_eq!(undated.len(), 1);
    assert_eq!(undated[0].amount, None);

    let dated: Vec<_> = events.iter().filter(|e| e.date.is_some()).collect();
    assert!(dated.iter().all(|e| e.amount == Some(400.0)));
    assert_eq!(dated.iter().filter_map(|e| e.basis_value).collect::<Vec<_>>(), vec![1e5]);
}

/// A ledger of bad rows still yields a finding rather than an error.
#[test]
fn malformed_history_still_audits() {
    let s = store();
    let c = s.insert_client("Mess Co").unwrap();
    let k = s.insert_contract(&contract(c, "monthly", Some("flat"))).unwrap();
    for raw in ["", "None", "not a date"] {
        s.insert_payment_raw(c, k, Value::Text(raw.into()), Value::Text("x".into()), Value::Null)
            .unwrap();
    }
    let outcome = AuditEngine::new(AuditConfig::default()).run(&s).unwrap();
    let f = &outcome.findings[0];
    assert_eq!(f.status, FindingStatus::Analyzed);
    assert_eq!(f.event_count, 3);
    assert!(!f.has_mismatch());
    assert_eq!(f.missing_count(), 0);
}

// ── End to end ───────────────────────────────────────────────────

#[test]
fn seeded_ledger_audits_every_client() {
    let s = store();
    let ledger = generate_ledger(2024, 30).unwrap();
    let written = seed_store(&s, &ledger).unwrap();

    let expected: usize = ledger.iter().map(|c| c.payments.len()).sum();
    assert_eq!(written, expected);
    assert_eq!(s.current_payment_count().unwrap(), expected as i64);

    let outcome = AuditEngine::new(AuditConfig::default()).run(&s).unwrap();
    assert_eq!(outcome.summary.total_entities, 30);
    assert_eq!(outcome.summary.skipped_entities, 0);
    assert!(outcome.summary.total_missing >= outcome.summary.entities_with_missing);
}
