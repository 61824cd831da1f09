//! Synthetic ledger generation for demos and tests.
//!
//! Each client gets a true cadence and fee model, then a payment history
//! with date jitter, occasionally skipped periods, makeup payments after a
//! skip, and a drifting asset base. A minority of contracts record the
//! wrong settings so the audit has something to find.
//!
//! Same seed and client count → identical ledger.

use crate::{
    error::AuditResult,
    rng::LedgerRng,
    store::{LedgerStore, NewContract, NewPayment},
};
use chrono::{Duration, Months, NaiveDate};

const SKIP_PROBABILITY: f64 = 0.08;
const MAKEUP_PROBABILITY: f64 = 0.5;
const WRONG_SETTING_PROBABILITY: f64 = 0.15;
const UNSET_FEE_TYPE_PROBABILITY: f64 = 0.05;

const PREFIXES: [&str; 12] = [
    "Harbor", "Summit", "Cedar", "Pioneer", "Liberty", "Granite", "Lakeside", "Northwind",
    "Keystone", "Riverbend", "Oakridge", "Bluewater",
];
const INDUSTRIES: [&str; 10] = [
    "Dental", "Engineering", "Logistics", "Medical", "Construction", "Law", "Realty",
    "Veterinary", "Printing", "Landscaping",
];
const SUFFIXES: [&str; 6] = ["Group", "LLC", "Partners", "Inc", "Associates", "Co"];
const PROVIDERS: [&str; 5] = ["Ascensus", "John Hancock", "Voya", "Empower", "Principal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrueSchedule {
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrueFeeModel {
    Flat,
    Percentage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPayment {
    pub date: NaiveDate,
    pub fee: f64,
    pub assets: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticClient {
    pub name: String,
    pub provider: String,
    pub true_schedule: TrueSchedule,
    pub true_fee_model: TrueFeeModel,
    pub recorded_schedule: Option<String>,
    pub recorded_fee_type: Option<String>,
    pub percent_rate: Option<f64>,
    pub flat_rate: Option<f64>,
    pub payments: Vec<SyntheticPayment>,
    /// Periods deliberately left unpaid.
    pub skipped_periods: usize,
}

pub fn generate_ledger(seed: u64, clients: usize) -> AuditResult<Vec<SyntheticClient>> {
    let epoch = NaiveDate::from_ymd_opt(2021, 1, 1)
        .ok_or_else(|| anyhow::anyhow!("invalid synthetic epoch"))?;
    Ok((0..clients as u64)
        .map(|i| generate_client(&mut LedgerRng::for_stream(seed, i), epoch))
        .collect())
}

fn generate_client(rng: &mut LedgerRng, epoch: NaiveDate) -> SyntheticClient {
    let name = business_name(rng);
    let provider = rng.pick(&PROVIDERS).copied().unwrap_or("Unknown").to_string();

    let true_schedule = if rng.chance(0.6) {
        TrueSchedule::Monthly
    } else {
        TrueSchedule::Quarterly
    };
    let true_fee_model = if rng.chance(0.5) {
        TrueFeeModel::Flat
    } else {
        TrueFeeModel::Percentage
    };

    let (period_months, periods) = match true_schedule {
        TrueSchedule::Monthly => (1u32, rng.range_i64(18, 36)),
        TrueSchedule::Quarterly => (3u32, rng.range_i64(6, 12)),
    };

    let flat_amount = rng.range_i64(250, 2500) as f64;
    // Per-period rate: annual 0.4%–1.2% spread over the periods of a year.
    let annual_rate = rng.pick(&[0.004, 0.006, 0.008, 0.010, 0.012]).copied().unwrap_or(0.008);
    let periodic_rate = annual_rate * period_months as f64 / 12.0;
    let mut assets = rng.range_f64(100_000.0, 2_000_000.0).round();
    let report_assets = match true_fee_model {
        TrueFeeModel::Percentage => 0.9,
        TrueFeeModel::Flat => 0.5,
    };

    let start = epoch + Duration::days(rng.range_i64(0, 27));
    let mut payments = Vec::new();
    let mut skipped_periods = 0;
    let mut owed_periods = 0u32;

    for k in 0..periods as u32 {
        assets = (assets * rng.range_f64(0.97, 1.035)).round();
        let period_fee = match true_fee_model {
            TrueFeeModel::Flat => flat_amount,
            TrueFeeModel::Percentage => round_cents(assets * periodic_rate),
        };

        // Never skip the first or last period so the calendar spans the history.
        if k > 0 && k + 1 < periods as u32 && rng.chance(SKIP_PROBABILITY) {
            skipped_periods += 1;
            if rng.chance(MAKEUP_PROBABILITY) {
                owed_periods += 1;
            }
            continue;
        }

        let Some(due) = start.checked_add_months(Months::new(k * period_months)) else {
            continue;
        };
        let date = due + Duration::days(rng.range_i64(-5, 5));
        let fee = period_fee * (1 + owed_periods) as f64;
        owed_periods = 0;

        payments.push(SyntheticPayment {
            date,
            fee,
            assets: rng.chance(report_assets).then_some(assets),
        });
    }

    let recorded_schedule = {
        let truth = match true_schedule {
            TrueSchedule::Monthly => "monthly",
            TrueSchedule::Quarterly => "quarterly",
        };
        let wrong = match true_schedule {
            TrueSchedule::Monthly => "quarterly",
            TrueSchedule::Quarterly => "monthly",
        };
        Some(if rng.chance(WRONG_SETTING_PROBABILITY) { wrong } else { truth }.to_string())
    };

    let recorded_fee_type = if rng.chance(UNSET_FEE_TYPE_PROBABILITY) {
        None
    } else {
        let flipped = rng.chance(WRONG_SETTING_PROBABILITY);
        let as_flat = (true_fee_model == TrueFeeModel::Flat) != flipped;
        Some(if as_flat { "flat" } else { "percentage" }.to_string())
    };

    let (percent_rate, flat_rate) = match recorded_fee_type.as_deref() {
        Some("percentage") => (Some(periodic_rate), None),
        Some("flat") => (None, Some(flat_amount)),
        _ => (None, None),
    };

    SyntheticClient {
        name,
        provider,
        true_schedule,
        true_fee_model,
        recorded_schedule,
        recorded_fee_type,
        percent_rate,
        flat_rate,
        payments,
        skipped_periods,
    }
}

fn business_name(rng: &mut LedgerRng) -> String {
    let prefix = rng.pick(&PREFIXES).copied().unwrap_or("Acme");
    let industry = rng.pick(&INDUSTRIES).copied().unwrap_or("Services");
    let suffix = rng.pick(&SUFFIXES).copied().unwrap_or("Co");
    format!("{prefix} {industry} {suffix}")
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Write a synthetic ledger into `store`. Returns payments written.
pub fn seed_store(store: &LedgerStore, ledger: &[SyntheticClient]) -> AuditResult<usize> {
    store.in_transaction(|s| {
        let mut written = 0;
        for client in ledger {
            let client_id = s.insert_client(&client.name)?;
            let contract_id = s.insert_contract(&NewContract {
                client_id,
                provider_name: Some(client.provider.clone()),
                payment_schedule: client.recorded_schedule.clone(),
                fee_type: client.recorded_fee_type.clone(),
                percent_rate: client.percent_rate,
                flat_rate: client.flat_rate,
            })?;
            for p in &client.payments {
                s.insert_payment(&NewPayment {
                    client_id,
                    contract_id,
                    received_date: p.date.format("%Y-%m-%d").to_string(),
                    actual_fee: p.fee,
                    total_assets: p.assets,
                })?;
                written += 1;
            }
        }
        log::info!("seeded {} clients, {written} payments", ledger.len());
        Ok(written)
    })
}
