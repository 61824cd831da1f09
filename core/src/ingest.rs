//! Boundary mapping from loosely-typed ledger rows to `PaymentEvent`.
//!
//! RULE: this is the only place that coerces raw column values.
//! Malformed fields become `None` here; classifiers never see raw values.

use crate::types::{EntityKey, PaymentEvent, PaymentId, RecordedFeeModel, RecordedSchedule};
use chrono::NaiveDate;
use rusqlite::types::Value;

/// Text values the ledger uses to mean "no value".
const SENTINELS: [&str; 6] = ["", "-", "N/A", "n/a", "None", "null"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// One payment row exactly as the store returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPaymentRow {
    pub payment_id: Option<PaymentId>,
    pub received_date: Value,
    pub actual_fee: Value,
    pub total_assets: Value,
}

impl RawPaymentRow {
    /// Map into a typed event, defaulting malformed fields to `None`.
    pub fn to_event(&self, entity: EntityKey) -> PaymentEvent {
        let date = date_from_value(&self.received_date);
        if date.is_none() && !is_blank(&self.received_date) {
            log::warn!(
                "entity={entity} payment={:?}: unparseable date {:?}, dropped",
                self.payment_id,
                self.received_date
            );
        }

        let amount = amount_from_value(&self.actual_fee);
        if amount.is_none() && !is_blank(&self.actual_fee) {
            log::warn!(
                "entity={entity} payment={:?}: unparseable fee {:?}, ignored",
                self.payment_id,
                self.actual_fee
            );
        }

        PaymentEvent {
            payment_id: self.payment_id,
            date,
            amount,
            basis_value: amount_from_value(&self.total_assets),
        }
    }
}

/// Parse a ledger date. Accepts `YYYY-MM-DD` and `MM/DD/YYYY`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if SENTINELS.contains(&text) {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse a numeric text value. Sentinels and non-finite numbers yield `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    if SENTINELS.contains(&text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn date_from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Text(s) => parse_date(s),
        _ => None,
    }
}

pub fn amount_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(r) if r.is_finite() => Some(*r),
        Value::Text(s) => parse_amount(s),
        _ => None,
    }
}

pub fn parse_recorded_schedule(raw: Option<&str>) -> RecordedSchedule {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("monthly") => RecordedSchedule::Monthly,
        Some("quarterly") => RecordedSchedule::Quarterly,
        _ => RecordedSchedule::Unset,
    }
}

pub fn parse_recorded_fee_model(raw: Option<&str>) -> RecordedFeeModel {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("flat") => RecordedFeeModel::Flat,
        Some("percentage") => RecordedFeeModel::Percentage,
        _ => RecordedFeeModel::Unset,
    }
}

/// Pick the recorded rate that belongs to the recorded fee model.
pub fn recorded_rate(
    model: RecordedFeeModel,
    percent_rate: &Value,
    flat_rate: &Value,
) -> Option<f64> {
    match model {
        RecordedFeeModel::Percentage => amount_from_value(percent_rate),
        RecordedFeeModel::Flat => amount_from_value(flat_rate),
        RecordedFeeModel::Unset => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => SENTINELS.contains(&s.trim()),
        _ => false,
    }
}
