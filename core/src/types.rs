//! Shared primitive types used across the entire audit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a client row.
pub type ClientId = i64;

/// Primary key of a contract row.
pub type ContractId = i64;

/// Primary key of a payment row.
pub type PaymentId = i64;

/// The canonical audit run identifier.
pub type RunId = String;

/// One audited entity: a (client, contract) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub client_id: ClientId,
    pub contract_id: ContractId,
}

impl EntityKey {
    pub fn new(client_id: ClientId, contract_id: ContractId) -> Self {
        Self {
            client_id,
            contract_id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client_id, self.contract_id)
    }
}

/// Payment cadence as recorded on the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedSchedule {
    Monthly,
    Quarterly,
    Unset,
}

impl RecordedSchedule {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Unset => "Not set",
        }
    }
}

/// Fee model as recorded on the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedFeeModel {
    Flat,
    Percentage,
    Unset,
}

impl RecordedFeeModel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::Percentage => "Percentage",
            Self::Unset => "Not set",
        }
    }
}

/// Identity and recorded configuration of one active entity,
/// as listed by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub key: EntityKey,
    /// Client display name; the alphabetical sort key for findings.
    pub label: String,
    pub provider_name: Option<String>,
    pub recorded_schedule: RecordedSchedule,
    pub recorded_fee_model: RecordedFeeModel,
    /// Percent rate for percentage contracts, flat amount for flat ones.
    pub recorded_rate: Option<f64>,
}

/// A single historical payment, already mapped through the ingest seam.
///
/// Fields that failed to parse at the boundary are `None`; the classifiers
/// skip them rather than failing the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: Option<PaymentId>,
    pub date: Option<NaiveDate>,
    /// Fee charged.
    pub amount: Option<f64>,
    /// Assets under management the fee may be computed from.
    pub basis_value: Option<f64>,
}

impl PaymentEvent {
    pub fn new(date: NaiveDate, amount: f64, basis_value: Option<f64>) -> Self {
        Self {
            payment_id: None,
            date: Some(date),
            amount: Some(amount),
            basis_value,
        }
    }
}

/// Everything the engine needs to audit one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory {
    pub entity: EntityRecord,
    pub events: Vec<PaymentEvent>,
}

impl EntityHistory {
    /// Build a history with events sorted ascending by date.
    /// Undated events sort last; equal dates keep their input order.
    pub fn new(entity: EntityRecord, mut events: Vec<PaymentEvent>) -> Self {
        events.sort_by_key(|e| (e.date.is_none(), e.date));
        Self { entity, events }
    }

    /// Valid dates in ascending order. Duplicates are kept.
    pub fn valid_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.events.iter().filter_map(|e| e.date).collect();
        dates.sort();
        dates
    }
}
