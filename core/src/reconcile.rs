//! Reconciliation: inferred cadence / fee model vs recorded settings.
//!
//! RULE: inconclusive inferences never produce a mismatch.
//!   - Unknown / Irregular schedules are not compared.
//!   - Variable / Unknown fee labels are not compared.
//!   - An Unset recorded value is never mismatched.
//! Any *Flat label mismatches a recorded Percentage and any *Percentage
//! label mismatches a recorded Flat, "Likely" tiers included.

use crate::{
    fee::{FeeInference, FeeLabel},
    makeup::MakeupEvent,
    missing::MissingEventSet,
    schedule::{ScheduleInference, ScheduleLabel},
    types::{EntityRecord, RecordedFeeModel, RecordedSchedule},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FindingStatus {
    Analyzed,
    /// Entity listed but it has no current payments.
    NoPayments,
    /// Provider failed for this entity; excluded from aggregates.
    NoData { reason: String },
}

/// Advisory comparison of the inferred fee value with the recorded rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateComparison {
    pub recorded: f64,
    pub inferred: f64,
    /// `(inferred - recorded) / recorded`; `None` when recorded is zero.
    pub relative_delta: Option<f64>,
}

/// One entity's audit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub entity: EntityRecord,
    pub status: FindingStatus,
    pub event_count: usize,
    pub first_event: Option<NaiveDate>,
    pub last_event: Option<NaiveDate>,
    pub schedule: ScheduleInference,
    pub fee: FeeInference,
    pub missing: MissingEventSet,
    pub makeup: Vec<MakeupEvent>,
    pub schedule_mismatch: bool,
    pub fee_mismatch: bool,
    pub rate_comparison: Option<RateComparison>,
}

impl Finding {
    fn empty(entity: EntityRecord, status: FindingStatus) -> Self {
        Self {
            entity,
            status,
            event_count: 0,
            first_event: None,
            last_event: None,
            schedule: ScheduleInference::unknown(),
            fee: FeeInference::unknown(),
            missing: MissingEventSet::default(),
            makeup: Vec::new(),
            schedule_mismatch: false,
            fee_mismatch: false,
            rate_comparison: None,
        }
    }

    pub fn no_payments(entity: EntityRecord) -> Self {
        Self::empty(entity, FindingStatus::NoPayments)
    }

    pub fn no_data(entity: EntityRecord, reason: impl Into<String>) -> Self {
        Self::empty(
            entity,
            FindingStatus::NoData {
                reason: reason.into(),
            },
        )
    }

    /// False only for entities the provider failed on.
    pub fn is_counted(&self) -> bool {
        !matches!(self.status, FindingStatus::NoData { .. })
    }

    pub fn has_mismatch(&self) -> bool {
        self.schedule_mismatch || self.fee_mismatch
    }

    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    pub fn has_makeup(&self) -> bool {
        !self.makeup.is_empty()
    }
}

pub fn schedule_mismatch(inferred: ScheduleLabel, recorded: RecordedSchedule) -> bool {
    match (inferred, recorded) {
        (ScheduleLabel::Monthly, RecordedSchedule::Quarterly) => true,
        (ScheduleLabel::Quarterly, RecordedSchedule::Monthly) => true,
        _ => false,
    }
}

pub fn fee_mismatch(inferred: FeeLabel, recorded: RecordedFeeModel) -> bool {
    match recorded {
        RecordedFeeModel::Flat => inferred.is_percentage_family(),
        RecordedFeeModel::Percentage => inferred.is_flat_family(),
        RecordedFeeModel::Unset => false,
    }
}

/// Compare values only when the inferred family agrees with the recorded model.
pub fn compare_rate(fee: &FeeInference, entity: &EntityRecord) -> Option<RateComparison> {
    let family_agrees = match entity.recorded_fee_model {
        RecordedFeeModel::Flat => fee.label.is_flat_family(),
        RecordedFeeModel::Percentage => fee.label.is_percentage_family(),
        RecordedFeeModel::Unset => false,
    };
    if !family_agrees {
        return None;
    }
    let recorded = entity.recorded_rate?;
    let inferred = fee.inferred_value?;
    let relative_delta = (recorded != 0.0).then(|| (inferred - recorded) / recorded);
    Some(RateComparison {
        recorded,
        inferred,
        relative_delta,
    })
}

/// Assemble the finding for an entity with at least one payment.
pub fn reconcile(
    entity: EntityRecord,
    event_count: usize,
    dates: &[NaiveDate],
    schedule: ScheduleInference,
    fee: FeeInference,
    missing: MissingEventSet,
    makeup: Vec<MakeupEvent>,
) -> Finding {
    let schedule_mismatch = schedule_mismatch(schedule.label, entity.recorded_schedule);
    let fee_mismatch = fee_mismatch(fee.label, entity.recorded_fee_model);
    let rate_comparison = compare_rate(&fee, &entity);

    Finding {
        first_event: dates.iter().min().copied(),
        last_event: dates.iter().max().copied(),
        entity,
        status: FindingStatus::Analyzed,
        event_count,
        schedule,
        fee,
        missing,
        makeup,
        schedule_mismatch,
        fee_mismatch,
        rate_comparison,
    }
}
