//! Audit events for every mutation that feeds back into reconciliation.
//!
//! RULE: Only the service layer emits events, inside the same store
//! transaction as the write they describe.

use crate::{
    academic_year::AcademicYear,
    model::BillingRef,
    types::{CustomFeeId, Money, PaymentId, StudentId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variants are appended over time; never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeEvent {
    CustomFeeCreated {
        custom_fee_id: CustomFeeId,
        student_id: StudentId,
        academic_year: AcademicYear,
        total_fee: Money,
        standard_fee: Option<Money>,
    },
    CustomFeeUpdated {
        custom_fee_id: CustomFeeId,
        student_id: StudentId,
        academic_year: AcademicYear,
        previous_total: Money,
        total_fee: Money,
    },
    PaymentRecorded {
        payment_id: PaymentId,
        billing: BillingRef,
        amount_paid: Money,
        offline: bool,
    },
    OfflinePaymentVerified {
        payment_id: PaymentId,
        billing: BillingRef,
        amount_paid: Money,
    },
    PromotionReverted {
        student_id: StudentId,
        academic_year: AcademicYear,
        from_class: String,
        from_section: String,
        to_class: String,
        to_section: String,
    },
}

impl FeeEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            FeeEvent::CustomFeeCreated { .. } => "custom_fee_created",
            FeeEvent::CustomFeeUpdated { .. } => "custom_fee_updated",
            FeeEvent::PaymentRecorded { .. } => "payment_recorded",
            FeeEvent::OfflinePaymentVerified { .. } => "offline_payment_verified",
            FeeEvent::PromotionReverted { .. } => "promotion_reverted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub student_id: StudentId,
    pub event_type: String,
    pub payload: String, // JSON-serialized FeeEvent
    pub recorded_at: DateTime<Utc>,
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<FeeEvent> {
        serde_json::from_str(&self.payload)
    }
}
