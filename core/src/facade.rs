//! Reconciliation facade, the single entry point list and detail views use.
//!
//! Pipeline for one (student, academic year):
//!   class_resolver::resolve → fee_reconciler::reconcile → payment_status::aggregate
//!
//! Everything here is a pure function of its inputs. Callers fetch fresh
//! records and call again after any mutation.

use crate::{
    academic_year::AcademicYear,
    class_resolver::{self, Resolution},
    error::FeeResult,
    fee_reconciler::{self, BreakdownLine, FeeAdjustment, FeeReconciliation},
    model::{BillingRef, CustomFee, FeeStructure, PaymentRecord, Student},
    payment_status::{self, PaymentState, PaymentSummary},
    types::{Money, StudentId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything the facade needs for one query. Records for other students,
/// classes and years are allowed and ignored.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationInputs<'a> {
    pub student: &'a Student,
    pub academic_year: AcademicYear,
    pub as_of: NaiveDate,
    pub fee_structures: &'a [FeeStructure],
    pub custom_fees: &'a [CustomFee],
    pub payments: &'a [PaymentRecord],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub student_id: StudentId,
    pub academic_year: AcademicYear,
    pub display_class: Option<String>,
    pub display_section: Option<String>,
    pub is_in_academic_year: bool,
    pub standard_fee: Option<FeeStructure>,
    pub custom_fee: Option<CustomFee>,
    pub effective_fee: Option<Money>,
    pub discount: Option<Money>,
    pub adjustment: FeeAdjustment,
    pub breakdown_comparison: Vec<BreakdownLine>,
    /// Billing record the payment figures were computed against.
    pub billing: Option<BillingRef>,
    pub total_paid: Money,
    pub remaining: Money,
    pub percent_paid: u8,
    pub payment_state: PaymentState,
}

pub fn reconcile(inputs: &ReconciliationInputs<'_>) -> ReconciliationResult {
    let student = inputs.student;
    let year = inputs.academic_year;
    let current = AcademicYear::current(inputs.as_of);

    let resolution = class_resolver::resolve(student, year, current);
    let fees = fee_reconciler::reconcile(
        &resolution,
        &student.id,
        year,
        inputs.fee_structures,
        inputs.custom_fees,
    );

    let billing = billing_for(&fees, &student.id, year);
    let summary = match (fees.effective_fee, &billing) {
        (Some(fee), Some(billing)) => payment_status::aggregate(
            fee,
            inputs.payments.iter().filter(|p| &p.billing == billing),
        ),
        _ => PaymentSummary::not_applicable(),
    };

    log::debug!(
        "student={} year={year}: in_year={} effective={:?} paid={} state={:?}",
        student.id,
        resolution.is_in_academic_year,
        fees.effective_fee,
        summary.total_paid,
        summary.payment_state,
    );

    assemble(student.id.clone(), year, resolution, fees, billing, summary)
}

/// Same as [`reconcile`] but starting from a raw year label.
pub fn reconcile_label(
    student: &Student,
    academic_year: &str,
    as_of: NaiveDate,
    fee_structures: &[FeeStructure],
    custom_fees: &[CustomFee],
    payments: &[PaymentRecord],
) -> FeeResult<ReconciliationResult> {
    let academic_year = AcademicYear::parse(academic_year)?;
    Ok(reconcile(&ReconciliationInputs {
        student,
        academic_year,
        as_of,
        fee_structures,
        custom_fees,
        payments,
    }))
}

/// The billing record that carries payments for the effective fee.
fn billing_for(fees: &FeeReconciliation, student_id: &str, year: AcademicYear) -> Option<BillingRef> {
    match (&fees.custom_fee, &fees.standard_fee) {
        (Some(custom), _) => Some(BillingRef::custom(&custom.id)),
        (None, Some(_)) => Some(BillingRef::standard(student_id, year)),
        (None, None) => None,
    }
}

fn assemble(
    student_id: StudentId,
    academic_year: AcademicYear,
    resolution: Resolution,
    fees: FeeReconciliation,
    billing: Option<BillingRef>,
    summary: PaymentSummary,
) -> ReconciliationResult {
    let adjustment = fees.adjustment();
    ReconciliationResult {
        student_id,
        academic_year,
        display_class: resolution.display_class,
        display_section: resolution.display_section,
        is_in_academic_year: resolution.is_in_academic_year,
        standard_fee: fees.standard_fee,
        custom_fee: fees.custom_fee,
        effective_fee: fees.effective_fee,
        discount: fees.discount,
        adjustment,
        breakdown_comparison: fees.breakdown_comparison,
        billing,
        total_paid: summary.total_paid,
        remaining: summary.remaining,
        percent_paid: summary.percent_paid,
        payment_state: summary.payment_state,
    }
}

// ── Guards ─────────────────────────────────────────────────────────

/// Why a custom fee cannot be created or edited for a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFeeBlock {
    NotInAcademicYear,
    NoBillableStandardFee,
    DuplicateCustomFee,
    NoCustomFee,
    CustomFeeLocked,
}

impl fmt::Display for CustomFeeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CustomFeeBlock::NotInAcademicYear => "student is not enrolled in this academic year",
            CustomFeeBlock::NoBillableStandardFee => "no standard fee above zero exists for this class",
            CustomFeeBlock::DuplicateCustomFee => "a custom fee already exists for this student and year",
            CustomFeeBlock::NoCustomFee => "no custom fee exists for this student and year",
            CustomFeeBlock::CustomFeeLocked => "payments have already been recorded against the custom fee",
        };
        f.write_str(msg)
    }
}

/// First reason a new custom fee may not be created, if any.
pub fn custom_fee_block(result: &ReconciliationResult) -> Option<CustomFeeBlock> {
    if !result.is_in_academic_year {
        return Some(CustomFeeBlock::NotInAcademicYear);
    }
    if !result.standard_fee.as_ref().is_some_and(FeeStructure::is_billable) {
        return Some(CustomFeeBlock::NoBillableStandardFee);
    }
    if result.custom_fee.is_some() {
        return Some(CustomFeeBlock::DuplicateCustomFee);
    }
    None
}

pub fn can_create_custom_fee(result: &ReconciliationResult) -> bool {
    custom_fee_block(result).is_none()
}

/// First reason the existing custom fee may not be edited, if any.
pub fn custom_fee_edit_block(result: &ReconciliationResult) -> Option<CustomFeeBlock> {
    if result.custom_fee.is_none() {
        return Some(CustomFeeBlock::NoCustomFee);
    }
    if result.total_paid != Money::ZERO {
        return Some(CustomFeeBlock::CustomFeeLocked);
    }
    None
}

pub fn can_edit_custom_fee(result: &ReconciliationResult) -> bool {
    custom_fee_edit_block(result).is_none()
}
