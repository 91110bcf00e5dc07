//! Fee desk. The mutations whose results feed back into reconciliation.
//!
//! Custom fee mutations re-run the facade on freshly fetched records and check
//! its guard before writing. Each write and its audit event commit in one
//! transaction.

use crate::{
    academic_year::{self, AcademicYear},
    config::EngineConfig,
    error::{FeeError, FeeResult},
    event::{EventLogEntry, FeeEvent},
    facade::{self, ReconciliationInputs, ReconciliationResult},
    model::{
        validate_custom_amounts, BillingRef, Breakdown, CustomFee, FeeFrequency, FeeStructure,
        PaymentMethod, PaymentRecord, PaymentStatus, PromotionRecord, PromotionType,
    },
    source::{CustomFeeFilter, FeeStructureFilter, RecordSource},
    store::FeeStore,
    types::Money,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Editable terms of a custom fee, as submitted by a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFeeDraft {
    pub total_fee: Money,
    #[serde(default)]
    pub breakdown: Breakdown,
    pub frequency: FeeFrequency,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub late_fee_per_day: Money,
    pub reason: Option<String>,
}

impl CustomFeeDraft {
    pub fn validate(&self) -> FeeResult<()> {
        validate_custom_amounts(self.total_fee, &self.breakdown, self.late_fee_per_day)
    }
}

/// Fetch everything one query needs from `source` and run the facade.
/// Only payments whose status the config counts reach the aggregator.
pub fn reconcile_from_source<S: RecordSource + ?Sized>(
    source: &S,
    config: &EngineConfig,
    student_id: &str,
    academic_year: &str,
    as_of: NaiveDate,
) -> FeeResult<ReconciliationResult> {
    let year = AcademicYear::parse(academic_year)?;
    let student = source.get_student(student_id)?;
    let fee_structures = source.list_fee_structures(&FeeStructureFilter::for_year(year))?;
    let custom_fees =
        source.list_custom_fees(&CustomFeeFilter::for_student_year(student_id, year))?;

    let mut payments = source.list_payments(&BillingRef::standard(student_id, year))?;
    for custom in &custom_fees {
        payments.extend(source.list_payments(&BillingRef::custom(&custom.id))?);
    }
    payments.retain(|p| config.counts_payment(p.status));

    Ok(facade::reconcile(&ReconciliationInputs {
        student: &student,
        academic_year: year,
        as_of,
        fee_structures: &fee_structures,
        custom_fees: &custom_fees,
        payments: &payments,
    }))
}

pub struct FeeDesk<'a> {
    store: &'a FeeStore,
    config: EngineConfig,
}

impl<'a> FeeDesk<'a> {
    pub fn new(store: &'a FeeStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn reconcile(
        &self,
        student_id: &str,
        academic_year: &str,
        as_of: NaiveDate,
    ) -> FeeResult<ReconciliationResult> {
        reconcile_from_source(self.store, &self.config, student_id, academic_year, as_of)
    }

    /// Academic years offered in year pickers, newest first.
    pub fn year_options(&self, today: NaiveDate) -> Vec<AcademicYear> {
        let window = &self.config.year_window;
        academic_year::year_options(window.before, window.after, today)
    }

    // ── Custom fees ────────────────────────────────────────────────

    /// Create a custom fee for (student, year). Blocked unless a billable
    /// standard fee exists and no custom fee exists yet.
    pub fn create_custom_fee(
        &self,
        student_id: &str,
        academic_year: &str,
        draft: CustomFeeDraft,
        now: DateTime<Utc>,
    ) -> FeeResult<CustomFee> {
        draft.validate()?;
        let result = self.reconcile(student_id, academic_year, now.date_naive())?;
        if let Some(block) = facade::custom_fee_block(&result) {
            log::warn!("student={student_id} year={academic_year}: custom fee blocked: {block}");
            return Err(FeeError::CustomFeeBlocked(block));
        }

        let standard_total = result.standard_fee.as_ref().and_then(|s| s.total_fee);
        let custom = CustomFee {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            academic_year: result.academic_year,
            total_fee: draft.total_fee,
            breakdown: draft.breakdown,
            frequency: draft.frequency,
            due_date: draft.due_date,
            late_fee_per_day: draft.late_fee_per_day,
            reason: draft.reason,
            display_class: result.display_class.clone(),
            display_section: result.display_section.clone(),
            actual_fee: standard_total,
        };
        self.store.in_transaction(|store| {
            store.insert_custom_fee(&custom)?;
            self.emit(
                student_id,
                FeeEvent::CustomFeeCreated {
                    custom_fee_id: custom.id.clone(),
                    student_id: custom.student_id.clone(),
                    academic_year: custom.academic_year,
                    total_fee: custom.total_fee,
                    standard_fee: standard_total,
                },
                now,
            )
        })?;
        log::info!(
            "student={student_id} year={}: custom fee {} created ({} vs standard {:?})",
            custom.academic_year,
            custom.id,
            custom.total_fee,
            standard_total,
        );
        Ok(custom)
    }

    /// Replace the terms of an existing custom fee. Blocked once any
    /// counted payment has been recorded against it.
    pub fn update_custom_fee(
        &self,
        custom_fee_id: &str,
        draft: CustomFeeDraft,
        now: DateTime<Utc>,
    ) -> FeeResult<CustomFee> {
        draft.validate()?;
        let existing = self
            .store
            .custom_fee(custom_fee_id)?
            .ok_or_else(|| FeeError::CustomFeeNotFound {
                id: custom_fee_id.to_string(),
            })?;

        let result = self.reconcile(
            &existing.student_id,
            &existing.academic_year.to_string(),
            now.date_naive(),
        )?;
        if let Some(block) = facade::custom_fee_edit_block(&result) {
            log::warn!("custom fee {custom_fee_id}: edit blocked: {block}");
            return Err(FeeError::CustomFeeBlocked(block));
        }

        let updated = CustomFee {
            total_fee: draft.total_fee,
            breakdown: draft.breakdown,
            frequency: draft.frequency,
            due_date: draft.due_date,
            late_fee_per_day: draft.late_fee_per_day,
            reason: draft.reason,
            ..existing.clone()
        };
        self.store.in_transaction(|store| {
            store.update_custom_fee_terms(&updated)?;
            self.emit(
                &updated.student_id,
                FeeEvent::CustomFeeUpdated {
                    custom_fee_id: updated.id.clone(),
                    student_id: updated.student_id.clone(),
                    academic_year: updated.academic_year,
                    previous_total: existing.total_fee,
                    total_fee: updated.total_fee,
                },
                now,
            )
        })?;
        log::info!(
            "custom fee {custom_fee_id}: total {} -> {}",
            existing.total_fee,
            updated.total_fee
        );
        Ok(updated)
    }

    // ── Payments ───────────────────────────────────────────────────

    /// Record a payment. Online payments are paid immediately; offline
    /// payments wait as `pending` until verified. The amount must be positive
    /// and a standard-fee payment needs a billable standard fee.
    pub fn record_payment(
        &self,
        billing: BillingRef,
        amount_paid: Money,
        method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> FeeResult<PaymentRecord> {
        if amount_paid <= Money::ZERO {
            return Err(FeeError::InvalidRecord {
                record: "payment",
                reason: format!("amount must be positive, got {amount_paid}"),
            });
        }
        let student_id = self.payable_student(&billing, now.date_naive())?;
        let (status, paid_at) = match method {
            PaymentMethod::Online => (PaymentStatus::Paid, Some(now)),
            PaymentMethod::Offline => (PaymentStatus::Pending, None),
        };
        let payment = PaymentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            billing,
            amount_paid,
            status,
            method,
            paid_at,
        };
        self.store.in_transaction(|store| {
            store.insert_payment(&payment)?;
            self.emit(
                &student_id,
                FeeEvent::PaymentRecorded {
                    payment_id: payment.id.clone(),
                    billing: payment.billing.clone(),
                    amount_paid,
                    offline: method == PaymentMethod::Offline,
                },
                now,
            )
        })?;
        log::info!(
            "student={student_id}: payment {} of {amount_paid} recorded ({})",
            payment.id,
            status.as_str()
        );
        Ok(payment)
    }

    /// Mark a pending offline payment as paid.
    pub fn verify_offline_payment(
        &self,
        payment_id: &str,
        now: DateTime<Utc>,
    ) -> FeeResult<PaymentRecord> {
        let payment = self
            .store
            .payment(payment_id)?
            .ok_or_else(|| FeeError::PaymentNotFound {
                id: payment_id.to_string(),
            })?;
        if payment.status != PaymentStatus::Pending {
            return Err(FeeError::PaymentNotPending {
                id: payment_id.to_string(),
            });
        }

        let student_id = self.student_for_billing(&payment.billing)?;
        self.store.in_transaction(|store| {
            if !store.mark_payment_paid(payment_id, now)? {
                return Err(FeeError::PaymentNotPending {
                    id: payment_id.to_string(),
                });
            }
            self.emit(
                &student_id,
                FeeEvent::OfflinePaymentVerified {
                    payment_id: payment.id.clone(),
                    billing: payment.billing.clone(),
                    amount_paid: payment.amount_paid,
                },
                now,
            )
        })?;
        log::info!("student={student_id}: offline payment {payment_id} verified");

        Ok(PaymentRecord {
            status: PaymentStatus::Paid,
            paid_at: Some(now),
            ..payment
        })
    }

    // ── Promotions ─────────────────────────────────────────────────

    /// Revert the student's live promotion in `academic_year`: append a
    /// revert record back to the class held before it, flag the promotion
    /// as reverted and, if the student still sits in the promoted class,
    /// move them back.
    pub fn revert_promotion(
        &self,
        student_id: &str,
        academic_year: &str,
        now: DateTime<Utc>,
    ) -> FeeResult<PromotionRecord> {
        let year = AcademicYear::parse(academic_year)?;
        let student = self.store.get_student(student_id)?;
        let promotion = student
            .promotion_history
            .iter()
            .find(|r| {
                r.academic_year == year && r.promotion_type == PromotionType::Promoted && !r.reverted
            })
            .ok_or_else(|| FeeError::PromotionNotFound {
                student_id: student_id.to_string(),
                academic_year: year.to_string(),
            })?;

        let revert = PromotionRecord {
            academic_year: year,
            promotion_type: PromotionType::Reverted,
            from_class: promotion.to_class.clone(),
            from_section: promotion.to_section.clone(),
            to_class: promotion.from_class.clone(),
            to_section: promotion.from_section.clone(),
            reverted: false,
        };
        let moves_student = student.current_class == promotion.to_class
            && student.current_section == promotion.to_section;

        self.store.in_transaction(|store| {
            store.insert_promotion_record(student_id, &revert)?;
            store.mark_promotions_reverted(student_id, year)?;
            if moves_student {
                store.update_student_class(student_id, &revert.to_class, &revert.to_section)?;
            }
            self.emit(
                student_id,
                FeeEvent::PromotionReverted {
                    student_id: student_id.to_string(),
                    academic_year: year,
                    from_class: revert.from_class.clone(),
                    from_section: revert.from_section.clone(),
                    to_class: revert.to_class.clone(),
                    to_section: revert.to_section.clone(),
                },
                now,
            )
        })?;
        log::info!(
            "student={student_id} year={year}: promotion {}/{} -> {}/{} reverted",
            revert.to_class,
            revert.to_section,
            revert.from_class,
            revert.from_section,
        );
        Ok(revert)
    }

    pub fn events_for_student(&self, student_id: &str) -> FeeResult<Vec<FeeEvent>> {
        self.store
            .events_for_student(student_id)?
            .iter()
            .map(|e| e.decode().map_err(FeeError::from))
            .collect()
    }

    /// Student a new payment against `billing` belongs to, refusing
    /// standard-fee billing without a billable standard fee.
    fn payable_student(&self, billing: &BillingRef, as_of: NaiveDate) -> FeeResult<String> {
        let BillingRef::StandardFee {
            student_id,
            academic_year,
        } = billing
        else {
            return self.student_for_billing(billing);
        };
        let result = self.reconcile(student_id, &academic_year.to_string(), as_of)?;
        if !result.standard_fee.as_ref().is_some_and(FeeStructure::is_billable) {
            return Err(FeeError::InvalidRecord {
                record: "payment",
                reason: format!(
                    "no billable standard fee for student {student_id} in {academic_year}"
                ),
            });
        }
        Ok(student_id.clone())
    }

    fn student_for_billing(&self, billing: &BillingRef) -> FeeResult<String> {
        match billing {
            BillingRef::StandardFee { student_id, .. } => {
                self.store.get_student(student_id)?;
                Ok(student_id.clone())
            }
            BillingRef::CustomFee { custom_fee_id } => self
                .store
                .custom_fee(custom_fee_id)?
                .map(|c| c.student_id)
                .ok_or_else(|| FeeError::CustomFeeNotFound {
                    id: custom_fee_id.clone(),
                }),
        }
    }

    fn emit(&self, student_id: &str, event: FeeEvent, now: DateTime<Utc>) -> FeeResult<()> {
        let entry = EventLogEntry {
            id: None,
            student_id: student_id.to_string(),
            event_type: event.type_name().to_string(),
            payload: serde_json::to_string(&event)?,
            recorded_at: now,
        };
        self.store.append_event(&entry)
    }
}
