//! End-to-end reconciliation for one student/year and the custom fee guards.

use chrono::NaiveDate;
use feeledger_core::{
    academic_year::AcademicYear,
    error::FeeError,
    facade::{
        can_create_custom_fee, can_edit_custom_fee, custom_fee_block, custom_fee_edit_block,
        reconcile, reconcile_label, CustomFeeBlock, ReconciliationInputs, ReconciliationResult,
    },
    fee_reconciler::FeeAdjustment,
    model::{
        BillingRef, CustomFee, FeeFrequency, FeeStructure, PaymentMethod, PaymentRecord,
        PaymentStatus, PromotionRecord, PromotionType, Student,
    },
    payment_status::PaymentState,
    types::Money,
};
use rust_decimal_macros::dec;

fn y(label: &str) -> AcademicYear {
    AcademicYear::parse(label).unwrap()
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

/// Promoted 5A → 6A during 2023-2024; now in 6A.
fn student() -> Student {
    Student {
        id: "S-1".into(),
        name: None,
        current_class: "6".into(),
        current_section: "A".into(),
        promotion_history: vec![PromotionRecord {
            academic_year: y("2023-2024"),
            promotion_type: PromotionType::Promoted,
            from_class: "5".into(),
            from_section: "A".into(),
            to_class: "6".into(),
            to_section: "A".into(),
            reverted: false,
        }],
    }
}

fn structures() -> Vec<FeeStructure> {
    vec![
        FeeStructure {
            class: "5".into(),
            section: "A".into(),
            academic_year: y("2023-2024"),
            total_fee: Some(dec!(9000)),
            breakdown: Default::default(),
        },
        FeeStructure {
            class: "6".into(),
            section: "A".into(),
            academic_year: y("2024-2025"),
            total_fee: Some(dec!(10000)),
            breakdown: Default::default(),
        },
        FeeStructure {
            class: "6".into(),
            section: "A".into(),
            academic_year: y("2022-2023"),
            total_fee: Some(Money::ZERO),
            breakdown: Default::default(),
        },
    ]
}

fn custom_fee(total: Money) -> CustomFee {
    CustomFee {
        id: "CF-1".into(),
        student_id: "S-1".into(),
        academic_year: y("2024-2025"),
        total_fee: total,
        breakdown: Default::default(),
        frequency: FeeFrequency::Quarterly,
        due_date: NaiveDate::from_ymd_opt(2024, 7, 10),
        late_fee_per_day: dec!(10),
        reason: Some("staff ward".into()),
        display_class: Some("6".into()),
        display_section: Some("A".into()),
        actual_fee: Some(dec!(10000)),
    }
}

fn pay(id: &str, billing: BillingRef, amount: Money) -> PaymentRecord {
    PaymentRecord {
        id: id.into(),
        billing,
        amount_paid: amount,
        status: PaymentStatus::Paid,
        method: PaymentMethod::Online,
        paid_at: None,
    }
}

fn run(
    year: &str,
    custom_fees: &[CustomFee],
    payments: &[PaymentRecord],
) -> ReconciliationResult {
    let s = student();
    let fs = structures();
    reconcile(&ReconciliationInputs {
        student: &s,
        academic_year: y(year),
        as_of: as_of(),
        fee_structures: &fs,
        custom_fees,
        payments,
    })
}

#[test]
fn standard_fee_year_uses_carried_forward_class() {
    let payments = vec![pay("P-1", BillingRef::standard("S-1", y("2024-2025")), dec!(2500))];
    let r = run("2024-2025", &[], &payments);

    assert!(r.is_in_academic_year);
    assert_eq!(r.display_class.as_deref(), Some("6"));
    assert_eq!(r.effective_fee, Some(dec!(10000)));
    assert_eq!(r.discount, Some(Money::ZERO));
    assert_eq!(r.billing, Some(BillingRef::standard("S-1", y("2024-2025"))));
    assert_eq!(r.total_paid, dec!(2500));
    assert_eq!(r.remaining, dec!(7500));
    assert_eq!(r.percent_paid, 25);
    assert_eq!(r.payment_state, PaymentState::Partial);
}

#[test]
fn promotion_year_bills_the_class_before_promotion() {
    let r = run("2023-2024", &[], &[]);
    assert_eq!(r.display_class.as_deref(), Some("5"));
    assert_eq!(r.effective_fee, Some(dec!(9000)));
    assert_eq!(r.payment_state, PaymentState::Unpaid);
}

#[test]
fn custom_fee_replaces_standard_and_uses_its_own_payments() {
    let customs = vec![custom_fee(dec!(8000))];
    let payments = vec![
        pay("P-1", BillingRef::standard("S-1", y("2024-2025")), dec!(5000)),
        pay("P-2", BillingRef::custom("CF-1"), dec!(8000)),
    ];
    let r = run("2024-2025", &customs, &payments);

    assert_eq!(r.effective_fee, Some(dec!(8000)));
    assert_eq!(r.discount, Some(dec!(2000)));
    assert_eq!(r.adjustment, FeeAdjustment::Discount(dec!(2000)));
    assert_eq!(r.billing, Some(BillingRef::custom("CF-1")));
    assert_eq!(r.total_paid, dec!(8000));
    assert_eq!(r.percent_paid, 100);
    assert_eq!(r.payment_state, PaymentState::Paid);
}

#[test]
fn future_year_is_not_applicable() {
    let r = run("2030-2031", &[], &[]);
    assert!(!r.is_in_academic_year);
    assert_eq!(r.effective_fee, None);
    assert_eq!(r.billing, None);
    assert_eq!(r.total_paid, Money::ZERO);
    assert_eq!(r.payment_state, PaymentState::Unpaid);
    assert_eq!(custom_fee_block(&r), Some(CustomFeeBlock::NotInAcademicYear));
    assert!(!can_create_custom_fee(&r));
}

#[test]
fn custom_fee_allowed_only_with_billable_standard_fee_and_no_existing_override() {
    let allowed = run("2024-2025", &[], &[]);
    assert!(can_create_custom_fee(&allowed));
    assert_eq!(custom_fee_block(&allowed), None);

    let duplicate = run("2024-2025", &[custom_fee(dec!(8000))], &[]);
    assert!(!can_create_custom_fee(&duplicate));
    assert_eq!(custom_fee_block(&duplicate), Some(CustomFeeBlock::DuplicateCustomFee));

    // Zero standard total in 2022-2023.
    let zero = run("2022-2023", &[], &[]);
    assert!(zero.is_in_academic_year);
    assert!(!can_create_custom_fee(&zero));
    assert_eq!(custom_fee_block(&zero), Some(CustomFeeBlock::NoBillableStandardFee));

    // No structure at all for 2019-2020.
    let missing = run("2019-2020", &[], &[]);
    assert_eq!(missing.standard_fee, None);
    assert_eq!(custom_fee_block(&missing), Some(CustomFeeBlock::NoBillableStandardFee));
}

#[test]
fn custom_fee_edit_locked_once_paid() {
    let customs = vec![custom_fee(dec!(8000))];

    let unpaid = run("2024-2025", &customs, &[]);
    assert!(can_edit_custom_fee(&unpaid));

    let payments = vec![pay("P-9", BillingRef::custom("CF-1"), dec!(100))];
    let paid = run("2024-2025", &customs, &payments);
    assert!(!can_edit_custom_fee(&paid));
    assert_eq!(custom_fee_edit_block(&paid), Some(CustomFeeBlock::CustomFeeLocked));

    let none = run("2024-2025", &[], &[]);
    assert_eq!(custom_fee_edit_block(&none), Some(CustomFeeBlock::NoCustomFee));
}

#[test]
fn zero_custom_fee_waiver_reads_as_paid() {
    let r = run("2024-2025", &[custom_fee(Money::ZERO)], &[]);
    assert_eq!(r.effective_fee, Some(Money::ZERO));
    assert_eq!(r.discount, Some(dec!(10000)));
    assert_eq!(r.percent_paid, 0);
    assert_eq!(r.payment_state, PaymentState::Paid);
}

#[test]
fn reconcile_label_rejects_malformed_year() {
    let s = student();
    let err = reconcile_label(&s, "2024-25", as_of(), &structures(), &[], &[]).unwrap_err();
    assert!(matches!(err, FeeError::MalformedYearLabel { .. }), "got {err:?}");

    let ok = reconcile_label(&s, "2024-2025", as_of(), &structures(), &[], &[]).unwrap();
    assert_eq!(ok, run("2024-2025", &[], &[]));
}

#[test]
fn reconciliation_does_not_mutate_inputs() {
    let s = student();
    let fs = structures();
    let customs = vec![custom_fee(dec!(8000))];
    let payments = vec![pay("P-2", BillingRef::custom("CF-1"), dec!(1000))];
    let inputs = ReconciliationInputs {
        student: &s,
        academic_year: y("2024-2025"),
        as_of: as_of(),
        fee_structures: &fs,
        custom_fees: &customs,
        payments: &payments,
    };

    let first = reconcile(&inputs);
    let second = reconcile(&inputs);
    assert_eq!(first, second);
    assert_eq!(s, student());
    assert_eq!(fs, structures());
}
