//! Payment aggregation: totals, percent paid and tri-state status.

use feeledger_core::{
    academic_year::AcademicYear,
    model::{BillingRef, PaymentMethod, PaymentRecord, PaymentStatus},
    payment_status::{aggregate, PaymentState},
    types::Money,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rust_decimal_macros::dec;

fn payment(n: usize, amount: Money, status: PaymentStatus) -> PaymentRecord {
    PaymentRecord {
        id: format!("P-{n}"),
        billing: BillingRef::standard("S-1", AcademicYear::parse("2024-2025").unwrap()),
        amount_paid: amount,
        status,
        method: PaymentMethod::Online,
        paid_at: None,
    }
}

fn payments(amounts: &[Money]) -> Vec<PaymentRecord> {
    amounts
        .iter()
        .enumerate()
        .map(|(n, a)| payment(n, *a, PaymentStatus::Paid))
        .collect()
}

#[test]
fn fully_paid_is_paid_at_one_hundred_percent() {
    let list = payments(&[dec!(4000), dec!(6000)]);
    let s = aggregate(dec!(10000), &list);
    assert_eq!(s.total_paid, dec!(10000));
    assert_eq!(s.remaining, Money::ZERO);
    assert_eq!(s.percent_paid, 100);
    assert_eq!(s.payment_state, PaymentState::Paid);
}

#[test]
fn nothing_paid_is_unpaid_at_zero_percent() {
    let s = aggregate(dec!(10000), &Vec::new());
    assert_eq!(s.total_paid, Money::ZERO);
    assert_eq!(s.remaining, dec!(10000));
    assert_eq!(s.percent_paid, 0);
    assert_eq!(s.payment_state, PaymentState::Unpaid);
}

#[test]
fn partial_payment_rounds_percent_to_nearest() {
    let list = payments(&[dec!(3333.33)]);
    let s = aggregate(dec!(10000), &list);
    assert_eq!(s.remaining, dec!(6666.67));
    assert_eq!(s.percent_paid, 33);
    assert_eq!(s.payment_state, PaymentState::Partial);

    // 2/3 = 66.67% rounds up; exactly 12.5% rounds half away from zero.
    assert_eq!(aggregate(dec!(3), &payments(&[dec!(2)])).percent_paid, 67);
    assert_eq!(aggregate(dec!(8), &payments(&[dec!(1)])).percent_paid, 13);
}

#[test]
fn overpayment_clamps_to_zero_remaining_and_full_percent() {
    let list = payments(&[dec!(7000), dec!(5000)]);
    let s = aggregate(dec!(10000), &list);
    assert_eq!(s.total_paid, dec!(12000));
    assert_eq!(s.remaining, Money::ZERO);
    assert_eq!(s.percent_paid, 100);
    assert_eq!(s.payment_state, PaymentState::Paid);
}

#[test]
fn zero_fee_is_paid_with_zero_percent() {
    let s = aggregate(Money::ZERO, &Vec::new());
    assert_eq!(s.remaining, Money::ZERO);
    assert_eq!(s.percent_paid, 0);
    assert_eq!(s.payment_state, PaymentState::Paid);
}

#[test]
fn aggregator_does_not_filter_by_status() {
    let list = vec![
        payment(0, dec!(1000), PaymentStatus::Paid),
        payment(1, dec!(500), PaymentStatus::Pending),
    ];
    let s = aggregate(dec!(2000), &list);
    assert_eq!(s.total_paid, dec!(1500));
}

#[test]
fn repeated_payments_accumulate_without_drift() {
    // Ten payments of 0.10 must total exactly 1.00.
    let list = payments(&[dec!(0.10); 10]);
    let s = aggregate(dec!(1.00), &list);
    assert_eq!(s.total_paid, dec!(1.00));
    assert_eq!(s.remaining, Money::ZERO);
    assert_eq!(s.payment_state, PaymentState::Paid);
}

#[test]
fn huge_payment_against_tiny_fee_saturates_at_full() {
    let huge: Money = "1000000000000000000000000000".parse().unwrap();
    let s = aggregate(dec!(0.01), &payments(&[huge]));
    assert_eq!(s.total_paid, huge);
    assert_eq!(s.remaining, Money::ZERO);
    assert_eq!(s.percent_paid, 100);
    assert_eq!(s.payment_state, PaymentState::Paid);
}

#[test]
fn total_beyond_money_range_saturates() {
    let s = aggregate(dec!(500), &payments(&[Money::MAX, Money::MAX]));
    assert_eq!(s.total_paid, Money::MAX);
    assert_eq!(s.remaining, Money::ZERO);
    assert_eq!(s.percent_paid, 100);
    assert_eq!(s.payment_state, PaymentState::Paid);

    // Near the top of the range the percent stays below 100.
    let s = aggregate(Money::MAX, &payments(&[Money::MAX / dec!(2)]));
    assert_eq!(s.percent_paid, 50);
    assert_eq!(s.payment_state, PaymentState::Partial);
}

#[test]
fn aggregation_is_idempotent_and_consistent() {
    let mut rng = Pcg64Mcg::seed_from_u64(0xFEE_0001);

    for _ in 0..500 {
        let fee = Money::new(rng.gen_range(0..2_000_000), 2);
        let count = rng.gen_range(0..6);
        let amounts: Vec<Money> = (0..count)
            .map(|_| Money::new(rng.gen_range(0..800_000), 2))
            .collect();
        let list = payments(&amounts);

        let first = aggregate(fee, &list);
        let second = aggregate(fee, &list);
        assert_eq!(first, second);

        let total: Money = amounts.iter().copied().sum();
        assert_eq!(first.total_paid, total);
        assert_eq!(first.remaining, (fee - total).max(Money::ZERO));
        assert!(first.percent_paid <= 100);
        if fee > Money::ZERO && total == Money::ZERO {
            assert_eq!(first.payment_state, PaymentState::Unpaid);
        }
        if total >= fee {
            assert_eq!(first.payment_state, PaymentState::Paid);
        }
    }
}
