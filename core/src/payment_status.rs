//! Payment progress against an effective fee.
//!
//! The aggregator sums every payment it is given. Deciding which payments
//! count (e.g. only verified ones) is the caller's job.

use crate::{model::PaymentRecord, types::Money};
use rust_decimal::{prelude::ToPrimitive, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_paid: Money,
    pub remaining: Money,
    pub percent_paid: u8,
    pub payment_state: PaymentState,
}

impl PaymentSummary {
    /// Figures for a student/year with nothing to bill.
    pub fn not_applicable() -> Self {
        Self {
            total_paid: Money::ZERO,
            remaining: Money::ZERO,
            percent_paid: 0,
            payment_state: PaymentState::Unpaid,
        }
    }
}

/// Aggregate `payments` against `effective_fee`.
///
/// A zero effective fee (full waiver) counts as `Paid` with 0 percent:
/// nothing remains, so the paid branch wins even with no payments.
/// Totals beyond the `Money` range saturate at `Money::MAX`.
pub fn aggregate<'a, I>(effective_fee: Money, payments: I) -> PaymentSummary
where
    I: IntoIterator<Item = &'a PaymentRecord>,
{
    let total_paid = payments
        .into_iter()
        .try_fold(Money::ZERO, |acc, p| acc.checked_add(p.amount_paid))
        .unwrap_or(Money::MAX);
    let remaining = effective_fee
        .checked_sub(total_paid)
        .unwrap_or(Money::ZERO)
        .max(Money::ZERO);

    let percent_paid = percent_of(total_paid, effective_fee);

    let payment_state = if remaining == Money::ZERO {
        PaymentState::Paid
    } else if total_paid == Money::ZERO {
        PaymentState::Unpaid
    } else {
        PaymentState::Partial
    };

    PaymentSummary {
        total_paid,
        remaining,
        percent_paid,
        payment_state,
    }
}

/// Whole percent of `fee` covered by `paid`, rounded half away from zero.
fn percent_of(paid: Money, fee: Money) -> u8 {
    if fee <= Money::ZERO {
        return 0;
    }
    if paid >= fee {
        return 100;
    }
    // paid / fee < 1 here, so the product stays in range.
    paid.checked_div(fee)
        .and_then(|ratio| ratio.checked_mul(Money::ONE_HUNDRED))
        .map(|p| p.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .map(|p| p.clamp(Money::ZERO, Money::ONE_HUNDRED))
        .and_then(|p| p.to_u8())
        .unwrap_or(100)
}
