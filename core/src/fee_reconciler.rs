//! Fee reconciliation: standard fee vs. per-student custom fee.
//!
//! Discount is `standard total − custom total`: positive means the family
//! pays less than the standard fee, negative is a surcharge. Without a custom
//! fee the standard total is owed and the discount is zero.

use crate::{
    academic_year::AcademicYear,
    class_resolver::Resolution,
    model::{Breakdown, CustomFee, FeeStructure},
    types::Money,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeReconciliation {
    pub standard_fee: Option<FeeStructure>,
    pub custom_fee: Option<CustomFee>,
    pub effective_fee: Option<Money>,
    pub discount: Option<Money>,
    pub breakdown_comparison: Vec<BreakdownLine>,
}

impl FeeReconciliation {
    fn not_applicable() -> Self {
        Self {
            standard_fee: None,
            custom_fee: None,
            effective_fee: None,
            discount: None,
            breakdown_comparison: Vec::new(),
        }
    }

    pub fn adjustment(&self) -> FeeAdjustment {
        FeeAdjustment::from_discount(self.discount)
    }
}

/// Display classification of the signed discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum FeeAdjustment {
    None,
    Discount(Money),
    Surcharge(Money),
}

impl FeeAdjustment {
    pub fn from_discount(discount: Option<Money>) -> Self {
        match discount {
            Some(d) if d > Money::ZERO => FeeAdjustment::Discount(d),
            Some(d) if d < Money::ZERO => FeeAdjustment::Surcharge(-d),
            _ => FeeAdjustment::None,
        }
    }
}

/// One breakdown component compared across the standard and custom fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub component: String,
    pub standard: Option<Money>,
    pub custom: Option<Money>,
    /// `custom − standard`, only when both sides have the component.
    pub difference: Option<Money>,
    pub same_as_standard: bool,
}

/// Reconcile the fees for one resolved student/year.
///
/// `fee_structures` and `custom_fees` may hold records for other
/// classes, students and years; only the matching ones are used.
pub fn reconcile(
    resolution: &Resolution,
    student_id: &str,
    academic_year: AcademicYear,
    fee_structures: &[FeeStructure],
    custom_fees: &[CustomFee],
) -> FeeReconciliation {
    let Some((class, section)) = resolution.class_section() else {
        return FeeReconciliation::not_applicable();
    };

    let standard_fee = fee_structures
        .iter()
        .find(|s| s.matches(class, section, &academic_year))
        .cloned();
    let custom_fee = custom_fees
        .iter()
        .find(|c| c.matches(student_id, &academic_year))
        .cloned();

    let standard_total = standard_fee.as_ref().and_then(|s| s.total_fee);

    let (effective_fee, discount, breakdown_comparison) = match &custom_fee {
        Some(custom) => {
            let discount = standard_total.map(|s| s - custom.total_fee);
            let empty = Breakdown::new();
            let standard_breakdown = standard_fee
                .as_ref()
                .map(|s| &s.breakdown)
                .unwrap_or(&empty);
            let lines = compare_breakdowns(standard_breakdown, &custom.breakdown);
            (Some(custom.total_fee), discount, lines)
        }
        None => (standard_total, Some(Money::ZERO), Vec::new()),
    };

    if standard_fee.is_none() {
        log::debug!(
            "student={student_id} year={academic_year}: no fee structure for {class}/{section}"
        );
    }

    FeeReconciliation {
        standard_fee,
        custom_fee,
        effective_fee,
        discount,
        breakdown_comparison,
    }
}

/// Compare every component present in either breakdown, in name order.
pub fn compare_breakdowns(standard: &Breakdown, custom: &Breakdown) -> Vec<BreakdownLine> {
    let components: BTreeSet<&String> = standard.keys().chain(custom.keys()).collect();

    components
        .into_iter()
        .map(|component| {
            let standard_value = standard.get(component).copied();
            let custom_value = custom.get(component).copied();
            let difference = match (standard_value, custom_value) {
                (Some(s), Some(c)) => Some(c - s),
                _ => None,
            };
            BreakdownLine {
                component: component.clone(),
                standard: standard_value,
                custom: custom_value,
                difference,
                same_as_standard: difference == Some(Money::ZERO),
            }
        })
        .collect()
}
