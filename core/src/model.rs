//! Typed input records: students, promotion history, fee structures,
//! custom fees and payments.
//!
//! Records are validated once where they enter the system (snapshot load,
//! store insert, service drafts). The engine itself assumes well-formed input.

use crate::{
    academic_year::AcademicYear,
    error::{FeeError, FeeResult},
    types::{CustomFeeId, Money, PaymentId, StudentId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Component name → amount. Ordered so comparisons are stable.
pub type Breakdown = BTreeMap<String, Money>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: Option<String>,
    pub current_class: String,
    pub current_section: String,
    #[serde(default)]
    pub promotion_history: Vec<PromotionRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    Promoted,
    Reverted,
}

impl PromotionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionType::Promoted => "promoted",
            PromotionType::Reverted => "reverted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "promoted" => Some(PromotionType::Promoted),
            "reverted" => Some(PromotionType::Reverted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub academic_year: AcademicYear,
    pub promotion_type: PromotionType,
    pub from_class: String,
    pub from_section: String,
    pub to_class: String,
    pub to_section: String,
    /// Set on a `Promoted` record once a `Reverted` record in the same
    /// academic year cancels it.
    #[serde(default)]
    pub reverted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub class: String,
    pub section: String,
    pub academic_year: AcademicYear,
    pub total_fee: Option<Money>,
    #[serde(default)]
    pub breakdown: Breakdown,
}

impl FeeStructure {
    pub fn matches(&self, class: &str, section: &str, year: &AcademicYear) -> bool {
        self.class == class && self.section == section && self.academic_year == *year
    }

    /// A standard fee can be billed only when its total is positive.
    pub fn is_billable(&self) -> bool {
        self.total_fee.is_some_and(|t| t > Money::ZERO)
    }

    pub fn validate(&self) -> FeeResult<()> {
        validate_breakdown("fee structure", &self.breakdown)?;
        if let Some(total) = self.total_fee {
            if total < Money::ZERO {
                return Err(invalid("fee structure", format!("negative total fee {total}")));
            }
            if !self.breakdown.is_empty() {
                check_breakdown_sum("fee structure", &self.breakdown, total)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeFrequency {
    OneTime,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl FeeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeFrequency::OneTime => "one_time",
            FeeFrequency::Monthly => "monthly",
            FeeFrequency::Quarterly => "quarterly",
            FeeFrequency::HalfYearly => "half_yearly",
            FeeFrequency::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one_time" => Some(FeeFrequency::OneTime),
            "monthly" => Some(FeeFrequency::Monthly),
            "quarterly" => Some(FeeFrequency::Quarterly),
            "half_yearly" => Some(FeeFrequency::HalfYearly),
            "yearly" => Some(FeeFrequency::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFee {
    pub id: CustomFeeId,
    pub student_id: StudentId,
    pub academic_year: AcademicYear,
    pub total_fee: Money,
    #[serde(default)]
    pub breakdown: Breakdown,
    pub frequency: FeeFrequency,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub late_fee_per_day: Money,
    pub reason: Option<String>,
    /// Class/section the override was created for.
    pub display_class: Option<String>,
    pub display_section: Option<String>,
    /// Standard fee captured when the override was created.
    pub actual_fee: Option<Money>,
}

impl CustomFee {
    pub fn matches(&self, student_id: &str, year: &AcademicYear) -> bool {
        self.student_id == student_id && self.academic_year == *year
    }

    pub fn validate(&self) -> FeeResult<()> {
        validate_custom_amounts(self.total_fee, &self.breakdown, self.late_fee_per_day)
    }
}

pub(crate) fn validate_custom_amounts(
    total_fee: Money,
    breakdown: &Breakdown,
    late_fee_per_day: Money,
) -> FeeResult<()> {
    if total_fee < Money::ZERO {
        return Err(invalid("custom fee", format!("negative total fee {total_fee}")));
    }
    if late_fee_per_day < Money::ZERO {
        return Err(invalid(
            "custom fee",
            format!("negative late fee per day {late_fee_per_day}"),
        ));
    }
    validate_breakdown("custom fee", breakdown)?;
    if !breakdown.is_empty() {
        check_breakdown_sum("custom fee", breakdown, total_fee)?;
    }
    Ok(())
}

/// The billing record a payment settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillingRef {
    StandardFee {
        student_id: StudentId,
        academic_year: AcademicYear,
    },
    CustomFee {
        custom_fee_id: CustomFeeId,
    },
}

impl BillingRef {
    pub fn standard(student_id: &str, academic_year: AcademicYear) -> Self {
        BillingRef::StandardFee {
            student_id: student_id.to_string(),
            academic_year,
        }
    }

    pub fn custom(custom_fee_id: &str) -> Self {
        BillingRef::CustomFee {
            custom_fee_id: custom_fee_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(PaymentStatus::Paid),
            "pending" => Some(PaymentStatus::Pending),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    Offline,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Online => "online",
            PaymentMethod::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(PaymentMethod::Online),
            "offline" => Some(PaymentMethod::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub billing: BillingRef,
    pub amount_paid: Money,
    pub status: PaymentStatus,
    #[serde(default = "default_method")]
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
}

fn default_method() -> PaymentMethod {
    PaymentMethod::Online
}

impl PaymentRecord {
    pub fn validate(&self) -> FeeResult<()> {
        if self.amount_paid < Money::ZERO {
            return Err(invalid(
                "payment",
                format!("negative amount {} on payment {}", self.amount_paid, self.id),
            ));
        }
        Ok(())
    }
}

fn invalid(record: &'static str, reason: String) -> FeeError {
    FeeError::InvalidRecord { record, reason }
}

fn validate_breakdown(record: &'static str, breakdown: &Breakdown) -> FeeResult<()> {
    match breakdown.iter().find(|(_, amount)| **amount < Money::ZERO) {
        Some((component, amount)) => Err(invalid(
            record,
            format!("negative amount {amount} for component '{component}'"),
        )),
        None => Ok(()),
    }
}

fn check_breakdown_sum(record: &'static str, breakdown: &Breakdown, total: Money) -> FeeResult<()> {
    let sum: Money = breakdown.values().copied().sum();
    if sum != total {
        return Err(invalid(
            record,
            format!("breakdown sums to {sum} but total is {total}"),
        ));
    }
    Ok(())
}
