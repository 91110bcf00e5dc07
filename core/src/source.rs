//! Read-side query contracts the reconciliation engine depends on.
//!
//! The engine never fetches anything itself. A `RecordSource` hands it
//! already-typed records; `FeeStore` (SQLite) and `RecordSnapshot`
//! (in-memory, loaded from JSON) are the two implementations.

use crate::{
    academic_year::AcademicYear,
    error::{FeeError, FeeResult},
    model::{BillingRef, CustomFee, FeeStructure, PaymentRecord, Student},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeStructureFilter {
    pub class: Option<String>,
    pub section: Option<String>,
    pub academic_year: Option<AcademicYear>,
}

impl FeeStructureFilter {
    pub fn for_year(academic_year: AcademicYear) -> Self {
        Self {
            academic_year: Some(academic_year),
            ..Self::default()
        }
    }

    pub fn accepts(&self, s: &FeeStructure) -> bool {
        self.class.as_deref().map_or(true, |c| c == s.class)
            && self.section.as_deref().map_or(true, |sec| sec == s.section)
            && self.academic_year.map_or(true, |y| y == s.academic_year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFeeFilter {
    pub student_id: Option<String>,
    pub academic_year: Option<AcademicYear>,
}

impl CustomFeeFilter {
    pub fn for_student_year(student_id: &str, academic_year: AcademicYear) -> Self {
        Self {
            student_id: Some(student_id.to_string()),
            academic_year: Some(academic_year),
        }
    }

    pub fn accepts(&self, c: &CustomFee) -> bool {
        self.student_id.as_deref().map_or(true, |id| id == c.student_id)
            && self.academic_year.map_or(true, |y| y == c.academic_year)
    }
}

pub trait RecordSource {
    /// Student including promotion history.
    fn get_student(&self, id: &str) -> FeeResult<Student>;

    fn list_fee_structures(&self, filter: &FeeStructureFilter) -> FeeResult<Vec<FeeStructure>>;

    fn list_custom_fees(&self, filter: &CustomFeeFilter) -> FeeResult<Vec<CustomFee>>;

    fn list_payments(&self, billing: &BillingRef) -> FeeResult<Vec<PaymentRecord>>;
}

/// A point-in-time bundle of records, typically loaded from a JSON export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSnapshot {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub fee_structures: Vec<FeeStructure>,
    #[serde(default)]
    pub custom_fees: Vec<CustomFee>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
}

impl RecordSnapshot {
    /// Parse and validate a JSON snapshot. Malformed year labels and
    /// invalid amounts are rejected here, once.
    pub fn from_json(json: &str) -> FeeResult<Self> {
        let snapshot: RecordSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::from_json(&content)?)
    }

    pub fn validate(&self) -> FeeResult<()> {
        for s in &self.fee_structures {
            s.validate()?;
        }
        for c in &self.custom_fees {
            c.validate()?;
        }
        for p in &self.payments {
            p.validate()?;
        }
        Ok(())
    }
}

impl RecordSource for RecordSnapshot {
    fn get_student(&self, id: &str) -> FeeResult<Student> {
        self.students
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| FeeError::StudentNotFound { id: id.to_string() })
    }

    fn list_fee_structures(&self, filter: &FeeStructureFilter) -> FeeResult<Vec<FeeStructure>> {
        Ok(self
            .fee_structures
            .iter()
            .filter(|s| filter.accepts(s))
            .cloned()
            .collect())
    }

    fn list_custom_fees(&self, filter: &CustomFeeFilter) -> FeeResult<Vec<CustomFee>> {
        Ok(self
            .custom_fees
            .iter()
            .filter(|c| filter.accepts(c))
            .cloned()
            .collect())
    }

    fn list_payments(&self, billing: &BillingRef) -> FeeResult<Vec<PaymentRecord>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| &p.billing == billing)
            .cloned()
            .collect())
    }
}
