use thiserror::Error;

use crate::facade::CustomFeeBlock;

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed academic year label '{label}': expected YYYY-YYYY with consecutive years")]
    MalformedYearLabel { label: String },

    #[error("Malformed amount '{value}' in column {column}")]
    MalformedAmount { column: &'static str, value: String },

    #[error("Student '{id}' not found")]
    StudentNotFound { id: String },

    #[error("Custom fee '{id}' not found")]
    CustomFeeNotFound { id: String },

    #[error("Student '{student_id}' has no live promotion in {academic_year}")]
    PromotionNotFound {
        student_id: String,
        academic_year: String,
    },

    #[error("Payment '{id}' not found")]
    PaymentNotFound { id: String },

    #[error("Payment '{id}' is not awaiting verification")]
    PaymentNotPending { id: String },

    #[error("Invalid {record}: {reason}")]
    InvalidRecord { record: &'static str, reason: String },

    #[error("Custom fee change blocked: {0}")]
    CustomFeeBlocked(CustomFeeBlock),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FeeResult<T> = Result<T, FeeError>;
