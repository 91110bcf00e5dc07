//! Shared primitive types used across the fee ledger.

/// All money amounts. Exact decimal, never floating point.
pub type Money = rust_decimal::Decimal;

/// A stable identifier for a student.
pub type StudentId = String;

/// Identifier of a per-student custom fee record.
pub type CustomFeeId = String;

/// Identifier of a single payment.
pub type PaymentId = String;
