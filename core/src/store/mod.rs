//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The service layer calls store methods and never executes SQL directly.
//! Row text (years, amounts, dates) is parsed back into typed records here,
//! so a corrupt label surfaces as `FeeError::MalformedYearLabel`.

mod custom_fee;
mod events;
mod payment;
mod records;

use crate::{
    academic_year::AcademicYear,
    error::{FeeError, FeeResult},
    model::{BillingRef, Breakdown, CustomFee, FeeStructure, PaymentRecord, Student},
    source::{CustomFeeFilter, FeeStructureFilter, RecordSource},
    types::Money,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use std::str::FromStr;

pub struct FeeStore {
    conn: Connection,
}

impl FeeStore {
    pub fn open(path: &str) -> FeeResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FeeResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FeeResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_fee_ledger.sql"))?;
        Ok(())
    }

    /// Run `f` inside one SQLite transaction. Every write `f` makes through
    /// this store is committed together, or rolled back if `f` fails.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> FeeResult<T>) -> FeeResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

impl RecordSource for FeeStore {
    fn get_student(&self, id: &str) -> FeeResult<Student> {
        self.student(id)?
            .ok_or_else(|| FeeError::StudentNotFound { id: id.to_string() })
    }

    fn list_fee_structures(&self, filter: &FeeStructureFilter) -> FeeResult<Vec<FeeStructure>> {
        self.fee_structures(filter)
    }

    fn list_custom_fees(&self, filter: &CustomFeeFilter) -> FeeResult<Vec<CustomFee>> {
        self.custom_fees(filter)
    }

    fn list_payments(&self, billing: &BillingRef) -> FeeResult<Vec<PaymentRecord>> {
        self.payments_for(billing)
    }
}

// ── Column codecs ──────────────────────────────────────────────────

fn money_to_sql(m: Money) -> String {
    m.to_string()
}

fn money_from_sql(column: &'static str, text: &str) -> FeeResult<Money> {
    Money::from_str(text).map_err(|_| FeeError::MalformedAmount {
        column,
        value: text.to_string(),
    })
}

fn opt_money_from_sql(column: &'static str, text: Option<String>) -> FeeResult<Option<Money>> {
    text.map(|t| money_from_sql(column, &t)).transpose()
}

fn year_from_sql(text: &str) -> FeeResult<AcademicYear> {
    AcademicYear::parse(text)
}

fn breakdown_to_sql(b: &Breakdown) -> FeeResult<String> {
    Ok(serde_json::to_string(b)?)
}

fn breakdown_from_sql(json: &str) -> FeeResult<Breakdown> {
    Ok(serde_json::from_str(json)?)
}

fn date_from_sql(column: &'static str, text: Option<String>) -> FeeResult<Option<NaiveDate>> {
    text.map(|t| {
        NaiveDate::parse_from_str(&t, "%Y-%m-%d").map_err(|e| FeeError::InvalidRecord {
            record: column,
            reason: format!("bad date '{t}': {e}"),
        })
    })
    .transpose()
}

fn timestamp_to_sql(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

fn timestamp_from_sql(column: &'static str, text: Option<String>) -> FeeResult<Option<DateTime<Utc>>> {
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FeeError::InvalidRecord {
                record: column,
                reason: format!("bad timestamp '{t}': {e}"),
            })
    })
    .transpose()
}
