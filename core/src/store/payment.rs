use super::{
    money_from_sql, money_to_sql, timestamp_from_sql, timestamp_to_sql, year_from_sql, FeeStore,
};
use crate::{
    error::{FeeError, FeeResult},
    model::{BillingRef, PaymentMethod, PaymentRecord, PaymentStatus},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

const PAYMENT_COLUMNS: &str =
    "id, billing_kind, student_id, academic_year, custom_fee_id, amount_paid, status, method, paid_at";

struct PaymentRow {
    id: String,
    billing_kind: String,
    student_id: Option<String>,
    academic_year: Option<String>,
    custom_fee_id: Option<String>,
    amount_paid: String,
    status: String,
    method: String,
    paid_at: Option<String>,
}

impl PaymentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            billing_kind: row.get(1)?,
            student_id: row.get(2)?,
            academic_year: row.get(3)?,
            custom_fee_id: row.get(4)?,
            amount_paid: row.get(5)?,
            status: row.get(6)?,
            method: row.get(7)?,
            paid_at: row.get(8)?,
        })
    }

    fn into_payment(self) -> FeeResult<PaymentRecord> {
        let bad = |reason: String| FeeError::InvalidRecord {
            record: "payment",
            reason,
        };

        let billing = match (
            self.billing_kind.as_str(),
            self.student_id,
            self.academic_year,
            self.custom_fee_id,
        ) {
            ("standard_fee", Some(student_id), Some(year), _) => BillingRef::StandardFee {
                student_id,
                academic_year: year_from_sql(&year)?,
            },
            ("custom_fee", _, _, Some(custom_fee_id)) => BillingRef::CustomFee { custom_fee_id },
            (kind, ..) => {
                return Err(bad(format!("payment {} has incomplete {kind} billing", self.id)))
            }
        };
        let status = PaymentStatus::parse(&self.status)
            .ok_or_else(|| bad(format!("unknown status '{}'", self.status)))?;
        let method = PaymentMethod::parse(&self.method)
            .ok_or_else(|| bad(format!("unknown method '{}'", self.method)))?;

        Ok(PaymentRecord {
            amount_paid: money_from_sql("payment.amount_paid", &self.amount_paid)?,
            paid_at: timestamp_from_sql("payment.paid_at", self.paid_at)?,
            id: self.id,
            billing,
            status,
            method,
        })
    }
}

impl FeeStore {
    pub fn insert_payment(&self, p: &PaymentRecord) -> FeeResult<()> {
        p.validate()?;
        let (kind, student_id, year, custom_fee_id) = match &p.billing {
            BillingRef::StandardFee {
                student_id,
                academic_year,
            } => (
                "standard_fee",
                Some(student_id.as_str()),
                Some(academic_year.to_string()),
                None,
            ),
            BillingRef::CustomFee { custom_fee_id } => {
                ("custom_fee", None, None, Some(custom_fee_id.as_str()))
            }
        };
        self.conn.execute(
            "INSERT INTO payment
             (id, billing_kind, student_id, academic_year, custom_fee_id,
              amount_paid, status, method, paid_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                p.id,
                kind,
                student_id,
                year,
                custom_fee_id,
                money_to_sql(p.amount_paid),
                p.status.as_str(),
                p.method.as_str(),
                timestamp_to_sql(p.paid_at),
            ],
        )?;
        Ok(())
    }

    pub fn payment(&self, id: &str) -> FeeResult<Option<PaymentRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PAYMENT_COLUMNS} FROM payment WHERE id = ?1"))?;
        let rows = stmt
            .query_map(params![id], PaymentRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().next().map(PaymentRow::into_payment).transpose()
    }

    /// All payments against a billing record, any status, oldest first.
    pub fn payments_for(&self, billing: &BillingRef) -> FeeResult<Vec<PaymentRecord>> {
        let rows = match billing {
            BillingRef::StandardFee {
                student_id,
                academic_year,
            } => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PAYMENT_COLUMNS} FROM payment
                     WHERE billing_kind = 'standard_fee' AND student_id = ?1 AND academic_year = ?2
                     ORDER BY paid_at ASC, id ASC"
                ))?;
                let rows = stmt
                    .query_map(params![student_id, academic_year.to_string()], PaymentRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            BillingRef::CustomFee { custom_fee_id } => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PAYMENT_COLUMNS} FROM payment
                     WHERE billing_kind = 'custom_fee' AND custom_fee_id = ?1
                     ORDER BY paid_at ASC, id ASC"
                ))?;
                let rows = stmt
                    .query_map(params![custom_fee_id], PaymentRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    /// Move a pending payment to paid. Returns false if it was not pending.
    pub fn mark_payment_paid(&self, id: &str, at: DateTime<Utc>) -> FeeResult<bool> {
        let n = self.conn.execute(
            "UPDATE payment SET status = 'paid', paid_at = ?1
             WHERE id = ?2 AND status = 'pending'",
            params![at.to_rfc3339(), id],
        )?;
        Ok(n == 1)
    }
}
