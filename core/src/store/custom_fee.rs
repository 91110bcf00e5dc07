use super::{
    breakdown_from_sql, breakdown_to_sql, date_from_sql, money_from_sql, money_to_sql,
    opt_money_from_sql, year_from_sql, FeeStore,
};
use crate::{
    error::{FeeError, FeeResult},
    model::{CustomFee, FeeFrequency},
    source::CustomFeeFilter,
};
use rusqlite::{params, Row};

const CUSTOM_FEE_COLUMNS: &str = "id, student_id, academic_year, total_fee, breakdown_json,
    frequency, due_date, late_fee_per_day, reason, display_class, display_section, actual_fee";

/// Raw column values before typed parsing.
struct CustomFeeRow {
    id: String,
    student_id: String,
    academic_year: String,
    total_fee: String,
    breakdown_json: String,
    frequency: String,
    due_date: Option<String>,
    late_fee_per_day: String,
    reason: Option<String>,
    display_class: Option<String>,
    display_section: Option<String>,
    actual_fee: Option<String>,
}

impl CustomFeeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            student_id: row.get(1)?,
            academic_year: row.get(2)?,
            total_fee: row.get(3)?,
            breakdown_json: row.get(4)?,
            frequency: row.get(5)?,
            due_date: row.get(6)?,
            late_fee_per_day: row.get(7)?,
            reason: row.get(8)?,
            display_class: row.get(9)?,
            display_section: row.get(10)?,
            actual_fee: row.get(11)?,
        })
    }

    fn into_custom_fee(self) -> FeeResult<CustomFee> {
        let frequency = FeeFrequency::parse(&self.frequency).ok_or_else(|| FeeError::InvalidRecord {
            record: "custom fee",
            reason: format!("unknown frequency '{}'", self.frequency),
        })?;
        Ok(CustomFee {
            academic_year: year_from_sql(&self.academic_year)?,
            total_fee: money_from_sql("custom_fee.total_fee", &self.total_fee)?,
            breakdown: breakdown_from_sql(&self.breakdown_json)?,
            frequency,
            due_date: date_from_sql("custom_fee.due_date", self.due_date)?,
            late_fee_per_day: money_from_sql("custom_fee.late_fee_per_day", &self.late_fee_per_day)?,
            actual_fee: opt_money_from_sql("custom_fee.actual_fee", self.actual_fee)?,
            id: self.id,
            student_id: self.student_id,
            reason: self.reason,
            display_class: self.display_class,
            display_section: self.display_section,
        })
    }
}

impl FeeStore {
    pub fn insert_custom_fee(&self, c: &CustomFee) -> FeeResult<()> {
        c.validate()?;
        self.conn.execute(
            "INSERT INTO custom_fee
             (id, student_id, academic_year, total_fee, breakdown_json, frequency,
              due_date, late_fee_per_day, reason, display_class, display_section, actual_fee)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                c.id,
                c.student_id,
                c.academic_year.to_string(),
                money_to_sql(c.total_fee),
                breakdown_to_sql(&c.breakdown)?,
                c.frequency.as_str(),
                c.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                money_to_sql(c.late_fee_per_day),
                c.reason,
                c.display_class,
                c.display_section,
                c.actual_fee.map(money_to_sql),
            ],
        )?;
        Ok(())
    }

    /// Overwrite the editable terms of an existing custom fee. The student,
    /// year, display class and captured standard fee are left untouched.
    pub fn update_custom_fee_terms(&self, c: &CustomFee) -> FeeResult<()> {
        c.validate()?;
        let n = self.conn.execute(
            "UPDATE custom_fee
             SET total_fee = ?1, breakdown_json = ?2, frequency = ?3,
                 due_date = ?4, late_fee_per_day = ?5, reason = ?6
             WHERE id = ?7",
            params![
                money_to_sql(c.total_fee),
                breakdown_to_sql(&c.breakdown)?,
                c.frequency.as_str(),
                c.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                money_to_sql(c.late_fee_per_day),
                c.reason,
                c.id,
            ],
        )?;
        if n == 0 {
            return Err(FeeError::CustomFeeNotFound { id: c.id.clone() });
        }
        Ok(())
    }

    pub fn custom_fee(&self, id: &str) -> FeeResult<Option<CustomFee>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CUSTOM_FEE_COLUMNS} FROM custom_fee WHERE id = ?1"))?;
        let rows = stmt
            .query_map(params![id], CustomFeeRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().next().map(CustomFeeRow::into_custom_fee).transpose()
    }

    pub fn custom_fees(&self, filter: &CustomFeeFilter) -> FeeResult<Vec<CustomFee>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CUSTOM_FEE_COLUMNS} FROM custom_fee
             WHERE (?1 IS NULL OR student_id = ?1)
               AND (?2 IS NULL OR academic_year = ?2)
             ORDER BY academic_year DESC, student_id ASC"
        ))?;
        let rows = stmt
            .query_map(
                params![filter.student_id, filter.academic_year.map(|y| y.to_string())],
                CustomFeeRow::read,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(CustomFeeRow::into_custom_fee).collect()
    }
}
