use super::{
    breakdown_from_sql, breakdown_to_sql, money_to_sql, opt_money_from_sql, year_from_sql,
    FeeStore,
};
use crate::{
    academic_year::AcademicYear,
    error::{FeeError, FeeResult},
    model::{FeeStructure, PromotionRecord, PromotionType, Student},
    source::FeeStructureFilter,
};
use rusqlite::{params, OptionalExtension};

impl FeeStore {
    // ── Students ───────────────────────────────────────────────────

    /// Insert a student together with its promotion history.
    pub fn insert_student(&self, student: &Student) -> FeeResult<()> {
        self.conn.execute(
            "INSERT INTO student (id, name, current_class, current_section)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                student.id,
                student.name,
                student.current_class,
                student.current_section,
            ],
        )?;
        for record in &student.promotion_history {
            self.insert_promotion_record(&student.id, record)?;
        }
        Ok(())
    }

    pub fn update_student_class(&self, student_id: &str, class: &str, section: &str) -> FeeResult<()> {
        self.conn.execute(
            "UPDATE student SET current_class = ?1, current_section = ?2 WHERE id = ?3",
            params![class, section, student_id],
        )?;
        Ok(())
    }

    pub fn insert_promotion_record(&self, student_id: &str, r: &PromotionRecord) -> FeeResult<()> {
        self.conn.execute(
            "INSERT INTO promotion_record
             (student_id, academic_year, promotion_type, from_class, from_section,
              to_class, to_section, reverted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                student_id,
                r.academic_year.to_string(),
                r.promotion_type.as_str(),
                r.from_class,
                r.from_section,
                r.to_class,
                r.to_section,
                r.reverted,
            ],
        )?;
        Ok(())
    }

    /// Flag the year's promotion as cancelled by a revert.
    pub fn mark_promotions_reverted(
        &self,
        student_id: &str,
        academic_year: AcademicYear,
    ) -> FeeResult<usize> {
        let n = self.conn.execute(
            "UPDATE promotion_record SET reverted = 1
             WHERE student_id = ?1 AND academic_year = ?2 AND promotion_type = 'promoted'",
            params![student_id, academic_year.to_string()],
        )?;
        Ok(n)
    }

    /// Student with promotion history in insertion order.
    pub fn student(&self, id: &str) -> FeeResult<Option<Student>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, current_class, current_section FROM student WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, current_class, current_section)) = row else {
            return Ok(None);
        };

        let promotion_history = self.promotion_history(&id)?;
        Ok(Some(Student {
            id,
            name,
            current_class,
            current_section,
            promotion_history,
        }))
    }

    fn promotion_history(&self, student_id: &str) -> FeeResult<Vec<PromotionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT academic_year, promotion_type, from_class, from_section,
                    to_class, to_section, reverted
             FROM promotion_record
             WHERE student_id = ?1
             ORDER BY id ASC",
        )?;
        let raw = stmt
            .query_map(params![student_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(year, kind, from_class, from_section, to_class, to_section, reverted)| {
                let promotion_type =
                    PromotionType::parse(&kind).ok_or_else(|| FeeError::InvalidRecord {
                        record: "promotion record",
                        reason: format!("unknown promotion type '{kind}'"),
                    })?;
                Ok(PromotionRecord {
                    academic_year: year_from_sql(&year)?,
                    promotion_type,
                    from_class,
                    from_section,
                    to_class,
                    to_section,
                    reverted,
                })
            })
            .collect()
    }

    // ── Fee structures ─────────────────────────────────────────────

    /// Insert or replace the structure for (class, section, academic_year).
    pub fn upsert_fee_structure(&self, s: &FeeStructure) -> FeeResult<()> {
        s.validate()?;
        self.conn.execute(
            "INSERT INTO fee_structure (class, section, academic_year, total_fee, breakdown_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (class, section, academic_year)
             DO UPDATE SET total_fee = excluded.total_fee,
                           breakdown_json = excluded.breakdown_json",
            params![
                s.class,
                s.section,
                s.academic_year.to_string(),
                s.total_fee.map(money_to_sql),
                breakdown_to_sql(&s.breakdown)?,
            ],
        )?;
        Ok(())
    }

    pub fn fee_structures(&self, filter: &FeeStructureFilter) -> FeeResult<Vec<FeeStructure>> {
        let mut stmt = self.conn.prepare(
            "SELECT class, section, academic_year, total_fee, breakdown_json
             FROM fee_structure
             WHERE (?1 IS NULL OR class = ?1)
               AND (?2 IS NULL OR section = ?2)
               AND (?3 IS NULL OR academic_year = ?3)
             ORDER BY academic_year DESC, class ASC, section ASC",
        )?;
        let raw = stmt
            .query_map(
                params![
                    filter.class,
                    filter.section,
                    filter.academic_year.map(|y| y.to_string()),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(class, section, year, total, breakdown)| {
                Ok(FeeStructure {
                    class,
                    section,
                    academic_year: year_from_sql(&year)?,
                    total_fee: opt_money_from_sql("fee_structure.total_fee", total)?,
                    breakdown: breakdown_from_sql(&breakdown)?,
                })
            })
            .collect()
    }
}
