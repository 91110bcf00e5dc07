use super::{timestamp_from_sql, FeeStore};
use crate::{
    error::{FeeError, FeeResult},
    event::EventLogEntry,
};
use rusqlite::params;

impl FeeStore {
    pub fn append_event(&self, entry: &EventLogEntry) -> FeeResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (student_id, event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.student_id,
                entry.event_type,
                entry.payload,
                entry.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn events_for_student(&self, student_id: &str) -> FeeResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, event_type, payload, recorded_at
             FROM event_log WHERE student_id = ?1
             ORDER BY id ASC",
        )?;
        let raw = stmt
            .query_map(params![student_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, student_id, event_type, payload, recorded_at)| {
                let recorded_at = timestamp_from_sql("event_log.recorded_at", Some(recorded_at))?
                    .ok_or_else(|| FeeError::InvalidRecord {
                        record: "event_log.recorded_at",
                        reason: "missing timestamp".into(),
                    })?;
                Ok(EventLogEntry {
                    id: Some(id),
                    student_id,
                    event_type,
                    payload,
                    recorded_at,
                })
            })
            .collect()
    }

    pub fn event_count(&self) -> FeeResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count)
    }
}
