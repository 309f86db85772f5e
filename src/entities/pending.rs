// 📝 Pending Note - a class that found no free slot this week
//
// Append-only; reported to the student at the weekend.

use crate::error::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNote {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub original_start: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

impl PendingNote {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PendingNote {
            id: row.get(0)?,
            student_id: row.get(1)?,
            subject: row.get(2)?,
            original_start: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

pub fn insert_pending_note(
    conn: &Connection,
    student_id: i64,
    subject: &str,
    original_start: NaiveDateTime,
) -> Result<PendingNote> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO pending_notes (student_id, subject, original_start_dt, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![student_id, subject, original_start, created_at],
    )?;

    Ok(PendingNote {
        id: conn.last_insert_rowid(),
        student_id,
        subject: subject.to_string(),
        original_start,
        created_at,
    })
}

pub fn pending_notes_for_student(conn: &Connection, student_id: i64) -> Result<Vec<PendingNote>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, subject, original_start_dt, created_at
         FROM pending_notes
         WHERE student_id = ?1
         ORDER BY original_start_dt, id",
    )?;

    let notes = stmt
        .query_map([student_id], PendingNote::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(notes)
}

/// Notes whose original class fell in `[week_start, week_start + 7 days)`.
pub fn pending_notes_in_week(
    conn: &Connection,
    student_id: i64,
    week_start: NaiveDate,
) -> Result<Vec<PendingNote>> {
    let from = week_start.and_time(chrono::NaiveTime::MIN);
    let until = from + Duration::days(7);

    let mut stmt = conn.prepare(
        "SELECT id, student_id, subject, original_start_dt, created_at
         FROM pending_notes
         WHERE student_id = ?1 AND original_start_dt >= ?2 AND original_start_dt < ?3
         ORDER BY original_start_dt, id",
    )?;

    let notes = stmt
        .query_map(params![student_id, from, until], PendingNote::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(notes)
}
