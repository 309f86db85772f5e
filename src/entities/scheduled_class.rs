// 📅 Scheduled Class - a concrete occurrence on the calendar
//
// Start/end/pending/origin change when the rescheduler moves a class.
// Interview rows are stored here too (is_interview = true); they occupy time
// but are never displaced themselves.

use crate::error::{ensure_window, Result, ScheduleError};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

pub(crate) const CLASS_COLUMNS: &str =
    "id, student_id, subject, start_dt, end_dt, rescheduled_from, is_interview, pending";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledClass {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,

    /// Identity of the class this one was moved from, set on reschedule
    pub rescheduled_from: Option<i64>,

    pub is_interview: bool,
    pub pending: bool,
}

impl ScheduledClass {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ScheduledClass {
            id: row.get(0)?,
            student_id: row.get(1)?,
            subject: row.get(2)?,
            start: row.get(3)?,
            end: row.get(4)?,
            rescheduled_from: row.get(5)?,
            is_interview: row.get(6)?,
            pending: row.get(7)?,
        })
    }

    /// Half-open overlap test against `[start, end)`
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && self.end > start
    }
}

/// Fields needed to create a scheduled class
#[derive(Debug, Clone)]
pub struct NewScheduledClass {
    pub student_id: i64,
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub is_interview: bool,
}

impl NewScheduledClass {
    /// A regular tutoring class
    pub fn class(student_id: i64, subject: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        NewScheduledClass {
            student_id,
            subject: subject.to_string(),
            start,
            end,
            is_interview: false,
        }
    }

    /// An interview/assessment block that occupies time on the schedule
    pub fn interview(student_id: i64, subject: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        NewScheduledClass {
            is_interview: true,
            ..Self::class(student_id, subject, start, end)
        }
    }
}

pub fn insert_scheduled_class(conn: &Connection, new: &NewScheduledClass) -> Result<ScheduledClass> {
    ensure_window(new.start, new.end)?;

    conn.execute(
        "INSERT INTO scheduled_classes (student_id, subject, start_dt, end_dt, is_interview, pending)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![new.student_id, new.subject, new.start, new.end, new.is_interview],
    )?;

    Ok(ScheduledClass {
        id: conn.last_insert_rowid(),
        student_id: new.student_id,
        subject: new.subject.clone(),
        start: new.start,
        end: new.end,
        rescheduled_from: None,
        is_interview: new.is_interview,
        pending: false,
    })
}

pub fn get_scheduled_class(conn: &Connection, class_id: i64) -> Result<ScheduledClass> {
    let sql = format!("SELECT {} FROM scheduled_classes WHERE id = ?1", CLASS_COLUMNS);

    conn.query_row(&sql, [class_id], ScheduledClass::from_row)
        .optional()?
        .ok_or(ScheduleError::ClassNotFound(class_id))
}

/// All of a student's classes, pending ones included, ordered by start.
pub fn scheduled_classes_for_student(conn: &Connection, student_id: i64) -> Result<Vec<ScheduledClass>> {
    let sql = format!(
        "SELECT {} FROM scheduled_classes WHERE student_id = ?1 ORDER BY start_dt, id",
        CLASS_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let classes = stmt
        .query_map([student_id], ScheduledClass::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(classes)
}

/// Move a class to a new window, recording where it came from.
pub fn reassign_class(
    conn: &Connection,
    class_id: i64,
    rescheduled_from: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<()> {
    ensure_window(start, end)?;

    let updated = conn.execute(
        "UPDATE scheduled_classes
         SET rescheduled_from = ?1, start_dt = ?2, end_dt = ?3, pending = 0
         WHERE id = ?4",
        params![rescheduled_from, start, end, class_id],
    )?;

    if updated == 0 {
        return Err(ScheduleError::ClassNotFound(class_id));
    }
    Ok(())
}

pub fn mark_class_pending(conn: &Connection, class_id: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE scheduled_classes SET pending = 1 WHERE id = ?1",
        [class_id],
    )?;

    if updated == 0 {
        return Err(ScheduleError::ClassNotFound(class_id));
    }
    Ok(())
}
