// ✅ Attendance - one record per class and date
//
// Records are created by the rescheduler (compensation) or a voluntary prep
// block and are never updated afterwards.

use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

// ============================================================================
// STATUS & REASON
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Present" => Some(AttendanceStatus::Present),
            "Absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

/// Why a student was credited for a class they did not sit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceReason {
    /// Displaced by an interview or assessment
    Interview,

    /// Student blocked the class for placement prep
    Prep,
}

impl AttendanceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceReason::Interview => "Interview",
            AttendanceReason::Prep => "Prep",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Interview" => Some(AttendanceReason::Interview),
            "Prep" => Some(AttendanceReason::Prep),
            _ => None,
        }
    }
}

impl ToSql for AttendanceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AttendanceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        AttendanceStatus::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown attendance status '{}'", text).into()))
    }
}

impl ToSql for AttendanceReason {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AttendanceReason {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        AttendanceReason::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown attendance reason '{}'", text).into()))
    }
}

// ============================================================================
// ATTENDANCE RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub student_id: i64,
    pub scheduled_class_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: Option<AttendanceReason>,
}

impl Attendance {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Attendance {
            id: row.get(0)?,
            student_id: row.get(1)?,
            scheduled_class_id: row.get(2)?,
            date: row.get(3)?,
            status: row.get(4)?,
            reason: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub student_id: i64,
    pub scheduled_class_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: Option<AttendanceReason>,
}

pub fn insert_attendance(conn: &Connection, new: &NewAttendance) -> Result<Attendance> {
    conn.execute(
        "INSERT INTO attendance (student_id, scheduled_class_id, date, status, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.student_id,
            new.scheduled_class_id,
            new.date,
            new.status,
            new.reason,
        ],
    )?;

    Ok(Attendance {
        id: conn.last_insert_rowid(),
        student_id: new.student_id,
        scheduled_class_id: new.scheduled_class_id,
        date: new.date,
        status: new.status,
        reason: new.reason,
    })
}

pub fn attendance_for_student(conn: &Connection, student_id: i64) -> Result<Vec<Attendance>> {
    query_attendance(
        conn,
        "SELECT id, student_id, scheduled_class_id, date, status, reason
         FROM attendance WHERE student_id = ?1 ORDER BY id",
        student_id,
    )
}

pub fn attendance_for_class(conn: &Connection, class_id: i64) -> Result<Vec<Attendance>> {
    query_attendance(
        conn,
        "SELECT id, student_id, scheduled_class_id, date, status, reason
         FROM attendance WHERE scheduled_class_id = ?1 ORDER BY id",
        class_id,
    )
}

fn query_attendance(conn: &Connection, sql: &str, key: i64) -> Result<Vec<Attendance>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([key], Attendance::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
