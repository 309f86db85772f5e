// 🔁 Class Template - recurring weekly rule
//
// A template never changes once created; the slot catalog projects it onto a
// concrete week.

use crate::error::{Result, ScheduleError};
use chrono::{NaiveTime, Weekday};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTemplate {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,

    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,

    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl ClassTemplate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ClassTemplate {
            id: row.get(0)?,
            student_id: row.get(1)?,
            subject: row.get(2)?,
            weekday: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
        })
    }

    /// Offset in days from the Monday that anchors a week
    pub fn day_offset(&self) -> i64 {
        i64::from(self.weekday)
    }
}

/// Map a 0-based (Monday first) index onto chrono's weekday.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn insert_template(
    conn: &Connection,
    student_id: i64,
    subject: &str,
    weekday: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<ClassTemplate> {
    if weekday_from_index(weekday).is_none() {
        return Err(ScheduleError::InvalidWeekday(weekday));
    }
    if end_time <= start_time {
        // Reuse the window error on an arbitrary day; only the times matter
        let day = chrono::NaiveDate::MIN;
        return Err(ScheduleError::InvalidWindow {
            start: day.and_time(start_time),
            end: day.and_time(end_time),
        });
    }

    conn.execute(
        "INSERT INTO class_templates (student_id, subject, weekday, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![student_id, subject, weekday, start_time, end_time],
    )?;

    Ok(ClassTemplate {
        id: conn.last_insert_rowid(),
        student_id,
        subject: subject.to_string(),
        weekday,
        start_time,
        end_time,
    })
}

pub fn templates_for_student(conn: &Connection, student_id: i64) -> Result<Vec<ClassTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, subject, weekday, start_time, end_time
         FROM class_templates
         WHERE student_id = ?1
         ORDER BY id",
    )?;

    let templates = stmt
        .query_map([student_id], ClassTemplate::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(templates)
}
