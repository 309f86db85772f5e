// 🗓️ Slot Catalog - recurring templates projected onto a concrete week
//
// A week is anchored on its Monday. Template weekday N lands on
// week_start + N days. Output is sorted by (start, end) so callers scanning
// it pick the earliest free slot first.

use crate::entities::template::{templates_for_student, ClassTemplate};
use crate::error::{Result, ScheduleError};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Weekend days, tried only after the full chronological scan came up empty
pub const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub template_id: i64,
}

impl WeekSlot {
    pub fn weekday(&self) -> Weekday {
        self.start.weekday()
    }

    pub fn is_weekend(&self) -> bool {
        WEEKEND.contains(&self.weekday())
    }
}

/// Week anchors must be Mondays; anything else would shift every slot.
pub fn ensure_monday(week_start: NaiveDate) -> Result<()> {
    let weekday = week_start.weekday();
    if weekday != Weekday::Mon {
        return Err(ScheduleError::WeekStartNotMonday {
            date: week_start,
            weekday,
        });
    }
    Ok(())
}

/// Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Pure projection of templates onto the week starting at `week_start`.
pub fn project_week(templates: &[ClassTemplate], week_start: NaiveDate) -> Result<Vec<WeekSlot>> {
    ensure_monday(week_start)?;

    let mut slots: Vec<WeekSlot> = templates
        .iter()
        .map(|tmpl| {
            let date = week_start + Duration::days(tmpl.day_offset());
            WeekSlot {
                start: date.and_time(tmpl.start_time),
                end: date.and_time(tmpl.end_time),
                template_id: tmpl.id,
            }
        })
        .collect();

    // Stable sort keeps template order for identical windows
    slots.sort_by_key(|slot| (slot.start, slot.end));

    Ok(slots)
}

/// Slot catalog for a student's week, read from their stored templates.
pub fn week_slots(
    conn: &rusqlite::Connection,
    student_id: i64,
    week_start: NaiveDate,
) -> Result<Vec<WeekSlot>> {
    ensure_monday(week_start)?;
    let templates = templates_for_student(conn, student_id)?;
    project_week(&templates, week_start)
}
