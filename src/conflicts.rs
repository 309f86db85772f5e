// ⚔️ Conflict Detector - which classes does an incoming event displace?

use crate::entities::scheduled_class::{ScheduledClass, CLASS_COLUMNS};
use crate::error::{ensure_window, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

/// Every regular, non-pending class of the student overlapping the event window.
///
/// Interview rows and classes already marked pending are never displaced.
/// Results are ordered by (start, id); the rescheduler processes them in that order.
pub fn find_conflicts(
    conn: &Connection,
    student_id: i64,
    event_start: NaiveDateTime,
    event_end: NaiveDateTime,
) -> Result<Vec<ScheduledClass>> {
    ensure_window(event_start, event_end)?;

    let sql = format!(
        "SELECT {} FROM scheduled_classes
         WHERE student_id = ?1
           AND is_interview = 0
           AND pending = 0
           AND start_dt < ?2
           AND end_dt > ?3
         ORDER BY start_dt, id",
        CLASS_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let conflicts = stmt
        .query_map(params![student_id, event_end, event_start], ScheduledClass::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::entities::{
        insert_scheduled_class, insert_student, mark_class_pending, scheduled_classes_for_student,
        NewScheduledClass,
    };
    use crate::error::ScheduleError;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_only_overlapping_regular_classes_are_returned() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let student = insert_student(&conn, "Test", "test@mail.com").unwrap();
        let add = |new: NewScheduledClass| insert_scheduled_class(&conn, &new).unwrap();

        let hit_late = add(NewScheduledClass::class(student.id, "Late", at(8, 11, 0), at(8, 12, 0)));
        let hit_early = add(NewScheduledClass::class(student.id, "Early", at(8, 9, 30), at(8, 10, 45)));
        add(NewScheduledClass::class(student.id, "Touching", at(8, 12, 0), at(8, 13, 0)));
        add(NewScheduledClass::class(student.id, "Tuesday", at(9, 10, 30), at(9, 11, 30)));
        add(NewScheduledClass::interview(student.id, "Interview", at(8, 10, 0), at(8, 11, 0)));
        let pending = add(NewScheduledClass::class(student.id, "Pending", at(8, 10, 0), at(8, 11, 0)));
        mark_class_pending(&conn, pending.id).unwrap();

        let (event_start, event_end) = (at(8, 10, 30), at(8, 12, 0));
        let conflicts = find_conflicts(&conn, student.id, event_start, event_end).unwrap();

        let ids: Vec<i64> = conflicts.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![hit_early.id, hit_late.id]);

        // Exactly the overlapping, regular, non-pending rows
        for class in scheduled_classes_for_student(&conn, student.id).unwrap() {
            let expected = !class.is_interview
                && !class.pending
                && class.overlaps(event_start, event_end);
            assert_eq!(ids.contains(&class.id), expected, "{}", class.subject);
        }
    }

    #[test]
    fn test_rejects_inverted_event() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let result = find_conflicts(&conn, 1, at(8, 11, 0), at(8, 10, 0));
        assert!(matches!(result, Err(ScheduleError::InvalidWindow { .. })));
    }
}
