// 🔄 Rescheduler - resolve conflicts between incoming events and classes
//
// For each class an event displaces:
//   1. credit the student (Attendance Present / Interview) for the original date
//   2. scan the week's slot catalog for the first free slot, then weekend slots
//   3. move the class there, or mark it pending with a PendingNote
//
// One invocation = one SQLite transaction. Every read inside it goes through
// that transaction, so later conflicts see the slots taken by earlier ones.

use crate::availability::is_free;
use crate::conflicts::find_conflicts;
use crate::db::{insert_event, Event};
use crate::entities::{
    insert_attendance, insert_pending_note, insert_scheduled_class, mark_class_pending,
    reassign_class, AttendanceReason, AttendanceStatus, NewAttendance, NewScheduledClass,
    ScheduledClass, Student,
};
use crate::error::{ensure_window, Result, ScheduleError};
use crate::slots::{ensure_monday, week_slots, WeekSlot};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;

const ACTOR: &str = "rescheduler";

// ============================================================================
// ACTIONS
// ============================================================================

/// One step taken while resolving an event, rendered for notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleAction {
    ConflictFound {
        subject: String,
        start: NaiveDateTime,
    },
    Rescheduled {
        subject: String,
        new_start: NaiveDateTime,
    },
    MarkedPending {
        subject: String,
    },
}

impl fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleAction::ConflictFound { subject, start } => {
                write!(f, "Conflict found: {} at {}", subject, start.format("%Y-%m-%d %H:%M:%S"))
            }
            ScheduleAction::Rescheduled { subject, new_start } => {
                write!(f, "Rescheduled {} -> {}", subject, new_start.format("%Y-%m-%d %H:%M"))
            }
            ScheduleAction::MarkedPending { subject } => {
                write!(f, "Marked pending: {} (no free slot)", subject)
            }
        }
    }
}

/// Message body handed to the notification collaborator
pub fn notification_body(actions: &[ScheduleAction]) -> String {
    actions
        .iter()
        .map(|action| action.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Scheduling operations over an explicitly supplied database handle
pub struct Scheduler<'a> {
    conn: &'a mut Connection,
}

impl<'a> Scheduler<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Scheduler { conn }
    }

    /// Resolve every class displaced by `[event_start, event_end)`.
    ///
    /// All attendance, pending-note and class writes commit together or not at all.
    pub fn reschedule_for_event(
        &mut self,
        student: &Student,
        event_start: NaiveDateTime,
        event_end: NaiveDateTime,
        week_start: NaiveDate,
    ) -> Result<Vec<ScheduleAction>> {
        let tx = self.conn.transaction()?;
        let actions = reschedule_within(&tx, student, event_start, event_end, week_start)?;
        tx.commit()?;
        Ok(actions)
    }

    /// Student voluntarily skips a class to prepare for placements.
    pub fn block_for_prep(&mut self, student: &Student, class: &ScheduledClass) -> Result<String> {
        if class.student_id != student.id {
            return Err(ScheduleError::ClassOwnership {
                class_id: class.id,
                owner_id: class.student_id,
                student_id: student.id,
            });
        }

        let tx = self.conn.transaction()?;
        record_attendance(&tx, student, class, AttendanceReason::Prep)?;
        tx.commit()?;

        tracing::info!("📚 {} blocked '{}' for prep", student.email, class.subject);

        Ok(format!(
            "Class {} on {} marked Present for Prep.",
            class.subject,
            class.start.format("%Y-%m-%d %H:%M:%S")
        ))
    }

    /// Materialize one scheduled class per slot of the student's week.
    pub fn instantiate_week(&mut self, student: &Student, week_start: NaiveDate) -> Result<Vec<ScheduledClass>> {
        let tx = self.conn.transaction()?;
        let templates = crate::entities::templates_for_student(&tx, student.id)?;
        let slots = crate::slots::project_week(&templates, week_start)?;

        let mut created = Vec::with_capacity(slots.len());
        for slot in &slots {
            let subject = templates
                .iter()
                .find(|tmpl| tmpl.id == slot.template_id)
                .map(|tmpl| tmpl.subject.as_str())
                .unwrap_or_default();
            created.push(insert_scheduled_class(
                &tx,
                &NewScheduledClass::class(student.id, subject, slot.start, slot.end),
            )?);
        }
        tx.commit()?;

        tracing::debug!("Instantiated {} classes for {} (week of {})", created.len(), student.email, week_start);
        Ok(created)
    }
}

/// Core of [`Scheduler::reschedule_for_event`], run against a caller-owned
/// transaction so it can be combined with other writes in one unit.
pub fn reschedule_within(
    conn: &Connection,
    student: &Student,
    event_start: NaiveDateTime,
    event_end: NaiveDateTime,
    week_start: NaiveDate,
) -> Result<Vec<ScheduleAction>> {
    ensure_window(event_start, event_end)?;
    ensure_monday(week_start)?;

    let conflicts = find_conflicts(conn, student.id, event_start, event_end)?;
    let mut actions = Vec::new();

    for class in conflicts {
        tracing::info!("⚔️ Conflict found: '{}' at {} for {}", class.subject, class.start, student.email);
        actions.push(ScheduleAction::ConflictFound {
            subject: class.subject.clone(),
            start: class.start,
        });

        // Compensation is unconditional, whether or not a new slot turns up
        record_attendance(conn, student, &class, AttendanceReason::Interview)?;

        let slots = week_slots(conn, student.id, week_start)?;
        let candidate = match first_free_slot(conn, student.id, slots.iter())? {
            Some(slot) => Some(slot),
            None => first_free_slot(conn, student.id, slots.iter().filter(|s| s.is_weekend()))?,
        };

        match candidate {
            Some(slot) => {
                reassign_class(conn, class.id, class.id, slot.start, slot.end)?;
                insert_event(
                    conn,
                    &Event::new(
                        "class_rescheduled",
                        "scheduled_class",
                        &class.id.to_string(),
                        serde_json::json!({
                            "subject": class.subject,
                            "from_start": class.start.to_string(),
                            "to_start": slot.start.to_string(),
                            "template_id": slot.template_id,
                        }),
                        ACTOR,
                    ),
                )?;

                tracing::info!("🔄 Rescheduled '{}' -> {}", class.subject, slot.start);
                actions.push(ScheduleAction::Rescheduled {
                    subject: class.subject.clone(),
                    new_start: slot.start,
                });
            }
            None => {
                mark_class_pending(conn, class.id)?;
                insert_pending_note(conn, student.id, &class.subject, class.start)?;
                insert_event(
                    conn,
                    &Event::new(
                        "class_marked_pending",
                        "scheduled_class",
                        &class.id.to_string(),
                        serde_json::json!({
                            "subject": class.subject,
                            "original_start": class.start.to_string(),
                        }),
                        ACTOR,
                    ),
                )?;

                tracing::warn!("⏳ No free slot for '{}', marked pending", class.subject);
                actions.push(ScheduleAction::MarkedPending {
                    subject: class.subject.clone(),
                });
            }
        }
    }

    Ok(actions)
}

/// First slot, in iteration order, that the availability checker reports free.
fn first_free_slot<'s>(
    conn: &Connection,
    student_id: i64,
    slots: impl Iterator<Item = &'s WeekSlot>,
) -> Result<Option<WeekSlot>> {
    for slot in slots {
        if is_free(conn, student_id, slot.start, slot.end)? {
            return Ok(Some(*slot));
        }
        tracing::debug!("Slot {} - {} is taken", slot.start, slot.end);
    }
    Ok(None)
}

fn record_attendance(
    conn: &Connection,
    student: &Student,
    class: &ScheduledClass,
    reason: AttendanceReason,
) -> Result<()> {
    insert_attendance(
        conn,
        &NewAttendance {
            student_id: student.id,
            scheduled_class_id: class.id,
            date: class.start.date(),
            status: AttendanceStatus::Present,
            reason: Some(reason),
        },
    )?;

    insert_event(
        conn,
        &Event::new(
            "attendance_recorded",
            "scheduled_class",
            &class.id.to_string(),
            serde_json::json!({
                "date": class.start.date().to_string(),
                "reason": reason.as_str(),
            }),
            ACTOR,
        ),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_rows, get_events_for_entity, setup_database};
    use crate::entities::{
        attendance_for_class, attendance_for_student, get_scheduled_class, insert_student,
        insert_template, pending_notes_for_student, scheduled_classes_for_student,
    };
    use chrono::NaiveTime;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn setup() -> (Connection, Student) {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let student = insert_student(&conn, "Test", "test@mail.com").unwrap();
        (conn, student)
    }

    fn add_class(conn: &Connection, student: &Student, subject: &str, start: NaiveDateTime, end: NaiveDateTime) -> ScheduledClass {
        insert_scheduled_class(conn, &NewScheduledClass::class(student.id, subject, start, end)).unwrap()
    }

    /// Every touched class is either pending with a note, or clear of all other committed classes
    fn assert_schedule_consistent(conn: &Connection, student: &Student, touched: &[i64]) {
        let classes = scheduled_classes_for_student(conn, student.id).unwrap();
        let notes = pending_notes_for_student(conn, student.id).unwrap();

        for id in touched {
            let class = classes.iter().find(|c| c.id == *id).unwrap();
            if class.pending {
                assert!(
                    notes.iter().any(|n| n.subject == class.subject),
                    "pending class '{}' has no note",
                    class.subject
                );
            } else {
                for other in classes.iter().filter(|o| o.id != class.id && !o.pending) {
                    assert!(
                        !class.overlaps(other.start, other.end),
                        "'{}' overlaps '{}'",
                        class.subject,
                        other.subject
                    );
                }
            }
        }
    }

    #[test]
    fn test_single_template_goes_pending() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Core", 0, t(10, 0), t(11, 0)).unwrap();
        let class = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));

        let actions = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 30), at(8, 11, 30), monday())
            .unwrap();

        let rendered: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Conflict found: Core at 2025-09-08 10:00:00".to_string(),
                "Marked pending: Core (no free slot)".to_string(),
            ]
        );

        let attendance = attendance_for_class(&conn, class.id).unwrap();
        assert_eq!(attendance.len(), 1);
        assert_eq!(attendance[0].status, AttendanceStatus::Present);
        assert_eq!(attendance[0].reason, Some(AttendanceReason::Interview));
        assert_eq!(attendance[0].date, monday());

        let stored = get_scheduled_class(&conn, class.id).unwrap();
        assert!(stored.pending);
        assert_eq!(stored.start, at(8, 10, 0));

        let notes = pending_notes_for_student(&conn, student.id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].subject, "Core");
        assert_eq!(notes[0].original_start, at(8, 10, 0));

        assert_schedule_consistent(&conn, &student, &[class.id]);
    }

    #[test]
    fn test_both_monday_slots_taken_goes_pending() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Digital Electronics", 0, t(10, 0), t(11, 0)).unwrap();
        insert_template(&conn, student.id, "Signals & Systems", 0, t(11, 30), t(12, 30)).unwrap();
        let first = add_class(&conn, &student, "Digital Electronics", at(8, 10, 0), at(8, 11, 0));
        let second = add_class(&conn, &student, "Signals & Systems", at(8, 11, 30), at(8, 12, 30));

        let actions = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 30), at(8, 11, 15), monday())
            .unwrap();

        assert_eq!(actions.len(), 2);
        assert_eq!(
            actions[1],
            ScheduleAction::MarkedPending { subject: "Digital Electronics".to_string() }
        );
        assert!(get_scheduled_class(&conn, first.id).unwrap().pending);
        assert!(!get_scheduled_class(&conn, second.id).unwrap().pending);
        assert_schedule_consistent(&conn, &student, &[first.id]);
    }

    #[test]
    fn test_free_weekend_template_takes_the_class() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Digital Electronics", 0, t(10, 0), t(11, 0)).unwrap();
        insert_template(&conn, student.id, "Signals & Systems", 0, t(11, 30), t(12, 30)).unwrap();
        insert_template(&conn, student.id, "Weekend Slot", 5, t(10, 0), t(11, 0)).unwrap();
        let first = add_class(&conn, &student, "Digital Electronics", at(8, 10, 0), at(8, 11, 0));
        add_class(&conn, &student, "Signals & Systems", at(8, 11, 30), at(8, 12, 30));

        let actions = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 30), at(8, 11, 15), monday())
            .unwrap();

        assert_eq!(
            actions.last().unwrap().to_string(),
            "Rescheduled Digital Electronics -> 2025-09-13 10:00"
        );

        let moved = get_scheduled_class(&conn, first.id).unwrap();
        assert_eq!(moved.start, at(13, 10, 0));
        assert_eq!(moved.end, at(13, 11, 0));
        assert_eq!(moved.rescheduled_from, Some(first.id));
        assert!(!moved.pending);

        // Compensation is dated to the original slot, not the new one
        let attendance = attendance_for_class(&conn, first.id).unwrap();
        assert_eq!(attendance[0].date, monday());

        assert_eq!(count_rows(&conn, "pending_notes").unwrap(), 0);
        assert_schedule_consistent(&conn, &student, &[first.id]);
    }

    #[test]
    fn test_weekday_slot_preferred_over_weekend() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Core", 0, t(10, 0), t(11, 0)).unwrap();
        insert_template(&conn, student.id, "Weekend Slot", 6, t(9, 0), t(10, 0)).unwrap();
        insert_template(&conn, student.id, "Maths", 1, t(10, 0), t(11, 0)).unwrap();
        let class = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));

        Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 0), at(8, 11, 0), monday())
            .unwrap();

        let moved = get_scheduled_class(&conn, class.id).unwrap();
        assert_eq!(moved.start, at(9, 10, 0), "Tuesday slot comes before Sunday");
    }

    #[test]
    fn test_later_conflicts_see_earlier_moves() {
        let (mut conn, student) = setup();
        // Two ad-hoc classes displaced, the catalog has a single Wednesday slot
        insert_template(&conn, student.id, "DSA", 2, t(10, 0), t(11, 0)).unwrap();
        let core = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));
        let lab = add_class(&conn, &student, "Lab", at(8, 11, 0), at(8, 12, 0));

        let actions = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 9, 0), at(8, 13, 0), monday())
            .unwrap();

        let rendered: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Conflict found: Core at 2025-09-08 10:00:00",
                "Rescheduled Core -> 2025-09-10 10:00",
                "Conflict found: Lab at 2025-09-08 11:00:00",
                "Marked pending: Lab (no free slot)",
            ]
        );

        assert_eq!(get_scheduled_class(&conn, core.id).unwrap().start, at(10, 10, 0));
        assert!(get_scheduled_class(&conn, lab.id).unwrap().pending);

        // Exactly one Interview credit per displaced class
        let attendance = attendance_for_student(&conn, student.id).unwrap();
        assert_eq!(attendance.len(), 2);
        assert!(attendance.iter().all(|a| a.reason == Some(AttendanceReason::Interview)));

        assert_schedule_consistent(&conn, &student, &[core.id, lab.id]);
    }

    #[test]
    fn test_slot_vacated_earlier_in_batch_is_reused() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Core", 0, t(10, 0), t(11, 0)).unwrap();
        insert_template(&conn, student.id, "Lab", 0, t(11, 0), t(12, 0)).unwrap();
        insert_template(&conn, student.id, "DSA", 2, t(10, 0), t(11, 0)).unwrap();
        let core = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));
        let lab = add_class(&conn, &student, "Lab", at(8, 11, 0), at(8, 12, 0));

        let actions = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 9, 0), at(8, 13, 0), monday())
            .unwrap();

        // Core leaves Monday 10:00 for Wednesday; Lab then finds Monday 10:00 free
        assert_eq!(actions[1].to_string(), "Rescheduled Core -> 2025-09-10 10:00");
        assert_eq!(actions[3].to_string(), "Rescheduled Lab -> 2025-09-08 10:00");
        assert_eq!(get_scheduled_class(&conn, lab.id).unwrap().start, at(8, 10, 0));

        assert_schedule_consistent(&conn, &student, &[core.id, lab.id]);
    }

    #[test]
    fn test_interview_and_pending_rows_are_not_displaced() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Core", 1, t(10, 0), t(11, 0)).unwrap();
        insert_scheduled_class(
            &conn,
            &NewScheduledClass::interview(student.id, "Earlier Interview", at(8, 10, 0), at(8, 11, 0)),
        )
        .unwrap();
        let pending = add_class(&conn, &student, "Old", at(8, 10, 0), at(8, 11, 0));
        mark_class_pending(&conn, pending.id).unwrap();

        let actions = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 0), at(8, 11, 0), monday())
            .unwrap();

        assert!(actions.is_empty());
        assert_eq!(count_rows(&conn, "attendance").unwrap(), 0);
    }

    #[test]
    fn test_audit_trail_records_move() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Maths", 1, t(10, 0), t(11, 0)).unwrap();
        let class = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));

        Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 0), at(8, 11, 0), monday())
            .unwrap();

        let events = get_events_for_entity(&conn, "scheduled_class", &class.id.to_string()).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["attendance_recorded", "class_rescheduled"]);
        assert_eq!(events[1].data["to_start"], "2025-09-09 10:00:00");
    }

    #[test]
    fn test_validation_happens_before_any_write() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Core", 0, t(10, 0), t(11, 0)).unwrap();
        add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));
        let mut scheduler = Scheduler::new(&mut conn);

        let tuesday = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
        let err = scheduler
            .reschedule_for_event(&student, at(8, 10, 0), at(8, 11, 0), tuesday)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::WeekStartNotMonday { .. }));

        let err = scheduler
            .reschedule_for_event(&student, at(8, 11, 0), at(8, 10, 0), monday())
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(count_rows(&conn, "attendance").unwrap(), 0);
    }

    #[test]
    fn test_store_failure_rolls_back_everything() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "Core", 0, t(10, 0), t(11, 0)).unwrap();
        let class = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));

        // Make the pending-note write fail after attendance and the class update
        conn.execute_batch(
            "CREATE TRIGGER fail_pending BEFORE INSERT ON pending_notes
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

        let result = Scheduler::new(&mut conn)
            .reschedule_for_event(&student, at(8, 10, 30), at(8, 11, 30), monday());
        assert!(matches!(result, Err(ScheduleError::Database(_))));

        assert_eq!(count_rows(&conn, "attendance").unwrap(), 0);
        assert_eq!(count_rows(&conn, "events").unwrap(), 0);
        assert!(!get_scheduled_class(&conn, class.id).unwrap().pending);
    }

    #[test]
    fn test_block_for_prep() {
        let (mut conn, student) = setup();
        let class = add_class(&conn, &student, "Core", at(8, 10, 0), at(8, 11, 0));

        let message = Scheduler::new(&mut conn).block_for_prep(&student, &class).unwrap();
        assert_eq!(message, "Class Core on 2025-09-08 10:00:00 marked Present for Prep.");

        let attendance = attendance_for_class(&conn, class.id).unwrap();
        assert_eq!(attendance.len(), 1);
        assert_eq!(attendance[0].reason, Some(AttendanceReason::Prep));
        assert_eq!(attendance[0].date, monday());

        // The class itself is untouched
        assert_eq!(get_scheduled_class(&conn, class.id).unwrap(), class);
    }

    #[test]
    fn test_block_for_prep_rejects_foreign_class() {
        let (mut conn, student) = setup();
        let other = insert_student(&conn, "Other", "other@mail.com").unwrap();
        let class = add_class(&conn, &other, "Core", at(8, 10, 0), at(8, 11, 0));

        let err = Scheduler::new(&mut conn).block_for_prep(&student, &class).unwrap_err();
        assert!(matches!(err, ScheduleError::ClassOwnership { .. }));
        assert_eq!(count_rows(&conn, "attendance").unwrap(), 0);
    }

    #[test]
    fn test_instantiate_week() {
        let (mut conn, student) = setup();
        insert_template(&conn, student.id, "DSA", 2, t(10, 0), t(11, 0)).unwrap();
        insert_template(&conn, student.id, "Core", 0, t(10, 0), t(11, 0)).unwrap();

        let created = Scheduler::new(&mut conn).instantiate_week(&student, monday()).unwrap();

        let subjects: Vec<&str> = created.iter().map(|c| c.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Core", "DSA"]);
        assert_eq!(created[1].start, at(10, 10, 0));
        assert_eq!(scheduled_classes_for_student(&conn, student.id).unwrap().len(), 2);
    }

    #[test]
    fn test_notification_body() {
        let actions = vec![
            ScheduleAction::ConflictFound { subject: "Core".to_string(), start: at(8, 10, 0) },
            ScheduleAction::MarkedPending { subject: "Core".to_string() },
        ];

        assert_eq!(
            notification_body(&actions),
            "Conflict found: Core at 2025-09-08 10:00:00\nMarked pending: Core (no free slot)"
        );
        assert_eq!(notification_body(&[]), "");
    }
}
