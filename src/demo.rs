// 🧪 Demo data - one student, a week of templates, one incoming interview

use crate::entities::{find_student_by_email, insert_student, insert_template, Student};
use crate::error::Result;
use crate::pipeline::{IncomingEvent, StaticEventSource};
use crate::scheduler::Scheduler;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;

pub const DEMO_EMAIL: &str = "raman@mail.com";

/// Monday of the demo week
pub fn demo_week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid calendar date")
}

/// Create the demo student with weekday templates plus a Saturday slot and
/// instantiate the demo week. Returns the existing student if already seeded.
pub fn seed_demo_student(conn: &mut Connection) -> Result<Student> {
    if let Some(student) = find_student_by_email(conn, DEMO_EMAIL)? {
        return Ok(student);
    }

    let student = insert_student(conn, "Raman", DEMO_EMAIL)?;

    let templates: [(&str, u8, (u32, u32), (u32, u32)); 5] = [
        ("Digital Electronics", 0, (10, 0), (11, 0)),
        ("Signals & Systems", 0, (11, 30), (12, 30)),
        ("Maths", 1, (10, 0), (11, 0)),
        ("DSA", 2, (10, 0), (11, 0)),
        ("Weekend Slot", 5, (10, 0), (11, 0)),
    ];
    for (subject, weekday, start, end) in templates {
        insert_template(conn, student.id, subject, weekday, time(start), time(end))?;
    }

    Scheduler::new(conn).instantiate_week(&student, demo_week())?;
    tracing::info!("🧪 Seeded demo student {}", student.email);

    Ok(student)
}

/// Event source holding the demo interview, overlapping Monday's first class
pub fn demo_event_source() -> StaticEventSource {
    let monday = demo_week();
    let mut source = StaticEventSource::new();
    source.push(
        DEMO_EMAIL,
        IncomingEvent::interview(
            "Placement Interview - Google",
            monday.and_time(time((10, 30))),
            monday.and_time(time((11, 30))),
        ),
    );
    source
}

fn time((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time of day")
}
