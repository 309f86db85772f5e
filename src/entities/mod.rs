// Entity Models
//
// Each entity has:
// - A row struct mirroring its table
// - Free functions for create/read/update taking an explicit &Connection
//   (a rusqlite::Transaction derefs to one, so the same calls work inside a batch)

pub mod student;
pub mod template;
pub mod scheduled_class;
pub mod attendance;
pub mod pending;

pub use student::{Student, insert_student, get_student, find_student_by_email, list_students, delete_student};
pub use template::{ClassTemplate, insert_template, templates_for_student, weekday_from_index};
pub use scheduled_class::{
    ScheduledClass, NewScheduledClass,
    insert_scheduled_class, get_scheduled_class, scheduled_classes_for_student,
    reassign_class, mark_class_pending,
};
pub use attendance::{
    Attendance, AttendanceStatus, AttendanceReason, NewAttendance,
    insert_attendance, attendance_for_student, attendance_for_class,
};
pub use pending::{PendingNote, insert_pending_note, pending_notes_for_student, pending_notes_in_week};
