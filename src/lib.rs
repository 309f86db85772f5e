// Tutor Schedule - Core Library
// Weekly class templates, scheduled classes, and interview-driven rescheduling

pub mod error;
pub mod db;
pub mod entities;
pub mod slots;          // Slot Catalog
pub mod availability;   // Availability Checker
pub mod conflicts;      // Conflict Detector
pub mod scheduler;      // Rescheduler + voluntary prep block
pub mod pipeline;       // Event source / notifier boundaries
pub mod import;         // CSV template import
pub mod config;
pub mod demo;

// Re-export commonly used types
pub use error::{ScheduleError, Result};
pub use db::{
    Event, open_database, setup_database, insert_event, get_events_for_entity,
    record_processed_event, count_rows,
};
pub use entities::{
    Student, ClassTemplate, ScheduledClass, NewScheduledClass,
    Attendance, AttendanceStatus, AttendanceReason, NewAttendance, PendingNote,
};
pub use slots::{WeekSlot, WEEKEND, week_slots, project_week, ensure_monday, monday_of};
pub use availability::is_free;
pub use conflicts::find_conflicts;
pub use scheduler::{Scheduler, ScheduleAction, notification_body, reschedule_within};
pub use pipeline::{
    IncomingEvent, EventSource, Notifier,
    StaticEventSource, LogNotifier, MemoryNotifier,
    process_incoming_events,
};
pub use import::{TemplateRecord, read_template_records, load_template_csv, import_templates};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
