//! Error types for the scheduling core.

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use thiserror::Error;

/// Errors raised by the slot catalog, conflict detector and rescheduler.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A window whose end does not come after its start
    #[error("Invalid window: end {end} is not after start {start}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Week anchors must fall on a Monday
    #[error("Week start {date} is a {weekday}, expected a Monday")]
    WeekStartNotMonday { date: NaiveDate, weekday: Weekday },

    /// Template weekday outside 0 (Mon) ..= 6 (Sun)
    #[error("Weekday index {0} out of range 0..=6")]
    InvalidWeekday(u8),

    #[error("Student {0} not found")]
    StudentNotFound(i64),

    #[error("Scheduled class {0} not found")]
    ClassNotFound(i64),

    /// The class exists but is owned by someone else
    #[error("Scheduled class {class_id} belongs to student {owner_id}, not {student_id}")]
    ClassOwnership {
        class_id: i64,
        owner_id: i64,
        student_id: i64,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScheduleError {
    /// Returns true if the error is a caller contract violation rather than a store failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScheduleError::InvalidWindow { .. }
                | ScheduleError::WeekStartNotMonday { .. }
                | ScheduleError::InvalidWeekday(_)
                | ScheduleError::ClassOwnership { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Rejects windows where `end <= start`.
pub fn ensure_window(start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
    if end <= start {
        return Err(ScheduleError::InvalidWindow { start, end });
    }
    Ok(())
}
