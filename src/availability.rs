// 🔍 Availability Checker - is a window still open for this student?
//
// Reads go through whatever connection the caller holds. Inside the
// rescheduler that is the open transaction, so classes moved earlier in the
// same batch are already visible here.

use crate::error::{ensure_window, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

/// True iff no committed (non-pending) class of the student overlaps
/// `[window_start, window_end)`. Interview rows count as committed.
pub fn is_free(
    conn: &Connection,
    student_id: i64,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Result<bool> {
    ensure_window(window_start, window_end)?;

    let blocking: i64 = conn.query_row(
        "SELECT COUNT(*) FROM scheduled_classes
         WHERE student_id = ?1
           AND pending = 0
           AND start_dt < ?2
           AND end_dt > ?3",
        params![student_id, window_end, window_start],
        |row| row.get(0),
    )?;

    Ok(blocking == 0)
}
