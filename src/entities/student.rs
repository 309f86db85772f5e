// 🎓 Student Entity - owner of templates, classes, attendance and pending notes
//
// Deleting a student cascades to every dependent row (foreign keys in db.rs).

use crate::error::{Result, ScheduleError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    /// Contact address; also the notification recipient
    pub email: String,
}

impl Student {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
        })
    }
}

pub fn insert_student(conn: &Connection, name: &str, email: &str) -> Result<Student> {
    conn.execute(
        "INSERT INTO students (name, email) VALUES (?1, ?2)",
        params![name, email],
    )?;

    Ok(Student {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        email: email.to_string(),
    })
}

pub fn get_student(conn: &Connection, student_id: i64) -> Result<Student> {
    conn.query_row(
        "SELECT id, name, email FROM students WHERE id = ?1",
        [student_id],
        Student::from_row,
    )
    .optional()?
    .ok_or(ScheduleError::StudentNotFound(student_id))
}

pub fn find_student_by_email(conn: &Connection, email: &str) -> Result<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, name, email FROM students WHERE email = ?1",
            [email],
            Student::from_row,
        )
        .optional()?;

    Ok(student)
}

pub fn list_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn.prepare("SELECT id, name, email FROM students ORDER BY id")?;
    let students = stmt
        .query_map([], Student::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Delete a student together with everything they own.
pub fn delete_student(conn: &Connection, student_id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM students WHERE id = ?1", [student_id])?;
    if deleted == 0 {
        return Err(ScheduleError::StudentNotFound(student_id));
    }
    Ok(())
}
