// 📂 Template Import - recurring class templates from CSV
//
// Expected header: Subject,Weekday,Start,End
//   Weekday: 0 (Mon) .. 6 (Sun)
//   Start/End: HH:MM (24h)

use crate::entities::{insert_template, ClassTemplate};
use anyhow::{Context, Result};
use chrono::NaiveTime;
use rusqlite::Connection;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateRecord {
    #[serde(rename = "Subject")]
    pub subject: String,

    #[serde(rename = "Weekday")]
    pub weekday: u8,

    #[serde(rename = "Start")]
    pub start: String,

    #[serde(rename = "End")]
    pub end: String,
}

impl TemplateRecord {
    pub fn times(&self) -> Result<(NaiveTime, NaiveTime)> {
        Ok((parse_time(&self.start)?, parse_time(&self.end)?))
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .with_context(|| format!("Invalid time '{}', expected HH:MM", value))
}

pub fn read_template_records<R: Read>(reader: R) -> Result<Vec<TemplateRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        // +2: header line, 1-based numbering
        let record: TemplateRecord =
            result.with_context(|| format!("Failed to deserialize template on line {}", index + 2))?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_template_csv(csv_path: &Path) -> Result<Vec<TemplateRecord>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_template_records(file)
}

/// Insert all records for one student; nothing is stored if any record is invalid.
pub fn import_templates(
    conn: &mut Connection,
    student_id: i64,
    records: &[TemplateRecord],
) -> Result<Vec<ClassTemplate>> {
    let tx = conn.transaction()?;

    let mut imported = Vec::with_capacity(records.len());
    for record in records {
        let (start, end) = record.times()?;
        let template = insert_template(&tx, student_id, &record.subject, record.weekday, start, end)
            .with_context(|| format!("Rejected template '{}'", record.subject))?;
        imported.push(template);
    }

    tx.commit()?;
    tracing::info!("📂 Imported {} templates for student {}", imported.len(), student_id);

    Ok(imported)
}
