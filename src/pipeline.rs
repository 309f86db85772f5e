// 📬 Event Pipeline - upstream feed -> rescheduler -> notification
//
// The event source (mail inbox, calendar invites) and the notification channel
// (SMS, email) are collaborators behind traits. The scheduling core never
// depends on their concrete form.

use crate::db::record_processed_event;
use crate::entities::{insert_scheduled_class, NewScheduledClass, Student};
use crate::error::ensure_window;
use crate::scheduler::{notification_body, reschedule_within, ScheduleAction};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

// ============================================================================
// INCOMING EVENT
// ============================================================================

/// An interview/assessment detected upstream for one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEvent {
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default = "default_is_interview")]
    pub is_interview: bool,
}

fn default_is_interview() -> bool {
    true
}

impl IncomingEvent {
    pub fn interview(subject: &str, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        IncomingEvent {
            subject: subject.to_string(),
            start,
            end,
            is_interview: true,
        }
    }

    /// Hash identifying a delivery of this event for this student.
    /// Same event delivered twice => same hash.
    pub fn idempotency_hash(&self, student_id: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            student_id, self.subject, self.start, self.end
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Supplies newly detected events for a student
pub trait EventSource {
    fn fetch_events(&self, student: &Student) -> Result<Vec<IncomingEvent>>;
}

/// Delivers a message body to a recipient
pub trait Notifier {
    fn send(&self, recipient: &str, body: &str) -> Result<()>;
}

/// Event source backed by a fixed map of email -> events.
/// Unknown students simply have no events.
#[derive(Debug, Default, Clone)]
pub struct StaticEventSource {
    events: HashMap<String, Vec<IncomingEvent>>,
}

impl StaticEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, email: &str, event: IncomingEvent) {
        self.events.entry(email.to_string()).or_default().push(event);
    }
}

impl EventSource for StaticEventSource {
    fn fetch_events(&self, student: &Student) -> Result<Vec<IncomingEvent>> {
        Ok(self.events.get(&student.email).cloned().unwrap_or_default())
    }
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, recipient: &str, body: &str) -> Result<()> {
        tracing::info!("📣 [notification to {}]\n{}", recipient, body);
        Ok(())
    }
}

/// Notifier that keeps every message in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// (recipient, body) pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, recipient: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("notification log poisoned"))?
            .push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Pull the student's new events, resolve each one, then notify once.
///
/// Each event is applied in its own transaction: dedup marker, the interview
/// block and the rescheduling commit together. Events already processed are
/// skipped, as are events with an empty or inverted window. If an event fails
/// to apply, the actions committed before it are still sent before the error
/// is returned.
pub fn process_incoming_events(
    conn: &mut Connection,
    source: &dyn EventSource,
    notifier: &dyn Notifier,
    student: &Student,
    week_start: NaiveDate,
) -> Result<Vec<ScheduleAction>> {
    let events = source
        .fetch_events(student)
        .with_context(|| format!("Failed to fetch events for {}", student.email))?;

    let mut actions = Vec::new();
    let mut failure = None;

    for event in events {
        if let Err(err) = ensure_window(event.start, event.end) {
            tracing::warn!("⚠️  Skipping event '{}': {}", event.subject, err);
            continue;
        }

        match apply_event(conn, student, &event, week_start) {
            Ok(Some(event_actions)) => {
                tracing::info!(
                    "📬 Applied '{}' for {}: {} actions",
                    event.subject,
                    student.email,
                    event_actions.len()
                );
                actions.extend(event_actions);
            }
            Ok(None) => {
                tracing::debug!("Skipping already processed event '{}'", event.subject);
            }
            Err(err) => {
                failure = Some(err.context(format!("Failed to apply '{}'", event.subject)));
                break;
            }
        }
    }

    if !actions.is_empty() {
        let sent = notifier
            .send(&student.email, &notification_body(&actions))
            .with_context(|| format!("Failed to notify {}", student.email));

        match (sent, &failure) {
            (Err(err), None) => return Err(err),
            (Err(err), Some(_)) => tracing::error!("❌ {:#}", err),
            (Ok(()), _) => {}
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(actions),
    }
}

/// Apply one event in its own transaction. `None` if it was already processed.
fn apply_event(
    conn: &mut Connection,
    student: &Student,
    event: &IncomingEvent,
    week_start: NaiveDate,
) -> Result<Option<Vec<ScheduleAction>>> {
    let tx = conn.transaction()?;

    if !record_processed_event(&tx, &event.idempotency_hash(student.id), student.id)? {
        return Ok(None);
    }

    if event.is_interview {
        // Interview rows are never conflicts, but they do occupy the window,
        // so no displaced class can be moved inside it
        insert_scheduled_class(
            &tx,
            &NewScheduledClass::interview(student.id, &event.subject, event.start, event.end),
        )?;
    }

    let actions = reschedule_within(&tx, student, event.start, event.end, week_start)?;

    tx.commit()?;
    Ok(Some(actions))
}
