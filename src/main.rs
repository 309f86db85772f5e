use anyhow::{bail, Context, Result};
use chrono::Local;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use tutor_schedule::{
    demo, entities, import_templates, load_template_csv, monday_of, open_database,
    process_incoming_events, AppConfig, EventSource, LogNotifier, StaticEventSource,
};

const CONFIG_PATH: &str = "tutor_schedule.toml";

fn main() -> Result<()> {
    let config = AppConfig::load(Some(Path::new(CONFIG_PATH)))?;
    init_logging(&config.log_filter);

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("pending") => run_pending(&config)?,
        Some("import") => {
            let (Some(csv_path), Some(email)) = (args.get(2), args.get(3)) else {
                bail!("usage: tutor-schedule import <templates.csv> <student-email>");
            };
            run_import(&config, Path::new(csv_path), email)?;
        }
        Some("demo") | None => run_demo(&config)?,
        Some(other) => bail!("unknown command '{}' (expected demo, pending or import)", other),
    }

    Ok(())
}

fn init_logging(default_filter: &str) {
    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_demo(config: &AppConfig) -> Result<()> {
    println!("📅 Tutor Schedule v{} - interview rescheduling demo", tutor_schedule::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut conn = open_database(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    let student = demo::seed_demo_student(&mut conn)?;
    let week = config.week_start.unwrap_or_else(demo::demo_week);

    // Outside demo mode no real inbox is wired up yet, so there is nothing to fetch
    let source: Box<dyn EventSource> = if config.demo_mode {
        Box::new(demo::demo_event_source())
    } else {
        tracing::warn!("Demo mode off and no event source configured; nothing to process");
        Box::new(StaticEventSource::new())
    };

    println!("\n📬 Processing incoming events for {}...", student.email);
    let actions = process_incoming_events(&mut conn, source.as_ref(), &LogNotifier, &student, week)?;

    if actions.is_empty() {
        println!("✓ No conflicts");
    }
    for action in &actions {
        println!("ACTION: {}", action);
    }

    Ok(())
}

fn run_pending(config: &AppConfig) -> Result<()> {
    let conn = open_database(&config.database_path)?;
    let week = config
        .week_start
        .unwrap_or_else(|| monday_of(Local::now().date_naive()));

    println!("⏳ Pending classes for the week of {}", week);
    for student in entities::list_students(&conn)? {
        let notes = entities::pending_notes_in_week(&conn, student.id, week)?;
        if notes.is_empty() {
            continue;
        }

        println!("\n{} <{}>", student.name, student.email);
        for note in notes {
            println!("  - {} (originally {})", note.subject, note.original_start);
        }
    }

    Ok(())
}

fn run_import(config: &AppConfig, csv_path: &Path, email: &str) -> Result<()> {
    let mut conn = open_database(&config.database_path)?;

    let Some(student) = entities::find_student_by_email(&conn, email)? else {
        bail!("no student with email {}", email);
    };

    let records = load_template_csv(csv_path)?;
    let imported = import_templates(&mut conn, student.id, &records)?;

    println!("✓ Imported {} templates for {}", imported.len(), student.email);
    Ok(())
}
