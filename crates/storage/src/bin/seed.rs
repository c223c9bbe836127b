use std::fmt;

use chrono::{DateTime, Duration, Offset, Utc};
use progress_core::model::{ActivityDocument, CourseId, ExerciseId, ExerciseInput};
use storage::repository::{KeyValueStore, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    key: String,
    days: u32,
    per_day: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidKey { raw: String },
    InvalidDays { raw: String },
    InvalidPerDay { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidKey { raw } => write!(f, "invalid --key value: {raw:?}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidPerDay { raw } => write!(f, "invalid --per-day value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("TRACKER_DB_URL").unwrap_or_else(|_| "sqlite:activity.sqlite3".into());
        let mut key =
            std::env::var("TRACKER_STORAGE_KEY").unwrap_or_else(|_| "activityTracker".into());
        let mut days = std::env::var("TRACKER_SEED_DAYS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(60);
        let mut per_day = std::env::var("TRACKER_SEED_PER_DAY")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(4);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--key" => {
                    let value = require_value(&mut args, "--key")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidKey { raw: value });
                    }
                    key = value;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--per-day" => {
                    let value = require_value(&mut args, "--per-day")?;
                    per_day = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidPerDay { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            key,
            days,
            per_day,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:activity.sqlite3)");
    eprintln!("  --key <name>              Storage key (default: activityTracker)");
    eprintln!("  --days <n>                Days of history to generate (default: 60)");
    eprintln!("  --per-day <n>             Exercises on an active day (default: 4)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  TRACKER_DB_URL, TRACKER_STORAGE_KEY, TRACKER_SEED_DAYS, TRACKER_SEED_PER_DAY");
}

/// Build a plausible history: every fifth day is skipped so streaks break,
/// and load varies so the heatmap shows every level.
fn generate(args: &Args, now: DateTime<Utc>) -> ActivityDocument {
    let utc = Utc.fix();
    let courses = [
        (CourseId::new("rust-basics"), "Rust Basics"),
        (CourseId::new("async-rust"), "Async Rust"),
        (CourseId::new("sql-intro"), "Intro to SQL"),
    ];

    let mut doc = ActivityDocument::empty();
    for back in (0..args.days).rev() {
        if back % 5 == 4 {
            continue;
        }
        let day_start = now - Duration::days(i64::from(back)) - Duration::hours(2);
        let (course_id, course_name) = &courses[(back as usize) % courses.len()];
        doc.view_course(course_id.clone(), course_name, 10, day_start, utc);

        let count = args.per_day + back % 7;
        for n in 0..count {
            let at = day_start + Duration::minutes(i64::from(n) * 7);
            let input = ExerciseInput::default()
                .with_time_spent(3 + n % 6)
                .with_correct(n % 4 != 3)
                .with_difficulty(u8::try_from(1 + n % 5).unwrap_or(3))
                .with_attempts(1 + n % 3);
            doc.record_exercise(ExerciseId::new(format!("ex-{back}-{n}")), input, at, utc);
        }
    }

    for ((course_id, _), percent) in courses.iter().zip([35, 70, 100]) {
        doc.update_course_progress(course_id, percent);
    }
    doc
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let doc = generate(&args, now);
    let json = serde_json::to_string(&doc)?;
    storage.persistent.set(&args.key, &json).await?;

    info!(
        key = %args.key,
        days = args.days,
        exercises = doc.exercises_completed,
        streak = doc.streak.current,
        db = %args.db_url,
        "seeded activity document"
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
