use std::fmt;

use chrono::{DateTime, Duration, Utc};
use recall_core::model::{FlashcardDraft, FlashcardId};
use storage::repository::Storage;

const SAMPLES: [(&str, &str); 8] = [
    ("Hello", "Hola"),
    ("Thank you", "Gracias"),
    ("Please", "Por favor"),
    ("Goodbye", "Adiós"),
    ("Good morning", "Buenos días"),
    ("Water", "Agua"),
    ("Cat", "Gato"),
    ("Where is the station?", "¿Dónde está la estación?"),
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    cards: usize,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
    InvalidCards { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidCards { raw } => write!(f, "invalid --cards value: {raw}"),
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
            std::env::var("RECALL_DB_URL").unwrap_or_else(|_| "sqlite:recall.sqlite3?mode=rwc".into());
        let mut cards = std::env::var("RECALL_SEED_CARDS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(SAMPLES.len());
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
                "--cards" => {
                    let value = require_value(&mut args, "--cards")?;
                    cards = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidCards { raw: value.clone() })?;
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
            cards: cards.min(SAMPLES.len()),
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:recall.sqlite3?mode=rwc)");
    eprintln!("  --cards <n>               Number of sample flashcards to add (default: all {})", SAMPLES.len());
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  RECALL_DB_URL, RECALL_SEED_CARDS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let existing: Vec<String> = storage
        .flashcards
        .list_flashcards()
        .await?
        .iter()
        .map(|card| card.front().as_str().to_owned())
        .collect();

    let mut added = 0_usize;
    for (offset, (front, back)) in SAMPLES.iter().take(args.cards).enumerate() {
        if existing.iter().any(|f| f == front) {
            continue;
        }
        // Spread creation times so list order matches the sample order.
        let created_at = now + Duration::seconds(i64::try_from(offset)?);
        let card = FlashcardDraft::new(*front, *back)
            .validate(created_at)?
            .assign_id(FlashcardId::generate());
        storage.flashcards.insert_flashcard(&card).await?;
        added += 1;
    }

    println!(
        "Seeded {added} flashcards ({} already present) into {}",
        args.cards - added,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
