use std::fmt;

use recall_core::model::FlashcardId;
use services::{AppServices, Clock};

mod commands;
mod logging;

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCommand,
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    EditOnlyFlag { flag: &'static str },
    InvalidDbUrl { raw: String },
    InvalidId { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::EditOnlyFlag { flag } => write!(f, "{flag} is only valid with edit"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidId { raw } => write!(f, "invalid flashcard id: {raw:?}"),
            ArgsError::InvalidLimit { raw } => {
                write!(f, "invalid --limit value: {raw} (expected a positive number)")
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

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backend {
    Sqlite(String),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Add { front: String, back: String },
    List,
    Show { id: FlashcardId },
    Search { query: String },
    Edit {
        id: FlashcardId,
        front: Option<String>,
        back: Option<String>,
    },
    Remove { id: FlashcardId },
    Study { limit: Option<usize> },
    Status,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    backend: Backend,
    command: Command,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url> | --memory] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add <front> <back>                      Create a flashcard");
    eprintln!("  list                                    List all flashcards");
    eprintln!("  show <id>                               Show one flashcard");
    eprintln!("  search <query>                          Case-insensitive search on both sides");
    eprintln!("  edit <id> [--front <t>] [--back <t>]    Replace either side");
    eprintln!("  remove <id>                             Delete a flashcard");
    eprintln!("  study [--limit <n>]                     Interactive study session");
    eprintln!("  status                                  Card and live-session counts");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://recall.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RECALL_DB_URL, RECALL_LOG (tracing filter, default: warn)");
}

fn parse_id(raw: String) -> Result<FlashcardId, ArgsError> {
    FlashcardId::parse(&raw).map_err(|_| ArgsError::InvalidId { raw })
}

fn positional(
    values: &mut std::vec::IntoIter<String>,
    command: &'static str,
    name: &'static str,
) -> Result<String, ArgsError> {
    values
        .next()
        .ok_or(ArgsError::MissingArgument { command, name })
}

impl Args {
    fn parse(
        args: impl IntoIterator<Item = String>,
        env_db_url: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut backend = Backend::Sqlite(
            env_db_url.map_or_else(|| "sqlite://recall.sqlite3".into(), normalize_sqlite_url),
        );
        let mut name: Option<String> = None;
        let mut values = Vec::new();
        let mut front = None;
        let mut back = None;
        let mut limit = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    backend = Backend::Sqlite(normalize_sqlite_url(value));
                }
                "--memory" => backend = Backend::Memory,
                "--front" => front = Some(require_value(&mut args, "--front")?),
                "--back" => back = Some(require_value(&mut args, "--back")?),
                "--limit" => {
                    let value = require_value(&mut args, "--limit")?;
                    match value.parse::<usize>() {
                        Ok(parsed) if parsed > 0 => limit = Some(parsed),
                        _ => return Err(ArgsError::InvalidLimit { raw: value }),
                    }
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if name.is_none() => name = Some(arg),
                _ => values.push(arg),
            }
        }

        let name = name.ok_or(ArgsError::MissingCommand)?;
        let mut values = values.into_iter();
        let command = match name.as_str() {
            "add" => Command::Add {
                front: positional(&mut values, "add", "front")?,
                back: positional(&mut values, "add", "back")?,
            },
            "list" => Command::List,
            "show" => Command::Show {
                id: parse_id(positional(&mut values, "show", "id")?)?,
            },
            "search" => Command::Search {
                query: positional(&mut values, "search", "query")?,
            },
            "edit" => Command::Edit {
                id: parse_id(positional(&mut values, "edit", "id")?)?,
                front: front.take(),
                back: back.take(),
            },
            "remove" => Command::Remove {
                id: parse_id(positional(&mut values, "remove", "id")?)?,
            },
            "study" => Command::Study { limit },
            "status" => Command::Status,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = values.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        if front.is_some() {
            return Err(ArgsError::EditOnlyFlag { flag: "--front" });
        }
        if back.is_some() {
            return Err(ArgsError::EditOnlyFlag { flag: "--back" });
        }

        Ok(Self { backend, command })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();

    let args = Args::parse(std::env::args().skip(1), std::env::var("RECALL_DB_URL").ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    tracing::debug!(backend = ?args.backend, command = ?args.command, "starting");
    let clock = Clock::system();
    let services = match &args.backend {
        Backend::Memory => AppServices::in_memory(clock),
        Backend::Sqlite(db_url) => {
            // Open + migrate at startup so services stay free of filesystem concerns.
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url, clock).await?
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    commands::execute(&services, args.command, &mut stdin.lock(), &mut stdout.lock()).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
