use std::fmt;

use flashdeck_core::model::{
    BloomLevel, CardDraft, DeckDraft, DeckFormat, DeckId, Difficulty, ParseEnumError,
};
use services::{AppServices, Clock, GenerationRequest, OrderMode, SessionConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod study;

const DEFAULT_LOG_FILTER: &str = "app=info,services=info,storage=warn";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidDeckId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidChoice(ParseEnumError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDeckId { raw } => write!(f, "invalid --deck-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidChoice(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<ParseEnumError> for ArgsError {
    fn from(err: ParseEnumError) -> Self {
        Self::InvalidChoice(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- decks    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- generate --topic <text> [--count <n>] [--difficulty <d>]");
    eprintln!("                               [--bloom <level>] [--format qa|cloze|mcq]");
    eprintln!("  cargo run -p app -- study    [--deck-id <id>] [--random] [--timed] [--seconds <s>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --count 10, --seconds 30");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FLASHDECK_DB_URL, FLASHDECK_DECK_ID");
    eprintln!("  FLASHDECK_AI_API_KEY, FLASHDECK_AI_BASE_URL, FLASHDECK_AI_MODEL");
    eprintln!("  RUST_LOG (default {DEFAULT_LOG_FILTER})");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Decks,
    Seed,
    Generate,
    Study,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "decks" => Some(Self::Decks),
            "seed" => Some(Self::Seed),
            "generate" => Some(Self::Generate),
            "study" => Some(Self::Study),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    deck_id: Option<DeckId>,
    topic: Option<String>,
    count: u32,
    difficulty: Difficulty,
    bloom_level: BloomLevel,
    format: DeckFormat,
    order_mode: OrderMode,
    timed: bool,
    seconds: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("FLASHDECK_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url),
            deck_id: std::env::var("FLASHDECK_DECK_ID")
                .ok()
                .and_then(|value| value.parse::<DeckId>().ok()),
            topic: None,
            count: 10,
            difficulty: Difficulty::default(),
            bloom_level: BloomLevel::default(),
            format: DeckFormat::default(),
            order_mode: OrderMode::Ordered,
            timed: false,
            seconds: services::sessions::DEFAULT_SECONDS_PER_QUESTION,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--deck-id" => {
                    let value = require_value(args, "--deck-id")?;
                    let id = value
                        .parse::<DeckId>()
                        .map_err(|_| ArgsError::InvalidDeckId { raw: value.clone() })?;
                    parsed.deck_id = Some(id);
                }
                "--topic" => parsed.topic = Some(require_value(args, "--topic")?),
                "--count" => parsed.count = require_number(args, "--count")?,
                "--difficulty" => parsed.difficulty = require_value(args, "--difficulty")?.parse()?,
                "--bloom" => parsed.bloom_level = require_value(args, "--bloom")?.parse()?,
                "--format" => parsed.format = require_value(args, "--format")?.parse()?,
                "--random" => parsed.order_mode = OrderMode::Random,
                "--timed" => parsed.timed = true,
                "--seconds" => parsed.seconds = require_number(args, "--seconds")?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Decks,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Decks,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup; services only see repositories.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::system()).await?;
    info!(db = %parsed.db_url, command = ?cmd, "storage ready");

    match cmd {
        Command::Decks => list_decks(&services).await,
        Command::Seed => seed(&services).await,
        Command::Generate => generate(&services, &parsed).await,
        Command::Study => {
            let deck_id = match parsed.deck_id {
                Some(id) => id,
                None => services
                    .decks()
                    .most_recent_deck()
                    .await?
                    .map(|deck| deck.id())
                    .ok_or(ArgsError::MissingFlag { flag: "--deck-id" })?,
            };
            let config = SessionConfig::new(parsed.order_mode, parsed.timed, parsed.seconds)?;
            study::run(services.study_loop(), deck_id, config).await
        }
    }
}

async fn list_decks(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let groups = services.decks().decks_by_topic().await?;
    if groups.is_empty() {
        println!("No decks yet. Try `seed` or `generate --topic ...`.");
        return Ok(());
    }

    for group in groups {
        let plural = if group.decks.len() == 1 { "" } else { "s" };
        println!("{} ({} deck{plural})", group.topic, group.decks.len());
        for deck in &group.decks {
            println!(
                "  #{:<4} {:<6} {:<10} {:>3} cards  updated {}",
                deck.id().value(),
                deck.format().as_str(),
                deck.difficulty().as_str(),
                deck.cards().len(),
                deck.updated_at().format("%Y-%m-%d %H:%M"),
            );
        }
    }
    Ok(())
}

async fn seed(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let decks = services.decks();

    let qa = decks
        .create_deck(DeckDraft::new("Rust basics").with_cards(vec![
            CardDraft::new(1, "What keyword declares an immutable binding?", "let"),
            CardDraft::new(2, "Which trait enables `{:?}` formatting?", "Debug"),
            CardDraft::new(3, "What does `?` do on an `Err`?", "Returns it early from the function"),
            CardDraft::new(4, "Which type owns a heap-allocated string?", "String"),
        ]))
        .await?;

    let cloze = decks
        .create_deck(
            DeckDraft::new("European capitals")
                .with_format(DeckFormat::Cloze)
                .with_cards(vec![
                    CardDraft::new(1, "The capital of France is ___.", "Paris"),
                    CardDraft::new(2, "___ is the capital of Spain.", "Madrid"),
                    CardDraft::new(3, "What is the capital of Italy?", "Rome"),
                ]),
        )
        .await?;

    println!("Seeded deck #{} ({})", qa.id(), qa.topic());
    println!("Seeded deck #{} ({})", cloze.id(), cloze.topic());
    Ok(())
}

async fn generate(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let generation = services.generation();
    if !generation.enabled() {
        eprintln!("card generation is disabled: set FLASHDECK_AI_API_KEY");
        return Ok(());
    }
    let topic = args
        .topic
        .clone()
        .ok_or(ArgsError::MissingFlag { flag: "--topic" })?;

    let request = GenerationRequest {
        topic,
        difficulty: args.difficulty,
        question_count: args.count,
        bloom_level: args.bloom_level,
        format: args.format,
        input_kind: flashdeck_core::model::InputKind::default(),
    };
    let deck = generation.generate_deck(&request).await?;

    println!(
        "Created deck #{} ({}) with {} cards. {} generation requests left this hour.",
        deck.id(),
        deck.topic(),
        deck.cards().len(),
        generation.remaining_requests(),
    );
    Ok(())
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

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
