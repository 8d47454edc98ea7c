use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use voice_recall::db::profile::format_profile;
use voice_recall::{
    ChatCompletionsClient, ChatLoop, CommandResult, Config, MemoryService, MemoryStore,
    ProfileKey, ProfileValue, Role, Turn,
};

/// Recall - Conversational memory for voice assistants
#[derive(Parser)]
#[command(name = "recall", version, about)]
struct Cli {
    /// Database file (overrides configuration)
    #[arg(long, global = true, env = "RECALL_DB_PATH")]
    db: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a turn (user turns also update the profile)
    Ingest {
        /// Who spoke: user or assistant
        #[arg(short, long, default_value = "user")]
        role: Role,
        /// Utterance text
        text: String,
    },
    /// Show the turn log, oldest first
    History {
        /// Only the N most recent turns
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only turns with an id lower than this
        #[arg(short, long)]
        before: Option<i64>,
    },
    /// Show one turn by id
    Turn {
        /// Turn id
        id: i64,
    },
    /// Rank past turns by relevance to a query
    Search {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
    /// Print the prompt that would be sent for a message
    Context {
        /// Current message
        query: String,
    },
    /// Show the learned user profile
    Profile,
    /// Set a profile attribute by hand
    SetProfile {
        /// One of: name, age, profession, location
        key: String,
        /// Value
        value: String,
    },
    /// Run a spoken memory command (e.g. "borrar memoria")
    #[command(name = "command")]
    Exec {
        /// Phrase as spoken
        phrase: String,
    },
    /// Erase stored memory
    Clear(ClearArgs),
    /// Show memory counters
    Stats,
    /// Text chat with memory and the configured language model
    Chat,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ClearArgs {
    /// Erase the turn log only
    #[arg(long)]
    turns: bool,
    /// Erase the profile only
    #[arg(long)]
    profile: bool,
    /// Erase turns and profile together
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,voice_recall=info",
        1 => "info,voice_recall=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    tracing::debug!(?config, "loaded configuration");

    let store = MemoryStore::open(&config.db_path)?;
    let service = MemoryService::new(store, config.memory)?;

    let json = cli.json;

    match cli.command {
        Command::Ingest { role, text } => {
            let turn = service.ingest(role, &text)?;
            if json {
                emit(&turn)?;
            } else {
                print_turn(&turn);
            }
        }
        Command::History { limit, before } => {
            let turns = service.store().list_turns(limit, before)?;
            if json {
                emit(&turns)?;
            } else if turns.is_empty() {
                println!("No turns recorded");
            } else {
                turns.iter().for_each(print_turn);
            }
        }
        Command::Turn { id } => match service.store().get_turn(id)? {
            Some(turn) if json => emit(&turn)?,
            Some(turn) => print_turn(&turn),
            None => anyhow::bail!("turn {id} not found"),
        },
        Command::Search { query, limit } => {
            let turns = service.search(&query, limit)?;
            if json {
                emit(&turns)?;
            } else if turns.is_empty() {
                println!("No relevant turns for {query:?}");
            } else {
                turns.iter().for_each(print_turn);
            }
        }
        Command::Context { query } => {
            let bundle = service.build_context(&query)?;
            if json {
                emit(&bundle)?;
            } else {
                println!("{}", bundle.format_prompt(&query));
            }
        }
        Command::Profile => {
            let profile = service.store().get_profile()?;
            if json {
                emit(&profile)?;
            } else if profile.is_empty() {
                println!("No profile information stored");
            } else {
                println!("{}", format_profile(&profile));
            }
        }
        Command::SetProfile { key, value } => {
            let parsed_key: ProfileKey = key.parse()?;
            let value = ProfileValue::parse_for(parsed_key, &value)?;
            let attr = service.store().upsert_profile_attribute(&key, value)?;
            if json {
                emit(&attr)?;
            } else {
                println!("{}: {}", attr.key, attr.value);
            }
        }
        Command::Exec { phrase } => {
            let result = service.handle_command(&phrase)?;
            if json {
                emit(&result)?;
            } else if let Some(reply) = result.spoken_reply() {
                println!("{reply}");
            } else {
                println!("Not a memory command: {phrase:?}");
            }
        }
        Command::Clear(args) => {
            if args.turns {
                service.store().clear_turns()?;
                println!("Cleared conversation turns");
            } else if args.profile {
                service.store().clear_profile()?;
                println!("Cleared user profile");
            } else {
                service.store().clear_all()?;
                println!("Cleared all memory");
            }
        }
        Command::Stats => {
            let stats = service.stats()?;
            if json {
                emit(&stats)?;
            } else {
                println!("Database:        {}", config.db_path.display());
                println!("Turns:           {}", stats.turns);
                println!("Profile facts:   {}", stats.profile_attributes);
                println!("History window:  {}", stats.max_history_length);
                println!("Relevant limit:  {}", config.memory.relevant_limit);
            }
        }
        Command::Chat => chat(service, &config).await?,
    }

    Ok(())
}

fn print_turn(turn: &Turn) {
    println!(
        "[{}] {} {}: {}",
        turn.id,
        turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
        turn.role,
        turn.text
    );
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Interactive text chat; each line stands in for a transcribed utterance
async fn chat(service: MemoryService, config: &Config) -> anyhow::Result<()> {
    let model = ChatCompletionsClient::from_config(&config.llm)?;
    let chat_loop = ChatLoop::new(service, model);

    println!("Type a message, or a command like \"borrar memoria\" or \"mostrar perfil\".");
    println!("Ctrl-D to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match chat_loop.handle_utterance(&line).await {
            Ok(Some(reply)) => println!("{}", reply.spoken),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "no reply for this message"),
        }
    }

    println!();
    Ok(())
}
