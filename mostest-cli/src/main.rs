mod config;
mod output;

use clap::Parser;
use mostest_core::{slugify, CandidateDraft, CandidateEdit, CandidateId, Leaderboard, NewLeaderboard};
use mostest_store::{Error, LeaderboardService, SqliteStore};
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigFile, EnvVars, Overrides, Settings};

type Service = LeaderboardService<SqliteStore>;

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

/// What to tell the user when a service call fails.
///
/// A timeout can fire after the store already committed, so a retryable
/// failure must not claim the change was dropped.
fn failure_message(e: &Error) -> String {
    if e.is_retryable() {
        format!("{e} (the change may or may not have been applied; check, then try again)")
    } else {
        e.to_string()
    }
}

/// Unwrap a service result or exit.
fn or_bail<T>(result: Result<T, Error>) -> T {
    result.unwrap_or_else(|e| bail(failure_message(&e)))
}

#[derive(Parser)]
#[command(name = "mostest", version, about = "Rank anything by pairwise votes")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// Path to config file (default: ~/.config/mostest/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL (also reads DATABASE_URL env var)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Act as this user (also reads MOSTEST_USER env var)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Per-call database timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a default config file at ~/.config/mostest/config.toml
    Init,
    /// Create a leaderboard
    Create(CreateArgs),
    /// Show the current ranking of a leaderboard
    Show {
        slug: String,
        /// Output JSON instead of table
        #[arg(long)]
        json: bool,
    },
    /// Draw a random pair to vote on
    Pair {
        slug: String,
        #[arg(long)]
        json: bool,
    },
    /// Record that one candidate beat another
    Vote {
        #[arg(long)]
        winner: String,
        #[arg(long)]
        loser: String,
    },
    /// Vote interactively until you quit
    Play { slug: String },
    /// Append candidates from a headerless name,image CSV file ("-" for stdin)
    Import { slug: String, file: PathBuf },
    /// Write candidates as name,image CSV
    Export {
        slug: String,
        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Add, edit or remove a single candidate
    #[command(subcommand)]
    Candidate(CandidateCommand),
    /// Most-voted leaderboards
    Featured {
        /// How many to list (default from config, else 3)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Leaderboards you own
    Mine {
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct CreateArgs {
    /// Display name
    #[arg(long)]
    name: String,

    /// The question voters answer (e.g. "Which is rounder?")
    #[arg(long)]
    question: String,

    /// URL handle. Derived from the name when omitted.
    #[arg(long)]
    slug: Option<String>,

    /// Inline candidate as NAME or NAME=IMAGE_URL (repeatable)
    #[arg(long = "candidate")]
    candidates: Vec<String>,

    /// Headerless name,image CSV file with more candidates
    #[arg(long)]
    candidates_file: Option<PathBuf>,

    /// Create without an owner. Nobody can edit it afterwards.
    #[arg(long)]
    anonymous: bool,
}

#[derive(clap::Subcommand)]
enum CandidateCommand {
    /// Add a candidate to a leaderboard you own
    Add {
        slug: String,
        name: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Rename a candidate or change its image
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a candidate and every vote involving it
    Remove { id: String },
}

/// Parse an inline `--candidate` value: `NAME` or `NAME=IMAGE_URL`.
fn parse_candidate_arg(value: &str) -> CandidateDraft {
    match value.split_once('=') {
        Some((name, image)) => CandidateDraft::new(name.trim(), Some(image.trim().to_string())),
        None => CandidateDraft::new(value.trim(), None),
    }
}

fn verbose_filter() -> EnvFilter {
    EnvFilter::new("warn,mostest=debug,mostest_core=debug,mostest_store=debug")
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        verbose_filter()
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: &Path) -> String {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .unwrap_or_else(|e| bail(format!("Failed to read stdin: {e}")));
        return content;
    }
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read {}: {e}", path.display())))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let config_file = ConfigFile::locate(cli.global.config.clone(), home).unwrap_or_else(|e| bail(e));
    if let Commands::Init = cli.command {
        config_file.write_template().unwrap_or_else(|e| bail(e));
        println!("Created config at {}", config_file.path.display());
        println!("Edit it to set your database and user name.");
        return;
    }

    let settings = Settings::resolve(
        Overrides {
            database_url: cli.global.database,
            user: cli.global.user,
            timeout_ms: cli.global.timeout_ms,
        },
        EnvVars::from_process(),
        config_file.read().unwrap_or_else(|e| bail(e)),
    );
    tracing::debug!(database = %settings.database_url, user = ?settings.user, "resolved settings");

    let store = SqliteStore::connect(&settings.database_url)
        .await
        .unwrap_or_else(|e| bail(format!("Failed to open {}: {e}", settings.database_url)));
    let service = LeaderboardService::new(store, settings.timeout);

    run(&service, &settings, cli.command).await;
}

async fn run(service: &Service, settings: &Settings, command: Commands) {
    let user = settings.user.as_deref();

    match command {
        Commands::Init => unreachable!("handled before connecting"),
        Commands::Create(args) => run_create(service, settings, args).await,
        Commands::Show { slug, json } => {
            let leaderboard = or_bail(service.leaderboard(&slug).await);
            let ranking = or_bail(service.rank(&leaderboard.id).await);
            if json {
                output::print_ranking_json(&leaderboard, &ranking);
            } else {
                output::print_ranking_table(&leaderboard, &ranking);
            }
        }
        Commands::Pair { slug, json } => {
            let leaderboard = or_bail(service.leaderboard(&slug).await);
            let pair = service
                .require_pair(&leaderboard.id)
                .await
                .unwrap_or_else(|e| bail(format!("{}: {}", leaderboard.slug, failure_message(&e))));
            if json {
                output::print_pair_json(&pair);
            } else {
                output::print_pair(&leaderboard, &pair);
            }
        }
        Commands::Vote { winner, loser } => {
            let vote = service
                .record_vote(&CandidateId::from(winner), &CandidateId::from(loser))
                .await
                .unwrap_or_else(|e| bail(format!("Vote failed: {}", failure_message(&e))));
            println!("Recorded vote {}", vote.id);
        }
        Commands::Play { slug } => {
            let leaderboard = or_bail(service.leaderboard(&slug).await);
            run_play(service, &leaderboard).await;
        }
        Commands::Import { slug, file } => {
            let leaderboard = or_bail(service.leaderboard(&slug).await);
            let content = read_input(&file);
            let added = or_bail(service.import_candidates(user, &leaderboard.id, &content).await);
            println!("Imported {} candidates into {}", added.len(), leaderboard.slug);
        }
        Commands::Export { slug, output } => {
            let leaderboard = or_bail(service.leaderboard(&slug).await);
            let csv = or_bail(service.export_candidates(&leaderboard.id).await);
            match output {
                Some(path) => std::fs::write(&path, csv)
                    .unwrap_or_else(|e| bail(format!("Failed to write {}: {e}", path.display()))),
                None => print!("{csv}"),
            }
        }
        Commands::Candidate(cmd) => run_candidate(service, user, cmd).await,
        Commands::Featured { limit, json } => {
            let summaries = or_bail(service.featured(limit.unwrap_or(settings.featured_limit)).await);
            if json {
                output::print_summaries_json(&summaries);
            } else {
                output::print_summaries(&summaries);
            }
        }
        Commands::Mine { json } => {
            let user = user.unwrap_or_else(|| bail("No user set. Pass --user or set MOSTEST_USER."));
            let summaries = or_bail(service.owned_by(user).await);
            if json {
                output::print_summaries_json(&summaries);
            } else {
                output::print_summaries(&summaries);
            }
        }
    }
}

async fn run_create(service: &Service, settings: &Settings, args: CreateArgs) {
    let mut candidates: Vec<CandidateDraft> = args.candidates.iter().map(|c| parse_candidate_arg(c)).collect();
    if let Some(path) = &args.candidates_file {
        let parsed = mostest_core::parse_candidates(&read_input(path))
            .unwrap_or_else(|e| bail(format!("{}: {e}", path.display())));
        candidates.extend(parsed);
    }

    let owner = if args.anonymous { None } else { settings.user.clone() };
    if owner.is_none() && !args.anonymous {
        eprintln!("Warning: no user set, creating an anonymous leaderboard that cannot be edited later.");
    }

    let new = NewLeaderboard {
        slug: args.slug.unwrap_or_else(|| slugify(&args.name)),
        name: args.name,
        question: args.question,
        owner,
        candidates,
    };
    let (leaderboard, candidates) = or_bail(service.create_leaderboard(new).await);
    println!("Created {} with {} candidates", leaderboard.slug, candidates.len());
    output::print_candidates(&candidates);
}

async fn run_candidate(service: &Service, user: Option<&str>, cmd: CandidateCommand) {
    match cmd {
        CandidateCommand::Add { slug, name, image } => {
            let leaderboard = or_bail(service.leaderboard(&slug).await);
            let candidate = or_bail(
                service
                    .add_candidate(user, &leaderboard.id, CandidateDraft::new(name, image))
                    .await,
            );
            output::print_candidates(std::slice::from_ref(&candidate));
        }
        CandidateCommand::Edit { id, name, image } => {
            let candidate = or_bail(
                service
                    .edit_candidate(user, &CandidateId::from(id), CandidateEdit { name, image })
                    .await,
            );
            output::print_candidates(std::slice::from_ref(&candidate));
        }
        CandidateCommand::Remove { id } => {
            let removed = or_bail(service.remove_candidate(user, &CandidateId::from(id)).await);
            println!("Removed {} and its votes", removed.name);
        }
    }
}

/// What the player typed at the prompt.
#[derive(Debug, PartialEq)]
enum PlayInput {
    First,
    Second,
    Skip,
    Quit,
    Unknown,
}

fn parse_play_input(line: &str) -> PlayInput {
    match line.trim().to_ascii_lowercase().as_str() {
        "1" => PlayInput::First,
        "2" => PlayInput::Second,
        "" | "s" | "skip" => PlayInput::Skip,
        "q" | "quit" | "exit" => PlayInput::Quit,
        _ => PlayInput::Unknown,
    }
}

async fn run_play(service: &Service, leaderboard: &Leaderboard) {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut lines = stdin.lock().lines();
    let mut recorded = 0usize;

    loop {
        let pair = match service.require_pair(&leaderboard.id).await {
            Ok(pair) => pair,
            Err(e @ Error::InsufficientCandidates) => {
                println!("{}: {e}", leaderboard.slug);
                break;
            }
            Err(e) => bail(failure_message(&e)),
        };
        output::print_pair(leaderboard, &pair);
        if interactive {
            print!("1/2 to vote, enter to skip, q to quit > ");
            let _ = io::stdout().flush();
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => bail(format!("Failed to read stdin: {e}")),
            None => break,
        };

        let (winner, loser) = match parse_play_input(&line) {
            PlayInput::First => (&pair.0, &pair.1),
            PlayInput::Second => (&pair.1, &pair.0),
            PlayInput::Skip => continue,
            PlayInput::Quit => break,
            PlayInput::Unknown => {
                println!("Type 1 or 2 to vote, enter to skip, q to quit.");
                continue;
            }
        };

        match service.record_vote(&winner.id, &loser.id).await {
            Ok(_) => recorded += 1,
            Err(e) => println!("Vote failed: {}", failure_message(&e)),
        }
    }

    println!("{recorded} votes recorded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidate_arg() {
        assert_eq!(parse_candidate_arg("Ball"), CandidateDraft::new("Ball", None));
        assert_eq!(
            parse_candidate_arg("Ball = https://img.example/b.png?w=64"),
            CandidateDraft::new("Ball", Some("https://img.example/b.png?w=64".to_string())),
        );
    }

    #[test]
    fn test_parse_play_input() {
        assert_eq!(parse_play_input("1\n"), PlayInput::First);
        assert_eq!(parse_play_input(" 2 "), PlayInput::Second);
        assert_eq!(parse_play_input(""), PlayInput::Skip);
        assert_eq!(parse_play_input("Q"), PlayInput::Quit);
        assert_eq!(parse_play_input("3"), PlayInput::Unknown);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "mostest", "vote", "--winner", "a", "--loser", "b", "--user", "ash",
        ])
        .unwrap();
        assert_eq!(cli.global.user.as_deref(), Some("ash"));
        assert!(matches!(cli.command, Commands::Vote { ref winner, ref loser } if winner == "a" && loser == "b"));

        let cli = Cli::try_parse_from(["mostest", "candidate", "edit", "c1", "--name", "Sphere"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Candidate(CandidateCommand::Edit { ref name, image: None, .. }) if name.as_deref() == Some("Sphere")
        ));

        assert!(Cli::try_parse_from(["mostest", "vote", "--winner", "a"]).is_err());
    }

    #[test]
    fn test_failure_message_hedges_only_retryable_errors() {
        let timeout = failure_message(&Error::Timeout(std::time::Duration::from_millis(5)));
        assert!(timeout.starts_with("store did not answer within 5ms"));
        assert!(timeout.contains("may or may not have been applied"));

        assert_eq!(failure_message(&Error::NotOwner), "only the owner can change this leaderboard");
        assert_eq!(
            failure_message(&Error::InsufficientCandidates),
            "not enough candidates yet (at least two are needed to vote)",
        );
    }

    #[test]
    fn test_verbose_filter_parses() {
        assert!(verbose_filter().to_string().contains("mostest_store=debug"));
    }
}
