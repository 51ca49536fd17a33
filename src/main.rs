//! Skill Gomoku - command line driver
//!
//! Self-play between two AI sessions, parallel local tournaments, and
//! heuristic analysis of board files.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use skill_gomoku::{
    ai::{AiSession, RemoteClient},
    analysis::{scan_threats, HeuristicEngine},
    config::AppConfig,
    core::{Board, Side},
    game::{GameEngine, GameLogger, VerbosityLevel},
    loader::Catalog,
    tournament::{drive, run_tourney},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Verbosity level for game output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for VerbosityLevel {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SideArg {
    A,
    B,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::A => Side::A,
            SideArg::B => Side::B,
        }
    }
}

#[derive(Parser)]
#[command(name = "sgomoku")]
#[command(about = "Skill Gomoku - 15x15 gomoku with skill cards and AI opponents", long_about = None)]
struct Cli {
    /// JSON configuration file (rules, AI endpoint, heuristic weights)
    #[arg(long, global = true, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Card catalog file replacing the built-in standard set
    #[arg(long, global = true, value_name = "CATALOG_FILE")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one AI-vs-AI game and print it
    Selfplay {
        /// Seed for the deal and every random effect
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Side decided through the remote endpoint (both sides are local otherwise)
        #[arg(long, value_enum)]
        remote_side: Option<SideArg>,

        /// Remote chat-completions endpoint (overrides the config file)
        #[arg(long)]
        endpoint: Option<String>,

        /// Remote model name (overrides the config file)
        #[arg(long)]
        model: Option<String>,

        /// Stop after this many AI actions
        #[arg(long, default_value = "2000")]
        max_steps: usize,

        /// Verbosity level: silent/0, minimal/1, normal/2, verbose/3
        #[arg(long, default_value = "normal")]
        verbosity: VerbosityArg,
    },

    /// Run local-only self-play games in parallel and print win statistics
    Tourney {
        #[arg(long, default_value = "100")]
        games: usize,

        /// Game i uses seed + i
        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, default_value = "2000")]
        max_steps: usize,
    },

    /// Print the heuristic suggestion for a board file (rows of X, O and .)
    Suggest {
        #[arg(value_name = "BOARD_FILE")]
        board: PathBuf,

        /// Side to move
        #[arg(long, value_enum, default_value = "a")]
        side: SideArg,
    },

    /// List the cards of the catalog
    Cards,

    /// Write the effective configuration as JSON
    InitConfig {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    let catalog = match path {
        Some(path) => {
            Catalog::load_from_file(path).with_context(|| format!("failed to load catalog {}", path.display()))?
        }
        None => Catalog::standard().context("built-in card set is invalid")?,
    };
    catalog.validate().context("catalog failed validation")?;
    Ok(catalog)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    let catalog = Arc::new(load_catalog(cli.catalog.as_deref())?);

    match cli.command {
        Commands::Selfplay {
            seed,
            remote_side,
            endpoint,
            model,
            max_steps,
            verbosity,
        } => {
            if let Some(endpoint) = endpoint {
                config.ai.endpoint = endpoint;
            }
            if let Some(model) = model {
                config.ai.model = model;
            }
            let engine = GameEngine::new(catalog, config.rules.clone());
            run_selfplay(&engine, &config, seed, remote_side.map(Side::from), max_steps, verbosity.into()).await
        }

        Commands::Tourney { games, seed, max_steps } => {
            println!("=== Skill Gomoku - Tournament Mode ===\n");
            println!("Running {games} local games from seed {seed}\n");
            let engine = GameEngine::new(catalog, config.rules.clone());
            let stats = tokio::task::spawn_blocking(move || {
                run_tourney(&engine, &config.heuristic, games, seed, max_steps)
            })
            .await
            .context("tournament worker panicked")?;
            stats.print();
            Ok(())
        }

        Commands::Suggest { board, side } => {
            let text = tokio::fs::read_to_string(&board)
                .await
                .with_context(|| format!("failed to read {}", board.display()))?;
            let Some(parsed) = Board::from_ascii(&text) else {
                bail!("{} is not a square board of X, O and . cells", board.display());
            };
            print_suggestion(&parsed, side.into(), &HeuristicEngine::new(config.heuristic));
            Ok(())
        }

        Commands::Cards => {
            let mut cards: Vec<_> = catalog.cards().collect();
            cards.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
            for card in cards {
                println!(
                    "{:<22} {:<26} {:<24} x{}",
                    card.key.as_str(),
                    card.name.as_str(),
                    card.effect.id(),
                    card.copies
                );
                if !card.counters.is_empty() {
                    let counters: Vec<_> = card.counters.iter().map(|k| k.as_str()).collect();
                    println!("{:<22} countered by {}", "", counters.join(", "));
                }
            }
            Ok(())
        }

        Commands::InitConfig { output } => {
            config
                .save_to_file(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {}", output.display());
            Ok(())
        }
    }
}

async fn run_selfplay(
    engine: &GameEngine,
    config: &AppConfig,
    seed: u64,
    remote_side: Option<Side>,
    max_steps: usize,
    verbosity: VerbosityLevel,
) -> anyhow::Result<()> {
    let logger = GameLogger::with_verbosity(verbosity);
    let heuristic = HeuristicEngine::new(config.heuristic.clone());

    let session_for = |side: Side| -> anyhow::Result<AiSession> {
        if remote_side == Some(side) {
            if !config.ai.is_configured() {
                logger.minimal(&format!("{side}: no remote endpoint configured, playing locally"));
            }
            let remote = RemoteClient::from_settings(&config.ai).context("failed to build the remote client")?;
            Ok(AiSession::new(engine.clone(), remote, heuristic.clone(), side))
        } else {
            Ok(AiSession::local(engine.clone(), heuristic.clone(), side))
        }
    };
    let mut sessions = [session_for(Side::A)?, session_for(Side::B)?];

    let mut state = engine.start(seed);
    state.ai_enabled = remote_side.is_some();
    if let Some(side) = remote_side {
        state.ai_side = side;
    }
    let (steps, stalled) = drive(engine, &mut sessions, &mut state, max_steps, &logger).await;

    logger.minimal("");
    logger.minimal(&state.board.to_ascii());
    match state.winner {
        Some(winner) => logger.minimal(&format!("{winner} wins after {} moves", state.move_count)),
        None if stalled => logger.minimal("Play stalled with no decision left to make"),
        None if !state.is_over() => logger.minimal(&format!("Stopped after {steps} AI actions")),
        None => logger.minimal("Draw"),
    }
    for session in &sessions {
        for line in session.monitor().summary() {
            logger.normal(&format!("{} remote {line}", session.side()));
        }
    }
    Ok(())
}

fn print_suggestion(board: &Board, side: Side, heuristic: &HeuristicEngine) {
    println!("{}", board.to_ascii());
    match heuristic.suggest_on_board(board, side, None) {
        Some(suggestion) => {
            println!(
                "{side} should play {} ({}, score {}, confidence {:.2})",
                suggestion.pos, suggestion.category, suggestion.score, suggestion.confidence
            );
            println!("  {}", suggestion.reason);
        }
        None => println!("{side} has no legal move"),
    }
    for s in Side::ALL {
        let threats = scan_threats(board, s);
        if !threats.is_quiet() {
            println!("{}", threats.describe(s));
        }
    }
}
