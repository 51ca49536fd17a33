//! Self-play and tournament mode
//!
//! A self-play game pits two [`AiSession`]s against each other on one
//! status. Tournaments run many local-only games in parallel with rayon,
//! each game on its own single-threaded tokio runtime.

/// Per-step AI logging that costs nothing when verbose-logging is disabled
macro_rules! log_if_verbose {
    ($logger:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $logger.normal(&format!($($arg)*));
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$logger;
        }
    };
}

use crate::ai::{AiSession, StepReport};
use crate::analysis::{HeuristicEngine, HeuristicWeights};
use crate::core::Side;
use crate::game::{GameEngine, GameLogger, GameStatus, OutputMode, VerbosityLevel};
use crate::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Simulated milliseconds that pass per step
const STEP_MS: u64 = 250;
/// Log lines kept from a stalled game
const STALL_TAIL: usize = 8;

/// Outcome of one finished (or abandoned) game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub seed: u64,
    pub winner: Option<Side>,
    pub moves: u32,
    pub turns: u32,
    pub steps: usize,
    /// Neither side could act and no timer was pending
    pub stalled: bool,
    /// Last log lines of a stalled game, empty otherwise
    pub tail: Vec<String>,
}

/// Play one game to the end or until `max_steps` actions were taken
pub async fn play_game(
    engine: &GameEngine,
    sessions: &mut [AiSession; 2],
    seed: u64,
    max_steps: usize,
    logger: &GameLogger,
) -> GameRecord {
    let mut state = engine.start(seed);
    let (steps, stalled) = drive(engine, sessions, &mut state, max_steps, logger).await;
    logger.emit_new(&state);
    GameRecord {
        seed,
        winner: state.winner,
        moves: state.move_count,
        turns: state.turn,
        steps,
        stalled,
        tail: Vec::new(),
    }
}

/// Step both sessions on `state` until the game ends. Returns the number of
/// steps taken and whether play stalled.
pub async fn drive(
    engine: &GameEngine,
    sessions: &mut [AiSession; 2],
    state: &mut GameStatus,
    max_steps: usize,
    logger: &GameLogger,
) -> (usize, bool) {
    let mut now_ms = 0;
    let mut steps = 0;
    while steps < max_steps && !state.is_over() {
        now_ms += STEP_MS;
        let mut acted = false;
        for session in sessions.iter_mut() {
            if let Some((next, report)) = session.step(state, now_ms).await {
                *state = next;
                if let StepReport::Decided { source, .. } = &report {
                    logger.ai_choice(&source.to_string(), &format!("{} {report}", session.side()));
                } else {
                    log_if_verbose!(logger, "{} {report}", session.side());
                }
                acted = true;
                break;
            }
        }
        logger.emit_new(state);

        if !acted {
            // nobody owes a decision; only an open counter window can still move
            let Some(window) = state.counter_window.clone() else {
                return (steps, true);
            };
            now_ms = now_ms.max(window.expires_at_ms);
            if engine.tick(state, now_ms).is_err() {
                return (steps, true);
            }
        }
        steps += 1;
    }
    (steps, false)
}

/// Two local-only sessions, one per side
pub fn local_sessions(engine: &GameEngine, weights: &HeuristicWeights) -> [AiSession; 2] {
    Side::ALL.map(|side| AiSession::local(engine.clone(), HeuristicEngine::new(weights.clone()), side))
}

/// Play one local self-play game on a fresh single-threaded runtime
pub fn run_local_game(engine: &GameEngine, weights: &HeuristicWeights, seed: u64, max_steps: usize) -> Result<GameRecord> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let mut logger = GameLogger::with_verbosity(VerbosityLevel::Silent);
    logger.set_output_mode(OutputMode::Memory);
    let mut sessions = local_sessions(engine, weights);
    let mut record = runtime.block_on(play_game(engine, &mut sessions, seed, max_steps, &logger));
    if record.stalled {
        record.tail = log_tail(&logger, STALL_TAIL);
    }
    Ok(record)
}

/// The last `n` captured lines, oldest first
fn log_tail(logger: &GameLogger, n: usize) -> Vec<String> {
    let logs = logger.logs();
    let start = logs.len().saturating_sub(n);
    logs[start..].iter().map(|line| line.message.clone()).collect()
}

/// Aggregated tournament results
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TournamentStats {
    pub games: usize,
    pub a_wins: usize,
    pub b_wins: usize,
    pub draws: usize,
    pub stalled: usize,
    pub failed: usize,
    pub total_moves: u64,
}

impl TournamentStats {
    fn add(&mut self, record: &GameRecord) {
        self.games += 1;
        match record.winner {
            Some(Side::A) => self.a_wins += 1,
            Some(Side::B) => self.b_wins += 1,
            None => self.draws += 1,
        }
        if record.stalled {
            self.stalled += 1;
        }
        self.total_moves += u64::from(record.moves);
    }

    pub fn average_moves(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.total_moves as f64 / self.games as f64
    }

    fn share(&self, count: usize) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.games as f64
        }
    }

    pub fn print(&self) {
        println!("=== Tournament Results ===");
        println!("Games: {}", self.games);
        println!("Player A wins: {} ({:.1}%)", self.a_wins, self.share(self.a_wins));
        println!("Player B wins: {} ({:.1}%)", self.b_wins, self.share(self.b_wins));
        println!("Draws: {} ({:.1}%)", self.draws, self.share(self.draws));
        if self.stalled > 0 {
            println!("Stalled: {}", self.stalled);
        }
        if self.failed > 0 {
            println!("Failed to run: {}", self.failed);
        }
        println!("Average moves per game: {:.1}", self.average_moves());
    }
}

/// Play `games` local-only games in parallel. Game `i` uses seed
/// `seed + i`, so a tournament is reproducible.
pub fn run_tourney(
    engine: &GameEngine,
    weights: &HeuristicWeights,
    games: usize,
    seed: u64,
    max_steps: usize,
) -> TournamentStats {
    let stats = Mutex::new(TournamentStats::default());
    let start = Instant::now();

    (0..games).into_par_iter().for_each(|game_idx| {
        let game_seed = seed.wrapping_add(game_idx as u64);
        let result = run_local_game(engine, weights, game_seed, max_steps);
        let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(record) => {
                if record.stalled {
                    eprintln!("Warning: game {game_idx} (seed {game_seed}) stalled after:");
                    for line in &record.tail {
                        eprintln!("  {line}");
                    }
                }
                stats.add(&record);
            }
            Err(e) => {
                eprintln!("Warning: game {game_idx} (seed {game_seed}) failed: {e}");
                stats.failed += 1;
            }
        }
        if stats.games > 0 && stats.games % 100 == 0 {
            println!("Completed {} games", stats.games);
        }
    });

    let stats = stats.into_inner().unwrap_or_else(PoisonError::into_inner);
    let elapsed = start.elapsed();
    if stats.games > 0 {
        println!(
            "Played {} games in {:.2}s ({:.1} games/s)\n",
            stats.games,
            elapsed.as_secs_f64(),
            stats.games as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
        );
    }
    stats
}
