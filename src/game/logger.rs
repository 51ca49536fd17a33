//! Console logger for games and AI decisions
//!
//! The game log itself lives in [`GameStatus::log`]. This logger mirrors new
//! entries to stdout and/or an in-memory buffer, filtered by verbosity, and
//! carries AI decision lines that never enter the game log.

use crate::game::state::{GameStatus, LogEntry as GameLogEntry, LogKind};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, Ref, RefCell};
use std::ops::Deref;

/// How much to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// No output during the game
    Silent = 0,
    /// Setup and game outcome only
    Minimal = 1,
    /// Moves, cards and counters (default)
    #[default]
    Normal = 2,
    /// Everything, including status ticks and rejected commands
    Verbose = 3,
}

impl VerbosityLevel {
    /// Level a game log entry is printed at
    pub fn for_kind(kind: LogKind) -> Self {
        match kind {
            LogKind::Setup | LogKind::GameOver => VerbosityLevel::Minimal,
            LogKind::Status | LogKind::Rejected => VerbosityLevel::Verbose,
            _ => VerbosityLevel::Normal,
        }
    }
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    #[default]
    Stdout,
    /// Capture only to the in-memory buffer
    Memory,
    Both,
}

/// A captured line
#[derive(Debug, Clone)]
pub struct LoggedLine {
    pub level: VerbosityLevel,
    pub message: String,
    /// e.g. "game", "ai_choice"
    pub category: Option<String>,
}

/// Read-only view of the captured lines
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LoggedLine>>,
}

impl<'a> Deref for LogGuard<'a> {
    type Target = [LoggedLine];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    /// Number of game log entries already emitted
    emitted: Cell<usize>,
    log_buffer: RefCell<Vec<LoggedLine>>,
}

impl GameLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            output_mode: OutputMode::default(),
            emitted: Cell::new(0),
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    /// Emit the game log entries added since the last call
    ///
    /// A log shorter than what was already emitted means a new game started;
    /// emission restarts from its first entry.
    pub fn emit_new(&self, status: &GameStatus) {
        let mut from = self.emitted.get();
        if status.log.len() < from {
            from = 0;
        }
        for entry in &status.log[from..] {
            self.game_entry(entry);
        }
        self.emitted.set(status.log.len());
    }

    fn game_entry(&self, entry: &GameLogEntry) {
        let level = VerbosityLevel::for_kind(entry.kind);
        self.record(level, &entry.to_string(), Some("game"));
    }

    pub fn minimal(&self, message: &str) {
        self.record(VerbosityLevel::Minimal, message, None);
    }

    pub fn normal(&self, message: &str) {
        self.record(VerbosityLevel::Normal, message, None);
    }

    pub fn verbose(&self, message: &str) {
        self.record(VerbosityLevel::Verbose, message, None);
    }

    /// Log which AI source decided what, at Normal level
    pub fn ai_choice(&self, source: &str, message: &str) {
        self.record(
            VerbosityLevel::Normal,
            &format!("[{source}] {message}"),
            Some("ai_choice"),
        );
    }

    fn record(&self, level: VerbosityLevel, message: &str, category: Option<&str>) {
        if level == VerbosityLevel::Silent {
            return;
        }
        let should_capture = self.is_capturing();
        let should_output = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both);

        if should_capture {
            self.log_buffer.borrow_mut().push(LoggedLine {
                level,
                message: message.to_string(),
                category: category.map(str::to_string),
            });
        }
        if should_output && level <= self.verbosity {
            Self::log_to_stdout(level, message);
        }
    }

    fn log_to_stdout(level: VerbosityLevel, message: &str) {
        if level == VerbosityLevel::Minimal {
            println!("{message}");
        } else {
            println!("  {message}");
        }
    }

    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }
}

impl Default for GameLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}
