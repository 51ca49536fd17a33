//! Game state, transitions and skill effects

pub mod actions;
pub mod effects;
pub mod engine;
pub mod logger;
pub mod phase;
pub mod state;

pub use effects::{EffectContext, EffectHandler, EffectHelpers, EffectRegistry, PrepareOutcome};
pub use engine::{Command, GameEngine};
pub use logger::{GameLogger, OutputMode, VerbosityLevel};
pub use phase::GamePhase;
pub use state::{
    ActionMetadata, ActionStatus, CounterWindow, DraftState, GameStatus, LogEntry, LogKind,
    PendingAction, TargetChoice, TargetOptions, TargetRequest, VisualEvent, VisualRole,
};
