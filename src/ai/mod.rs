//! AI decision routing
//!
//! Scenario derivation, the remote decision client, the local/remote router
//! and the session that drives one AI-controlled side.

pub mod applicator;
pub mod fallback;
pub mod monitor;
pub mod prompt;
pub mod remote;
pub mod reply;
pub mod router;
pub mod scenario;
pub mod session;

pub use applicator::{apply_decision, ApplyError};
pub use fallback::Fallback;
pub use monitor::{KindStats, PerformanceMonitor};
pub use prompt::{ChatMessage, ChatRequest, PromptBuilder};
pub use remote::{CancelToken, ChatTransport, HttpTransport, RemoteClient, RemoteError, ScriptedTransport};
pub use reply::{parse_reply, ParseContext};
pub use router::{Route, RouteInput, SmartRouter, Strategy};
pub use scenario::{derive_for_side, derive_scenarios, Decision, Scenario, ScenarioKey, ScenarioKind};
pub use session::{AiSession, DecisionSource, StepReport};
