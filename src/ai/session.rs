//! AI turn driver
//!
//! An [`AiSession`] plays one side. Each [`step`](AiSession::step) looks at
//! the current status, takes the first scenario it has not acted on yet,
//! routes it, and returns the status after the chosen decision. Scenario
//! keys already acted on are never solicited again; a rewind (new epoch)
//! forgets them all and cancels any request still in flight.

use crate::ai::applicator::apply_decision;
use crate::ai::fallback::Fallback;
use crate::ai::monitor::PerformanceMonitor;
use crate::ai::remote::{CancelToken, RemoteClient, RemoteError};
use crate::ai::router::{complexity, local_quality, Route, RouteInput, SmartRouter, Strategy};
use crate::ai::scenario::{derive_for_side, Decision, Scenario, ScenarioKey, ScenarioKind};
use crate::analysis::{HeuristicEngine, Suggestion};
use crate::config::AiSettings;
use crate::core::{CardKey, Side};
use crate::game::{Command, GameEngine, GamePhase, GameStatus};
use rustc_hash::FxHashSet;
use std::fmt;
use std::time::{Duration, Instant};

/// Where a decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Local,
    Remote,
    Fallback,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecisionSource::Local => "local",
            DecisionSource::Remote => "remote",
            DecisionSource::Fallback => "fallback",
        })
    }
}

/// What one step did
#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    Drafted {
        option: usize,
        card: CardKey,
    },
    /// Passed a frozen or skipped turn
    Advanced,
    Decided {
        key: ScenarioKey,
        kind: ScenarioKind,
        source: DecisionSource,
        decision: Decision,
        route: Route,
        /// Remote attempts spent on this scenario
        attempts: u8,
    },
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepReport::Drafted { card, .. } => write!(f, "drafts {card}"),
            StepReport::Advanced => write!(f, "passes a blocked turn"),
            StepReport::Decided {
                kind,
                decision,
                route,
                attempts,
                ..
            } => {
                write!(f, "{kind}: {decision} ({}", route.strategy)?;
                if *attempts > 0 {
                    write!(f, ", {attempts} remote attempt(s)")?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct AiSession {
    engine: GameEngine,
    remote: RemoteClient,
    router: SmartRouter,
    monitor: PerformanceMonitor,
    heuristic: HeuristicEngine,
    fallback: Fallback,
    settings: AiSettings,
    side: Side,
    processed: FxHashSet<ScenarioKey>,
    active: Option<ScenarioKey>,
    epoch: u32,
    cancel: CancelToken,
}

impl AiSession {
    pub fn new(engine: GameEngine, remote: RemoteClient, heuristic: HeuristicEngine, side: Side) -> Self {
        let settings = remote.settings().clone();
        AiSession {
            engine,
            remote,
            router: SmartRouter::new(),
            monitor: PerformanceMonitor::new(),
            fallback: Fallback::new(heuristic.clone()),
            heuristic,
            settings,
            side,
            processed: FxHashSet::default(),
            active: None,
            epoch: 0,
            cancel: CancelToken::new(),
        }
    }

    /// A session that never talks to a remote endpoint
    pub fn local(engine: GameEngine, heuristic: HeuristicEngine, side: Side) -> Self {
        let mut settings = AiSettings::default();
        settings.think_delay_ms = 0;
        Self::new(engine, RemoteClient::unconfigured(&settings), heuristic, side)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Scenario currently being worked on
    pub fn active(&self) -> Option<&ScenarioKey> {
        self.active.as_ref()
    }

    pub fn is_processed(&self, key: &ScenarioKey) -> bool {
        self.processed.contains(key)
    }

    /// Token of the in-flight scenario. Cancelling it makes the running step
    /// discard whatever it was about to apply.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Forget every acted-on key when the status comes from a new epoch
    pub fn observe(&mut self, state: &GameStatus) {
        if state.epoch == self.epoch {
            return;
        }
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.processed.clear();
        self.active = None;
        self.epoch = state.epoch;
    }

    /// Take at most one action for this session's side
    pub async fn step(&mut self, state: &GameStatus, now_ms: u64) -> Option<(GameStatus, StepReport)> {
        self.observe(state);
        if state.phase == GamePhase::GameOver {
            return None;
        }

        if let Some(draft) = state.draft.as_ref().filter(|d| d.side == self.side) {
            let option = self.fallback.draft_pick(&self.engine, state);
            let card = draft.options.get(option)?.clone();
            let next = self
                .engine
                .apply(state, Command::SelectDraft { side: self.side, option })
                .ok()?;
            return Some((next, StepReport::Drafted { option, card }));
        }

        if state.phase == GamePhase::Playing && state.current == self.side && state.is_idle() {
            let mut next = state.clone();
            if self.engine.advance_if_blocked(&mut next).unwrap_or(false) {
                return Some((next, StepReport::Advanced));
            }
        }

        let scenario = derive_for_side(&self.engine, state, self.side)
            .into_iter()
            .find(|s| !self.processed.contains(&s.key))?;
        self.active = Some(scenario.key.clone());
        let token = self.cancel.clone();

        if self.settings.think_delay_ms > 0 {
            tokio::select! {
                _ = token.cancelled() => return None,
                _ = tokio::time::sleep(Duration::from_millis(self.settings.think_delay_ms)) => {}
            }
        }

        let suggestion = match scenario.kind {
            ScenarioKind::Stone => self.heuristic.suggest_move(state, self.side),
            _ => None,
        };
        let route = self.router.route(&RouteInput {
            kind: scenario.kind,
            complexity: complexity(&scenario, state),
            local_quality: suggestion.as_ref().map(local_quality),
            health: self.monitor.health(scenario.kind),
            remote_available: self.remote.is_configured(),
            smart_timeout_ms: self.settings.smart_timeout_ms,
        });

        let outcome = self
            .resolve(&scenario, state, suggestion.as_ref(), &route, now_ms, &token)
            .await;
        if token.is_cancelled() {
            self.active = None;
            return None;
        }
        let (next, source, decision, attempts) = outcome?;
        if attempts == 0 {
            self.monitor.record_idle(scenario.kind);
        }

        self.processed.insert(scenario.key.clone());
        self.active = None;
        Some((
            next,
            StepReport::Decided {
                key: scenario.key,
                kind: scenario.kind,
                source,
                decision,
                route,
                attempts,
            },
        ))
    }

    async fn resolve(
        &mut self,
        scenario: &Scenario,
        state: &GameStatus,
        suggestion: Option<&Suggestion>,
        route: &Route,
        now_ms: u64,
        token: &CancelToken,
    ) -> Option<(GameStatus, DecisionSource, Decision, u8)> {
        let timeout = match route.strategy {
            Strategy::LocalOnly => None,
            Strategy::LocalThenRemote => match suggestion {
                Some(s) if self.heuristic.should_autoplay(s) => None,
                _ => Some(self.settings.request_timeout_ms),
            },
            Strategy::RemoteOnly => Some(self.settings.request_timeout_ms),
            Strategy::SmartFallback => Some(self.settings.smart_timeout_ms),
        };

        let mut attempts = 0;
        if let Some(timeout_ms) = timeout {
            let mut feedback: Option<String> = None;
            while attempts < self.settings.max_attempts.max(1) {
                attempts += 1;
                let started = Instant::now();
                let reply = self
                    .remote
                    .decide(
                        self.engine.catalog(),
                        scenario,
                        state,
                        feedback.as_deref(),
                        token,
                        Duration::from_millis(timeout_ms),
                    )
                    .await;
                let elapsed = started.elapsed();
                match reply {
                    Ok(decision) => match apply_decision(&self.engine, scenario, state, &decision, now_ms) {
                        Ok(next) => {
                            self.monitor.record(scenario.kind, true, elapsed);
                            return Some((next, DecisionSource::Remote, decision, attempts));
                        }
                        Err(rejected) => {
                            self.monitor.record(scenario.kind, false, elapsed);
                            feedback = Some(format!("\"{decision}\" was illegal: {rejected}"));
                        }
                    },
                    Err(RemoteError::Cancelled) => return None,
                    // the race is lost; answer locally instead of retrying
                    Err(RemoteError::Timeout(_)) if route.strategy == Strategy::SmartFallback => {
                        self.monitor.record(scenario.kind, false, elapsed);
                        break;
                    }
                    Err(err) => {
                        self.monitor.record(scenario.kind, false, elapsed);
                        feedback = Some(err.to_string());
                    }
                }
            }
        }

        let (decision, source) = match suggestion {
            Some(s) => (Decision::PlaceStone { pos: s.pos }, DecisionSource::Local),
            None => (
                self.fallback.decide(&self.engine, scenario, state),
                DecisionSource::Fallback,
            ),
        };
        match apply_decision(&self.engine, scenario, state, &decision, now_ms) {
            Ok(next) => Some((next, source, decision, attempts)),
            Err(_) if source == DecisionSource::Local => {
                let decision = self.fallback.decide(&self.engine, scenario, state);
                let next = apply_decision(&self.engine, scenario, state, &decision, now_ms).ok()?;
                Some((next, DecisionSource::Fallback, decision, attempts))
            }
            Err(_) => None,
        }
    }
}

impl fmt::Debug for AiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSession")
            .field("side", &self.side)
            .field("epoch", &self.epoch)
            .field("processed", &self.processed.len())
            .field("active", &self.active)
            .field("remote", &self.remote)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::remote::ScriptedTransport;
    use crate::core::Pos;
    use std::sync::Arc;

    fn ready() -> (GameEngine, GameStatus) {
        let mut engine = GameEngine::standard().unwrap();
        engine.rules.draft_interval = 0;
        let mut state = engine.start(6);
        engine.mulligan(&mut state, Side::A, &[]).unwrap();
        engine.mulligan(&mut state, Side::B, &[]).unwrap();
        (engine, state)
    }

    fn scripted(engine: &GameEngine, replies: Vec<Result<String, RemoteError>>) -> (AiSession, Arc<ScriptedTransport>) {
        let settings = AiSettings {
            think_delay_ms: 0,
            ..AiSettings::default()
        };
        let transport = Arc::new(ScriptedTransport::new(replies));
        let remote = RemoteClient::with_transport(transport.clone(), &settings);
        let session = AiSession::new(engine.clone(), remote, HeuristicEngine::default(), Side::B);
        (session, transport)
    }

    #[tokio::test]
    async fn test_local_session_plays_and_never_repeats() {
        let (engine, mut state) = ready();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let mut session = AiSession::local(engine.clone(), HeuristicEngine::default(), Side::B);

        let (next, report) = session.step(&state, 0).await.unwrap();
        let StepReport::Decided { key, kind, .. } = &report else {
            panic!("expected a decision, got {report:?}");
        };
        assert_eq!(*kind, ScenarioKind::Stone);
        assert!(session.is_processed(key));
        assert_eq!(next.board.stone_count(), 2);
        // the same decision point is not solicited twice
        assert!(session.step(&state, 0).await.is_none());
    }

    #[tokio::test]
    async fn test_illegal_reply_is_retried_with_feedback() {
        let (engine, mut state) = ready();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let (mut session, transport) = scripted(
            &engine,
            vec![
                Ok("{\"row\": 7, \"col\": 7}".to_string()),
                Ok("{\"row\": 6, \"col\": 6}".to_string()),
            ],
        );

        let (next, report) = session.step(&state, 0).await.unwrap();
        let StepReport::Decided { source, attempts, decision, .. } = report else {
            panic!("expected a decision");
        };
        assert_eq!(source, DecisionSource::Remote);
        assert_eq!(attempts, 2);
        assert_eq!(decision, Decision::PlaceStone { pos: Pos::new(6, 6) });
        assert_eq!(next.board.get(Pos::new(6, 6)), Some(Side::B));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let retry = &requests[1].messages.last().unwrap().content;
        assert!(retry.contains("occupied"), "{retry}");
        assert_eq!(session.monitor().health(ScenarioKind::Stone).unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fall_back() {
        let (engine, mut state) = ready();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let garbage = || Ok("I would rather not say".to_string());
        let (mut session, transport) = scripted(&engine, vec![garbage(), garbage(), garbage(), garbage()]);

        let (next, report) = session.step(&state, 0).await.unwrap();
        let StepReport::Decided { source, attempts, .. } = report else {
            panic!("expected a decision");
        };
        assert_eq!(attempts, 3);
        assert_eq!(transport.requests().len(), 3);
        assert_ne!(source, DecisionSource::Remote);
        assert_eq!(next.board.stone_count(), 2);
    }

    #[tokio::test]
    async fn test_new_epoch_forgets_processed_keys() {
        let (engine, mut state) = ready();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        let mut session = AiSession::local(engine.clone(), HeuristicEngine::default(), Side::B);
        let (_, report) = session.step(&state, 0).await.unwrap();
        let StepReport::Decided { key, .. } = report else {
            panic!("expected a decision");
        };

        let old_token = session.cancel_token();
        let mut rewound = state.clone();
        rewound.epoch += 1;
        session.observe(&rewound);
        assert!(old_token.is_cancelled());
        assert!(!session.is_processed(&key));
        assert!(session.step(&rewound, 0).await.is_some());
    }

    #[tokio::test]
    async fn test_remote_stones_resume_after_failures() {
        let (mut engine, mut state) = ready();
        engine.rules.skill_unlock_moves = u32::MAX;
        let mut replies: Vec<Result<String, RemoteError>> =
            (0..3).map(|_| Err(RemoteError::Transport("blip".to_string()))).collect();
        replies.extend((0..15).map(|col| Ok(format!("{{\"row\": 0, \"col\": {col}}}"))));
        let (mut session, transport) = scripted(&engine, replies);
        let mut opponent = AiSession::local(engine.clone(), HeuristicEngine::default(), Side::A);

        let mut sources = Vec::new();
        for _ in 0..10 {
            let (next, _) = opponent.step(&state, 0).await.unwrap();
            state = next;
            let (next, report) = session.step(&state, 0).await.unwrap();
            state = next;
            let StepReport::Decided { source, .. } = report else {
                panic!("expected a decision, got {report:?}");
            };
            sources.push(source);
            if source == DecisionSource::Remote {
                break;
            }
        }

        assert_ne!(sources[0], DecisionSource::Remote);
        assert_eq!(sources.last(), Some(&DecisionSource::Remote));
        assert!(transport.requests().len() > 3);
        assert_eq!(state.board.get(Pos::new(0, 0)), Some(Side::B));
    }

    #[tokio::test]
    async fn test_blocked_turn_is_advanced() {
        let (engine, mut state) = ready();
        engine.place_stone(&mut state, Side::A, Pos::new(7, 7)).unwrap();
        state.statuses[Side::B].freeze_turns = 1;
        let mut session = AiSession::local(engine, HeuristicEngine::default(), Side::B);
        let (next, report) = session.step(&state, 0).await.unwrap();
        assert_eq!(report, StepReport::Advanced);
        assert_eq!(next.current, Side::A);
    }
}
