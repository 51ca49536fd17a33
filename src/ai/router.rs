//! Smart router: picks where a scenario's decision comes from

use crate::ai::monitor::KindStats;
use crate::ai::scenario::{Scenario, ScenarioKind};
use crate::analysis::{scan_threats, QualityBucket, Suggestion};
use crate::game::GameStatus;
use serde::Serialize;
use std::fmt;

/// Below this many recent attempts the health record is not trusted
const MIN_SAMPLES: u32 = 3;
/// Local stones played while unhealthy before the remote is tried again
const RETRY_AFTER: u32 = 3;
const UNHEALTHY_RATE: f64 = 0.5;
const LOW_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    LocalOnly,
    RemoteOnly,
    /// Play the local suggestion when it is clear cut, otherwise ask remote
    LocalThenRemote,
    /// Race the remote against a short timeout, fall back to local on expiry
    SmartFallback,
}

impl Strategy {
    pub fn id(self) -> &'static str {
        match self {
            Strategy::LocalOnly => "local-only",
            Strategy::RemoteOnly => "remote-only",
            Strategy::LocalThenRemote => "local-then-remote",
            Strategy::SmartFallback => "smart-fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub strategy: Strategy,
    pub reason: String,
}

impl Route {
    fn new(strategy: Strategy, reason: impl Into<String>) -> Self {
        Route {
            strategy,
            reason: reason.into(),
        }
    }
}

/// Inputs to a routing decision
#[derive(Debug, Clone, Copy)]
pub struct RouteInput<'a> {
    pub kind: ScenarioKind,
    /// 0-100
    pub complexity: u8,
    pub local_quality: Option<QualityBucket>,
    pub health: Option<&'a KindStats>,
    pub remote_available: bool,
    /// Latency budget of the smart-fallback race
    pub smart_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SmartRouter;

impl SmartRouter {
    pub fn new() -> Self {
        SmartRouter
    }

    pub fn route(&self, input: &RouteInput<'_>) -> Route {
        if !input.remote_available {
            return Route::new(Strategy::LocalOnly, "remote AI is not configured");
        }
        let unhealthy = input
            .health
            .filter(|h| h.window_len() >= MIN_SAMPLES && h.success_rate() < UNHEALTHY_RATE);
        let slow = input
            .health
            .and_then(KindStats::average_ms)
            .filter(|&avg| avg > input.smart_timeout_ms);

        match input.kind {
            ScenarioKind::Stone => {
                if input.local_quality == Some(QualityBucket::Decisive) {
                    return Route::new(Strategy::LocalOnly, "the local engine found a decisive move");
                }
                if let Some(h) = unhealthy {
                    if h.idle >= RETRY_AFTER {
                        return Route::new(
                            Strategy::SmartFallback,
                            format!("{} local stones since the last remote try; trying it again", h.idle),
                        );
                    }
                    return Route::new(
                        Strategy::LocalOnly,
                        format!("remote stone success rate is {:.0}%", h.success_rate() * 100.0),
                    );
                }
                if input.complexity < 20 && input.local_quality >= Some(QualityBucket::Strong) {
                    return Route::new(Strategy::LocalOnly, "simple position with a strong local move");
                }
                if let Some(avg) = slow {
                    return Route::new(
                        Strategy::SmartFallback,
                        format!("remote averages {avg} ms; racing it against the local move"),
                    );
                }
                Route::new(
                    Strategy::LocalThenRemote,
                    format!("complexity {}; remote is consulted unless the local move is clear", input.complexity),
                )
            }
            ScenarioKind::CounterWindow => Route::new(
                Strategy::SmartFallback,
                "counter windows are timed; a late answer is worse than a safe one",
            ),
            ScenarioKind::Skill | ScenarioKind::CardTargeting | ScenarioKind::Mulligan => {
                if let Some(h) = unhealthy {
                    return Route::new(
                        Strategy::SmartFallback,
                        format!(
                            "remote {} success rate is {:.0}%; keeping a local answer ready",
                            input.kind,
                            h.success_rate() * 100.0
                        ),
                    );
                }
                Route::new(
                    Strategy::RemoteOnly,
                    format!("the local engine has no opinion on {} choices", input.kind),
                )
            }
        }
    }
}

/// Router view of a local suggestion, one bucket lower when confidence is low
pub fn local_quality(suggestion: &Suggestion) -> QualityBucket {
    let bucket = suggestion.category.bucket();
    if suggestion.confidence >= LOW_CONFIDENCE {
        return bucket;
    }
    match bucket {
        QualityBucket::Decisive => QualityBucket::Strong,
        QualityBucket::Strong => QualityBucket::Moderate,
        QualityBucket::Moderate | QualityBucket::Weak => QualityBucket::Weak,
    }
}

/// How hard the scenario looks, 0-100
pub fn complexity(scenario: &Scenario, state: &GameStatus) -> u8 {
    let side = scenario.side;
    let score = match scenario.kind {
        ScenarioKind::Stone => {
            let moves = state.board.stone_count() * 2;
            let sealed = if state.statuses[side].active_seal(state.turn).is_some() { 10 } else { 0 };
            let threats = scan_threats(&state.board, side.opponent());
            let pressure = (threats.wins.len() + threats.open_fours.len() + threats.double_threes.len()) * 15
                + threats.open_threes.len() * 5;
            moves + sealed + pressure
        }
        ScenarioKind::Skill => {
            scenario.playable.len() * 15
                + state.zones[side].hand.len() * 5
                + if state.characters[side.opponent()].is_some() { 10 } else { 0 }
        }
        ScenarioKind::CardTargeting => {
            10 + scenario.options.as_ref().map_or(0, |o| o.len()).min(60)
        }
        ScenarioKind::CounterWindow => 30 + scenario.counter_options.len() * 25,
        ScenarioKind::Mulligan => state.zones[side].hand.len() * 10,
    };
    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(kind: ScenarioKind) -> RouteInput<'a> {
        RouteInput {
            kind,
            complexity: 50,
            local_quality: Some(QualityBucket::Moderate),
            health: None,
            remote_available: true,
            smart_timeout_ms: 4_000,
        }
    }

    #[test]
    fn test_defaults_per_kind() {
        let router = SmartRouter::new();
        assert_eq!(router.route(&input(ScenarioKind::Stone)).strategy, Strategy::LocalThenRemote);
        assert_eq!(router.route(&input(ScenarioKind::Skill)).strategy, Strategy::RemoteOnly);
        assert_eq!(router.route(&input(ScenarioKind::CardTargeting)).strategy, Strategy::RemoteOnly);
        assert_eq!(router.route(&input(ScenarioKind::Mulligan)).strategy, Strategy::RemoteOnly);
        assert_eq!(router.route(&input(ScenarioKind::CounterWindow)).strategy, Strategy::SmartFallback);
    }

    #[test]
    fn test_unconfigured_is_local() {
        let mut i = input(ScenarioKind::CounterWindow);
        i.remote_available = false;
        let route = SmartRouter::new().route(&i);
        assert_eq!(route.strategy, Strategy::LocalOnly);
        assert!(!route.reason.is_empty());
    }

    #[test]
    fn test_decisive_and_unhealthy_stone() {
        let router = SmartRouter::new();
        let mut i = input(ScenarioKind::Stone);
        i.local_quality = Some(QualityBucket::Decisive);
        assert_eq!(router.route(&i).strategy, Strategy::LocalOnly);

        let mut bad = KindStats::default();
        for success in [true, false, false, false] {
            bad.record(success, 100);
        }
        let mut i = input(ScenarioKind::Stone);
        i.health = Some(&bad);
        assert_eq!(router.route(&i).strategy, Strategy::LocalOnly);

        let mut slow = KindStats::default();
        for _ in 0..4 {
            slow.record(true, 10_000);
        }
        let mut i = input(ScenarioKind::Stone);
        i.health = Some(&slow);
        assert_eq!(router.route(&i).strategy, Strategy::SmartFallback);
    }

    #[test]
    fn test_unhealthy_stone_retries_remote_after_local_run() {
        let router = SmartRouter::new();
        let mut stats = KindStats::default();
        for _ in 0..3 {
            stats.record(false, 50);
        }
        let route_with = |stats: &KindStats| {
            let mut i = input(ScenarioKind::Stone);
            i.health = Some(stats);
            router.route(&i).strategy
        };
        assert_eq!(route_with(&stats), Strategy::LocalOnly);

        stats.idle = RETRY_AFTER;
        assert_eq!(route_with(&stats), Strategy::SmartFallback);

        // three recent successes lift the window back to 50%
        for _ in 0..3 {
            stats.record(true, 50);
        }
        assert_eq!(stats.idle, 0);
        assert_eq!(route_with(&stats), Strategy::LocalThenRemote);
    }
}
