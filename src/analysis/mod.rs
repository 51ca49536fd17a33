//! Board analysis: line patterns and the local heuristic engine

pub mod heuristic;
pub mod patterns;

pub use heuristic::{HeuristicEngine, HeuristicWeights, MoveCategory, QualityBucket, Score, Suggestion};
pub use patterns::{analyze_cell, count_line, scan_threats, CellAnalysis, LineCount, LineShape, ThreatSummary};
