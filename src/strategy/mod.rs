//! Strategy: pair scoring, adaptive thresholds, sizing, and the
//! prioritised trade decision.
//!
//! Everything in this module is synchronous and free of I/O; the engine
//! feeds it snapshots and state and acts on what it returns.

pub mod decision;
pub mod scorer;
pub mod sizing;
pub mod thresholds;

pub use decision::{decide, Decision, Tier};
pub use scorer::{Evaluation, PairScorer, ScoredPair};
pub use sizing::{PositionSizer, SizingConfig};
pub use thresholds::{ThresholdAdapter, ThresholdConfig};
