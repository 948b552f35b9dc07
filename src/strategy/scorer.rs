//! Pair scoring and selection.
//!
//! Ranks candidates by an additive signal score built from the same
//! indicators the decision logic uses. Candidates without a valid
//! snapshot get the minimum score and are never picked.

use tracing::{debug, info};

use crate::indicators::IndicatorSnapshot;
use crate::types::{BotError, PairCandidate, RsiThresholds};

/// Score assigned to candidates whose indicators could not be computed.
pub const INVALID_SCORE: f64 = f64::NEG_INFINITY;

/// A candidate together with the outcome of its evaluation.
#[derive(Debug)]
pub struct Evaluation {
    pub candidate: PairCandidate,
    pub snapshot: Result<IndicatorSnapshot, BotError>,
}

/// The winning candidate.
#[derive(Debug, Clone)]
pub struct ScoredPair {
    pub candidate: PairCandidate,
    pub snapshot: IndicatorSnapshot,
    pub score: f64,
}

/// Composite signal score for one snapshot.
pub fn score(snapshot: &IndicatorSnapshot, thresholds: &RsiThresholds) -> f64 {
    let mut score = 0.0;

    // Trend + RSI: reward the margin past the threshold.
    if snapshot.close > snapshot.ma30 && snapshot.rsi < thresholds.buy {
        score += thresholds.buy - snapshot.rsi;
    } else if snapshot.close < snapshot.ma30 && snapshot.rsi > thresholds.sell {
        score += snapshot.rsi - thresholds.sell;
    }

    if snapshot.close < snapshot.lower_band {
        score += 1.0;
    } else if snapshot.close > snapshot.upper_band {
        score -= 1.0;
    }

    if snapshot.macd > snapshot.macd_signal {
        score += 1.0;
    } else if snapshot.macd < snapshot.macd_signal {
        score -= 1.0;
    }

    score
}

pub struct PairScorer;

impl PairScorer {
    /// Pick the highest-scoring candidate. Ties go to the earliest one.
    pub fn select_best(evaluations: &[Evaluation], thresholds: &RsiThresholds) -> Option<ScoredPair> {
        let mut best: Option<ScoredPair> = None;
        let mut best_score = INVALID_SCORE;

        for eval in evaluations {
            let (value, snapshot) = match &eval.snapshot {
                Ok(snapshot) => (score(snapshot, thresholds), Some(snapshot)),
                Err(e) => {
                    debug!(pair = %eval.candidate.symbol, error = %e, "Candidate invalid");
                    (INVALID_SCORE, None)
                }
            };

            debug!(pair = %eval.candidate.symbol, score = value, "Evaluated pair");

            if let Some(snapshot) = snapshot {
                if value > best_score {
                    best_score = value;
                    best = Some(ScoredPair {
                        candidate: eval.candidate.clone(),
                        snapshot: *snapshot,
                        score: value,
                    });
                }
            }
        }

        match &best {
            Some(pair) => info!(
                pair = %pair.candidate.symbol,
                score = format!("{:.2}", pair.score),
                candidates = evaluations.len(),
                "Selected best pair"
            ),
            None => info!(candidates = evaluations.len(), "No valid pair to select"),
        }

        best
    }
}
