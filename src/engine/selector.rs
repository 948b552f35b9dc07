//! Pair selector.
//!
//! Builds the candidate list from the wallet and the exchange's markets,
//! evaluates indicators for each candidate, and hands the results to the
//! scorer. Per-candidate failures only invalidate that candidate.

use tracing::{debug, info, warn};

use crate::exchange::Exchange;
use crate::indicators::{IndicatorError, IndicatorSnapshot, MIN_SAMPLES};
use crate::strategy::{Evaluation, PairScorer, ScoredPair};
use crate::types::{Balances, BotError, ExchangeError, Granularity, PairCandidate, RsiThresholds};

/// Wallet and candidates discovered at the start of a cycle.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub balances: Balances,
    pub candidates: Vec<PairCandidate>,
}

pub struct PairSelector {
    require_daily_history: bool,
}

impl PairSelector {
    pub fn new(require_daily_history: bool) -> Self {
        Self { require_daily_history }
    }

    /// Positive balances and the active markets whose base currency we hold,
    /// in exchange listing order.
    pub async fn discover(&self, exchange: &dyn Exchange) -> Result<Discovery, ExchangeError> {
        let balances: Balances = exchange
            .fetch_balances()
            .await?
            .into_iter()
            .filter(|(_, amount)| *amount > 0.0)
            .collect();
        info!(balances = ?balances, "Balances fetched");

        let markets = exchange.fetch_active_markets().await?;
        let candidates: Vec<PairCandidate> = markets
            .iter()
            .filter_map(|m| PairCandidate::from_market(m, &balances))
            .collect();

        info!(
            markets = markets.len(),
            candidates = candidates.len(),
            pairs = ?candidates.iter().map(|c| c.symbol.as_str()).collect::<Vec<_>>(),
            "Active pairs with positive balance"
        );

        Ok(Discovery { balances, candidates })
    }

    /// Fetch history and compute indicators for one pair.
    pub async fn evaluate_pair(
        &self,
        exchange: &dyn Exchange,
        pair: &str,
    ) -> Result<IndicatorSnapshot, BotError> {
        let hourly = exchange
            .fetch_price_series(pair, Granularity::OneHour)
            .await
            .map_err(|source| BotError::MarketData { pair: pair.to_string(), source })?;

        if self.require_daily_history {
            let daily = exchange
                .fetch_price_series(pair, Granularity::OneDay)
                .await
                .map_err(|source| BotError::MarketData { pair: pair.to_string(), source })?;
            if daily.len() < MIN_SAMPLES {
                return Err(BotError::from_indicator(
                    pair,
                    IndicatorError::InsufficientData {
                        required: MIN_SAMPLES,
                        available: daily.len(),
                    },
                ));
            }
        }

        let snapshot = IndicatorSnapshot::compute(&hourly)
            .map_err(|e| BotError::from_indicator(pair, e))?;
        debug!(pair, %snapshot, "Indicators computed");
        Ok(snapshot)
    }

    /// Discover, evaluate and score. `None` when nothing valid is available.
    pub async fn select(
        &self,
        exchange: &dyn Exchange,
        thresholds: &RsiThresholds,
    ) -> (Balances, Option<ScoredPair>) {
        let discovery = match self.discover(exchange).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Failed to fetch crypto pairs");
                return (Balances::new(), None);
            }
        };

        let mut evaluations = Vec::with_capacity(discovery.candidates.len());
        for candidate in discovery.candidates {
            let snapshot = self.evaluate_pair(exchange, &candidate.symbol).await;
            if let Err(e) = &snapshot {
                warn!(pair = %candidate.symbol, error = %e, "Failed to evaluate pair");
            }
            evaluations.push(Evaluation { candidate, snapshot });
        }

        let best = PairScorer::select_best(&evaluations, thresholds);
        (discovery.balances, best)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
