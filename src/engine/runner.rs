//! Main loop.
//!
//! Reads the run flag, runs a cycle, sleeps, repeats. A cycle always runs
//! to completion; the flag and the shutdown signal are only honoured
//! between cycles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::accountant::CycleReport;
use super::sleeper::Sleeper;
use super::trader::Trader;
use crate::storage::RunFlagStore;
use crate::types::{BotState, StateSnapshot};

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FlagCleared,
    Shutdown,
}

pub struct Runner {
    trader: Trader,
    flag: RunFlagStore,
    sleeper: Arc<dyn Sleeper>,
    interval: Duration,
}

impl Runner {
    pub fn new(trader: Trader, flag: RunFlagStore, sleeper: Arc<dyn Sleeper>, interval: Duration) -> Self {
        Self {
            trader,
            flag,
            sleeper,
            interval,
        }
    }

    pub fn trader(&self) -> &Trader {
        &self.trader
    }

    /// Run cycles until the run flag is cleared or `shutdown` resolves.
    pub async fn run_until_stopped<F>(
        &self,
        state: &mut BotState,
        shutdown: F,
    ) -> (StopReason, StateSnapshot)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.interval.as_secs(),
            flag = %self.flag.path().display(),
            "Entering main loop. Press Ctrl+C to stop."
        );

        let reason = loop {
            state.running = match self.flag.read() {
                Ok(running) => running,
                Err(e) => {
                    warn!(error = %e, "Run flag unreadable, treating as stopped");
                    false
                }
            };
            if !state.running {
                info!("Run flag cleared. Stopping.");
                break StopReason::FlagCleared;
            }

            let report = self.trader.run_cycle(state).await;
            log_cycle_report(&report);

            tokio::select! {
                _ = self.sleeper.sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break StopReason::Shutdown;
                }
            }
        };

        let snapshot = state.snapshot();
        info!(
            cycles = snapshot.cycle_count,
            gain = format!("{:.2}", snapshot.cumulative_gain),
            failures = snapshot.failure_count,
            reason = ?reason,
            "PAIRBOT shut down cleanly."
        );
        (reason, snapshot)
    }
}

fn log_cycle_report(report: &CycleReport) {
    info!(
        cycle = report.cycle_number,
        pair = report.pair.as_deref().unwrap_or("-"),
        decision = report.decision.map(|d| d.to_string()).unwrap_or_else(|| "none".into()),
        order = report.order.as_ref().map(|o| o.to_string()).unwrap_or_else(|| "none".into()),
        gain_delta = format!("{:.2}", report.gain_delta),
        total_gain = format!("{:.2}", report.cumulative_gain),
        failures = report.failure_count,
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
