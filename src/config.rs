//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every tunable of the trading loop lives here; defaults match the
//! values the bot has always shipped with.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_log_clear_interval")]
    pub log_clear_interval_secs: u64,
    #[serde(default = "default_run_flag_file")]
    pub run_flag_file: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    /// Fraction of the base balance committed per buy at size factor 1.
    pub max_position_fraction: f64,
    /// Upper clamp of the gain-driven size factor.
    pub max_size_factor: f64,
    /// Minimum base-currency balance required to trade at all.
    pub min_trade_amount: f64,
    pub rsi_buy_threshold: f64,
    pub rsi_sell_threshold: f64,
    /// Threshold widening per consecutive failure.
    pub threshold_step: f64,
    pub rsi_buy_floor: f64,
    pub rsi_sell_ceiling: f64,
    /// Also require 30 daily candles before a pair is considered.
    pub require_daily_history: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.1,
            max_size_factor: 10.0,
            min_trade_amount: 3.0,
            rsi_buy_threshold: 40.0,
            rsi_sell_threshold: 60.0,
            threshold_step: 2.0,
            rsi_buy_floor: 20.0,
            rsi_sell_ceiling: 80.0,
            require_daily_history: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 2,
        }
    }
}

/// Which exchange backend drives the loop.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeMode {
    /// Live public market data, simulated wallet and fills.
    Paper,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeConfig {
    pub mode: ExchangeMode,
    pub base_url: String,
    pub quote_currency: String,
    /// Starting wallet for paper mode.
    #[serde(default)]
    pub paper_balances: BTreeMap<String, f64>,
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_log_clear_interval() -> u64 {
    400
}

fn default_run_flag_file() -> String {
    "bot_state.json".to_string()
}

fn default_log_file() -> String {
    "bot.log".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.execution.max_attempts == 0 {
            anyhow::bail!("execution.max_attempts must be at least 1");
        }
        if self.trading.rsi_buy_threshold >= self.trading.rsi_sell_threshold {
            anyhow::bail!(
                "trading.rsi_buy_threshold ({}) must be below rsi_sell_threshold ({})",
                self.trading.rsi_buy_threshold,
                self.trading.rsi_sell_threshold
            );
        }
        if !self.trading.max_size_factor.is_finite() || self.trading.max_size_factor < 1.0 {
            anyhow::bail!(
                "trading.max_size_factor must be a finite value of at least 1.0, got {}",
                self.trading.max_size_factor
            );
        }
        if self.trading.max_position_fraction <= 0.0 {
            anyhow::bail!("trading.max_position_fraction must be positive");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.agent.refresh_interval_secs)
    }

    pub fn log_clear_interval(&self) -> Duration {
        Duration::from_secs(self.agent.log_clear_interval_secs)
    }
}
