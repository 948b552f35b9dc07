//! PAIRBOT — adaptive single-pair crypto trading loop
//!
//! Entry point. Loads configuration, initialises structured logging and
//! dispatches the CLI command. `start` runs the select → decide → execute
//! loop in the foreground until the run flag is cleared or Ctrl+C.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use pairbot::cli::{Cli, Commands};
use pairbot::config::{AppConfig, ExchangeMode};
use pairbot::engine::executor::{OrderExecutor, RetryPolicy};
use pairbot::engine::runner::Runner;
use pairbot::engine::sleeper::TokioSleeper;
use pairbot::engine::trader::Trader;
use pairbot::exchange::coinbase::CoinbaseMarketData;
use pairbot::exchange::paper::PaperExchange;
use pairbot::exchange::Exchange;
use pairbot::logging::{self, LogSink};
use pairbot::storage::RunFlagStore;
use pairbot::types::BotState;

const BANNER: &str = r#"
 ___  _   ___ ___ ___  ___ _____
| _ \/_\ |_ _| _ \ _ )/ _ \_   _|
|  _/ _ \ | ||   / _ \ (_) || |
|_|/_/ \_\___|_|_\___/\___/ |_|

  Adaptive single-pair crypto trading loop
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;
    logging::init(&cfg)?;

    let flag = RunFlagStore::new(&cfg.agent.run_flag_file);
    let sink = LogSink::new(&cfg.agent.log_file);

    match cli.command {
        Commands::Start => start(&cfg, flag, sink).await,
        Commands::Stop => {
            flag.write(false)?;
            println!("Bot stopped. A running loop exits after its current cycle.");
            Ok(())
        }
        Commands::Status => {
            let running = flag.read()?;
            println!("Bot is {}.", if running { "running" } else { "stopped" });
            Ok(())
        }
        Commands::Monitor { follow } => {
            let mut stdout = std::io::stdout();
            sink.stream_to(&mut stdout, follow).await
        }
        Commands::ClearLog => {
            sink.clear()?;
            println!("Log file {} cleared.", sink.path().display());
            Ok(())
        }
    }
}

async fn start(cfg: &AppConfig, flag: RunFlagStore, sink: LogSink) -> Result<()> {
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        refresh_interval_secs = cfg.agent.refresh_interval_secs,
        mode = ?cfg.exchange.mode,
        quote = %cfg.exchange.quote_currency,
        "PAIRBOT starting up"
    );

    let exchange: Arc<dyn Exchange> = match cfg.exchange.mode {
        ExchangeMode::Paper => {
            let market_data = CoinbaseMarketData::new(Some(&cfg.exchange.base_url))?;
            Arc::new(PaperExchange::new(
                market_data,
                &cfg.exchange.quote_currency,
                cfg.exchange.paper_balances.clone(),
            ))
        }
    };

    let sleeper = Arc::new(TokioSleeper);
    let executor = OrderExecutor::new(RetryPolicy::from(&cfg.execution), sleeper.clone());
    let trader = Trader::new(exchange, &cfg.trading, executor);
    let mut state = BotState::new(trader.initial_thresholds());
    let runner = Runner::new(trader, flag.clone(), sleeper, cfg.refresh_interval());

    flag.write(true)?;
    let clearer = sink.spawn_clearer(cfg.log_clear_interval());

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let (reason, snapshot) = runner.run_until_stopped(&mut state, shutdown).await;

    clearer.abort();
    // Leave the flag consistent with reality after Ctrl+C.
    flag.write(false)?;

    println!("Stopped ({reason:?}): {snapshot}");
    Ok(())
}
