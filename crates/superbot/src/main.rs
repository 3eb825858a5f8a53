use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use superbot_models::request::{AnalysisRequest, DEFAULT_NEWS_LIMIT};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "superbot", about = "Crypto trading decision engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/superbot.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one analysis and print the result as JSON
    Analyze {
        /// Instrument to analyze; repeat for several
        #[arg(short, long = "symbol", required = true)]
        symbols: Vec<String>,

        /// Number of headlines the news analysis considers
        #[arg(long, default_value_t = DEFAULT_NEWS_LIMIT)]
        news_limit: u32,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Run the configured request at the scheduled times until Ctrl-C
    Schedule,
    /// List recent runs from the snapshot store
    Runs {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = superbot::load_config(&cli.config)?;

    match cli.command {
        Command::Analyze {
            symbols,
            news_limit,
            pretty,
        } => {
            let engine = superbot::build_engine(&config).await?;
            let response = engine
                .execute(AnalysisRequest::new(symbols, news_limit))
                .await
                .context("Request rejected")?;

            // Output result as JSON to stdout
            let output = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{output}");
        }
        Command::Schedule => {
            let engine = superbot::build_engine(&config).await?;
            let cancel = CancellationToken::new();

            // Handle shutdown signals
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received shutdown signal");
                shutdown.cancel();
            });

            superbot::scheduler::run_schedule(&engine, &config.schedule, cancel)
                .await
                .context("Scheduler error")?;
        }
        Command::Runs { limit } => {
            let store = superbot::open_run_store(&config)?;
            for run in store.recent(limit).context("Failed to read run history")? {
                println!(
                    "{}  {}  {:<5}  {:<7}  {}",
                    run.created_at.format("%Y-%m-%d %H:%M:%S"),
                    run.run_id,
                    run.direction.map(|d| d.as_str()).unwrap_or("-"),
                    if run.success { "ok" } else { "failed" },
                    run.symbols.join(","),
                );
            }
        }
    }

    Ok(())
}
