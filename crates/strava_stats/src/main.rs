use clap::Parser;

use strava_client::config::Config;
use strava_stats::cli::Args;
use strava_stats::error::AppError;
use strava_stats::report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configure logging from env var `STRAVA_STATS_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("STRAVA_STATS_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // Keep the HTTP stack quiet unless asked for explicitly
    let combined_filter = format!("{},hyper=warn,reqwest=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("strava_stats: log filter: {}", log_env);

    let args = Args::parse();

    let outcome = match Config::from_env() {
        Ok(endpoints) => strava_stats::run(&args, &endpoints).await,
        Err(e) => Err(AppError::Configuration(e.to_string())),
    };

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(fetch = e.is_fetch(), "strava_stats: run failed");
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", report::render(&summary));
    }

    Ok(())
}
