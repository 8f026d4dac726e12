//! Main entry point for the tweet translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tweet_translator::cli::commands::{self, Commands};

/// Batch translation and tweet lookup from the command line
#[derive(Parser, Debug)]
#[command(name = "tweet-translator", version, about, long_about = None)]
struct Args {
    /// API key for the chosen service (defaults to GOOGLE_API_KEY / TWITTER_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tweet_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Commands::Translate {
            target_lang,
            batch_cap,
            texts,
        } => {
            commands::handle_translate(args.api_key, target_lang, batch_cap, texts).await?;
        }
        Commands::Lookup { ids } => {
            commands::handle_lookup(args.api_key, ids).await?;
        }
    }

    Ok(())
}
