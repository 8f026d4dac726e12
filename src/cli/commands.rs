//! CLI command definitions and handlers

use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::info;

use crate::clients::lookup::ContentLookup;
use crate::clients::translator::BatchTranslator;
use crate::core::config::{LookupConfig, TranslatorConfig};

/// Commands for the tweet translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate texts and print the translations as a JSON array
    Translate {
        /// Target language (default: en)
        #[arg(short, long, default_value = "en")]
        target_lang: String,

        /// Maximum number of texts per request
        #[arg(long)]
        batch_cap: Option<usize>,

        /// Texts to translate
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Look up tweets and print the collected tables as JSON
    Lookup {
        /// Tweet IDs
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

fn progress_bar(len: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

/// Handle translate command
pub async fn handle_translate(
    api_key: Option<String>,
    target_lang: String,
    batch_cap: Option<usize>,
    texts: Vec<String>,
) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let mut config = TranslatorConfig::from_env()?;
    if let Some(api_key) = api_key {
        config.api_key = api_key;
    }
    if let Some(batch_cap) = batch_cap {
        config.batch_cap = batch_cap;
    }

    info!("Translating {} texts into {}", texts.len(), target_lang);

    let pb = progress_bar(0)?;
    let translator = BatchTranslator::new(config)?.with_progress(pb.clone());
    let translations = translator.translate_many(&texts, &target_lang).await?;
    pb.finish_and_clear();

    info!("Completed {} translations in {:?}", translations.len(), start_time.elapsed());
    println!("{}", serde_json::to_string_pretty(&translations)?);

    Ok(())
}

/// Handle lookup command
pub async fn handle_lookup(api_key: Option<String>, ids: Vec<u64>) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let mut config = LookupConfig::from_env()?;
    if let Some(api_key) = api_key {
        config.bearer_token = api_key;
    }

    info!("Looking up {} tweets", ids.len());

    let pb = progress_bar(ids.len() as u64)?;
    let lookup = ContentLookup::new(config)?.with_progress(pb.clone());
    let result = lookup.lookup_many(&ids).await?;
    pb.finish_and_clear();

    for (category, table) in result.iter() {
        info!("{}: {} rows", category, table.len());
    }
    info!("Completed lookup in {:?}", start_time.elapsed());
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
