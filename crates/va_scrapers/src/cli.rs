use std::path::PathBuf;

use clap::{Args, Subcommand};
use va_core::{Fetcher, Result};

use crate::scrapers::{self, get_scraper_factories};

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Scrape one article page into a JSON record
    Url {
        /// Full article URL, e.g. https://jamanetwork.com/journals/jama/fullarticle/...
        url: String,
        /// Where to write the record
        #[arg(short, long, default_value = "va.json")]
        out: PathBuf,
    },
    /// List available scrapers
    List,
}

pub async fn handle_command(args: ScraperArgs, fetcher: &Fetcher) -> Result<()> {
    match args.command {
        ScraperCommands::Url { url, out } => {
            let outcome = scrapers::extract(&url, fetcher).await?;
            let json = serde_json::to_string_pretty(&outcome.value)?;
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&out, json).await?;

            println!("📰 {} -> {}", outcome.value.title, out.display());
            for warning in &outcome.warnings {
                println!("⚠️  {}", warning);
            }
        }
        ScraperCommands::List => {
            println!("Available scrapers:");
            for factory in get_scraper_factories() {
                let scraper = factory(fetcher.clone());
                println!("  {} ({})", scraper.cli_names().join(", "), scraper.source());
            }
        }
    }
    Ok(())
}
