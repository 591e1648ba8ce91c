use async_trait::async_trait;
use va_core::{ArticleRecord, Diagnosed, Error, Fetcher, Result};

pub mod jama;
pub mod jsonld;

use jama::JamaScraper;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the article source
    fn source(&self) -> &str;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Fetches and parses one article page
    async fn scrape_article(&self, url: &str) -> Result<Diagnosed<ArticleRecord>>;

    /// Returns a list of CLI shorthand names for this scraper
    fn cli_names(&self) -> Vec<&str> {
        vec![]
    }
}

pub type ScraperFactory = fn(Fetcher) -> Box<dyn Scraper>;

fn jama(fetcher: Fetcher) -> Box<dyn Scraper> {
    Box::new(JamaScraper::new(fetcher))
}

pub fn get_scraper_factories() -> Vec<ScraperFactory> {
    vec![jama as ScraperFactory]
}

/// Picks the scraper for `url`, rejecting unsupported sites before any request is made.
pub fn scraper_for_url(url: &str, fetcher: &Fetcher) -> Result<Box<dyn Scraper>> {
    for factory in get_scraper_factories() {
        let scraper = factory(fetcher.clone());
        if scraper.can_handle(url) {
            return Ok(scraper);
        }
    }
    // Surface the most specific reason the JAMA validator gives
    match JamaScraper::validate_url(url) {
        Err(e) => Err(e),
        Ok(_) => Err(Error::InvalidUrl(format!("No scraper found for URL: {}", url))),
    }
}

/// Extracts one article: validate, fetch, parse.
pub async fn extract(url: &str, fetcher: &Fetcher) -> Result<Diagnosed<ArticleRecord>> {
    let scraper = scraper_for_url(url, fetcher)?;
    scraper.scrape_article(url).await
}
