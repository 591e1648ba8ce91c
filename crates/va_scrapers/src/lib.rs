pub mod cli;
pub mod derive;
pub mod lookup;
pub mod scrapers;
pub mod text;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use scrapers::jama::JamaScraper;
pub use scrapers::{extract, scraper_for_url, Scraper};

pub mod prelude {
    pub use super::scrapers::Scraper;
    pub use va_core::{ArticleRecord, Diagnosed, Error, Result};
}
