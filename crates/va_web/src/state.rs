use std::sync::Arc;

use va_composer::SlideComposer;
use va_core::{Config, Fetcher, Publisher, Result};
use va_publish::{create_publisher, PublisherKind};

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub fetcher: Fetcher,
    pub publisher: Arc<dyn Publisher>,
}

impl AppState {
    pub fn new(config: Config, publisher_kind: PublisherKind) -> Result<Self> {
        let fetcher = Fetcher::new(config.http_timeout)?;
        let publisher = create_publisher(publisher_kind, &config)?;
        Ok(Self {
            config,
            fetcher,
            publisher,
        })
    }

    pub fn composer(&self) -> SlideComposer {
        SlideComposer::from_config(&self.config, self.fetcher.clone())
            .with_publisher(self.publisher.clone())
    }
}
