use std::sync::Arc;

use va_core::{Config, Publisher, Result};

pub mod backends;

pub use backends::*;

/// Which publish sink to hand rendered files to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PublisherKind {
    #[default]
    Github,
    Memory,
}

pub fn create_publisher(kind: PublisherKind, config: &Config) -> Result<Arc<dyn Publisher>> {
    let publisher: Arc<dyn Publisher> = match kind {
        PublisherKind::Github => Arc::new(GithubReleasePublisher::new(GithubConfig::from_config(config))?),
        PublisherKind::Memory => Arc::new(MemoryPublisher::new()),
    };
    tracing::debug!("Using {} publisher", publisher.name());
    Ok(publisher)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_publisher, PublisherKind};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_publisher() {
        let config = Config::default();
        assert_eq!(
            create_publisher(PublisherKind::Github, &config).unwrap().name(),
            "GitHub release"
        );
        assert_eq!(
            create_publisher(PublisherKind::Memory, &config).unwrap().name(),
            "memory"
        );
    }
}
