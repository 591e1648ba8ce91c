use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Stable, machine-readable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::InvalidUrl(_) | Error::InvalidInput(_) => "validation_error",
            Error::Fetch(_) | Error::Http(_) => "fetch_error",
            Error::Parse(_) => "parse_error",
            Error::Template(_) => "template_error",
            Error::Render(_) => "render_error",
            Error::Publish(_) => "publish_error",
            Error::External(_) => "internal_error",
        }
    }

    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

/// The structured error object handed back to callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::InvalidUrl("x".into()).kind(), "validation_error");
        assert_eq!(Error::InvalidInput("x".into()).kind(), "validation_error");
        assert_eq!(Error::Fetch("x".into()).kind(), "fetch_error");
        assert_eq!(Error::Template("x".into()).kind(), "template_error");
    }

    #[test]
    fn test_report_carries_message() {
        let report = Error::Parse("no title element found".into()).to_report();
        assert_eq!(report.kind, "parse_error");
        assert_eq!(report.message, "Parse error: no title element found");
    }
}
