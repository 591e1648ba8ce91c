//! Best-effort outcomes: a value plus the non-fatal problems met while producing it.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// An optional field could not be found on the page.
    MissingField,
    /// More abstract sections than the template has regions for.
    SectionsTruncated,
    /// The figure could not be fetched, decoded or placed.
    FigureUnavailable,
    /// A template region the record had content for does not exist.
    MissingRegion,
    /// Upload to the publish sink failed.
    PublishFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Diagnosed<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Diagnosed<T> {
    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }


    /// Joins warning messages into one line, for embedding in a result message.
    pub fn warning_summary(&self) -> Option<String> {
        if self.warnings.is_empty() {
            return None;
        }
        Some(
            self.warnings
                .iter()
                .map(|w| w.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Collects warnings while a value is being assembled.
#[derive(Debug, Default)]
pub struct WarningSink {
    warnings: Vec<Warning>,
}

impl WarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: WarningKind, message: impl Into<String>) {
        let warning = Warning::new(kind, message);
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn finish<T>(self, value: T) -> Diagnosed<T> {
        Diagnosed::new(value, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_joins_messages() {
        let mut sink = WarningSink::new();
        sink.push(WarningKind::MissingField, "no key points");
        sink.push(WarningKind::FigureUnavailable, "figure timed out");
        let outcome = sink.finish(1);
        assert_eq!(
            outcome.warning_summary().as_deref(),
            Some("no key points; figure timed out")
        );
    }

    #[test]
    fn test_no_warnings_no_summary() {
        let outcome = WarningSink::new().finish("ok");
        assert!(outcome.warnings.is_empty());
        assert!(outcome.warning_summary().is_none());
    }
}
