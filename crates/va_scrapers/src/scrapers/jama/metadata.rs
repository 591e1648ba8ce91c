use chrono::NaiveDate;
use scraper::Html;
use url::Url;

use va_core::{Citation, FigureRef};

use crate::lookup;
use crate::scrapers::jsonld;

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%B %d, %Y", "%d %B %Y", "%b %d, %Y"];
const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// The primary figure, resolved against the page URL.
pub fn figure_ref(document: &Html, base: &Url) -> Option<FigureRef> {
    let resolved = lookup::figure_image().resolve(document)?;
    let value = resolved.value;

    if let Some(data_uri) = value.strip_prefix("data:") {
        let (meta, data) = data_uri.split_once(',')?;
        let content_type = meta.strip_suffix(";base64")?;
        return Some(FigureRef::Inline {
            content_type: content_type.to_string(),
            data: data.to_string(),
        });
    }

    match base.join(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(FigureRef::Url {
            url: url.to_string(),
        }),
        Ok(url) => {
            tracing::debug!("Ignoring figure with unsupported scheme: {}", url);
            None
        }
        Err(e) => {
            tracing::debug!("Ignoring unresolvable figure reference {}: {}", value, e);
            None
        }
    }
}

pub fn authors(document: &Html) -> Vec<String> {
    let mut authors = lookup::authors().resolve_all(document);
    if authors.is_empty() {
        authors = jsonld::extract_authors(document);
    }

    let mut seen = std::collections::HashSet::new();
    authors.retain(|a| seen.insert(a.clone()));
    authors
}

pub fn citation(document: &Html) -> Option<Citation> {
    let citation = Citation {
        journal: lookup::journal().resolve(document).map(|r| r.value),
        date: lookup::publication_date()
            .resolve(document)
            .map(|r| normalize_date(&r.value)),
        doi: lookup::doi()
            .candidates
            .iter()
            .flat_map(|s| s.all(document))
            .find_map(|raw| normalize_doi(&raw)),
    };
    (!citation.is_empty()).then_some(citation)
}

/// ISO-formats the date when it parses, otherwise keeps it verbatim.
pub fn normalize_date(raw: &str) -> String {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

pub fn normalize_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim();
    for prefix in DOI_PREFIXES {
        if doi.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
            doi = doi[prefix.len()..].trim();
            break;
        }
    }
    doi.starts_with("10.").then(|| doi.to_string())
}
