//! Field lookup tables: each logical field has an ordered list of candidate
//! strategies, tried until one yields a non-empty value.

use scraper::{Html, Selector};

use crate::text::clean;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Text content of the first element matching the selector.
    Text(&'static str),
    /// An attribute of the first matching element that carries it.
    Attr(&'static str, &'static str),
    /// `<meta name="..." content="...">`
    MetaName(&'static str),
    /// `<meta property="..." content="...">`
    MetaProperty(&'static str),
}

impl Strategy {
    pub fn first(&self, document: &Html) -> Option<String> {
        self.all(document).into_iter().next()
    }

    /// Every non-empty value this strategy finds, in document order.
    pub fn all(&self, document: &Html) -> Vec<String> {
        let (selector, attr) = match self {
            Strategy::Text(sel) => (sel.to_string(), None),
            Strategy::Attr(sel, attr) => (sel.to_string(), Some(*attr)),
            Strategy::MetaName(name) => (format!("meta[name=\"{}\"]", name), Some("content")),
            Strategy::MetaProperty(prop) => {
                (format!("meta[property=\"{}\"]", prop), Some("content"))
            }
        };
        let selector = match Selector::parse(&selector) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::debug!("Skipping invalid selector {}: {:?}", selector, e);
                return Vec::new();
            }
        };

        document
            .select(&selector)
            .filter_map(|el| match attr {
                Some(attr) => el.value().attr(attr).map(clean),
                None => Some(clean(&el.text().collect::<String>())),
            })
            .filter(|v| !v.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FieldLookup {
    pub field: &'static str,
    pub candidates: Vec<Strategy>,
}

/// A resolved value and which candidate produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub strategy: Strategy,
}

impl FieldLookup {
    pub fn new(field: &'static str, candidates: Vec<Strategy>) -> Self {
        Self { field, candidates }
    }

    pub fn resolve(&self, document: &Html) -> Option<Resolved> {
        self.candidates.iter().find_map(|strategy| {
            strategy.first(document).map(|value| Resolved {
                value,
                strategy: strategy.clone(),
            })
        })
    }

    /// All values of the first candidate that yields any.
    pub fn resolve_all(&self, document: &Html) -> Vec<String> {
        self.candidates
            .iter()
            .map(|strategy| strategy.all(document))
            .find(|values| !values.is_empty())
            .unwrap_or_default()
    }
}

pub fn title() -> FieldLookup {
    FieldLookup::new(
        "title",
        vec![
            Strategy::Text("h1.meta-article-title"),
            Strategy::Text("h1"),
            Strategy::MetaProperty("og:title"),
            Strategy::MetaName("citation_title"),
        ],
    )
}

pub fn figure_image() -> FieldLookup {
    FieldLookup::new(
        "figure_image_ref",
        vec![
            Strategy::Attr(".figure-table-image img", "data-src"),
            Strategy::Attr(".figure-table-image img", "src"),
            Strategy::Attr("figure img", "data-src"),
            Strategy::Attr("figure img", "src"),
            Strategy::MetaProperty("og:image"),
        ],
    )
}

pub fn authors() -> FieldLookup {
    FieldLookup::new(
        "authors",
        vec![
            Strategy::MetaName("citation_author"),
            Strategy::MetaName("dc.creator"),
        ],
    )
}

pub fn journal() -> FieldLookup {
    FieldLookup::new(
        "journal",
        vec![
            Strategy::MetaName("citation_journal_title"),
            Strategy::MetaName("citation_journal_abbrev"),
            Strategy::MetaProperty("og:site_name"),
        ],
    )
}

pub fn publication_date() -> FieldLookup {
    FieldLookup::new(
        "date",
        vec![
            Strategy::MetaName("citation_publication_date"),
            Strategy::MetaName("citation_online_date"),
            Strategy::MetaName("citation_date"),
            Strategy::MetaName("dc.date"),
        ],
    )
}

pub fn doi() -> FieldLookup {
    FieldLookup::new(
        "doi",
        vec![
            Strategy::MetaName("citation_doi"),
            Strategy::MetaName("dc.identifier"),
        ],
    )
}

pub fn abstract_meta() -> FieldLookup {
    FieldLookup::new("abstract", vec![Strategy::MetaName("citation_abstract")])
}
