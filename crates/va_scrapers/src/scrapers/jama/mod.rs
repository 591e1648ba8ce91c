use async_trait::async_trait;
use scraper::Html;
use url::Url;

use va_core::logging::Logger;
use va_core::{ArticleRecord, Diagnosed, Error, Fetcher, Result, WarningKind, WarningSink};

use crate::derive;
use crate::lookup;
use crate::scrapers::Scraper;

pub mod metadata;
pub mod sections;

/// Extractor for JAMA Network article pages.
#[derive(Debug, Clone)]
pub struct JamaScraper {
    fetcher: Fetcher,
}

impl JamaScraper {
    const HOSTS: &'static [&'static str] = &["jamanetwork.com", "www.jamanetwork.com"];
    const PATH_PREFIX: &'static str = "/journals/";

    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Accepts only `https://jamanetwork.com/journals/...` article URLs.
    pub fn validate_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

        if parsed.scheme() != "https" {
            return Err(Error::InvalidUrl(format!("{}: only https URLs are supported", url)));
        }
        let host = parsed.host_str().unwrap_or_default();
        if !Self::HOSTS.contains(&host) {
            return Err(Error::InvalidUrl(format!(
                "{}: host {:?} is not a JAMA Network site",
                url, host
            )));
        }
        let article_path = parsed.path().strip_prefix(Self::PATH_PREFIX).unwrap_or_default();
        if article_path.trim_matches('/').is_empty() {
            return Err(Error::InvalidUrl(format!(
                "{}: expected an article under {}",
                url,
                Self::PATH_PREFIX
            )));
        }
        Ok(parsed)
    }

    /// Turns a fetched page into a record. Only a missing title is fatal.
    pub fn parse_document(html: &str, source_url: &str) -> Result<Diagnosed<ArticleRecord>> {
        let base = Url::parse(source_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", source_url, e)))?;
        let document = Html::parse_document(html);

        let title = lookup::title().resolve(&document).ok_or_else(|| {
            Error::Parse(format!("No title element found on {}", source_url))
        })?;

        let mut record = ArticleRecord::new(title.value, source_url);
        let mut warnings = WarningSink::new();

        record.abstract_sections = sections::parse_abstract(&document);
        if record.abstract_sections.is_empty() {
            record.mark_missing("abstract_sections");
            warnings.push(WarningKind::MissingField, "No abstract sections found");
        }

        let key_points = sections::parse_key_points(&document);
        record.key_points = key_points.items.clone();
        if record.key_points.is_empty() {
            record.mark_missing("key_points");
            warnings.push(WarningKind::MissingField, "No key points found");
        }

        record.figure_image_ref = metadata::figure_ref(&document, &base);
        if record.figure_image_ref.is_none() {
            record.mark_missing("figure_image_ref");
            warnings.push(WarningKind::MissingField, "No figure image found");
        }

        record.authors = metadata::authors(&document);
        if record.authors.is_empty() {
            warnings.push(WarningKind::MissingField, "No authors found");
        }

        record.citation = metadata::citation(&document);
        if record.citation.is_none() {
            warnings.push(WarningKind::MissingField, "No citation metadata found");
        }

        record.visual_abstract = derive::visual_abstract(&record.abstract_sections, &key_points);

        Ok(warnings.finish(record))
    }
}

#[async_trait]
impl Scraper for JamaScraper {
    fn source(&self) -> &str {
        "JAMA Network"
    }

    fn can_handle(&self, url: &str) -> bool {
        Self::validate_url(url).is_ok()
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["jama"]
    }

    async fn scrape_article(&self, url: &str) -> Result<Diagnosed<ArticleRecord>> {
        let parsed = Self::validate_url(url)?;
        let logger = Logger::new()
            .with_prefix("[jama]".to_string())
            .with_prefix(parsed.to_string());

        logger.info("Fetching article page");
        let html = match self.fetcher.get_text(parsed.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                logger.error(&format!("Fetch failed: {}", e));
                return Err(e);
            }
        };

        let outcome = Self::parse_document(&html, url.trim())?;
        logger.info(&format!(
            "Extracted \"{}\": {} sections, {} key points, {} warnings",
            outcome.value.title,
            outcome.value.abstract_sections.len(),
            outcome.value.key_points.len(),
            outcome.warnings.len()
        ));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use va_core::FigureRef;

    const ARTICLE_URL: &str =
        "https://jamanetwork.com/journals/jamanetworkopen/fullarticle/2815000";

    const FULL_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
  <meta name="citation_title" content="Meta Title">
  <meta name="citation_author" content="Jane Doe">
  <meta name="citation_author" content="John Roe">
  <meta name="citation_journal_title" content="JAMA Network Open">
  <meta name="citation_publication_date" content="2024/03/05">
  <meta name="citation_doi" content="10.1001/jamanetworkopen.2024.0001">
</head><body>
  <h1 class="meta-article-title">Effect of Pulmonary Rehabilitation on Walk Distance</h1>
  <div class="key-points-box">
    <h3>Key Points</h3>
    <p><strong>Question</strong> Does minimal-equipment rehabilitation work?</p>
    <p><strong>Findings</strong> In this trial of 120 adults, walk distance improved by 35 m.</p>
    <p><strong>Meaning</strong> Minimal equipment may suffice.</p>
  </div>
  <div id="abstract">
    <p><strong>Importance</strong> Access to rehabilitation is limited.</p>
    <p><strong>Objective</strong> To compare two programs.</p>
    <p><strong>Design, Setting, and Participants</strong> A trial at 8 sites in Australia. Adults were enrolled.</p>
    <p><strong>Interventions</strong> PR-min vs PR-gym.</p>
    <p><strong>Main Outcomes and Measures</strong> The primary outcome was 6-minute walk distance.</p>
    <p><strong>Results</strong> Of 120 participants, 45% were women.</p>
    <p><strong>Conclusions and Relevance</strong> PR-min was noninferior.</p>
  </div>
  <div class="figure-table-image"><img data-src="/data/Journals/JNO/f1.png"></div>
</body></html>"#;

    #[test]
    fn test_validate_url() {
        assert!(JamaScraper::validate_url(ARTICLE_URL).is_ok());
        assert!(JamaScraper::validate_url("https://www.jamanetwork.com/journals/jama/fullarticle/1").is_ok());
        for bad in [
            "http://jamanetwork.com/journals/jama/fullarticle/1",
            "https://example.com/journals/jama/fullarticle/1",
            "https://jamanetwork.com.evil.org/journals/jama/1",
            "https://jamanetwork.com/",
            "https://jamanetwork.com/journals/",
            "not a url",
        ] {
            let err = JamaScraper::validate_url(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(_)), "{} should be rejected", bad);
        }
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let scraper = JamaScraper::new(Fetcher::new(Duration::from_secs(60)).unwrap());
        let err = scraper
            .scrape_article("https://example.com/journals/jama/fullarticle/1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_full_page() {
        let outcome = JamaScraper::parse_document(FULL_PAGE, ARTICLE_URL).unwrap();
        let record = outcome.value;

        assert_eq!(record.title, "Effect of Pulmonary Rehabilitation on Walk Distance");
        assert_eq!(record.source_url, ARTICLE_URL);
        assert_eq!(record.authors, vec!["Jane Doe", "John Roe"]);
        let labels: Vec<_> = record.abstract_sections.keys().map(String::as_str).collect();
        assert_eq!(
            labels,
            vec![
                "Importance",
                "Objective",
                "Design, Setting, and Participants",
                "Interventions",
                "Main Outcomes and Measures",
                "Results",
                "Conclusions and Relevance"
            ]
        );
        assert_eq!(record.key_points.len(), 3);
        assert!(record.key_points.iter().all(|k| k == k.trim() && !k.is_empty()));
        assert_eq!(
            record.figure_image_ref,
            Some(FigureRef::Url {
                url: "https://jamanetwork.com/data/Journals/JNO/f1.png".to_string()
            })
        );
        let citation = record.citation.unwrap();
        assert_eq!(citation.date.as_deref(), Some("2024-03-05"));
        assert!(!record.incomplete);
        assert!(outcome.warnings.is_empty());

        let va = record.visual_abstract.unwrap();
        assert_eq!(va.comparator, "PR-gym");
        assert_eq!(va.settings_locations, "A trial at 8 sites in Australia.");
        assert_eq!(va.primary_outcome, "primary outcome was 6-minute walk distance.");
        assert!(va.key_numbers.contains(&"35 m".to_string()));
    }

    #[test]
    fn test_missing_title_is_fatal() {
        let err = JamaScraper::parse_document(
            r#"<html><body><div id="abstract"><p><strong>Results</strong> x</p></div></body></html>"#,
            ARTICLE_URL,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn test_missing_abstract_is_partial_success() {
        let outcome = JamaScraper::parse_document(
            "<html><body><h1>Only a Title</h1></body></html>",
            ARTICLE_URL,
        )
        .unwrap();
        let record = outcome.value;
        assert_eq!(record.title, "Only a Title");
        assert!(record.abstract_sections.is_empty());
        assert!(record.key_points.is_empty());
        assert!(record.incomplete);
        assert_eq!(
            record.missing_fields,
            vec!["abstract_sections", "key_points", "figure_image_ref"]
        );
        assert!(outcome
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::MissingField));
    }

    #[test]
    fn test_title_fallback_to_og_title() {
        let outcome = JamaScraper::parse_document(
            r#"<html><head><meta property="og:title" content="OG Title"></head><body></body></html>"#,
            ARTICLE_URL,
        )
        .unwrap();
        assert_eq!(outcome.value.title, "OG Title");
    }
}
