//! Abstract sections and the Key Points box.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::lookup;
use crate::text::{clean, clean_label, strip_label, SectionKind};

const ABSTRACT_CONTAINERS: &[&str] = &["#abstract", ".abstract-content", ".abstract"];
const KEY_POINT_CONTAINERS: &[&str] = &[".key-points", "#keypoints", ".keypoints"];
const UNLABELLED_SECTION: &str = "Abstract";

static BLOCKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, p").expect("valid block selector"));
static INLINE_HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("strong, b").expect("valid inline heading selector"));
static HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4").expect("valid heading selector"));
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid selector"));
static ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, li").expect("valid selector"));
static LABELLED_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(question|findings|meaning)\s*[.:]?\s+(.+)$").expect("valid regex")
});

fn element_text(el: ElementRef) -> String {
    clean(&el.text().collect::<String>())
}

/// Abstract sections in page order. The DOM container wins; the HTML held in
/// `meta[name=citation_abstract]` is the fallback.
pub fn parse_abstract(document: &Html) -> IndexMap<String, String> {
    let from_dom = ABSTRACT_CONTAINERS
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .find_map(|sel| document.select(&sel).next())
        .map(parse_section_blocks)
        .unwrap_or_default();
    if !from_dom.is_empty() {
        return from_dom;
    }

    match lookup::abstract_meta().resolve(document) {
        Some(resolved) => {
            let fragment = Html::parse_fragment(&resolved.value);
            parse_section_blocks(fragment.root_element())
        }
        None => IndexMap::new(),
    }
}

/// Pairs headings with their text. Handles both `<p><strong>Label</strong> text</p>`
/// and `<h3>Label</h3><p>text</p>`.
fn parse_section_blocks(container: ElementRef) -> IndexMap<String, String> {
    let mut sections: IndexMap<String, String> = IndexMap::new();
    let mut pending: Option<String> = None;
    let mut last: Option<String> = None;

    for el in container.select(&BLOCKS) {
        let text = element_text(el);
        if text.is_empty() {
            continue;
        }

        if el.value().name() != "p" {
            pending = Some(clean_label(&text));
            continue;
        }

        // Once a section is open, only recognised headings start a new one.
        let inline = inline_label(el, &text)
            .filter(|label| last.is_none() || SectionKind::from_heading(label).is_some());

        let (label, body) = if let Some(label) = inline {
            let body = strip_label(&text, &label).to_string();
            if body.is_empty() {
                pending = Some(label);
                continue;
            }
            pending = None;
            (label, body)
        } else if let Some(label) = pending.take() {
            (label, text)
        } else if let Some(label) = last.clone() {
            // continuation paragraph of the previous section
            if let Some(existing) = sections.get_mut(&label) {
                existing.push(' ');
                existing.push_str(&text);
            }
            continue;
        } else {
            (UNLABELLED_SECTION.to_string(), text)
        };

        if label.is_empty() || body.is_empty() {
            continue;
        }
        sections.entry(label.clone()).or_insert(body);
        last = Some(label);
    }

    sections
}

fn inline_label(paragraph: ElementRef, text: &str) -> Option<String> {
    let strong = paragraph.select(&INLINE_HEADING).next()?;
    let label = clean_label(&element_text(strong));
    if label.is_empty() || strip_label(text, &label).len() == text.len() {
        return None;
    }
    Some(label)
}

/// The Key Points box: every point in order, plus the labelled ones by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPoints {
    pub items: Vec<String>,
    pub question: Option<String>,
    pub findings: Option<String>,
    pub meaning: Option<String>,
}

pub fn parse_key_points(document: &Html) -> KeyPoints {
    let raw = key_points_under_heading(document)
        .or_else(|| key_points_in_container(document))
        .unwrap_or_default();

    let mut points = KeyPoints::default();
    for text in raw {
        match LABELLED_POINT.captures(&text) {
            Some(caps) => {
                let label = caps[1].to_lowercase();
                let body = caps[2].trim().to_string();
                let slot = match label.as_str() {
                    "question" => &mut points.question,
                    "findings" => &mut points.findings,
                    _ => &mut points.meaning,
                };
                if slot.is_none() {
                    *slot = Some(body.clone());
                }
                points.items.push(format!("{}: {}", capitalize(&label), body));
            }
            None => points.items.push(text),
        }
    }
    points
}

fn key_points_under_heading(document: &Html) -> Option<Vec<String>> {
    let heading = document
        .select(&HEADINGS)
        .find(|h| element_text(*h).eq_ignore_ascii_case("key points"))?;
    let container = heading.parent().and_then(ElementRef::wrap)?;
    let items = non_empty_texts(container, &PARAGRAPHS);
    (!items.is_empty()).then_some(items)
}

fn key_points_in_container(document: &Html) -> Option<Vec<String>> {
    KEY_POINT_CONTAINERS
        .iter()
        .filter_map(|sel| Selector::parse(sel).ok())
        .filter_map(|sel| document.select(&sel).next())
        .map(|container| non_empty_texts(container, &ITEMS))
        .find(|items| !items.is_empty())
}

fn non_empty_texts(container: ElementRef, selector: &Selector) -> Vec<String> {
    container
        .select(selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_strong_sections_keep_page_order() {
        let doc = Html::parse_document(
            r#"<div id="abstract">
                <p><strong>Importance</strong> Falls are common.</p>
                <p><strong>Objective:</strong> To test X.</p>
                <p><strong>Results</strong>   Of 120   patients, 60 improved.</p>
                <p><strong>Conclusions and Relevance</strong> X works.</p>
               </div>"#,
        );
        let sections = parse_abstract(&doc);
        let labels: Vec<_> = sections.keys().map(String::as_str).collect();
        assert_eq!(
            labels,
            vec!["Importance", "Objective", "Results", "Conclusions and Relevance"]
        );
        assert_eq!(sections["Objective"], "To test X.");
        assert_eq!(sections["Results"], "Of 120 patients, 60 improved.");
    }

    #[test]
    fn test_label_only_paragraph_heads_the_next_one() {
        let doc = Html::parse_document(
            r#"<div id="abstract">
                <p><strong>Objective</strong> To test X.</p>
                <p><strong>Results</strong></p>
                <p>Of 120 patients, 60 improved.</p>
               </div>"#,
        );
        let sections = parse_abstract(&doc);
        let labels: Vec<_> = sections.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["Objective", "Results"]);
        assert_eq!(sections["Objective"], "To test X.");
        assert_eq!(sections["Results"], "Of 120 patients, 60 improved.");
    }

    #[test]
    fn test_unknown_bold_lead_continues_open_section() {
        let doc = Html::parse_document(
            r#"<div id="abstract">
                <p><strong>Results</strong> Of 120 patients, 60 improved.</p>
                <p><b>Mortality</b> fell by 5%.</p>
                <p><strong>Conclusions</strong> X works.</p>
               </div>"#,
        );
        let sections = parse_abstract(&doc);
        let labels: Vec<_> = sections.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["Results", "Conclusions"]);
        assert_eq!(
            sections["Results"],
            "Of 120 patients, 60 improved. Mortality fell by 5%."
        );
    }

    #[test]
    fn test_inline_markup_keeps_words_joined() {
        let doc = Html::parse_document(
            r#"<div id="abstract"><p><strong>Objective</strong> To test <i>BRCA1</i>-targeted therapy.</p></div>"#,
        );
        assert_eq!(parse_abstract(&doc)["Objective"], "To test BRCA1-targeted therapy.");
    }

    #[test]
    fn test_heading_followed_by_paragraph() {
        let doc = Html::parse_document(
            r#"<section class="abstract">
                <h2>Abstract</h2>
                <h3>Importance</h3><p>Why it matters.</p>
                <h3>Results</h3><p>It worked.</p><p>Also this.</p>
               </section>"#,
        );
        let sections = parse_abstract(&doc);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections["Importance"], "Why it matters.");
        assert_eq!(sections["Results"], "It worked. Also this.");
    }

    #[test]
    fn test_meta_fallback() {
        let doc = Html::parse_document(
            r#"<head><meta name="citation_abstract"
                content="&lt;h3&gt;Objective&lt;/h3&gt;&lt;p&gt;To assess Y.&lt;/p&gt;&lt;h3&gt;Results&lt;/h3&gt;&lt;p&gt;Y held.&lt;/p&gt;">
               </head><body><h1>T</h1></body>"#,
        );
        let sections = parse_abstract(&doc);
        let labels: Vec<_> = sections.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["Objective", "Results"]);
        assert_eq!(sections["Results"], "Y held.");
    }

    #[test]
    fn test_missing_abstract_is_empty() {
        let doc = Html::parse_document("<body><h1>Title</h1><p>Body text</p></body>");
        assert!(parse_abstract(&doc).is_empty());
    }

    #[test]
    fn test_unstructured_abstract() {
        let doc = Html::parse_document(
            r#"<div id="abstract"><p>A single paragraph abstract.</p></div>"#,
        );
        let sections = parse_abstract(&doc);
        assert_eq!(sections[UNLABELLED_SECTION], "A single paragraph abstract.");
    }

    #[test]
    fn test_key_points_box() {
        let doc = Html::parse_document(
            r#"<div class="box">
                <h3>Key Points</h3>
                <p><strong>Question</strong> Does X reduce Y?</p>
                <p>   </p>
                <p><strong>Findings</strong>  In this trial,   X reduced Y. </p>
                <p><strong>Meaning</strong> X should be considered.</p>
               </div>"#,
        );
        let points = parse_key_points(&doc);
        assert_eq!(
            points.items,
            vec![
                "Question: Does X reduce Y?",
                "Findings: In this trial, X reduced Y.",
                "Meaning: X should be considered."
            ]
        );
        assert_eq!(points.findings.as_deref(), Some("In this trial, X reduced Y."));
    }

    #[test]
    fn test_key_points_container_fallback() {
        let doc = Html::parse_document(
            r#"<ul class="key-points"><li> Finding A </li><li></li><li>Finding B</li></ul>"#,
        );
        let points = parse_key_points(&doc);
        assert_eq!(points.items, vec!["Finding A", "Finding B"]);
        assert!(points.question.is_none());
    }
}
