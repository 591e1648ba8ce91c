use scraper::{Html, Selector};
use serde_json::Value;

use crate::text::clean;

/// Extracts authors from JSON-LD metadata in the HTML document.
/// Returns a vector of author names.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();

    if let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&script_selector) {
            if let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) {
                collect_from_value(&json, &mut authors);
            }
        }
    }

    authors.dedup();
    authors
}

fn collect_from_value(json: &Value, authors: &mut Vec<String>) {
    match json {
        // Some publishers wrap their entities in a top-level array or @graph
        Value::Array(items) => {
            for item in items {
                collect_from_value(item, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                collect_from_value(graph, authors);
            }
            if let Some(author) = obj.get("author") {
                push_author(author, authors);
            }
        }
        _ => {}
    }
}

fn push_author(author: &Value, authors: &mut Vec<String>) {
    match author {
        Value::Array(arr) => {
            for author_obj in arr {
                push_author(author_obj, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                push_name(name, authors);
            }
        }
        Value::String(s) => push_name(s, authors),
        _ => {}
    }
}

fn push_name(name: &str, authors: &mut Vec<String>) {
    let name = clean(name);
    if !name.is_empty() {
        authors.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_array() {
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">
                {"@type": "ScholarlyArticle",
                 "author": [{"name": " Jane Doe "}, {"name": "John Roe"}]}
               </script>"#,
        );
        assert_eq!(extract_authors(&doc), vec!["Jane Doe", "John Roe"]);
    }

    #[test]
    fn test_graph_and_string_author() {
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">
                {"@graph": [{"@type": "WebPage"}, {"author": "JAMA Network"}]}
               </script>"#,
        );
        assert_eq!(extract_authors(&doc), vec!["JAMA Network"]);
    }

    #[test]
    fn test_invalid_json_is_ignored() {
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">{ not json</script>"#,
        );
        assert!(extract_authors(&doc).is_empty());
    }
}
