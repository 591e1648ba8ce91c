use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_OUTPUT_FILENAME: &str = "visual_abstract.pptx";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, alias = "abstractSections")]
    pub abstract_sections: IndexMap<String, String>,
    #[serde(default, alias = "keyPoints")]
    pub key_points: Vec<String>,
    #[serde(default, alias = "figureImageRef", skip_serializing_if = "Option::is_none")]
    pub figure_image_ref: Option<FigureRef>,
    #[serde(default, alias = "sourceUrl", alias = "url")]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
    #[serde(default, alias = "visualAbstract", skip_serializing_if = "Option::is_none")]
    pub visual_abstract: Option<VisualAbstract>,
    #[serde(default)]
    pub incomplete: bool,
    #[serde(default, alias = "missingFields", skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl ArticleRecord {
    pub fn new(title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            abstract_sections: IndexMap::new(),
            key_points: Vec::new(),
            figure_image_ref: None,
            source_url: source_url.into(),
            citation: None,
            visual_abstract: None,
            incomplete: false,
            missing_fields: Vec::new(),
        }
    }

    pub fn mark_missing(&mut self, field: &str) {
        self.incomplete = true;
        if !self.missing_fields.iter().any(|f| f == field) {
            self.missing_fields.push(field.to_string());
        }
    }
}

/// Where the primary figure comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FigureRef {
    Url { url: String },
    Inline { content_type: String, data: String },
}

impl FigureRef {
    pub fn inline(content_type: impl Into<String>, bytes: &[u8]) -> Self {
        FigureRef::Inline {
            content_type: content_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode_inline(data: &str) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| Error::Render(format!("Invalid inline figure data: {}", e)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl Citation {
    pub fn is_empty(&self) -> bool {
        self.journal.is_none() && self.date.is_none() && self.doi.is_none()
    }

    /// One-line rendering, e.g. `JAMA Netw Open. 2024-03-05. doi:10.1001/...`.
    pub fn line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(journal) = &self.journal {
            parts.push(journal.clone());
        }
        if let Some(date) = &self.date {
            parts.push(date.clone());
        }
        if let Some(doi) = &self.doi {
            parts.push(format!("doi:{}", doi));
        }
        parts.join(". ")
    }
}

/// Study summary derived from the abstract and the Key Points box.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualAbstract {
    #[serde(default)]
    pub participants: String,
    #[serde(default)]
    pub intervention: String,
    #[serde(default)]
    pub comparator: String,
    #[serde(default)]
    pub primary_outcome: String,
    #[serde(default)]
    pub settings_locations: String,
    #[serde(default)]
    pub findings_summary: String,
    #[serde(default)]
    pub key_numbers: Vec<String>,
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub added_value: String,
    #[serde(default)]
    pub implications: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishTarget {
    /// `owner/name` of the hosting repository.
    pub repository: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub record: ArticleRecord,
    pub output_filename: String,
    pub publish: Option<PublishTarget>,
}

impl RenderRequest {
    pub fn new(record: ArticleRecord) -> Self {
        Self {
            record,
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            publish: None,
        }
    }

    pub fn with_output_filename(mut self, filename: Option<String>) -> Self {
        if let Some(name) = filename.filter(|n| !n.trim().is_empty()) {
            self.output_filename = name.trim().to_string();
        }
        self
    }

    pub fn with_publish(mut self, target: Option<PublishTarget>) -> Self {
        self.publish = target;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}
