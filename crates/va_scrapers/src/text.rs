//! Text normalisation shared by every field extractor.

use unicode_normalization::UnicodeNormalization;

pub use va_core::text::{first_sentence, rest_sentences, split_sentences, truncate_chars};

/// NFKC-normalises, maps U+2212 to an ASCII hyphen and collapses whitespace.
pub fn clean(s: &str) -> String {
    let normalized: String = s.nfkc().collect();
    normalized
        .replace('\u{2212}', "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleans a heading into a section label: `"Results:"` → `"Results"`.
pub fn clean_label(s: &str) -> String {
    clean(s)
        .trim_end_matches(|c: char| c == ':' || c == '.' || c.is_whitespace())
        .to_string()
}

/// Removes `label` (and a following `:`/`.`) from the start of `text`, ignoring ASCII case.
pub fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    let head = match text.get(..label.len()) {
        Some(head) if !label.is_empty() && head.eq_ignore_ascii_case(label) => head,
        _ => return text,
    };
    text[head.len()..]
        .trim_start_matches(|c: char| c == ':' || c == '.' || c.is_whitespace())
}

/// Canonical abstract section kinds, independent of the wording a journal uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Importance,
    Objective,
    DesignSettingParticipants,
    Interventions,
    MainOutcomes,
    Results,
    Conclusions,
    Meaning,
    TrialRegistration,
    SettingsLocations,
}

impl SectionKind {
    pub fn from_heading(heading: &str) -> Option<Self> {
        let key = clean_label(heading).to_lowercase();
        let kind = match key.as_str() {
            "importance" => SectionKind::Importance,
            "objective" | "objectives" => SectionKind::Objective,
            "design, setting, and participants"
            | "design, settings, and participants"
            | "design and participants"
            | "participants" => SectionKind::DesignSettingParticipants,
            "intervention" | "interventions" | "exposure" | "exposures" => {
                SectionKind::Interventions
            }
            "main outcomes and measures" | "main outcome and measures" | "outcomes" => {
                SectionKind::MainOutcomes
            }
            "results" => SectionKind::Results,
            "conclusions and relevance" | "conclusions" => SectionKind::Conclusions,
            "meaning" => SectionKind::Meaning,
            "trial registration" => SectionKind::TrialRegistration,
            "setting"
            | "settings"
            | "location"
            | "locations"
            | "settings/locations"
            | "setting/locations"
            | "setting and locations"
            | "settings and locations"
            | "study setting" => SectionKind::SettingsLocations,
            _ => return None,
        };
        Some(kind)
    }
}
