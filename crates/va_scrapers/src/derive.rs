//! Derives the study summary shown on the visual abstract from the parsed
//! abstract sections and the Key Points box.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use va_core::VisualAbstract;

use crate::scrapers::jama::sections::KeyPoints;
use crate::text::{clean, split_sentences, truncate_chars, SectionKind};

const MAX_KEY_NUMBERS: usize = 8;
const MAX_SETTINGS_CHARS: usize = 250;

static COMPARATOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bvs\.?\s+([^.;:]+)",
        r"(?i)\bversus\s+([^.;:]+)",
        r"(?i)\bcompared with\s+([^.;:]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid comparator pattern"))
    .collect()
});

static KEY_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bn\s*=\s*\d{2,4}\b",
        r"\b\d{1,3}(?:\.\d+)?\s?%",
        r"(?i)\bp\s*[<=>]\s*0?\.\d+",
        r"\b(?:OR|RR|HR)\s*[=,]\s*\d+(?:\.\d+)?\b",
        r"(?i)\b\d{2}%\s*CI\s*[,:]?\s*-?\d+(?:\.\d+)?\s*(?:to|[–-])\s*-?\d+(?:\.\d+)?",
        r"(?i)[-+]?\b\d+(?:\.\d+)?\s*(?:m|km|min|days|weeks)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid key number pattern"))
    .collect()
});

static LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\d+\s+(?:centers?|centres?|sites?|units?|hospitals?)|across the\s+[A-Za-z ,\-]+|(?-i:\bin\s+[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)?)|multicenter|multicentre|single[- ]cent(?:er|re))",
    )
    .expect("valid location pattern")
});

static PRIMARY_OUTCOME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(primary (?:outcome|endpoint)[^.;:]*[.;:]?)").expect("valid outcome pattern")
});

/// Builds the summary; `None` when the page offered nothing to summarise.
pub fn visual_abstract(
    sections: &IndexMap<String, String>,
    key_points: &KeyPoints,
) -> Option<VisualAbstract> {
    let by_kind = |kind: SectionKind| -> String {
        sections
            .iter()
            .find(|(label, _)| SectionKind::from_heading(label) == Some(kind))
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    };
    let or = |preferred: &Option<String>, fallback: String| -> String {
        preferred
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
    };

    let participants = by_kind(SectionKind::DesignSettingParticipants);
    let intervention = by_kind(SectionKind::Interventions);
    let outcomes = by_kind(SectionKind::MainOutcomes);
    let conclusions = {
        let c = by_kind(SectionKind::Conclusions);
        if c.is_empty() {
            by_kind(SectionKind::Meaning)
        } else {
            c
        }
    };

    let findings_summary = or(&key_points.findings, by_kind(SectionKind::Results));
    let summary = VisualAbstract {
        comparator: pull_comparator(&intervention)
            .or_else(|| pull_comparator(&participants))
            .unwrap_or_default(),
        settings_locations: pull_settings_locations(
            &by_kind(SectionKind::SettingsLocations),
            &participants,
        ),
        primary_outcome: pull_primary_outcome(
            &outcomes,
            &format!("{} {}", participants, intervention),
        ),
        key_numbers: pull_key_numbers(&findings_summary),
        before: or(&key_points.question, by_kind(SectionKind::Importance)),
        added_value: by_kind(SectionKind::Objective),
        implications: or(&key_points.meaning, conclusions),
        findings_summary,
        participants,
        intervention,
    };

    (summary != VisualAbstract::default()).then_some(summary)
}

pub fn pull_comparator(text: &str) -> Option<String> {
    let text = clean(text);
    COMPARATOR_PATTERNS.iter().find_map(|re| {
        re.captures(&text)
            .map(|caps| clean(&caps[1]))
            .filter(|c| !c.is_empty())
    })
}

/// An explicit settings section wins; otherwise the first participants
/// sentence that names a place or a site count.
pub fn pull_settings_locations(explicit: &str, participants: &str) -> String {
    let explicit = clean(explicit);
    if !explicit.is_empty() {
        return explicit;
    }
    split_sentences(participants)
        .into_iter()
        .find(|s| LOCATION.is_match(s))
        .map(|s| truncate_chars(&clean(s), MAX_SETTINGS_CHARS))
        .unwrap_or_default()
}

pub fn pull_primary_outcome(outcomes: &str, backup: &str) -> String {
    [outcomes, backup]
        .iter()
        .find_map(|text| {
            PRIMARY_OUTCOME
                .captures(&clean(text))
                .map(|caps| clean(&caps[1]))
        })
        .unwrap_or_else(|| clean(outcomes))
}

pub fn pull_key_numbers(text: &str) -> Vec<String> {
    let text = clean(text);
    let mut numbers: Vec<String> = Vec::new();
    for re in KEY_NUMBER_PATTERNS.iter() {
        for m in re.find_iter(&text) {
            let found = m.as_str().trim().to_string();
            if !numbers.contains(&found) {
                numbers.push(found);
            }
        }
    }
    numbers.truncate(MAX_KEY_NUMBERS);
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_comparator() {
        assert_eq!(
            pull_comparator("Exercise training vs. usual care; 12 weeks").as_deref(),
            Some("usual care")
        );
        assert_eq!(
            pull_comparator("Drug A compared with placebo.").as_deref(),
            Some("placebo")
        );
        assert_eq!(pull_comparator("Single-arm study."), None);
    }

    #[test]
    fn test_settings_from_participants() {
        let participants = "This randomized clinical trial enrolled adults. \
            It was conducted at 12 hospitals in Denmark. Follow-up lasted 1 year.";
        assert_eq!(
            pull_settings_locations("", participants),
            "It was conducted at 12 hospitals in Denmark."
        );
        assert_eq!(pull_settings_locations("Three sites in Ohio", participants), "Three sites in Ohio");
        assert_eq!(pull_settings_locations("", "adults were enrolled."), "");
    }

    #[test]
    fn test_primary_outcome() {
        assert_eq!(
            pull_primary_outcome(
                "The primary outcome was 6-minute walk distance; secondary outcomes included QoL.",
                ""
            ),
            "primary outcome was 6-minute walk distance;"
        );
        assert_eq!(pull_primary_outcome("Mortality at 30 days.", ""), "Mortality at 30 days.");
        assert_eq!(
            pull_primary_outcome("", "The primary end point... n/a"),
            ""
        );
    }

    #[test]
    fn test_key_numbers_unique_and_capped() {
        let numbers = pull_key_numbers(
            "Among 240 participants (n = 240), 45% improved vs 30% (P = .01; HR = 0.72). \
             Walk distance rose 35 m over 12 weeks; 45% again.",
        );
        assert_eq!(numbers[0], "n = 240");
        assert!(numbers.contains(&"45%".to_string()));
        assert!(numbers.contains(&"P = .01".to_string()));
        assert!(numbers.contains(&"HR = 0.72".to_string()));
        assert_eq!(numbers.iter().filter(|n| n.as_str() == "45%").count(), 1);
        assert!(numbers.len() <= MAX_KEY_NUMBERS);
    }

    #[test]
    fn test_visual_abstract_prefers_key_points() {
        let secs = sections(&[
            ("Importance", "Why it matters."),
            ("Objective", "To test X."),
            ("Design, Setting, and Participants", "Trial at 3 centers in Spain."),
            ("Interventions", "X vs placebo"),
            ("Results", "X helped."),
            ("Conclusions and Relevance", "Use X."),
        ]);
        let key_points = KeyPoints {
            items: vec![],
            question: Some("Does X help?".into()),
            findings: None,
            meaning: Some("X should be used.".into()),
        };
        let va = visual_abstract(&secs, &key_points).unwrap();
        assert_eq!(va.before, "Does X help?");
        assert_eq!(va.findings_summary, "X helped.");
        assert_eq!(va.implications, "X should be used.");
        assert_eq!(va.comparator, "placebo");
        assert_eq!(va.added_value, "To test X.");
        assert_eq!(va.settings_locations, "Trial at 3 centers in Spain.");
    }

    #[test]
    fn test_visual_abstract_empty() {
        assert!(visual_abstract(&IndexMap::new(), &KeyPoints::default()).is_none());
    }
}
