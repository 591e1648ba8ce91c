//! Maps an article record onto the text regions of a template.

use std::collections::BTreeMap;

use va_core::text::{first_sentence, split_sentences};
use va_core::{ArticleRecord, VisualAbstract, WarningKind, WarningSink};

use crate::slide::TextBlock;
use crate::template::Template;

pub const TITLE_PT: u32 = 22;
pub const SUBTITLE_PT: u32 = 16;
pub const BODY_PT: u32 = 14;
pub const SMALL_BODY_PT: u32 = 12;
pub const FOOTER_PT: u32 = 10;

/// Bodies longer than this many characters are set at [`SMALL_BODY_PT`].
pub const SHRINK_THRESHOLD: usize = 700;

pub mod regions {
    pub const TITLE: &str = "title";
    pub const KEY_POINTS: &str = "key_points";
    pub const FIGURE: &str = "figure";
    pub const FOOTER_CITATION: &str = "footer_citation";

    pub const POPULATION_SUBTITLE: &str = "population_subtitle";
    pub const POPULATION_DESCRIPTION: &str = "population_description";
    pub const INTERVENTION_SUBTITLE: &str = "intervention_subtitle";
    pub const INTERVENTION_DESCRIPTION: &str = "intervention_description";
    pub const SETTINGS_LOCATIONS_DESCRIPTION: &str = "settings_locations_description";
    pub const PRIMARY_OUTCOME_DESCRIPTION: &str = "primary_outcome_description";
    pub const FINDINGS_DESCRIPTION_1: &str = "findings_description_1";
    pub const FINDINGS_DESCRIPTION_2: &str = "findings_description_2";

    pub fn section_heading(n: usize) -> String {
        format!("section_{}_heading", n)
    }

    pub fn section_body(n: usize) -> String {
        format!("section_{}_body", n)
    }
}

fn body_size(text: &str) -> u32 {
    if text.chars().count() > SHRINK_THRESHOLD {
        SMALL_BODY_PT
    } else {
        BODY_PT
    }
}

/// Builds the text for every region the template has. Regions the record has
/// nothing for are cleared so no template prompt text survives.
pub fn plan_text(
    record: &ArticleRecord,
    template: &Template,
    sink: &mut WarningSink,
) -> BTreeMap<String, TextBlock> {
    let mut texts = BTreeMap::new();
    let mut put = |region: &str, block: TextBlock| {
        if template.has_region(region) {
            texts.insert(region.to_string(), block);
        }
    };

    put(regions::TITLE, TextBlock::plain(record.title.trim(), TITLE_PT));

    let capacity = template.section_capacity();
    let mut dropped = Vec::new();
    for (i, (label, text)) in record.abstract_sections.iter().enumerate() {
        if i >= capacity {
            dropped.push(label.as_str());
            continue;
        }
        put(&regions::section_heading(i + 1), TextBlock::plain(label, SUBTITLE_PT));
        put(&regions::section_body(i + 1), TextBlock::plain(text, body_size(text)));
    }
    for n in record.abstract_sections.len() + 1..=capacity {
        put(&regions::section_heading(n), TextBlock::cleared());
        put(&regions::section_body(n), TextBlock::cleared());
    }

    if record.key_points.is_empty() {
        put(regions::KEY_POINTS, TextBlock::cleared());
    } else {
        put(regions::KEY_POINTS, TextBlock::bulleted(&record.key_points, BODY_PT));
    }

    let mut footer = Vec::new();
    if let Some(citation) = record.citation.as_ref().filter(|c| !c.is_empty()) {
        footer.push(citation.line());
    }
    if !record.source_url.trim().is_empty() {
        footer.push(record.source_url.trim().to_string());
    }
    put(regions::FOOTER_CITATION, TextBlock::plain(&footer.join("\n"), FOOTER_PT));

    let summary = record.visual_abstract.clone().unwrap_or_default();
    for (region, block) in visual_abstract_blocks(&summary) {
        put(region, block);
    }

    if !dropped.is_empty() {
        sink.push(
            WarningKind::SectionsTruncated,
            format!(
                "Template has room for {} abstract section(s); dropped {}: {}",
                capacity,
                dropped.len(),
                dropped.join(", ")
            ),
        );
    }
    if !record.key_points.is_empty() && !template.has_region(regions::KEY_POINTS) {
        sink.push(
            WarningKind::MissingRegion,
            format!(
                "Template has no '{}' region; {} key point(s) not placed",
                regions::KEY_POINTS,
                record.key_points.len()
            ),
        );
    }

    texts
}

fn visual_abstract_blocks(summary: &VisualAbstract) -> Vec<(&'static str, TextBlock)> {
    let text_or_clear = |text: &str, size: u32| {
        if text.trim().is_empty() {
            TextBlock::cleared()
        } else {
            TextBlock::plain(text, size)
        }
    };

    let intervention_subtitle = match (summary.intervention.trim(), summary.comparator.trim()) {
        ("", _) => String::new(),
        (_, "") => "Intervention".to_string(),
        (_, comparator) => format!("Intervention vs {}", comparator),
    };

    let findings = split_sentences(&summary.findings_summary);
    let mut findings_rest: Vec<String> = findings.iter().skip(1).map(|s| s.to_string()).collect();
    if findings_rest.is_empty() {
        findings_rest = summary.key_numbers.clone();
    }
    let findings_rest_block = if findings_rest.is_empty() {
        TextBlock::cleared()
    } else {
        TextBlock::bulleted(&findings_rest, BODY_PT)
    };

    vec![
        (
            regions::POPULATION_SUBTITLE,
            text_or_clear(&first_sentence(&summary.participants), SUBTITLE_PT),
        ),
        (
            regions::POPULATION_DESCRIPTION,
            text_or_clear(&summary.participants, body_size(&summary.participants)),
        ),
        (
            regions::INTERVENTION_SUBTITLE,
            text_or_clear(&intervention_subtitle, SUBTITLE_PT),
        ),
        (
            regions::INTERVENTION_DESCRIPTION,
            text_or_clear(&summary.intervention, body_size(&summary.intervention)),
        ),
        (
            regions::SETTINGS_LOCATIONS_DESCRIPTION,
            text_or_clear(&summary.settings_locations, BODY_PT),
        ),
        (
            regions::PRIMARY_OUTCOME_DESCRIPTION,
            text_or_clear(&summary.primary_outcome, body_size(&summary.primary_outcome)),
        ),
        (
            regions::FINDINGS_DESCRIPTION_1,
            text_or_clear(&first_sentence(&summary.findings_summary), BODY_PT),
        ),
        (regions::FINDINGS_DESCRIPTION_2, findings_rest_block),
    ]
}
