//! Sentence helpers shared by extraction and slide layout.

/// Splits after `.`, `!` or `?` when followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_terminal = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() && prev_terminal {
            let sentence = text[start..i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i;
        }
        prev_terminal = matches!(c, '.' | '!' | '?');
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

pub fn first_sentence(text: &str) -> String {
    split_sentences(text)
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Everything after the first sentence.
pub fn rest_sentences(text: &str) -> String {
    let text = text.trim();
    let first = first_sentence(text);
    if first.is_empty() {
        return String::new();
    }
    text[first.len()..].trim().to_string()
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
