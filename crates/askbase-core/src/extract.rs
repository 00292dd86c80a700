//! Extractive answer assembly and confidence gating.
//!
//! When the QA scorer produces no confident span, the answer is built
//! from verbatim source sentences instead: sentences from the top chunks
//! that share a word with the question, joined, whitespace-collapsed,
//! and truncated at a word boundary. A confident-but-short QA span is
//! not returned bare either — it seeds the same assembly so the user
//! gets surrounding context.

use crate::models::Chunk;

/// Minimum QA confidence for a span to be accepted at all.
pub const MIN_QA_CONFIDENCE: f32 = 0.15;

/// Accepted spans shorter than this (in chars) are enriched with
/// extracted sentences rather than returned verbatim.
pub const MIN_DIRECT_ANSWER_CHARS: usize = 40;

/// Upper bound on the assembled summary, cut at the last whole word.
pub const MAX_SUMMARY_CHARS: usize = 800;

/// Lowercase word tokens of the question, keeping only tokens longer
/// than two characters (drops articles and short particles).
pub fn question_tokens(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Split text into sentences.
///
/// A boundary is `.`, `!`, or `?` directly followed by whitespace; the
/// whitespace run is consumed. Trailing text without a final boundary is
/// returned as the last sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?')
            && iter.peek().is_some_and(|&(_, next)| next.is_whitespace())
        {
            let end = i + c.len_utf8();
            sentences.push(&text[start..end]);
            let mut next_start = end;
            while let Some(&(j, w)) = iter.peek() {
                if !w.is_whitespace() {
                    break;
                }
                next_start = j + w.len_utf8();
                iter.next();
            }
            start = next_start;
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Assemble an extractive answer from the top chunks.
///
/// Keeps sentences containing at least one question token
/// (case-insensitive substring match); with no matches, falls back to
/// the first two chunks' full text. The result is whitespace-collapsed,
/// truncated to `max_chars` at the last whole word, and prefixed with
/// either the seed span from the QA stage or the configured introductory
/// phrase.
pub fn build_answer(
    question: &str,
    top_chunks: &[&Chunk],
    seed: Option<&str>,
    intro: &str,
    max_chars: usize,
) -> String {
    let tokens = question_tokens(question);

    let mut selected: Vec<String> = Vec::new();
    for chunk in top_chunks {
        for sentence in split_sentences(&chunk.text) {
            let clean = sentence.trim();
            if clean.is_empty() {
                continue;
            }
            let lower = clean.to_lowercase();
            if tokens.iter().any(|t| lower.contains(t.as_str())) {
                selected.push(clean.to_string());
            }
        }
    }

    if selected.is_empty() {
        selected = top_chunks
            .iter()
            .take(2)
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    let joined = selected.join(" ");
    let summary: String = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    let summary = truncate_at_word(&summary, max_chars);

    let prefix = match seed {
        Some(s) if s.ends_with('.') => format!("{s}. "),
        Some(s) => format!("{s}: "),
        None => intro.to_string(),
    };
    format!("{prefix}{summary}")
}

/// Truncate to `max_chars` characters, cutting at the last space so no
/// word is split. Strings at or under the limit pass through unchanged.
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(pos) => cut[..pos].to_string(),
        None => cut,
    }
}

/// Titles of the chunks actually used, first-occurrence order, joined
/// by `", "`.
pub fn source_list(top_chunks: &[&Chunk]) -> String {
    let mut titles: Vec<&str> = Vec::new();
    for chunk in top_chunks {
        if !titles.contains(&chunk.title.as_str()) {
            titles.push(&chunk.title);
        }
    }
    titles.join(", ")
}
