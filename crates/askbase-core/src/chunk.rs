//! Paragraph-boundary text chunker with overlapping windows.
//!
//! Splits document content into [`Chunk`]s of at most `chunk_chars`
//! characters. Splitting occurs on newline boundaries first to preserve
//! semantic coherence; paragraphs longer than the limit are sliced into
//! consecutive windows that overlap by `chunk_overlap` characters.
//!
//! # Algorithm
//!
//! 1. Split each document's content on newlines into trimmed, non-empty
//!    paragraphs, processed in original order.
//! 2. A paragraph of at most `chunk_chars` characters becomes one chunk.
//! 3. A longer paragraph is sliced into windows of `chunk_chars`
//!    characters; each next window starts `chunk_overlap` characters
//!    before the previous window's end, clamped so the start always
//!    advances. Slicing stops when a window reaches the paragraph's end.
//! 4. Chunk ids increase monotonically across the whole corpus.
//!
//! Lengths are measured in characters, and window boundaries always land
//! on UTF-8 char boundaries, so multi-byte text never splits mid-char.

use crate::models::{Chunk, Document};

/// Split an ordered sequence of documents into an ordered sequence of
/// chunks.
///
/// # Guarantees
///
/// - No chunk exceeds `chunk_chars` characters.
/// - Every paragraph is covered by at least one chunk.
/// - Chunk ids are dense and contiguous: `0, 1, 2, …, N-1`.
/// - Terminates for every input, including `chunk_overlap >= chunk_chars`
///   (window starts are forced to advance by at least one character).
pub fn chunk_documents(
    documents: &[Document],
    chunk_chars: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let chunk_chars = chunk_chars.max(1);
    let mut chunks = Vec::new();

    for doc in documents {
        for para in doc.content.lines().map(str::trim).filter(|p| !p.is_empty()) {
            chunk_paragraph(&mut chunks, &doc.title, para, chunk_chars, chunk_overlap);
        }
    }

    chunks
}

/// Slice one paragraph into chunks, appending to `out`.
fn chunk_paragraph(
    out: &mut Vec<Chunk>,
    title: &str,
    para: &str,
    chunk_chars: usize,
    chunk_overlap: usize,
) {
    let total_chars = para.chars().count();
    if total_chars <= chunk_chars {
        push_chunk(out, title, para);
        return;
    }

    // Byte offset of every char position, plus one-past-the-end, so
    // windows expressed in char positions slice at valid boundaries.
    let offsets: Vec<usize> = para
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(para.len()))
        .collect();

    let mut start = 0usize;
    loop {
        let end = (start + chunk_chars).min(total_chars);
        push_chunk(out, title, &para[offsets[start]..offsets[end]]);
        if end == total_chars {
            break;
        }
        // Next window backs up by the overlap but must always advance.
        start = end.saturating_sub(chunk_overlap).max(start + 1);
    }
}

fn push_chunk(out: &mut Vec<Chunk>, title: &str, text: &str) {
    out.push(Chunk {
        id: out.len() as u64,
        title: title.to_string(),
        text: text.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, content: &str) -> Document {
        Document {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_short_paragraph_single_chunk() {
        let docs = vec![doc("a.txt", "Hello, world!")];
        let chunks = chunk_documents(&docs, 700, 80);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[0].title, "a.txt");
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let docs = vec![doc("a.txt", "First.\n\n   \nSecond.\n")];
        let chunks = chunk_documents(&docs, 700, 80);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["First.", "Second."]);
    }

    #[test]
    fn test_ids_contiguous_across_documents() {
        let docs = vec![doc("a.txt", "One.\nTwo."), doc("b.txt", "Three.")];
        let chunks = chunk_documents(&docs, 700, 80);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.id, i as u64);
        }
        assert_eq!(chunks[2].title, "b.txt");
    }

    #[test]
    fn test_long_paragraph_windows_respect_limit() {
        let para = "x".repeat(250);
        let docs = vec![doc("a.txt", &para)];
        let chunks = chunk_documents(&docs, 100, 20);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 100);
        }
    }

    #[test]
    fn test_windows_overlap_and_cover() {
        // Verify window starts step by chunk_chars - overlap and the
        // tail window stops at the paragraph end.
        let para: String = (0u8..25).map(|i| char::from(b'a' + i)).collect();
        let docs = vec![doc("a.txt", &para)];
        let chunks = chunk_documents(&docs, 10, 4);
        assert_eq!(chunks[0].text, &para[0..10]);
        assert_eq!(chunks[1].text, &para[6..16]);
        assert_eq!(chunks[2].text, &para[12..22]);
        assert_eq!(chunks[3].text, &para[18..25]);
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_paragraph_coverage() {
        let words: Vec<String> = (0..150).map(|i| format!("w{i}")).collect();
        let para = words.join(" ");
        let docs = vec![doc("a.txt", &para)];
        let chunks = chunk_documents(&docs, 120, 30);

        // Every chunk is exactly the expected window, so together they
        // cover the whole paragraph (ASCII, so bytes == chars here).
        let mut start = 0usize;
        let mut idx = 0usize;
        loop {
            let end = (start + 120).min(para.len());
            assert_eq!(chunks[idx].text, para[start..end]);
            if end == para.len() {
                break;
            }
            start = end - 30;
            idx += 1;
        }
        assert_eq!(idx + 1, chunks.len());
    }

    #[test]
    fn test_overlap_equal_to_chunk_chars_terminates() {
        // Regression guard: the naive next-start computation
        // (end - overlap) would never advance here.
        let para = "y".repeat(40);
        let docs = vec![doc("a.txt", &para)];
        let chunks = chunk_documents(&docs, 10, 10);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 40);
        // Window starts strictly increase: each chunk begins one char
        // later than the previous, so every text has the full width
        // until the tail shrinks.
        for c in &chunks {
            assert!(c.text.chars().count() <= 10);
        }
        assert!(chunks.last().unwrap().text.ends_with('y'));
    }

    #[test]
    fn test_overlap_larger_than_chunk_chars_terminates() {
        let para = "z".repeat(30);
        let docs = vec![doc("a.txt", &para)];
        let chunks = chunk_documents(&docs, 5, 50);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 30);
    }

    #[test]
    fn test_multibyte_windows_do_not_split_chars() {
        let para = "ação e hipertensão — ".repeat(20);
        let docs = vec![doc("a.txt", para.trim())];
        let chunks = chunk_documents(&docs, 15, 5);
        for c in &chunks {
            assert!(c.text.chars().count() <= 15);
            // Slicing at a non-boundary would have panicked above; also
            // make sure nothing was lost at the edges.
            assert!(!c.text.is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let docs = vec![doc("a.txt", "Alpha beta gamma delta.\nEpsilon zeta.")];
        let c1 = chunk_documents(&docs, 12, 4);
        let c2 = chunk_documents(&docs, 12, 4);
        assert_eq!(c1, c2);
    }
}
