//! Chunker
//!
//! Splits log content into ordered, bounded chunks. Sizes are counted in
//! characters, never bytes, so multi-byte content is never cut mid-char.
//! Splitting is deterministic: the same content and size always produce the
//! same boundaries.

use std::ops::Range;

use anr_analyzer_core::{AnalysisError, AnalysisResult};

/// Fraction of the chunk size searched backwards for a line break.
const LINE_BREAK_WINDOW_DIVISOR: usize = 10;

/// Read-only view of one slice of the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// 0-based ordinal
    pub index: usize,
    pub total: usize,
    pub text: &'a str,
}

impl Chunk<'_> {
    /// 1-based ordinal, as shown to users.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Trim and normalize line endings to `\n`.
pub fn preprocess(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// Split `content` into chunks of at most `chunk_size` characters.
///
/// Content at or below the size is returned whole. Otherwise each cut
/// prefers the last newline within the final tenth of the window and falls
/// back to an exact cut.
pub fn split(content: &str, chunk_size: usize) -> AnalysisResult<Vec<Chunk<'_>>> {
    let ranges = split_ranges(content, chunk_size)?;
    let total = ranges.len();
    Ok(ranges
        .into_iter()
        .enumerate()
        .map(|(index, range)| Chunk {
            index,
            total,
            text: &content[range],
        })
        .collect())
}

fn split_ranges(content: &str, chunk_size: usize) -> AnalysisResult<Vec<Range<usize>>> {
    if content.trim().is_empty() {
        return Err(AnalysisError::chunking("content is empty"));
    }
    if chunk_size == 0 {
        return Err(AnalysisError::chunking("chunk size must be greater than 0"));
    }

    let window = chunk_size / LINE_BREAK_WINDOW_DIVISOR;
    let mut ranges = Vec::new();
    let mut start = 0;

    while start < content.len() {
        let rest = &content[start..];
        let mut boundaries = rest.char_indices().map(|(i, _)| i);

        // Byte offset just past `chunk_size` chars, or the end of content.
        let Some(hard_end) = boundaries.nth(chunk_size) else {
            ranges.push(start..content.len());
            break;
        };

        let window_start = rest
            .char_indices()
            .nth(chunk_size - window)
            .map(|(i, _)| i)
            .unwrap_or(hard_end);

        let cut = match rest[window_start..hard_end].rfind('\n') {
            Some(pos) => window_start + pos + 1,
            None => hard_end,
        };

        ranges.push(start..start + cut);
        start += cut;
    }

    Ok(ranges)
}

/// Preprocessed content plus its chunk boundaries, owned so it can move
/// into the analysis task.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    content: String,
    ranges: Vec<Range<usize>>,
}

impl ChunkPlan {
    /// Preprocess `raw` and compute its chunks.
    pub fn new(raw: &str, chunk_size: usize) -> AnalysisResult<Self> {
        let content = preprocess(raw);
        let ranges = split_ranges(&content, chunk_size)?;
        Ok(Self { content, ranges })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn chunk(&self, index: usize) -> Option<Chunk<'_>> {
        self.ranges.get(index).map(|range| Chunk {
            index,
            total: self.ranges.len(),
            text: &self.content[range.clone()],
        })
    }

    pub fn chunks(&self) -> impl Iterator<Item = Chunk<'_>> + '_ {
        (0..self.ranges.len()).filter_map(move |i| self.chunk(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_content_is_single_chunk() {
        let chunks = split("----- pid 1 at 2024 -----", 100).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].number(), 1);
        assert_eq!(chunks[0].total, 1);
        assert!(chunks[0].is_last());
    }

    #[test]
    fn test_exact_size_is_single_chunk() {
        let content = "a".repeat(50);
        assert_eq!(split(&content, 50).unwrap().len(), 1);
        assert_eq!(split(&content, 49).unwrap().len(), 2);
    }

    #[test]
    fn test_large_file_scenario_sizes() {
        let content = "x".repeat(500_000);
        let chunks = split(&content, 200_000).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(|c| c.char_len()).collect();
        assert_eq!(sizes, vec![200_000, 200_000, 100_000]);
        assert!(chunks.iter().all(|c| c.total == 3));
    }

    #[test]
    fn test_prefers_line_boundary() {
        // 20 lines of 9 chars + newline = 200 chars
        let content = "abcdefghi\n".repeat(20);
        let chunks = split(&content, 95).unwrap();
        assert!(chunks[0].text.ends_with('\n'));
        assert_eq!(chunks[0].char_len(), 90);
    }

    #[test]
    fn test_chunks_reassemble_without_gaps() {
        let content = "main thread blocked\nat android.os.MessageQueue\n".repeat(300);
        let chunks = split(&content, 1_000).unwrap();
        let joined: String = chunks.iter().map(|c| c.text).collect();
        assert_eq!(joined, content);
        assert!(chunks.iter().all(|c| c.char_len() <= 1_000));
    }

    #[test]
    fn test_split_is_deterministic() {
        let content = "線程 \"main\" prio=5 tid=1 Blocked\n".repeat(500);
        let first: Vec<&str> = split(&content, 777).unwrap().iter().map(|c| c.text).collect();
        let second: Vec<&str> = split(&content, 777).unwrap().iter().map(|c| c.text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let content = "é".repeat(30);
        let chunks = split(&content, 10).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.char_len() == 10));
    }

    #[test]
    fn test_empty_content_rejected() {
        assert!(matches!(split("", 10), Err(AnalysisError::Chunking(_))));
        assert!(matches!(split(" \n\t ", 10), Err(AnalysisError::Chunking(_))));
        assert!(matches!(split("abc", 0), Err(AnalysisError::Chunking(_))));
    }

    #[test]
    fn test_preprocess_normalizes_line_endings() {
        assert_eq!(preprocess("  a\r\nb\rc\n  "), "a\nb\nc");
    }

    #[test]
    fn test_chunk_plan() {
        let raw = format!("\r\n{}\r\n", "line\r\n".repeat(10));
        let plan = ChunkPlan::new(&raw, 12).unwrap();
        assert!(!plan.content().contains('\r'));
        assert_eq!(plan.len(), plan.chunks().count());
        let joined: String = plan.chunks().map(|c| c.text).collect();
        assert_eq!(joined, plan.content());
        assert!(plan.chunk(plan.len()).is_none());

        assert!(ChunkPlan::new("\r\n \r\n", 12).is_err());
    }
}
