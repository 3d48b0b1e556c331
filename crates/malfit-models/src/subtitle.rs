//! SubRip (SRT) subtitle documents.
//!
//! A document is a sequence of blocks separated by blank lines:
//!
//! ```text
//! 1
//! 00:00:00,000 --> 00:00:02,500
//! first line
//! optional second line
//!
//! 2
//! 00:00:02,500 --> 00:00:05,000
//! ...
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::timestamp::{SrtTimestamp, TimestampError};

/// One indexed, timestamped unit of transcript text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleBlock {
    pub index: u32,
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    /// Text lines joined with `\n`
    pub text: String,
}

impl SubtitleBlock {
    /// Whether `other` carries the same index and timing.
    pub fn same_timing(&self, other: &SubtitleBlock) -> bool {
        self.index == other.index && self.start == other.start && self.end == other.end
    }
}

impl fmt::Display for SubtitleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{} --> {}\n{}\n", self.index, self.start, self.end, self.text)
    }
}

/// Errors raised while parsing SRT text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubtitleError {
    #[error("block {block}: invalid index line '{line}'")]
    InvalidIndex { block: usize, line: String },

    #[error("block {block}: missing timing line")]
    MissingTiming { block: usize },

    #[error("block {block}: invalid timing line '{line}'")]
    InvalidTiming { block: usize, line: String },

    #[error("block {block}: {source}")]
    Timestamp {
        block: usize,
        #[source]
        source: TimestampError,
    },
}

/// Result of checking a rewritten transcript against its original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conformance {
    /// Indices and timings are unchanged.
    Exact,
    /// Block count matched but indices/timings drifted; the repaired
    /// document keeps the original timings with the rewritten text.
    Repaired(SubtitleDocument),
    /// Block structure differs and cannot be repaired.
    Mismatch { expected: usize, actual: usize },
}

/// A parsed SRT transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleDocument {
    pub blocks: Vec<SubtitleBlock>,
}

impl SubtitleDocument {
    pub fn new(blocks: Vec<SubtitleBlock>) -> Self {
        Self { blocks }
    }

    /// Parse SRT text. Empty input yields an empty document.
    pub fn parse(text: &str) -> Result<Self, SubtitleError> {
        let normalized = text.trim_start_matches('\u{feff}').replace("\r\n", "\n");

        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in normalized.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(parse_block(blocks.len() + 1, &current)?);
                    current.clear();
                }
            } else {
                current.push(line);
            }
        }

        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Render back to SRT text.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Check `candidate` (a rewrite of `self`) for index/timing preservation.
    pub fn conform(&self, candidate: &SubtitleDocument) -> Conformance {
        if self.len() != candidate.len() {
            return Conformance::Mismatch {
                expected: self.len(),
                actual: candidate.len(),
            };
        }

        if self
            .blocks
            .iter()
            .zip(&candidate.blocks)
            .all(|(orig, new)| orig.same_timing(new))
        {
            return Conformance::Exact;
        }

        let repaired = self
            .blocks
            .iter()
            .zip(&candidate.blocks)
            .map(|(orig, new)| SubtitleBlock {
                text: new.text.clone(),
                ..orig.clone()
            })
            .collect();

        Conformance::Repaired(SubtitleDocument::new(repaired))
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}

fn parse_block(block: usize, lines: &[&str]) -> Result<SubtitleBlock, SubtitleError> {
    let index_line = lines[0].trim();
    let index = index_line
        .parse::<u32>()
        .map_err(|_| SubtitleError::InvalidIndex {
            block,
            line: index_line.to_string(),
        })?;

    let timing_line = lines
        .get(1)
        .map(|l| l.trim())
        .ok_or(SubtitleError::MissingTiming { block })?;

    let (start, rest) = timing_line
        .split_once("-->")
        .ok_or_else(|| SubtitleError::InvalidTiming {
            block,
            line: timing_line.to_string(),
        })?;

    // Positioning hints may follow the end timestamp.
    let end = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| SubtitleError::InvalidTiming {
            block,
            line: timing_line.to_string(),
        })?;

    let start = start
        .trim()
        .parse::<SrtTimestamp>()
        .map_err(|source| SubtitleError::Timestamp { block, source })?;
    let end = end
        .parse::<SrtTimestamp>()
        .map_err(|source| SubtitleError::Timestamp { block, source })?;

    let text = lines[2..]
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(SubtitleBlock {
        index,
        start,
        end,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:02,500\n안녕하세요\n\n2\n00:00:02,500 --> 00:00:05,000\nsecond block\nwith two lines\n";

    #[test]
    fn test_parse_blocks() {
        let doc = SubtitleDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.blocks[0].text, "안녕하세요");
        assert_eq!(doc.blocks[1].text, "second block\nwith two lines");
        assert_eq!(doc.blocks[1].start.as_millis(), 2500);
        assert_eq!(doc.blocks[1].end.as_millis(), 5000);
    }

    #[test]
    fn test_render_matches_canonical_input() {
        let doc = SubtitleDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn test_parse_tolerates_crlf_bom_and_extra_blank_lines() {
        let text = "\u{feff}1\r\n00:00:00,000 --> 00:00:01,000 X1:10\r\nhi\r\n\r\n\r\n\r\n2\r\n00:00:01,000 --> 00:00:02,000\r\nthere\r\n";
        let doc = SubtitleDocument::parse(text).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.blocks[0].end.as_millis(), 1000);
        assert_eq!(doc.blocks[1].text, "there");
    }

    #[test]
    fn test_empty_input_is_empty_document() {
        assert!(SubtitleDocument::parse("").unwrap().is_empty());
        assert!(SubtitleDocument::parse("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SubtitleDocument::parse("Here is your rewritten script:\n..."),
            Err(SubtitleError::InvalidIndex { block: 1, .. })
        ));
        assert!(matches!(
            SubtitleDocument::parse("1\n"),
            Err(SubtitleError::MissingTiming { block: 1 })
        ));
        assert!(matches!(
            SubtitleDocument::parse("1\n00:00:00,000 00:00:01,000\nx\n"),
            Err(SubtitleError::InvalidTiming { block: 1, .. })
        ));
    }

    #[test]
    fn test_conform_exact() {
        let original = SubtitleDocument::parse(SAMPLE).unwrap();
        let rewritten = SubtitleDocument::parse(&SAMPLE.replace("second block", "другой текст")).unwrap();
        assert_eq!(original.conform(&rewritten), Conformance::Exact);
    }

    #[test]
    fn test_conform_repairs_drifted_timings() {
        let original = SubtitleDocument::parse(SAMPLE).unwrap();
        let drifted = SubtitleDocument::parse(
            "1\n00:00:00,000 --> 00:00:03,000\n반갑습니다\n\n3\n00:00:03,000 --> 00:00:05,000\nrewritten\n",
        )
        .unwrap();

        match original.conform(&drifted) {
            Conformance::Repaired(doc) => {
                assert_eq!(doc.blocks[0].end.as_millis(), 2500);
                assert_eq!(doc.blocks[0].text, "반갑습니다");
                assert_eq!(doc.blocks[1].index, 2);
                assert_eq!(doc.blocks[1].text, "rewritten");
            }
            other => panic!("expected repair, got {:?}", other),
        }
    }

    #[test]
    fn test_conform_block_count_mismatch() {
        let original = SubtitleDocument::parse(SAMPLE).unwrap();
        let merged = SubtitleDocument::parse("1\n00:00:00,000 --> 00:00:05,000\nall in one\n").unwrap();
        assert_eq!(
            original.conform(&merged),
            Conformance::Mismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
