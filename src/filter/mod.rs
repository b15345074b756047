//! Keyword and block line filters for generated files.
//!
//! Every filter returns the kept lines joined with `\n` and trimmed, so an
//! empty selection is an empty string.

mod error;

pub use error::FilterError;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::files;

/// A `begin`/`end` keyword pair delimiting a range of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFilter {
    /// Keyword opening the block.
    pub begin: String,
    /// Keyword closing the block.
    pub end: String,
}

impl BlockFilter {
    /// Create a block delimited by `begin` and `end`.
    #[must_use]
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }
}

/// A filter ready to be applied to lines or a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFilter {
    /// Keep lines containing any keyword.
    Include(Vec<String>),
    /// Drop lines containing any keyword.
    Exclude(Vec<String>),
    /// Keep lines inside `begin`/`end` blocks, delimiters included.
    Block(Vec<BlockFilter>),
}

impl LineFilter {
    /// Apply the filter to `lines`.
    ///
    /// # Errors
    ///
    /// See [`include_lines`], [`exclude_lines`] and [`block_lines`].
    pub fn apply<S: AsRef<str>>(&self, lines: &[S]) -> Result<String, FilterError> {
        match self {
            Self::Include(keywords) => include_lines(lines, keywords),
            Self::Exclude(keywords) => exclude_lines(lines, keywords),
            Self::Block(blocks) => block_lines(lines, blocks),
        }
    }

    /// Read `path` and apply the filter to its lines.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::File`] when the file cannot be read, otherwise
    /// as [`LineFilter::apply`].
    pub fn apply_to_file(&self, path: &Utf8Path) -> Result<String, FilterError> {
        let lines = files::read_lines(path)?;
        let filtered = self.apply(&lines)?;
        debug!(%path, kept = filtered.lines().count(), "filtered file");
        Ok(filtered)
    }
}

/// Keep lines containing at least one keyword, each line at most once.
///
/// # Errors
///
/// Returns [`FilterError::EmptyKeywords`] when `keywords` is empty.
pub fn include_lines<S: AsRef<str>, K: AsRef<str>>(
    lines: &[S],
    keywords: &[K],
) -> Result<String, FilterError> {
    require_keywords(keywords)?;
    Ok(join(lines.iter().map(AsRef::as_ref).filter(|line| contains_any(line, keywords))))
}

/// Keep lines containing none of the keywords.
///
/// # Errors
///
/// Returns [`FilterError::EmptyKeywords`] when `keywords` is empty.
pub fn exclude_lines<S: AsRef<str>, K: AsRef<str>>(
    lines: &[S],
    keywords: &[K],
) -> Result<String, FilterError> {
    require_keywords(keywords)?;
    Ok(join(lines.iter().map(AsRef::as_ref).filter(|line| !contains_any(line, keywords))))
}

/// Keep the lines of every `begin`..=`end` range, block by block.
///
/// A line containing `begin` opens a block and is kept. Following lines are
/// kept until one containing `end`, which is kept and closes the block.
/// The opening line is not checked for `end`, so identical delimiters work.
/// An `end` outside a block is ignored. Each block scans all lines and the
/// results are concatenated in block order.
///
/// # Errors
///
/// Returns [`FilterError::EmptyBlocks`] for an empty block list and
/// [`FilterError::EmptyDelimiter`] when a block has an empty keyword.
pub fn block_lines<S: AsRef<str>>(lines: &[S], blocks: &[BlockFilter]) -> Result<String, FilterError> {
    if blocks.is_empty() {
        error!("block filter list is empty");
        return Err(FilterError::EmptyBlocks);
    }
    for (index, block) in blocks.iter().enumerate() {
        let field = if block.begin.is_empty() {
            "begin"
        } else if block.end.is_empty() {
            "end"
        } else {
            continue;
        };
        error!(index, field, "block filter keyword is empty");
        return Err(FilterError::EmptyDelimiter { index, field });
    }

    let mut kept = Vec::new();
    for block in blocks {
        let mut inside = false;
        for line in lines.iter().map(AsRef::as_ref) {
            if inside {
                kept.push(line);
                inside = !line.contains(block.end.as_str());
            } else if line.contains(block.begin.as_str()) {
                kept.push(line);
                inside = true;
            }
        }
    }
    Ok(join(kept))
}

fn require_keywords<K: AsRef<str>>(keywords: &[K]) -> Result<(), FilterError> {
    if keywords.is_empty() {
        error!("keyword filter list is empty");
        return Err(FilterError::EmptyKeywords);
    }
    Ok(())
}

fn contains_any<K: AsRef<str>>(line: &str, keywords: &[K]) -> bool {
    keywords.iter().any(|keyword| line.contains(keyword.as_ref()))
}

fn join<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    lines.into_iter().collect::<Vec<_>>().join("\n").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: [&str; 3] = ["foo bar", "baz", "foo qux"];

    #[rstest]
    #[case(&["foo"], "foo bar\nfoo qux")]
    #[case(&["foo", "bar"], "foo bar\nfoo qux")]
    #[case(&["nothing"], "")]
    fn include_keeps_matching_lines_once(#[case] keywords: &[&str], #[case] expected: &str) {
        assert_eq!(include_lines(&SAMPLE, keywords).expect("filter"), expected);
    }

    #[rstest]
    #[case(&["foo"], "baz")]
    #[case(&["foo", "baz"], "")]
    fn exclude_drops_matching_lines(#[case] keywords: &[&str], #[case] expected: &str) {
        assert_eq!(exclude_lines(&SAMPLE, keywords).expect("filter"), expected);
    }

    #[test]
    fn keyword_filters_require_keywords() {
        let none: [&str; 0] = [];
        assert!(matches!(include_lines(&SAMPLE, &none), Err(FilterError::EmptyKeywords)));
        assert!(matches!(exclude_lines(&SAMPLE, &none), Err(FilterError::EmptyKeywords)));
    }

    #[rstest]
    #[case(&["x", "BEGIN", "a", "b", "END", "y"], "BEGIN\na\nb\nEND")]
    #[case(&["END", "x", "y"], "")]
    #[case(&["BEGIN", "a", "END", "z", "BEGIN", "b", "END"], "BEGIN\na\nEND\nBEGIN\nb\nEND")]
    #[case(&["x", "BEGIN", "a"], "BEGIN\na")]
    fn block_keeps_delimited_ranges(#[case] lines: &[&str], #[case] expected: &str) {
        let blocks = [BlockFilter::new("BEGIN", "END")];
        assert_eq!(block_lines(lines, &blocks).expect("filter"), expected);
    }

    #[test]
    fn block_results_concatenate_in_block_order() {
        let lines = ["<b>", "2", "</b>", "<a>", "1", "</a>"];
        let blocks = [BlockFilter::new("<a>", "</a>"), BlockFilter::new("<b>", "</b>")];
        assert_eq!(
            block_lines(&lines, &blocks).expect("filter"),
            "<a>\n1\n</a>\n<b>\n2\n</b>"
        );
    }

    #[test]
    fn identical_delimiters_bracket_content() {
        let lines = ["head", "---", "body", "---", "tail"];
        let blocks = [BlockFilter::new("---", "---")];
        assert_eq!(block_lines(&lines, &blocks).expect("filter"), "---\nbody\n---");
    }

    #[rstest]
    #[case(BlockFilter::new("", "END"), 0, "begin")]
    #[case(BlockFilter::new("BEGIN", ""), 0, "end")]
    fn block_rejects_empty_delimiters(
        #[case] block: BlockFilter,
        #[case] index: usize,
        #[case] field: &str,
    ) {
        let err = block_lines(&SAMPLE, &[block]).expect_err("empty delimiter");
        assert!(
            matches!(err, FilterError::EmptyDelimiter { index: i, field: f } if i == index && f == field)
        );
    }

    #[test]
    fn block_rejects_empty_list() {
        assert!(matches!(block_lines(&SAMPLE, &[]), Err(FilterError::EmptyBlocks)));
    }

    #[test]
    fn line_filter_dispatches_by_kind() {
        let filter = LineFilter::Exclude(vec!["baz".to_owned()]);
        assert_eq!(filter.apply(&SAMPLE).expect("filter"), "foo bar\nfoo qux");
    }
}
