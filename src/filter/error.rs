//! Line filter errors.

// The miette/thiserror derives trigger `unused_assignments` on some Rust
// versions only, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use thiserror::Error;

use crate::files::FileError;

/// Failures applying a line filter.
#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    /// A keyword filter was given no keywords.
    #[error("keyword filter has no keywords")]
    #[diagnostic(code(stepcore::filter::empty_keywords))]
    EmptyKeywords,

    /// A block filter was given no blocks.
    #[error("block filter has no blocks")]
    #[diagnostic(code(stepcore::filter::empty_blocks))]
    EmptyBlocks,

    /// A block has an empty `begin` or `end` keyword.
    #[error("block {index} has an empty '{field}' keyword")]
    #[diagnostic(
        code(stepcore::filter::empty_delimiter),
        help("every block needs non-empty 'begin' and 'end' keywords")
    )]
    EmptyDelimiter {
        /// Zero-based position of the block.
        index: usize,
        /// `begin` or `end`.
        field: &'static str,
    },

    /// The input file could not be read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    File(#[from] FileError),
}
