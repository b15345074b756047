//! Error types for template evaluation and comparison.
//!
//! Kept in a submodule so the lint suppression needed by the derive macros
//! stays narrow.

// The miette/thiserror derives trigger `unused_assignments` on some Rust
// versions only, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::io;

use camino::Utf8PathBuf;
use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

use super::compare::ComparisonMode;
use crate::files::FileError;

/// Failures while locating, evaluating or persisting a template.
#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    /// A `${` with no closing `}` after it.
    #[error("unclosed placeholder starting at byte {offset} in pass {pass}: '{fragment}'")]
    #[diagnostic(
        code(stepcore::template::unclosed_placeholder),
        help("every '${{' must be followed by a closing '}}'")
    )]
    UnclosedPlaceholder {
        /// Byte offset of the `${` in the pass input.
        offset: usize,
        /// Pass that found it; passes after the first see substituted text.
        pass: usize,
        /// Text from the `${`, shortened to a few dozen characters.
        fragment: String,
    },

    /// Expansion kept changing the text after the pass limit.
    #[error("template substitution did not settle after {passes} passes")]
    #[diagnostic(
        code(stepcore::template::substitution_limit),
        help("check for stored values that reference each other")
    )]
    SubstitutionLimit {
        /// Number of passes attempted.
        passes: usize,
    },

    /// No `<name>.template` file exists in any search directory.
    #[error("template '{name}.template' not found in: {}", .searched.iter().join(", "))]
    #[diagnostic(code(stepcore::template::not_found))]
    NotFound {
        /// Template name without extension.
        name: String,
        /// Directories searched, in order.
        searched: Vec<Utf8PathBuf>,
    },

    /// The template or result file could not be read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    File(#[from] FileError),

    /// The evaluated template could not be written to the artefact directory.
    #[error("failed to persist template artefact in {dir}")]
    #[diagnostic(code(stepcore::template::artifact))]
    Artifact {
        /// Directory the artefact was written to.
        dir: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Failures when comparing an evaluated template with a result file.
#[derive(Debug, Error, Diagnostic)]
pub enum ComparisonError {
    /// The result did not match the template.
    #[error(
        "result {result} does not match template '{template}' ({mode} comparison, \
         first difference at character {position})"
    )]
    #[diagnostic(
        code(stepcore::comparison::mismatch),
        help("the evaluated template was saved to {artifact}")
    )]
    Mismatch {
        /// Template name.
        template: String,
        /// Result file compared.
        result: Utf8PathBuf,
        /// Evaluated template artefact.
        artifact: Utf8PathBuf,
        /// Character index, ignoring whitespace, where the texts diverge.
        position: usize,
        /// Comparison mode used.
        mode: ComparisonMode,
    },

    /// The evaluated template is not a valid regular expression.
    #[error("template '{template}' is not a valid pattern")]
    #[diagnostic(
        code(stepcore::comparison::invalid_pattern),
        help("use literal comparison or escape regex metacharacters")
    )]
    InvalidPattern {
        /// Template name.
        template: String,
        /// Regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The template could not be prepared or the result read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),
}
