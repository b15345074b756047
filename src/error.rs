//! Crate-level error types.
//!
//! Each module reports its own error enum; [`StepError`] gathers them for
//! callers that drive several helpers from one step.

// The miette/thiserror derives trigger `unused_assignments` on some Rust
// versions only, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::sync::Arc;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::{
    assert::AssertionError,
    command::CommandError,
    files::FileError,
    filter::FilterError,
    template::{ComparisonError, TemplateError},
};

/// Failures loading or validating [`crate::config::StepConfig`].
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    File(#[from] FileError),

    /// A configuration file is not valid TOML.
    #[error("failed to parse configuration file '{path}': {message}")]
    #[diagnostic(code(stepcore::config::parse))]
    Parse {
        /// File that failed to parse.
        path: Utf8PathBuf,
        /// Parser message.
        message: String,
    },

    /// Configuration layers could not be merged into settings.
    #[error("failed to merge configuration layers")]
    #[diagnostic(
        code(stepcore::config::merge),
        help("check the types of values in stepcore.toml and STEPCORE_* variables")
    )]
    Merge {
        /// Underlying merge failure.
        #[source]
        source: Arc<OrthoError>,
    },

    /// A merged value is out of range.
    #[error("invalid configuration value for '{field}': {reason}")]
    #[diagnostic(code(stepcore::config::invalid))]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Any failure raised by a step helper.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// Template evaluation or lookup failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    /// A result did not match its template.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Comparison(#[from] ComparisonError),

    /// A line filter could not be applied.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Filter(#[from] FilterError),

    /// A command could not be run.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),

    /// A response assertion failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Assertion(#[from] AssertionError),

    /// A file could not be read or located.
    #[error(transparent)]
    #[diagnostic(transparent)]
    File(#[from] FileError),

    /// Configuration was invalid.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_codes() {
        let err = StepError::from(ConfigError::Invalid {
            field: "max_passes",
            reason: "must be positive".to_owned(),
        });
        let code = err.code().map(|code| code.to_string());
        assert_eq!(code.as_deref(), Some("stepcore::config::invalid"));
        assert_eq!(
            err.to_string(),
            "invalid configuration value for 'max_passes': must be positive"
        );
    }
}
