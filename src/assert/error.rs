//! Response assertion errors.

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

use super::AssertOperator;

/// Failures asserting on a response body field.
#[derive(Debug, Error, Diagnostic)]
pub enum AssertionError {
    /// The path does not lead to a value in the body.
    #[error("field '{path}' not found in response")]
    #[diagnostic(code(stepcore::assert::field_not_found))]
    FieldNotFound {
        /// Requested field path.
        path: String,
    },

    /// The operator name is not recognised.
    #[error("unsupported assertion operator '{operator}'")]
    #[diagnostic(
        code(stepcore::assert::unsupported_operator),
        help("use equalTo, containsString, containsInAnyOrder, greaterThan or lessThan")
    )]
    UnsupportedOperator {
        /// Operator as given.
        operator: String,
    },

    /// The field or expected value has a type the operator cannot handle.
    #[error("{operator} cannot compare field '{path}' of type {actual} with a {expected} value")]
    #[diagnostic(code(stepcore::assert::unsupported_type))]
    UnsupportedType {
        /// Field path.
        path: String,
        /// Operator applied.
        operator: AssertOperator,
        /// Type of the field in the body.
        actual: &'static str,
        /// Type of the expected value.
        expected: &'static str,
    },

    /// The assertion did not hold.
    #[error("expected field '{path}' {operator} {expected}, but was {actual}")]
    #[diagnostic(code(stepcore::assert::failed))]
    Failed {
        /// Field path.
        path: String,
        /// Operator applied.
        operator: AssertOperator,
        /// Rendered expected value.
        expected: String,
        /// Rendered field value.
        actual: String,
    },
}
