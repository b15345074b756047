//! Compare generated files with evaluated templates.
//!
//! Whitespace is removed from both sides before comparing, so templates may
//! be formatted freely.

use std::{fmt, str::FromStr};

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{ComparisonError, TemplateError, TemplateEvaluator, TemplateLocator};
use crate::files;

/// How an evaluated template is matched against a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Exact equality of the whitespace-free texts.
    #[default]
    Literal,
    /// The whitespace-free template is a regular expression that must match
    /// the whole whitespace-free result.
    Pattern,
}

impl ComparisonMode {
    /// Whether `actual` satisfies `expected` under this mode.
    ///
    /// # Errors
    ///
    /// Returns the regex error when `expected` is not a valid pattern in
    /// [`ComparisonMode::Pattern`].
    pub fn matches(self, expected: &str, actual: &str) -> Result<bool, regex::Error> {
        match self {
            Self::Literal => Ok(expected == actual),
            Self::Pattern => Regex::new(&format!("^(?:{expected})$")).map(|re| re.is_match(actual)),
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Literal => "literal",
            Self::Pattern => "pattern",
        })
    }
}

impl FromStr for ComparisonMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "literal" | "exact" => Ok(Self::Literal),
            "pattern" | "regex" => Ok(Self::Pattern),
            other => Err(format!("unknown comparison mode '{other}'")),
        }
    }
}

/// Remove ASCII whitespace: space, tab, line feed, vertical tab, form feed
/// and carriage return. Other Unicode spaces such as U+00A0 are kept.
#[must_use]
pub fn strip_whitespace(text: &str) -> String {
    text.chars()
        .filter(|ch| !matches!(ch, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r'))
        .collect()
}

/// Index of the first character at which `left` and `right` differ.
fn first_difference(left: &str, right: &str) -> usize {
    left.chars()
        .zip(right.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// A successful comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateComparison {
    /// Template file used.
    pub template: Utf8PathBuf,
    /// Persisted evaluated template.
    pub artifact: Utf8PathBuf,
    /// Mode the comparison ran in.
    pub mode: ComparisonMode,
}

/// Locates, evaluates and compares templates against result files.
#[derive(Debug, Clone, Copy)]
pub struct TemplateComparator<'a> {
    evaluator: TemplateEvaluator<'a>,
    locator: &'a TemplateLocator,
    artifact_dir: &'a Utf8Path,
    mode: ComparisonMode,
}

impl<'a> TemplateComparator<'a> {
    /// Compare in literal mode.
    #[must_use]
    pub const fn new(
        evaluator: TemplateEvaluator<'a>,
        locator: &'a TemplateLocator,
        artifact_dir: &'a Utf8Path,
    ) -> Self {
        Self {
            evaluator,
            locator,
            artifact_dir,
            mode: ComparisonMode::Literal,
        }
    }

    /// Select the comparison mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ComparisonMode) -> Self {
        self.mode = mode;
        self
    }

    /// Compare the file at `result_path` with template `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComparisonError::Mismatch`] when the texts differ,
    /// [`ComparisonError::InvalidPattern`] for a bad pattern and
    /// [`ComparisonError::Template`] when the template cannot be found,
    /// evaluated or persisted, or either file cannot be read.
    pub fn compare(
        &self,
        name: &str,
        result_path: &Utf8Path,
    ) -> Result<TemplateComparison, ComparisonError> {
        let template = self.locator.locate(name)?;
        let source = files::read_to_string(&template).map_err(TemplateError::from)?;
        let (evaluation, artifact) =
            self.evaluator
                .evaluate_to_artifact(name, &source, self.artifact_dir)?;
        let result = files::read_to_string(result_path).map_err(TemplateError::from)?;

        let expected = strip_whitespace(&evaluation.text);
        let actual = strip_whitespace(&result);
        let matched = self.mode.matches(&expected, &actual).map_err(|source| {
            error!(template = name, error = %source, "template is not a valid pattern");
            ComparisonError::InvalidPattern {
                template: name.to_owned(),
                source,
            }
        })?;

        if matched {
            info!(template = name, result = %result_path, mode = %self.mode, "result matches template");
            Ok(TemplateComparison {
                template,
                artifact,
                mode: self.mode,
            })
        } else {
            error!(
                template = name,
                result = %result_path,
                artifact = %artifact,
                mode = %self.mode,
                "result does not match template"
            );
            Err(ComparisonError::Mismatch {
                template: name.to_owned(),
                result: result_path.to_owned(),
                artifact,
                position: first_difference(&expected, &actual),
                mode: self.mode,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(" a b\n\tc ", "abc")]
    #[case("x\r\n\x0B\x0C", "x")]
    #[case("\u{a0}x", "\u{a0}x")]
    #[case("", "")]
    fn strips_ascii_whitespace(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_whitespace(input), expected);
    }

    #[rstest]
    #[case(ComparisonMode::Literal, "a.c", "a.c", true)]
    #[case(ComparisonMode::Literal, "a.c", "abc", false)]
    #[case(ComparisonMode::Pattern, "a.c", "abc", true)]
    #[case(ComparisonMode::Pattern, "a", "aa", false)]
    #[case(ComparisonMode::Pattern, "id=\\d+", "id=42", true)]
    fn matches_by_mode(
        #[case] mode: ComparisonMode,
        #[case] expected: &str,
        #[case] actual: &str,
        #[case] outcome: bool,
    ) {
        assert_eq!(mode.matches(expected, actual).expect("valid pattern"), outcome);
    }

    #[rstest]
    #[case("abc", "abd", 2)]
    #[case("abc", "ab", 2)]
    #[case("", "x", 0)]
    fn finds_first_difference(#[case] left: &str, #[case] right: &str, #[case] expected: usize) {
        assert_eq!(first_difference(left, right), expected);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(ComparisonMode::Pattern.matches("(", "(").is_err());
    }

    #[rstest]
    #[case("literal", ComparisonMode::Literal)]
    #[case("Regex", ComparisonMode::Pattern)]
    #[case(" pattern ", ComparisonMode::Pattern)]
    fn parses_modes(#[case] input: &str, #[case] expected: ComparisonMode) {
        assert_eq!(input.parse::<ComparisonMode>().expect("known mode"), expected);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!("fuzzy".parse::<ComparisonMode>().is_err());
    }
}
