//! `${...}` placeholder substitution.
//!
//! A placeholder is `${` up to the first following `}`. Tokens prefixed with
//! `ctx.` are context references: the prefix is stripped and the remainder
//! resolved through the [`TypedValueResolver`]. When a context reference
//! resolves to its own name, nothing was found and the placeholder is kept
//! verbatim. Bare tokens are always replaced by their resolution.
//!
//! Substitution runs in passes until the text stops changing, so stored
//! values may themselves contain placeholders. The number of passes is
//! bounded to catch values that refer to each other.

mod artifact;
mod compare;
mod error;
mod locate;

pub use artifact::persist_artifact;
pub use compare::{ComparisonMode, TemplateComparator, TemplateComparison, strip_whitespace};
pub use error::{ComparisonError, TemplateError};
pub use locate::{TEMPLATE_EXTENSION, TemplateLocator};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::resolver::TypedValueResolver;

/// Default upper bound on substitution passes.
pub const DEFAULT_MAX_PASSES: usize = 32;

const OPEN: &str = "${";
const CLOSE: char = '}';
const CONTEXT_PREFIX: &str = "ctx.";
/// Characters of an unclosed placeholder quoted in its error.
const FRAGMENT_CHARS: usize = 40;

/// Output of [`TemplateEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Evaluated text.
    pub text: String,
    /// Context references left in place because nothing resolved them.
    pub unresolved: Vec<String>,
    /// Passes run, including the final pass that changed nothing.
    pub passes: usize,
}

impl Evaluation {
    /// Whether every context reference was substituted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Substitutes placeholders using a resolver.
#[derive(Debug, Clone, Copy)]
pub struct TemplateEvaluator<'a> {
    resolver: TypedValueResolver<'a>,
    max_passes: usize,
}

impl<'a> TemplateEvaluator<'a> {
    /// Evaluate with `resolver` and the default pass limit.
    #[must_use]
    pub const fn new(resolver: TypedValueResolver<'a>) -> Self {
        Self {
            resolver,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Override the pass limit. Values below one are raised to one.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// The resolver used for placeholders.
    #[must_use]
    pub const fn resolver(&self) -> &TypedValueResolver<'a> {
        &self.resolver
    }

    /// Substitute every placeholder in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnclosedPlaceholder`] when a `${` has no
    /// closing brace and [`TemplateError::SubstitutionLimit`] when the text
    /// is still changing after the configured number of passes.
    pub fn evaluate(&self, text: &str) -> Result<Evaluation, TemplateError> {
        let mut current = text.to_owned();
        let mut passes = 0;
        loop {
            if passes == self.max_passes {
                warn!(passes, "template substitution did not settle");
                return Err(TemplateError::SubstitutionLimit { passes });
            }
            passes += 1;
            let (next, unresolved) = self.substitute_pass(&current, passes)?;
            if next == current {
                if !unresolved.is_empty() {
                    warn!(unresolved = ?unresolved, "template left unresolved placeholders");
                }
                debug!(passes, "template evaluated");
                return Ok(Evaluation {
                    text: next,
                    unresolved: unresolved.into_iter().unique().collect(),
                    passes,
                });
            }
            current = next;
        }
    }

    /// Evaluate `text` and persist the result as `<name>.template` under
    /// `artifact_dir`, returning the evaluation and the artefact path.
    ///
    /// # Errors
    ///
    /// Propagates evaluation failures and [`TemplateError::Artifact`] when
    /// the file cannot be written.
    pub fn evaluate_to_artifact(
        &self,
        name: &str,
        text: &str,
        artifact_dir: &Utf8Path,
    ) -> Result<(Evaluation, Utf8PathBuf), TemplateError> {
        let evaluation = self.evaluate(text)?;
        let path = persist_artifact(name, &evaluation.text, artifact_dir)?;
        Ok((evaluation, path))
    }

    fn substitute_pass(
        &self,
        input: &str,
        pass: usize,
    ) -> Result<(String, Vec<String>), TemplateError> {
        let mut output = String::with_capacity(input.len());
        let mut unresolved = Vec::new();
        let mut rest = input;
        let mut offset = 0;
        while let Some((before, after)) = rest.split_once(OPEN) {
            output.push_str(before);
            let Some((token, tail)) = after.split_once(CLOSE) else {
                let position = offset + before.len();
                let fragment: String =
                    OPEN.chars().chain(after.chars()).take(FRAGMENT_CHARS).collect();
                warn!(offset = position, pass, %fragment, "unclosed placeholder in template");
                return Err(TemplateError::UnclosedPlaceholder {
                    offset: position,
                    pass,
                    fragment,
                });
            };
            match token.strip_prefix(CONTEXT_PREFIX) {
                Some(name) => {
                    let rendered = self.resolver.resolve(name).to_string();
                    if rendered == name {
                        debug!(name, "context reference left unresolved");
                        output.push_str(OPEN);
                        output.push_str(token);
                        output.push(CLOSE);
                        unresolved.push(name.to_owned());
                    } else {
                        output.push_str(&rendered);
                    }
                }
                None => output.push_str(&self.resolver.resolve(token).to_string()),
            }
            offset += before.len() + OPEN.len() + token.len() + CLOSE.len_utf8();
            rest = tail;
        }
        output.push_str(rest);
        Ok((output, unresolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::VariableStore, value::StoredValue};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store.put("a", StoredValue::from(json!({"b": 42})));
        store.put("host", "example.org");
        store.put("url", "https://${ctx.host}/api");
        store.put("ping", "${ctx.pong}");
        store.put("pong", "${ctx.ping}");
        store.put("grow", "x${ctx.grow}");
        store
    }

    fn evaluate(store: &VariableStore, text: &str) -> Result<Evaluation, TemplateError> {
        TemplateEvaluator::new(TypedValueResolver::new(store)).evaluate(text)
    }

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("${ctx.a.b}", "42")]
    #[case("id=${ctx.a.b};again=${ctx.a.b}", "id=42;again=42")]
    #[case("${ctx.url}", "https://example.org/api")]
    #[case("${true} ${7}", "true 7")]
    #[case("${bare}", "bare")]
    #[case("${host}", "example.org")]
    #[case("", "")]
    fn substitutes_placeholders(
        store: VariableStore,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let evaluation = evaluate(&store, input).expect("evaluation succeeds");
        assert_eq!(evaluation.text, expected);
        assert!(evaluation.is_complete());
    }

    #[rstest]
    fn text_without_placeholders_takes_one_pass(store: VariableStore) {
        let evaluation = evaluate(&store, "no placeholders").expect("evaluation succeeds");
        assert_eq!(evaluation.passes, 1);
    }

    #[rstest]
    fn unresolved_context_reference_is_kept(store: VariableStore) {
        let evaluation =
            evaluate(&store, "${ctx.missing}-${ctx.host}-${ctx.missing}").expect("evaluates");
        assert_eq!(evaluation.text, "${ctx.missing}-example.org-${ctx.missing}");
        assert_eq!(evaluation.unresolved, vec!["missing".to_owned()]);
    }

    #[rstest]
    #[case("${ctx.a", 0)]
    #[case("ok ${ctx.host} then ${oops", 20)]
    fn unclosed_placeholder_reports_offset(
        store: VariableStore,
        #[case] input: &str,
        #[case] expected: usize,
    ) {
        let err = evaluate(&store, input).expect_err("unclosed placeholder");
        assert!(
            matches!(
                err,
                TemplateError::UnclosedPlaceholder { offset, pass: 1, .. } if offset == expected
            ),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    fn unclosed_placeholder_from_a_stored_value_names_its_pass(mut store: VariableStore) {
        store.put("broken", "${ctx.host");
        let err = evaluate(&store, "url=${ctx.broken}").expect_err("unclosed placeholder");
        assert!(
            matches!(
                &err,
                TemplateError::UnclosedPlaceholder { offset: 4, pass: 2, fragment }
                    if fragment == "${ctx.host"
            ),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    #[case("${ctx.ping}")]
    #[case("${ctx.grow}")]
    fn cycles_hit_the_pass_limit(store: VariableStore, #[case] input: &str) {
        let err = TemplateEvaluator::new(TypedValueResolver::new(&store))
            .with_max_passes(5)
            .evaluate(input)
            .expect_err("cycle detected");
        assert!(matches!(err, TemplateError::SubstitutionLimit { passes: 5 }));
    }
}
