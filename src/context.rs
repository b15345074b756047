//! Per-scenario state shared by step definitions.
//!
//! A [`ScenarioContext`] owns the configuration and variable store for one
//! scenario. Step definitions hold a context, store values as the scenario
//! runs and call the helper operations below, which wire the resolver,
//! evaluator, locator and runners together from the configuration.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{
    assert::{AssertOperator, assert_field},
    command::{CommandRequest, Execution},
    config::StepConfig,
    error::StepError,
    files,
    filter::{BlockFilter, LineFilter},
    resolver::{ResolvedValue, TypedValueResolver},
    store::VariableStore,
    template::{
        Evaluation, TemplateComparator, TemplateComparison, TemplateEvaluator, TemplateLocator,
    },
};

/// An evaluated template file and its persisted artefact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedTemplate {
    /// Template file that was evaluated.
    pub template: Utf8PathBuf,
    /// Saved copy of the evaluated text.
    pub artifact: Utf8PathBuf,
    /// The evaluation itself.
    pub evaluation: Evaluation,
}

/// Configuration and variables for one scenario.
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    config: StepConfig,
    store: VariableStore,
    feature_dir: Option<Utf8PathBuf>,
}

impl ScenarioContext {
    /// A context with an empty store.
    #[must_use]
    pub fn new(config: StepConfig) -> Self {
        let feature_dir = config.feature_dir().map(Utf8Path::to_owned);
        Self {
            config,
            store: VariableStore::new(),
            feature_dir,
        }
    }

    /// A context using configuration loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Config`] when loading fails.
    pub fn load() -> Result<Self, StepError> {
        Ok(Self::new(StepConfig::load()?))
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Scenario variables.
    #[must_use]
    pub const fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Scenario variables, mutably.
    pub const fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.store
    }

    /// Directory of the running feature file, searched first for templates.
    #[must_use]
    pub fn feature_dir(&self) -> Option<&Utf8Path> {
        self.feature_dir.as_deref()
    }

    /// Record the directory of the running feature file.
    pub fn set_feature_dir(&mut self, dir: impl Into<Utf8PathBuf>) {
        self.feature_dir = Some(dir.into());
    }

    /// Resolver over this scenario's variables.
    #[must_use]
    pub fn resolver(&self) -> TypedValueResolver<'_> {
        TypedValueResolver::new(&self.store).with_number_format(self.config.number_format())
    }

    /// Resolve a step argument to a typed value.
    #[must_use]
    pub fn resolve(&self, token: &str) -> ResolvedValue {
        self.resolver().resolve(token)
    }

    /// Substitute `${...}` placeholders in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Template`] for malformed or runaway templates.
    pub fn evaluate(&self, text: &str) -> Result<Evaluation, StepError> {
        Ok(self.evaluator().evaluate(text)?)
    }

    /// Locate template `name`, evaluate it and save the result.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Template`] when the template is missing or
    /// cannot be evaluated or saved, and [`StepError::File`] when the project
    /// root or artefact directory cannot be determined.
    pub fn evaluate_template(&self, name: &str) -> Result<EvaluatedTemplate, StepError> {
        let template = self.locator()?.locate(name)?;
        self.evaluate_template_file(name, template)
    }

    /// Evaluate `<dir>/<name>.template` and save the result.
    ///
    /// # Errors
    ///
    /// See [`ScenarioContext::evaluate_template`].
    pub fn evaluate_template_in(
        &self,
        dir: &Utf8Path,
        name: &str,
    ) -> Result<EvaluatedTemplate, StepError> {
        let template = TemplateLocator::locate_in(dir, name)?;
        self.evaluate_template_file(name, template)
    }

    fn evaluate_template_file(
        &self,
        name: &str,
        template: Utf8PathBuf,
    ) -> Result<EvaluatedTemplate, StepError> {
        let source = files::read_to_string(&template)?;
        let artifact_dir = self.config.artifact_dir()?;
        let (evaluation, artifact) =
            self.evaluator()
                .evaluate_to_artifact(name, &source, &artifact_dir)?;
        debug!(%template, %artifact, "evaluated template file");
        Ok(EvaluatedTemplate {
            template,
            artifact,
            evaluation,
        })
    }

    /// Compare the file at `result` with template `name` using the
    /// configured comparison mode.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Comparison`] on mismatch or when the template
    /// cannot be processed, and [`StepError::File`] when paths cannot be
    /// determined.
    pub fn compare_with_template(
        &self,
        name: &str,
        result: &Utf8Path,
    ) -> Result<TemplateComparison, StepError> {
        let locator = self.locator()?;
        let artifact_dir = self.config.artifact_dir()?;
        let comparison = TemplateComparator::new(self.evaluator(), &locator, &artifact_dir)
            .with_mode(self.config.comparison_mode())
            .compare(name, result)?;
        Ok(comparison)
    }

    /// Lines of `path` containing any of `keywords`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Filter`] for empty keywords or unreadable files.
    #[expect(clippy::unused_self, reason = "filters are scenario operations")]
    pub fn apply_include_filter<K: AsRef<str>>(
        &self,
        path: &Utf8Path,
        keywords: &[K],
    ) -> Result<String, StepError> {
        let filter = LineFilter::Include(owned(keywords));
        Ok(filter.apply_to_file(path)?)
    }

    /// Lines of `path` containing none of `keywords`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Filter`] for empty keywords or unreadable files.
    #[expect(clippy::unused_self, reason = "filters are scenario operations")]
    pub fn apply_exclude_filter<K: AsRef<str>>(
        &self,
        path: &Utf8Path,
        keywords: &[K],
    ) -> Result<String, StepError> {
        let filter = LineFilter::Exclude(owned(keywords));
        Ok(filter.apply_to_file(path)?)
    }

    /// Lines of `path` inside any of `blocks`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Filter`] for invalid blocks or unreadable files.
    #[expect(clippy::unused_self, reason = "filters are scenario operations")]
    pub fn apply_block_filter(
        &self,
        path: &Utf8Path,
        blocks: &[BlockFilter],
    ) -> Result<String, StepError> {
        let filter = LineFilter::Block(blocks.to_vec());
        Ok(filter.apply_to_file(path)?)
    }

    /// Run `request` with the configured command limits. Placeholders in
    /// the command line are substituted first.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Template`] when the command line cannot be
    /// evaluated and [`StepError::Command`] when it cannot be run.
    pub fn execute(&self, request: &CommandRequest) -> Result<Execution, StepError> {
        let evaluation = self.evaluate(&request.command)?;
        let evaluated = CommandRequest {
            command: evaluation.text,
            ..request.clone()
        };
        Ok(self.config.command_runner().execute(&evaluated)?)
    }

    /// Assert on field `path` of `body`. `operator` is parsed by name and
    /// `expected` is resolved like any other step argument.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] for unknown operators, missing
    /// fields and failed checks.
    pub fn assert_response_field(
        &self,
        body: &JsonValue,
        path: &str,
        operator: &str,
        expected: &str,
    ) -> Result<(), StepError> {
        let parsed: AssertOperator = operator.parse()?;
        let value = self.resolve(expected);
        assert_field(body, path, parsed, value.value())?;
        Ok(())
    }

    fn evaluator(&self) -> TemplateEvaluator<'_> {
        TemplateEvaluator::new(self.resolver()).with_max_passes(self.config.max_passes())
    }

    fn locator(&self) -> Result<TemplateLocator, StepError> {
        let locator = TemplateLocator::new(self.config.project_root()?);
        Ok(match &self.feature_dir {
            Some(dir) => locator.with_feature_dir(dir.clone()),
            None => locator,
        })
    }
}

fn owned<K: AsRef<str>>(keywords: &[K]) -> Vec<String> {
    keywords.iter().map(|key| key.as_ref().to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StoredValue;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;

    struct Workspace {
        _root: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn workspace() -> Workspace {
        let root = tempfile::tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf8 tempdir");
        std::fs::create_dir_all(path.join("template")).expect("template dir");
        std::fs::create_dir_all(path.join("artifacts")).expect("artifact dir");
        Workspace { _root: root, path }
    }

    fn context_in(workspace: &Workspace) -> ScenarioContext {
        ScenarioContext::new(
            StepConfig::default()
                .with_project_root(workspace.path.clone())
                .with_artifact_dir(workspace.path.join("artifacts")),
        )
    }

    #[rstest]
    fn evaluates_against_scenario_variables() {
        let mut ctx = ScenarioContext::default();
        ctx.store_mut().put("user", StoredValue::from("ada"));
        let evaluation = ctx.evaluate("hello ${ctx.user}").expect("evaluates");
        assert_eq!(evaluation.text, "hello ada");
        assert!(evaluation.is_complete());
    }

    #[rstest]
    fn resolves_with_configured_locale() {
        let ctx = ScenarioContext::new(StepConfig::default().with_number_locale("de"));
        assert_eq!(*ctx.resolve("1.234,5").value(), StoredValue::Double(1234.5));
    }

    #[rstest]
    fn evaluates_and_compares_templates(workspace: Workspace) {
        std::fs::write(workspace.path.join("template/greeting.template"), "Hi ${ctx.who}!")
            .expect("write template");
        let result = workspace.path.join("result.txt");
        std::fs::write(&result, "Hi  there!\n").expect("write result");

        let mut ctx = context_in(&workspace);
        ctx.store_mut().put("who", "there");
        let evaluated = ctx.evaluate_template("greeting").expect("template evaluates");
        assert_eq!(evaluated.evaluation.text, "Hi there!");
        assert!(evaluated.artifact.starts_with(workspace.path.join("artifacts")));

        let comparison = ctx.compare_with_template("greeting", &result).expect("matches");
        assert_eq!(comparison.template, evaluated.template);
    }

    #[rstest]
    fn missing_template_is_reported(workspace: Workspace) {
        let err = context_in(&workspace)
            .evaluate_template("absent")
            .expect_err("not found");
        assert!(matches!(err, StepError::Template(_)), "unexpected: {err:?}");
    }

    #[rstest]
    fn filters_files(workspace: Workspace) {
        let log = workspace.path.join("app.log");
        std::fs::write(&log, "INFO start\nDEBUG noise\nERROR boom\n").expect("write log");
        let ctx = context_in(&workspace);
        assert_eq!(
            ctx.apply_include_filter(&log, &["ERROR"]).expect("include"),
            "ERROR boom"
        );
        assert_eq!(
            ctx.apply_exclude_filter(&log, &["DEBUG"]).expect("exclude"),
            "INFO start\nERROR boom"
        );
    }

    #[rstest]
    fn asserts_with_resolved_expectations() {
        let mut ctx = ScenarioContext::default();
        ctx.store_mut().put("expected", 3_i64);
        let body = json!({"items": {"count": 3}});
        ctx.assert_response_field(&body, "items.count", "equalTo", "expected")
            .expect("holds");
        let err = ctx
            .assert_response_field(&body, "items.count", "greaterThan", "5")
            .expect_err("fails");
        assert!(matches!(err, StepError::Assertion(_)));
    }

    #[cfg(unix)]
    #[rstest]
    fn executes_evaluated_command_lines() {
        let mut ctx = ScenarioContext::default();
        ctx.store_mut().put("word", "hello");
        let execution = ctx
            .execute(&CommandRequest::new("echo ${ctx.word}"))
            .expect("runs");
        let Execution::Finished(output) = execution else {
            panic!("blocking request should finish");
        };
        assert_eq!(output.stdout.trim(), "hello");
    }
}
