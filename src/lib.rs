//! Step-definition helpers for behaviour-driven test suites.
//!
//! The crate provides the pieces step definitions keep rewriting:
//!
//! - a [`store::VariableStore`] of typed scenario values and a
//!   [`resolver::TypedValueResolver`] that turns step arguments into
//!   booleans, numbers, stored values or literals;
//! - a [`template::TemplateEvaluator`] substituting `${ctx.name}`
//!   placeholders, plus template lookup, artefact persistence and
//!   comparison against generated files;
//! - line [`filter`]s, [`command`] execution and JSON response
//!   [`assert`]ions.
//!
//! [`context::ScenarioContext`] ties these together for one scenario using a
//! layered [`config::StepConfig`].

pub mod assert;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod files;
pub mod filter;
pub mod logging;
pub mod random;
pub mod resolver;
pub mod store;
pub mod template;
pub mod value;

pub use config::StepConfig;
pub use context::{EvaluatedTemplate, ScenarioContext};
pub use error::{ConfigError, StepError};
pub use resolver::{ResolvedValue, TypedValueResolver};
pub use store::VariableStore;
pub use value::StoredValue;
