//! Tracing subscriber installation.
//!
//! Step helpers only emit `tracing` events; a test binary installs a
//! subscriber once through [`init`] or [`init_from_config`]. Installing again
//! is a no-op, so every test may call these freely.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;

use crate::{config::StepConfig, error::ConfigError};

/// Install a formatted subscriber capped at `level`.
///
/// Returns `true` when this call installed the subscriber and `false` when
/// one was already present.
#[must_use]
pub fn init(level: LevelFilter) -> bool {
    fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init()
        .is_ok()
}

/// Install a subscriber at the configured `log_level`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the level name is unknown.
pub fn init_from_config(config: &StepConfig) -> Result<bool, ConfigError> {
    Ok(init(config.log_level()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_harmless() {
        let _first = init(LevelFilter::DEBUG);
        assert!(!init(LevelFilter::INFO));
        assert!(!init_from_config(&StepConfig::default()).expect("valid level"));
    }
}
