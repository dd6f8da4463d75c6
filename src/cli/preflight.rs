//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{DocragError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing embeds chunks through the API.
    Index,
    /// Asking questions embeds the query and generates an answer.
    Ask,
    /// Inspecting or clearing the store is local only.
    Inspect,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    settings.validate()?;
    match operation {
        Operation::Index | Operation::Ask => check_api_key(settings)?,
        Operation::Inspect => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
///
/// Custom endpoints may not need a key, so the check is skipped when
/// `openai.api_base` is set.
fn check_api_key(settings: &Settings) -> Result<()> {
    if settings.openai.api_base.as_deref().is_some_and(|b| !b.is_empty()) {
        return Ok(());
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(DocragError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(DocragError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_has_no_requirements() {
        assert!(check(Operation::Inspect, &Settings::default()).is_ok());
    }

    #[test]
    fn test_custom_endpoint_skips_key_check() {
        let mut settings = Settings::default();
        settings.openai.api_base = Some("http://localhost:11434/v1".to_string());
        assert!(check(Operation::Ask, &settings).is_ok());
    }

    #[test]
    fn test_invalid_settings_fail() {
        let mut settings = Settings::default();
        settings.retrieval.top_k = 0;
        assert!(check(Operation::Inspect, &settings).unwrap_err().is_config());
    }
}
