use serde::{Deserialize, Serialize};

use crate::MockError;
use crate::random::{RandomSource, SeededRandom};

/// Default bound on schema nesting while generating values.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Names of the reserved query parameters understood by OpenAPI handlers.
///
/// A request to `/pets?response=404` forces the `404` response, `?example=cat`
/// forces the `cat` named example and `?type=application/xml` forces that
/// declared content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverrideParams {
    /// Parameter forcing a declared status code.
    pub response: String,
    /// Parameter forcing a named example.
    pub example: String,
    /// Parameter forcing a declared content type.
    pub content_type: String,
}

impl Default for OverrideParams {
    fn default() -> Self {
        Self {
            response: "response".to_string(),
            example: "example".to_string(),
            content_type: "type".to_string(),
        }
    }
}

/// Configuration shared by the handler builders.
///
/// # Example
///
/// ```rust
/// use mockspec_core::MockConfig;
///
/// let config = MockConfig::default()
///     .with_seed(42)
///     .with_max_depth(8)
///     .with_replay_delay(false);
///
/// assert_eq!(config.seed, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MockConfig {
    /// Seed of the random source, entropy is used when absent.
    pub seed: Option<u64>,
    /// Maximum schema nesting before generation fails.
    pub max_depth: usize,
    /// Reserved query parameter names.
    pub overrides: OverrideParams,
    /// Whether HAR handlers wait for the recorded response time.
    pub replay_delay: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_depth: DEFAULT_MAX_DEPTH,
            overrides: OverrideParams::default(),
            replay_delay: true,
        }
    }
}

impl MockConfig {
    /// Sets the seed for reproducible generation.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the maximum schema nesting.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the reserved query parameter names.
    #[must_use]
    pub fn with_overrides(mut self, overrides: OverrideParams) -> Self {
        self.overrides = overrides;
        self
    }

    /// Enables or disables the recorded HAR delays.
    #[must_use]
    pub fn with_replay_delay(mut self, replay_delay: bool) -> Self {
        self.replay_delay = replay_delay;
        self
    }

    /// Reads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, MockError> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let config = serde_path_to_error::deserialize(&mut deserializer)?;
        Ok(config)
    }

    /// Reads a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    #[cfg(feature = "yaml")]
    pub fn from_yaml(text: &str) -> Result<Self, MockError> {
        serde_saphyr::from_str(text).map_err(|err| MockError::YamlError {
            message: err.to_string(),
        })
    }

    pub(crate) fn random_source(&self) -> Box<dyn RandomSource> {
        match self.seed {
            Some(seed) => Box::new(SeededRandom::from_seed(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        insta::assert_debug_snapshot!(MockConfig::default(), @r#"
        MockConfig {
            seed: None,
            max_depth: 32,
            overrides: OverrideParams {
                response: "response",
                example: "example",
                content_type: "type",
            },
            replay_delay: true,
        }
        "#);
    }

    #[test]
    fn should_read_partial_json_config() {
        let config = MockConfig::from_json(r#"{"seed": 12, "overrides": {"response": "status"}}"#)
            .expect("should parse config");

        assert_eq!(config.seed, Some(12));
        assert_eq!(config.overrides.response, "status");
        assert_eq!(config.overrides.example, "example");
        assert!(config.replay_delay);
    }

    #[test]
    fn should_report_invalid_json_config() {
        let error = MockConfig::from_json(r#"{"maxDepth": "deep"}"#).expect_err("should reject");

        let message = error.to_string();
        assert!(
            message.starts_with("Failed to deserialize JSON at 'maxDepth': invalid type"),
            "{message}"
        );
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn should_read_yaml_config() {
        let config = MockConfig::from_yaml("seed: 3\nreplayDelay: false\n").expect("should parse yaml");

        assert_eq!(config.seed, Some(3));
        assert!(!config.replay_delay);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }
}
