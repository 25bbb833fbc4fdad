//! Composition configuration.
//!
//! Controls how duplicates are treated while merging a module graph and which
//! limits the executable schema enforces. Usually loaded from a `[composition]`
//! TOML table.
//!
//! # Example Configuration
//!
//! ```toml
//! providers = "warn"
//! resolvers = "override"
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! ```

use gqlmod_di::MergeStrategy;
use serde::{Deserialize, Serialize};

use crate::error::CompositionError;

/// Module composition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Policy for providers registered under the same token, and for distinct
    /// modules that share a name.
    /// Default: override
    #[serde(default)]
    pub providers: MergeStrategy,

    /// Policy for resolvers declared for the same `Type.field`.
    /// Default: override
    #[serde(default)]
    pub resolvers: MergeStrategy,

    /// Maximum query depth allowed.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable GraphQL introspection queries.
    /// Default: true
    #[serde(default = "default_introspection")]
    pub introspection: bool,
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_introspection() -> bool {
    true
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            providers: MergeStrategy::default(),
            resolvers: MergeStrategy::default(),
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_introspection(),
        }
    }
}

impl CompositionConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, CompositionError> {
        let config: Self = toml::from_str(source)
            .map_err(|e| CompositionError::Config(format!("TOML parse error: {e}")))?;
        config.validate().map_err(CompositionError::Config)?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("max_complexity must be > 0".into());
        }
        Ok(())
    }

    /// Converts this config to the limits applied by the schema builder.
    #[must_use]
    pub fn to_schema_limits(&self) -> SchemaLimits {
        SchemaLimits {
            max_depth: self.max_depth,
            max_complexity: self.max_complexity,
            introspection_enabled: self.introspection,
        }
    }
}

/// Limits applied to the executable schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaLimits {
    /// Maximum query depth allowed.
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    pub max_complexity: usize,

    /// Whether to enable introspection queries.
    pub introspection_enabled: bool,
}

impl Default for SchemaLimits {
    fn default() -> Self {
        CompositionConfig::default().to_schema_limits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompositionConfig::default();
        assert_eq!(config.providers, MergeStrategy::Override);
        assert_eq!(config.resolvers, MergeStrategy::Override);
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_depth() {
        let config = CompositionConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config = CompositionConfig::from_toml(
            r#"
            providers = "strict"
            resolvers = "warn"
            max_depth = 20
            introspection = false
        "#,
        )
        .unwrap();

        assert_eq!(config.providers, MergeStrategy::Strict);
        assert_eq!(config.resolvers, MergeStrategy::Warn);
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.max_complexity, 500);
        assert!(!config.introspection);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let err = CompositionConfig::from_toml("max_complexity = 0").unwrap_err();
        assert!(matches!(err, CompositionError::Config(_)));

        let err = CompositionConfig::from_toml(r#"providers = "sometimes""#).unwrap_err();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_schema_limits() {
        let limits = CompositionConfig::default().to_schema_limits();
        assert_eq!(limits, SchemaLimits::default());
        assert!(limits.introspection_enabled);
    }
}
