use std::path::Path;

use anyhow::{Context, Result};
use gqlmod_core::CompositionConfig;
use serde::Deserialize;

/// Top-level layout of the CLI config file.
#[derive(Debug, Default, Deserialize)]
struct CliConfig {
    #[serde(default)]
    composition: CompositionConfig,
}

/// Loads the composition config, or the defaults when no file is given.
pub fn load(path: Option<&Path>) -> Result<CompositionConfig> {
    let Some(path) = path else {
        return Ok(CompositionConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: CliConfig = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .composition
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config in {}: {e}", path.display()))?;
    Ok(config.composition)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use gqlmod_core::MergeStrategy;

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        assert_eq!(load(None).unwrap(), CompositionConfig::default());
    }

    #[test]
    fn test_loads_composition_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[composition]
providers = "strict"
max_depth = 8
"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.providers, MergeStrategy::Strict);
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.max_complexity, 500);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[composition]\nmax_depth = 0").unwrap();

        let err = load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("max_depth must be > 0"));
    }

    #[test]
    fn test_missing_file() {
        let err = load(Some(Path::new("/nonexistent/gqlmod.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
