use serde::{Deserialize, Serialize};

/// What to do when two registrations target the same key.
///
/// Used for provider tokens and for resolver `Type.field` paths. In every mode
/// except `Strict` the later registration replaces the earlier one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Last write wins, silently.
    #[default]
    Override,
    /// Last write wins, with a warning logged.
    Warn,
    /// Duplicates are an error.
    Strict,
}

impl MergeStrategy {
    /// Returns true when duplicates must be rejected.
    #[must_use]
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        strategy: MergeStrategy,
    }

    #[test]
    fn test_default_is_override() {
        assert_eq!(MergeStrategy::default(), MergeStrategy::Override);
        assert!(!MergeStrategy::Warn.is_strict());
        assert!(MergeStrategy::Strict.is_strict());
    }

    #[test]
    fn test_deserialize_lowercase() {
        let holder: Holder = toml::from_str(r#"strategy = "warn""#).unwrap();
        assert_eq!(holder.strategy, MergeStrategy::Warn);

        let value: MergeStrategy = serde_json::from_str(r#""strict""#).unwrap();
        assert_eq!(value, MergeStrategy::Strict);
    }
}
