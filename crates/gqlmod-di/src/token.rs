//! Injection tokens.

use std::any::TypeId;
use std::fmt;

/// Key under which a provider is registered in an [`Injector`](crate::Injector).
///
/// Three flavours exist:
/// - `Type` tokens are derived from a Rust type and are what class providers use.
/// - `Named` tokens are free-form identifiers for values and interface bindings.
/// - `ModuleConfig` tokens carry one module's configuration and are registered
///   automatically, one per module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Token derived from a concrete type.
    Type {
        /// Type identity.
        id: TypeId,
        /// Type name, for diagnostics.
        name: &'static str,
    },
    /// Explicit string identifier.
    Named(String),
    /// Configuration of the module with the given name.
    ModuleConfig(String),
}

impl Token {
    /// Token for the type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Named token.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Configuration token of the module called `module`.
    #[must_use]
    pub fn module_config(module: impl Into<String>) -> Self {
        Self::ModuleConfig(module.into())
    }

    /// Returns true for module configuration tokens.
    #[must_use]
    pub fn is_module_config(&self) -> bool {
        matches!(self, Self::ModuleConfig(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name, .. } => write!(f, "{name}"),
            Self::Named(name) => write!(f, "{name}"),
            Self::ModuleConfig(module) => write!(f, "ModuleConfig({module})"),
        }
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mailer;

    #[test]
    fn test_type_tokens_are_stable() {
        assert_eq!(Token::of::<Mailer>(), Token::of::<Mailer>());
        assert_ne!(Token::of::<Mailer>(), Token::of::<String>());
    }

    #[test]
    fn test_module_config_differs_from_named() {
        assert_ne!(Token::module_config("users"), Token::named("users"));
        assert!(Token::module_config("users").is_module_config());
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::module_config("blog").to_string(), "ModuleConfig(blog)");
        assert_eq!(Token::named("db").to_string(), "db");
        assert!(Token::of::<Mailer>().to_string().ends_with("Mailer"));
    }
}
