//! Error types for module composition.
//!
//! Composition errors surface when a computed view (typeDefs, resolvers,
//! providers, injector, schema, context) is evaluated. Building a module never
//! fails.

use async_graphql::ErrorExtensions;
use gqlmod_di::InjectorError;
use thiserror::Error;

/// Boxed error returned by user callbacks such as context builders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while composing modules.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// The import graph loops back on itself.
    #[error("Cyclic module import: {}", .path.join(" -> "))]
    CyclicImport {
        /// Module names along the cycle, first and last entries equal.
        path: Vec<String>,
    },

    /// Two different module instances share a name.
    #[error("Two different modules are named '{name}'")]
    DuplicateModule { name: String },

    /// A resolver path is declared twice under the strict merge strategy.
    #[error("Resolver {type_name}.{field} is defined more than once")]
    DuplicateResolver { type_name: String, field: String },

    /// Provider registration or lookup failed.
    #[error(transparent)]
    Injector(#[from] InjectorError),

    /// A module's context builder returned an error.
    #[error("Context builder of module '{module}' failed: {source}")]
    ContextBuilder {
        module: String,
        #[source]
        source: BoxError,
    },

    /// SDL fragments could not be parsed or merged.
    #[error("Failed to merge type definitions: {0}")]
    SchemaMerge(String),

    /// The merged SDL could not be turned into an executable schema.
    #[error("Failed to build GraphQL schema: {0}")]
    SchemaBuild(String),

    /// Invalid composition configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CompositionError {
    /// Create a new SchemaMerge error
    pub fn schema_merge(message: impl Into<String>) -> Self {
        Self::SchemaMerge(message.into())
    }

    /// Create a new SchemaBuild error
    pub fn schema_build(message: impl Into<String>) -> Self {
        Self::SchemaBuild(message.into())
    }

    /// Returns the error code used in GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CyclicImport { .. } => "CYCLIC_IMPORT",
            Self::DuplicateModule { .. } => "DUPLICATE_MODULE",
            Self::DuplicateResolver { .. } => "DUPLICATE_RESOLVER",
            Self::Injector(InjectorError::MissingProvider { .. }) => "MISSING_PROVIDER",
            Self::Injector(InjectorError::DuplicateProvider { .. }) => "DUPLICATE_PROVIDER",
            Self::Injector(_) => "INJECTOR_ERROR",
            Self::ContextBuilder { .. } => "CONTEXT_BUILDER_FAILED",
            Self::SchemaMerge(_) => "SCHEMA_MERGE_FAILED",
            Self::SchemaBuild(_) => "SCHEMA_BUILD_FAILED",
            Self::Config(_) => "INVALID_CONFIG",
        }
    }

    /// Whether the error happened while serving a request rather than while
    /// composing the module graph.
    #[must_use]
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::ContextBuilder { .. })
    }

    /// Converts to a GraphQL error carrying `extensions.code`.
    #[must_use]
    pub fn to_graphql_error(&self) -> async_graphql::Error {
        let code = self.error_code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| ext.set("code", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlmod_di::Token;

    #[test]
    fn test_cycle_message() {
        let err = CompositionError::CyclicImport {
            path: vec!["blog".into(), "users".into(), "blog".into()],
        };
        assert_eq!(err.to_string(), "Cyclic module import: blog -> users -> blog");
        assert_eq!(err.error_code(), "CYCLIC_IMPORT");
    }

    #[test]
    fn test_injector_error_codes() {
        let err: CompositionError =
            InjectorError::missing_provider(Token::named("mailer")).into();
        assert_eq!(err.error_code(), "MISSING_PROVIDER");
        assert_eq!(err.to_string(), "No provider registered for mailer");

        let err: CompositionError = InjectorError::DuplicateProvider {
            token: Token::named("mailer"),
        }
        .into();
        assert_eq!(err.error_code(), "DUPLICATE_PROVIDER");
    }

    #[test]
    fn test_context_builder_error_keeps_source() {
        let err = CompositionError::ContextBuilder {
            module: "auth".into(),
            source: "token expired".into(),
        };
        assert!(err.is_request_error());
        assert_eq!(
            err.to_string(),
            "Context builder of module 'auth' failed: token expired"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_graphql_error_has_code() {
        let err = CompositionError::schema_build("no Query type").to_graphql_error();
        assert_eq!(err.message, "Failed to build GraphQL schema: no Query type");
        let extensions = serde_json::to_value(&err.extensions).unwrap();
        assert_eq!(extensions["code"], "SCHEMA_BUILD_FAILED");
    }
}
