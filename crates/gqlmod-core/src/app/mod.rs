//! Application assembly.
//!
//! An [`Application`] takes the root modules of a server and exposes one
//! schema and one per-request context factory. The schema is built once and
//! cached; the injector and the context are built fresh for every request.

mod lazy;

pub use lazy::{LazySchema, SchemaState};

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_graphql::{Pos, Request, Response};
use tracing::{debug, instrument};

use crate::config::CompositionConfig;
use crate::context::{ModuleContext, ModuleRequest};
use crate::error::CompositionError;
use crate::module::{Composition, Module, ModuleGraph};

/// Name of the synthetic module that imports the application's root modules.
pub const APP_MODULE_NAME: &str = "__app__";

/// Top-level entry: root modules in, schema and context out.
#[derive(Debug)]
pub struct Application {
    root: Module,
    config: CompositionConfig,
    schema: LazySchema,
}

impl Application {
    pub fn new(modules: Vec<Module>) -> Self {
        Self::with_config(modules, CompositionConfig::default())
    }

    pub fn with_config(modules: Vec<Module>, config: CompositionConfig) -> Self {
        let root = Module::builder(APP_MODULE_NAME).imports(modules).build();
        Self {
            schema: LazySchema::new(root.clone(), config.clone()),
            root,
            config,
        }
    }

    /// Synthetic root module.
    pub fn root(&self) -> &Module {
        &self.root
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Composes the module graph without building the schema.
    pub fn compose(&self) -> Result<Composition, CompositionError> {
        self.root.compose(&self.config)
    }

    /// Modules in dependency order, ending with the synthetic root.
    pub fn graph(&self) -> Result<ModuleGraph, CompositionError> {
        self.root.graph_with(&self.config)
    }

    /// Merged SDL of every module.
    pub fn type_defs(&self) -> Result<String, CompositionError> {
        Ok(self.compose()?.type_defs().to_string())
    }

    /// The executable schema, built on first use.
    pub async fn schema(&self) -> Result<Arc<Schema>, CompositionError> {
        self.schema.get_or_build().await
    }

    pub async fn schema_state(&self) -> SchemaState {
        self.schema.state().await
    }

    /// Last schema build error, for diagnostics.
    pub async fn last_error(&self) -> Option<String> {
        self.schema.last_error().await
    }

    /// Drops the cached schema so the next request rebuilds it.
    pub async fn invalidate(&self) {
        self.schema.invalidate().await;
    }

    /// Builds the aggregate context for one request.
    ///
    /// The module graph is merged once and cached with the schema; the
    /// injector and the context are new for every call.
    pub async fn context(&self, request: ModuleRequest) -> Result<ModuleContext, CompositionError> {
        self.schema.composition().await?.context(request).await
    }

    /// Builds the request context and runs `query` against the schema.
    ///
    /// Composition and context failures are reported as GraphQL errors with
    /// an `extensions.code`.
    #[instrument(skip_all, fields(request_id = %request.request_id))]
    pub async fn execute(&self, request: ModuleRequest, query: impl Into<Request>) -> Response {
        let schema = match self.schema().await {
            Ok(schema) => schema,
            Err(e) => return error_response(&e),
        };
        let context = match self.context(request).await {
            Ok(context) => context,
            Err(e) => return error_response(&e),
        };

        let response = schema.execute(query.into().data(Arc::new(context))).await;
        debug!(errors = response.errors.len(), "Operation executed");
        response
    }
}

fn error_response(error: &CompositionError) -> Response {
    Response::from_errors(vec![error.to_graphql_error().into_server_error(Pos::default())])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::context::{ContextBuilder, PartialContext};
    use crate::resolver::{Resolver, ResolverMap};

    #[tokio::test]
    async fn test_execute_end_to_end() {
        let module = Module::builder("numbers")
            .type_defs("type Query { x: Int }")
            .resolvers(ResolverMap::new().field("Query", "x", Resolver::constant(42)))
            .build();
        let app = Application::new(vec![module]);

        let response = app.execute(ModuleRequest::new(), "{ x }").await;
        assert!(response.errors.is_empty());
        assert_eq!(response.data.into_json().unwrap(), json!({"x": 42}));
    }

    #[tokio::test]
    async fn test_graph_includes_synthetic_root_last() {
        let users = Module::builder("users").build();
        let app = Application::new(vec![users]);
        let graph = app.graph().unwrap();
        assert_eq!(graph.names(), vec!["users", APP_MODULE_NAME]);
    }

    #[tokio::test]
    async fn test_context_failure_becomes_error_response() {
        let module = Module::builder("auth")
            .type_defs("type Query { x: Int }")
            .context(ContextBuilder::new(|_, _, _| async {
                Err::<PartialContext, _>("no token".into())
            }))
            .build();
        let app = Application::new(vec![module]);

        let response = app.execute(ModuleRequest::new(), "{ x }").await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].message,
            "Context builder of module 'auth' failed: no token"
        );
        let extensions = serde_json::to_value(&response.errors[0].extensions).unwrap();
        assert_eq!(extensions["code"], "CONTEXT_BUILDER_FAILED");
    }

    #[tokio::test]
    async fn test_requests_reuse_the_composition() {
        let merges = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&merges);
        let module = Module::builder("numbers")
            .type_defs_with(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                "type Query { x: Int }".into()
            })
            .resolvers(ResolverMap::new().field("Query", "x", Resolver::constant(1)))
            .build();
        let app = Application::new(vec![module]);

        for _ in 0..3 {
            let response = app.execute(ModuleRequest::new(), "{ x }").await;
            assert!(response.errors.is_empty());
        }
        assert_eq!(merges.load(Ordering::SeqCst), 1);

        let first = app.context(ModuleRequest::new()).await.unwrap();
        let second = app.context(ModuleRequest::new()).await.unwrap();
        assert!(!Arc::ptr_eq(first.injector(), second.injector()));
        assert_eq!(merges.load(Ordering::SeqCst), 1);

        app.invalidate().await;
        app.execute(ModuleRequest::new(), "{ x }").await;
        assert_eq!(merges.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_schema_is_cached_until_invalidated() {
        let module = Module::builder("numbers")
            .type_defs("type Query { x: Int }")
            .build();
        let app = Application::new(vec![module]);

        let first = app.schema().await.unwrap();
        let second = app.schema().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(app.schema_state().await, SchemaState::Ready);

        app.invalidate().await;
        let third = app.schema().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
