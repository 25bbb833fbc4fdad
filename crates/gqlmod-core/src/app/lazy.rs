//! Lazily built, invalidatable schema.
//!
//! `LazySchema` defers composing and building the schema until first access
//! and keeps the result until [`LazySchema::invalidate`] is called. A failed
//! build is remembered so that callers do not rebuild on every request. The
//! [`Composition`] the schema was built from is kept as well, so per-request
//! work (injector, context) does not merge the module graph again.

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::CompositionConfig;
use crate::error::CompositionError;
use crate::module::{Composition, Module};

/// State of the lazy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    /// Schema has not been built yet.
    Uninitialized,
    /// Schema is currently being built.
    Building,
    /// Schema is ready for use.
    Ready,
    /// Schema build failed.
    Failed,
}

/// Thread-safe lazy schema holder.
pub struct LazySchema {
    /// The cached schema (None if not built yet or invalidated).
    schema: RwLock<Option<Arc<Schema>>>,

    /// Merged module graph the schema is built from.
    composition: RwLock<Option<Arc<Composition>>>,

    /// Build lock to ensure only one build at a time.
    build_lock: Mutex<()>,

    /// Current state of the schema.
    state: RwLock<SchemaState>,

    root: Module,
    config: CompositionConfig,

    /// Last build error message (for diagnostics).
    last_error: RwLock<Option<String>>,
}

impl LazySchema {
    #[must_use]
    pub fn new(root: Module, config: CompositionConfig) -> Self {
        Self {
            schema: RwLock::new(None),
            composition: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            root,
            config,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the current state of the schema.
    pub async fn state(&self) -> SchemaState {
        *self.state.read().await
    }

    /// Gets the schema, building it if necessary.
    ///
    /// Concurrent callers wait for an in-progress build instead of starting
    /// another one.
    ///
    /// # Errors
    ///
    /// The composition or build error. A failed build is reported again on
    /// later calls until [`invalidate`](Self::invalidate) is called.
    pub async fn get_or_build(&self) -> Result<Arc<Schema>, CompositionError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().await;

        // Double-check after acquiring lock
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Failed {
            if let Some(err) = self.last_error.read().await.as_ref() {
                return Err(CompositionError::schema_build(err.clone()));
            }
        }

        *self.state.write().await = SchemaState::Building;
        info!(root = %self.root.name(), "Building GraphQL schema...");

        let built = match self.compose_locked().await {
            Ok(composition) => composition.schema(),
            Err(e) => Err(e),
        };
        match built {
            Ok(schema) => {
                let schema = Arc::new(schema);
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!("GraphQL schema built successfully");
                Ok(schema)
            }
            Err(e) => {
                let error_msg = e.to_string();
                warn!(error = %error_msg, "Failed to build GraphQL schema");
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(error_msg);
                Err(e)
            }
        }
    }

    /// Gets the composed module graph, composing it on first use.
    ///
    /// # Errors
    ///
    /// Graph and merge errors. These are not cached.
    pub async fn composition(&self) -> Result<Arc<Composition>, CompositionError> {
        if let Some(composition) = self.composition.read().await.clone() {
            return Ok(composition);
        }
        let _guard = self.build_lock.lock().await;
        self.compose_locked().await
    }

    /// Caller must hold `build_lock`.
    async fn compose_locked(&self) -> Result<Arc<Composition>, CompositionError> {
        if let Some(composition) = self.composition.read().await.clone() {
            return Ok(composition);
        }
        let composition = Arc::new(Composition::new(&self.root, self.config.clone())?);
        *self.composition.write().await = Some(Arc::clone(&composition));
        Ok(composition)
    }

    /// Gets the schema if it's already built, without triggering a build.
    pub async fn get(&self) -> Option<Arc<Schema>> {
        self.schema.read().await.clone()
    }

    /// Drops the cached schema; the next access rebuilds it.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;

        *self.schema.write().await = None;
        *self.composition.write().await = None;
        *self.state.write().await = SchemaState::Uninitialized;
        *self.last_error.write().await = None;

        info!("GraphQL schema invalidated - will rebuild on next request");
    }

    /// Returns the last build error, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Returns whether the schema is ready for use.
    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == SchemaState::Ready
    }
}

impl std::fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySchema")
            .field("root", &self.root.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Resolver, ResolverMap};

    fn query_module() -> Module {
        Module::builder("root")
            .type_defs("type Query { x: Int }")
            .resolvers(ResolverMap::new().field("Query", "x", Resolver::constant(42)))
            .build()
    }

    #[tokio::test]
    async fn test_builds_once_and_caches() {
        let lazy = LazySchema::new(query_module(), CompositionConfig::default());
        assert_eq!(lazy.state().await, SchemaState::Uninitialized);
        assert!(lazy.get().await.is_none());

        let first = lazy.get_or_build().await.unwrap();
        let second = lazy.get_or_build().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(lazy.is_ready().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let lazy = LazySchema::new(query_module(), CompositionConfig::default());
        let first = lazy.get_or_build().await.unwrap();

        lazy.invalidate().await;
        assert_eq!(lazy.state().await, SchemaState::Uninitialized);

        let second = lazy.get_or_build().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_composition_shared_with_schema_build() {
        let lazy = LazySchema::new(query_module(), CompositionConfig::default());
        lazy.get_or_build().await.unwrap();

        let first = lazy.composition().await.unwrap();
        let second = lazy.composition().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        lazy.invalidate().await;
        let third = lazy.composition().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[tokio::test]
    async fn test_failure_is_remembered() {
        let broken = Module::builder("broken").type_defs("type User { id: ID }").build();
        let lazy = LazySchema::new(broken, CompositionConfig::default());

        assert!(lazy.get_or_build().await.is_err());
        assert_eq!(lazy.state().await, SchemaState::Failed);
        assert!(lazy.last_error().await.unwrap().contains("query root type"));

        let err = lazy.get_or_build().await.unwrap_err();
        assert!(matches!(err, CompositionError::SchemaBuild(_)));
    }
}
