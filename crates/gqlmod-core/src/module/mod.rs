//! GraphQL modules.
//!
//! A [`Module`] bundles a slice of schema, resolvers, providers, a context
//! builder and a list of imported modules. Modules are immutable: the only
//! way to change one is [`Module::with_config`], which returns a new module
//! sharing the same options.
//!
//! Everything that depends on the import graph (merged type definitions,
//! merged resolvers, flattened providers, injector, schema, request context)
//! is computed by a [`Composition`]. Building a module never fails; errors
//! surface when one of those views is evaluated.
//!
//! # Example
//!
//! ```ignore
//! let users = Module::builder("users")
//!     .type_defs("type Query { me: User } type User { id: ID! }")
//!     .resolvers(ResolverMap::new().field("Query", "me", me_resolver))
//!     .providers(vec![Provider::class::<UserStore>()])
//!     .build();
//!
//! let blog = Module::builder("blog")
//!     .imports(vec![users.clone()])
//!     .type_defs("type Post { author: User } extend type Query { posts: [Post!]! }")
//!     .build();
//!
//! let schema = blog.schema()?;
//! ```

mod composition;
mod graph;

pub use composition::Composition;
use composition::compose_context_builders;
pub use graph::ModuleGraph;

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use gqlmod_di::{Injector, Provider, Token};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::compose::{Composer, CompositionMap, compose_resolvers};
use crate::config::CompositionConfig;
use crate::context::{ContextBuilder, ModuleContext, ModuleRequest};
use crate::error::CompositionError;
use crate::resolver::ResolverMap;
use crate::typedefs::TypeDefs;

/// An option given either as a value or as a function of the module config.
pub enum Configurable<T> {
    Literal(T),
    Computed(Arc<dyn Fn(&Value) -> T + Send + Sync>),
}

impl<T: Clone> Configurable<T> {
    /// Materializes the option against `config`.
    pub fn resolve(&self, config: &Value) -> T {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(compute) => compute(config),
        }
    }
}

impl<T: Default> Default for Configurable<T> {
    fn default() -> Self {
        Self::Literal(T::default())
    }
}

impl<T: Clone> Clone for Configurable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Computed(compute) => Self::Computed(Arc::clone(compute)),
        }
    }
}

impl<T> fmt::Debug for Configurable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => f.write_str("Literal"),
            Self::Computed(_) => f.write_str("Computed"),
        }
    }
}

#[derive(Debug)]
struct ModuleOptions {
    name: String,
    type_defs: Configurable<TypeDefs>,
    resolvers: Configurable<ResolverMap>,
    composition: CompositionMap,
    providers: Configurable<Vec<Provider>>,
    imports: Configurable<Vec<Module>>,
    context: Option<ContextBuilder>,
}

/// Unit of composition.
#[derive(Clone)]
pub struct Module {
    options: Arc<ModuleOptions>,
    config: Arc<Value>,
}

impl Module {
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Deserializes the module config into `T`.
    pub fn config_as<T: DeserializeOwned>(&self) -> Result<T, CompositionError> {
        serde_json::from_value(self.config.as_ref().clone()).map_err(|e| {
            CompositionError::Config(format!("module '{}': {e}", self.options.name))
        })
    }

    /// New module with the same options bound to `config`.
    #[must_use]
    pub fn with_config(&self, config: Value) -> Self {
        Self {
            options: Arc::clone(&self.options),
            config: Arc::new(config),
        }
    }

    /// Whether both modules were built by the same builder.
    pub fn shares_options(&self, other: &Module) -> bool {
        Arc::ptr_eq(&self.options, &other.options)
    }

    /// Same options and equal config.
    pub(crate) fn is_same(&self, other: &Module) -> bool {
        self.shares_options(other) && self.config == other.config
    }

    /// Token under which this module's config is provided.
    pub fn config_token(&self) -> Token {
        Token::module_config(self.name())
    }

    /// Directly imported modules, resolved against this module's config.
    pub fn imports(&self) -> Vec<Module> {
        self.options.imports.resolve(&self.config)
    }

    /// This module's own type definitions.
    pub fn own_type_defs(&self) -> TypeDefs {
        self.options.type_defs.resolve(&self.config)
    }

    /// This module's own resolvers, with its resolver composition applied.
    pub fn own_resolvers(&self) -> ResolverMap {
        let resolvers = self.options.resolvers.resolve(&self.config);
        if self.options.composition.is_empty() {
            resolvers
        } else {
            compose_resolvers(&resolvers, &self.options.composition)
        }
    }

    /// The auto-registered config provider followed by the declared providers.
    pub fn own_providers(&self) -> Vec<Provider> {
        let mut providers = vec![Provider::value(
            self.config_token(),
            self.config.as_ref().clone(),
        )];
        providers.extend(self.options.providers.resolve(&self.config));
        providers
    }

    /// This module's own context builder, if it declares one.
    pub fn own_context_builder(&self) -> Option<&ContextBuilder> {
        self.options.context.as_ref()
    }

    /// Resolves the import graph under `config`.
    pub fn graph_with(&self, config: &CompositionConfig) -> Result<ModuleGraph, CompositionError> {
        ModuleGraph::resolve(self, config.providers)
    }

    /// Resolves the import graph with the default configuration.
    pub fn graph(&self) -> Result<ModuleGraph, CompositionError> {
        self.graph_with(&CompositionConfig::default())
    }

    /// Builds every composed view of this module under `config`.
    pub fn compose(&self, config: &CompositionConfig) -> Result<Composition, CompositionError> {
        Composition::new(self, config.clone())
    }

    /// Merged SDL of this module and all its imports.
    pub fn type_defs(&self) -> Result<String, CompositionError> {
        Ok(self.compose(&CompositionConfig::default())?.type_defs().to_string())
    }

    /// Merged resolvers of this module and all its imports.
    pub fn resolvers(&self) -> Result<ResolverMap, CompositionError> {
        Ok(self.compose(&CompositionConfig::default())?.resolvers().clone())
    }

    /// Flattened providers, imports first.
    pub fn providers(&self) -> Result<Vec<Provider>, CompositionError> {
        Ok(self.compose(&CompositionConfig::default())?.providers().to_vec())
    }

    /// Fresh injector holding every provider of the graph.
    pub fn injector(&self) -> Result<Injector, CompositionError> {
        self.compose(&CompositionConfig::default())?.injector()
    }

    /// Executable schema built from the merged SDL and resolvers.
    pub fn schema(&self) -> Result<Schema, CompositionError> {
        self.compose(&CompositionConfig::default())?.schema()
    }

    /// Context builder of this module and all its imports: imports run
    /// first, and the own builder's fields are merged last.
    pub fn context_builder(&self) -> Result<ContextBuilder, CompositionError> {
        Ok(compose_context_builders(&self.graph()?))
    }

    /// Builds the aggregate context for one request.
    pub async fn context(&self, request: ModuleRequest) -> Result<ModuleContext, CompositionError> {
        self.compose(&CompositionConfig::default())?
            .context(request)
            .await
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.options.name)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`Module`].
#[derive(Debug)]
pub struct ModuleBuilder {
    options: ModuleOptions,
    config: Value,
}

impl ModuleBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            options: ModuleOptions {
                name: name.into(),
                type_defs: Configurable::default(),
                resolvers: Configurable::default(),
                composition: CompositionMap::new(),
                providers: Configurable::default(),
                imports: Configurable::default(),
                context: None,
            },
            config: Value::Null,
        }
    }

    #[must_use]
    pub fn type_defs(mut self, type_defs: impl Into<TypeDefs>) -> Self {
        self.options.type_defs = Configurable::Literal(type_defs.into());
        self
    }

    #[must_use]
    pub fn type_defs_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Value) -> TypeDefs + Send + Sync + 'static,
    {
        self.options.type_defs = Configurable::Computed(Arc::new(compute));
        self
    }

    #[must_use]
    pub fn resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.options.resolvers = Configurable::Literal(resolvers);
        self
    }

    #[must_use]
    pub fn resolvers_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Value) -> ResolverMap + Send + Sync + 'static,
    {
        self.options.resolvers = Configurable::Computed(Arc::new(compute));
        self
    }

    /// Wraps the resolvers at `path` (`Type.field` or `Type.*`) with `chain`,
    /// first composer outermost.
    #[must_use]
    pub fn compose(mut self, path: impl Into<String>, chain: Vec<Composer>) -> Self {
        self.options.composition.insert(path, chain);
        self
    }

    #[must_use]
    pub fn composition(mut self, composition: CompositionMap) -> Self {
        self.options.composition = composition;
        self
    }

    #[must_use]
    pub fn providers(mut self, providers: Vec<Provider>) -> Self {
        self.options.providers = Configurable::Literal(providers);
        self
    }

    #[must_use]
    pub fn providers_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Value) -> Vec<Provider> + Send + Sync + 'static,
    {
        self.options.providers = Configurable::Computed(Arc::new(compute));
        self
    }

    #[must_use]
    pub fn imports(mut self, imports: Vec<Module>) -> Self {
        self.options.imports = Configurable::Literal(imports);
        self
    }

    #[must_use]
    pub fn imports_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Value) -> Vec<Module> + Send + Sync + 'static,
    {
        self.options.imports = Configurable::Computed(Arc::new(compute));
        self
    }

    #[must_use]
    pub fn context(mut self, builder: ContextBuilder) -> Self {
        self.options.context = Some(builder);
        self
    }

    #[must_use]
    pub fn config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Module {
        Module {
            options: Arc::new(self.options),
            config: Arc::new(self.config),
        }
    }
}
