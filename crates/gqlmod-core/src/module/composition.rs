//! Composed views of a module graph.

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use gqlmod_di::{Injector, Provider, build_injector};
use tracing::{debug, trace};

use super::{Module, ModuleGraph};
use crate::config::CompositionConfig;
use crate::context::{ContextBuilder, ModuleContext, ModuleRequest, PartialContext};
use crate::error::{BoxError, CompositionError};
use crate::resolver::ResolverMap;
use crate::sdl::merge_fragments;
use crate::schema::build_schema;

/// One build of a module graph.
///
/// Type definitions, resolvers and providers are merged once when the
/// composition is created. Injectors and contexts are built fresh on every
/// call.
#[derive(Debug)]
pub struct Composition {
    graph: ModuleGraph,
    config: CompositionConfig,
    type_defs: String,
    resolvers: ResolverMap,
    providers: Vec<Provider>,
}

impl Composition {
    /// Resolves the graph of `root` and merges its static views.
    ///
    /// # Errors
    ///
    /// Graph errors (`CyclicImport`, `DuplicateModule`), `SchemaMerge` for
    /// conflicting SDL and `DuplicateResolver` under a strict resolver policy.
    pub fn new(root: &Module, config: CompositionConfig) -> Result<Self, CompositionError> {
        let graph = root.graph_with(&config)?;

        let fragments: Vec<_> = graph.modules().iter().map(Module::own_type_defs).collect();
        let type_defs = merge_fragments(&fragments)?;

        let mut resolvers = ResolverMap::new();
        for module in graph.modules() {
            resolvers.merge_from(&module.own_resolvers(), config.resolvers)?;
        }

        let providers: Vec<Provider> = graph
            .modules()
            .iter()
            .flat_map(Module::own_providers)
            .collect();

        debug!(
            root = %root.name(),
            modules = graph.len(),
            resolvers = resolvers.len(),
            providers = providers.len(),
            "Composed module graph"
        );

        Ok(Self {
            graph,
            config,
            type_defs,
            resolvers,
            providers,
        })
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Merged SDL, imports first.
    pub fn type_defs(&self) -> &str {
        &self.type_defs
    }

    /// Merged resolvers; importers override imports.
    pub fn resolvers(&self) -> &ResolverMap {
        &self.resolvers
    }

    /// Flattened providers, imports first.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Builds a fresh injector and initializes every provider.
    pub fn injector(&self) -> Result<Injector, CompositionError> {
        Ok(build_injector(&self.providers, self.config.providers)?)
    }

    pub fn schema(&self) -> Result<Schema, CompositionError> {
        build_schema(
            &self.type_defs,
            &self.resolvers,
            self.config.to_schema_limits(),
        )
    }

    /// The context builders of every module, folded into one.
    ///
    /// Builders run in graph order against the aggregate passed in plus
    /// everything contributed so far. The result holds only contributed
    /// fields, with an importer's fields overriding its imports'.
    pub fn context_builder(&self) -> ContextBuilder {
        compose_context_builders(&self.graph)
    }

    /// Builds the aggregate context for `request`.
    ///
    /// A fresh injector is created and an empty aggregate seeded with it,
    /// then the composed context builder runs and its result is merged in.
    ///
    /// # Errors
    ///
    /// Injector errors, or `ContextBuilder` naming the module whose builder
    /// failed. No partial context is returned.
    pub async fn context(&self, request: ModuleRequest) -> Result<ModuleContext, CompositionError> {
        let injector = Arc::new(self.injector()?);
        let request = Arc::new(request);
        let mut aggregate = ModuleContext::new(Arc::clone(&injector), Arc::clone(&request));

        let builders = module_builders(&self.graph);
        let partial = fold_context(&builders, request, aggregate.clone(), injector).await?;
        aggregate.merge(partial);

        debug!(
            request_id = %aggregate.request().request_id,
            fields = aggregate.fields().len(),
            "Request context built"
        );
        Ok(aggregate)
    }
}

/// Context builders of `graph`, in graph order, tagged with their module.
fn module_builders(graph: &ModuleGraph) -> Vec<(String, ContextBuilder)> {
    graph
        .modules()
        .iter()
        .filter_map(|module| {
            module
                .own_context_builder()
                .map(|builder| (module.name().to_string(), builder.clone()))
        })
        .collect()
}

/// One context builder running every builder of `graph`.
pub(crate) fn compose_context_builders(graph: &ModuleGraph) -> ContextBuilder {
    let builders = Arc::new(module_builders(graph));
    ContextBuilder::new(move |request, current, injector| {
        let builders = Arc::clone(&builders);
        async move {
            fold_context(&builders, request, current, injector)
                .await
                .map_err(BoxError::from)
        }
    })
}

/// Runs `builders` left to right.
///
/// Each builder sees `current` plus everything contributed before it, so an
/// importer can read what its imports produced. The returned partial holds
/// only contributed fields; on a key collision the later module wins.
async fn fold_context(
    builders: &[(String, ContextBuilder)],
    request: Arc<ModuleRequest>,
    current: ModuleContext,
    injector: Arc<Injector>,
) -> Result<PartialContext, CompositionError> {
    let mut aggregate = current;
    let mut contributed = PartialContext::new();

    for (module, builder) in builders {
        let partial = builder
            .call(Arc::clone(&request), aggregate.clone(), Arc::clone(&injector))
            .await
            .map_err(|source| CompositionError::ContextBuilder {
                module: module.clone(),
                source,
            })?;
        trace!(module = %module, fields = partial.len(), "Context builder finished");
        for (key, value) in partial {
            aggregate.insert(key.clone(), value.clone());
            contributed.insert(key, value);
        }
    }
    Ok(contributed)
}
