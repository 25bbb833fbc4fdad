//! Resolver functions and resolver maps.
//!
//! A [`Resolver`] is a cloneable async function from [`ResolverParams`] to a
//! JSON value. A [`ResolverMap`] indexes resolvers by type name, then field
//! name, in declaration order.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use gqlmod_di::MergeStrategy;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use crate::context::ModuleContext;
use crate::error::CompositionError;

/// Result of a resolver invocation.
pub type ResolverResult = Result<Value, async_graphql::Error>;

/// Which field is being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub type_name: String,
    pub field_name: String,
}

impl FieldInfo {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }

    /// `Type.field` path of this field.
    pub fn path(&self) -> String {
        format!("{}.{}", self.type_name, self.field_name)
    }
}

/// Everything a resolver receives.
#[derive(Debug, Clone)]
pub struct ResolverParams {
    /// Value returned by the parent field; `null` on root types.
    pub parent: Value,

    /// Field arguments after variable substitution and defaults.
    pub args: Map<String, Value>,

    /// Aggregate context of the request.
    pub context: Arc<ModuleContext>,

    /// Field being resolved.
    pub info: FieldInfo,
}

impl ResolverParams {
    /// Params with a null parent, no arguments and an empty context.
    pub fn new(info: FieldInfo) -> Self {
        Self {
            parent: Value::Null,
            args: Map::new(),
            context: Arc::new(ModuleContext::empty()),
            info,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Value) -> Self {
        self.parent = parent;
        self
    }

    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: Arc<ModuleContext>) -> Self {
        self.context = context;
        self
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// String argument, or an error naming the missing argument.
    pub fn required_str(&self, name: &str) -> Result<&str, async_graphql::Error> {
        self.args
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| async_graphql::Error::new(format!("Missing required argument '{name}'")))
    }
}

type ResolverFn = dyn Fn(ResolverParams) -> BoxFuture<'static, ResolverResult> + Send + Sync;

/// Async field resolver.
#[derive(Clone)]
pub struct Resolver(Arc<ResolverFn>);

impl Resolver {
    pub fn new<F, Fut>(resolver: F) -> Self
    where
        F: Fn(ResolverParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self(Arc::new(move |params| resolver(params).boxed()))
    }

    /// Resolver from a synchronous function.
    pub fn from_fn<F>(resolver: F) -> Self
    where
        F: Fn(ResolverParams) -> ResolverResult + Send + Sync + 'static,
    {
        Self(Arc::new(move |params| {
            futures_util::future::ready(resolver(params)).boxed()
        }))
    }

    /// Resolver that always returns `value`.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::from_fn(move |_| Ok(value.clone()))
    }

    /// Reads the field's own name from the parent object.
    pub fn parent_field() -> Self {
        Self::from_fn(|params| {
            Ok(params
                .parent
                .get(&params.info.field_name)
                .cloned()
                .unwrap_or(Value::Null))
        })
    }

    pub fn call(&self, params: ResolverParams) -> BoxFuture<'static, ResolverResult> {
        (self.0)(params)
    }

    /// Whether both handles point at the same function.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver")
    }
}

/// Resolvers by type name, then field name.
#[derive(Debug, Clone, Default)]
pub struct ResolverMap {
    types: IndexMap<String, IndexMap<String, Resolver>>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn field(mut self, type_name: &str, field_name: &str, resolver: Resolver) -> Self {
        self.insert(type_name, field_name, resolver);
        self
    }

    /// Sets a resolver, returning the one it replaced.
    pub fn insert(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: Resolver,
    ) -> Option<Resolver> {
        self.types
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), resolver)
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&Resolver> {
        self.types.get(type_name)?.get(field_name)
    }

    pub(crate) fn get_mut(&mut self, type_name: &str, field_name: &str) -> Option<&mut Resolver> {
        self.types.get_mut(type_name)?.get_mut(field_name)
    }

    /// Resolvers of one type, if any.
    pub fn type_fields(&self, type_name: &str) -> Option<&IndexMap<String, Resolver>> {
        self.types.get(type_name)
    }

    /// Field names declared for `type_name`, in declaration order.
    pub fn field_names(&self, type_name: &str) -> Vec<String> {
        self.types
            .get(type_name)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Every `(type, field)` pair, in declaration order.
    pub fn paths(&self) -> Vec<(String, String)> {
        self.types
            .iter()
            .flat_map(|(type_name, fields)| {
                fields
                    .keys()
                    .map(move |field| (type_name.clone(), field.clone()))
            })
            .collect()
    }

    pub fn contains(&self, type_name: &str, field_name: &str) -> bool {
        self.get(type_name, field_name).is_some()
    }

    /// Number of field resolvers.
    pub fn len(&self) -> usize {
        self.types.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every resolver of `other` into `self`.
    ///
    /// On a `Type.field` collision the resolver from `other` wins, unless
    /// `strategy` is `Strict`.
    pub fn merge_from(
        &mut self,
        other: &ResolverMap,
        strategy: MergeStrategy,
    ) -> Result<(), CompositionError> {
        for (type_name, fields) in &other.types {
            for (field_name, resolver) in fields {
                if self.contains(type_name, field_name) {
                    match strategy {
                        MergeStrategy::Strict => {
                            return Err(CompositionError::DuplicateResolver {
                                type_name: type_name.clone(),
                                field: field_name.clone(),
                            });
                        }
                        MergeStrategy::Warn => {
                            warn!(
                                type_name = %type_name,
                                field = %field_name,
                                "Resolver overridden by a later module"
                            );
                        }
                        MergeStrategy::Override => {}
                    }
                }
                self.insert(type_name.clone(), field_name.clone(), resolver.clone());
            }
        }
        Ok(())
    }
}

/// Merges resolver maps in order; later maps override earlier ones.
pub fn merge_resolvers<'a>(
    maps: impl IntoIterator<Item = &'a ResolverMap>,
    strategy: MergeStrategy,
) -> Result<ResolverMap, CompositionError> {
    let mut merged = ResolverMap::new();
    for map in maps {
        merged.merge_from(map, strategy)?;
    }
    Ok(merged)
}
