//! Resolver composition.
//!
//! A [`CompositionMap`] assigns chains of [`Composer`]s to resolver paths. A
//! path is either `Type.field` or `Type.*`; the wildcard covers every field of
//! `Type` that has no explicit entry of its own.
//!
//! For a chain `[f, g]` the composed resolver is `f(g(original))`: `f` is the
//! outermost wrapper and runs first.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::resolver::{Resolver, ResolverMap, ResolverParams, ResolverResult};

const WILDCARD: &str = "*";

/// Resolver middleware: takes the next resolver and returns a wrapped one.
#[derive(Clone)]
pub struct Composer(Arc<dyn Fn(Resolver) -> Resolver + Send + Sync>);

impl Composer {
    pub fn new<F>(compose: F) -> Self
    where
        F: Fn(Resolver) -> Resolver + Send + Sync + 'static,
    {
        Self(Arc::new(compose))
    }

    /// Middleware written as `(params, next) -> future`.
    ///
    /// ```ignore
    /// let logged = Composer::around(|params, next| async move {
    ///     tracing::info!(field = %params.info.path(), "resolving");
    ///     next.call(params).await
    /// });
    /// ```
    pub fn around<F, Fut>(middleware: F) -> Self
    where
        F: Fn(ResolverParams, Resolver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        let middleware = Arc::new(middleware);
        Self::new(move |next: Resolver| {
            let middleware = Arc::clone(&middleware);
            Resolver::new(move |params: ResolverParams| middleware(params, next.clone()))
        })
    }

    /// Middleware that runs `check` first and only calls the wrapped resolver
    /// when it succeeds.
    pub fn guard<F>(check: F) -> Self
    where
        F: Fn(&ResolverParams) -> Result<(), async_graphql::Error> + Send + Sync + 'static,
    {
        let check = Arc::new(check);
        Self::around(move |params, next| {
            let outcome = check(&params);
            async move {
                outcome?;
                next.call(params).await
            }
        })
    }

    /// Maps the wrapped resolver's successful output.
    pub fn map<F>(transform: F) -> Self
    where
        F: Fn(serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        let transform = Arc::new(transform);
        Self::around(move |params, next| {
            let transform = Arc::clone(&transform);
            async move { next.call(params).await.map(|value| transform(value)) }
        })
    }

    pub fn apply(&self, resolver: Resolver) -> Resolver {
        (self.0)(resolver)
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Composer")
    }
}

/// Wraps `resolver` with `chain`, first-listed outermost.
pub fn wrap(resolver: Resolver, chain: &[Composer]) -> Resolver {
    chain
        .iter()
        .rev()
        .fold(resolver, |inner, composer| composer.apply(inner))
}

/// Ordered mapping from resolver path to composer chain.
#[derive(Debug, Clone, Default)]
pub struct CompositionMap {
    entries: IndexMap<String, Vec<Composer>>,
}

impl CompositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn path(mut self, path: impl Into<String>, chain: Vec<Composer>) -> Self {
        self.insert(path, chain);
        self
    }

    /// Sets the chain for `path`, keeping its original position if it was
    /// already present.
    pub fn insert(&mut self, path: impl Into<String>, chain: Vec<Composer>) {
        self.entries.insert(path.into(), chain);
    }

    pub fn get(&self, path: &str) -> Option<&[Composer]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn has_explicit(&self, type_name: &str, field_name: &str) -> bool {
        self.entries.contains_key(&format!("{type_name}.{field_name}"))
    }
}

fn split_path(path: &str) -> Option<(&str, &str)> {
    let (type_name, field_name) = path.split_once('.')?;
    if type_name.is_empty() || field_name.is_empty() || field_name.contains('.') {
        return None;
    }
    Some((type_name, field_name))
}

/// Applies `mapping` to a copy of `resolvers`.
///
/// Entries are applied in insertion order. A wildcard entry never touches a
/// field that has an explicit entry, wherever that entry sits in the mapping.
/// Paths that match nothing are skipped.
pub fn compose_resolvers(resolvers: &ResolverMap, mapping: &CompositionMap) -> ResolverMap {
    let mut composed = resolvers.clone();

    for (path, chain) in &mapping.entries {
        let Some((type_name, field_name)) = split_path(path) else {
            warn!(path = %path, "Ignoring malformed resolver composition path");
            continue;
        };

        if field_name == WILDCARD {
            let fields: Vec<String> = composed
                .field_names(type_name)
                .into_iter()
                .filter(|field| !mapping.has_explicit(type_name, field))
                .collect();
            if fields.is_empty() {
                debug!(path = %path, "Resolver composition matched no fields");
            }
            for field in fields {
                if let Some(resolver) = composed.get_mut(type_name, &field) {
                    *resolver = wrap(resolver.clone(), chain);
                }
            }
            continue;
        }

        match composed.get_mut(type_name, field_name) {
            Some(resolver) => *resolver = wrap(resolver.clone(), chain),
            None => debug!(path = %path, "Resolver composition matched no fields"),
        }
    }

    composed
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use super::*;
    use crate::resolver::FieldInfo;

    fn call_params(type_name: &str, field: &str) -> ResolverParams {
        ResolverParams::new(FieldInfo::new(type_name, field))
    }

    fn recording(label: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Composer {
        Composer::around(move |params, next| {
            log.lock().unwrap().push(label);
            async move { next.call(params).await }
        })
    }

    fn suffix(tag: &'static str) -> Composer {
        Composer::map(move |value| json!(format!("{}{tag}", value.as_str().unwrap_or(""))))
    }

    #[tokio::test]
    async fn test_chain_order_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let map = ResolverMap::new().field("Query", "x", Resolver::constant("v"));
        let mapping = CompositionMap::new().path(
            "Query.x",
            vec![recording("f", Arc::clone(&log)), recording("g", Arc::clone(&log))],
        );

        let composed = compose_resolvers(&map, &mapping);
        composed
            .get("Query", "x")
            .unwrap()
            .call(call_params("Query", "x"))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["f", "g"]);
    }

    #[tokio::test]
    async fn test_chain_is_f_of_g_of_original() {
        // f(g(original)): g sees the original output first, f sees g's.
        let map = ResolverMap::new().field("Query", "x", Resolver::constant("v"));
        let mapping = CompositionMap::new().path("Query.x", vec![suffix("-f"), suffix("-g")]);

        let composed = compose_resolvers(&map, &mapping);
        let value = composed
            .get("Query", "x")
            .unwrap()
            .call(call_params("Query", "x"))
            .await
            .unwrap();
        assert_eq!(value, json!("v-g-f"));
    }

    #[tokio::test]
    async fn test_wildcard_skips_explicit_entries_in_any_order() {
        let map = ResolverMap::new()
            .field("Query", "a", Resolver::constant("a"))
            .field("Query", "b", Resolver::constant("b"))
            .field("Query", "c", Resolver::constant("c"));

        // Explicit entry declared after the wildcard.
        let mapping = CompositionMap::new()
            .path("Query.*", vec![suffix("-all")])
            .path("Query.b", vec![suffix("-own")]);

        let composed = compose_resolvers(&map, &mapping);
        let mut results = Vec::new();
        for field in ["a", "b", "c"] {
            let value = composed
                .get("Query", field)
                .unwrap()
                .call(call_params("Query", field))
                .await
                .unwrap();
            results.push(value);
        }
        assert_eq!(results, vec![json!("a-all"), json!("b-own"), json!("c-all")]);
    }

    #[test]
    fn test_unmatched_paths_are_noops() {
        let original = Resolver::constant(1);
        let map = ResolverMap::new().field("Query", "x", original.clone());
        let mapping = CompositionMap::new()
            .path("Missing.x", vec![suffix("-m")])
            .path("Query.y", vec![suffix("-y")])
            .path("Missing.*", vec![suffix("-w")])
            .path("not-a-path", vec![suffix("-n")]);

        let composed = compose_resolvers(&map, &mapping);
        assert_eq!(composed.len(), 1);
        assert!(Resolver::ptr_eq(composed.get("Query", "x").unwrap(), &original));
    }

    #[test]
    fn test_input_map_is_untouched() {
        let original = Resolver::constant(1);
        let map = ResolverMap::new().field("Query", "x", original.clone());
        let mapping = CompositionMap::new().path("Query.x", vec![suffix("-f")]);

        let composed = compose_resolvers(&map, &mapping);
        assert!(Resolver::ptr_eq(map.get("Query", "x").unwrap(), &original));
        assert!(!Resolver::ptr_eq(composed.get("Query", "x").unwrap(), &original));
    }

    #[tokio::test]
    async fn test_guard_short_circuits() {
        let map = ResolverMap::new().field("Query", "secret", Resolver::constant("s3cr3t"));
        let mapping = CompositionMap::new().path(
            "Query.secret",
            vec![Composer::guard(|params| {
                if params.context.get("user").is_some() {
                    Ok(())
                } else {
                    Err(async_graphql::Error::new("Unauthorized"))
                }
            })],
        );

        let composed = compose_resolvers(&map, &mapping);
        let err = composed
            .get("Query", "secret")
            .unwrap()
            .call(call_params("Query", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Unauthorized");

        let mut context = crate::context::ModuleContext::empty();
        context.insert("user", Value::from("ada"));
        let value = composed
            .get("Query", "secret")
            .unwrap()
            .call(call_params("Query", "secret").with_context(Arc::new(context)))
            .await
            .unwrap();
        assert_eq!(value, json!("s3cr3t"));
    }
}
