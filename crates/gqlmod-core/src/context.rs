//! Per-request context.
//!
//! Every module may contribute a [`ContextBuilder`]. For one request the
//! builders of the whole module graph are folded, imports first, into a single
//! [`ModuleContext`] that resolvers receive. The context always carries the
//! request's [`Injector`] and the [`ModuleRequest`] it was built for.
//!
//! # Example
//!
//! ```ignore
//! let auth = ContextBuilder::new(|request, _current, _injector| async move {
//!     let mut partial = PartialContext::new();
//!     if let Some(token) = request.header("authorization") {
//!         partial.insert("token".into(), token.into());
//!     }
//!     Ok(partial)
//! });
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use gqlmod_di::{Injector, Token};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::BoxError;

/// Fields contributed by one context builder.
pub type PartialContext = Map<String, Value>;

/// Incoming operation, as seen by context builders.
///
/// Transport adapters fill this in; the composition layer only reads it.
#[derive(Debug, Clone)]
pub struct ModuleRequest {
    /// Request ID for tracing and correlation.
    pub request_id: String,

    /// Request headers, keys lower-cased.
    pub headers: BTreeMap<String, String>,

    /// Free-form values set by the transport.
    pub extensions: Map<String, Value>,
}

impl Default for ModuleRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRequest {
    /// Creates a request with a fresh random ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            headers: BTreeMap::new(),
            extensions: Map::new(),
        }
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Adds a header. Header names are case-insensitive.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds an extension value.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Looks a header up, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Aggregate context of one request.
#[derive(Clone)]
pub struct ModuleContext {
    injector: Arc<Injector>,
    request: Arc<ModuleRequest>,
    fields: Map<String, Value>,
}

impl ModuleContext {
    /// Seeds an aggregate holding only the injector and the request.
    #[must_use]
    pub fn new(injector: Arc<Injector>, request: Arc<ModuleRequest>) -> Self {
        Self {
            injector,
            request,
            fields: Map::new(),
        }
    }

    /// Context with an empty injector, used when a schema is executed
    /// without going through a module's context pipeline.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Arc::new(Injector::new()), Arc::new(ModuleRequest::new()))
    }

    pub fn injector(&self) -> &Arc<Injector> {
        &self.injector
    }

    pub fn request(&self) -> &Arc<ModuleRequest> {
        &self.request
    }

    /// Contributed fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Deserializes a field into `T`. Returns `None` if the field is absent or
    /// does not have the expected shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Shortcut for resolving a type-token provider from the injector.
    pub fn resolve<T: std::any::Any + Send + Sync>(&self) -> gqlmod_di::Result<Arc<T>> {
        self.injector.resolve::<T>()
    }

    /// Shortcut for a token lookup in the injector.
    pub fn provider<T: std::any::Any + Send + Sync>(
        &self,
        token: &Token,
    ) -> gqlmod_di::Result<Arc<T>> {
        self.injector.get::<T>(token)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Merges `partial` into the aggregate; incoming fields overwrite.
    pub fn merge(&mut self, partial: PartialContext) {
        for (key, value) in partial {
            self.fields.insert(key, value);
        }
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("request_id", &self.request.request_id)
            .field("injector", &self.injector)
            .field("fields", &self.fields)
            .finish()
    }
}

type BuilderFn = dyn Fn(Arc<ModuleRequest>, ModuleContext, Arc<Injector>) -> BoxFuture<'static, Result<PartialContext, BoxError>>
    + Send
    + Sync;

/// Async function `(request, current aggregate, injector) -> partial context`.
#[derive(Clone)]
pub struct ContextBuilder(Arc<BuilderFn>);

impl ContextBuilder {
    pub fn new<F, Fut>(builder: F) -> Self
    where
        F: Fn(Arc<ModuleRequest>, ModuleContext, Arc<Injector>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PartialContext, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |request, current, injector| {
            builder(request, current, injector).boxed()
        }))
    }

    /// Builder that always contributes the same fields.
    #[must_use]
    pub fn fixed(fields: PartialContext) -> Self {
        Self::new(move |_, _, _| {
            let fields = fields.clone();
            async move { Ok(fields) }
        })
    }

    pub fn call(
        &self,
        request: Arc<ModuleRequest>,
        current: ModuleContext,
        injector: Arc<Injector>,
    ) -> BoxFuture<'static, Result<PartialContext, BoxError>> {
        (self.0)(request, current, injector)
    }
}

impl fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContextBuilder")
    }
}
