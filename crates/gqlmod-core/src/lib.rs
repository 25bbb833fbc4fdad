//! # gqlmod-core
//!
//! Module composition for GraphQL servers.
//!
//! Independently written [`Module`]s each declare a slice of schema, the
//! resolvers for it, injectable providers and a context builder, plus the
//! modules they import. This crate resolves the import graph and merges those
//! slices into one executable schema, one injector and one per-request
//! context.
//!
//! ## Architecture
//!
//! - [`module`]: modules, the import graph and per-build [`Composition`]s
//! - [`compose`]: resolver middleware applied by `Type.field` / `Type.*` path
//! - [`sdl`]: ordered SDL merge with `extend` support
//! - [`schema`]: executable schema on top of async-graphql's dynamic schema
//! - [`context`]: requests, the aggregate context and context builders
//! - [`app`]: the top-level [`Application`] with a cached schema
//!
//! ## Example
//!
//! ```ignore
//! use gqlmod_core::{Application, Module, ModuleRequest, Resolver, ResolverMap};
//!
//! let numbers = Module::builder("numbers")
//!     .type_defs("type Query { x: Int }")
//!     .resolvers(ResolverMap::new().field("Query", "x", Resolver::constant(42)))
//!     .build();
//!
//! let app = Application::new(vec![numbers]);
//! let response = app.execute(ModuleRequest::new(), "{ x }").await;
//! ```

pub mod app;
pub mod compose;
pub mod config;
pub mod context;
pub mod error;
pub mod module;
pub mod resolver;
pub mod schema;
pub mod sdl;
pub mod typedefs;

pub use app::{APP_MODULE_NAME, Application, LazySchema, SchemaState};
pub use compose::{Composer, CompositionMap, compose_resolvers};
pub use config::{CompositionConfig, SchemaLimits};
pub use context::{ContextBuilder, ModuleContext, ModuleRequest, PartialContext};
pub use error::{BoxError, CompositionError};
pub use module::{Composition, Configurable, Module, ModuleBuilder, ModuleGraph};
pub use resolver::{FieldInfo, Resolver, ResolverMap, ResolverParams, ResolverResult, merge_resolvers};
pub use schema::build_schema;
pub use sdl::{merge_fragments, merge_type_defs};
pub use typedefs::TypeDefs;

pub use gqlmod_di::{
    Dependencies, Injectable, Injector, InjectorError, MergeStrategy, Provider, Token,
    build_injector,
};

/// Result type for composition operations.
pub type Result<T> = std::result::Result<T, CompositionError>;
