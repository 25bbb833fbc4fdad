//! # gqlmod-di
//!
//! Dependency injection for gqlmod modules.
//!
//! Modules declare [`Provider`]s: a [`Token`] bound either to a literal value or
//! to a constructor with declared dependencies. The composition layer flattens
//! all providers of a module graph and hands them to [`build_injector`], which
//! registers them in order and eagerly builds every singleton.
//!
//! ```ignore
//! use gqlmod_di::{build_injector, MergeStrategy, Provider, Token};
//!
//! let injector = build_injector(
//!     &[Provider::value(Token::named("greeting"), "hello".to_string())],
//!     MergeStrategy::Override,
//! )?;
//! let greeting = injector.get::<String>(&Token::named("greeting"))?;
//! ```

pub mod error;
pub mod injector;
pub mod provider;
pub mod strategy;
pub mod token;

pub use error::{InjectorError, Result};
pub use injector::{Injector, build_injector};
pub use provider::{Dependencies, Injectable, Instance, Provider, Supplier};
pub use strategy::MergeStrategy;
pub use token::Token;
