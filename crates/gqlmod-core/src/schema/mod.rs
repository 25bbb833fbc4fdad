//! Executable schema assembly on top of async-graphql's dynamic schema.

mod builder;
mod value;

pub use builder::build_schema;
