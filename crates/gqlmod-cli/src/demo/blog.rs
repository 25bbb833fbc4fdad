//! Blog posts, written by users.

use std::time::Instant;

use gqlmod_core::{
    Composer, Dependencies, Injectable, Module, Provider, Resolver, ResolverMap, Token,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::users::{self, UserStore};

pub const MODULE_NAME: &str = "blog";

const DEFAULT_PAGE_SIZE: u64 = 10;

const TYPE_DEFS: &str = r#"
type Post {
  id: ID!
  title: String!
  author: User!
}

extend type Query {
  "Newest posts first. Defaults to the module's page size."
  posts(first: Int): [Post!]!
  post(id: ID!): Post
}

extend type User {
  posts: [Post!]!
}
"#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author_id: String,
}

pub struct PostStore {
    posts: Vec<Post>,
}

impl PostStore {
    pub fn find(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn newest(&self, first: usize) -> impl Iterator<Item = &Post> {
        self.posts.iter().rev().take(first)
    }

    pub fn by_author<'a>(&'a self, author_id: &'a str) -> impl Iterator<Item = &'a Post> {
        self.posts.iter().filter(move |post| post.author_id == author_id)
    }
}

impl Injectable for PostStore {
    fn dependencies() -> Vec<Token> {
        vec![Token::of::<UserStore>()]
    }

    fn construct(deps: &Dependencies<'_>) -> gqlmod_di::Result<Self> {
        let users = deps.resolve::<UserStore>()?;
        let titles = [
            ("1", "Notes on the Analytical Engine"),
            ("2", "Compilers for everyone"),
            ("1", "Bernoulli numbers, step by step"),
            ("3", "Just for fun"),
        ];

        // Posts by authors missing from the directory are dropped.
        let posts = titles
            .into_iter()
            .filter(|(author, _)| users.find(author).is_some())
            .enumerate()
            .map(|(index, (author, title))| Post {
                id: (index + 1).to_string(),
                title: title.to_string(),
                author_id: author.to_string(),
            })
            .collect();
        Ok(Self { posts })
    }
}

pub fn to_json(post: &Post) -> Value {
    serde_json::to_value(post).unwrap_or(Value::Null)
}

fn resolvers(page_size: u64) -> ResolverMap {
    ResolverMap::new()
        .field(
            "Query",
            "posts",
            Resolver::from_fn(move |params| {
                let first = params
                    .arg("first")
                    .and_then(Value::as_u64)
                    .unwrap_or(page_size);
                let store = params.context.resolve::<PostStore>()?;
                let first = usize::try_from(first).unwrap_or(usize::MAX);
                Ok(Value::Array(store.newest(first).map(to_json).collect()))
            }),
        )
        .field(
            "Query",
            "post",
            Resolver::from_fn(|params| {
                let id = params.required_str("id")?;
                let store = params.context.resolve::<PostStore>()?;
                Ok(store.find(id).map(to_json).unwrap_or(Value::Null))
            }),
        )
        .field(
            "Post",
            "author",
            Resolver::from_fn(|params| {
                let author = params
                    .parent
                    .get("authorId")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let store = params.context.resolve::<UserStore>()?;
                Ok(users::lookup(&store, author))
            }),
        )
        .field(
            "User",
            "posts",
            Resolver::from_fn(|params| {
                let id = params
                    .parent
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let store = params.context.resolve::<PostStore>()?;
                Ok(Value::Array(store.by_author(id).map(to_json).collect()))
            }),
        )
}

/// Logs how long each root field took.
fn timed() -> Composer {
    Composer::around(|params, next| async move {
        let field = params.info.path();
        let started = Instant::now();
        let result = next.call(params).await;
        debug!(
            field = %field,
            elapsed_us = started.elapsed().as_micros(),
            ok = result.is_ok(),
            "Resolved"
        );
        result
    })
}

pub fn module(users: &Module) -> Module {
    Module::builder(MODULE_NAME)
        .imports(vec![users.clone()])
        .type_defs(TYPE_DEFS)
        .resolvers_with(|config| {
            let page_size = config
                .get("page_size")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_PAGE_SIZE);
            resolvers(page_size)
        })
        .compose("Query.*", vec![timed()])
        .providers(vec![Provider::class::<PostStore>()])
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_blog_brings_users_along() {
        let blog = module(&users::module());
        assert_eq!(blog.graph().unwrap().names(), vec!["users", "blog"]);

        let sdl = blog.type_defs().unwrap();
        assert!(sdl.contains("posts: [Post!]!"), "{sdl}");
        assert!(!sdl.contains("extend type"), "{sdl}");
    }

    #[test]
    fn test_post_store_depends_on_users() {
        let injector = module(&users::module()).injector().unwrap();
        let store = injector.resolve::<PostStore>().unwrap();

        assert_eq!(store.newest(2).map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["4", "3"]);
        assert_eq!(store.by_author("1").count(), 2);
    }

    #[test]
    fn test_page_size_from_config() {
        let blog = module(&users::module()).with_config(json!({"page_size": 1}));
        let resolvers = blog.own_resolvers();
        assert!(resolvers.contains("Query", "posts"));
        assert!(resolvers.contains("User", "posts"));
    }
}
