//! Comments on posts, plus the only mutation of the demo.

use std::sync::{Arc, Mutex};

use gqlmod_core::{Composer, Module, Provider, Resolver, ResolverMap, ResolverParams, Token};
use serde::Serialize;
use serde_json::Value;

use super::blog::{self, PostStore};
use super::users::{self, UserStore};

pub const MODULE_NAME: &str = "comments";

const TYPE_DEFS: &str = r#"
type Comment {
  id: ID!
  body: String!
  author: User!
  post: Post!
}

extend type Post {
  comments: [Comment!]!
}

type Mutation {
  "Comments on a post as the current viewer."
  addComment(postId: ID!, body: String!): Comment!
}
"#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author_id: String,
    pub post_id: String,
}

/// Comment storage shared by every request of one application.
#[derive(Debug, Default)]
pub struct CommentStore {
    comments: Mutex<Vec<Comment>>,
}

impl CommentStore {
    pub fn on_post(&self, post_id: &str) -> Vec<Comment> {
        self.lock()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }

    pub fn add(&self, post_id: &str, author_id: &str, body: &str) -> Comment {
        let mut comments = self.lock();
        let comment = Comment {
            id: (comments.len() + 1).to_string(),
            body: body.to_string(),
            author_id: author_id.to_string(),
            post_id: post_id.to_string(),
        };
        comments.push(comment.clone());
        comment
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Comment>> {
        self.comments
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn to_json(comment: &Comment) -> Value {
    serde_json::to_value(comment).unwrap_or(Value::Null)
}

fn parent_str<'a>(params: &'a ResolverParams, key: &str) -> &'a str {
    params
        .parent
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn resolvers() -> ResolverMap {
    ResolverMap::new()
        .field(
            "Post",
            "comments",
            Resolver::from_fn(|params| {
                let store = params.context.resolve::<CommentStore>()?;
                let comments = store.on_post(parent_str(&params, "id"));
                Ok(Value::Array(comments.iter().map(to_json).collect()))
            }),
        )
        .field(
            "Comment",
            "author",
            Resolver::from_fn(|params| {
                let store = params.context.resolve::<UserStore>()?;
                Ok(users::lookup(&store, parent_str(&params, "authorId")))
            }),
        )
        .field(
            "Comment",
            "post",
            Resolver::from_fn(|params| {
                let store = params.context.resolve::<PostStore>()?;
                Ok(store
                    .find(parent_str(&params, "postId"))
                    .map(blog::to_json)
                    .unwrap_or(Value::Null))
            }),
        )
        .field(
            "Mutation",
            "addComment",
            Resolver::from_fn(|params| {
                let post_id = params.required_str("postId")?;
                let body = params.required_str("body")?.trim();
                if body.is_empty() {
                    return Err(async_graphql::Error::new("Comment body must not be empty"));
                }
                let posts = params.context.resolve::<PostStore>()?;
                if posts.find(post_id).is_none() {
                    return Err(async_graphql::Error::new(format!("Post '{post_id}' not found")));
                }

                let viewer = params
                    .context
                    .get("viewer")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let store = params.context.resolve::<CommentStore>()?;
                Ok(to_json(&store.add(post_id, viewer, body)))
            }),
        )
}

/// Rejects anonymous callers.
fn require_viewer() -> Composer {
    Composer::guard(|params| {
        let known = params
            .context
            .get("viewer")
            .and_then(Value::as_str)
            .and_then(|id| {
                params
                    .context
                    .resolve::<UserStore>()
                    .ok()
                    .and_then(|store| store.find(id).map(|_| ()))
            });
        known.ok_or_else(|| {
            async_graphql::Error::new(format!(
                "{} requires a known user in the {} header",
                params.info.path(),
                users::VIEWER_HEADER
            ))
        })
    })
}

pub fn module(users: &Module, blog: &Module) -> Module {
    let store = Arc::new(CommentStore::default());
    Module::builder(MODULE_NAME)
        .imports(vec![users.clone(), blog.clone()])
        .type_defs(TYPE_DEFS)
        .resolvers(resolvers())
        .compose("Mutation.addComment", vec![require_viewer()])
        .providers(vec![Provider::instance(Token::of::<CommentStore>(), store)])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_assigns_sequential_ids() {
        let store = CommentStore::default();
        assert_eq!(store.add("1", "2", "first").id, "1");
        assert_eq!(store.add("2", "2", "second").id, "2");
        assert_eq!(store.on_post("1").len(), 1);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_graph_visits_users_once() {
        let users = users::module();
        let blog = blog::module(&users);
        let comments = module(&users, &blog);

        assert_eq!(
            comments.graph().unwrap().names(),
            vec!["users", "blog", "comments"]
        );
    }

    #[test]
    fn test_store_survives_new_injectors() {
        let users = users::module();
        let comments = module(&users, &blog::module(&users));

        let first = comments.injector().unwrap();
        first.resolve::<CommentStore>().unwrap().add("1", "1", "hi");

        let second = comments.injector().unwrap();
        assert_eq!(second.resolve::<CommentStore>().unwrap().count(), 1);
    }
}
