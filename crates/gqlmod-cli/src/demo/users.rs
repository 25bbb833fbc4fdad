//! Users: the base module every other demo module builds on.

use std::sync::Arc;

use gqlmod_core::{
    BoxError, ContextBuilder, Dependencies, Injectable, InjectorError, Module, PartialContext,
    Provider, Resolver, ResolverMap, Token,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const MODULE_NAME: &str = "users";

/// Header carrying the ID of the user making the request.
pub const VIEWER_HEADER: &str = "x-user";

const TYPE_DEFS: &str = r#"
"Access level of a user."
enum Role {
  ADMIN
  MEMBER
}

type User {
  id: ID!
  name: String!
  role: Role!
}

type Query {
  users: [User!]!
  user(id: ID!): User
  "The user named by the x-user header, if any."
  viewer: User
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
struct UsersConfig {
    #[serde(default)]
    admins: Vec<String>,
}

/// In-memory user directory.
pub struct UserStore {
    users: Vec<User>,
}

impl UserStore {
    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn find(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }
}

impl Injectable for UserStore {
    fn dependencies() -> Vec<Token> {
        vec![Token::module_config(MODULE_NAME)]
    }

    fn construct(deps: &Dependencies<'_>) -> gqlmod_di::Result<Self> {
        let raw = deps.get::<Value>(&Token::module_config(MODULE_NAME))?;
        let config: UsersConfig = if raw.is_null() {
            UsersConfig::default()
        } else {
            serde_json::from_value(raw.as_ref().clone())
                .map_err(|e| InjectorError::construction(Token::of::<Self>(), e.to_string()))?
        };

        let users = [("1", "Ada"), ("2", "Grace"), ("3", "Linus")]
            .into_iter()
            .map(|(id, name)| User {
                id: id.to_string(),
                name: name.to_string(),
                role: if config.admins.iter().any(|admin| admin == id) {
                    Role::Admin
                } else {
                    Role::Member
                },
            })
            .collect();
        Ok(Self { users })
    }
}

fn to_json(user: &User) -> Value {
    serde_json::to_value(user).unwrap_or(Value::Null)
}

fn resolvers() -> ResolverMap {
    ResolverMap::new()
        .field(
            "Query",
            "users",
            Resolver::from_fn(|params| {
                let store = params.context.resolve::<UserStore>()?;
                Ok(Value::Array(store.all().iter().map(to_json).collect()))
            }),
        )
        .field(
            "Query",
            "user",
            Resolver::from_fn(|params| {
                let id = params.required_str("id")?;
                let store = params.context.resolve::<UserStore>()?;
                Ok(lookup(&store, id))
            }),
        )
        .field(
            "Query",
            "viewer",
            Resolver::from_fn(|params| {
                let Some(id) = params.context.get("viewer").and_then(Value::as_str) else {
                    return Ok(Value::Null);
                };
                let store = params.context.resolve::<UserStore>()?;
                Ok(lookup(&store, id))
            }),
        )
}

/// Puts the `x-user` header into the context as `viewer`.
fn viewer_context() -> ContextBuilder {
    ContextBuilder::new(|request, _current, _injector| async move {
        let mut partial = PartialContext::new();
        if let Some(viewer) = request.header(VIEWER_HEADER) {
            partial.insert("viewer".to_string(), json!(viewer));
        }
        Ok::<_, BoxError>(partial)
    })
}

pub fn module() -> Module {
    Module::builder(MODULE_NAME)
        .type_defs(TYPE_DEFS)
        .resolvers(resolvers())
        .providers(vec![Provider::class::<UserStore>()])
        .context(viewer_context())
        .build()
}

/// Lets other modules turn a user ID into its JSON form.
pub fn lookup(store: &Arc<UserStore>, id: &str) -> Value {
    store.find(id).map(to_json).unwrap_or(Value::Null)
}
