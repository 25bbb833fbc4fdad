//! A small blog application assembled from three modules.
//!
//! `users` knows nothing about the others, `blog` imports `users` and extends
//! `User` with posts, and `comments` imports both and adds the `Mutation`
//! root. Module configs set the admin list and the default page size.

mod blog;
mod comments;
mod users;

use gqlmod_core::{Application, CompositionConfig};
use serde_json::json;

pub fn application(config: CompositionConfig) -> Application {
    let users = users::module().with_config(json!({ "admins": ["1"] }));
    let blog = blog::module(&users).with_config(json!({ "page_size": 3 }));
    let comments = comments::module(&users, &blog);

    Application::with_config(vec![users, blog, comments], config)
}
