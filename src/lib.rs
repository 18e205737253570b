use spin_sdk::{
    http::{IntoResponse, Request, Response},
    http_component,
    key_value::Store,
};

pub mod auth;
pub mod config;
pub mod core;
pub mod engine;
pub mod models;
pub mod posts;
pub mod store;
pub mod users;

use crate::core::db::{init_test_data, reset_db_data};

fn api_index() -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "message": "Blog API",
        }))?)
        .build())
}

fn reset(store: &Store) -> anyhow::Result<Response> {
    reset_db_data(store)?;
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "success": true,
            "message": "Store reset",
        }))?)
        .build())
}

#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let store = Store::open_default()?;
    let _ = init_test_data(&store); // Seed dev data on first request

    let path = req.path();
    let method = req.method();

    match (method.to_string().as_str(), path) {
        ("POST", "/api/auth/register") => users::register_user(req),
        ("POST", "/api/auth/login") => auth::login_user(req),
        ("GET", "/api/auth/logout") => auth::logout_user(req),
        ("GET", "/api/auth/profile") => users::get_profile(req),
        ("PUT", "/api/auth/profile") => users::update_profile(req),

        ("POST", "/api/posts") => posts::create_post(req),
        ("GET", "/api/posts") => posts::list_posts(req),
        ("GET", "/api/posts/me") => posts::list_my_posts(req),
        ("PUT", p) if p.starts_with("/api/posts/") && p.ends_with("/like") => {
            posts::like_post(req)
        }
        ("PUT", p) if p.starts_with("/api/posts/") && p.ends_with("/dislike") => {
            posts::dislike_post(req)
        }
        ("POST", p) if p.starts_with("/api/posts/") && p.ends_with("/comment") => {
            posts::add_comment(req)
        }
        ("PUT", p) if p.starts_with("/api/posts/") && p.contains("/comment/") => {
            posts::update_comment(req)
        }
        ("DELETE", p) if p.starts_with("/api/posts/") && p.contains("/comment/") => {
            posts::delete_comment(req)
        }
        ("GET", p) if p.starts_with("/api/posts/") => posts::get_post(req),
        ("PUT", p) if p.starts_with("/api/posts/") => posts::update_post(req),
        ("DELETE", p) if p.starts_with("/api/posts/") => posts::delete_post(req),

        ("POST", "/api/dev/reset") => reset(&store),
        ("GET", "/") => api_index(),
        _ => Ok(Response::builder().status(404).body("Not found").build()),
    }
}
