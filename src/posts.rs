use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use crate::core::errors::ApiError;
use crate::core::helpers::validate_uuid;
use crate::auth::require_actor;
use crate::engine::Engine;
use crate::store::KvStore;

fn ok_json(status: u16, body: &serde_json::Value) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

/// `/api/posts/{id}[/...]` → `{id}`. A malformed id yields `None`, which
/// callers report as Not Found: an id that cannot exist in the store is
/// indistinguishable from one that simply is not there.
fn post_id_from(path: &str) -> Option<&str> {
    path.strip_prefix("/api/posts/")?
        .split('/')
        .next()
        .filter(|id| validate_uuid(id))
}

/// `/api/posts/{postId}/comment/{commentId}` → `({postId}, {commentId})`
fn comment_ids_from(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("/api/posts/")?;
    let mut parts = rest.split('/');
    let post_id = parts.next()?;
    if parts.next()? != "comment" {
        return None;
    }
    let comment_id = parts.next()?;
    if parts.next().is_some() || !validate_uuid(post_id) || !validate_uuid(comment_id) {
        return None;
    }
    Some((post_id, comment_id))
}

pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let title = body["title"].as_str().unwrap_or_default();
    let content = body["content"].as_str().unwrap_or_default();

    let engine = Engine::new(KvStore::new(&store));
    match engine.create_post(&actor, title, content) {
        Ok(post) => ok_json(201, &serde_json::json!({
            "success": true,
            "message": "Post Created Successfully",
            "post": post,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn list_posts(_req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let engine = Engine::new(KvStore::new(&store));

    match engine.list_posts() {
        Ok(posts) => ok_json(200, &serde_json::json!({
            "success": true,
            "posts": posts,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn list_my_posts(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };

    let engine = Engine::new(KvStore::new(&store));
    match engine.list_my_posts(&actor) {
        Ok(posts) => ok_json(200, &serde_json::json!({
            "success": true,
            "posts": posts,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn get_post(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let post_id = match post_id_from(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::NotFound("Post Not Found".to_string()).into()),
    };

    let engine = Engine::new(KvStore::new(&store));
    match engine.get_post(post_id) {
        Ok(post) => ok_json(200, &serde_json::json!({
            "success": true,
            "post": post,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn update_post(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let post_id = match post_id_from(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::NotFound("Post Not Found".to_string()).into()),
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let title = body["title"].as_str();
    let content = body["content"].as_str();

    let engine = Engine::new(KvStore::new(&store));
    match engine.update_post(&actor, post_id, title, content) {
        Ok(post) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Post Updated Successfully",
            "post": post,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn delete_post(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let post_id = match post_id_from(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::NotFound("Post Not Found".to_string()).into()),
    };

    let engine = Engine::new(KvStore::new(&store));
    match engine.delete_post(&actor, post_id) {
        Ok(()) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Post Deleted Successfully",
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn like_post(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let post_id = match post_id_from(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::NotFound("Post Not Found".to_string()).into()),
    };

    let engine = Engine::new(KvStore::new(&store));
    match engine.like_post(&actor, post_id) {
        Ok(likes) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Post Liked",
            "likes": likes,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn dislike_post(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let post_id = match post_id_from(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::NotFound("Post Not Found".to_string()).into()),
    };

    let engine = Engine::new(KvStore::new(&store));
    match engine.dislike_post(&actor, post_id) {
        Ok(likes) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Post Disliked",
            "likes": likes,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn add_comment(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let post_id = match post_id_from(req.path()) {
        Some(id) => id,
        None => return Ok(ApiError::NotFound("Post Not Found".to_string()).into()),
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let content = body["content"].as_str().unwrap_or_default();

    let engine = Engine::new(KvStore::new(&store));
    match engine.add_comment(&actor, post_id, content) {
        Ok(post) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Comment Added",
            "post": post,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn update_comment(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let (post_id, comment_id) = match comment_ids_from(req.path()) {
        Some(ids) => ids,
        None => return Ok(ApiError::NotFound("Comment Not Found".to_string()).into()),
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let content = body["content"].as_str();

    let engine = Engine::new(KvStore::new(&store));
    match engine.update_comment(&actor, post_id, comment_id, content) {
        Ok(post) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Comment Updated",
            "post": post,
        })),
        Err(e) => Ok(e.into()),
    }
}

pub fn delete_comment(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };
    let (post_id, comment_id) = match comment_ids_from(req.path()) {
        Some(ids) => ids,
        None => return Ok(ApiError::NotFound("Comment Not Found".to_string()).into()),
    };

    let engine = Engine::new(KvStore::new(&store));
    match engine.delete_comment(&actor, post_id, comment_id) {
        Ok(post) => ok_json(200, &serde_json::json!({
            "success": true,
            "message": "Comment Deleted",
            "post": post,
        })),
        Err(e) => Ok(e.into()),
    }
}
