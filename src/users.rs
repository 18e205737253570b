use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;
use crate::models::models::User;
use crate::config::MAX_BIO_LENGTH;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, sanitize_text};
use crate::auth::{issue_token, require_actor};
use crate::store::{KvStore, UserStore};

// Outward projection; the password hash never leaves the server.
fn build_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "bio": user.bio.as_ref().unwrap_or(&String::new()),
        "profile_picture": user.profile_picture,
        "created_at": user.created_at,
    })
}

pub fn register_user(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let users = KvStore::new(&store);

    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let name = body["name"].as_str().unwrap_or("");
    let email = body["email"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");

    if name.is_empty() {
        return Ok(ApiError::Validation("Name is required".to_string()).into());
    }
    if email.is_empty() || !email.contains('@') {
        return Ok(ApiError::Validation("Valid email is required".to_string()).into());
    }
    if password.is_empty() {
        return Ok(ApiError::Validation("Password is required".to_string()).into());
    }

    if users.user_by_email(email)?.is_some() {
        return Ok(ApiError::Conflict("Email already registered".to_string()).into());
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: sanitize_text(name),
        email: email.to_string(),
        password: hash_password(password)?,
        bio: None,
        profile_picture: None,
        created_at: now_iso(),
        updated_at: None,
    };
    users.save_user(&user)?;

    let token = issue_token(&store, &user.id)?;
    let resp = serde_json::json!({
        "success": true,
        "message": "Registered Successfully",
        "token": token,
        "user": build_user_json(&user),
    });

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn get_profile(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };

    let users = KvStore::new(&store);
    match users.user_by_id(&actor)? {
        Some(user) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({
                "success": true,
                "user": build_user_json(&user),
            }))?)
            .build()),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

/// Only profile fields are mutable after registration: name, bio and the
/// profile picture reference. Email and password stay fixed here.
pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let actor = match require_actor(&req, &store) {
        Ok(uid) => uid,
        Err(resp) => return Ok(resp),
    };

    let users = KvStore::new(&store);
    let mut user = match users.user_by_id(&actor)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let body: serde_json::Value = serde_json::from_slice(req.body())?;

    if let Some(name) = body["name"].as_str().filter(|n| !n.is_empty()) {
        user.name = sanitize_text(name);
    }
    if let Some(bio) = body["bio"].as_str() {
        if bio.len() > MAX_BIO_LENGTH {
            return Ok(ApiError::Validation("Bio too long".to_string()).into());
        }
        user.bio = Some(sanitize_text(bio));
    }
    if let Some(picture) = body["profile_picture"].as_str() {
        user.profile_picture = Some(picture.to_string());
    }

    user.updated_at = Some(now_iso());
    users.save_user(&user)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&serde_json::json!({
            "success": true,
            "message": "Profile Updated",
            "user": build_user_json(&user),
        }))?)
        .build())
}
