use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;
use crate::models::models::{TokenData, User};
use crate::config::{token_expiration_hours, token_key, user_key, TOKENS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, unauthorized, verify_password};
use crate::store::{KvStore, UserStore};

/// Issues an opaque bearer token mapped to the user id.
pub fn issue_token(store: &Store, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    // Track issued tokens so a store reset can find and wipe them
    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    Ok(token)
}

pub fn login_user(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let users = KvStore::new(&store);

    let creds: serde_json::Value = serde_json::from_slice(req.body())?;
    let email = creds["email"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    if let Some(user) = users.user_by_email(email)? {
        if verify_password(password, &user.password) {
            let token = issue_token(&store, &user.id)?;
            let resp = serde_json::json!({
                "success": true,
                "token": token,
                "user_id": user.id,
            });
            return Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build());
        }
    }

    Ok(unauthorized())
}

pub fn logout_user(req: Request) -> anyhow::Result<Response> {
    let store = Store::open_default()?;
    let auth_header = req.header("Authorization").and_then(|h| h.as_str()).unwrap_or_default();

    if !auth_header.starts_with("Bearer ") {
        return Ok(unauthorized());
    }

    let token = auth_header.strip_prefix("Bearer ").unwrap();
    store.delete(&token_key(token))?;

    let resp = serde_json::json!({
        "success": true,
        "message": "Logged out successfully",
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

/// Identity resolver: maps the request's bearer token to a user id, or
/// None for expired, unknown or orphaned tokens.
pub fn validate_token(req: &Request, store: &Store) -> Option<String> {
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    if !auth_header.starts_with("Bearer ") {
        return None;
    }
    let token = auth_header.strip_prefix("Bearer ").unwrap();
    if let Some(data) = store.get_json::<TokenData>(&token_key(token)).ok()? {
        // Check if token is expired
        if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
            let now = chrono::Utc::now();
            let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
            if age_hours > token_expiration_hours() {
                return None;
            }
        }
        // Check if user still exists
        if store.get_json::<User>(&user_key(&data.user_id)).ok()?.is_none() {
            return None;
        }
        Some(data.user_id)
    } else {
        None
    }
}

/// Resolves the actor or short-circuits with a 401 response.
pub fn require_actor(req: &Request, store: &Store) -> Result<String, Response> {
    validate_token(req, store).ok_or_else(|| ApiError::Unauthorized.into())
}
