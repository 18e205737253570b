use spin_sdk::key_value::Store;
use uuid::Uuid;
use crate::config::{post_key, token_key, user_key, POSTS_LIST_KEY, TOKENS_LIST_KEY, USERS_LIST_KEY};
use crate::core::helpers::{hash_password, now_iso};
use crate::models::models::{Comment, Post, User};

/// Seeds deterministic dev data: two users, one post with a comment and a
/// like. Safe to call on every request; does nothing once seeded.
pub fn init_test_data(store: &Store) -> anyhow::Result<()> {
    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();

    let mut alice_id = String::new();
    let mut bob_id = String::new();
    for id in &users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.email == "alice@example.com" {
                alice_id = id.clone();
            }
            if u.email == "bob@example.com" {
                bob_id = id.clone();
            }
        }
    }

    if !alice_id.is_empty() && !bob_id.is_empty() {
        return Ok(()); // Already initialized
    }

    if alice_id.is_empty() {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: hash_password("alice")?,
            bio: Some("Hello, I'm Alice!".to_string()),
            profile_picture: None,
            created_at: now_iso(),
            updated_at: None,
        };
        store.set_json(&user_key(&user.id), &user)?;
        users.push(user.id.clone());
        alice_id = user.id;
    }

    if bob_id.is_empty() {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: hash_password("bob")?,
            bio: Some("Bob's corner of the internet".to_string()),
            profile_picture: None,
            created_at: now_iso(),
            updated_at: None,
        };
        store.set_json(&user_key(&user.id), &user)?;
        users.push(user.id.clone());
        bob_id = user.id;
    }

    let post = Post {
        id: Uuid::new_v4().to_string(),
        title: "Welcome to the blog".to_string(),
        content: "First post. Comments and likes are open.".to_string(),
        author: alice_id,
        comments: vec![Comment {
            id: Uuid::new_v4().to_string(),
            user: bob_id.clone(),
            content: "Looking forward to more!".to_string(),
            created_at: now_iso(),
        }],
        likes: vec![bob_id],
        created_at: now_iso(),
        updated_at: None,
    };
    store.set_json(&post_key(&post.id), &post)?;

    let mut posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    posts.insert(0, post.id);
    store.set_json(POSTS_LIST_KEY, &posts)?;

    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(())
}

/// Wipes every record the app owns. Used by the dev reset route so
/// integration runs start from a clean store.
pub fn reset_db_data(store: &Store) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &users {
        store.delete(&user_key(id))?;
    }

    let posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    for id in posts {
        store.delete(&post_key(&id))?;
    }

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in tokens {
        store.delete(&token_key(&token))?;
    }

    store.delete(USERS_LIST_KEY)?;
    store.delete(POSTS_LIST_KEY)?;
    store.delete(TOKENS_LIST_KEY)?;

    Ok(())
}
