pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_BIO_LENGTH: usize = 500;

pub const USERS_LIST_KEY: &str = "users_list";
pub const POSTS_LIST_KEY: &str = "posts_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("SCRIBE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}
