use serde::{Serialize, Deserialize};
use crate::core::helpers::now_iso;

#[derive(Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    // Argon2 hash. Stored as part of the aggregate but never sent to
    // clients; outward responses go through users::build_user_json.
    pub password: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// A post aggregate: the post itself plus its embedded comments and the
/// set of user ids that liked it. Always read and written as one unit.
#[derive(Serialize, Deserialize, Clone)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub comments: Vec<Comment>,
    pub likes: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub content: String,
    pub created_at: String,
}

impl Post {
    /// Every mutating save must refresh the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Some(now_iso());
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn comment_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
