use regex::Regex;
use html_escape::encode_double_quoted_attribute;
use ammonia::Builder;
use serde::Serialize;
use std::sync::OnceLock;
use uuid::Uuid;
use crate::config::{MAX_COMMENT_LENGTH, MAX_POST_LENGTH, MAX_TITLE_LENGTH};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, sanitize_text};
use crate::models::models::{Comment, Post};
use crate::store::{PostStore, UserStore};

/// Author identity resolved for display, the only user data that leaves
/// the engine attached to a post.
#[derive(Serialize, Clone)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct CommentView {
    pub id: String,
    pub author: AuthorRef,
    pub content: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: AuthorRef,
    pub comments: Vec<CommentView>,
    pub likes: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// The interaction engine: all post, comment and like rules live here.
/// Transport-free; the store is injected so tests can run against an
/// in-memory double.
///
/// Concurrency: each save writes one whole aggregate atomically, but two
/// concurrent read-modify-write cycles on the same post are last-writer-wins.
/// Accepted tradeoff for single-aggregate access patterns; no locks.
pub struct Engine<S> {
    store: S,
}

impl<S: PostStore + UserStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Engine { store }
    }

    /// The only authorization rule in the system: the resource's author,
    /// and nobody else, may mutate or delete it. There is deliberately
    /// no admin or moderator bypass.
    fn assert_owner(actor: &str, owner: &str, action: &str) -> Result<(), ApiError> {
        if actor != owner {
            return Err(ApiError::Forbidden(format!(
                "You are not authorized to {}",
                action
            )));
        }
        Ok(())
    }

    fn fetch_post(&self, id: &str) -> Result<Post, ApiError> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("Post Not Found".to_string()))
    }

    fn author_ref(&self, user_id: &str) -> Result<AuthorRef, ApiError> {
        let name = self
            .store
            .user_by_id(user_id)?
            .map(|u| u.name)
            .unwrap_or_else(|| "unknown".to_string());
        Ok(AuthorRef {
            id: user_id.to_string(),
            name,
        })
    }

    fn view(&self, post: Post) -> Result<PostView, ApiError> {
        let author = self.author_ref(&post.author)?;
        let mut comments = Vec::with_capacity(post.comments.len());
        for c in post.comments {
            comments.push(CommentView {
                author: self.author_ref(&c.user)?,
                id: c.id,
                content: c.content,
                created_at: c.created_at,
            });
        }
        Ok(PostView {
            id: post.id,
            title: post.title,
            content: post.content,
            author,
            comments,
            likes: post.likes,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    pub fn create_post(&self, actor: &str, title: &str, content: &str) -> Result<Post, ApiError> {
        validate_title(title)?;
        validate_content(content)?;

        let post = Post {
            id: Uuid::new_v4().to_string(),
            title: sanitize_text(title),
            content: filter_post_content(content),
            author: actor.to_string(),
            comments: Vec::new(),
            likes: Vec::new(),
            created_at: now_iso(),
            updated_at: None,
        };
        self.store.save(&post)?;
        Ok(post)
    }

    pub fn list_posts(&self) -> Result<Vec<PostView>, ApiError> {
        self.store
            .find_all()?
            .into_iter()
            .map(|p| self.view(p))
            .collect()
    }

    pub fn list_my_posts(&self, actor: &str) -> Result<Vec<PostView>, ApiError> {
        self.store
            .find_by_author(actor)?
            .into_iter()
            .map(|p| self.view(p))
            .collect()
    }

    pub fn get_post(&self, id: &str) -> Result<PostView, ApiError> {
        let post = self.fetch_post(id)?;
        self.view(post)
    }

    /// Only the supplied fields change; an omitted or empty field keeps
    /// its prior value.
    pub fn update_post(
        &self,
        actor: &str,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Post, ApiError> {
        let mut post = self.fetch_post(id)?;
        Self::assert_owner(actor, &post.author, "update this post")?;

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            validate_title(title)?;
            post.title = sanitize_text(title);
        }
        if let Some(content) = content.filter(|c| !c.is_empty()) {
            validate_content(content)?;
            post.content = filter_post_content(content);
        }

        post.touch();
        self.store.save(&post)?;
        Ok(post)
    }

    /// Removes the post and every comment it contains as one unit.
    pub fn delete_post(&self, actor: &str, id: &str) -> Result<(), ApiError> {
        let post = self.fetch_post(id)?;
        Self::assert_owner(actor, &post.author, "delete this post")?;
        self.store.delete(id)?;
        Ok(())
    }

    /// Toggle-with-reject: a second like without an intervening dislike is
    /// a Conflict, not a silent no-op. Returns the new like count.
    pub fn like_post(&self, actor: &str, id: &str) -> Result<usize, ApiError> {
        let mut post = self.fetch_post(id)?;

        if post.likes.iter().any(|uid| uid == actor) {
            return Err(ApiError::Conflict(
                "You already liked this post".to_string(),
            ));
        }

        post.likes.push(actor.to_string());
        post.touch();
        self.store.save(&post)?;
        Ok(post.like_count())
    }

    pub fn dislike_post(&self, actor: &str, id: &str) -> Result<usize, ApiError> {
        let mut post = self.fetch_post(id)?;

        if !post.likes.iter().any(|uid| uid == actor) {
            return Err(ApiError::Conflict(
                "You haven't liked this post yet".to_string(),
            ));
        }

        post.likes.retain(|uid| uid != actor);
        post.touch();
        self.store.save(&post)?;
        Ok(post.like_count())
    }

    pub fn add_comment(
        &self,
        actor: &str,
        post_id: &str,
        content: &str,
    ) -> Result<PostView, ApiError> {
        validate_comment(content)?;

        let mut post = self.fetch_post(post_id)?;
        post.comments.push(Comment {
            id: Uuid::new_v4().to_string(),
            user: actor.to_string(),
            content: sanitize_text(content),
            created_at: now_iso(),
        });
        post.touch();
        self.store.save(&post)?;
        self.view(post)
    }

    pub fn update_comment(
        &self,
        actor: &str,
        post_id: &str,
        comment_id: &str,
        content: Option<&str>,
    ) -> Result<PostView, ApiError> {
        let mut post = self.fetch_post(post_id)?;

        {
            let comment = post
                .comment_mut(comment_id)
                .ok_or_else(|| ApiError::NotFound("Comment Not Found".to_string()))?;
            Self::assert_owner(actor, &comment.user, "update this comment")?;

            if let Some(content) = content.filter(|c| !c.is_empty()) {
                validate_comment(content)?;
                comment.content = sanitize_text(content);
            }
        }

        post.touch();
        self.store.save(&post)?;
        self.view(post)
    }

    /// Filter-and-rewrite removal: the comment list is rewritten without
    /// the target, remaining comments keep their order and ids.
    pub fn delete_comment(
        &self,
        actor: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Result<PostView, ApiError> {
        let mut post = self.fetch_post(post_id)?;

        let owner = post
            .comment(comment_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| ApiError::NotFound("Comment Not Found".to_string()))?;
        Self::assert_owner(actor, &owner, "delete this comment")?;

        post.comments.retain(|c| c.id != comment_id);
        post.touch();
        self.store.save(&post)?;
        self.view(post)
    }
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(ApiError::Validation("Title too long".to_string()));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".to_string()));
    }
    if content.len() > MAX_POST_LENGTH {
        return Err(ApiError::Validation("Content too long".to_string()));
    }
    Ok(())
}

fn validate_comment(content: &str) -> Result<(), ApiError> {
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".to_string()));
    }
    if content.len() > MAX_COMMENT_LENGTH {
        return Err(ApiError::Validation("Comment too long".to_string()));
    }
    Ok(())
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"https?://[^\s]+").expect("Regex should compile")
    })
}

fn anchor_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)<a\b[^>]*>.*?</a>").expect("Regex should compile")
    })
}

// Convert HTTP/HTTPS URLs into clickable links with proper escaping
fn linkify(text: &str) -> String {
    url_regex().replace_all(text, |caps: &regex::Captures| {
        let url = &caps[0];
        let escaped_url = encode_double_quoted_attribute(url);
        format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
    }).to_string()
}

fn filter_post_content(content: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    // Linkify only the stretches outside existing anchors; URLs already
    // wrapped in an <a> survive sanitization and must not be re-wrapped.
    let mut out = String::with_capacity(clean.len());
    let mut last = 0;
    for anchor in anchor_regex().find_iter(&clean) {
        out.push_str(&linkify(&clean[last..anchor.start()]));
        out.push_str(anchor.as_str());
        last = anchor.end();
    }
    out.push_str(&linkify(&clean[last..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::models::User;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory double for the store seam.
    struct MemStore {
        posts: RefCell<HashMap<String, Post>>,
        order: RefCell<Vec<String>>,
        users: RefCell<HashMap<String, User>>,
    }

    impl MemStore {
        fn new() -> Self {
            MemStore {
                posts: RefCell::new(HashMap::new()),
                order: RefCell::new(Vec::new()),
                users: RefCell::new(HashMap::new()),
            }
        }

        fn with_user(self, id: &str, name: &str) -> Self {
            self.users.borrow_mut().insert(
                id.to_string(),
                User {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: format!("{}@example.com", name),
                    password: "hash".to_string(),
                    bio: None,
                    profile_picture: None,
                    created_at: now_iso(),
                    updated_at: None,
                },
            );
            self
        }
    }

    impl PostStore for &MemStore {
        fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Post>> {
            Ok(self.posts.borrow().get(id).cloned())
        }

        fn find_all(&self) -> anyhow::Result<Vec<Post>> {
            let posts = self.posts.borrow();
            Ok(self
                .order
                .borrow()
                .iter()
                .filter_map(|id| posts.get(id).cloned())
                .collect())
        }

        fn find_by_author(&self, author: &str) -> anyhow::Result<Vec<Post>> {
            let mut posts = PostStore::find_all(self)?;
            posts.retain(|p| p.author == author);
            Ok(posts)
        }

        fn save(&self, post: &Post) -> anyhow::Result<()> {
            let mut order = self.order.borrow_mut();
            if !order.contains(&post.id) {
                order.insert(0, post.id.clone());
            }
            self.posts.borrow_mut().insert(post.id.clone(), post.clone());
            Ok(())
        }

        fn delete(&self, id: &str) -> anyhow::Result<()> {
            self.posts.borrow_mut().remove(id);
            self.order.borrow_mut().retain(|existing| existing != id);
            Ok(())
        }
    }

    impl UserStore for &MemStore {
        fn user_by_id(&self, id: &str) -> anyhow::Result<Option<User>> {
            Ok(self.users.borrow().get(id).cloned())
        }

        fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            Ok(self
                .users
                .borrow()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        fn save_user(&self, user: &User) -> anyhow::Result<()> {
            self.users.borrow_mut().insert(user.id.clone(), user.clone());
            Ok(())
        }
    }

    fn store() -> MemStore {
        MemStore::new().with_user("alice", "Alice").with_user("bob", "Bob")
    }

    fn assert_forbidden<T>(result: Result<T, ApiError>) {
        match result {
            Err(ApiError::Forbidden(_)) => {}
            Err(other) => panic!("expected Forbidden, got {}", other),
            Ok(_) => panic!("expected Forbidden, got Ok"),
        }
    }

    fn assert_conflict<T>(result: Result<T, ApiError>) {
        match result {
            Err(ApiError::Conflict(_)) => {}
            Err(other) => panic!("expected Conflict, got {}", other),
            Ok(_) => panic!("expected Conflict, got Ok"),
        }
    }

    fn assert_not_found<T>(result: Result<T, ApiError>) {
        match result {
            Err(ApiError::NotFound(_)) => {}
            Err(other) => panic!("expected NotFound, got {}", other),
            Ok(_) => panic!("expected NotFound, got Ok"),
        }
    }

    #[test]
    fn create_post_sets_author_and_empty_collections() {
        let store = store();
        let engine = Engine::new(&store);

        let post = engine.create_post("alice", "Hello", "First post").unwrap();
        assert_eq!(post.author, "alice");
        assert!(post.comments.is_empty());
        assert!(post.likes.is_empty());
        assert!(post.updated_at.is_none());

        let view = engine.get_post(&post.id).unwrap();
        assert_eq!(view.author.name, "Alice");
    }

    #[test]
    fn create_post_requires_title_and_content() {
        let store = store();
        let engine = Engine::new(&store);

        assert!(matches!(
            engine.create_post("alice", "", "body"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            engine.create_post("alice", "title", ""),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn update_post_by_non_author_is_forbidden_and_leaves_post_unchanged() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        assert_forbidden(engine.update_post("bob", &post.id, Some("X"), Some("Y")));

        let view = engine.get_post(&post.id).unwrap();
        assert_eq!(view.title, "T");
        assert_eq!(view.content, "C");
        assert!(view.updated_at.is_none());
    }

    #[test]
    fn update_post_replaces_only_supplied_fields() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        assert_forbidden(engine.update_post("bob", &post.id, None, Some("C2")));

        let updated = engine.update_post("alice", &post.id, None, Some("C2")).unwrap();
        assert_eq!(updated.title, "T");
        assert_eq!(updated.content, "C2");
        assert!(updated.updated_at.is_some());

        // Empty string behaves like an omitted field
        let updated = engine.update_post("alice", &post.id, Some(""), None).unwrap();
        assert_eq!(updated.title, "T");
        assert_eq!(updated.content, "C2");
    }

    #[test]
    fn update_missing_post_is_not_found() {
        let store = store();
        let engine = Engine::new(&store);
        assert_not_found(engine.update_post("alice", "nope", Some("T"), None));
    }

    #[test]
    fn delete_post_removes_aggregate_with_its_comments() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();
        engine.add_comment("bob", &post.id, "nice").unwrap();

        assert_forbidden(engine.delete_post("bob", &post.id));
        engine.delete_post("alice", &post.id).unwrap();

        assert_not_found(engine.get_post(&post.id));
        assert_not_found(engine.delete_post("alice", &post.id));
        // Comments live inside the aggregate, so they are gone with it
        assert_not_found(engine.update_comment("bob", &post.id, "any", Some("x")));
    }

    #[test]
    fn like_then_like_again_conflicts_and_count_is_stable() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        assert_eq!(engine.like_post("alice", &post.id).unwrap(), 1);
        assert_conflict(engine.like_post("alice", &post.id));
        assert_eq!(engine.get_post(&post.id).unwrap().likes.len(), 1);

        assert_eq!(engine.dislike_post("alice", &post.id).unwrap(), 0);
        assert_conflict(engine.dislike_post("alice", &post.id));
        assert_eq!(engine.get_post(&post.id).unwrap().likes.len(), 0);
    }

    #[test]
    fn dislike_without_prior_like_conflicts() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        engine.like_post("bob", &post.id).unwrap();
        assert_conflict(engine.dislike_post("alice", &post.id));
        assert_eq!(engine.get_post(&post.id).unwrap().likes, vec!["bob"]);
    }

    #[test]
    fn likes_hold_each_user_at_most_once() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        engine.like_post("alice", &post.id).unwrap();
        engine.like_post("bob", &post.id).unwrap();
        assert_conflict(engine.like_post("alice", &post.id));

        let likes = engine.get_post(&post.id).unwrap().likes;
        assert_eq!(likes.len(), 2);
        assert_eq!(likes.iter().filter(|uid| *uid == "alice").count(), 1);
    }

    #[test]
    fn like_missing_post_is_not_found() {
        let store = store();
        let engine = Engine::new(&store);
        assert_not_found(engine.like_post("alice", "nope"));
        assert_not_found(engine.dislike_post("alice", "nope"));
    }

    #[test]
    fn add_comment_appears_with_author_and_content() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        let view = engine.add_comment("bob", &post.id, "nice").unwrap();
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].author.id, "bob");
        assert_eq!(view.comments[0].author.name, "Bob");
        assert_eq!(view.comments[0].content, "nice");

        let fetched = engine.get_post(&post.id).unwrap();
        assert_eq!(fetched.comments.len(), 1);
        assert_not_found(engine.add_comment("bob", "nope", "hi"));
    }

    #[test]
    fn comment_ids_stay_unique_after_deletions() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        engine.add_comment("bob", &post.id, "one").unwrap();
        engine.add_comment("bob", &post.id, "two").unwrap();
        let first_id = engine.get_post(&post.id).unwrap().comments[0].id.clone();

        engine.delete_comment("bob", &post.id, &first_id).unwrap();
        engine.add_comment("bob", &post.id, "three").unwrap();

        let comments = engine.get_post(&post.id).unwrap().comments;
        assert_eq!(comments.len(), 2);
        assert_ne!(comments[0].id, comments[1].id);
        assert!(comments.iter().all(|c| c.id != first_id));
        // Survivors keep insertion order
        assert_eq!(comments[0].content, "two");
        assert_eq!(comments[1].content, "three");
    }

    #[test]
    fn comment_mutation_is_owned_by_the_comment_author() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();
        let view = engine.add_comment("bob", &post.id, "nice").unwrap();
        let comment_id = view.comments[0].id.clone();

        // The post author does not own the comment
        assert_forbidden(engine.update_comment("alice", &post.id, &comment_id, Some("edited")));
        assert_forbidden(engine.delete_comment("alice", &post.id, &comment_id));

        let view = engine
            .update_comment("bob", &post.id, &comment_id, Some("edited"))
            .unwrap();
        assert_eq!(view.comments[0].content, "edited");

        let view = engine.delete_comment("bob", &post.id, &comment_id).unwrap();
        assert!(view.comments.is_empty());
    }

    #[test]
    fn update_comment_with_missing_ids_is_not_found() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        assert_not_found(engine.update_comment("bob", "nope", "any", Some("x")));
        assert_not_found(engine.update_comment("bob", &post.id, "nope", Some("x")));
        assert_not_found(engine.delete_comment("bob", &post.id, "nope"));
    }

    #[test]
    fn list_my_posts_filters_by_author() {
        let store = store();
        let engine = Engine::new(&store);
        engine.create_post("alice", "A1", "x").unwrap();
        engine.create_post("bob", "B1", "x").unwrap();
        engine.create_post("alice", "A2", "x").unwrap();

        assert_eq!(engine.list_posts().unwrap().len(), 3);

        let mine = engine.list_my_posts("alice").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.author.id == "alice"));
    }

    #[test]
    fn interleaved_saves_on_one_post_are_last_writer_wins() {
        let store = store();
        let engine = Engine::new(&store);
        let post = engine.create_post("alice", "T", "C").unwrap();

        // Two requests fetch the same aggregate before either writes back
        let seam = &store;
        let mut copy_a = seam.find_by_id(&post.id).unwrap().unwrap();
        let mut copy_b = seam.find_by_id(&post.id).unwrap().unwrap();

        copy_a.comments.push(Comment {
            id: Uuid::new_v4().to_string(),
            user: "alice".to_string(),
            content: "from the first writer".to_string(),
            created_at: now_iso(),
        });
        copy_a.touch();
        seam.save(&copy_a).unwrap();

        copy_b.likes.push("bob".to_string());
        copy_b.touch();
        seam.save(&copy_b).unwrap();

        // The second save wins wholesale: the first writer's comment is
        // lost, and the surviving aggregate is internally consistent
        let current = engine.get_post(&post.id).unwrap();
        assert_eq!(current.likes, vec!["bob"]);
        assert!(current.comments.is_empty());
        assert!(current.updated_at.is_some());
        assert_eq!(engine.list_posts().unwrap().len(), 1);
    }

    #[test]
    fn existing_anchors_are_not_relinkified() {
        let store = store();
        let engine = Engine::new(&store);

        let post = engine
            .create_post(
                "alice",
                "Links",
                r#"<a href="https://example.com">example</a> and https://other.org"#,
            )
            .unwrap();

        // One anchor survived sanitization, one came from linkification
        assert_eq!(post.content.matches("<a ").count(), 2);
        assert!(post.content.contains(">example</a>"));
        assert!(post.content.contains(r#"<a href="https://other.org""#));
        // No nested anchor markup
        assert!(!post.content.contains(r#"href="<a"#));
        assert!(!post.content.contains("</a></a>"));
    }

    #[test]
    fn post_content_gets_sanitized_and_linkified() {
        let store = store();
        let engine = Engine::new(&store);

        let post = engine
            .create_post("alice", "Links", "see https://example.com <script>x()</script>")
            .unwrap();
        assert!(post.content.contains(r#"<a href="https://example.com""#));
        assert!(!post.content.contains("<script>"));

        let view = engine.add_comment("bob", &post.id, "<b>bold</b> take").unwrap();
        assert_eq!(view.comments[0].content, "bold take");
    }
}
