use spin_sdk::key_value::Store;
use crate::config::{post_key, user_key, POSTS_LIST_KEY, USERS_LIST_KEY};
use crate::models::models::{Post, User};

/// Storage contract for post aggregates. A post and its embedded comments
/// and likes are one unit: `save` writes the whole aggregate in a single
/// put, so a partially-applied comment or like is never observable.
pub trait PostStore {
    fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Post>>;
    fn find_all(&self) -> anyhow::Result<Vec<Post>>;
    fn find_by_author(&self, author: &str) -> anyhow::Result<Vec<Post>>;
    fn save(&self, post: &Post) -> anyhow::Result<()>;
    fn delete(&self, id: &str) -> anyhow::Result<()>;
}

pub trait UserStore {
    fn user_by_id(&self, id: &str) -> anyhow::Result<Option<User>>;
    fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    fn save_user(&self, user: &User) -> anyhow::Result<()>;
}

/// KV-backed implementation. Aggregates live at `post:{id}` / `user:{id}`
/// as JSON values; `posts_list` / `users_list` hold the id indexes used
/// for scans, newest first.
pub struct KvStore<'a> {
    store: &'a Store,
}

impl<'a> KvStore<'a> {
    pub fn new(store: &'a Store) -> Self {
        KvStore { store }
    }

    fn index(&self, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.store.get_json(key)?.unwrap_or_default())
    }
}

impl PostStore for KvStore<'_> {
    fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Post>> {
        Ok(self.store.get_json(&post_key(id))?)
    }

    fn find_all(&self) -> anyhow::Result<Vec<Post>> {
        let ids = self.index(POSTS_LIST_KEY)?;
        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.store.get_json::<Post>(&post_key(&id))? {
                posts.push(p);
            }
        }
        Ok(posts)
    }

    fn find_by_author(&self, author: &str) -> anyhow::Result<Vec<Post>> {
        let mut posts = self.find_all()?;
        posts.retain(|p| p.author == author);
        Ok(posts)
    }

    fn save(&self, post: &Post) -> anyhow::Result<()> {
        self.store.set_json(&post_key(&post.id), post)?;

        let mut ids = self.index(POSTS_LIST_KEY)?;
        if !ids.contains(&post.id) {
            ids.insert(0, post.id.clone());
            self.store.set_json(POSTS_LIST_KEY, &ids)?;
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.store.delete(&post_key(id))?;

        let mut ids = self.index(POSTS_LIST_KEY)?;
        ids.retain(|existing| existing != id);
        self.store.set_json(POSTS_LIST_KEY, &ids)?;
        Ok(())
    }
}

impl UserStore for KvStore<'_> {
    fn user_by_id(&self, id: &str) -> anyhow::Result<Option<User>> {
        Ok(self.store.get_json(&user_key(id))?)
    }

    fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        for id in self.index(USERS_LIST_KEY)? {
            if let Some(u) = self.store.get_json::<User>(&user_key(&id))? {
                if u.email == email {
                    return Ok(Some(u));
                }
            }
        }
        Ok(None)
    }

    fn save_user(&self, user: &User) -> anyhow::Result<()> {
        self.store.set_json(&user_key(&user.id), user)?;

        let mut ids = self.index(USERS_LIST_KEY)?;
        if !ids.contains(&user.id) {
            ids.push(user.id.clone());
            self.store.set_json(USERS_LIST_KEY, &ids)?;
        }
        Ok(())
    }
}
