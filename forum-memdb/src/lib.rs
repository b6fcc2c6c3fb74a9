use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap},
};

use async_trait::async_trait;
use forum_api::{
    Comment, CommentId, Db, DbUser, Error, Post, PostId, Time, User, UserId,
};
use tokio::sync::RwLock;

/// In-memory store, used by the tests and by `forum-server --in-memory`
#[derive(Debug, Default)]
pub struct MemDb(RwLock<State>);

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, DbUser>,
    posts: HashMap<PostId, Post>,
}

impl MemDb {
    pub fn new() -> MemDb {
        MemDb::default()
    }

    /// Return the current number of users
    pub async fn test_num_users(&self) -> usize {
        self.0.read().await.users.len()
    }
}

#[async_trait]
impl Db for MemDb {
    async fn create_user(&self, user: &DbUser) -> anyhow::Result<Result<(), Error>> {
        let mut state = self.0.write().await;
        if state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email || u.id == user.id)
        {
            return Ok(Err(Error::UserAlreadyExists));
        }
        state.users.insert(user.id, user.clone());
        Ok(Ok(()))
    }

    async fn fetch_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        Ok(self.0.read().await.users.get(&id).map(DbUser::public))
    }

    async fn fetch_user_by_email(&self, email: &str) -> anyhow::Result<Option<DbUser>> {
        Ok(self
            .0
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn fetch_posts(&self) -> anyhow::Result<Vec<Post>> {
        let mut posts = self
            .0
            .read()
            .await
            .posts
            .values()
            .cloned()
            .collect::<Vec<_>>();
        posts.sort_unstable_by_key(|p| Reverse((p.created_at, p.id)));
        Ok(posts)
    }

    async fn fetch_post(&self, id: PostId) -> anyhow::Result<Option<Post>> {
        Ok(self.0.read().await.posts.get(&id).cloned())
    }

    async fn create_post(&self, post: &Post) -> anyhow::Result<()> {
        let mut state = self.0.write().await;
        anyhow::ensure!(
            state.users.contains_key(&post.author),
            "post {:?} has unknown author {:?}",
            post.id,
            post.author
        );
        anyhow::ensure!(
            !state.posts.contains_key(&post.id),
            "post {:?} already exists",
            post.id
        );
        state.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_post(
        &self,
        id: PostId,
        title: &str,
        content: &str,
        updated_at: Time,
    ) -> anyhow::Result<()> {
        if let Some(p) = self.0.write().await.posts.get_mut(&id) {
            p.title = String::from(title);
            p.content = String::from(content);
            p.updated_at = updated_at;
        }
        Ok(())
    }

    async fn delete_post(&self, id: PostId) -> anyhow::Result<bool> {
        Ok(self.0.write().await.posts.remove(&id).is_some())
    }

    async fn set_upvote(&self, post: PostId, user: UserId, upvoted: bool) -> anyhow::Result<()> {
        if let Some(p) = self.0.write().await.posts.get_mut(&post) {
            if p.has_upvoted(user) != upvoted {
                p.toggle_upvote(user);
            }
        }
        Ok(())
    }

    async fn add_comment(&self, post: PostId, comment: &Comment) -> anyhow::Result<()> {
        let mut state = self.0.write().await;
        anyhow::ensure!(
            state.users.contains_key(&comment.author),
            "comment {:?} has unknown author {:?}",
            comment.id,
            comment.author
        );
        match state.posts.get_mut(&post) {
            Some(p) => {
                p.comments.push(comment.clone());
                Ok(())
            }
            None => Err(anyhow::anyhow!("adding comment to missing post {:?}", post)),
        }
    }

    async fn delete_comment(&self, post: PostId, comment: CommentId) -> anyhow::Result<bool> {
        Ok(self
            .0
            .write()
            .await
            .posts
            .get_mut(&post)
            .and_then(|p| p.remove_comment(comment))
            .is_some())
    }
}
