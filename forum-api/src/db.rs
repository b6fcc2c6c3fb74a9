use async_trait::async_trait;

use crate::{Comment, CommentId, DbUser, Error, Post, PostId, Time, User, UserId};

/// Persistence seam between the request handlers and the actual storage.
///
/// Each call is one self-contained operation, handlers do at most one
/// read-modify-write sequence per request on top of it.
#[async_trait]
pub trait Db: Send + Sync {
    /// Fails with `Error::UserAlreadyExists` if the username or email is taken
    async fn create_user(&self, user: &DbUser) -> anyhow::Result<Result<(), Error>>;
    async fn fetch_user(&self, id: UserId) -> anyhow::Result<Option<User>>;
    async fn fetch_user_by_email(&self, email: &str) -> anyhow::Result<Option<DbUser>>;

    /// All posts, newest first
    async fn fetch_posts(&self) -> anyhow::Result<Vec<Post>>;
    async fn fetch_post(&self, id: PostId) -> anyhow::Result<Option<Post>>;
    async fn create_post(&self, post: &Post) -> anyhow::Result<()>;

    /// Stores new title, content and update time
    async fn update_post(
        &self,
        id: PostId,
        title: &str,
        content: &str,
        updated_at: Time,
    ) -> anyhow::Result<()>;

    /// Also drops the post's comments and upvotes. Returns false if there was no such post
    async fn delete_post(&self, id: PostId) -> anyhow::Result<bool>;

    async fn set_upvote(&self, post: PostId, user: UserId, upvoted: bool) -> anyhow::Result<()>;
    async fn add_comment(&self, post: PostId, comment: &Comment) -> anyhow::Result<()>;

    /// Returns false if there was no such comment on this post
    async fn delete_comment(&self, post: PostId, comment: CommentId) -> anyhow::Result<bool>;
}
