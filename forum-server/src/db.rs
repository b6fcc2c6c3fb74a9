use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use forum_api::{
    Comment, CommentId, Db, DbUser, Error, Post, PostId, Time, User, UserId, Uuid,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    created_at: Time,
}

impl From<UserRow> for DbUser {
    fn from(u: UserRow) -> DbUser {
        DbUser {
            id: UserId(u.id),
            username: u.username,
            email: u.email,
            password_hash: u.password_hash,
            created_at: u.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    title: String,
    content: String,
    created_at: Time,
    updated_at: Time,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    author_username: String,
    content: String,
    created_at: Time,
}

pub struct PgDb {
    pool: sqlx::PgPool,
}

impl PgDb {
    pub fn new(pool: sqlx::PgPool) -> PgDb {
        PgDb { pool }
    }
}

/// Loads either all posts or only `only`, newest first, along with their upvotes and comments
async fn load_posts(
    conn: &mut sqlx::PgConnection,
    only: Option<PostId>,
) -> anyhow::Result<Vec<Post>> {
    let only = only.map(|p| p.0);
    let rows = sqlx::query_as::<_, PostRow>(
        "
            SELECT id, author_id, author_username, title, content, created_at, updated_at
                FROM posts
            WHERE $1::uuid IS NULL OR id = $1
            ORDER BY created_at DESC, id DESC
        ",
    )
    .bind(only)
    .fetch_all(&mut *conn)
    .await
    .context("querying posts table")?;

    let mut upvotes = HashMap::<Uuid, Vec<UserId>>::new();
    for (post_id, user_id) in sqlx::query_as::<_, (Uuid, Uuid)>(
        "
            SELECT post_id, user_id
                FROM upvotes
            WHERE $1::uuid IS NULL OR post_id = $1
            ORDER BY seq
        ",
    )
    .bind(only)
    .fetch_all(&mut *conn)
    .await
    .context("querying upvotes table")?
    {
        upvotes.entry(post_id).or_default().push(UserId(user_id));
    }

    let mut comments = HashMap::<Uuid, Vec<Comment>>::new();
    for c in sqlx::query_as::<_, CommentRow>(
        "
            SELECT id, post_id, author_id, author_username, content, created_at
                FROM comments
            WHERE $1::uuid IS NULL OR post_id = $1
            ORDER BY seq
        ",
    )
    .bind(only)
    .fetch_all(&mut *conn)
    .await
    .context("querying comments table")?
    {
        comments.entry(c.post_id).or_default().push(Comment {
            id: CommentId(c.id),
            content: c.content,
            author: UserId(c.author_id),
            author_username: c.author_username,
            created_at: c.created_at,
        });
    }

    Ok(rows
        .into_iter()
        .map(|p| Post {
            id: PostId(p.id),
            title: p.title,
            content: p.content,
            author: UserId(p.author_id),
            author_username: p.author_username,
            upvotes: upvotes.remove(&p.id).unwrap_or_default(),
            comments: comments.remove(&p.id).unwrap_or_default(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
        .collect())
}

#[async_trait]
impl Db for PgDb {
    async fn create_user(&self, user: &DbUser) -> anyhow::Result<Result<(), Error>> {
        let res = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at)
                VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id.0)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;
        match res {
            Ok(_) => Ok(Ok(())),
            Err(sqlx::Error::Database(err)) if err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Ok(Err(Error::UserAlreadyExists))
            }
            Err(err) => Err(err).with_context(|| format!("inserting user {:?}", user.id)),
        }
    }

    async fn fetch_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        Ok(
            sqlx::query_as::<_, (Uuid, String, String)>(
                "SELECT id, username, email FROM users WHERE id = $1",
            )
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("querying user {:?}", id))?
            .map(|(id, username, email)| User {
                id: UserId(id),
                username,
                email,
            }),
        )
    }

    async fn fetch_user_by_email(&self, email: &str) -> anyhow::Result<Option<DbUser>> {
        Ok(sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("querying users table by email")?
        .map(DbUser::from))
    }

    async fn fetch_posts(&self) -> anyhow::Result<Vec<Post>> {
        let mut tx = self.pool.begin().await.context("starting transaction")?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .context("setting transaction isolation level")?;
        let posts = load_posts(&mut *tx, None).await?;
        tx.commit().await.context("closing transaction")?;
        Ok(posts)
    }

    async fn fetch_post(&self, id: PostId) -> anyhow::Result<Option<Post>> {
        let mut tx = self.pool.begin().await.context("starting transaction")?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .context("setting transaction isolation level")?;
        let post = load_posts(&mut *tx, Some(id)).await?.pop();
        tx.commit().await.context("closing transaction")?;
        Ok(post)
    }

    async fn create_post(&self, post: &Post) -> anyhow::Result<()> {
        sqlx::query(
            "
                INSERT INTO posts
                    (id, author_id, author_username, title, content, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(post.id.0)
        .bind(post.author.0)
        .bind(&post.author_username)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting post {:?}", post.id))?;
        Ok(())
    }

    async fn update_post(
        &self,
        id: PostId,
        title: &str,
        content: &str,
        updated_at: Time,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE posts SET title = $2, content = $3, updated_at = $4 WHERE id = $1")
            .bind(id.0)
            .bind(title)
            .bind(content)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .with_context(|| format!("updating post {:?}", id))?;
        Ok(())
    }

    async fn delete_post(&self, id: PostId) -> anyhow::Result<bool> {
        // comments and upvotes go away with ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("deleting post {:?}", id))?;
        Ok(res.rows_affected() == 1)
    }

    async fn set_upvote(&self, post: PostId, user: UserId, upvoted: bool) -> anyhow::Result<()> {
        let query = match upvoted {
            true => "INSERT INTO upvotes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            false => "DELETE FROM upvotes WHERE post_id = $1 AND user_id = $2",
        };
        sqlx::query(query)
            .bind(post.0)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("setting upvote of {:?} on {:?} to {upvoted}", user, post))?;
        Ok(())
    }

    async fn add_comment(&self, post: PostId, comment: &Comment) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, author_username, content, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id.0)
        .bind(post.0)
        .bind(comment.author.0)
        .bind(&comment.author_username)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("inserting comment {:?}", comment.id))?;
        Ok(())
    }

    async fn delete_comment(&self, post: PostId, comment: CommentId) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1 AND post_id = $2")
            .bind(comment.0)
            .bind(post.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("deleting comment {:?}", comment))?;
        Ok(res.rows_affected() == 1)
    }
}
