use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, http::StatusCode, Json};
use forum_api::{
    AuthReply, Comment, CommentId, Db, DbUser, Deleted, Me, NewComment, NewPost, NewSession,
    NewUser, Post, PostId, PostUpdate, UserId, Uuid,
};

use crate::{extractors::*, session::Credentials, Error};

async fn fetch_post(db: &dyn Db, id: PostId) -> Result<Post, Error> {
    db.fetch_post(id)
        .await
        .with_context(|| format!("fetching post {:?}", id))?
        .ok_or(Error::post_not_found(id))
}

pub async fn signup(
    State(db): State<Arc<dyn Db>>,
    State(credentials): State<Credentials>,
    Body(data): Body<NewUser>,
) -> Result<(StatusCode, Json<AuthReply>), Error> {
    data.validate()?;
    let user = DbUser {
        id: UserId(Uuid::new_v4()),
        password_hash: credentials.hash_password(data.password).await?,
        username: data.username,
        email: data.email,
        created_at: forum_api::now(),
    };
    db.create_user(&user)
        .await
        .with_context(|| format!("creating user {:?}", user.username))??;
    tracing::info!(user = ?user.id, username = %user.username, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(AuthReply {
            token: credentials.issue(user.id)?,
            user: user.public(),
        }),
    ))
}

pub async fn signin(
    State(db): State<Arc<dyn Db>>,
    State(credentials): State<Credentials>,
    Body(data): Body<NewSession>,
) -> Result<Json<AuthReply>, Error> {
    data.validate()?;
    // unknown email and wrong password must be indistinguishable
    let user = db
        .fetch_user_by_email(&data.email)
        .await
        .context("looking up user by email")?
        .ok_or(Error::invalid_credentials())?;
    if !credentials
        .check_password(data.password, user.password_hash.clone())
        .await?
    {
        return Err(Error::invalid_credentials());
    }
    Ok(Json(AuthReply {
        token: credentials.issue(user.id)?,
        user: user.public(),
    }))
}

pub async fn me(Auth(user): Auth) -> Json<Me> {
    Json(Me { user })
}

pub async fn fetch_posts(State(db): State<Arc<dyn Db>>) -> Result<Json<Vec<Post>>, Error> {
    Ok(Json(db.fetch_posts().await.context("fetching post list")?))
}

pub async fn create_post(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Body(data): Body<NewPost>,
) -> Result<(StatusCode, Json<Post>), Error> {
    data.validate()?;
    let post = Post::new(&user, data, forum_api::now());
    db.create_post(&post)
        .await
        .with_context(|| format!("creating post {:?} for {:?}", post.id, user.id))?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Ids(id): Ids<PostId>,
    Body(update): Body<PostUpdate>,
) -> Result<Json<Post>, Error> {
    update.validate()?;
    let mut post = fetch_post(&*db, id).await?;
    if !post.is_owned_by(user.id) {
        return Err(Error::permission_denied());
    }
    post.apply_update(update, forum_api::now());
    db.update_post(id, &post.title, &post.content, post.updated_at)
        .await
        .with_context(|| format!("updating post {:?}", id))?;
    Ok(Json(post))
}

pub async fn delete_post(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Ids(id): Ids<PostId>,
) -> Result<Json<Deleted>, Error> {
    let post = fetch_post(&*db, id).await?;
    if !post.is_owned_by(user.id) {
        return Err(Error::permission_denied());
    }
    if !db
        .delete_post(id)
        .await
        .with_context(|| format!("deleting post {:?}", id))?
    {
        return Err(Error::post_not_found(id));
    }
    Ok(Json(Deleted {
        message: String::from("Post deleted"),
    }))
}

pub async fn upvote(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Ids(id): Ids<PostId>,
) -> Result<Json<Post>, Error> {
    let mut post = fetch_post(&*db, id).await?;
    let upvoted = post.toggle_upvote(user.id);
    db.set_upvote(id, user.id, upvoted)
        .await
        .with_context(|| format!("setting upvote of {:?} on {:?} to {upvoted}", user.id, id))?;
    Ok(Json(post))
}

pub async fn add_comment(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Ids(id): Ids<PostId>,
    Body(data): Body<NewComment>,
) -> Result<(StatusCode, Json<Post>), Error> {
    let mut post = fetch_post(&*db, id).await?;
    data.validate()?;
    let comment = Comment::new(&user, data, forum_api::now());
    db.add_comment(id, &comment)
        .await
        .with_context(|| format!("adding comment {:?} to {:?}", comment.id, id))?;
    post.comments.push(comment);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn delete_comment(
    Auth(user): Auth,
    State(db): State<Arc<dyn Db>>,
    Ids((post_id, comment_id)): Ids<(PostId, CommentId)>,
) -> Result<Json<Post>, Error> {
    let mut post = fetch_post(&*db, post_id).await?;
    let author = post
        .comment(comment_id)
        .ok_or(Error::comment_not_found(comment_id))?
        .author;
    if author != user.id {
        return Err(Error::permission_denied());
    }
    if !db
        .delete_comment(post_id, comment_id)
        .await
        .with_context(|| format!("deleting comment {:?} of {:?}", comment_id, post_id))?
    {
        return Err(Error::comment_not_found(comment_id));
    }
    post.remove_comment(comment_id);
    Ok(Json(post))
}
