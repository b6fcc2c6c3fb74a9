use std::collections::HashSet;

use crate::{
    api::{
        AuthToken, Comment, CommentId, Error, NewComment, NewPost, NewSession, NewUser, Post,
        PostId, PostUpdate, Time, User,
    },
    Client, RequestError, Sort, SortExt,
};

/// Renders how long ago `t` was, relative to `now`
pub fn format_age(now: Time, t: Time) -> String {
    let hours = (now - t).num_hours();
    match hours {
        h if h < 1 => String::from("Just now"),
        h if h < 24 => format!("{h}h ago"),
        h => format!("{}d ago", h / 24),
    }
}

/// Client-side state of the forum
///
/// The post list is refetched after every successful mutation, nothing is
/// patched locally.
pub struct Forum {
    client: Client,
    posts: Vec<Post>,
    sort: Sort,
    expanded: HashSet<PostId>,
    user: Option<User>,
}

impl Forum {
    pub fn new(client: Client) -> Forum {
        Forum {
            client,
            posts: Vec::new(),
            sort: Sort::default(),
            expanded: HashSet::new(),
            user: None,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.client.token()
    }

    /// Resolves the stored credential, if any, then fetches the posts
    ///
    /// A credential the server rejects is dropped rather than reported.
    pub async fn load(&mut self) -> Result<(), RequestError> {
        if self.client.token().is_some() {
            match self.client.me().await {
                Ok(me) => self.user = Some(me.user),
                Err(e) if e.is_unauthenticated() => {
                    tracing::info!("stored credential was rejected, signing out");
                    self.signout();
                }
                Err(e) => return Err(e),
            }
        }
        self.refresh().await
    }

    pub async fn refresh(&mut self) -> Result<(), RequestError> {
        let mut posts = self.client.fetch_posts().await?;
        self.sort.sort(&mut posts);
        self.posts = posts;
        Ok(())
    }

    /// Posts in the current sort order
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }

    pub fn set_sort(&mut self, sort: Sort) {
        self.sort = sort;
        self.sort.sort(&mut self.posts);
    }

    pub fn is_expanded(&self, post: PostId) -> bool {
        self.expanded.contains(&post)
    }

    pub fn toggle_comments(&mut self, post: PostId) {
        if !self.expanded.remove(&post) {
            self.expanded.insert(post);
        }
    }

    pub fn expand_all(&mut self) {
        self.expanded.extend(self.posts.iter().map(|p| p.id));
    }

    pub fn has_upvoted(&self, post: &Post) -> bool {
        self.user.as_ref().map_or(false, |u| post.has_upvoted(u.id))
    }

    pub fn can_edit_post(&self, post: &Post) -> bool {
        self.user.as_ref().map_or(false, |u| post.is_owned_by(u.id))
    }

    pub fn can_delete_comment(&self, comment: &Comment) -> bool {
        self.user.as_ref().map_or(false, |u| comment.author == u.id)
    }

    pub async fn signup(&mut self, data: NewUser) -> Result<(), RequestError> {
        data.validate()?;
        let reply = self.client.signup(&data).await?;
        self.client.set_token(Some(reply.token));
        self.user = Some(reply.user);
        self.refresh().await
    }

    pub async fn signin(&mut self, data: NewSession) -> Result<(), RequestError> {
        data.validate()?;
        let reply = self.client.signin(&data).await?;
        self.client.set_token(Some(reply.token));
        self.user = Some(reply.user);
        self.refresh().await
    }

    pub fn signout(&mut self) {
        self.client.set_token(None);
        self.user = None;
    }

    pub async fn create_post(&mut self, data: NewPost) -> Result<Post, RequestError> {
        data.validate()?;
        let post = self.client.create_post(&data).await?;
        self.refresh().await?;
        Ok(post)
    }

    pub async fn edit_post(&mut self, id: PostId, data: PostUpdate) -> Result<Post, RequestError> {
        data.validate()?;
        let post = self.client.update_post(id, &data).await?;
        self.refresh().await?;
        Ok(post)
    }

    pub async fn delete_post(&mut self, id: PostId) -> Result<(), RequestError> {
        self.client.delete_post(id).await?;
        self.expanded.remove(&id);
        self.refresh().await
    }

    /// Refused locally when signed out
    pub async fn upvote(&mut self, id: PostId) -> Result<Post, RequestError> {
        if self.user.is_none() {
            return Err(RequestError::Api(Error::Unauthenticated));
        }
        let post = self.client.upvote(id).await?;
        self.refresh().await?;
        Ok(post)
    }

    pub async fn comment(&mut self, id: PostId, data: NewComment) -> Result<Post, RequestError> {
        data.validate()?;
        let post = self.client.add_comment(id, &data).await?;
        self.refresh().await?;
        Ok(post)
    }

    pub async fn uncomment(
        &mut self,
        post: PostId,
        comment: CommentId,
    ) -> Result<Post, RequestError> {
        let post = self.client.delete_comment(post, comment).await?;
        self.refresh().await?;
        Ok(post)
    }
}
