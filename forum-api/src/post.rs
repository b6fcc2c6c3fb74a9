use uuid::Uuid;

use crate::{Comment, CommentId, Error, Time, User, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author: UserId,
    pub author_username: String,

    /// Users who upvoted this post, in upvote order, each at most once
    pub upvotes: Vec<UserId>,

    /// Comments, oldest first
    pub comments: Vec<Comment>,

    pub created_at: Time,
    pub updated_at: Time,
}

impl Post {
    pub fn new(author: &User, data: NewPost, now: Time) -> Post {
        Post {
            id: PostId(Uuid::new_v4()),
            title: data.title,
            content: data.content,
            author: author.id,
            author_username: author.username.clone(),
            upvotes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author == user
    }

    pub fn has_upvoted(&self, user: UserId) -> bool {
        self.upvotes.contains(&user)
    }

    /// Returns true iff `user` upvotes the post after the toggle
    pub fn toggle_upvote(&mut self, user: UserId) -> bool {
        if self.has_upvoted(user) {
            self.upvotes.retain(|u| *u != user);
            false
        } else {
            self.upvotes.push(user);
            true
        }
    }

    pub fn apply_update(&mut self, update: PostUpdate, now: Time) {
        if let Some(title) = update.title.filter(|t| !t.is_empty()) {
            self.title = title;
        }
        if let Some(content) = update.content.filter(|c| !c.is_empty()) {
            self.content = content;
        }
        self.updated_at = now;
    }

    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn remove_comment(&mut self, id: CommentId) -> Option<Comment> {
        let idx = self.comments.iter().position(|c| c.id == id)?;
        Some(self.comments.remove(idx))
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("title", &self.title)?;
        crate::validate_required("content", &self.content)?;
        Ok(())
    }
}

/// Partial update, absent or empty fields are left untouched
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct PostUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PostUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        for s in self.title.iter().chain(self.content.iter()) {
            crate::validate_string(s)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Deleted {
    pub message: String,
}
