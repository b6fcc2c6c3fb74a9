use uuid::Uuid;

use crate::{Error, Time, User, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub author: UserId,
    pub author_username: String,
    pub created_at: Time,
}

impl Comment {
    pub fn new(author: &User, data: NewComment, now: Time) -> Comment {
        Comment {
            id: CommentId(Uuid::new_v4()),
            content: data.content,
            author: author.id,
            author_username: author.username.clone(),
            created_at: now,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    #[serde(default)]
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("content", &self.content)
    }
}
