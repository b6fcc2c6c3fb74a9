use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{CommentId, PostId};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Unknown(String),

    #[error("Please authenticate")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authorized")]
    PermissionDenied,

    #[error("Post not found")]
    PostNotFound(PostId),

    #[error("Comment not found")]
    CommentNotFound(CommentId),

    #[error("Username or email already exists")]
    UserAlreadyExists,

    #[error("Missing field {0}")]
    MissingField(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::PostNotFound(_) => StatusCode::NOT_FOUND,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
            Error::UserAlreadyExists => StatusCode::BAD_REQUEST,
            Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        let message = self.to_string();
        serde_json::to_vec(&match self {
            Error::Unknown(_) => json!({
                "message": message,
                "type": "unknown",
            }),
            Error::Unauthenticated => json!({
                "message": message,
                "type": "unauthenticated",
            }),
            Error::InvalidCredentials => json!({
                "message": message,
                "type": "invalid-credentials",
            }),
            Error::PermissionDenied => json!({
                "message": message,
                "type": "permission-denied",
            }),
            Error::PostNotFound(id) => json!({
                "message": message,
                "type": "post-not-found",
                "id": id,
            }),
            Error::CommentNotFound(id) => json!({
                "message": message,
                "type": "comment-not-found",
                "id": id,
            }),
            Error::UserAlreadyExists => json!({
                "message": message,
                "type": "conflict-user",
            }),
            Error::MissingField(f) => json!({
                "message": message,
                "type": "missing-field",
                "field": f,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::InvalidRequest(r) => json!({
                "message": message,
                "type": "invalid-request",
                "reason": r,
            }),
        })
        .expect("serializing error")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let get_str = |field: &str| data.get(field).and_then(|v| v.as_str());
        let get_uuid = |field: &str| get_str(field).and_then(|u| Uuid::from_str(u).ok());
        Ok(
            match get_str("type").ok_or_else(|| anyhow!("error type is not a string"))? {
                "unknown" => Error::Unknown(String::from(get_str("message").unwrap_or(""))),
                "unauthenticated" => Error::Unauthenticated,
                "invalid-credentials" => Error::InvalidCredentials,
                "permission-denied" => Error::PermissionDenied,
                "post-not-found" => Error::PostNotFound(PostId(
                    get_uuid("id").ok_or_else(|| anyhow!("post-not-found error without an id"))?,
                )),
                "comment-not-found" => Error::CommentNotFound(CommentId(
                    get_uuid("id")
                        .ok_or_else(|| anyhow!("comment-not-found error without an id"))?,
                )),
                "conflict-user" => Error::UserAlreadyExists,
                "missing-field" => Error::MissingField(String::from(
                    get_str("field").ok_or_else(|| anyhow!("missing-field error without a field"))?,
                )),
                "null-byte" => Error::NullByteInString(String::from(
                    get_str("string")
                        .ok_or_else(|| anyhow!("error is a null-byte-in-string without a string"))?,
                )),
                "invalid-request" => Error::InvalidRequest(String::from(
                    get_str("reason").unwrap_or(""),
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
