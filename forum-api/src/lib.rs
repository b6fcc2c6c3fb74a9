use chrono::{SubsecRound, Utc};

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod auth;
pub use auth::{AuthReply, AuthToken, Me, NewSession};

mod comment;
pub use comment::{Comment, CommentId, NewComment};

mod db;
pub use db::Db;

mod error;
pub use error::Error;

mod post;
pub use post::{Deleted, NewPost, Post, PostId, PostUpdate};

mod user;
pub use user::{DbUser, NewUser, User, UserId};

/// Current time, at the microsecond precision the database keeps
pub fn now() -> Time {
    Utc::now().trunc_subsecs(6)
}

pub fn validate_string(s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(s))),
        false => Ok(()),
    }
}

/// Same as `validate_string`, but the error only names the field
pub fn validate_secret(field: &str, s: &str) -> Result<(), Error> {
    match s.contains('\0') {
        true => Err(Error::NullByteInString(String::from(field))),
        false => Ok(()),
    }
}

/// Required fields count as missing when empty
pub fn validate_required(field: &str, s: &str) -> Result<(), Error> {
    if s.is_empty() {
        return Err(Error::MissingField(String::from(field)));
    }
    validate_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_required_rejects_empty_and_nul() {
        assert_eq!(
            validate_required("title", ""),
            Err(Error::MissingField(String::from("title")))
        );
        assert_eq!(
            validate_required("title", "a\0b"),
            Err(Error::NullByteInString(String::from("a\0b")))
        );
        assert_eq!(validate_required("title", "Hello"), Ok(()));
    }

    #[test]
    fn secrets_are_never_echoed() {
        assert_eq!(
            validate_secret("password", "s3cret\0pw"),
            Err(Error::NullByteInString(String::from("password")))
        );
        assert_eq!(validate_secret("password", "s3cret"), Ok(()));
    }
}
