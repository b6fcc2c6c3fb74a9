use crate::{Error, Time, STUB_UUID};

use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

/// Public view of an user, as sent over the wire
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// An user as stored in the database
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DbUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: Time,
}

impl DbUser {
    pub fn public(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Signup request
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("username", &self.username)?;
        crate::validate_required("email", &self.email)?;
        if self.password.is_empty() {
            return Err(Error::MissingField(String::from("password")));
        }
        crate::validate_secret("password", &self.password)?;
        Ok(())
    }
}
