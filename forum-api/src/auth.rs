use crate::{Error, User};

/// Signed session credential, sent back as `Authorization: Bearer <token>`
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthToken(pub String);

/// Signin request
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewSession {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl NewSession {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.email)?;
        crate::validate_secret("password", &self.password)?;
        Ok(())
    }
}

/// Answer to both signup and signin
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthReply {
    pub token: AuthToken,
    pub user: User,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Me {
    pub user: User,
}
