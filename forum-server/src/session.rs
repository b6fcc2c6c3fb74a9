use std::sync::Arc;

use anyhow::Context;
use forum_api::{AuthToken, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Only suitable for local development
pub const DEFAULT_SECRET: &str = "insecure-development-secret";

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct Claims {
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Everything needed to hand out and check credentials: the token signing
/// keys and the password hashing cost
#[derive(Clone)]
pub struct Credentials(Arc<Keys>);

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: chrono::Duration,
    bcrypt_cost: u32,
}

impl Credentials {
    pub fn new(secret: &[u8], lifetime: chrono::Duration, bcrypt_cost: u32) -> Credentials {
        Credentials(Arc::new(Keys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            lifetime,
            bcrypt_cost,
        }))
    }

    pub fn issue(&self, user: UserId) -> anyhow::Result<AuthToken> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user,
            iat: now.timestamp(),
            exp: (now + self.0.lifetime).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.0.encoding)
            .with_context(|| format!("signing token for {:?}", user))?;
        Ok(AuthToken(token))
    }

    /// Checks signature and expiry, returning the user the token was issued to
    pub fn verify(&self, token: &AuthToken) -> Option<UserId> {
        match jsonwebtoken::decode::<Claims>(&token.0, &self.0.decoding, &self.0.validation) {
            Ok(data) => Some(data.claims.sub),
            Err(err) => {
                tracing::debug!(?err, "rejecting token");
                None
            }
        }
    }

    pub async fn hash_password(&self, password: String) -> anyhow::Result<String> {
        let cost = self.0.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("joining password hashing task")?
            .context("hashing password")
    }

    pub async fn check_password(&self, password: String, hash: String) -> anyhow::Result<bool> {
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("joining password verification task")?
            .context("verifying password against stored hash")
    }
}
