use std::sync::Arc;

use anyhow::Context;
use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts,
    },
    http::{self, request, Request},
};
use forum_api::{AuthToken, Db, User};

use crate::{session::Credentials, Error};

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: Arc<dyn Db>,
    pub credentials: Credentials,
}

/// Bearer token, not yet checked
pub struct PreAuth(pub AuthToken);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for PreAuth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<PreAuth, Error> {
        match req.headers.get(http::header::AUTHORIZATION) {
            None => Err(Error::unauthenticated()),
            Some(auth) => {
                let auth = auth.to_str().map_err(|_| Error::unauthenticated())?;
                let mut auth = auth.split(' ');
                if !auth
                    .next()
                    .ok_or(Error::unauthenticated())?
                    .eq_ignore_ascii_case("bearer")
                {
                    return Err(Error::unauthenticated());
                }
                let token = auth.next().ok_or(Error::unauthenticated())?;
                if token.is_empty() || auth.next().is_some() {
                    return Err(Error::unauthenticated());
                }
                Ok(PreAuth(AuthToken(String::from(token))))
            }
        }
    }
}

/// The user the request's token was issued to
pub struct Auth(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, state: &AppState) -> Result<Auth, Error> {
        let token = PreAuth::from_request_parts(req, state).await?.0;
        let user_id = state
            .credentials
            .verify(&token)
            .ok_or(Error::unauthenticated())?;
        let user = state
            .db
            .fetch_user(user_id)
            .await
            .with_context(|| format!("resolving session of {:?}", user_id))?;
        match user {
            Some(user) => Ok(Auth(user)),
            None => {
                tracing::debug!(?user_id, "valid token for unknown user");
                Err(Error::unauthenticated())
            }
        }
    }
}

/// JSON body whose parse failures are reported like every other API error
pub struct Body<T>(pub T);

#[async_trait]
impl<S, B, T> FromRequest<S, B> for Body<T>
where
    axum::Json<T>: FromRequest<S, B, Rejection = JsonRejection>,
    S: Send + Sync,
    B: Send + 'static,
{
    type Rejection = Error;

    async fn from_request(req: Request<B>, state: &S) -> Result<Body<T>, Error> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(v)) => Ok(Body(v)),
            Err(rejection) => Err(Error::invalid_request(rejection.body_text())),
        }
    }
}

/// Ids taken from the request path
pub struct Ids<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Ids<T>
where
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, state: &S) -> Result<Ids<T>, Error> {
        match axum::extract::Path::<T>::from_request_parts(req, state).await {
            Ok(axum::extract::Path(v)) => Ok(Ids(v)),
            Err(rejection) => Err(Error::invalid_request(rejection.body_text())),
        }
    }
}
