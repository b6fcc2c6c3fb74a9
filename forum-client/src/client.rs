use reqwest::{Method, RequestBuilder, StatusCode};

use crate::api::{
    self, AuthReply, AuthToken, CommentId, Deleted, Me, NewComment, NewPost, NewSession, NewUser,
    Post, PostId, PostUpdate,
};

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Api(#[from] api::Error),

    #[error("failed to reach the server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server answered {status} with an unexpected body: {body}")]
    UnexpectedResponse { status: StatusCode, body: String },
}

impl RequestError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, RequestError::Api(api::Error::Unauthenticated))
    }
}

/// Typed access to the REST surface
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    host: String,
    token: Option<AuthToken>,
}

impl Client {
    pub fn new(host: String) -> Client {
        Client {
            http: reqwest::Client::new(),
            host: String::from(host.trim_end_matches('/')),
            token: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Option<AuthToken>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, format!("{}/api/{}", self.host, path));
        match &self.token {
            Some(tok) => req.bearer_auth(&tok.0),
            None => req,
        }
    }

    async fn send<R>(&self, req: RequestBuilder) -> Result<R, RequestError>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let body = resp.bytes().await?;
        match api::Error::parse(&body) {
            Ok(err) => {
                tracing::debug!(%status, ?err, "server rejected request");
                Err(RequestError::Api(err))
            }
            Err(_) => Err(RequestError::UnexpectedResponse {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    pub async fn signup(&self, data: &NewUser) -> Result<AuthReply, RequestError> {
        self.send(self.request(Method::POST, "auth/signup").json(data))
            .await
    }

    pub async fn signin(&self, data: &NewSession) -> Result<AuthReply, RequestError> {
        self.send(self.request(Method::POST, "auth/signin").json(data))
            .await
    }

    pub async fn me(&self) -> Result<Me, RequestError> {
        self.send(self.request(Method::GET, "auth/me")).await
    }

    pub async fn fetch_posts(&self) -> Result<Vec<Post>, RequestError> {
        self.send(self.request(Method::GET, "posts")).await
    }

    pub async fn create_post(&self, data: &NewPost) -> Result<Post, RequestError> {
        self.send(self.request(Method::POST, "posts").json(data))
            .await
    }

    pub async fn update_post(&self, id: PostId, data: &PostUpdate) -> Result<Post, RequestError> {
        self.send(
            self.request(Method::PUT, &format!("posts/{}", id.0))
                .json(data),
        )
        .await
    }

    pub async fn delete_post(&self, id: PostId) -> Result<Deleted, RequestError> {
        self.send(self.request(Method::DELETE, &format!("posts/{}", id.0)))
            .await
    }

    pub async fn upvote(&self, id: PostId) -> Result<Post, RequestError> {
        self.send(self.request(Method::POST, &format!("posts/{}/upvote", id.0)))
            .await
    }

    pub async fn add_comment(&self, id: PostId, data: &NewComment) -> Result<Post, RequestError> {
        self.send(
            self.request(Method::POST, &format!("posts/{}/comments", id.0))
                .json(data),
        )
        .await
    }

    pub async fn delete_comment(
        &self,
        post: PostId,
        comment: CommentId,
    ) -> Result<Post, RequestError> {
        self.send(self.request(
            Method::DELETE,
            &format!("posts/{}/comments/{}", post.0, comment.0),
        ))
        .await
    }
}
