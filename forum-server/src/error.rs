use forum_api::{CommentId, Error as ApiError, PostId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn unauthenticated() -> Error {
        Error::Api(ApiError::Unauthenticated)
    }

    pub fn invalid_credentials() -> Error {
        Error::Api(ApiError::InvalidCredentials)
    }

    pub fn permission_denied() -> Error {
        Error::Api(ApiError::PermissionDenied)
    }

    pub fn post_not_found(id: PostId) -> Error {
        Error::Api(ApiError::PostNotFound(id))
    }

    pub fn comment_not_found(id: CommentId) -> Error {
        Error::Api(ApiError::CommentNotFound(id))
    }

    pub fn invalid_request(reason: String) -> Error {
        Error::Api(ApiError::InvalidRequest(reason))
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let err = match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal server error");
                #[cfg(not(test))]
                let err =
                    ApiError::Unknown(String::from("Internal server error, see logs for details"));
                #[cfg(test)]
                let err = ApiError::Unknown(format!("Internal server error: {err:?}"));
                err
            }
            Error::Api(err) => {
                tracing::info!("returning error to client: {err}");
                err
            }
        };
        (
            err.status_code(),
            [(
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderValue::from_static("application/json"),
            )],
            err.contents(),
        )
            .into_response()
    }
}
