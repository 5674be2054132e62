use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to decode token header: {0}")]
    InvalidHeader(String),
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("failed to parse {0} key: {1}")]
    KeyParse(&'static str, String),
    #[error("public key does not match private key")]
    KeyMismatch,
    #[error("failed to read key file '{path}': {reason}")]
    KeyFile { path: String, reason: String },
    #[error("embedded development key pair refused: {0}")]
    EmbeddedKeyRejected(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("token issued by '{0}' is not trusted")]
    WrongIssuer(String),
    #[error("expected {expected} token, got {actual}")]
    WrongTokenKind {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("invalid tenant-role grant '{0}'")]
    InvalidGrant(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Verification(value.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingAuthorization | AuthError::InvalidAuthorization => {
                (StatusCode::UNAUTHORIZED, "AUTH_HEADER")
            }
            AuthError::InvalidHeader(_)
            | AuthError::Verification(_)
            | AuthError::WrongIssuer(_)
            | AuthError::WrongTokenKind { .. } => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN"),
            AuthError::InvalidClaim(_, _) | AuthError::InvalidJson(_) => {
                (StatusCode::BAD_REQUEST, "AUTH_CLAIMS")
            }
            AuthError::InvalidGrant(_) => (StatusCode::FORBIDDEN, "AUTH_GRANT"),
            AuthError::KeyParse(_, _)
            | AuthError::KeyMismatch
            | AuthError::KeyFile { .. }
            | AuthError::EmbeddedKeyRejected(_)
            | AuthError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_KEY"),
        };

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
