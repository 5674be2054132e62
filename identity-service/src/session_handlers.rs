use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use crate::error::IdentityError;
use crate::session::{IssuedTokens, RefreshedToken};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub passphrase: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedTokens>, IdentityError> {
    let ctx = state.request_context();
    let result = state
        .authenticator
        .authenticate(&ctx, &request.email, &request.passphrase);
    state.metrics.login_attempt(outcome(&result));
    result.map(Json)
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshedToken>, IdentityError> {
    let ctx = state.request_context();
    let result = state.authenticator.refresh(&ctx, &request.refresh);
    state.metrics.refresh_attempt(outcome(&result));
    result.map(Json)
}

fn outcome<T>(result: &Result<T, IdentityError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(IdentityError::ArgumentInvalid(_)) => "invalid_request",
        Err(IdentityError::InvalidCredentials) => "invalid_credentials",
        Err(IdentityError::WrongIssuer(_)) => "wrong_issuer",
        Err(IdentityError::WrongTokenKind { .. }) => "wrong_kind",
        Err(IdentityError::Token(_)) => "invalid_token",
        Err(IdentityError::Cancelled) => "cancelled",
        Err(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_auth::AuthError;

    #[test]
    fn outcomes_are_stable_labels() {
        assert_eq!(outcome(&Ok::<(), IdentityError>(())), "success");
        assert_eq!(
            outcome::<()>(&Err(IdentityError::InvalidCredentials)),
            "invalid_credentials"
        );
        assert_eq!(
            outcome::<()>(&Err(AuthError::WrongIssuer("X".into()).into())),
            "wrong_issuer"
        );
        assert_eq!(
            outcome::<()>(&Err(AuthError::Verification("expired".into()).into())),
            "invalid_token"
        );
    }
}
