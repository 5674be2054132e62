use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common_auth::{AuthContext, TenantRoleGrant};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IdentityError;
use crate::AppState;

#[derive(Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub passphrase: String,
    /// `"role1,role2@tenant1,tenant2"` grants applied on creation.
    #[serde(default)]
    pub tenant_roles: Vec<String>,
}

#[derive(Deserialize)]
pub struct PassphraseChange {
    pub old: String,
    pub new: String,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct AccountStatus {
    pub email: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountList {
    pub accounts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PassphraseUpdated {
    pub updated: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountDeleted {
    pub deleted: bool,
}

pub async fn create_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<NewAccount>,
) -> Result<(StatusCode, Json<AccountStatus>), IdentityError> {
    state.require_admin(&auth)?;
    let grants = payload
        .tenant_roles
        .iter()
        .map(|value| value.parse::<TenantRoleGrant>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| IdentityError::ArgumentInvalid("tenant_roles"))?;

    let ctx = state.request_context();
    state
        .store
        .register(&ctx, &payload.email, &payload.passphrase, &grants)?;
    info!(email = %payload.email, admin = %auth.subject(), "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(AccountStatus {
            email: payload.email,
            exists: true,
        }),
    ))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<AccountList>, IdentityError> {
    state.require_admin(&auth)?;
    let accounts = state.store.list_accounts(&state.request_context())?;
    Ok(Json(AccountList { accounts }))
}

pub async fn search_accounts(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<AccountList>, IdentityError> {
    state.require_admin(&auth)?;
    let accounts = state
        .store
        .search_by_prefix(&state.request_context(), &query.q)?;
    Ok(Json(AccountList { accounts }))
}

pub async fn get_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
) -> Result<Json<AccountStatus>, IdentityError> {
    state.require_admin(&auth)?;
    let exists = state.store.exists(&state.request_context(), &email)?;
    Ok(Json(AccountStatus { email, exists }))
}

pub async fn update_passphrase(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
    Json(change): Json<PassphraseChange>,
) -> Result<Json<PassphraseUpdated>, IdentityError> {
    state.require_admin(&auth)?;
    let updated =
        state
            .store
            .update_passphrase(&state.request_context(), &email, &change.old, &change.new)?;
    Ok(Json(PassphraseUpdated { updated }))
}

pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
) -> Result<Json<AccountDeleted>, IdentityError> {
    state.require_admin(&auth)?;
    let deleted = state
        .store
        .delete_account(&state.request_context(), &email)?;
    if deleted {
        info!(email = %email, admin = %auth.subject(), "Account deleted");
    }
    Ok(Json(AccountDeleted { deleted }))
}
