use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use serde::{Deserialize, Serialize};

use crate::account_handlers::SearchQuery;
use crate::error::IdentityError;
use crate::AppState;

#[derive(Deserialize)]
pub struct RoleBody {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleList {
    pub email: String,
    pub tenant: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleStatus {
    pub email: String,
    pub tenant: String,
    pub role: String,
    pub exists: bool,
}

pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
) -> Result<Json<RoleList>, IdentityError> {
    state.require_admin(&auth)?;
    let roles = state
        .store
        .list_roles(&state.request_context(), &email, &tenant)?;
    Ok(Json(RoleList {
        email,
        tenant,
        roles,
    }))
}

pub async fn search_roles(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<RoleList>, IdentityError> {
    state.require_admin(&auth)?;
    let roles = state.store.search_roles_by_prefix(
        &state.request_context(),
        &email,
        &tenant,
        &query.q,
    )?;
    Ok(Json(RoleList {
        email,
        tenant,
        roles,
    }))
}

pub async fn grant_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
    Json(body): Json<RoleBody>,
) -> Result<(StatusCode, Json<RoleStatus>), IdentityError> {
    state.require_admin(&auth)?;
    state
        .store
        .grant_role(&state.request_context(), &email, &tenant, &body.role)?;
    Ok((
        StatusCode::CREATED,
        Json(RoleStatus {
            email,
            tenant,
            role: body.role,
            exists: true,
        }),
    ))
}

pub async fn revoke_all_roles(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
) -> Result<StatusCode, IdentityError> {
    state.require_admin(&auth)?;
    state
        .store
        .revoke_all_roles(&state.request_context(), &email, &tenant)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant, role)): Path<(String, String, String)>,
) -> Result<Json<RoleStatus>, IdentityError> {
    state.require_admin(&auth)?;
    let exists = state
        .store
        .role_exists(&state.request_context(), &email, &tenant, &role)?;
    Ok(Json(RoleStatus {
        email,
        tenant,
        role,
        exists,
    }))
}

pub async fn revoke_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant, role)): Path<(String, String, String)>,
) -> Result<StatusCode, IdentityError> {
    state.require_admin(&auth)?;
    state
        .store
        .revoke_role(&state.request_context(), &email, &tenant, &role)?;
    Ok(StatusCode::NO_CONTENT)
}
