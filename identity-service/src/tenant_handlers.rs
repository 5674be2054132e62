use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common_auth::AuthContext;
use serde::{Deserialize, Serialize};

use crate::account_handlers::SearchQuery;
use crate::error::IdentityError;
use crate::AppState;

#[derive(Deserialize)]
pub struct TenantBody {
    pub tenant: String,
}

#[derive(Debug, Serialize)]
pub struct TenantList {
    pub email: String,
    pub tenants: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MembershipStatus {
    pub email: String,
    pub tenant: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct MembershipsDeleted {
    pub deleted: usize,
}

pub async fn list_tenants(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
) -> Result<Json<TenantList>, IdentityError> {
    state.require_admin(&auth)?;
    let tenants = state.store.list_tenants(&state.request_context(), &email)?;
    Ok(Json(TenantList { email, tenants }))
}

pub async fn search_tenants(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<TenantList>, IdentityError> {
    state.require_admin(&auth)?;
    let tenants =
        state
            .store
            .search_tenants_by_prefix(&state.request_context(), &email, &query.q)?;
    Ok(Json(TenantList { email, tenants }))
}

pub async fn create_membership(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
    Json(body): Json<TenantBody>,
) -> Result<(StatusCode, Json<MembershipStatus>), IdentityError> {
    state.require_admin(&auth)?;
    state
        .store
        .create_membership(&state.request_context(), &email, &body.tenant)?;
    Ok((
        StatusCode::CREATED,
        Json(MembershipStatus {
            email,
            tenant: body.tenant,
            exists: true,
        }),
    ))
}

pub async fn delete_all_memberships(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(email): Path<String>,
) -> Result<Json<MembershipsDeleted>, IdentityError> {
    state.require_admin(&auth)?;
    let deleted = state
        .store
        .delete_all_memberships(&state.request_context(), &email)?;
    Ok(Json(MembershipsDeleted { deleted }))
}

pub async fn get_membership(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
) -> Result<Json<MembershipStatus>, IdentityError> {
    state.require_admin(&auth)?;
    let exists = state
        .store
        .membership_exists(&state.request_context(), &email, &tenant)?;
    Ok(Json(MembershipStatus {
        email,
        tenant,
        exists,
    }))
}

pub async fn delete_membership(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
) -> Result<StatusCode, IdentityError> {
    state.require_admin(&auth)?;
    state
        .store
        .delete_membership(&state.request_context(), &email, &tenant)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rename_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((email, tenant)): Path<(String, String)>,
    Json(body): Json<TenantBody>,
) -> Result<Json<MembershipStatus>, IdentityError> {
    state.require_admin(&auth)?;
    state
        .store
        .rename_tenant(&state.request_context(), &email, &tenant, &body.tenant)?;
    Ok(Json(MembershipStatus {
        email,
        tenant: body.tenant,
        exists: true,
    }))
}
