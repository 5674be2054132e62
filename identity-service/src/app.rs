use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use common_auth::{ensure_grant, AuthContext, JwtConfig, JwtVerifier, KeyPair, TokenSigner};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::account_handlers::{
    create_account, delete_account, get_account, list_accounts, search_accounts, update_passphrase,
};
use crate::config::{AdminGrant, BootstrapAdmin, IdentityConfig};
use crate::context::OpContext;
use crate::error::{IdentityError, IdentityResult};
use crate::hasher::CredentialHasher;
use crate::metrics::AuthMetrics;
use crate::role_handlers::{
    get_role, grant_role, list_roles, revoke_all_roles, revoke_role, search_roles,
};
use crate::session::{Authenticator, TokenLifetimes};
use crate::session_handlers::{health, login, metrics, refresh};
use crate::store::IdentityStore;
use crate::tenant_handlers::{
    create_membership, delete_all_memberships, delete_membership, get_membership, list_tenants,
    rename_tenant, search_tenants,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<IdentityStore>,
    pub authenticator: Arc<Authenticator>,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub admin: AdminGrant,
    pub metrics: Arc<AuthMetrics>,
    pub shutdown: CancellationToken,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl AppState {
    pub fn new(
        config: &IdentityConfig,
        keys: &KeyPair,
        hasher: Arc<dyn CredentialHasher>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let lifetimes = TokenLifetimes::new(
            config.token.access_lifetime,
            config.token.refresh_lifetime,
        )
        .context("Invalid token lifetimes")?;
        let jwt_config =
            JwtConfig::new(config.token.issuer.clone()).with_leeway(config.token.leeway_seconds);
        let jwt_verifier = Arc::new(JwtVerifier::from_key_pair(jwt_config, keys));
        let store = Arc::new(IdentityStore::new(hasher));
        let authenticator = Arc::new(Authenticator::new(
            store.clone(),
            TokenSigner::from_key_pair(keys),
            jwt_verifier.clone(),
            lifetimes,
        ));

        Ok(Self {
            store,
            authenticator,
            jwt_verifier,
            admin: config.admin.clone(),
            metrics: Arc::new(AuthMetrics::new()?),
            shutdown,
        })
    }

    /// Per-request scope, cancelled when the server starts shutting down.
    pub fn request_context(&self) -> OpContext {
        OpContext::new(self.shutdown.child_token())
    }

    pub fn require_admin(&self, auth: &AuthContext) -> IdentityResult<()> {
        ensure_grant(auth, &self.admin.tenant, &self.admin.role)?;
        Ok(())
    }

    /// Creates the administrator account and grant if missing. Safe to run on
    /// every start.
    pub fn bootstrap_admin(&self, ctx: &OpContext, bootstrap: &BootstrapAdmin) -> IdentityResult<()> {
        match self
            .store
            .create_account(ctx, &bootstrap.email, &bootstrap.passphrase)
        {
            Ok(()) => info!(email = %bootstrap.email, "Bootstrap administrator created"),
            Err(IdentityError::AlreadyExists(_)) => {
                info!(email = %bootstrap.email, "Bootstrap administrator already present")
            }
            Err(err) => return Err(err),
        }
        match self
            .store
            .grant_role(ctx, &bootstrap.email, &self.admin.tenant, &self.admin.role)
        {
            Ok(()) | Err(IdentityError::AlreadyExists(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ]))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/search", get(search_accounts))
        .route(
            "/accounts/:email",
            get(get_account)
                .put(update_passphrase)
                .delete(delete_account),
        )
        .route(
            "/accounts/:email/tenants",
            get(list_tenants)
                .post(create_membership)
                .delete(delete_all_memberships),
        )
        .route("/accounts/:email/tenants/search", get(search_tenants))
        .route(
            "/accounts/:email/tenants/:tenant",
            get(get_membership)
                .delete(delete_membership)
                .patch(rename_tenant),
        )
        .route(
            "/accounts/:email/tenants/:tenant/roles",
            get(list_roles).post(grant_role).delete(revoke_all_roles),
        )
        .route(
            "/accounts/:email/tenants/:tenant/roles/search",
            get(search_roles),
        )
        .route(
            "/accounts/:email/tenants/:tenant/roles/:role",
            get(get_role).delete(revoke_role),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
