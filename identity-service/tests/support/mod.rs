#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use common_auth::KeyPair;
use identity_service::config::{
    AdminGrant, BootstrapAdmin, Environment, IdentityConfig, ServerSettings, TokenSettings,
};
use identity_service::{AppState, Argon2Hasher, HasherParams, IdentityStore, OpContext};
use tokio_util::sync::CancellationToken;

pub const ADMIN_EMAIL: &str = "root@system.test";
pub const ADMIN_PASSPHRASE: &str = "correct horse battery staple";

const FOREIGN_PRIVATE_PEM: &str = include_str!("../fixtures/foreign_private.pem");
const FOREIGN_PUBLIC_PEM: &str = include_str!("../fixtures/foreign_public.pem");

pub fn fast_hasher() -> Arc<Argon2Hasher> {
    Arc::new(Argon2Hasher::new(HasherParams::insecure_fast()).expect("argon2 params"))
}

pub fn test_store() -> Arc<IdentityStore> {
    Arc::new(IdentityStore::new(fast_hasher()))
}

pub fn service_keys() -> KeyPair {
    KeyPair::embedded().expect("embedded key pair")
}

/// A valid pair that this service does not trust.
pub fn foreign_keys() -> KeyPair {
    KeyPair::from_pem(FOREIGN_PRIVATE_PEM, FOREIGN_PUBLIC_PEM).expect("foreign key pair")
}

pub fn test_config(issuer: &str) -> IdentityConfig {
    IdentityConfig {
        environment: Environment::Development,
        token: TokenSettings {
            issuer: issuer.to_string(),
            access_lifetime: Duration::from_secs(15 * 60),
            refresh_lifetime: Duration::from_secs(24 * 60 * 60),
            private_key_path: None,
            public_key_path: None,
            leeway_seconds: 0,
        },
        admin: AdminGrant {
            tenant: "system".to_string(),
            role: "admin".to_string(),
        },
        bootstrap: Some(BootstrapAdmin {
            email: ADMIN_EMAIL.to_string(),
            passphrase: ADMIN_PASSPHRASE.to_string(),
        }),
        hasher: HasherParams::insecure_fast(),
        server: ServerSettings {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            grace_period: Duration::from_secs(1),
            log_level: "debug".to_string(),
        },
    }
}

pub fn test_state_with(issuer: &str, keys: &KeyPair) -> AppState {
    let config = test_config(issuer);
    let state = AppState::new(&config, keys, fast_hasher(), CancellationToken::new())
        .expect("app state");
    if let Some(bootstrap) = &config.bootstrap {
        state
            .bootstrap_admin(&OpContext::background(), bootstrap)
            .expect("bootstrap admin");
    }
    state
}

pub fn test_state(issuer: &str) -> AppState {
    test_state_with(issuer, &service_keys())
}
