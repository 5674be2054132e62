pub mod account_handlers;
pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod hasher;
pub mod metrics;
pub mod role_handlers;
pub mod session;
pub mod session_handlers;
pub mod store;
pub mod tenant_handlers;

pub use app::{build_router, AppState};
pub use context::OpContext;
pub use error::{IdentityError, IdentityResult};
pub use hasher::{Argon2Hasher, CredentialHasher, HasherParams};
pub use session::{Authenticator, IssuedTokens, RefreshedToken, TokenLifetimes};
pub use store::{Account, AccountSnapshot, IdentityStore, Membership};
