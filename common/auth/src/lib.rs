pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod grants;
pub mod guards;
pub mod keys;
pub mod signer;
pub mod verifier;

pub use claims::{format_audience, SessionClaims, TokenKind};
pub use config::JwtConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::AuthContext;
pub use grants::{TenantRoleGrant, WILDCARD};
pub use guards::{ensure_grant, GuardError};
pub use keys::{FallbackPolicy, KeyPair, KeySource};
pub use signer::{TokenSigner, SESSION_ALGORITHM};
pub use verifier::JwtVerifier;
