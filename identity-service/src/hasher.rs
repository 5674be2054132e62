use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;

use crate::error::{IdentityError, IdentityResult};

/// Opaque credential digest primitive consumed by the store and the authenticator.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, secret: &str) -> IdentityResult<String>;

    /// `Ok(false)` on mismatch; `Err` only when the digest itself is unusable.
    fn verify(&self, secret: &str, digest: &str) -> IdentityResult<bool>;
}

/// Cost parameters for argon2id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HasherParams {
    /// Cheapest settings argon2 accepts. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: HasherParams) -> IdentityResult<Self> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|err| IdentityError::Hashing(format!("invalid argon2 parameters: {err}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> IdentityResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| IdentityError::Hashing(format!("failed to hash passphrase: {err}")))
    }

    fn verify(&self, secret: &str, digest: &str) -> IdentityResult<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|err| IdentityError::Hashing(format!("stored digest is unusable: {err}")))?;
        Ok(self
            .argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}
