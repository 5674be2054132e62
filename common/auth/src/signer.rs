use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use crate::claims::SessionClaims;
use crate::error::{AuthError, AuthResult};
use crate::keys::KeyPair;

/// Signing algorithm for every session token this service issues.
pub const SESSION_ALGORITHM: Algorithm = Algorithm::RS512;

#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
}

impl TokenSigner {
    pub fn new(encoding_key: EncodingKey) -> Self {
        Self { encoding_key }
    }

    pub fn from_key_pair(pair: &KeyPair) -> Self {
        Self::new(pair.encoding_key().clone())
    }

    pub fn sign(&self, claims: &SessionClaims) -> AuthResult<String> {
        let header = Header::new(SESSION_ALGORITHM);
        encode(&header, &claims.to_repr(), &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }
}
