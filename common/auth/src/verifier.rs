use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::{SessionClaims, TokenKind};
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};
use crate::keys::KeyPair;
use crate::signer::SESSION_ALGORITHM;

#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig, key: DecodingKey) -> Self {
        Self { config, key }
    }

    pub fn from_key_pair(config: JwtConfig, pair: &KeyPair) -> Self {
        Self::new(config, pair.decoding_key().clone())
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Checks signature and validity window only. Issuer and kind are left to
    /// [`JwtVerifier::ensure`] so callers can tell those failures apart.
    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        let header =
            decode_header(token).map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
        if header.alg != SESSION_ALGORITHM {
            return Err(AuthError::InvalidHeader(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(SESSION_ALGORITHM);
        // aud carries role grants, not a service audience
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway_seconds.into();
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        let token_data = decode::<Value>(token, &self.key, &validation)?;
        let claims = SessionClaims::try_from(token_data.claims)?;
        debug!(
            subject = %claims.subject,
            kind = claims.kind.as_str(),
            "verified session token"
        );
        Ok(claims)
    }

    pub fn ensure(&self, claims: &SessionClaims, expected: TokenKind) -> AuthResult<()> {
        if claims.issuer != self.config.issuer {
            return Err(AuthError::WrongIssuer(claims.issuer.clone()));
        }
        if !claims.is_kind(expected) {
            return Err(AuthError::WrongTokenKind {
                expected: expected.as_str(),
                actual: claims.kind.as_str(),
            });
        }
        Ok(())
    }

    pub fn verify_access(&self, token: &str) -> AuthResult<SessionClaims> {
        let claims = self.verify(token)?;
        self.ensure(&claims, TokenKind::Access)?;
        Ok(claims)
    }
}
