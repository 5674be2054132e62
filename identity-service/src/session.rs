use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use common_auth::{format_audience, JwtVerifier, SessionClaims, TokenKind, TokenSigner};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::OpContext;
use crate::error::{IdentityError, IdentityResult};
use crate::store::{require, IdentityStore};

/// Access and refresh token lifetimes. Access tokens must expire first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    access: Duration,
    refresh: Duration,
}

impl TokenLifetimes {
    pub fn new(access: StdDuration, refresh: StdDuration) -> IdentityResult<Self> {
        let access = Duration::from_std(access)
            .map_err(|_| IdentityError::ArgumentInvalid("access token lifetime"))?;
        let refresh = Duration::from_std(refresh)
            .map_err(|_| IdentityError::ArgumentInvalid("refresh token lifetime"))?;
        if access <= Duration::zero() {
            return Err(IdentityError::ArgumentInvalid("access token lifetime"));
        }
        if access >= refresh {
            return Err(IdentityError::ArgumentInvalid("refresh token lifetime"));
        }
        Ok(Self { access, refresh })
    }

    pub fn access(&self) -> Duration {
        self.access
    }

    pub fn refresh(&self) -> Duration {
        self.refresh
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub token_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub token_type: &'static str,
}

/// Issues session tokens for stored accounts and trades refresh tokens for
/// new access tokens.
pub struct Authenticator {
    store: Arc<IdentityStore>,
    signer: TokenSigner,
    verifier: Arc<JwtVerifier>,
    lifetimes: TokenLifetimes,
}

impl Authenticator {
    pub fn new(
        store: Arc<IdentityStore>,
        signer: TokenSigner,
        verifier: Arc<JwtVerifier>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            store,
            signer,
            verifier,
            lifetimes,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.verifier.config().issuer
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Unknown accounts, mismatched passphrases and unusable digests all
    /// surface as [`IdentityError::InvalidCredentials`]; only the log tells
    /// them apart.
    pub fn authenticate(
        &self,
        ctx: &OpContext,
        email: &str,
        passphrase: &str,
    ) -> IdentityResult<IssuedTokens> {
        ctx.check()?;
        require("email", email)?;
        require("passphrase", passphrase)?;

        let Some(snapshot) = self.store.snapshot(ctx, email)? else {
            warn!(email, reason = "unknown account", "login rejected");
            return Err(IdentityError::InvalidCredentials);
        };
        match self
            .store
            .hasher()
            .verify(passphrase, snapshot.account.passphrase_digest())
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(email, reason = "passphrase mismatch", "login rejected");
                return Err(IdentityError::InvalidCredentials);
            }
            Err(err) => {
                warn!(email, reason = "unusable digest", error = %err, "login rejected");
                return Err(IdentityError::InvalidCredentials);
            }
        }

        let audience = snapshot
            .memberships
            .iter()
            .map(|membership| format_audience(&membership.roles, &membership.tenant))
            .collect::<Vec<_>>();
        let subject = snapshot.account.email;
        let now = Utc::now();
        let access = SessionClaims::issue(
            self.issuer(),
            subject.clone(),
            TokenKind::Access,
            audience.clone(),
            now,
            self.lifetimes.access,
        );
        let refresh = SessionClaims::issue(
            self.issuer(),
            subject.clone(),
            TokenKind::Refresh,
            audience,
            now,
            self.lifetimes.refresh,
        );

        let tokens = IssuedTokens {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
            token_type: "Bearer",
        };
        info!(subject = %subject, memberships = access.audience.len(), "session issued");
        Ok(tokens)
    }

    /// Mints a new access token from a refresh token. The refresh token is
    /// neither rotated nor revoked.
    pub fn refresh(&self, ctx: &OpContext, refresh_token: &str) -> IdentityResult<RefreshedToken> {
        ctx.check()?;
        require("refresh token", refresh_token)?;

        let claims = self.verifier.verify(refresh_token)?;
        if let Err(err) = self.verifier.ensure(&claims, TokenKind::Refresh) {
            warn!(subject = %claims.subject, error = %err, "refresh rejected");
            return Err(err.into());
        }

        let access = SessionClaims::issue(
            claims.issuer,
            claims.subject,
            TokenKind::Access,
            claims.audience,
            Utc::now(),
            self.lifetimes.access,
        );
        let token = RefreshedToken {
            access_token: self.sign(&access)?,
            access_expires_at: access.expires_at,
            token_type: "Bearer",
        };
        info!(subject = %access.subject, "access token refreshed");
        Ok(token)
    }

    fn sign(&self, claims: &SessionClaims) -> IdentityResult<String> {
        self.signer.sign(claims).map_err(|err| {
            error!(subject = %claims.subject, error = %err, "token signing failed");
            IdentityError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_require_access_shorter_than_refresh() {
        let minute = StdDuration::from_secs(60);
        assert!(TokenLifetimes::new(minute, minute * 10).is_ok());
        assert!(matches!(
            TokenLifetimes::new(minute * 10, minute),
            Err(IdentityError::ArgumentInvalid("refresh token lifetime"))
        ));
        assert!(TokenLifetimes::new(minute, minute).is_err());
        assert!(TokenLifetimes::new(StdDuration::ZERO, minute).is_err());
    }
}
