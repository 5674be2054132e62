use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Distinguishes short-lived access tokens from the refresh tokens used to mint them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Application-focused representation of a session token payload.
///
/// Never stored server side; the signed token held by the client is the only
/// persisted form.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub issuer: String,
    pub subject: String,
    pub kind: TokenKind,
    /// `"role1,role2@tenant"` entries, one per membership.
    pub audience: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: String,
}

impl SessionClaims {
    /// Claims valid from `now` until `now + lifetime`, with a fresh token id.
    pub fn issue(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        kind: TokenKind,
        audience: Vec<String>,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            subject: subject.into(),
            kind,
            audience,
            not_before: now,
            issued_at: now,
            expires_at: now + lifetime,
            token_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub(crate) fn to_repr(&self) -> ClaimsRepr {
        ClaimsRepr {
            iss: self.issuer.clone(),
            sub: self.subject.clone(),
            typ: self.kind,
            aud: self.audience.clone(),
            nbf: self.not_before.timestamp(),
            iat: self.issued_at.timestamp(),
            exp: self.expires_at.timestamp(),
            jti: self.token_id.clone(),
        }
    }
}

/// Formats one audience entry: `roles` comma-joined, then `@tenant`.
pub fn format_audience<I, S>(roles: I, tenant: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = roles
        .into_iter()
        .map(|role| role.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{joined}@{tenant}")
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    iss: String,
    sub: String,
    typ: TokenKind,
    #[serde(default)]
    aud: Vec<String>,
    nbf: i64,
    iat: i64,
    exp: i64,
    #[serde(default)]
    jti: String,
}

fn timestamp(claim: &'static str, value: i64) -> AuthResult<DateTime<Utc>> {
    Utc.timestamp_opt(value, 0)
        .single()
        .ok_or_else(|| AuthError::InvalidClaim(claim, value.to_string()))
}

impl TryFrom<ClaimsRepr> for SessionClaims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        if value.sub.trim().is_empty() {
            return Err(AuthError::InvalidClaim("sub", value.sub));
        }

        Ok(Self {
            not_before: timestamp("nbf", value.nbf)?,
            issued_at: timestamp("iat", value.iat)?,
            expires_at: timestamp("exp", value.exp)?,
            issuer: value.iss,
            subject: value.sub,
            kind: value.typ,
            audience: value.aud,
            token_id: value.jti,
        })
    }
}

impl TryFrom<serde_json::Value> for SessionClaims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value)
            .map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        SessionClaims::try_from(repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_audience_joins_roles() {
        assert_eq!(format_audience(["R1", "R2"], "acme"), "R1,R2@acme");
        assert_eq!(format_audience(Vec::<String>::new(), "acme"), "@acme");
    }

    #[test]
    fn issue_sets_validity_window() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp");
        let claims = SessionClaims::issue(
            "issuer",
            "user@example.com",
            TokenKind::Refresh,
            vec!["admin@acme".into()],
            now,
            Duration::minutes(10),
        );
        assert_eq!(claims.not_before, now);
        assert_eq!(claims.issued_at, now);
        assert_eq!(claims.expires_at, now + Duration::minutes(10));
        assert!(!claims.token_id.is_empty());
        assert!(claims.is_kind(TokenKind::Refresh));
    }

    #[test]
    fn claims_parse_from_json_payload() {
        let payload = json!({
            "iss": "issuer",
            "sub": "user@example.com",
            "typ": "access",
            "aud": ["R1@acme"],
            "nbf": 1_700_000_000,
            "iat": 1_700_000_000,
            "exp": 1_700_000_600,
            "jti": "abc"
        });
        let claims = SessionClaims::try_from(payload).expect("claims");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.audience, vec!["R1@acme".to_string()]);
        assert_eq!(claims.expires_at.timestamp(), 1_700_000_600);
    }

    #[test]
    fn claims_reject_unknown_kind() {
        let payload = json!({
            "iss": "issuer",
            "sub": "user@example.com",
            "typ": "id",
            "nbf": 0,
            "iat": 0,
            "exp": 1
        });
        let err = SessionClaims::try_from(payload).expect_err("unknown kind");
        assert!(matches!(err, AuthError::InvalidJson(_)));
    }
}
