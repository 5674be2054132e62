use axum::http::StatusCode;

use crate::grants::TenantRoleGrant;
use crate::AuthContext;

#[derive(Debug, Clone)]
pub enum GuardError {
    Forbidden { tenant: String, role: String },
}

impl GuardError {
    pub fn into_response(self) -> (StatusCode, String) {
        match self {
            GuardError::Forbidden { tenant, role } => (
                StatusCode::FORBIDDEN,
                format!("Insufficient grant. Required role '{role}' in tenant '{tenant}'"),
            ),
        }
    }
}

impl From<GuardError> for (StatusCode, String) {
    fn from(value: GuardError) -> Self {
        value.into_response()
    }
}

/// Succeeds when any audience entry of the caller's token grants `role` in `tenant`.
/// Audience entries that do not parse as grants are ignored.
pub fn ensure_grant(auth: &AuthContext, tenant: &str, role: &str) -> Result<(), GuardError> {
    let granted = auth
        .claims
        .audience
        .iter()
        .filter_map(|entry| TenantRoleGrant::parse(entry).ok())
        .any(|grant| grant.validates(tenant, role));

    if granted {
        Ok(())
    } else {
        Err(GuardError::Forbidden {
            tenant: tenant.to_string(),
            role: role.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{SessionClaims, TokenKind};
    use chrono::{Duration, Utc};

    fn context(audience: &[&str]) -> AuthContext {
        AuthContext {
            claims: SessionClaims::issue(
                "issuer",
                "admin@example.com",
                TokenKind::Access,
                audience.iter().map(|entry| entry.to_string()).collect(),
                Utc::now(),
                Duration::minutes(5),
            ),
            token: "token".to_string(),
        }
    }

    #[test]
    fn grant_found_in_any_entry() {
        let auth = context(&["viewer@acme", "admin,auditor@system"]);
        assert!(ensure_grant(&auth, "system", "admin").is_ok());
    }

    #[test]
    fn grant_missing_is_forbidden() {
        let auth = context(&["admin@acme", "garbage"]);
        let err = ensure_grant(&auth, "system", "admin").expect_err("forbidden");
        let (status, message) = err.into_response();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(message.contains("system"));
    }
}
