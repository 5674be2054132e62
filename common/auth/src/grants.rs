use std::fmt;
use std::str::FromStr;

use crate::error::{AuthError, AuthResult};

pub const WILDCARD: &str = "*";

/// A `"role1,role2@tenant1,tenant2"` grant. `*` on either side matches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRoleGrant {
    roles: Vec<String>,
    tenants: Vec<String>,
}

impl TenantRoleGrant {
    pub fn parse(value: &str) -> AuthResult<Self> {
        let (roles, tenants) = value
            .split_once('@')
            .ok_or_else(|| AuthError::InvalidGrant(value.to_string()))?;
        if tenants.contains('@') {
            return Err(AuthError::InvalidGrant(value.to_string()));
        }

        let tenants = split_list(tenants);
        if tenants.is_empty() {
            return Err(AuthError::InvalidGrant(value.to_string()));
        }

        Ok(Self {
            roles: split_list(roles),
            tenants,
        })
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn tenants(&self) -> &[String] {
        &self.tenants
    }

    pub fn has_wildcard(&self) -> bool {
        self.roles.iter().chain(self.tenants.iter()).any(|item| item == WILDCARD)
    }

    pub fn validates(&self, tenant: &str, role: &str) -> bool {
        self.tenant_valid(tenant) && self.role_valid(role)
    }

    fn tenant_valid(&self, tenant: &str) -> bool {
        self.tenants.iter().any(|item| item == WILDCARD || item == tenant)
    }

    fn role_valid(&self, role: &str) -> bool {
        self.roles.iter().any(|item| item == WILDCARD || item == role)
    }
}

impl FromStr for TenantRoleGrant {
    type Err = AuthError;

    fn from_str(value: &str) -> AuthResult<Self> {
        Self::parse(value)
    }
}

impl fmt::Display for TenantRoleGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.roles.join(","), self.tenants.join(","))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
