use std::collections::BTreeSet;

use common_auth::TenantRoleGrant;
use tracing::debug;

use super::{fold, has_prefix_ignore_case, require, require_name, Account, IdentityStore, Membership, MembershipKey};
use crate::context::OpContext;
use crate::error::{IdentityError, IdentityResult};

impl IdentityStore {
    /// Adds an account, storing only the digest of `passphrase`.
    pub fn create_account(&self, ctx: &OpContext, email: &str, passphrase: &str) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require("passphrase", passphrase)?;

        let key = fold(email);
        if self.state.lock().accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyExists("account"));
        }
        let digest = self.hasher.hash(passphrase)?;

        let mut state = self.state.lock();
        if state.accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyExists("account"));
        }
        state.accounts.insert(
            key,
            Account {
                email: email.to_string(),
                passphrase_digest: digest,
            },
        );
        debug!(email, "account created");
        Ok(())
    }

    pub fn exists(&self, ctx: &OpContext, email: &str) -> IdentityResult<bool> {
        ctx.check()?;
        require("email", email)?;
        Ok(self.state.lock().accounts.contains_key(&fold(email)))
    }

    /// `Ok(false)` when `old` does not match the stored passphrase.
    pub fn update_passphrase(
        &self,
        ctx: &OpContext,
        email: &str,
        old: &str,
        new: &str,
    ) -> IdentityResult<bool> {
        ctx.check()?;
        require("email", email)?;
        require("old passphrase", old)?;
        require("new passphrase", new)?;

        let key = fold(email);
        let current = self
            .state
            .lock()
            .accounts
            .get(&key)
            .map(|account| account.passphrase_digest.clone())
            .ok_or(IdentityError::NotFound("account"))?;
        if !self.hasher.verify(old, &current)? {
            debug!(email, "passphrase update rejected");
            return Ok(false);
        }
        let replacement = self.hasher.hash(new)?;

        let mut state = self.state.lock();
        let account = state
            .accounts
            .get_mut(&key)
            .ok_or(IdentityError::NotFound("account"))?;
        // changed underneath us; the old passphrase no longer applies
        if account.passphrase_digest != current {
            return Ok(false);
        }
        account.passphrase_digest = replacement;
        debug!(email, "passphrase updated");
        Ok(true)
    }

    /// Removes the account and every membership of its email. `Ok(false)` if absent.
    pub fn delete_account(&self, ctx: &OpContext, email: &str) -> IdentityResult<bool> {
        ctx.check()?;
        require("email", email)?;

        let mut state = self.state.lock();
        if state.accounts.remove(&fold(email)).is_none() {
            return Ok(false);
        }
        let removed = state.delete_all_memberships(email)?;
        debug!(email, memberships = removed, "account deleted");
        Ok(true)
    }

    /// Emails starting with `prefix` (case-insensitive), sorted.
    pub fn search_by_prefix(&self, ctx: &OpContext, prefix: &str) -> IdentityResult<Vec<String>> {
        ctx.check()?;
        require("prefix", prefix)?;
        let state = self.state.lock();
        Ok(state
            .accounts
            .values()
            .filter(|account| has_prefix_ignore_case(&account.email, prefix))
            .map(|account| account.email.clone())
            .collect())
    }

    pub fn list_accounts(&self, ctx: &OpContext) -> IdentityResult<Vec<String>> {
        ctx.check()?;
        let state = self.state.lock();
        Ok(state.accounts.values().map(|account| account.email.clone()).collect())
    }

    /// Creates an account together with its role grants as one unit: either
    /// everything is stored or nothing is.
    pub fn register(
        &self,
        ctx: &OpContext,
        email: &str,
        passphrase: &str,
        grants: &[TenantRoleGrant],
    ) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require("passphrase", passphrase)?;
        for grant in grants {
            for name in grant.roles().iter().chain(grant.tenants()) {
                require_name("grant", name)?;
            }
        }

        let key = fold(email);
        if self.state.lock().accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyExists("account"));
        }
        let digest = self.hasher.hash(passphrase)?;

        let mut state = self.state.lock();
        if state.accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyExists("account"));
        }
        state.accounts.insert(
            key,
            Account {
                email: email.to_string(),
                passphrase_digest: digest,
            },
        );
        let mut tenants = BTreeSet::new();
        for grant in grants {
            for tenant in grant.tenants() {
                let membership = state
                    .memberships
                    .entry(MembershipKey::new(email, tenant))
                    .or_insert_with(|| Membership::empty(email, tenant));
                membership.roles.extend(grant.roles().iter().cloned());
                tenants.insert(tenant.clone());
            }
        }
        debug!(email, tenants = tenants.len(), "account registered");
        Ok(())
    }
}
