use std::collections::BTreeSet;

use tracing::debug;

use super::{has_prefix_ignore_case, require, require_name, IdentityStore, Membership, MembershipKey};
use crate::context::OpContext;
use crate::error::{IdentityError, IdentityResult};

impl IdentityStore {
    pub fn create_membership(&self, ctx: &OpContext, email: &str, tenant: &str) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require_name("tenant", tenant)?;

        let mut state = self.state.lock();
        let key = MembershipKey::new(email, tenant);
        if state.memberships.contains_key(&key) {
            return Err(IdentityError::AlreadyExists("membership"));
        }
        state.memberships.insert(key, Membership::empty(email, tenant));
        debug!(email, tenant, "membership created");
        Ok(())
    }

    /// Moves the membership to `new_tenant`, merging roles into an existing
    /// membership there. Renaming a tenant onto itself leaves it untouched.
    pub fn rename_tenant(
        &self,
        ctx: &OpContext,
        email: &str,
        old_tenant: &str,
        new_tenant: &str,
    ) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require_name("old tenant", old_tenant)?;
        require_name("new tenant", new_tenant)?;

        let mut state = self.state.lock();
        let source_key = MembershipKey::new(email, old_tenant);
        if old_tenant == new_tenant {
            return if state.memberships.contains_key(&source_key) {
                Ok(())
            } else {
                Err(IdentityError::NotFound("membership"))
            };
        }
        let source = state
            .memberships
            .remove(&source_key)
            .ok_or(IdentityError::NotFound("membership"))?;
        let target_key = MembershipKey::new(email, new_tenant);
        let merged = state.memberships.contains_key(&target_key);
        let target = state
            .memberships
            .entry(target_key)
            .or_insert_with(|| Membership::empty(&source.email, new_tenant));
        target.roles.extend(source.roles);
        debug!(email, old_tenant, new_tenant, merged, "tenant renamed");
        Ok(())
    }

    /// Succeeds whether or not the membership existed.
    pub fn delete_membership(&self, ctx: &OpContext, email: &str, tenant: &str) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require("tenant", tenant)?;

        let mut state = self.state.lock();
        state.delete_membership(&MembershipKey::new(email, tenant));
        debug!(email, tenant, "membership deleted");
        Ok(())
    }

    /// Returns how many memberships were removed.
    pub fn delete_all_memberships(&self, ctx: &OpContext, email: &str) -> IdentityResult<usize> {
        ctx.check()?;
        require("email", email)?;

        let removed = self.state.lock().delete_all_memberships(email)?;
        debug!(email, removed, "memberships deleted");
        Ok(removed)
    }

    pub fn membership_exists(&self, ctx: &OpContext, email: &str, tenant: &str) -> IdentityResult<bool> {
        ctx.check()?;
        require("email", email)?;
        require("tenant", tenant)?;
        Ok(self
            .state
            .lock()
            .memberships
            .contains_key(&MembershipKey::new(email, tenant)))
    }

    pub fn list_tenants(&self, ctx: &OpContext, email: &str) -> IdentityResult<Vec<String>> {
        ctx.check()?;
        require("email", email)?;
        let state = self.state.lock();
        Ok(state
            .memberships_of(email)
            .into_iter()
            .map(|membership| membership.tenant)
            .collect())
    }

    /// Tenants of `email` starting with `prefix` (case-insensitive), sorted.
    pub fn search_tenants_by_prefix(
        &self,
        ctx: &OpContext,
        email: &str,
        prefix: &str,
    ) -> IdentityResult<Vec<String>> {
        ctx.check()?;
        require("email", email)?;
        require("prefix", prefix)?;
        let tenants: BTreeSet<String> = self
            .list_tenants(ctx, email)?
            .into_iter()
            .filter(|tenant| has_prefix_ignore_case(tenant, prefix))
            .collect();
        Ok(tenants.into_iter().collect())
    }

    /// Adds `role`, creating the membership when it does not exist yet.
    pub fn grant_role(&self, ctx: &OpContext, email: &str, tenant: &str, role: &str) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require_name("tenant", tenant)?;
        require_name("role", role)?;

        let mut state = self.state.lock();
        let membership = state
            .memberships
            .entry(MembershipKey::new(email, tenant))
            .or_insert_with(|| Membership::empty(email, tenant));
        if !membership.roles.insert(role.to_string()) {
            return Err(IdentityError::AlreadyExists("role"));
        }
        debug!(email, tenant, role, "role granted");
        Ok(())
    }

    pub fn revoke_role(&self, ctx: &OpContext, email: &str, tenant: &str, role: &str) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require("tenant", tenant)?;
        require("role", role)?;

        let mut state = self.state.lock();
        let membership = state
            .memberships
            .get_mut(&MembershipKey::new(email, tenant))
            .ok_or(IdentityError::NotFound("membership"))?;
        if !membership.roles.remove(role) {
            return Err(IdentityError::NotFound("role"));
        }
        debug!(email, tenant, role, "role revoked");
        Ok(())
    }

    /// Empties the role set but keeps the membership.
    pub fn revoke_all_roles(&self, ctx: &OpContext, email: &str, tenant: &str) -> IdentityResult<()> {
        ctx.check()?;
        require("email", email)?;
        require("tenant", tenant)?;

        let mut state = self.state.lock();
        let membership = state
            .memberships
            .get_mut(&MembershipKey::new(email, tenant))
            .ok_or(IdentityError::NotFound("membership"))?;
        let revoked = membership.roles.len();
        membership.roles.clear();
        debug!(email, tenant, revoked, "roles revoked");
        Ok(())
    }

    pub fn role_exists(&self, ctx: &OpContext, email: &str, tenant: &str, role: &str) -> IdentityResult<bool> {
        ctx.check()?;
        require("email", email)?;
        require("tenant", tenant)?;
        require("role", role)?;

        let state = self.state.lock();
        state
            .memberships
            .get(&MembershipKey::new(email, tenant))
            .map(|membership| membership.roles.contains(role))
            .ok_or(IdentityError::NotFound("membership"))
    }

    pub fn list_roles(&self, ctx: &OpContext, email: &str, tenant: &str) -> IdentityResult<Vec<String>> {
        ctx.check()?;
        require("email", email)?;
        require("tenant", tenant)?;

        let state = self.state.lock();
        state
            .memberships
            .get(&MembershipKey::new(email, tenant))
            .map(|membership| membership.roles.iter().cloned().collect())
            .ok_or(IdentityError::NotFound("membership"))
    }

    /// Roles of the membership starting with `prefix` (case-insensitive), sorted.
    pub fn search_roles_by_prefix(
        &self,
        ctx: &OpContext,
        email: &str,
        tenant: &str,
        prefix: &str,
    ) -> IdentityResult<Vec<String>> {
        ctx.check()?;
        require("prefix", prefix)?;
        Ok(self
            .list_roles(ctx, email, tenant)?
            .into_iter()
            .filter(|role| has_prefix_ignore_case(role, prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn membership_does_not_require_account() {
        let store = store();
        let ctx = ctx();
        store.create_membership(&ctx, "ghost@x.com", "acme").expect("create");
        assert!(store.membership_exists(&ctx, "GHOST@x.com", "acme").expect("exists"));
        assert!(!store.exists(&ctx, "ghost@x.com").expect("exists"));
    }

    #[test]
    fn duplicate_membership_is_rejected() {
        let store = store();
        let ctx = ctx();
        store.create_membership(&ctx, "a@x.com", "acme").expect("create");
        let err = store
            .create_membership(&ctx, "A@x.com", "acme")
            .expect_err("dup");
        assert!(matches!(err, IdentityError::AlreadyExists("membership")));
    }

    #[test]
    fn tenants_match_exactly() {
        let store = store();
        let ctx = ctx();
        store.create_membership(&ctx, "a@x.com", "Acme").expect("create");
        assert!(!store.membership_exists(&ctx, "a@x.com", "acme").expect("exists"));
    }

    #[test]
    fn rename_moves_when_target_is_absent() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "old", "r1").expect("grant");
        assert_eq!(store.membership_count(), 1);
        store.rename_tenant(&ctx, "a@x.com", "old", "new").expect("rename");

        assert!(!store.membership_exists(&ctx, "a@x.com", "old").expect("exists"));
        assert_eq!(store.list_roles(&ctx, "a@x.com", "new").expect("roles"), vec!["r1"]);
        assert_eq!(store.membership_count(), 1);
    }

    #[test]
    fn rename_merges_into_existing_target() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "T1", "r1").expect("grant");
        store.grant_role(&ctx, "a@x.com", "T1", "r2").expect("grant");
        store.grant_role(&ctx, "a@x.com", "T2", "r2").expect("grant");
        store.grant_role(&ctx, "a@x.com", "T2", "r3").expect("grant");

        store.rename_tenant(&ctx, "a@x.com", "T1", "T2").expect("rename");

        assert!(!store.membership_exists(&ctx, "a@x.com", "T1").expect("exists"));
        assert_eq!(
            store.list_roles(&ctx, "a@x.com", "T2").expect("roles"),
            vec!["r1", "r2", "r3"]
        );
        assert_eq!(store.membership_count(), 1);
    }

    #[test]
    fn rename_of_missing_source_is_not_found() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "T2", "r2").expect("grant");
        store.grant_role(&ctx, "b@x.com", "T1", "r1").expect("grant");
        let err = store
            .rename_tenant(&ctx, "a@x.com", "T1", "T2")
            .expect_err("missing");
        assert!(matches!(err, IdentityError::NotFound("membership")));

        assert_eq!(store.membership_count(), 2);
        assert!(!store.membership_exists(&ctx, "a@x.com", "T1").expect("exists"));
        assert_eq!(store.list_roles(&ctx, "a@x.com", "T2").expect("roles"), vec!["r2"]);
        assert_eq!(store.list_roles(&ctx, "b@x.com", "T1").expect("roles"), vec!["r1"]);
    }

    #[test]
    fn rename_onto_itself_keeps_roles() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "T1", "r1").expect("grant");
        store.rename_tenant(&ctx, "a@x.com", "T1", "T1").expect("rename");
        assert_eq!(store.list_roles(&ctx, "a@x.com", "T1").expect("roles"), vec!["r1"]);
    }

    #[test]
    fn delete_membership_is_idempotent() {
        let store = store();
        let ctx = ctx();
        store.create_membership(&ctx, "a@x.com", "acme").expect("create");
        store.delete_membership(&ctx, "a@x.com", "acme").expect("delete");
        store.delete_membership(&ctx, "a@x.com", "acme").expect("delete again");
        assert!(!store.membership_exists(&ctx, "a@x.com", "acme").expect("exists"));
    }

    #[test]
    fn delete_all_memberships_only_touches_one_email() {
        let store = store();
        let ctx = ctx();
        store.create_membership(&ctx, "a@x.com", "t1").expect("create");
        store.create_membership(&ctx, "a@x.com", "t2").expect("create");
        store.create_membership(&ctx, "b@x.com", "t1").expect("create");

        assert_eq!(store.delete_all_memberships(&ctx, "A@X.com").expect("delete"), 2);
        assert_eq!(store.delete_all_memberships(&ctx, "a@x.com").expect("nothing left"), 0);
        assert!(store.membership_exists(&ctx, "b@x.com", "t1").expect("exists"));
    }

    #[test]
    fn tenant_search_is_case_insensitive() {
        let store = store();
        let ctx = ctx();
        for tenant in ["Acme", "acme-eu", "Globex"] {
            store.create_membership(&ctx, "a@x.com", tenant).expect("create");
        }
        assert_eq!(
            store.search_tenants_by_prefix(&ctx, "a@x.com", "ACM").expect("search"),
            vec!["Acme", "acme-eu"]
        );
        assert!(matches!(
            store.search_tenants_by_prefix(&ctx, "a@x.com", ""),
            Err(IdentityError::ArgumentInvalid("prefix"))
        ));
    }

    const RESERVED_NAMES: [&str; 4] = ["*", "acme,system", "admin@system", "a*"];

    #[test]
    fn create_membership_rejects_reserved_tenant_names() {
        let store = store();
        let ctx = ctx();
        for tenant in RESERVED_NAMES {
            let err = store
                .create_membership(&ctx, "a@x.com", tenant)
                .expect_err(tenant);
            assert!(matches!(err, IdentityError::ArgumentInvalid("tenant")), "{tenant}");
        }
        assert_eq!(store.membership_count(), 0);
    }

    #[test]
    fn rename_rejects_reserved_tenant_names() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "acme", "admin").expect("grant");
        for tenant in RESERVED_NAMES {
            let err = store
                .rename_tenant(&ctx, "a@x.com", "acme", tenant)
                .expect_err(tenant);
            assert!(matches!(err, IdentityError::ArgumentInvalid("new tenant")), "{tenant}");
        }
        let err = store
            .rename_tenant(&ctx, "a@x.com", "*", "acme")
            .expect_err("wildcard source");
        assert!(matches!(err, IdentityError::ArgumentInvalid("old tenant")));

        assert_eq!(store.list_tenants(&ctx, "a@x.com").expect("tenants"), vec!["acme"]);
        assert_eq!(store.list_roles(&ctx, "a@x.com", "acme").expect("roles"), vec!["admin"]);
    }

    #[test]
    fn grant_role_rejects_reserved_tenant_and_role_names() {
        let store = store();
        let ctx = ctx();
        for name in RESERVED_NAMES {
            let err = store
                .grant_role(&ctx, "u@acme.test", name, "admin")
                .expect_err(name);
            assert!(matches!(err, IdentityError::ArgumentInvalid("tenant")), "{name}");
            let err = store
                .grant_role(&ctx, "u@acme.test", "acme", name)
                .expect_err(name);
            assert!(matches!(err, IdentityError::ArgumentInvalid("role")), "{name}");
        }
        assert_eq!(store.membership_count(), 0);
    }

    #[test]
    fn grant_role_twice_is_already_exists() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "acme", "admin").expect("grant");
        let err = store
            .grant_role(&ctx, "a@x.com", "acme", "admin")
            .expect_err("dup");
        assert!(matches!(err, IdentityError::AlreadyExists("role")));
        assert_eq!(store.list_roles(&ctx, "a@x.com", "acme").expect("roles"), vec!["admin"]);
    }

    #[test]
    fn revoke_role_reports_what_is_missing() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "acme", "admin").expect("grant");

        assert!(matches!(
            store.revoke_role(&ctx, "a@x.com", "acme", "viewer"),
            Err(IdentityError::NotFound("role"))
        ));
        assert!(matches!(
            store.revoke_role(&ctx, "a@x.com", "globex", "admin"),
            Err(IdentityError::NotFound("membership"))
        ));
        store.revoke_role(&ctx, "a@x.com", "acme", "admin").expect("revoke");
        assert!(!store.role_exists(&ctx, "a@x.com", "acme", "admin").expect("exists"));
    }

    #[test]
    fn revoke_all_roles_keeps_membership() {
        let store = store();
        let ctx = ctx();
        store.grant_role(&ctx, "a@x.com", "acme", "r1").expect("grant");
        store.grant_role(&ctx, "a@x.com", "acme", "r2").expect("grant");

        store.revoke_all_roles(&ctx, "a@x.com", "acme").expect("revoke");
        assert!(store.membership_exists(&ctx, "a@x.com", "acme").expect("exists"));
        assert!(store.list_roles(&ctx, "a@x.com", "acme").expect("roles").is_empty());
        assert!(matches!(
            store.revoke_all_roles(&ctx, "a@x.com", "globex"),
            Err(IdentityError::NotFound("membership"))
        ));
    }

    #[test]
    fn role_exists_requires_membership() {
        let store = store();
        let err = store
            .role_exists(&ctx(), "a@x.com", "acme", "admin")
            .expect_err("missing membership");
        assert!(matches!(err, IdentityError::NotFound("membership")));
    }

    #[test]
    fn role_search_is_case_insensitive_and_sorted() {
        let store = store();
        let ctx = ctx();
        for role in ["Manager", "admin", "ADMIN-read", "viewer"] {
            store.grant_role(&ctx, "a@x.com", "acme", role).expect("grant");
        }
        assert_eq!(
            store.search_roles_by_prefix(&ctx, "a@x.com", "acme", "adm").expect("search"),
            vec!["ADMIN-read", "admin"]
        );
        assert!(matches!(
            store.search_roles_by_prefix(&ctx, "a@x.com", "globex", "adm"),
            Err(IdentityError::NotFound("membership"))
        ));
    }

    #[test]
    fn cancelled_context_leaves_roles_untouched() {
        let store = store();
        let err = store
            .grant_role(&cancelled(), "a@x.com", "acme", "admin")
            .expect_err("cancelled");
        assert!(matches!(err, IdentityError::Cancelled));
        assert_eq!(store.membership_count(), 0);
    }
}
