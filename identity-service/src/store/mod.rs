//! In-memory identity repository.
//!
//! Accounts and tenant memberships live behind one [`parking_lot::Mutex`], so
//! every read and write is serialized and compound operations such as
//! [`IdentityStore::rename_tenant`] or the cascading
//! [`IdentityStore::delete_account`] are atomic with respect to each other.
//!
//! Passphrase hashing runs outside the lock; writes that depend on a digest
//! re-check the state once the lock is taken again.
//!
//! Memberships are not tied to accounts: roles may be granted to an email
//! before (or after) the account exists.

mod accounts;
mod memberships;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::OpContext;
use crate::error::{IdentityError, IdentityResult};
use crate::hasher::CredentialHasher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    passphrase_digest: String,
}

impl Account {
    pub fn passphrase_digest(&self) -> &str {
        &self.passphrase_digest
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub email: String,
    pub tenant: String,
    pub roles: BTreeSet<String>,
}

impl Membership {
    fn empty(email: &str, tenant: &str) -> Self {
        Self {
            email: email.to_string(),
            tenant: tenant.to_string(),
            roles: BTreeSet::new(),
        }
    }
}

/// Everything authentication needs about one account, read under a single lock.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account: Account,
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct MembershipKey {
    email: String,
    tenant: String,
}

impl MembershipKey {
    fn new(email: &str, tenant: &str) -> Self {
        Self {
            email: fold(email),
            tenant: tenant.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    accounts: BTreeMap<String, Account>,
    memberships: BTreeMap<MembershipKey, Membership>,
}

impl StoreState {
    fn membership_keys_of(&self, email: &str) -> Vec<MembershipKey> {
        let folded = fold(email);
        self.memberships
            .keys()
            .filter(|key| key.email == folded)
            .cloned()
            .collect()
    }

    fn memberships_of(&self, email: &str) -> Vec<Membership> {
        let folded = fold(email);
        self.memberships
            .iter()
            .filter(|(key, _)| key.email == folded)
            .map(|(_, membership)| membership.clone())
            .collect()
    }

    /// Removing an absent row is still a success.
    fn delete_membership(&mut self, key: &MembershipKey) -> bool {
        self.memberships.remove(key);
        true
    }

    fn delete_all_memberships(&mut self, email: &str) -> IdentityResult<usize> {
        let keys = self.membership_keys_of(email);
        let mut failed = Vec::new();
        for key in &keys {
            if !self.delete_membership(key) {
                failed.push(key.tenant.clone());
            }
        }
        if failed.is_empty() {
            Ok(keys.len())
        } else {
            Err(IdentityError::Aggregate(failed))
        }
    }
}

pub struct IdentityStore {
    state: Mutex<StoreState>,
    hasher: Arc<dyn CredentialHasher>,
}

impl IdentityStore {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            hasher,
        }
    }

    pub fn hasher(&self) -> &Arc<dyn CredentialHasher> {
        &self.hasher
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().accounts.len()
    }

    pub fn membership_count(&self) -> usize {
        self.state.lock().memberships.len()
    }

    /// The account and all of its memberships, or `None` if no such account.
    pub fn snapshot(&self, ctx: &OpContext, email: &str) -> IdentityResult<Option<AccountSnapshot>> {
        ctx.check()?;
        require("email", email)?;
        let state = self.state.lock();
        Ok(state
            .accounts
            .get(&fold(email))
            .map(|account| AccountSnapshot {
                account: account.clone(),
                memberships: state.memberships_of(email),
            }))
    }
}

/// Case folding used for every email comparison.
pub(crate) fn fold(value: &str) -> String {
    value.to_lowercase()
}

pub(crate) fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    fold(value).starts_with(&fold(prefix))
}

pub(crate) fn require(field: &'static str, value: &str) -> IdentityResult<()> {
    if value.trim().is_empty() {
        Err(IdentityError::ArgumentInvalid(field))
    } else {
        Ok(())
    }
}

/// Characters that carry meaning inside a token audience entry.
const RESERVED_NAME_CHARS: [char; 3] = ['*', ',', '@'];

/// Tenant and role names end up in `"roles@tenant"` audience entries, so they
/// must not contain the grant separators or the wildcard.
pub(crate) fn require_name(field: &'static str, value: &str) -> IdentityResult<()> {
    require(field, value)?;
    if value.contains(RESERVED_NAME_CHARS) {
        return Err(IdentityError::ArgumentInvalid(field));
    }
    Ok(())
}
