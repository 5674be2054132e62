mod support;

use std::sync::Arc;
use std::thread;

use identity_service::{IdentityError, OpContext};
use support::test_store;

const WORKERS: usize = 8;
const GRANTS_PER_WORKER: usize = 50;

#[test]
fn concurrent_grants_on_distinct_memberships_are_all_kept() {
    let store = test_store();

    let handles = (0..WORKERS)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let ctx = OpContext::background();
                let email = format!("worker{worker}@acme.test");
                for index in 0..GRANTS_PER_WORKER {
                    let tenant = format!("tenant{}", index % 5);
                    store
                        .grant_role(&ctx, &email, &tenant, &format!("role{index}"))
                        .expect("grant role");
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let ctx = OpContext::background();
    assert_eq!(store.membership_count(), WORKERS * 5);
    for worker in 0..WORKERS {
        let email = format!("worker{worker}@acme.test");
        let total: usize = store
            .list_tenants(&ctx, &email)
            .expect("tenants")
            .iter()
            .map(|tenant| store.list_roles(&ctx, &email, tenant).expect("roles").len())
            .sum();
        assert_eq!(total, GRANTS_PER_WORKER);
    }
}

#[test]
fn racing_duplicate_grants_succeed_exactly_once() {
    let store = test_store();

    let handles = (0..WORKERS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.grant_role(&OpContext::background(), "a@acme.test", "acme", "admin")
            })
        })
        .collect::<Vec<_>>();
    let results = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker panicked"))
        .collect::<Vec<_>>();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| matches!(err, IdentityError::AlreadyExists("role"))));
}

#[test]
fn renames_do_not_lose_roles_granted_concurrently() {
    let store = test_store();
    let ctx = OpContext::background();
    store
        .grant_role(&ctx, "a@acme.test", "t0", "seed")
        .expect("seed");

    let renamer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let ctx = OpContext::background();
            for step in 0..20 {
                store
                    .rename_tenant(&ctx, "a@acme.test", &format!("t{step}"), &format!("t{}", step + 1))
                    .expect("rename");
            }
        })
    };
    let granter = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let ctx = OpContext::background();
            for index in 0..20 {
                store
                    .grant_role(&ctx, "b@acme.test", "other", &format!("r{index}"))
                    .expect("grant");
            }
        })
    };
    renamer.join().expect("renamer panicked");
    granter.join().expect("granter panicked");

    assert_eq!(
        store.list_tenants(&ctx, "a@acme.test").expect("tenants"),
        vec!["t20"]
    );
    assert_eq!(
        store.list_roles(&ctx, "a@acme.test", "t20").expect("roles"),
        vec!["seed"]
    );
    assert_eq!(
        store.list_roles(&ctx, "b@acme.test", "other").expect("roles").len(),
        20
    );
}
