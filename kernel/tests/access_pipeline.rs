//! Tests d'intégration : pipeline de décision d'accès
//!
//! Gate capability puis lookup AVC, interning SID, finalité du destroy.

use exo_security_core::security::capability::rights::presets;
use exo_security_core::security::{
    init, AccessVector, CapMask, Capability, ContextId, ContextType, Decision, ObjectClass,
    ObjectRef, Operation, PolicyRule, SecurityConfig, SecurityError, SecurityId,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn boot() -> exo_security_core::ContextManager {
    init(SecurityConfig::default()).unwrap()
}

#[test]
fn test_sid_interning_is_idempotent() {
    let mgr = boot();
    let a = mgr.context_to_sid("user_u:user_r:user_t").unwrap();
    let b = mgr.context_to_sid("user_u:user_r:user_t").unwrap();
    assert_eq!(a, b);
    assert_eq!(&*mgr.sid_to_context(a), "user_u:user_r:user_t");
    assert_eq!(&*mgr.sid_to_context(SecurityId(9999)), "invalid");
    assert_eq!(&*mgr.sid_to_context(SecurityId::UNLABELED), "unlabeled");
}

#[test]
fn test_invalid_sentinel_is_not_a_label() {
    let mgr = boot();
    assert_eq!(mgr.context_to_sid("invalid"), Err(SecurityError::ReservedLabel));

    let sid = mgr.context_to_sid("user_u:user_r:user_t").unwrap();
    assert_ne!(mgr.sid_to_context(sid), mgr.sid_to_context(SecurityId(9999)));
}

#[test]
fn test_sid_table_full_still_resolves_known_labels() {
    let mut config = SecurityConfig::default();
    config.sid_capacity = 3;
    let mgr = init(config).unwrap();

    let one = mgr.context_to_sid("a_t").unwrap();
    assert_eq!(mgr.context_to_sid("b_t"), Err(SecurityError::SidTableFull));
    assert_eq!(mgr.context_to_sid("a_t"), Ok(one));
}

#[test]
fn test_permission_subset_law() {
    let mgr = boot();
    mgr.load_policy(&[PolicyRule::allow(
        SecurityId(1),
        SecurityId(2),
        ObjectClass::File,
        AccessVector::READ,
    )])
    .unwrap();

    assert_eq!(
        mgr.compute_access(SecurityId(1), SecurityId(2), ObjectClass::File, AccessVector::READ),
        Decision::Grant
    );
    assert_eq!(
        mgr.compute_access(SecurityId(1), SecurityId(2), ObjectClass::File, AccessVector::WRITE),
        Decision::Deny
    );
}

#[test]
fn test_concurrent_readers_see_whole_batches() {
    const BATCH: usize = 64;
    let mgr = Arc::new(boot());
    let loaded = Arc::new(AtomicBool::new(false));

    // Only the last rule of the batch grants WRITE on (1, 2, File)
    let batch: Vec<_> = (0..BATCH as u32)
        .map(|i| {
            if i as usize == BATCH - 1 {
                PolicyRule::allow(SecurityId(1), SecurityId(2), ObjectClass::File, AccessVector::WRITE)
            } else {
                PolicyRule::allow(SecurityId(100 + i), SecurityId(2), ObjectClass::File, AccessVector::READ)
            }
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mgr = Arc::clone(&mgr);
            let loaded = Arc::clone(&loaded);
            thread::spawn(move || {
                let mut seen_grant = false;
                loop {
                    let done = loaded.load(Ordering::Acquire);
                    let decision = mgr.compute_access(
                        SecurityId(1),
                        SecurityId(2),
                        ObjectClass::File,
                        AccessVector::WRITE,
                    );
                    let count = mgr.policy_rules().len();

                    assert!(count == 0 || count == BATCH, "saw {} rules", count);
                    if decision.is_grant() {
                        assert_eq!(count, BATCH);
                        seen_grant = true;
                    } else {
                        assert!(!seen_grant, "grant went back to deny");
                    }
                    if done {
                        assert!(decision.is_grant());
                        break;
                    }
                }
            })
        })
        .collect();

    mgr.load_policy(&batch).unwrap();
    loaded.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    let stats = mgr.avc_stats();
    assert!(stats.hits + stats.misses > 0);
}

#[test]
fn test_policy_batch_atomicity() {
    let mut config = SecurityConfig::default();
    config.policy_capacity = 4;
    let mgr = init(config).unwrap();
    let rule = PolicyRule::allow(SecurityId(1), SecurityId(1), ObjectClass::Ipc, AccessVector::READ);

    mgr.load_policy(&[rule, rule, rule]).unwrap();
    let before = mgr.policy_rules().len();
    assert_eq!(mgr.load_policy(&[rule, rule]), Err(SecurityError::PolicyFull));
    assert_eq!(mgr.policy_rules().len(), before);
}

#[test]
fn test_full_pipeline() {
    let mgr = boot();
    let file_t = mgr.context_to_sid("system_u:object_r:etc_t").unwrap();
    let object = ObjectRef::new(file_t, ObjectClass::File);
    let chown = Operation::CHOWN;

    let svc = mgr
        .create_context(ContextType::System, "sshd", Some(ContextId::KERNEL))
        .unwrap();

    // Empty effective set: the gate denies before the policy is consulted
    assert_eq!(mgr.check_access(svc, chown, object), Err(SecurityError::PermissionDenied));

    mgr.raise_capability(svc, Capability::Chown).unwrap();
    // Gate passes, policy is empty: default deny
    assert_eq!(mgr.check_access(svc, chown, object), Err(SecurityError::PermissionDenied));

    mgr.load_policy(&[PolicyRule::allow(
        SecurityId::KERNEL,
        file_t,
        ObjectClass::File,
        AccessVector::SETATTR,
    )])
    .unwrap();
    assert_eq!(mgr.check_access(svc, chown, object), Ok(()));

    // Retiring the rule takes effect immediately
    mgr.set_rule_active(0, false).unwrap();
    assert_eq!(mgr.check_access(svc, chown, object), Err(SecurityError::PermissionDenied));
    assert_eq!(mgr.set_rule_active(5, true), Err(SecurityError::NoSuchRule));

    mgr.set_rule_active(0, true).unwrap();
    mgr.lower_capability(svc, Capability::Chown).unwrap();
    assert_eq!(mgr.check_access(svc, chown, object), Err(SecurityError::PermissionDenied));
}

#[test]
fn test_destroy_finality() {
    let mgr = boot();
    let id = mgr
        .create_context(ContextType::User, "bash", Some(ContextId::KERNEL))
        .unwrap();
    let object = ObjectRef::new(SecurityId::KERNEL, ObjectClass::Process);

    mgr.destroy_context(id).unwrap();
    assert_eq!(
        mgr.check_access(id, Operation::SIGNAL, object),
        Err(SecurityError::InvalidContext)
    );
    assert_eq!(mgr.destroy_context(id), Err(SecurityError::InvalidContext));
    assert_eq!(mgr.raise_capability(id, Capability::Kill), Err(SecurityError::InvalidContext));
    assert_eq!(mgr.capabilities(id), Err(SecurityError::InvalidContext));
}

#[test]
fn test_raise_beyond_permitted_always_fails() {
    let mgr = boot();
    let requested = CapMask::from_caps(&[Capability::NetBindService]);
    let web = mgr
        .create_context_with(ContextType::Container, "nginx", Some(ContextId::KERNEL), requested)
        .unwrap();

    for _ in 0..3 {
        assert_eq!(
            mgr.raise_capability(web, Capability::SysAdmin),
            Err(SecurityError::PermissionDenied)
        );
    }
    mgr.raise_capability(web, Capability::NetBindService).unwrap();
    assert!(mgr.check_capability(web, Capability::NetBindService));
}

#[test]
fn test_container_preset_bounds_the_child() {
    let mgr = boot();
    let runtime = mgr
        .create_context_with(
            ContextType::System,
            "runtime",
            Some(ContextId::KERNEL),
            presets::system_service(),
        )
        .unwrap();
    let workload = mgr
        .create_context_with(
            ContextType::Container,
            "app",
            Some(runtime),
            presets::container_default().union(&presets::mac_admin()),
        )
        .unwrap();

    // MacAdmin is outside the runtime's permitted set, MacOverride is not
    let permitted = mgr.capabilities(workload).unwrap().permitted();
    assert!(permitted.has(Capability::MacOverride));
    assert!(!permitted.has(Capability::MacAdmin));
    assert!(presets::container_default().is_subset(&permitted));
}

#[test]
fn test_revoke_is_permanent() {
    let mgr = boot();
    let id = mgr
        .create_context(ContextType::User, "u", Some(ContextId::KERNEL))
        .unwrap();
    mgr.raise_capability(id, Capability::SysPtrace).unwrap();
    mgr.revoke_capability(id, Capability::SysPtrace).unwrap();

    assert!(!mgr.check_capability(id, Capability::SysPtrace));
    assert_eq!(
        mgr.raise_capability(id, Capability::SysPtrace),
        Err(SecurityError::PermissionDenied)
    );

    // Children of a revoked parent never regain it
    let child = mgr.create_context(ContextType::User, "c", Some(id)).unwrap();
    assert!(!mgr.capabilities(child).unwrap().permitted().has(Capability::SysPtrace));
}

proptest! {
    #[test]
    fn prop_no_escalation(parent_req in any::<u64>(), child_req in any::<u64>()) {
        let mgr = boot();
        let p_mask = CapMask::from_bits_truncate(parent_req);
        let c_mask = CapMask::from_bits_truncate(child_req);

        let parent = mgr
            .create_context_with(ContextType::System, "p", Some(ContextId::KERNEL), p_mask)
            .unwrap();
        let child = mgr
            .create_context_with(ContextType::User, "c", Some(parent), c_mask)
            .unwrap();

        let pcaps = mgr.capabilities(parent).unwrap();
        let ccaps = mgr.capabilities(child).unwrap();
        prop_assert_eq!(ccaps.permitted(), pcaps.permitted().intersection(&c_mask));
        prop_assert!(ccaps.permitted().is_subset(&pcaps.permitted()));
        prop_assert!(ccaps.effective().is_empty());
    }

    #[test]
    fn prop_sid_interning(labels in proptest::collection::vec("[a-z_]{1,12}", 1..20)) {
        let mgr = boot();
        for label in &labels {
            let first = mgr.context_to_sid(label).unwrap();
            prop_assert_eq!(mgr.context_to_sid(label).unwrap(), first);
            prop_assert_eq!(&*mgr.sid_to_context(first), label.as_str());
        }
    }
}
