//! Access Vector Cache
//!
//! Ordered MAC rule table and the decision function over it.
//!
//! Rules are appended in batches and never deleted; a rule is retired by
//! clearing its `active` flag so the rule log stays audit-stable. Lookups
//! scan in insertion order and grant at the first active rule for the
//! `(source, target, class)` triple whose permissions cover the request. A
//! matching rule that does not cover the request does not stop the scan.
//! With no authorizing rule the answer is `Deny`; there is no permissive mode.

use super::sid::SecurityId;
use crate::security::collections::LruCache;
use crate::security::object::{AccessVector, ObjectClass};
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::{Mutex, RwLock};

/// MAC policy rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRule {
    pub source: SecurityId,
    pub target: SecurityId,
    pub class: ObjectClass,
    pub perms: AccessVector,
    pub active: bool,
}

impl PolicyRule {
    /// Active allow rule
    pub const fn allow(
        source: SecurityId,
        target: SecurityId,
        class: ObjectClass,
        perms: AccessVector,
    ) -> Self {
        Self {
            source,
            target,
            class,
            perms,
            active: true,
        }
    }

    /// Same rule, inactive
    pub const fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    #[inline]
    fn matches(&self, source: SecurityId, target: SecurityId, class: ObjectClass) -> bool {
        self.active && self.source == source && self.target == target && self.class == class
    }
}

/// Access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny,
}

impl Decision {
    #[inline]
    pub fn is_grant(self) -> bool {
        self == Decision::Grant
    }
}

/// Policy table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// Batch would exceed the rule capacity; nothing was added
    Full,
    /// Rule index out of range
    NoSuchRule,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "policy rule table full"),
            Self::NoSuchRule => write!(f, "no such policy rule"),
        }
    }
}

/// Decision cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

type AvcKey = (SecurityId, SecurityId, ObjectClass, AccessVector);

/// Access Vector Cache
///
/// Lock order: `rules` before `cache`. Writers flush the cache while holding
/// the rules write lock, and readers fill it while holding the read lock, so
/// a cached decision always reflects the current rule table. Readers only
/// `try_lock` the cache and fall back to a scan when another reader has it.
pub struct AccessVectorCache {
    rules: RwLock<Vec<PolicyRule>>,
    capacity: usize,
    cache: Mutex<LruCache<AvcKey, Decision>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AccessVectorCache {
    pub fn new(capacity: usize, cache_capacity: usize) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            capacity,
            cache: Mutex::new(LruCache::new(cache_capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Append a batch of rules atomically
    ///
    /// Either every rule is added or none is.
    pub fn load_policy(&self, batch: &[PolicyRule]) -> Result<(), PolicyError> {
        let mut rules = self.rules.write();

        if batch.len() > self.capacity - rules.len() {
            log::warn!(
                "avc: rejecting batch of {} rules ({} of {} used)",
                batch.len(),
                rules.len(),
                self.capacity
            );
            return Err(PolicyError::Full);
        }

        rules.extend_from_slice(batch);
        self.cache.lock().clear();
        log::debug!("avc: loaded {} rules ({} total)", batch.len(), rules.len());
        Ok(())
    }

    /// Activate or retire a rule by insertion index
    pub fn set_rule_active(&self, index: usize, active: bool) -> Result<(), PolicyError> {
        let mut rules = self.rules.write();
        let rule = rules.get_mut(index).ok_or(PolicyError::NoSuchRule)?;
        rule.active = active;
        self.cache.lock().clear();
        log::debug!("avc: rule {} active={}", index, active);
        Ok(())
    }

    /// Decide whether `source` may perform `requested` on `target` of `class`
    pub fn compute_access(
        &self,
        source: SecurityId,
        target: SecurityId,
        class: ObjectClass,
        requested: AccessVector,
    ) -> Decision {
        let rules = self.rules.read();
        let key = (source, target, class, requested);

        // A busy cache is skipped, never waited on: readers only share `rules`
        let cached = self.cache.try_lock().and_then(|mut cache| cache.get(&key).copied());
        if let Some(decision) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return decision;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let decision = Self::scan(&rules, source, target, class, requested);
        if let Some(mut cache) = self.cache.try_lock() {
            cache.put(key, decision);
        }
        decision
    }

    fn scan(
        rules: &[PolicyRule],
        source: SecurityId,
        target: SecurityId,
        class: ObjectClass,
        requested: AccessVector,
    ) -> Decision {
        for rule in rules {
            if rule.matches(source, target, class) && rule.perms.contains(requested) {
                return Decision::Grant;
            }
        }
        Decision::Deny
    }

    #[inline]
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Snapshot of the rule log in insertion order
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.rules.read().clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    const S1: SecurityId = SecurityId(1);
    const S2: SecurityId = SecurityId(2);
    const S3: SecurityId = SecurityId(3);

    fn avc() -> AccessVectorCache {
        AccessVectorCache::new(8, 16)
    }

    #[test]
    fn test_permission_subset_law() {
        let avc = avc();
        avc.load_policy(&[PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::READ)])
            .unwrap();

        assert_eq!(
            avc.compute_access(S1, S2, ObjectClass::File, AccessVector::READ),
            Decision::Grant
        );
        assert_eq!(
            avc.compute_access(S1, S2, ObjectClass::File, AccessVector::WRITE),
            Decision::Deny
        );
    }

    #[test]
    fn test_default_deny_on_empty_policy() {
        let avc = avc();
        assert_eq!(
            avc.compute_access(S1, S2, ObjectClass::Process, AccessVector::empty()),
            Decision::Deny
        );
    }

    #[test]
    fn test_scan_continues_past_non_authorizing_match() {
        let avc = avc();
        avc.load_policy(&[
            PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::READ),
            PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::WRITE),
        ])
        .unwrap();

        assert!(avc
            .compute_access(S1, S2, ObjectClass::File, AccessVector::WRITE)
            .is_grant());
        // No single rule covers both bits
        assert!(!avc
            .compute_access(S1, S2, ObjectClass::File, AccessVector::READ_WRITE)
            .is_grant());
    }

    #[test]
    fn test_class_and_direction_are_part_of_the_key() {
        let avc = avc();
        avc.load_policy(&[PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::READ)])
            .unwrap();

        assert!(!avc
            .compute_access(S1, S2, ObjectClass::Socket, AccessVector::READ)
            .is_grant());
        assert!(!avc
            .compute_access(S2, S1, ObjectClass::File, AccessVector::READ)
            .is_grant());
    }

    #[test]
    fn test_inactive_rules_are_skipped() {
        let avc = avc();
        avc.load_policy(&[
            PolicyRule::allow(S1, S3, ObjectClass::Ipc, AccessVector::WRITE).inactive(),
        ])
        .unwrap();
        assert!(!avc
            .compute_access(S1, S3, ObjectClass::Ipc, AccessVector::WRITE)
            .is_grant());

        avc.set_rule_active(0, true).unwrap();
        assert!(avc
            .compute_access(S1, S3, ObjectClass::Ipc, AccessVector::WRITE)
            .is_grant());
    }

    #[test]
    fn test_batch_atomicity() {
        let avc = avc();
        let rule = PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::READ);
        avc.load_policy(&vec![rule; 6]).unwrap();

        let before = avc.rule_count();
        assert_eq!(avc.load_policy(&vec![rule; 3]), Err(PolicyError::Full));
        assert_eq!(avc.rule_count(), before);

        // Exactly filling the table is fine
        avc.load_policy(&vec![rule; 2]).unwrap();
        assert_eq!(avc.rule_count(), 8);
    }

    #[test]
    fn test_set_rule_active_unknown_index() {
        assert_eq!(avc().set_rule_active(3, false), Err(PolicyError::NoSuchRule));
    }

    #[test]
    fn test_cache_is_flushed_on_policy_change() {
        let avc = avc();
        avc.load_policy(&[PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::READ)])
            .unwrap();

        assert!(avc.compute_access(S1, S2, ObjectClass::File, AccessVector::READ).is_grant());
        assert!(avc.compute_access(S1, S2, ObjectClass::File, AccessVector::READ).is_grant());
        let stats = avc.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        avc.set_rule_active(0, false).unwrap();
        assert_eq!(avc.cache_stats().entries, 0);
        assert!(!avc.compute_access(S1, S2, ObjectClass::File, AccessVector::READ).is_grant());
    }

    #[test]
    fn test_busy_cache_falls_back_to_scan() {
        let avc = avc();
        avc.load_policy(&[PolicyRule::allow(S1, S2, ObjectClass::File, AccessVector::READ)])
            .unwrap();

        let held = avc.cache.lock();
        assert!(avc.compute_access(S1, S2, ObjectClass::File, AccessVector::READ).is_grant());
        assert!(!avc.compute_access(S1, S2, ObjectClass::File, AccessVector::WRITE).is_grant());
        assert!(held.is_empty());
        drop(held);

        assert_eq!(avc.cache_stats().misses, 2);
        assert_eq!(avc.cache_stats().entries, 0);
    }

    fn class_strategy() -> impl Strategy<Value = ObjectClass> {
        (0u8..ObjectClass::COUNT as u8).prop_map(ObjectClass::from_index)
    }

    proptest! {
        #[test]
        fn prop_default_deny(s in 0u32..16, t in 0u32..16, class in class_strategy(), bits in any::<u32>()) {
            let avc = avc();
            // Only rules for sources >= 100 exist
            avc.load_policy(&[PolicyRule::allow(SecurityId(100), SecurityId(t), class, AccessVector::all())]).unwrap();
            let requested = AccessVector::from_bits_truncate(bits);
            prop_assert_eq!(avc.compute_access(SecurityId(s), SecurityId(t), class, requested), Decision::Deny);
        }

        #[test]
        fn prop_cached_equals_uncached(granted in any::<u32>(), requested in any::<u32>()) {
            let avc = avc();
            let granted = AccessVector::from_bits_truncate(granted);
            let requested = AccessVector::from_bits_truncate(requested);
            avc.load_policy(&[PolicyRule::allow(S1, S2, ObjectClass::File, granted)]).unwrap();

            let first = avc.compute_access(S1, S2, ObjectClass::File, requested);
            let second = avc.compute_access(S1, S2, ObjectClass::File, requested);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.is_grant(), granted.contains(requested));
        }
    }
}
