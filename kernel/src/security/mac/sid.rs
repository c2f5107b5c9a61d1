//! Security Identifier table
//!
//! Bidirectional label <-> SID mapping. Append-only: SIDs are never freed
//! or reused, so a SID stays valid for the lifetime of the table.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;
use spin::RwLock;

/// Label of the reserved SID 0
pub const UNLABELED_LABEL: &str = "unlabeled";
/// Label of the kernel context, interned at bootstrap as SID 1
pub const KERNEL_LABEL: &str = "system_u:system_r:kernel_t";
/// Returned by reverse lookup for an unknown SID
pub const INVALID_LABEL: &str = "invalid";

/// SIDs interned by [`SidTable::new`] before any caller label
pub const RESERVED_SIDS: usize = 2;

/// Security Identifier - opaque handle for a textual label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SecurityId(pub u32);

impl SecurityId {
    pub const UNLABELED: Self = Self(0);
    pub const KERNEL: Self = Self(1);
}

/// SID allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidError {
    /// Allocation attempted on a full table
    Full,
    /// [`INVALID_LABEL`] is the miss sentinel and can never name a SID
    ReservedLabel,
}

impl fmt::Display for SidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "SID table full"),
            Self::ReservedLabel => write!(f, "label {:?} is reserved", INVALID_LABEL),
        }
    }
}

struct SidTableInner {
    /// Indexed by SID
    labels: Vec<Arc<str>>,
    index: HashMap<Arc<str>, SecurityId>,
}

/// SID table
///
/// Lookups take the read lock; only allocation of a new SID writes.
pub struct SidTable {
    inner: RwLock<SidTableInner>,
    capacity: usize,
}

impl SidTable {
    /// Create a table seeded with the reserved labels
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(RESERVED_SIDS);
        let mut inner = SidTableInner {
            labels: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        };

        for label in [UNLABELED_LABEL, KERNEL_LABEL] {
            let label: Arc<str> = Arc::from(label);
            let sid = SecurityId(inner.labels.len() as u32);
            inner.labels.push(label.clone());
            inner.index.insert(label, sid);
        }

        Self {
            inner: RwLock::new(inner),
            capacity,
        }
    }

    /// Intern a label, allocating the next SID if it is new
    ///
    /// Existing labels resolve even when the table is full.
    pub fn context_to_sid(&self, label: &str) -> Result<SecurityId, SidError> {
        if label == INVALID_LABEL {
            return Err(SidError::ReservedLabel);
        }
        if let Some(sid) = self.inner.read().index.get(label) {
            return Ok(*sid);
        }

        let mut inner = self.inner.write();
        // Another writer may have interned it between the two locks
        if let Some(sid) = inner.index.get(label) {
            return Ok(*sid);
        }

        if inner.labels.len() >= self.capacity {
            log::warn!("sid: table full ({} labels), cannot intern {:?}", self.capacity, label);
            return Err(SidError::Full);
        }

        let sid = SecurityId(inner.labels.len() as u32);
        let label: Arc<str> = Arc::from(label);
        inner.labels.push(label.clone());
        inner.index.insert(label, sid);
        log::trace!("sid: {:?} -> {}", inner.labels[sid.0 as usize], sid.0);
        Ok(sid)
    }

    /// Reverse lookup, [`INVALID_LABEL`] for an unknown SID
    ///
    /// The sentinel is terminal: retrying the same SID can never succeed
    /// because SIDs are allocated densely and never freed.
    pub fn sid_to_context(&self, sid: SecurityId) -> Arc<str> {
        self.lookup(sid).unwrap_or_else(|| Arc::from(INVALID_LABEL))
    }

    /// Reverse lookup
    #[inline]
    pub fn lookup(&self, sid: SecurityId) -> Option<Arc<str>> {
        self.inner.read().labels.get(sid.0 as usize).cloned()
    }

    /// Check if SID has been allocated
    #[inline]
    pub fn contains(&self, sid: SecurityId) -> bool {
        (sid.0 as usize) < self.inner.read().labels.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
