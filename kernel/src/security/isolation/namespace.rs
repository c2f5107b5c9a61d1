//! Namespace Isolation
//!
//! Six independently shareable namespace kinds, bundled per context in a
//! reference-counted [`NamespaceProxy`].
//!
//! Proxies are shared between contexts until one of them unshares. Unsharing
//! builds a new proxy in which only the requested kinds are fresh instances;
//! the other kinds keep pointing at the same `Arc<Namespace>`. Reference
//! counts are the `Arc` strong counts, and every retain/release goes through
//! [`attach`] or [`NamespaceAllocator::unshare`].

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Maximum nesting depth of namespaces of one kind
pub const MAX_NS_LEVEL: u8 = 32;

/// Namespace Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Pid,   // Process ID namespace
    Mount, // Mount namespace
    Net,   // Network namespace
    Uts,   // Hostname namespace
    Ipc,   // IPC namespace
    User,  // User namespace
}

impl NamespaceKind {
    pub const ALL: [NamespaceKind; 6] = [
        Self::Pid,
        Self::Mount,
        Self::Net,
        Self::Uts,
        Self::Ipc,
        Self::User,
    ];

    /// Linux `CLONE_NEW*` flag for this kind
    pub const fn clone_flag(self) -> u64 {
        match self {
            Self::Mount => 0x0002_0000,
            Self::Uts => 0x0400_0000,
            Self::Ipc => 0x0800_0000,
            Self::User => 0x1000_0000,
            Self::Pid => 0x2000_0000,
            Self::Net => 0x4000_0000,
        }
    }

    /// Kind for exactly one `CLONE_NEW*` flag
    pub fn from_clone_flag(flag: u64) -> Result<Self, NamespaceError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.clone_flag() == flag)
            .ok_or(NamespaceError::UnknownKind)
    }

    /// Kinds for a combination of `CLONE_NEW*` flags
    ///
    /// Any bit that is not a namespace flag rejects the whole set.
    pub fn from_clone_flags(flags: u64) -> Result<Vec<Self>, NamespaceError> {
        let known = Self::ALL.iter().fold(0, |acc, kind| acc | kind.clone_flag());
        if flags & !known != 0 {
            return Err(NamespaceError::UnknownKind);
        }
        Ok(Self::ALL
            .iter()
            .copied()
            .filter(|kind| flags & kind.clone_flag() != 0)
            .collect())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pid => "pid",
            Self::Mount => "mnt",
            Self::Net => "net",
            Self::Uts => "uts",
            Self::Ipc => "ipc",
            Self::User => "user",
        }
    }
}

/// Namespace errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceError {
    /// Not one of the six namespace kinds
    UnknownKind,
    /// Context holds no namespace proxy (destroyed or drained)
    NoProxy,
    /// Nesting limit reached for this kind
    TooDeep,
}

impl fmt::Display for NamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind => write!(f, "unknown namespace kind"),
            Self::NoProxy => write!(f, "context has no namespace proxy"),
            Self::TooDeep => write!(f, "namespace nesting limit reached"),
        }
    }
}

/// Namespace ID - unique across all kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NamespaceId(pub u64);

/// Namespace Instance
#[derive(Debug)]
pub struct Namespace {
    kind: NamespaceKind,
    id: NamespaceId,
    /// Namespace this one was unshared from
    parent: Option<Arc<Namespace>>,
    /// Nesting level (0 = init)
    level: u8,
}

impl Namespace {
    #[inline]
    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> NamespaceId {
        self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<Namespace>> {
        self.parent.as_ref()
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// True if `self` is `other` or one of its ancestors
    ///
    /// For PID namespaces this is the visibility relation: a parent
    /// namespace sees the processes of its descendants, never the reverse.
    pub fn is_ancestor_or_self(&self, other: &Namespace) -> bool {
        let mut cursor = Some(other);
        while let Some(ns) = cursor {
            if ns.id == self.id {
                return true;
            }
            if ns.level <= self.level {
                return false;
            }
            cursor = ns.parent.as_deref();
        }
        false
    }
}

/// One reference to each namespace kind
#[derive(Debug)]
pub struct NamespaceProxy {
    pid: Arc<Namespace>,
    mnt: Arc<Namespace>,
    net: Arc<Namespace>,
    uts: Arc<Namespace>,
    ipc: Arc<Namespace>,
    user: Arc<Namespace>,
}

impl NamespaceProxy {
    /// Namespace of a given kind
    pub fn get(&self, kind: NamespaceKind) -> &Arc<Namespace> {
        match kind {
            NamespaceKind::Pid => &self.pid,
            NamespaceKind::Mount => &self.mnt,
            NamespaceKind::Net => &self.net,
            NamespaceKind::Uts => &self.uts,
            NamespaceKind::Ipc => &self.ipc,
            NamespaceKind::User => &self.user,
        }
    }

    fn slot_mut(&mut self, kind: NamespaceKind) -> &mut Arc<Namespace> {
        match kind {
            NamespaceKind::Pid => &mut self.pid,
            NamespaceKind::Mount => &mut self.mnt,
            NamespaceKind::Net => &mut self.net,
            NamespaceKind::Uts => &mut self.uts,
            NamespaceKind::Ipc => &mut self.ipc,
            NamespaceKind::User => &mut self.user,
        }
    }

    /// Shallow copy: every kind shared with `self`
    fn share_all(&self) -> Self {
        Self {
            pid: Arc::clone(&self.pid),
            mnt: Arc::clone(&self.mnt),
            net: Arc::clone(&self.net),
            uts: Arc::clone(&self.uts),
            ipc: Arc::clone(&self.ipc),
            user: Arc::clone(&self.user),
        }
    }

    /// Check if both proxies point at the same namespace of `kind`
    #[inline]
    pub fn shares(&self, other: &NamespaceProxy, kind: NamespaceKind) -> bool {
        Arc::ptr_eq(self.get(kind), other.get(kind))
    }

    /// Number of holders of this proxy
    #[inline]
    pub fn refcount(this: &Arc<Self>) -> usize {
        Arc::strong_count(this)
    }
}

/// Namespace allocator
///
/// Hands out namespace ids and builds proxies. Owned by the context manager.
#[derive(Debug)]
pub struct NamespaceAllocator {
    next_id: AtomicU64,
}

impl NamespaceAllocator {
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> NamespaceId {
        NamespaceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn root(&self, kind: NamespaceKind) -> Arc<Namespace> {
        Arc::new(Namespace {
            kind,
            id: self.next_id(),
            parent: None,
            level: 0,
        })
    }

    fn child(&self, parent: &Arc<Namespace>) -> Result<Arc<Namespace>, NamespaceError> {
        if parent.level >= MAX_NS_LEVEL {
            return Err(NamespaceError::TooDeep);
        }
        Ok(Arc::new(Namespace {
            kind: parent.kind,
            id: self.next_id(),
            parent: Some(Arc::clone(parent)),
            level: parent.level + 1,
        }))
    }

    /// The init proxy: one root namespace per kind
    pub fn create_default(&self) -> Arc<NamespaceProxy> {
        Arc::new(NamespaceProxy {
            pid: self.root(NamespaceKind::Pid),
            mnt: self.root(NamespaceKind::Mount),
            net: self.root(NamespaceKind::Net),
            uts: self.root(NamespaceKind::Uts),
            ipc: self.root(NamespaceKind::Ipc),
            user: self.root(NamespaceKind::User),
        })
    }

    /// Copy-on-write unshare of `kinds` for the proxy held in `slot`
    ///
    /// The new proxy shares every kind not listed, gets fresh child
    /// namespaces for the listed ones, and replaces the old proxy in `slot`.
    /// An empty `kinds` leaves the slot untouched.
    pub fn unshare(
        &self,
        slot: &mut Option<Arc<NamespaceProxy>>,
        kinds: &[NamespaceKind],
    ) -> Result<(), NamespaceError> {
        let current = slot.as_ref().ok_or(NamespaceError::NoProxy)?;
        if kinds.is_empty() {
            return Ok(());
        }

        let mut proxy = current.share_all();
        for kind in kinds {
            let fresh = self.child(current.get(*kind))?;
            *proxy.slot_mut(*kind) = fresh;
        }

        attach(slot, Arc::new(proxy));
        Ok(())
    }
}

impl Default for NamespaceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Install `proxy` in `slot`, releasing whatever was there
pub fn attach(slot: &mut Option<Arc<NamespaceProxy>>, proxy: Arc<NamespaceProxy>) {
    // The previous proxy is dropped here; its namespaces go with it unless
    // another proxy still shares them.
    *slot = Some(proxy);
}

/// Release the proxy held in `slot`
pub fn release(slot: &mut Option<Arc<NamespaceProxy>>) -> bool {
    slot.take().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_flags() {
        assert_eq!(
            NamespaceKind::from_clone_flag(0x4000_0000),
            Ok(NamespaceKind::Net)
        );
        assert_eq!(
            NamespaceKind::from_clone_flag(0x1),
            Err(NamespaceError::UnknownKind)
        );

        let kinds = NamespaceKind::from_clone_flags(0x2000_0000 | 0x0002_0000).unwrap();
        assert_eq!(kinds, alloc::vec![NamespaceKind::Pid, NamespaceKind::Mount]);
        assert_eq!(
            NamespaceKind::from_clone_flags(0x4000_0000 | 0x100),
            Err(NamespaceError::UnknownKind)
        );
    }

    #[test]
    fn test_unshare_replaces_only_requested_kind() {
        let alloc = NamespaceAllocator::new();
        let init = alloc.create_default();

        let mut a = Some(Arc::clone(&init));
        let b = Some(Arc::clone(&init));
        assert_eq!(NamespaceProxy::refcount(&init), 3);

        alloc.unshare(&mut a, &[NamespaceKind::Net]).unwrap();
        let a = a.unwrap();
        let b = b.unwrap();

        assert!(!a.shares(&b, NamespaceKind::Net));
        for kind in [
            NamespaceKind::Pid,
            NamespaceKind::Mount,
            NamespaceKind::Uts,
            NamespaceKind::Ipc,
            NamespaceKind::User,
        ] {
            assert!(a.shares(&b, kind));
        }
        // `a` released its reference to the init proxy
        assert_eq!(NamespaceProxy::refcount(&init), 2);
        assert_eq!(NamespaceProxy::refcount(&a), 1);
        // The shared mount namespace is held by both proxies
        assert_eq!(Arc::strong_count(a.get(NamespaceKind::Mount)), 2);
    }

    #[test]
    fn test_unshared_namespace_is_child_of_previous() {
        let alloc = NamespaceAllocator::new();
        let init = alloc.create_default();
        let mut slot = Some(Arc::clone(&init));
        alloc.unshare(&mut slot, &[NamespaceKind::Pid]).unwrap();

        let proxy = slot.unwrap();
        let child = proxy.get(NamespaceKind::Pid);
        let root = init.get(NamespaceKind::Pid);
        assert_eq!(child.level(), 1);
        assert!(root.is_ancestor_or_self(child));
        assert!(!child.is_ancestor_or_self(root));
        assert!(child.is_ancestor_or_self(child));
    }

    #[test]
    fn test_unshare_without_proxy() {
        let alloc = NamespaceAllocator::new();
        let mut slot = None;
        assert_eq!(
            alloc.unshare(&mut slot, &[NamespaceKind::Uts]),
            Err(NamespaceError::NoProxy)
        );
    }

    #[test]
    fn test_nesting_limit() {
        let alloc = NamespaceAllocator::new();
        let mut slot = Some(alloc.create_default());
        for _ in 0..MAX_NS_LEVEL {
            alloc.unshare(&mut slot, &[NamespaceKind::User]).unwrap();
        }
        assert_eq!(
            alloc.unshare(&mut slot, &[NamespaceKind::User]),
            Err(NamespaceError::TooDeep)
        );
    }

    #[test]
    fn test_release_drops_last_reference() {
        let alloc = NamespaceAllocator::new();
        let mut slot = Some(alloc.create_default());
        alloc.unshare(&mut slot, &[NamespaceKind::Ipc]).unwrap();
        let weak = Arc::downgrade(slot.as_ref().unwrap());
        assert!(release(&mut slot));
        assert!(weak.upgrade().is_none());
        assert!(!release(&mut slot));
    }
}
