//! Security Contexts
//!
//! A security context is the subject of every access decision. Contexts live
//! in the [`ContextManager`] arena, are never freed, and refer to their parent
//! by id.

pub mod manager;

pub use manager::ContextManager;

use crate::security::capability::{Capability, CapabilitySet};
use crate::security::crypto::SessionTable;
use crate::security::isolation::{NamespaceId, NamespaceKind, NamespaceProxy, SeccompFilter};
use crate::security::mac::SecurityId;
use crate::security::object::AccessVector;
use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};
use spin::Mutex;

/// Context identifier
///
/// Allocated monotonically, never reused. 0 is never a valid context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ContextId(pub u32);

impl ContextId {
    pub const INVALID: Self = Self(0);
    pub const KERNEL: Self = Self(1);

    #[inline]
    pub const fn is_kernel(self) -> bool {
        self.0 == Self::KERNEL.0
    }
}

/// Context type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    Kernel,
    System,
    User,
    Container,
    Hypervisor,
}

/// Privileged operation checked by the access pipeline
///
/// Each operation is gated by exactly one capability, then by MAC policy
/// for `access` on the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub capability: Capability,
    pub access: AccessVector,
}

impl Operation {
    pub const fn new(capability: Capability, access: AccessVector) -> Self {
        Self { capability, access }
    }

    pub const MOUNT: Self = Self::new(Capability::SysAdmin, AccessVector::MOUNT);
    pub const PTRACE: Self = Self::new(Capability::SysPtrace, AccessVector::PTRACE);
    pub const SIGNAL: Self = Self::new(Capability::Kill, AccessVector::SIGNAL);
    pub const NET_BIND: Self = Self::new(Capability::NetBindService, AccessVector::BIND);
    pub const RAW_SOCKET: Self = Self::new(
        Capability::NetRaw,
        AccessVector::CREATE.union(AccessVector::WRITE),
    );
    pub const CHOWN: Self = Self::new(Capability::Chown, AccessVector::SETATTR);
    pub const LOAD_MODULE: Self = Self::new(Capability::SysModule, AccessVector::EXECUTE);
}

/// Mutable per-context state, guarded by the context's own lock
#[derive(Debug)]
pub(crate) struct ContextState {
    pub(crate) active: bool,
    pub(crate) capabilities: CapabilitySet,
    pub(crate) seccomp_filter: Option<Arc<SeccompFilter>>,
    pub(crate) namespaces: Option<Arc<NamespaceProxy>>,
    pub(crate) sessions: SessionTable,
}

/// Security context
pub struct SecurityContext {
    id: ContextId,
    ctx_type: ContextType,
    name: String,
    parent: Option<ContextId>,
    /// Changed only by a policy-checked transition
    mac_sid: AtomicU32,
    pub(crate) state: Mutex<ContextState>,
}

impl SecurityContext {
    pub(crate) fn new(
        id: ContextId,
        ctx_type: ContextType,
        name: &str,
        parent: Option<ContextId>,
        mac_sid: SecurityId,
        state: ContextState,
    ) -> Self {
        Self {
            id,
            ctx_type,
            name: String::from(name),
            parent,
            mac_sid: AtomicU32::new(mac_sid.0),
            state: Mutex::new(state),
        }
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    #[inline]
    pub fn ctx_type(&self) -> ContextType {
        self.ctx_type
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    #[inline]
    pub fn mac_sid(&self) -> SecurityId {
        SecurityId(self.mac_sid.load(Ordering::Acquire))
    }

    pub(crate) fn set_mac_sid(&self, sid: SecurityId) {
        self.mac_sid.store(sid.0, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }
}

impl core::fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecurityContext")
            .field("id", &self.id)
            .field("ctx_type", &self.ctx_type)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("mac_sid", &self.mac_sid())
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub id: ContextId,
    pub ctx_type: ContextType,
    pub name: String,
    pub parent: Option<ContextId>,
    pub mac_sid: SecurityId,
    pub label: Arc<str>,
    pub capabilities: CapabilitySet,
    /// Length of the attached seccomp program
    pub filter_len: Option<usize>,
    /// Namespace ids in [`NamespaceKind::ALL`] order
    pub namespaces: Option<[NamespaceId; 6]>,
    pub session_count: usize,
}

impl ContextInfo {
    pub(crate) fn namespace_ids(proxy: &NamespaceProxy) -> [NamespaceId; 6] {
        NamespaceKind::ALL.map(|kind| proxy.get(kind).id())
    }
}

/// What [`ContextManager::shutdown`] tore down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Contexts that were still active
    pub contexts_drained: usize,
    pub sessions_closed: usize,
    /// Holders of the init proxy left after the drain (the manager itself)
    pub init_proxy_refs: usize,
}
