//! Process Isolation
//!
//! Namespace proxies and syscall filters attached to security contexts

pub mod namespace;
pub mod seccomp;

pub use namespace::{
    Namespace, NamespaceAllocator, NamespaceError, NamespaceId, NamespaceKind, NamespaceProxy,
    MAX_NS_LEVEL,
};
pub use seccomp::{Action, Field, FilterError, Instruction, SeccompFilter, SyscallRecord};
