//! Exo-OS Security Module
//!
//! Kernel-resident access-control core
//!
//! # Features
//! - **Mandatory access control** - SID table + Access Vector Cache, default deny
//! - **Capability sets** - permitted/effective/inheritable with no-escalation derivation
//! - **Namespace isolation** - shared, copy-on-write namespace proxies
//! - **Syscall filtering** - validated BPF-style seccomp programs
//! - **Crypto/TPM sessions** - lifecycle tracking over an external provider
//!
//! # Architecture
//! - One [`ContextManager`] handle owns every table (no ambient globals)
//! - Contexts live in an arena indexed by id; parents are ids, not pointers
//! - Access pipeline: capability gate, then AVC policy lookup
//!
//! # Performance
//! - Capability gate: one bitmask test
//! - Policy lookup: LRU hit or linear rule scan under a read lock

pub mod audit;
pub mod capability;
pub mod collections;
pub mod context;
pub mod crypto;
pub mod error;
pub mod isolation;
pub mod mac;
pub mod object;
pub mod tpm;

// Re-exports for convenience
pub use audit::{AuditEventType, AuditLog, AuditRecord, AuditSink};
pub use capability::{CapMask, Capability, CapabilitySet};
pub use context::{
    ContextId, ContextInfo, ContextManager, ContextType, Operation, SecurityContext,
    ShutdownReport,
};
pub use crypto::{Algorithm, CryptoError, CryptoService, CryptoSession, SessionHandle};
pub use error::{ConfigError, SecurityError, SecurityResult};
pub use isolation::{
    Action, Field, FilterError, Instruction, NamespaceError, NamespaceKind, NamespaceProxy,
    SeccompFilter, SyscallRecord,
};
pub use mac::{AccessVectorCache, Decision, PolicyError, PolicyRule, SecurityId, SidTable};
pub use object::{AccessVector, ObjectClass, ObjectRef};
pub use tpm::{PcrBank, PcrIndex, TpmError};

/// Security configuration
///
/// Passed to [`init`] once at bootstrap; every table capacity is fixed for
/// the lifetime of the returned [`ContextManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Forward every access decision to the audit sink
    pub audit_enabled: bool,
    /// Allow crypto/TPM sessions to be opened
    pub crypto_enabled: bool,
    /// Maximum number of interned security labels
    pub sid_capacity: usize,
    /// Maximum number of policy rules
    pub policy_capacity: usize,
    /// Maximum number of contexts ever created (ids are never reused)
    pub context_capacity: usize,
    /// Maximum seccomp program length
    pub max_filter_insns: usize,
    /// AVC decision cache entries
    pub avc_cache_capacity: usize,
    /// Audit ring buffer entries
    pub audit_capacity: usize,
}

impl SecurityConfig {
    pub const fn default() -> Self {
        Self {
            audit_enabled: false,
            crypto_enabled: false,
            sid_capacity: 1024,
            policy_capacity: 4096,
            context_capacity: 256,
            max_filter_insns: 64,
            avc_cache_capacity: 512,
            audit_capacity: 1024,
        }
    }

    /// Reject configurations the bootstrap sequence cannot satisfy
    pub fn validate(&self) -> Result<(), ConfigError> {
        // "unlabeled" and the kernel label are interned before anything else
        if self.sid_capacity < mac::sid::RESERVED_SIDS {
            return Err(ConfigError::SidCapacityTooSmall);
        }
        if self.policy_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("policy_capacity"));
        }
        if self.context_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("context_capacity"));
        }
        if self.max_filter_insns == 0 {
            return Err(ConfigError::ZeroCapacity("max_filter_insns"));
        }
        if self.avc_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("avc_cache_capacity"));
        }
        if self.audit_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("audit_capacity"));
        }
        Ok(())
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::default()
    }
}

/// Initialize security subsystem
///
/// Builds the SID table, the AVC, the init namespace proxy and the kernel
/// context (id 1). Tear down with [`ContextManager::shutdown`].
pub fn init(config: SecurityConfig) -> Result<ContextManager, SecurityError> {
    config.validate()?;

    let manager = ContextManager::bootstrap(config)?;

    log::info!("Security subsystem initialized");
    log::info!("  - Mandatory access control (default deny)");
    log::info!(
        "  - {} SIDs / {} rules / {} contexts",
        config.sid_capacity,
        config.policy_capacity,
        config.context_capacity
    );
    log::info!("  - Namespace isolation + seccomp filtering");

    Ok(manager)
}
