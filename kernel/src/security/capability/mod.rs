//! Capability System - Core Types
//!
//! POSIX-style capability sets with strict inheritance:
//! - Bitset masks for O(1) checks
//! - permitted / effective / inheritable triple per context
//! - Derivation never exceeds the parent (no escalation)

pub mod rights;

use crate::security::error::{SecurityError, SecurityResult};

/// Capability - one discrete, revocable privilege
///
/// Bit positions follow the Linux numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Capability {
    Chown = 0,
    DacOverride = 1,
    DacReadSearch = 2,
    Fowner = 3,
    Fsetid = 4,
    Kill = 5,
    Setgid = 6,
    Setuid = 7,
    Setpcap = 8,
    LinuxImmutable = 9,
    NetBindService = 10,
    NetBroadcast = 11,
    NetAdmin = 12,
    NetRaw = 13,
    IpcLock = 14,
    IpcOwner = 15,
    SysModule = 16,
    SysRawio = 17,
    SysChroot = 18,
    SysPtrace = 19,
    SysPacct = 20,
    SysAdmin = 21,
    SysBoot = 22,
    SysNice = 23,
    SysResource = 24,
    SysTime = 25,
    SysTtyConfig = 26,
    Mknod = 27,
    Lease = 28,
    AuditWrite = 29,
    AuditControl = 30,
    Setfcap = 31,
    MacOverride = 32,
    MacAdmin = 33,
    Syslog = 34,
    WakeAlarm = 35,
    BlockSuspend = 36,
    AuditRead = 37,
    Perfmon = 38,
    Bpf = 39,
    CheckpointRestore = 40,
}

impl Capability {
    pub const LAST: Capability = Capability::CheckpointRestore;
    pub const COUNT: usize = Self::LAST as usize + 1;

    #[inline]
    pub fn as_bit(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Capability at a bit position
    pub fn from_bit(bit: u8) -> Option<Self> {
        if (bit as usize) < Self::COUNT {
            Some(Self::ALL[bit as usize])
        } else {
            None
        }
    }

    pub const ALL: [Capability; Self::COUNT] = [
        Self::Chown,
        Self::DacOverride,
        Self::DacReadSearch,
        Self::Fowner,
        Self::Fsetid,
        Self::Kill,
        Self::Setgid,
        Self::Setuid,
        Self::Setpcap,
        Self::LinuxImmutable,
        Self::NetBindService,
        Self::NetBroadcast,
        Self::NetAdmin,
        Self::NetRaw,
        Self::IpcLock,
        Self::IpcOwner,
        Self::SysModule,
        Self::SysRawio,
        Self::SysChroot,
        Self::SysPtrace,
        Self::SysPacct,
        Self::SysAdmin,
        Self::SysBoot,
        Self::SysNice,
        Self::SysResource,
        Self::SysTime,
        Self::SysTtyConfig,
        Self::Mknod,
        Self::Lease,
        Self::AuditWrite,
        Self::AuditControl,
        Self::Setfcap,
        Self::MacOverride,
        Self::MacAdmin,
        Self::Syslog,
        Self::WakeAlarm,
        Self::BlockSuspend,
        Self::AuditRead,
        Self::Perfmon,
        Self::Bpf,
        Self::CheckpointRestore,
    ];
}

/// CapMask - efficient set of capabilities
///
/// Uses bitset for O(1) operations and cache-friendly size (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct CapMask {
    bits: u64,
}

impl CapMask {
    const VALID_BITS: u64 = (1u64 << Capability::COUNT) - 1;

    /// Create empty mask
    #[inline]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Create with every defined capability
    #[inline]
    pub const fn all() -> Self {
        Self {
            bits: Self::VALID_BITS,
        }
    }

    /// Create from raw bits, dropping undefined positions
    #[inline]
    pub const fn from_bits_truncate(bits: u64) -> Self {
        Self {
            bits: bits & Self::VALID_BITS,
        }
    }

    #[inline]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// Create from a list of capabilities
    pub fn from_caps(caps: &[Capability]) -> Self {
        let mut mask = Self::empty();
        for cap in caps {
            mask.add(*cap);
        }
        mask
    }

    /// Add a capability - O(1)
    #[inline]
    pub fn add(&mut self, cap: Capability) {
        self.bits |= cap.as_bit();
    }

    /// Remove a capability - O(1)
    #[inline]
    pub fn remove(&mut self, cap: Capability) {
        self.bits &= !cap.as_bit();
    }

    /// Check if has capability - O(1)
    #[inline]
    pub fn has(&self, cap: Capability) -> bool {
        (self.bits & cap.as_bit()) != 0
    }

    /// Check if has all capabilities of `other` - O(1)
    #[inline]
    pub fn has_all(&self, other: &CapMask) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Subset test - O(1)
    #[inline]
    pub fn is_subset(&self, other: &CapMask) -> bool {
        other.has_all(self)
    }

    /// Union of two masks - O(1)
    #[inline]
    pub fn union(&self, other: &CapMask) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Intersection - O(1)
    #[inline]
    pub fn intersection(&self, other: &CapMask) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Difference - O(1)
    #[inline]
    pub fn difference(&self, other: &CapMask) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Count capabilities - O(1) with popcount
    #[inline]
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Iterate set capabilities in bit order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.iter().copied().filter(move |cap| self.has(*cap))
    }
}

impl From<Capability> for CapMask {
    fn from(cap: Capability) -> Self {
        Self { bits: cap.as_bit() }
    }
}

/// Per-context capability state
///
/// Invariant: `effective ⊆ permitted`. Fields are private so every mutation
/// goes through [`raise`](Self::raise), [`lower`](Self::lower) or
/// [`revoke`](Self::revoke), which preserve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    permitted: CapMask,
    effective: CapMask,
    inheritable: CapMask,
}

impl CapabilitySet {
    /// No capabilities at all
    pub const fn empty() -> Self {
        Self {
            permitted: CapMask::empty(),
            effective: CapMask::empty(),
            inheritable: CapMask::empty(),
        }
    }

    /// Kernel seed: every capability permitted, effective and inheritable
    ///
    /// Only the bootstrap of the kernel context uses this; it is the sole
    /// capability source of the whole context tree.
    pub(crate) const fn kernel_seed() -> Self {
        Self {
            permitted: CapMask::all(),
            effective: CapMask::all(),
            inheritable: CapMask::all(),
        }
    }

    /// Derive a child set
    ///
    /// `permitted = parent.permitted ∩ requested`, inheritable copied,
    /// effective empty. The child can never hold more than the parent.
    pub fn derive_from_parent(parent: &CapabilitySet, requested: CapMask) -> Self {
        Self {
            permitted: parent.permitted.intersection(&requested),
            effective: CapMask::empty(),
            inheritable: parent.inheritable,
        }
    }

    /// Make a permitted capability effective
    pub fn raise(&mut self, cap: Capability) -> SecurityResult<()> {
        if !self.permitted.has(cap) {
            return Err(SecurityError::PermissionDenied);
        }
        self.effective.add(cap);
        Ok(())
    }

    /// Drop a capability from the effective set; always succeeds
    #[inline]
    pub fn lower(&mut self, cap: Capability) {
        self.effective.remove(cap);
    }

    /// Remove a capability from all three sets
    #[inline]
    pub fn revoke(&mut self, cap: Capability) {
        self.effective.remove(cap);
        self.permitted.remove(cap);
        self.inheritable.remove(cap);
    }

    /// Check the effective set
    #[inline]
    pub fn has(&self, cap: Capability) -> bool {
        self.effective.has(cap)
    }

    #[inline]
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    #[inline]
    pub fn permitted(&self) -> CapMask {
        self.permitted
    }

    #[inline]
    pub fn effective(&self) -> CapMask {
        self.effective
    }

    #[inline]
    pub fn inheritable(&self) -> CapMask {
        self.inheritable
    }
}
