//! Security Audit Logging
//!
//! Bounded audit trail. The newest records win: when the ring is full the
//! oldest record is overwritten and counted as dropped.

use crate::security::collections::RingBuffer;
use crate::security::context::ContextId;
use crate::security::object::ObjectRef;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use spin::Mutex;

/// Audit event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuditEventType {
    // Access pipeline
    AccessGranted = 0,
    AccessDenied = 1,

    // Capability events
    CapabilityRaised = 10,
    CapabilityLowered = 11,
    CapabilityRevoked = 12,

    // Context lifecycle
    ContextCreated = 20,
    ContextDestroyed = 21,

    // Isolation events
    FilterAttached = 30,
    SyscallDenied = 31,
    NamespaceUnshared = 32,

    // Policy events
    PolicyLoaded = 40,

    // TPM events
    TpmMeasurement = 50,
}

/// Audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditRecord {
    /// Monotonic sequence number
    pub seq: u64,
    pub event_type: AuditEventType,
    /// Subject (who)
    pub subject: ContextId,
    /// Object (what), when the event has one
    pub object: Option<ObjectRef>,
    /// Result (success/failure)
    pub success: bool,
    /// Event-specific payload (permission bits, syscall number, capability bit)
    pub data: u64,
}

/// Destination for audit records
///
/// Called with no security-core lock held.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSummary {
    pub total_events: usize,
    pub denied_count: usize,
    /// Sequence number of the newest failed event
    pub last_violation: Option<u64>,
    pub dropped: u64,
}

/// Audit log with ring buffer
pub struct AuditLog {
    ring: Mutex<RingBuffer<AuditRecord>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    /// Get all retained records, oldest first
    pub fn events(&self) -> Vec<AuditRecord> {
        self.ring.lock().snapshot()
    }

    /// Get recent records (last N)
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        self.ring.lock().recent(count)
    }

    /// Get records by type
    pub fn events_by_type(&self, event_type: AuditEventType) -> Vec<AuditRecord> {
        self.ring
            .lock()
            .snapshot()
            .into_iter()
            .filter(|r| r.event_type == event_type)
            .collect()
    }

    pub fn summary(&self) -> AuditSummary {
        let ring = self.ring.lock();
        let events = ring.snapshot();

        AuditSummary {
            total_events: events.len(),
            denied_count: events.iter().filter(|r| !r.success).count(),
            last_violation: events.iter().rev().find(|r| !r.success).map(|r| r.seq),
            dropped: ring.dropped(),
        }
    }

    /// Contexts with the most failed events, worst first
    pub fn top_offenders(&self, count: usize) -> Vec<(ContextId, usize)> {
        let mut offenders: BTreeMap<ContextId, usize> = BTreeMap::new();

        for record in self.ring.lock().snapshot() {
            if !record.success {
                *offenders.entry(record.subject).or_insert(0) += 1;
            }
        }

        let mut sorted: Vec<_> = offenders.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.truncate(count);
        sorted
    }
}

impl AuditSink for AuditLog {
    fn record(&self, record: &AuditRecord) {
        self.ring.lock().push(*record);
    }
}
