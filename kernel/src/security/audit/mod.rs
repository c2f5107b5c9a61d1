//! Audit Subsystem
//!
//! Security event records, the sink trait and the in-kernel ring log

pub mod logger;

pub use logger::{AuditEventType, AuditLog, AuditRecord, AuditSink, AuditSummary};
