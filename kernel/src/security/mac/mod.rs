//! Mandatory Access Control
//!
//! SID table (label interning) and the Access Vector Cache (rule table +
//! decision function). Policy is default deny with no permissive mode.

pub mod avc;
pub mod sid;

pub use avc::{AccessVectorCache, CacheStats, Decision, PolicyError, PolicyRule};
pub use sid::{SecurityId, SidError, SidTable, INVALID_LABEL, KERNEL_LABEL, UNLABELED_LABEL};
