//! Per-context crypto session tracking

use super::{Algorithm, SessionHandle};
use alloc::vec::Vec;

/// Session owned by one context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoSession {
    pub handle: SessionHandle,
    pub algorithm: Algorithm,
    /// Manager logical clock at creation
    pub created_at: u64,
    pub usage_count: u64,
    pub tpm_backed: bool,
}

/// Open sessions of one context
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Vec<CryptoSession>,
}

impl SessionTable {
    pub const fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    pub fn insert(&mut self, session: CryptoSession) {
        self.sessions.push(session);
    }

    pub fn contains(&self, handle: SessionHandle) -> bool {
        self.sessions.iter().any(|s| s.handle == handle)
    }

    /// Count one use of `handle`
    pub fn touch(&mut self, handle: SessionHandle) -> Option<&CryptoSession> {
        let session = self.sessions.iter_mut().find(|s| s.handle == handle)?;
        session.usage_count += 1;
        Some(session)
    }

    pub fn remove(&mut self, handle: SessionHandle) -> Option<CryptoSession> {
        let pos = self.sessions.iter().position(|s| s.handle == handle)?;
        Some(self.sessions.swap_remove(pos))
    }

    /// Remove every session, returning them for provider teardown
    pub fn drain(&mut self) -> Vec<CryptoSession> {
        core::mem::take(&mut self.sessions)
    }

    pub fn snapshot(&self) -> Vec<CryptoSession> {
        self.sessions.clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(handle: u64) -> CryptoSession {
        CryptoSession {
            handle: SessionHandle(handle),
            algorithm: Algorithm::Aes256Gcm,
            created_at: 0,
            usage_count: 0,
            tpm_backed: false,
        }
    }

    #[test]
    fn test_touch_counts_usage() {
        let mut table = SessionTable::new();
        table.insert(session(7));
        table.touch(SessionHandle(7));
        assert_eq!(table.touch(SessionHandle(7)).map(|s| s.usage_count), Some(2));
        assert!(table.touch(SessionHandle(8)).is_none());
    }

    #[test]
    fn test_remove_and_drain() {
        let mut table = SessionTable::new();
        table.insert(session(1));
        table.insert(session(2));
        table.insert(session(3));

        assert_eq!(table.remove(SessionHandle(2)).map(|s| s.handle), Some(SessionHandle(2)));
        assert!(table.remove(SessionHandle(2)).is_none());
        assert!(!table.contains(SessionHandle(2)));

        let drained = table.drain();
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());
    }
}
