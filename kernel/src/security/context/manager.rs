//! Context Manager
//!
//! Owns every security table and runs the access pipeline.
//!
//! Locking:
//! - `contexts` is taken only long enough to clone an `Arc<SecurityContext>`;
//!   allocation takes it for writing.
//! - At most one context state lock is held at a time.
//! - The crypto service and the audit sink are called with no context lock
//!   held, except for `close_session` on sessions already unlinked.

use super::{
    ContextId, ContextInfo, ContextState, ContextType, Operation, SecurityContext,
    ShutdownReport,
};
use crate::security::audit::{AuditEventType, AuditLog, AuditRecord, AuditSink};
use crate::security::capability::{rights, CapMask, Capability, CapabilitySet};
use crate::security::crypto::{
    Algorithm, CryptoError, CryptoService, CryptoSession, SessionHandle, SessionTable,
};
use crate::security::error::{SecurityError, SecurityResult};
use crate::security::isolation::namespace::{attach, release};
use crate::security::isolation::{
    Action, Instruction, NamespaceAllocator, NamespaceError, NamespaceKind, NamespaceProxy,
    SeccompFilter, SyscallRecord,
};
use crate::security::mac::{AccessVectorCache, CacheStats, Decision, PolicyRule, SecurityId, SidTable};
use crate::security::object::{AccessVector, ObjectClass, ObjectRef};
use crate::security::tpm::{PcrBank, PcrIndex, TpmError};
use crate::security::SecurityConfig;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::RwLock;

/// Security context manager
pub struct ContextManager {
    config: SecurityConfig,
    sids: SidTable,
    avc: AccessVectorCache,
    /// Context arena, `ContextId(n)` at index `n - 1`
    contexts: RwLock<Vec<Arc<SecurityContext>>>,
    namespaces: NamespaceAllocator,
    /// Kept alive for the whole lifetime of the manager
    init_proxy: Arc<NamespaceProxy>,
    crypto: RwLock<Option<Arc<dyn CryptoService>>>,
    audit_log: AuditLog,
    audit_sink: RwLock<Option<Arc<dyn AuditSink>>>,
    /// Logical clock for session timestamps
    clock: AtomicU64,
    audit_seq: AtomicU64,
}

impl ContextManager {
    /// Build the tables and the kernel context
    pub(crate) fn bootstrap(config: SecurityConfig) -> SecurityResult<Self> {
        let sids = SidTable::new(config.sid_capacity);
        let namespaces = NamespaceAllocator::new();
        let init_proxy = namespaces.create_default();

        let kernel = SecurityContext::new(
            ContextId::KERNEL,
            ContextType::Kernel,
            "kernel",
            None,
            SecurityId::KERNEL,
            ContextState {
                active: true,
                capabilities: CapabilitySet::kernel_seed(),
                seccomp_filter: None,
                namespaces: Some(Arc::clone(&init_proxy)),
                sessions: SessionTable::new(),
            },
        );

        let mut contexts = Vec::with_capacity(config.context_capacity);
        contexts.push(Arc::new(kernel));

        log::debug!(
            "context: kernel context {} labeled {:?}",
            ContextId::KERNEL.0,
            sids.sid_to_context(SecurityId::KERNEL)
        );

        Ok(Self {
            config,
            sids,
            avc: AccessVectorCache::new(config.policy_capacity, config.avc_cache_capacity),
            contexts: RwLock::new(contexts),
            namespaces,
            init_proxy,
            crypto: RwLock::new(None),
            audit_log: AuditLog::new(config.audit_capacity),
            audit_sink: RwLock::new(None),
            clock: AtomicU64::new(0),
            audit_seq: AtomicU64::new(1),
        })
    }

    #[inline]
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Install the platform crypto/TPM provider
    pub fn set_crypto_service(&self, service: Arc<dyn CryptoService>) {
        *self.crypto.write() = Some(service);
        log::info!("security: crypto service installed");
    }

    /// Forward audit records to an external sink as well as the ring log
    pub fn set_audit_sink(&self, sink: Arc<dyn AuditSink>) {
        *self.audit_sink.write() = Some(sink);
    }

    /// In-kernel audit trail
    #[inline]
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    // ------------------------------------------------------------------
    // SID table / AVC
    // ------------------------------------------------------------------

    pub fn context_to_sid(&self, label: &str) -> SecurityResult<SecurityId> {
        Ok(self.sids.context_to_sid(label)?)
    }

    pub fn sid_to_context(&self, sid: SecurityId) -> Arc<str> {
        self.sids.sid_to_context(sid)
    }

    pub fn load_policy(&self, rules: &[PolicyRule]) -> SecurityResult<()> {
        self.avc.load_policy(rules)?;
        self.audit(AuditEventType::PolicyLoaded, ContextId::KERNEL, None, true, rules.len() as u64);
        Ok(())
    }

    pub fn set_rule_active(&self, index: usize, active: bool) -> SecurityResult<()> {
        Ok(self.avc.set_rule_active(index, active)?)
    }

    pub fn compute_access(
        &self,
        source: SecurityId,
        target: SecurityId,
        class: ObjectClass,
        requested: AccessVector,
    ) -> Decision {
        self.avc.compute_access(source, target, class, requested)
    }

    pub fn policy_rules(&self) -> Vec<PolicyRule> {
        self.avc.rules()
    }

    pub fn avc_stats(&self) -> CacheStats {
        self.avc.cache_stats()
    }

    // ------------------------------------------------------------------
    // Context lifecycle
    // ------------------------------------------------------------------

    fn get(&self, id: ContextId) -> Option<Arc<SecurityContext>> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.contexts.read().get(index).cloned()
    }

    /// Run `f` on an active context's state, under its lock
    fn with_active<R>(
        &self,
        id: ContextId,
        f: impl FnOnce(&SecurityContext, &mut ContextState) -> SecurityResult<R>,
    ) -> SecurityResult<R> {
        let ctx = self.get(id).ok_or(SecurityError::InvalidContext)?;
        let mut state = ctx.state.lock();
        if !state.active {
            return Err(SecurityError::InvalidContext);
        }
        f(&*ctx, &mut *state)
    }

    /// Create a context that may use everything its parent is permitted
    pub fn create_context(
        &self,
        ctx_type: ContextType,
        name: &str,
        parent: Option<ContextId>,
    ) -> SecurityResult<ContextId> {
        self.create_context_with(ctx_type, name, parent, CapMask::all())
    }

    /// Create a context, asking for `requested` capabilities
    ///
    /// The child gets `parent.permitted ∩ requested`, the parent's label and
    /// a shared reference to the parent's namespace proxy. Without a parent it
    /// gets SID 0, the init proxy and no capabilities.
    pub fn create_context_with(
        &self,
        ctx_type: ContextType,
        name: &str,
        parent: Option<ContextId>,
        requested: CapMask,
    ) -> SecurityResult<ContextId> {
        let (mac_sid, capabilities, namespaces) = match parent {
            Some(pid) => self.with_active(pid, |ctx, state| {
                Ok((
                    ctx.mac_sid(),
                    CapabilitySet::derive_from_parent(&state.capabilities, requested),
                    state.namespaces.clone(),
                ))
            })?,
            None => (
                SecurityId::UNLABELED,
                CapabilitySet::empty(),
                Some(Arc::clone(&self.init_proxy)),
            ),
        };

        let mut contexts = self.contexts.write();
        if contexts.len() >= self.config.context_capacity {
            log::warn!(
                "context: table full ({} contexts), cannot create {:?}",
                self.config.context_capacity,
                name
            );
            return Err(SecurityError::ContextTableFull);
        }

        let id = ContextId(contexts.len() as u32 + 1);
        contexts.push(Arc::new(SecurityContext::new(
            id,
            ctx_type,
            name,
            parent,
            mac_sid,
            ContextState {
                active: true,
                capabilities,
                seccomp_filter: None,
                namespaces,
                sessions: SessionTable::new(),
            },
        )));
        drop(contexts);

        log::debug!(
            "context: created {} {:?} ({:?}) parent={:?} sid={} caps=[{}]",
            id.0,
            name,
            ctx_type,
            parent.map(|p| p.0),
            mac_sid.0,
            rights::describe(&capabilities.permitted())
        );
        self.audit(AuditEventType::ContextCreated, id, None, true, capabilities.permitted().bits());
        Ok(id)
    }

    /// Deactivate a context
    ///
    /// The record stays in the arena so the id is never reused. Capabilities,
    /// filter, namespaces and crypto sessions are released. A second destroy
    /// fails with `InvalidContext`.
    pub fn destroy_context(&self, id: ContextId) -> SecurityResult<()> {
        if id.is_kernel() {
            log::warn!("context: refusing to destroy the kernel context");
            return Err(SecurityError::PermissionDenied);
        }

        let sessions = self.with_active(id, |_, state| Ok(Self::deactivate(state)))?;
        self.close_provider_sessions(&sessions);

        log::debug!("context: destroyed {} ({} sessions closed)", id.0, sessions.len());
        self.audit(AuditEventType::ContextDestroyed, id, None, true, 0);
        Ok(())
    }

    fn deactivate(state: &mut ContextState) -> Vec<CryptoSession> {
        state.active = false;
        state.capabilities.clear();
        state.seccomp_filter = None;
        release(&mut state.namespaces);
        state.sessions.drain()
    }

    fn close_provider_sessions(&self, sessions: &[CryptoSession]) {
        if sessions.is_empty() {
            return;
        }
        if let Some(service) = self.crypto.read().clone() {
            for session in sessions {
                service.close_session(session.handle);
            }
        }
    }

    /// Change a context's label
    ///
    /// Allowed only if policy grants `TRANSITION` on class `Process` from the
    /// current label to `new_sid`.
    pub fn transition_context(&self, id: ContextId, new_sid: SecurityId) -> SecurityResult<()> {
        if !self.sids.contains(new_sid) {
            return Err(SecurityError::PermissionDenied);
        }
        let ctx = self.get(id).ok_or(SecurityError::InvalidContext)?;
        // Held across the AVC lookup so a concurrent destroy cannot interleave
        let state = ctx.state.lock();
        if !state.active {
            return Err(SecurityError::InvalidContext);
        }

        let old = ctx.mac_sid();
        let decision = self.avc.compute_access(old, new_sid, ObjectClass::Process, AccessVector::TRANSITION);
        if !decision.is_grant() {
            drop(state);
            log::debug!("context: {} transition {} -> {} denied", id.0, old.0, new_sid.0);
            return Err(SecurityError::PermissionDenied);
        }
        ctx.set_mac_sid(new_sid);
        drop(state);

        log::debug!("context: {} transitioned {} -> {}", id.0, old.0, new_sid.0);
        Ok(())
    }

    /// Snapshot of an active context
    ///
    /// Destroyed contexts give `InvalidContext`; their history lives in the
    /// audit log.
    pub fn context_info(&self, id: ContextId) -> SecurityResult<ContextInfo> {
        self.with_active(id, |ctx, state| {
            let mac_sid = ctx.mac_sid();
            Ok(ContextInfo {
                id,
                ctx_type: ctx.ctx_type(),
                name: ctx.name().into(),
                parent: ctx.parent(),
                mac_sid,
                label: self.sids.sid_to_context(mac_sid),
                capabilities: state.capabilities,
                filter_len: state.seccomp_filter.as_ref().map(|f| f.len()),
                namespaces: state.namespaces.as_deref().map(ContextInfo::namespace_ids),
                session_count: state.sessions.len(),
            })
        })
    }

    /// Contexts ever created, active or not
    pub fn context_count(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn active_contexts(&self) -> Vec<ContextId> {
        let contexts = self.contexts.read().clone();
        contexts
            .iter()
            .filter(|ctx| ctx.is_active())
            .map(|ctx| ctx.id())
            .collect()
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    pub fn raise_capability(&self, id: ContextId, cap: Capability) -> SecurityResult<()> {
        let result = self.with_active(id, |_, state| state.capabilities.raise(cap));
        match result {
            Err(SecurityError::InvalidContext) => {}
            _ => self.audit(
                AuditEventType::CapabilityRaised,
                id,
                None,
                result.is_ok(),
                cap as u64,
            ),
        }
        result
    }

    pub fn lower_capability(&self, id: ContextId, cap: Capability) -> SecurityResult<()> {
        self.with_active(id, |_, state| {
            state.capabilities.lower(cap);
            Ok(())
        })?;
        self.audit(AuditEventType::CapabilityLowered, id, None, true, cap as u64);
        Ok(())
    }

    /// Drop `cap` from every set of the context, for good
    pub fn revoke_capability(&self, id: ContextId, cap: Capability) -> SecurityResult<()> {
        self.with_active(id, |_, state| {
            state.capabilities.revoke(cap);
            Ok(())
        })?;
        self.audit(AuditEventType::CapabilityRevoked, id, None, true, cap as u64);
        Ok(())
    }

    /// `cap` is effective; false for unknown or destroyed contexts
    pub fn check_capability(&self, id: ContextId, cap: Capability) -> bool {
        self.with_active(id, |_, state| Ok(state.capabilities.has(cap)))
            .unwrap_or(false)
    }

    pub fn capabilities(&self, id: ContextId) -> SecurityResult<CapabilitySet> {
        self.with_active(id, |_, state| Ok(state.capabilities))
    }

    // ------------------------------------------------------------------
    // Access pipeline
    // ------------------------------------------------------------------

    /// Capability gate, then MAC policy
    ///
    /// A denial is final for this call.
    pub fn check_access(&self, id: ContextId, op: Operation, object: ObjectRef) -> SecurityResult<()> {
        let (mac_sid, capabilities) =
            self.with_active(id, |ctx, state| Ok((ctx.mac_sid(), state.capabilities)))?;

        let result = if !capabilities.has(op.capability) {
            log::debug!("access: {} lacks {:?}", id.0, op.capability);
            Err(SecurityError::PermissionDenied)
        } else {
            match self.avc.compute_access(mac_sid, object.sid, object.class, op.access) {
                Decision::Grant => Ok(()),
                Decision::Deny => {
                    log::debug!(
                        "access: policy denies {} -> {} {} {:?}",
                        mac_sid.0,
                        object.sid.0,
                        object.class.name(),
                        op.access
                    );
                    Err(SecurityError::PermissionDenied)
                }
            }
        };

        let event = if result.is_ok() {
            AuditEventType::AccessGranted
        } else {
            AuditEventType::AccessDenied
        };
        let data = ((op.capability as u64) << 32) | op.access.bits() as u64;
        self.audit(event, id, Some(object), result.is_ok(), data);
        result
    }

    // ------------------------------------------------------------------
    // Seccomp
    // ------------------------------------------------------------------

    /// Validate `program` and swap it in as the context's filter
    pub fn attach_filter(&self, id: ContextId, program: &[Instruction]) -> SecurityResult<()> {
        let ctx = self.get(id).ok_or(SecurityError::InvalidContext)?;
        let filter = SeccompFilter::new(program, self.config.max_filter_insns).map_err(|e| {
            log::warn!("seccomp: rejected filter for {}: {}", id.0, e);
            e
        })?;
        let filter = Arc::new(filter);

        let mut state = ctx.state.lock();
        if !state.active {
            return Err(SecurityError::InvalidContext);
        }
        state.seccomp_filter = Some(filter);
        drop(state);

        log::debug!("seccomp: {} attached {}-instruction filter", id.0, program.len());
        self.audit(AuditEventType::FilterAttached, id, None, true, program.len() as u64);
        Ok(())
    }

    pub fn detach_filter(&self, id: ContextId) -> SecurityResult<()> {
        self.with_active(id, |_, state| {
            state.seccomp_filter = None;
            Ok(())
        })
    }

    /// Classify a syscall
    ///
    /// The kernel context bypasses filtering. Unknown or destroyed contexts
    /// are killed.
    pub fn check_syscall(&self, id: ContextId, record: &SyscallRecord) -> Action {
        if id.is_kernel() {
            return Action::Allow;
        }

        let filter = match self.with_active(id, |_, state| Ok(state.seccomp_filter.clone())) {
            Ok(Some(filter)) => filter,
            Ok(None) => return Action::Allow,
            Err(_) => return Action::Kill,
        };

        // Run without the context lock; the Arc keeps this filter alive
        // even if it is swapped concurrently.
        let action = filter.evaluate(record);
        if !action.permits() {
            log::debug!("seccomp: {} syscall {} -> {:?}", id.0, record.nr, action);
            self.audit(AuditEventType::SyscallDenied, id, None, false, record.nr as u64);
        }
        action
    }

    // ------------------------------------------------------------------
    // Namespaces
    // ------------------------------------------------------------------

    pub fn unshare_namespace(&self, id: ContextId, kind: NamespaceKind) -> SecurityResult<()> {
        self.unshare_kinds(id, &[kind], kind.clone_flag())
    }

    /// Unshare every kind named by Linux `CLONE_NEW*` bits in one step
    pub fn unshare_flags(&self, id: ContextId, flags: u64) -> SecurityResult<()> {
        let kinds = NamespaceKind::from_clone_flags(flags)?;
        self.unshare_kinds(id, &kinds, flags)
    }

    fn unshare_kinds(&self, id: ContextId, kinds: &[NamespaceKind], flags: u64) -> SecurityResult<()> {
        self.with_active(id, |_, state| {
            Ok(self.namespaces.unshare(&mut state.namespaces, kinds)?)
        })?;
        log::debug!("namespace: {} unshared {:#x}", id.0, flags);
        self.audit(AuditEventType::NamespaceUnshared, id, None, true, flags);
        Ok(())
    }

    /// Replace the context's proxy with `proxy`
    pub fn attach_namespaces(&self, id: ContextId, proxy: Arc<NamespaceProxy>) -> SecurityResult<()> {
        self.with_active(id, |_, state| {
            attach(&mut state.namespaces, proxy);
            Ok(())
        })
    }

    /// Join every namespace of `target`
    pub fn enter_namespaces(&self, id: ContextId, target: ContextId) -> SecurityResult<()> {
        let proxy = self.namespaces_of(target)?;
        self.attach_namespaces(id, proxy)
    }

    pub fn namespaces_of(&self, id: ContextId) -> SecurityResult<Arc<NamespaceProxy>> {
        self.with_active(id, |_, state| {
            state
                .namespaces
                .clone()
                .ok_or(SecurityError::Namespace(NamespaceError::NoProxy))
        })
    }

    /// Both contexts see the same namespace of `kind`
    pub fn shares_namespace(&self, a: ContextId, b: ContextId, kind: NamespaceKind) -> SecurityResult<bool> {
        let pa = self.namespaces_of(a)?;
        let pb = self.namespaces_of(b)?;
        Ok(pa.shares(&pb, kind))
    }

    /// PID visibility
    ///
    /// `observer` sees `target` if the target's PID namespace is the
    /// observer's own or a descendant of it. The kernel sees everything.
    pub fn can_observe(&self, observer: ContextId, target: ContextId) -> SecurityResult<bool> {
        let target_ns = self.namespaces_of(target)?;
        if observer.is_kernel() {
            return Ok(true);
        }
        let observer_ns = self.namespaces_of(observer)?;
        Ok(observer_ns
            .get(NamespaceKind::Pid)
            .is_ancestor_or_self(target_ns.get(NamespaceKind::Pid)))
    }

    /// The init proxy
    pub fn init_namespaces(&self) -> Arc<NamespaceProxy> {
        Arc::clone(&self.init_proxy)
    }

    // ------------------------------------------------------------------
    // Crypto / TPM sessions
    // ------------------------------------------------------------------

    fn crypto_service(&self) -> SecurityResult<Arc<dyn CryptoService>> {
        if !self.config.crypto_enabled {
            return Err(CryptoError::Disabled.into());
        }
        self.crypto
            .read()
            .clone()
            .ok_or(SecurityError::Crypto(CryptoError::NoProvider))
    }

    #[inline]
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn open_session(
        &self,
        id: ContextId,
        algorithm: Algorithm,
        tpm_backed: bool,
    ) -> SecurityResult<SessionHandle> {
        let service = self.crypto_service()?;
        self.with_active(id, |_, _| Ok(()))?;
        if tpm_backed && !service.tpm_available() {
            return Err(TpmError::NotAvailable.into());
        }

        let handle = service.create_session(algorithm, tpm_backed)?;
        let session = CryptoSession {
            handle,
            algorithm,
            created_at: self.tick(),
            usage_count: 0,
            tpm_backed,
        };

        let linked = self.with_active(id, |_, state| {
            state.sessions.insert(session);
            Ok(())
        });
        if let Err(err) = linked {
            // Context died while the provider was working
            service.close_session(handle);
            return Err(err);
        }

        log::debug!(
            "crypto: {} opened session {} ({}{})",
            id.0,
            handle.0,
            algorithm.name(),
            if tpm_backed { ", tpm" } else { "" }
        );
        Ok(handle)
    }

    /// Run a provider transform on a session the context owns
    ///
    /// The use is counted only once the provider has succeeded.
    fn use_session(
        &self,
        id: ContextId,
        handle: SessionHandle,
        transform: impl FnOnce(&dyn CryptoService) -> Result<Vec<u8>, CryptoError>,
    ) -> SecurityResult<Vec<u8>> {
        let service = self.crypto_service()?;
        self.with_active(id, |_, state| {
            if state.sessions.contains(handle) {
                Ok(())
            } else {
                Err(SecurityError::Crypto(CryptoError::UnknownSession))
            }
        })?;

        let output = transform(&*service)?;
        // Closed or destroyed while the provider ran: nothing left to count
        let _ = self.with_active(id, |_, state| {
            state.sessions.touch(handle);
            Ok(())
        });
        Ok(output)
    }

    pub fn session_encrypt(&self, id: ContextId, handle: SessionHandle, plaintext: &[u8]) -> SecurityResult<Vec<u8>> {
        self.use_session(id, handle, |service| service.encrypt(handle, plaintext))
    }

    pub fn session_decrypt(&self, id: ContextId, handle: SessionHandle, ciphertext: &[u8]) -> SecurityResult<Vec<u8>> {
        self.use_session(id, handle, |service| service.decrypt(handle, ciphertext))
    }

    pub fn close_session(&self, id: ContextId, handle: SessionHandle) -> SecurityResult<()> {
        let service = self.crypto_service()?;
        self.with_active(id, |_, state| {
            state
                .sessions
                .remove(handle)
                .ok_or(SecurityError::Crypto(CryptoError::UnknownSession))
        })?;
        service.close_session(handle);
        Ok(())
    }

    pub fn sessions(&self, id: ContextId) -> SecurityResult<Vec<CryptoSession>> {
        self.with_active(id, |_, state| Ok(state.sessions.snapshot()))
    }

    /// Measure `digest` into a PCR on behalf of a context
    pub fn extend_pcr(
        &self,
        id: ContextId,
        index: PcrIndex,
        bank: PcrBank,
        digest: &[u8],
    ) -> SecurityResult<()> {
        let service = self.crypto_service()?;
        self.with_active(id, |_, _| Ok(()))?;
        let index = index.validate()?;
        bank.check_digest(digest)?;
        if !service.tpm_available() {
            return Err(TpmError::NotAvailable.into());
        }

        service.pcr_extend(index, bank, digest)?;
        log::debug!("tpm: {} extended PCR {} ({:#06x})", id.0, index.0, bank.tpm_alg_id());
        self.audit(AuditEventType::TpmMeasurement, id, None, true, index.0 as u64);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Audit / shutdown
    // ------------------------------------------------------------------

    fn audit(
        &self,
        event_type: AuditEventType,
        subject: ContextId,
        object: Option<ObjectRef>,
        success: bool,
        data: u64,
    ) {
        if !self.config.audit_enabled {
            return;
        }

        let record = AuditRecord {
            seq: self.audit_seq.fetch_add(1, Ordering::Relaxed),
            event_type,
            subject,
            object,
            success,
            data,
        };
        self.audit_log.record(&record);

        let sink = self.audit_sink.read().clone();
        if let Some(sink) = sink {
            sink.record(&record);
        }
    }

    /// Drain every context, the kernel included
    ///
    /// Afterwards the manager is the only holder of the init proxy.
    pub fn shutdown(self) -> ShutdownReport {
        let contexts = core::mem::take(&mut *self.contexts.write());
        let mut report = ShutdownReport::default();

        for ctx in &contexts {
            let mut state = ctx.state.lock();
            if !state.active {
                continue;
            }
            let sessions = Self::deactivate(&mut state);
            drop(state);

            report.contexts_drained += 1;
            report.sessions_closed += sessions.len();
            self.close_provider_sessions(&sessions);
        }
        drop(contexts);

        report.init_proxy_refs = NamespaceProxy::refcount(&self.init_proxy);
        log::info!(
            "security: shutdown drained {} contexts, closed {} sessions",
            report.contexts_drained,
            report.sessions_closed
        );
        report
    }
}
